// Capability values (§3.2 "Capability", "StorageCapability /
// PathCapability").
//
// Modern id-based capabilities and the legacy path-based form
// (`StorageCapability`/`PathCapability`) coexist rather than being
// collapsed into one shape, since the legacy form identifies its
// target by path and the current form by a capability id (§9.2 open
// question: resolved in favor of coexistence, see the design notes).

use std::fmt;
use std::rc::Rc;

use crate::location::{Address, Path};
use crate::static_type::StaticType;

#[derive(Clone, Debug, PartialEq)]
pub enum CapabilityValue {
    IdBased {
        address: Address,
        id: u64,
        borrow_type: Option<Rc<StaticType>>,
    },
    PathBased {
        address: Address,
        path: Path,
        borrow_type: Option<Rc<StaticType>>,
    },
}

impl CapabilityValue {
    pub fn address(&self) -> Address {
        match self {
            CapabilityValue::IdBased { address, .. } | CapabilityValue::PathBased { address, .. } => *address,
        }
    }

    pub fn borrow_type(&self) -> Option<Rc<StaticType>> {
        match self {
            CapabilityValue::IdBased { borrow_type, .. } | CapabilityValue::PathBased { borrow_type, .. } => {
                borrow_type.clone()
            }
        }
    }
}

impl fmt::Display for CapabilityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityValue::IdBased { address, id, .. } => write!(f, "{}, id: {}", address, id),
            CapabilityValue::PathBased { address, path, .. } => write!(f, "{}{}", address, path),
        }
    }
}
