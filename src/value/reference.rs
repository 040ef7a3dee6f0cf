// Reference values (§3.2 "Reference", §4.3 "Reference").
//
// A reference doesn't own a copy; it points at a storage location
// that may later be emptied out from under it (a moved variable, a
// removed array element). `Referent` enumerates the storage shapes a
// reference can target; dereferencing re-checks liveness every time
// rather than caching a snapshot, since the slot can be invalidated
// after the reference was created.

use std::cell::RefCell;
use std::rc::Rc;

use crate::errors::{Result, ValueError};
use crate::static_type::{Authorization, StaticType};

use super::array::ArrayValue;
use super::composite::CompositeValue;
use super::dictionary::DictionaryValue;
use super::Value;

/// A variable binding's storage cell: `None` once its resource has
/// been moved out (§9.1).
pub type Slot = Rc<RefCell<Option<Value>>>;

#[derive(Clone)]
pub enum Referent {
    Variable(Slot),
    ArrayElement(Rc<RefCell<ArrayValue>>, usize),
    DictionaryEntry(Rc<RefCell<DictionaryValue>>, Box<Value>),
    CompositeField(Rc<RefCell<CompositeValue>>, String),
}

#[derive(Clone)]
pub struct ReferenceValue {
    pub authorization: Authorization,
    pub borrowed_type: StaticType,
    pub referent: Referent,
}

impl ReferenceValue {
    pub fn get(&self) -> Result<Value> {
        match &self.referent {
            Referent::Variable(slot) => {
                slot.borrow().clone().ok_or_else(|| ValueError::InvalidatedResource.into())
            }
            Referent::ArrayElement(arr, index) => arr
                .borrow()
                .get(*index)
                .cloned()
                .ok_or_else(|| ValueError::InvalidatedResource.into()),
            Referent::DictionaryEntry(dict, key) => dict
                .borrow()
                .get(key)
                .cloned()
                .ok_or_else(|| ValueError::InvalidatedResource.into()),
            Referent::CompositeField(comp, name) => comp
                .borrow()
                .field(name)
                .cloned()
                .ok_or_else(|| ValueError::InvalidatedResource.into()),
        }
    }
}
