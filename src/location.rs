// Program identity.
//
// A `Location` names the program a declaration came from; a `TypeID`
// is the canonical textual name of a composite/interface type within
// that program, used to key the sema elaboration and to stringify
// values (§3.1, §6.3).

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Location {
    Address { address: Address, name: String },
    Identifier(String),
    String(String),
    Test,
}

impl Location {
    /// The prefix used when building a `TypeID`, e.g. `S.test` for
    /// `StringLocation("test")`, `A.0000000000000001.Foo` for an
    /// address location.
    pub fn prefix(&self) -> String {
        match self {
            Location::Address { address, name } => {
                format!("A.{}.{}", address.to_hex_no_prefix(), name)
            }
            Location::Identifier(name) => format!("I.{}", name),
            Location::String(name) => format!("S.{}", name),
            Location::Test => "T.test".to_string(),
        }
    }

    pub fn type_id(&self, qualified_identifier: &str) -> TypeID {
        TypeID(format!("{}.{}", self.prefix(), qualified_identifier))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// The textual `"<location-prefix>.<qualifiedIdentifier>"` name used
/// to canonically identify composite/interface types (§3.1).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeID(pub String);

impl fmt::Display for TypeID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An 8-byte, big-endian account address (§3.2).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 8]);

impl Address {
    pub const LENGTH: usize = 8;

    pub fn zero() -> Address {
        Address([0; 8])
    }

    /// Construct an address from an integer, requiring
    /// `0 <= v <= 2^64 - 1` (§3.3). The parameter is already a `u64`
    /// so the only possible violation on this type is none; wider
    /// integer literals are range-checked by the caller before
    /// reaching here (see `Value::address_from_integer`).
    pub fn from_u64(v: u64) -> Address {
        Address(v.to_be_bytes())
    }

    pub fn to_hex_no_prefix(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex_no_prefix())
    }
}

/// A storage path: `{domain, identifier}` (§3.2).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Path {
    pub domain: PathDomain,
    pub identifier: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathDomain {
    Storage,
    Public,
    Private,
}

impl PathDomain {
    pub fn identifier(&self) -> &'static str {
        match self {
            PathDomain::Storage => "storage",
            PathDomain::Public => "public",
            PathDomain::Private => "private",
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.domain.identifier(), self.identifier)
    }
}
