// Runtime-inspectable type terms (§2 "StaticType", §4.3).
//
// `StaticType` is what values and containers carry at runtime: the
// declared element type of an array, the borrow type of a reference,
// the target of a cast. It is the vocabulary the subtype judgement
// and the dynamic-cast algebra (`dynamic_cast.rs`) are defined over.

use std::fmt;
use std::rc::Rc;

use enumflags2::{bitflags, BitFlags};

use crate::location::TypeID;
use crate::numeric::NumericKind;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StaticType {
    Void,
    Never,
    Bool,
    Character,
    String,
    Address,
    Path,
    Numeric(NumericKind),
    AnyStruct,
    AnyResource,
    Optional(Rc<StaticType>),
    VariableSizedArray(Rc<StaticType>),
    ConstantSizedArray {
        element: Rc<StaticType>,
        size: u64,
    },
    Dictionary {
        key: Rc<StaticType>,
        value: Rc<StaticType>,
    },
    /// A concrete, unrestricted nominal composite or enum type.
    Composite {
        id: TypeID,
        kind: CompositeKind,
    },
    /// `AnyStruct{I...}` / `AnyResource{I...}` / `C{I...}`: a
    /// structural restriction, `concrete = None` for the `Any*` base
    /// (§4.3 "Restricted").
    Restricted {
        concrete: Option<TypeID>,
        restrictions: Vec<TypeID>,
    },
    Function {
        parameters: Vec<StaticType>,
        return_type: Rc<StaticType>,
    },
    Reference {
        authorization: Authorization,
        referenced: Rc<StaticType>,
    },
    Capability(Option<Rc<StaticType>>),
    InclusiveRange(Rc<StaticType>),
    /// The type of a first-class `TypeValue` (Cadence's `Type`).
    Meta,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CompositeKind {
    Struct,
    Resource,
    Contract,
    Enum,
    Attachment,
    Event,
    StructInterface,
    ResourceInterface,
    ContractInterface,
}

impl CompositeKind {
    pub fn is_interface(&self) -> bool {
        matches!(
            self,
            CompositeKind::StructInterface
                | CompositeKind::ResourceInterface
                | CompositeKind::ContractInterface
        )
    }

    pub fn is_resource(&self) -> bool {
        matches!(self, CompositeKind::Resource | CompositeKind::Attachment)
    }
}

/// Reference authorization: a set of entitlements, or the
/// unauthorized (empty) set. Modeled as a bitflag set the way the
/// teacher models `TypeTag` for its VM value kinds, since
/// entitlements are exactly a small closed set of named bits in
/// practice; `Other` covers entitlements declared by user programs
/// that this crate's fixed vocabulary doesn't enumerate.
#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Entitlement {
    Mutate,
    Insert,
    Remove,
    Other,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Authorization(pub BitFlags<Entitlement>);

impl Authorization {
    pub fn unauthorized() -> Authorization {
        Authorization(BitFlags::empty())
    }

    pub fn is_unauthorized(&self) -> bool {
        self.0.is_empty()
    }

    /// `self >= other`: `self` grants at least every entitlement
    /// `other` requires (§4.3 "Reference").
    pub fn grants(&self, other: &Authorization) -> bool {
        other.0.is_empty() || self.0.contains(other.0)
    }
}

impl StaticType {
    pub fn numeric(kind: NumericKind) -> StaticType {
        StaticType::Numeric(kind)
    }

    pub fn optional(inner: StaticType) -> StaticType {
        StaticType::Optional(Rc::new(inner))
    }

    pub fn variable_array(element: StaticType) -> StaticType {
        StaticType::VariableSizedArray(Rc::new(element))
    }

    pub fn dictionary(key: StaticType, value: StaticType) -> StaticType {
        StaticType::Dictionary {
            key: Rc::new(key),
            value: Rc::new(value),
        }
    }

    pub fn is_resource_kinded(&self, registry: &crate::elaboration::TypeRegistry) -> bool {
        match self {
            StaticType::AnyResource => true,
            StaticType::Composite { kind, .. } => kind.is_resource(),
            StaticType::Restricted { concrete: Some(id), .. } => registry
                .get(id)
                .map(|def| def.kind.is_resource())
                .unwrap_or(false),
            StaticType::Restricted { concrete: None, .. } => false,
            StaticType::Optional(inner) => inner.is_resource_kinded(registry),
            StaticType::VariableSizedArray(inner) | StaticType::ConstantSizedArray { element: inner, .. } => {
                inner.is_resource_kinded(registry)
            }
            StaticType::Dictionary { value, .. } => value.is_resource_kinded(registry),
            _ => false,
        }
    }

    /// The structural subtype judgement used at every value-transfer
    /// and container-mutation boundary (§3.3, §4.2.4). This is
    /// distinct from, and weaker than, the cast judgement in
    /// `dynamic_cast.rs`: it is used to decide whether a value may
    /// flow into a slot of a *declared* type, not whether a runtime
    /// value matches an explicit cast target.
    pub fn is_subtype(&self, other: &StaticType, registry: &crate::elaboration::TypeRegistry) -> bool {
        use StaticType::*;
        if self == other {
            return true;
        }
        match (self, other) {
            (Never, _) => true,
            (_, AnyStruct) => !self.is_resource_kinded(registry),
            (_, AnyResource) => self.is_resource_kinded(registry),
            (Optional(a), Optional(b)) => a.is_subtype(b, registry),
            (a, Optional(b)) => a.is_subtype(b, registry),
            (VariableSizedArray(a), VariableSizedArray(b)) => a.is_subtype(b, registry),
            (ConstantSizedArray { element: a, size: sa }, ConstantSizedArray { element: b, size: sb }) => {
                sa == sb && a.is_subtype(b, registry)
            }
            (Dictionary { key: ka, value: va }, Dictionary { key: kb, value: vb }) => {
                ka.is_subtype(kb, registry) && va.is_subtype(vb, registry)
            }
            (Composite { id, .. }, Restricted { concrete, restrictions }) => {
                concrete.as_ref().map(|c| c == id).unwrap_or(true)
                    && restrictions.iter().all(|r| registry.conforms(id, r))
            }
            (Composite { id, .. }, Composite { id: other_id, .. }) => id == other_id,
            (Restricted { concrete: ca, restrictions: ra }, Restricted { concrete: cb, restrictions: rb }) => {
                ca == cb && rb.iter().all(|r| ra.contains(r))
            }
            (Function { parameters: pa, return_type: ra }, Function { parameters: pb, return_type: rb }) => {
                pa.len() == pb.len()
                    && pa.iter().zip(pb.iter()).all(|(a, b)| b.is_subtype(a, registry))
                    && ra.is_subtype(rb, registry)
            }
            (Reference { authorization: auth_a, referenced: ra }, Reference { authorization: auth_b, referenced: rb }) => {
                auth_a.grants(auth_b) && ra.is_subtype(rb, registry)
            }
            (Capability(Some(a)), Capability(Some(b))) => a.is_subtype(b, registry),
            (Capability(None), Capability(_)) => true,
            (InclusiveRange(a), InclusiveRange(b)) => a == b,
            (Meta, Meta) => true,
            _ => false,
        }
    }
}

impl fmt::Display for StaticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use StaticType::*;
        match self {
            Void => write!(f, "Void"),
            Never => write!(f, "Never"),
            Bool => write!(f, "Bool"),
            Character => write!(f, "Character"),
            String => write!(f, "String"),
            Address => write!(f, "Address"),
            Path => write!(f, "Path"),
            Numeric(kind) => write!(f, "{}", kind.name()),
            AnyStruct => write!(f, "AnyStruct"),
            AnyResource => write!(f, "AnyResource"),
            Optional(inner) => write!(f, "{}?", inner),
            VariableSizedArray(inner) => write!(f, "[{}]", inner),
            ConstantSizedArray { element, size } => write!(f, "[{}; {}]", element, size),
            Dictionary { key, value } => write!(f, "{{{}: {}}}", key, value),
            Composite { id, .. } => write!(f, "{}", id),
            Restricted { concrete, restrictions } => {
                let base = concrete
                    .as_ref()
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "Any".to_string());
                write!(
                    f,
                    "{}{{{}}}",
                    base,
                    restrictions
                        .iter()
                        .map(|r| r.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
            Function { parameters, return_type } => {
                write!(
                    f,
                    "(({}): {})",
                    parameters
                        .iter()
                        .map(|p| p.to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                    return_type
                )
            }
            Reference { authorization, referenced } => {
                if authorization.is_unauthorized() {
                    write!(f, "&{}", referenced)
                } else {
                    write!(f, "auth &{}", referenced)
                }
            }
            Capability(Some(ty)) => write!(f, "Capability<{}>", ty),
            Capability(None) => write!(f, "Capability"),
            InclusiveRange(inner) => write!(f, "InclusiveRange<{}>", inner),
            Meta => write!(f, "Type"),
        }
    }
}
