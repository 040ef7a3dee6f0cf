// The closed-sum runtime value universe (§3.2, §4.1).
//
// `Value` is a tagged union, not an inheritance hierarchy: every
// variant's behavior is a function over its own data plus a
// `TypeRegistry` lookup, the same shape the teacher uses for its VM
// `Value`/`operator!` dispatch in `vm.rs`. Mutable containers
// (`Array`, `Dictionary`, `Composite`) use `Rc<RefCell<_>>` so that
// aliasing a struct or copying a reference shares the same backing
// store the way the teacher's `Env<T>` shares scope state.

mod array;
mod capability;
mod composite;
mod dictionary;
mod function;
mod range;
mod reference;

pub use array::ArrayValue;
pub use capability::CapabilityValue;
pub use composite::CompositeValue;
pub use dictionary::{DictKey, DictionaryValue};
pub use function::{FunctionRepr, FunctionValue, HostFunction};
pub use range::{RangeIter, RangeValue};
pub use reference::{Referent, ReferenceValue, Slot};

use std::fmt;
use std::rc::Rc;
use std::string::String;

use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use crate::elaboration::TypeRegistry;
use crate::errors::{Result, ValueError};
use crate::location::{Address, Path};
use crate::numeric::Numeric;
use crate::static_type::{CompositeKind, StaticType};

#[derive(Clone)]
pub enum Value {
    Bool(bool),
    Void,
    Nil,
    Some(Box<Value>),
    String(Rc<str>),
    /// A single extended grapheme cluster, NFC-normalized at
    /// construction so `==` is ordinary string equality (§3.2).
    Character(Rc<str>),
    Address(Address),
    Path(Path),
    Numeric(Numeric),
    Array(Rc<std::cell::RefCell<ArrayValue>>),
    Dictionary(Rc<std::cell::RefCell<DictionaryValue>>),
    Composite(Rc<std::cell::RefCell<CompositeValue>>),
    Reference(ReferenceValue),
    Capability(CapabilityValue),
    Function(FunctionValue),
    TypeValue(StaticType),
    InclusiveRange(Rc<RangeValue>),
}

impl Value {
    /// NFC-normalizes `s` so that canonically equivalent strings
    /// compare equal (§3.2).
    pub fn string(s: &str) -> Value {
        Value::String(Rc::from(s.nfc().collect::<String>()))
    }

    /// Fails unless `s` is exactly one extended grapheme cluster
    /// (§3.2 "Character").
    pub fn character(s: &str) -> Result<Value> {
        let normalized: String = s.nfc().collect();
        if normalized.graphemes(true).count() != 1 {
            return Err(ValueError::Stringification("character literal is not a single grapheme cluster").into());
        }
        Ok(Value::Character(Rc::from(normalized)))
    }

    /// Constructs `Address(v)` from an arbitrary-width integer,
    /// requiring `0 <= v <= 2^64 - 1` (§3.3 "Address canonicalization").
    pub fn address_from_integer(n: &Numeric) -> Result<Value> {
        use num_traits::{Signed, ToPrimitive};
        let v = n.as_bigint();
        if v.is_negative() {
            return Err(ValueError::Underflow.into());
        }
        let raw = v.to_u64().ok_or(ValueError::Overflow)?;
        Ok(Value::Address(Address::from_u64(raw)))
    }

    pub fn some(inner: Value) -> Value {
        Value::Some(Box::new(inner))
    }

    /// The declared static type a value of this shape carries at
    /// runtime, used for container-mutation and transfer checks
    /// (§3.3, §4.1).
    pub fn static_type(&self, registry: &TypeRegistry) -> StaticType {
        use Value::*;
        match self {
            Bool(_) => StaticType::Bool,
            Void => StaticType::Void,
            Nil => StaticType::Optional(Rc::new(StaticType::Never)),
            Some(inner) => StaticType::optional(inner.static_type(registry)),
            String(_) => StaticType::String,
            Character(_) => StaticType::Character,
            Address(_) => StaticType::Address,
            Path(_) => StaticType::Path,
            Numeric(n) => StaticType::Numeric(n.kind()),
            Array(a) => {
                let a = a.borrow();
                match a.constant_size {
                    std::option::Option::Some(size) => StaticType::ConstantSizedArray {
                        element: Rc::new(a.element_type.clone()),
                        size,
                    },
                    None => StaticType::variable_array(a.element_type.clone()),
                }
            }
            Dictionary(d) => {
                let d = d.borrow();
                StaticType::dictionary(d.key_type.clone(), d.value_type.clone())
            }
            Composite(c) => {
                let c = c.borrow();
                StaticType::Composite { id: c.type_id.clone(), kind: c.kind }
            }
            Reference(r) => StaticType::Reference {
                authorization: r.authorization,
                referenced: Rc::new(r.borrowed_type.clone()),
            },
            Capability(cap) => StaticType::Capability(cap.borrow_type()),
            Function(f) => f.signature.clone(),
            TypeValue(_) => StaticType::Meta,
            InclusiveRange(r) => StaticType::InclusiveRange(Rc::new(StaticType::Numeric(r.element_type))),
        }
    }

    pub fn is_resource(&self, registry: &TypeRegistry) -> bool {
        self.static_type(registry).is_resource_kinded(registry)
    }

    /// Total structural equality (§4.1): values of incompatible
    /// shapes compare unequal rather than erroring, matching the
    /// teacher's `Value::eq` fallback in `vm.rs`.
    pub fn equals(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Bool(a), Bool(b)) => a == b,
            (Void, Void) => true,
            (Nil, Nil) => true,
            (Some(a), Some(b)) => a.equals(b),
            (String(a), String(b)) => a == b,
            (Character(a), Character(b)) => a == b,
            (Address(a), Address(b)) => a == b,
            (Path(a), Path(b)) => a == b,
            (Numeric(a), Numeric(b)) => a.equals(b),
            (Array(a), Array(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.elements.len() == b.elements.len()
                    && a.elements.iter().zip(b.elements.iter()).all(|(x, y)| x.equals(y))
            }
            (Dictionary(a), Dictionary(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.entries.len() == b.entries.len()
                    && a.entries.iter().all(|(k, v)| {
                        b.entries.get(k).map(|ov| ov.equals(v)).unwrap_or(false)
                    })
            }
            (Composite(a), Composite(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (ca, cb) = (a.borrow(), b.borrow());
                if ca.kind != CompositeKind::Enum || cb.kind != CompositeKind::Enum {
                    return false;
                }
                ca.type_id == cb.type_id
                    && match (ca.fields.get("rawValue"), cb.fields.get("rawValue")) {
                        (std::option::Option::Some(x), std::option::Option::Some(y)) => x.equals(y),
                        _ => false,
                    }
            }
            (TypeValue(a), TypeValue(b)) => a == b,
            (InclusiveRange(a), InclusiveRange(b)) => {
                Rc::ptr_eq(a, b) || (a.start.equals(&b.start) && a.end.equals(&b.end) && a.step.equals(&b.step))
            }
            (Capability(a), Capability(b)) => a == b,
            _ => false,
        }
    }

    /// The value-transfer operation every assignment, parameter
    /// binding, container write and return funnels through (§4.1).
    /// Resource-kinded composites and resource-kinded arrays/
    /// dictionaries move wholesale (the shared backing store follows
    /// the value, rewriting its owner); everything else receives a
    /// structural copy with its own elements individually
    /// transferred, so aliasing a struct never lets a later mutation
    /// of the source affect the destination.
    pub fn transfer(&self, owner: Option<Address>, registry: &TypeRegistry) -> Result<Value> {
        use Value::*;
        match self {
            Array(arr) => {
                let a = arr.borrow();
                if a.element_type.is_resource_kinded(registry) {
                    a.owner.set(owner);
                    drop(a);
                    Ok(self.clone())
                } else {
                    let mut elements = Vec::with_capacity(a.elements.len());
                    for e in &a.elements {
                        elements.push(e.transfer(owner, registry)?);
                    }
                    let new = ArrayValue {
                        element_type: a.element_type.clone(),
                        constant_size: a.constant_size,
                        elements,
                        owner: std::cell::Cell::new(owner),
                    };
                    Ok(Value::Array(Rc::new(std::cell::RefCell::new(new))))
                }
            }
            Dictionary(dict) => {
                let d = dict.borrow();
                if d.value_type.is_resource_kinded(registry) {
                    d.owner.set(owner);
                    drop(d);
                    Ok(self.clone())
                } else {
                    let mut entries = indexmap::IndexMap::with_capacity(d.entries.len());
                    for (k, v) in d.entries.iter() {
                        entries.insert(k.clone(), v.transfer(owner, registry)?);
                    }
                    let new = DictionaryValue {
                        key_type: d.key_type.clone(),
                        value_type: d.value_type.clone(),
                        entries,
                        owner: std::cell::Cell::new(owner),
                    };
                    Ok(Value::Dictionary(Rc::new(std::cell::RefCell::new(new))))
                }
            }
            Composite(comp) => {
                let is_resource = comp.borrow().kind.is_resource();
                if is_resource {
                    comp.borrow_mut().owner = owner;
                    Ok(self.clone())
                } else {
                    let c = comp.borrow();
                    let mut fields = indexmap::IndexMap::with_capacity(c.fields.len());
                    for (k, v) in c.fields.iter() {
                        fields.insert(k.clone(), v.transfer(owner, registry)?);
                    }
                    let new = CompositeValue {
                        location: c.location.clone(),
                        type_id: c.type_id.clone(),
                        kind: c.kind,
                        fields,
                        functions: Rc::clone(&c.functions),
                        uuid: c.uuid,
                        owner,
                    };
                    Ok(Value::Composite(Rc::new(std::cell::RefCell::new(new))))
                }
            }
            Some(inner) => Ok(Value::some(inner.transfer(owner, registry)?)),
            other => Ok(other.clone()),
        }
    }

    /// Checks that `self`'s runtime type is a subtype of `declared`
    /// before it may flow into a slot, parameter or container cell
    /// of that type (§3.3).
    pub fn check_transfer_type(&self, declared: &StaticType, registry: &TypeRegistry) -> Result<()> {
        let actual = self.static_type(registry);
        if actual.is_subtype(declared, registry) {
            Ok(())
        } else {
            Err(ValueError::ValueTransferType { expected: declared.clone(), actual }.into())
        }
    }

    /// `toString()` / string-interpolation representation (§4.1,
    /// §6.3), bounded to a fixed container depth so a cyclic struct
    /// graph cannot recurse forever.
    pub fn string_value(&self) -> String {
        self.string_value_at_depth(16)
    }

    fn string_value_at_depth(&self, depth: u32) -> String {
        use Value::*;
        if depth == 0 {
            return "...".to_string();
        }
        match self {
            Bool(b) => b.to_string(),
            Void => "()".to_string(),
            Nil => "nil".to_string(),
            Some(inner) => inner.string_value_at_depth(depth - 1),
            String(s) => s.to_string(),
            Character(c) => c.to_string(),
            Address(a) => a.to_string(),
            Path(p) => p.to_string(),
            Numeric(n) => n.to_display_string(),
            Array(arr) => {
                let a = arr.borrow();
                let items: Vec<std::string::String> = a.elements.iter().map(|v| v.string_value_at_depth(depth - 1)).collect();
                format!("[{}]", items.join(", "))
            }
            Dictionary(dict) => {
                let d = dict.borrow();
                let items: Vec<std::string::String> = d
                    .entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.0.string_value_at_depth(depth - 1), v.string_value_at_depth(depth - 1)))
                    .collect();
                format!("{{{}}}", items.join(", "))
            }
            Composite(comp) => {
                let c = comp.borrow();
                let fields: Vec<std::string::String> = c
                    .fields
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.string_value_at_depth(depth - 1)))
                    .collect();
                format!("{}({})", c.type_id, fields.join(", "))
            }
            Reference(r) => match r.get() {
                Ok(v) => v.string_value_at_depth(depth - 1),
                Err(_) => "<dangling reference>".to_string(),
            },
            Capability(cap) => format!("Capability({})", cap),
            Function(_) => "Function(...)".to_string(),
            TypeValue(t) => format!("Type<{}>", t),
            InclusiveRange(r) => format!("{}...{}", r.start.to_display_string(), r.end.to_display_string()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.string_value())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.equals(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::NumericKind;

    #[test]
    fn character_rejects_multi_grapheme_text() {
        assert!(Value::character("ab").is_err());
        assert!(Value::character("a").is_ok());
    }

    #[test]
    fn numeric_equality_requires_same_kind() {
        let a = Value::Numeric(Numeric::from_i64(NumericKind::Int8, 1).unwrap());
        let b = Value::Numeric(Numeric::from_i64(NumericKind::Int16, 1).unwrap());
        assert!(!a.equals(&b));
    }

    #[test]
    fn optional_wraps_and_unwraps_equality() {
        let a = Value::some(Value::Bool(true));
        let b = Value::some(Value::Bool(true));
        assert!(a.equals(&b));
        assert!(!a.equals(&Value::Nil));
    }

    #[test]
    fn string_equality_is_nfc_normalized() {
        let a = Value::string("e\u{0301}"); // e + combining acute
        let b = Value::string("\u{00e9}"); // precomposed e-acute
        assert!(a.equals(&b));
    }
}
