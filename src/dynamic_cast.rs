// The dynamic-cast algebra: `as?` (failable) and `as!` (force)
// (§4.3).
//
// Casts are not coercions: a `Value` already carries its own concrete
// runtime type (a `Numeric`'s `kind`, a composite's `type_id`), so
// `as?`/`as!` never convert between numeric kinds or reshape data —
// they test whether that existing runtime type matches, or
// conforms to, the requested target, matching the teacher's
// `typechecker.rs` shape of recursive structural matching that
// bottoms out in a typed failure rather than a panic.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::elaboration::TypeRegistry;
use crate::errors::{CastError, Result};
use crate::static_type::StaticType;
use crate::value::{ArrayValue, DictionaryValue, ReferenceValue, Value};

/// `as?`: `None` on mismatch, never an error.
pub fn try_cast(value: &Value, target: &StaticType, registry: &TypeRegistry) -> Option<Value> {
    use StaticType::*;
    use Value as V;

    match (value, target) {
        (V::Nil, Optional(_)) => Some(V::Nil),
        (V::Nil, _) => None,
        (V::Some(inner), Optional(t)) => try_cast(inner, t, registry).map(V::some),
        (V::Some(_), _) => None,
        (v, Optional(t)) => try_cast(v, t, registry).map(V::some),

        (V::Array(arr), VariableSizedArray(elem_ty)) => cast_array(arr, elem_ty, None, registry),
        (V::Array(arr), ConstantSizedArray { element, size }) => cast_array(arr, element, Some(*size), registry),
        (V::Dictionary(dict), Dictionary { key, value }) => cast_dictionary(dict, key, value, registry),

        (V::Composite(c), Composite { id, .. }) => {
            if &c.borrow().type_id == id {
                Some(value.clone())
            } else {
                None
            }
        }
        (V::Composite(c), Restricted { concrete, restrictions }) => {
            let type_id = c.borrow().type_id.clone();
            let concrete_ok = concrete.as_ref().map(|cid| cid == &type_id).unwrap_or(true);
            if concrete_ok && restrictions.iter().all(|r| registry.conforms(&type_id, r)) {
                Some(value.clone())
            } else {
                None
            }
        }

        (V::Reference(r), Reference { authorization, referenced }) => {
            if !r.authorization.grants(authorization) {
                return None;
            }
            let current = r.get().ok()?;
            try_cast(&current, referenced, registry)?;
            Some(V::Reference(ReferenceValue {
                authorization: *authorization,
                borrowed_type: (**referenced).clone(),
                referent: r.referent.clone(),
            }))
        }

        (V::Capability(cap), Capability(Some(t))) => match cap.borrow_type() {
            Some(bt) if bt.is_subtype(t, registry) => Some(value.clone()),
            _ => None,
        },
        (V::Capability(_), Capability(None)) => Some(value.clone()),

        (V::Function(f), Function { .. }) => {
            if f.signature.is_subtype(target, registry) {
                Some(value.clone())
            } else {
                None
            }
        }

        (v, AnyStruct) if !v.is_resource(registry) => Some(v.clone()),
        (v, AnyResource) if v.is_resource(registry) => Some(v.clone()),

        (v, t) => {
            let actual = v.static_type(registry);
            if actual.is_subtype(t, registry) {
                Some(v.clone())
            } else {
                None
            }
        }
    }
}

fn cast_array(
    arr: &Rc<RefCell<ArrayValue>>,
    elem_ty: &StaticType,
    size: Option<u64>,
    registry: &TypeRegistry,
) -> Option<Value> {
    let a = arr.borrow();
    // A constant-sized array only casts to a constant-sized target of
    // the same size; a variable-sized source only to a variable-sized
    // target (§4.3 "Array").
    if a.constant_size.is_some() != size.is_some() {
        return None;
    }
    if let Some(expected_size) = size {
        if a.len() as u64 != expected_size {
            return None;
        }
    }
    if a.element_type == *elem_ty {
        return Some(Value::Array(Rc::clone(arr)));
    }
    // A genuine widening (e.g. a `[String]` value flowing into an
    // `[AnyStruct]`-typed binding) must NOT relabel the array's own
    // element type: container-mutation checks (`ArrayValue::append`
    // et al.) run against what the array actually holds, not against
    // whatever wider static type the binding site just gave it. The
    // one case that legitimately adopts the target label wholesale is
    // an empty `[]` literal, whose placeholder `Never` element type
    // never described anything real to begin with.
    if a.element_type != StaticType::Never && a.element_type.is_subtype(elem_ty, registry) {
        return Some(Value::Array(Rc::clone(arr)));
    }
    let mut casted = Vec::with_capacity(a.elements.len());
    for element in a.elements.iter() {
        casted.push(try_cast(element, elem_ty, registry)?);
    }
    Some(Value::Array(Rc::new(RefCell::new(ArrayValue {
        element_type: elem_ty.clone(),
        constant_size: size,
        elements: casted,
        owner: Cell::new(a.owner.get()),
    }))))
}

fn cast_dictionary(
    dict: &Rc<RefCell<DictionaryValue>>,
    key_ty: &StaticType,
    value_ty: &StaticType,
    registry: &TypeRegistry,
) -> Option<Value> {
    let d = dict.borrow();
    if d.key_type == *key_ty && d.value_type == *value_ty {
        return Some(Value::Dictionary(Rc::clone(dict)));
    }
    // See `cast_array`: keep the dictionary's own key/value type on a
    // genuine widening; only an empty `{}` literal's placeholder
    // `Never` types get replaced outright.
    if d.key_type != StaticType::Never
        && d.value_type != StaticType::Never
        && d.key_type.is_subtype(key_ty, registry)
        && d.value_type.is_subtype(value_ty, registry)
    {
        return Some(Value::Dictionary(Rc::clone(dict)));
    }
    let mut entries = indexmap::IndexMap::with_capacity(d.entries.len());
    for (k, v) in d.entries.iter() {
        let casted_key = try_cast(&k.0, key_ty, registry)?;
        let casted_value = try_cast(v, value_ty, registry)?;
        entries.insert(crate::value::DictKey(casted_key), casted_value);
    }
    Some(Value::Dictionary(Rc::new(RefCell::new(DictionaryValue {
        key_type: key_ty.clone(),
        value_type: value_ty.clone(),
        entries,
        owner: Cell::new(d.owner.get()),
    }))))
}

/// `as!`: fails loudly rather than producing `nil` (§4.3).
pub fn force_cast(value: &Value, target: &StaticType, registry: &TypeRegistry) -> Result<Value> {
    try_cast(value, target, registry).ok_or_else(|| {
        CastError::ForceCastTypeMismatch { expected: target.clone(), actual: value.static_type(registry) }.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::{Numeric, NumericKind};
    use crate::static_type::CompositeKind;
    use crate::value::CompositeValue;

    #[test]
    fn numeric_cast_requires_exact_kind() {
        let registry = TypeRegistry::new();
        let v = Value::Numeric(Numeric::from_i64(NumericKind::Int8, 1).unwrap());
        assert!(try_cast(&v, &StaticType::Numeric(NumericKind::Int8), &registry).is_some());
        assert!(try_cast(&v, &StaticType::Numeric(NumericKind::Int16), &registry).is_none());
    }

    #[test]
    fn nil_casts_to_any_optional_but_not_to_concrete_types() {
        let registry = TypeRegistry::new();
        assert!(try_cast(&Value::Nil, &StaticType::optional(StaticType::Bool), &registry).is_some());
        assert!(try_cast(&Value::Nil, &StaticType::Bool, &registry).is_none());
    }

    #[test]
    fn any_struct_rejects_resources() {
        let registry = TypeRegistry::new();
        let composite = crate::value::CompositeValue::new(
            crate::location::Location::Test,
            crate::location::TypeID("T.test.R".to_string()),
            CompositeKind::Resource,
            Rc::new(indexmap::IndexMap::new()),
            Some(1),
        );
        let v = Value::Composite(Rc::new(RefCell::new(composite)));
        assert!(try_cast(&v, &StaticType::AnyStruct, &registry).is_none());
        assert!(try_cast(&v, &StaticType::AnyResource, &registry).is_some());
    }

    #[test]
    fn force_cast_mismatch_is_an_error() {
        let registry = TypeRegistry::new();
        let v = Value::Bool(true);
        assert!(force_cast(&v, &StaticType::String, &registry).is_err());
    }

    #[test]
    fn restricted_any_resource_does_not_cast_to_a_nonconforming_sibling() {
        use crate::elaboration::TypeDef;
        use crate::location::{Location, TypeID};

        let mut registry = TypeRegistry::new();
        let ri = TypeID("T.test.RI".to_string());
        let r = TypeID("T.test.R".to_string());
        let t = TypeID("T.test.T".to_string());

        registry.register(TypeDef::new(ri.clone(), CompositeKind::ResourceInterface));
        let mut r_def = TypeDef::new(r.clone(), CompositeKind::Resource);
        r_def.conformances.push(ri.clone());
        registry.register(r_def);
        let mut t_def = TypeDef::new(t.clone(), CompositeKind::Resource);
        t_def.conformances.push(ri.clone());
        registry.register(t_def);

        let r_value = Value::Composite(Rc::new(RefCell::new(CompositeValue::new(
            Location::Test,
            r,
            CompositeKind::Resource,
            Rc::new(indexmap::IndexMap::new()),
            Some(1),
        ))));

        let target = StaticType::Composite { id: t, kind: CompositeKind::Resource };
        assert!(try_cast(&r_value, &target, &registry).is_none());
        assert!(force_cast(&r_value, &target, &registry).is_err());
    }
}
