// Variable- and constant-sized array storage (§3.2 "Array", §4.1
// "Container mutation checks").

use std::cell::Cell;

use crate::elaboration::TypeRegistry;
use crate::errors::{Result, ValueError};
use crate::location::Address;
use crate::static_type::StaticType;

use super::Value;

#[derive(Clone, Debug)]
pub struct ArrayValue {
    pub element_type: StaticType,
    /// `None` for `[T]`, `Some(n)` for `[T; n]`.
    pub constant_size: Option<u64>,
    pub elements: Vec<Value>,
    pub owner: Cell<Option<Address>>,
}

impl ArrayValue {
    pub fn new(element_type: StaticType, constant_size: Option<u64>) -> ArrayValue {
        ArrayValue { element_type, constant_size, elements: Vec::new(), owner: Cell::new(None) }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.elements.get(index)
    }

    /// Every mutation transfers the incoming value first, which is
    /// where the declared-element-type check happens (§4.1).
    fn check_and_transfer(&self, value: Value, registry: &TypeRegistry) -> Result<Value> {
        value.check_transfer_type(&self.element_type, registry).map_err(|_| {
            ValueError::ContainerMutation {
                expected: self.element_type.clone(),
                actual: value.static_type(registry),
            }
        })?;
        value.transfer(self.owner.get(), registry)
    }

    pub fn append(&mut self, value: Value, registry: &TypeRegistry) -> Result<()> {
        if self.constant_size.is_some() {
            return Err(ValueError::ContainerMutation {
                expected: self.element_type.clone(),
                actual: value.static_type(registry),
            }
            .into());
        }
        let transferred = self.check_and_transfer(value, registry)?;
        self.elements.push(transferred);
        Ok(())
    }

    pub fn insert(&mut self, index: usize, value: Value, registry: &TypeRegistry) -> Result<()> {
        let transferred = self.check_and_transfer(value, registry)?;
        self.elements.insert(index, transferred);
        Ok(())
    }

    pub fn set(&mut self, index: usize, value: Value, registry: &TypeRegistry) -> Result<Value> {
        let transferred = self.check_and_transfer(value, registry)?;
        Ok(std::mem::replace(&mut self.elements[index], transferred))
    }

    /// Removes and returns the element, the idiomatic way a resource
    /// is taken out of an array without leaving a stale slot behind
    /// (§9.1 "resource linearity").
    pub fn remove(&mut self, index: usize) -> Value {
        self.elements.remove(index)
    }

    pub fn append_all(&mut self, other: ArrayValue, registry: &TypeRegistry) -> Result<()> {
        for element in other.elements {
            self.append(element, registry)?;
        }
        Ok(())
    }

    pub fn reverse(&self) -> ArrayValue {
        let mut elements = self.elements.clone();
        elements.reverse();
        ArrayValue {
            element_type: self.element_type.clone(),
            constant_size: self.constant_size,
            elements,
            owner: Cell::new(self.owner.get()),
        }
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.elements.iter().any(|e| e.equals(value))
    }

    pub fn first_index(&self, value: &Value) -> Option<usize> {
        self.elements.iter().position(|e| e.equals(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::{Numeric, NumericKind};

    #[test]
    fn append_rejects_wrong_element_type() {
        let registry = TypeRegistry::new();
        let mut array = ArrayValue::new(StaticType::Numeric(NumericKind::Int8), None);
        let result = array.append(Value::Bool(true), &registry);
        assert!(result.is_err());
    }

    #[test]
    fn constant_sized_array_rejects_append() {
        let registry = TypeRegistry::new();
        let mut array = ArrayValue::new(StaticType::Numeric(NumericKind::Int8), Some(2));
        let v = Value::Numeric(Numeric::from_i64(NumericKind::Int8, 1).unwrap());
        assert!(array.append(v, &registry).is_err());
    }

    #[test]
    fn remove_takes_the_element_out() {
        let registry = TypeRegistry::new();
        let mut array = ArrayValue::new(StaticType::Numeric(NumericKind::Int8), None);
        array.append(Value::Numeric(Numeric::from_i64(NumericKind::Int8, 7).unwrap()), &registry).unwrap();
        let removed = array.remove(0);
        assert_eq!(removed.string_value(), "7");
        assert!(array.is_empty());
    }
}
