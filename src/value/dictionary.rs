// Dictionary storage (§3.2 "Dictionary").
//
// Cadence restricts dictionary keys to the small set of "hashable"
// value shapes (booleans, characters, strings, addresses, paths,
// numerics, enum cases); `DictKey` gives that subset a `Hash`/`Eq`
// derived from the same canonical string form `Value::string_value`
// already produces, rather than introducing a second equality
// notion.

use std::cell::Cell;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;

use crate::elaboration::TypeRegistry;
use crate::errors::{Result, ValueError};
use crate::location::Address;
use crate::static_type::StaticType;

use super::Value;

#[derive(Clone, Debug)]
pub struct DictKey(pub Value);

impl PartialEq for DictKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.equals(&other.0)
    }
}

impl Eq for DictKey {}

impl Hash for DictKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(&self.0).hash(state);
        self.0.string_value().hash(state);
    }
}

#[derive(Clone, Debug)]
pub struct DictionaryValue {
    pub key_type: StaticType,
    pub value_type: StaticType,
    pub entries: IndexMap<DictKey, Value>,
    pub owner: Cell<Option<Address>>,
}

impl DictionaryValue {
    pub fn new(key_type: StaticType, value_type: StaticType) -> DictionaryValue {
        DictionaryValue { key_type, value_type, entries: IndexMap::new(), owner: Cell::new(None) }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.get(&DictKey(key.clone()))
    }

    fn check_key(&self, key: &Value, registry: &TypeRegistry) -> Result<()> {
        key.check_transfer_type(&self.key_type, registry).map_err(|_| {
            ValueError::ContainerMutation { expected: self.key_type.clone(), actual: key.static_type(registry) }
        })?;
        Ok(())
    }

    fn check_value(&self, value: &Value, registry: &TypeRegistry) -> Result<()> {
        value.check_transfer_type(&self.value_type, registry).map_err(|_| {
            ValueError::ContainerMutation { expected: self.value_type.clone(), actual: value.static_type(registry) }
        })?;
        Ok(())
    }

    /// Inserts, returning the previous value at `key` if any (§4.1).
    pub fn insert(&mut self, key: Value, value: Value, registry: &TypeRegistry) -> Result<Option<Value>> {
        self.check_key(&key, registry)?;
        self.check_value(&value, registry)?;
        let transferred = value.transfer(self.owner.get(), registry)?;
        Ok(self.entries.insert(DictKey(key), transferred))
    }

    /// Removes and returns the value at `key`, the resource-safe way
    /// to take a value out without leaving a reachable stale slot.
    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        self.entries.shift_remove(&DictKey(key.clone()))
    }

    pub fn keys(&self) -> Vec<Value> {
        self.entries.keys().map(|k| k.0.clone()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries.values().cloned().collect()
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.entries.contains_key(&DictKey(key.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::{Numeric, NumericKind};

    #[test]
    fn insert_returns_previous_value() {
        let registry = TypeRegistry::new();
        let mut dict = DictionaryValue::new(StaticType::String, StaticType::Numeric(NumericKind::Int8));
        let key = Value::string("a");
        let v1 = Value::Numeric(Numeric::from_i64(NumericKind::Int8, 1).unwrap());
        let v2 = Value::Numeric(Numeric::from_i64(NumericKind::Int8, 2).unwrap());
        assert!(dict.insert(key.clone(), v1, &registry).unwrap().is_none());
        let prior = dict.insert(key, v2, &registry).unwrap();
        assert!(prior.is_some());
    }

    #[test]
    fn remove_takes_the_entry_out() {
        let registry = TypeRegistry::new();
        let mut dict = DictionaryValue::new(StaticType::String, StaticType::Bool);
        dict.insert(Value::string("k"), Value::Bool(true), &registry).unwrap();
        let removed = dict.remove(&Value::string("k"));
        assert!(removed.is_some());
        assert!(dict.is_empty());
    }
}
