// Composite values: structs, resources, contracts, enum cases,
// attachments and events (§3.2 "Composite").

use std::rc::Rc;

use indexmap::IndexMap;

use crate::location::{Address, Location, TypeID};
use crate::static_type::CompositeKind;

use super::function::FunctionValue;
use super::Value;

#[derive(Clone, Debug)]
pub struct CompositeValue {
    pub location: Location,
    pub type_id: TypeID,
    pub kind: CompositeKind,
    pub fields: IndexMap<String, Value>,
    /// Bound member functions, shared across every instance of the
    /// same composite rather than duplicated per value.
    pub functions: Rc<IndexMap<String, FunctionValue>>,
    /// Assigned once at `create` time for resources (§3.2); `None`
    /// for struct/contract/enum values, which have no uuid.
    pub uuid: Option<u64>,
    pub owner: Option<Address>,
}

impl CompositeValue {
    pub fn new(
        location: Location,
        type_id: TypeID,
        kind: CompositeKind,
        functions: Rc<IndexMap<String, FunctionValue>>,
        uuid: Option<u64>,
    ) -> CompositeValue {
        CompositeValue { location, type_id, kind, fields: IndexMap::new(), functions, uuid, owner: None }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set_field(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    /// Removes and returns a field value, the way a resource field is
    /// taken out with `<- self.field` without leaving a stale entry
    /// (§9.1 "resource linearity").
    pub fn take_field(&mut self, name: &str) -> Option<Value> {
        self.fields.shift_remove(name)
    }

    pub fn function(&self, name: &str) -> Option<FunctionValue> {
        self.functions.get(name).cloned()
    }

    pub fn raw_value(&self) -> Option<&Value> {
        self.fields.get("rawValue")
    }
}
