// An in-memory reference host (§5, §6.1), used by this crate's own
// scenario tests and a reasonable starting point for an embedder
// building a first integration.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::activation::Activation;
use crate::ast::Program;
use crate::errors::HostError;
use crate::location::{Address, Location, Path};
use crate::value::Value;

use super::{BaseActivationHandler, ContractValueHandler, ImportLocationHandler, StorageReader, StorageWriter, UUIDHandler};

#[derive(Default)]
pub struct TestHost {
    programs: HashMap<Location, Rc<Program>>,
    contracts: RefCell<HashMap<Location, Value>>,
    storage: RefCell<HashMap<(Address, Path), Value>>,
    next_uuid: Cell<u64>,
}

impl TestHost {
    pub fn new() -> TestHost {
        TestHost::default()
    }

    pub fn register_program(&mut self, location: Location, program: Program) {
        self.programs.insert(location, Rc::new(program));
    }

    pub fn set_contract_value(&self, location: Location, value: Value) {
        self.contracts.borrow_mut().insert(location, value);
    }
}

impl ImportLocationHandler for TestHost {
    fn resolve(&self, location: &Location) -> std::result::Result<Rc<Program>, HostError> {
        self.programs.get(location).cloned().ok_or_else(|| HostError::UnresolvedImport(location.clone()))
    }
}

impl ContractValueHandler for TestHost {
    fn contract_value(&self, location: &Location) -> std::result::Result<Option<Value>, HostError> {
        Ok(self.contracts.borrow().get(location).cloned())
    }
}

impl UUIDHandler for TestHost {
    fn next_uuid(&self) -> u64 {
        let id = self.next_uuid.get();
        self.next_uuid.set(id + 1);
        id
    }
}

impl BaseActivationHandler for TestHost {
    fn base_activation(&self, _location: &Location) -> Rc<Activation> {
        Activation::root()
    }
}

impl StorageReader for TestHost {
    fn read(&self, address: Address, path: &Path) -> std::result::Result<Option<Value>, HostError> {
        Ok(self.storage.borrow().get(&(address, path.clone())).cloned())
    }
}

impl StorageWriter for TestHost {
    fn write(&mut self, address: Address, path: &Path, value: Option<Value>) -> std::result::Result<(), HostError> {
        let key = (address, path.clone());
        match value {
            Some(v) => {
                self.storage.borrow_mut().insert(key, v);
            }
            None => {
                self.storage.borrow_mut().remove(&key);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_handler_hands_out_increasing_ids() {
        let host = TestHost::new();
        assert_eq!(host.next_uuid(), 0);
        assert_eq!(host.next_uuid(), 1);
    }

    #[test]
    fn unresolved_import_is_reported_by_location() {
        let host = TestHost::new();
        let location = Location::String("missing".to_string());
        assert!(matches!(host.resolve(&location), Err(HostError::UnresolvedImport(_))));
    }
}
