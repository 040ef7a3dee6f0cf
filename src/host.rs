// The host ABI (§5, §6.1).
//
// The interpreter never touches storage, generates a uuid, or
// resolves an import location on its own; every such effect is
// delegated to traits implemented by whatever embeds this crate (a
// blockchain node, a test harness). `host::testing` is the in-memory
// reference implementation used by this crate's own scenario tests.

pub mod testing;

use std::rc::Rc;

use crate::activation::Activation;
use crate::ast::Program;
use crate::elaboration::TypeRegistry;
use crate::errors::HostError;
use crate::location::{Address, Location, Path};
use crate::value::Value;

/// Resolves an import location to the typed-AST program it names
/// (§5 "program import").
pub trait ImportLocationHandler {
    fn resolve(&self, location: &Location) -> std::result::Result<Rc<Program>, HostError>;
}

/// Reads a contract's persistent singleton value from storage, for
/// locations that designate a deployed contract rather than a bare
/// script (§5 "virtual import").
pub trait ContractValueHandler {
    fn contract_value(&self, location: &Location) -> std::result::Result<Option<Value>, HostError>;
}

/// Assigns a globally unique id the moment a resource is constructed
/// (§3.2 "Composite").
pub trait UUIDHandler {
    fn next_uuid(&self) -> u64;
}

/// Supplies the activation every sub-interpreter for a location
/// starts from, before that location's own top-level declarations are
/// evaluated (§5 "interpreter import", §9.1 "per-location base
/// activations").
pub trait BaseActivationHandler {
    fn base_activation(&self, location: &Location) -> Rc<Activation>;
}

pub trait StorageReader {
    fn read(&self, address: Address, path: &Path) -> std::result::Result<Option<Value>, HostError>;
}

pub trait StorageWriter {
    fn write(&mut self, address: Address, path: &Path, value: Option<Value>) -> std::result::Result<(), HostError>;
}

/// Observation hooks an embedder can use for metering or tracing
/// without the interpreter core depending on any particular metering
/// policy (§6.4).
pub trait Observer {
    fn on_statement(&mut self, _location: &Location) {}
    fn on_loop_iteration(&mut self, _location: &Location) {}
    fn on_function_invocation(&mut self, _type_id: &Option<crate::location::TypeID>) {}
    fn on_meter_computation(&mut self, _kind: &'static str, _amount: u64) {}
}

/// A no-op `Observer`, used when an embedder doesn't need metering.
#[derive(Default)]
pub struct NullObserver;

impl Observer for NullObserver {}

/// Bundles the handlers a running interpreter needs; passed in by the
/// embedder at `invoke` time rather than baked into the interpreter's
/// own constructor, so the same compiled program can run under
/// different hosts (e.g. a test harness swapping in deterministic
/// uuids).
pub struct InterpreterConfig<'a> {
    pub import_handler: &'a dyn ImportLocationHandler,
    pub contract_handler: &'a dyn ContractValueHandler,
    pub uuid_handler: &'a dyn UUIDHandler,
    pub base_activation_handler: &'a dyn BaseActivationHandler,
    pub registry: &'a mut TypeRegistry,
}
