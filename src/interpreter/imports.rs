// Import resolution (§5 "program import", "virtual import",
// "interpreter import").
//
// A location is evaluated into its own sub-`Activation` at most once
// per top-level `invoke` (`sub_interpreter_globals` memoizes it), the
// same way the host's own `ContractValueHandler` caches a contract's
// storage-resident value rather than re-hydrating it per import.

use std::rc::Rc;

use crate::activation::Activation;
use crate::ast::ImportDecl;
use crate::errors::Result;
use crate::value::Value;

use super::Interpreter;

impl<'a> Interpreter<'a> {
    pub fn run_import(&mut self, import: &ImportDecl) -> Result<()> {
        let globals = match self.sub_interpreter_globals(&import.location) {
            Some(globals) => globals,
            None => {
                let globals = self.evaluate_imported_location(&import.location)?;
                self.cache_sub_interpreter_globals(import.location.clone(), Rc::clone(&globals));
                globals
            }
        };
        self.bind_imported_names(&globals, import)
    }

    /// Runs `location`'s own declarations into a fresh sub-activation
    /// chained from whatever base activation the host supplies for
    /// that location (§5 "interpreter import", §9.1 "per-location base
    /// activations"). A location that designates a deployed contract
    /// short-circuits straight to its stored value instead of
    /// re-running the contract's `init` (§5 "virtual import").
    fn evaluate_imported_location(&mut self, location: &crate::location::Location) -> Result<Rc<Activation>> {
        if let Some(contract_value) = self.contract_handler.contract_value(location)? {
            let globals = self.base_activation_handler.base_activation(location);
            globals.define(&contract_name(location), contract_value);
            return Ok(globals);
        }

        let program = self.import_handler.resolve(location)?;
        let base = self.base_activation_handler.base_activation(location);
        let mut sub = Interpreter {
            registry: self.registry,
            import_handler: self.import_handler,
            contract_handler: self.contract_handler,
            uuid_handler: self.uuid_handler,
            base_activation_handler: self.base_activation_handler,
            observer: &mut *self.observer,
            location: location.clone(),
            globals: base,
            sub_globals: self.sub_globals.clone(),
            before_snapshots: std::cell::RefCell::new(None),
        };
        sub.run_program(&program)?;
        let globals = sub.globals;
        // Imports resolved while evaluating the sub-program belong to
        // every sibling sub-interpreter in this `invoke` too.
        for (loc, acts) in sub.sub_globals.into_inner() {
            self.cache_sub_interpreter_globals(loc, acts);
        }
        Ok(globals)
    }

    /// Copies the requested bindings (or everything, for a bare
    /// `import Location`) from the imported location's globals into
    /// the importing activation.
    fn bind_imported_names(&mut self, source: &Rc<Activation>, import: &ImportDecl) -> Result<()> {
        match &import.names {
            Some(names) => {
                for name in names {
                    let value: Value = source.get(name, self.registry)?;
                    self.globals.define(name, value);
                }
            }
            None => {
                for name in source.defined_names() {
                    let value = source.get(&name, self.registry)?;
                    self.globals.define(&name, value);
                }
            }
        }
        Ok(())
    }
}

fn contract_name(location: &crate::location::Location) -> String {
    match location {
        crate::location::Location::Address { name, .. } => name.clone(),
        crate::location::Location::Identifier(name) | crate::location::Location::String(name) => name.clone(),
        crate::location::Location::Test => "Test".to_string(),
    }
}
