// The sema elaboration: `TypeID -> TypeDef` (§9.1).
//
// Values hold a `TypeID` rather than a pointer back into this map, so
// that the value model and the type registry don't form a reference
// cycle (§9.1 "Arenas with indices, not raw back-references"). The
// registry is owned by the program/interpreter and consulted by
// `StaticType::is_subtype` and by `dynamic_cast`.

use std::collections::HashMap;

use crate::ast::FunctionDecl;
use crate::location::TypeID;
use crate::static_type::{CompositeKind, StaticType};

#[derive(Clone, Debug)]
pub struct Conditions {
    pub pre: Vec<crate::ast::Condition>,
    pub post: Vec<crate::ast::Condition>,
}

impl Default for Conditions {
    fn default() -> Self {
        Conditions { pre: Vec::new(), post: Vec::new() }
    }
}

#[derive(Clone, Debug)]
pub struct TypeDef {
    pub id: TypeID,
    pub kind: CompositeKind,
    /// Declared field names in declaration order, with their static
    /// types (used for default-value and container checks).
    pub fields: Vec<(String, StaticType)>,
    pub functions: HashMap<String, FunctionDecl>,
    /// Interfaces this type directly declares conformance to, in
    /// declaration order (determines pre-order traversal, §4.2.5).
    pub conformances: Vec<TypeID>,
    pub conditions: HashMap<String, Conditions>,
    /// Filled in once by `TypeRegistry::freeze`: the linearized
    /// supertype list used for condition ordering (§4.2.5, §9.1).
    pub linearized_supertypes: Vec<TypeID>,
}

impl TypeDef {
    pub fn new(id: TypeID, kind: CompositeKind) -> TypeDef {
        TypeDef {
            id,
            kind,
            fields: Vec::new(),
            functions: HashMap::new(),
            conformances: Vec::new(),
            conditions: HashMap::new(),
            linearized_supertypes: Vec::new(),
        }
    }
}

/// Owns every composite/interface declaration visible to a program
/// (possibly spanning several locations via imports).
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    defs: HashMap<TypeID, TypeDef>,
}

impl TypeRegistry {
    pub fn new() -> TypeRegistry {
        TypeRegistry::default()
    }

    pub fn register(&mut self, def: TypeDef) {
        self.defs.insert(def.id.clone(), def);
    }

    pub fn get(&self, id: &TypeID) -> Option<&TypeDef> {
        self.defs.get(id)
    }

    pub fn get_mut(&mut self, id: &TypeID) -> Option<&mut TypeDef> {
        self.defs.get_mut(id)
    }

    /// Does `concrete` conform to `interface`, directly or
    /// transitively?
    pub fn conforms(&self, concrete: &TypeID, interface: &TypeID) -> bool {
        if concrete == interface {
            return true;
        }
        match self.defs.get(concrete) {
            Some(def) => def
                .conformances
                .iter()
                .any(|c| c == interface || self.conforms(c, interface)),
            None => false,
        }
    }

    /// Compute and cache the linearized supertype list for `id`: a
    /// breadth-first, depth-first pre-order walk of the interface
    /// conformance graph, super-interfaces first, siblings in
    /// declaration order at each level, with `id` itself appended
    /// last (§4.2.5, §9.1). Calling `freeze` more than once recomputes
    /// cleanly since the result is pure function of `conformances`.
    pub fn freeze(&mut self, id: &TypeID) {
        let mut order = Vec::new();
        self.collect_supertypes(id, &mut order);
        order.push(id.clone());
        if let Some(def) = self.defs.get_mut(id) {
            def.linearized_supertypes = order;
        }
    }

    /// Append the proper supertypes of `id` to `out`, in the
    /// pre-order described by §4.2.5: each direct conformance is
    /// visited (and appended) before its own parents are expanded,
    /// siblings left to right in declaration order, already-seen
    /// interfaces skipped. `id` itself is never appended here.
    fn collect_supertypes(&self, id: &TypeID, out: &mut Vec<TypeID>) {
        let conformances = match self.defs.get(id) {
            Some(def) => def.conformances.clone(),
            None => Vec::new(),
        };
        for parent in &conformances {
            if !out.contains(parent) {
                out.push(parent.clone());
                self.collect_supertypes(parent, out);
            }
        }
    }
}
