// cadence-core: tree-walking interpreter, value model and
// dynamic-cast machinery for the Cadence resource-oriented
// smart-contract language (§1).
//
// This crate is the evaluator only: parsing and static/semantic
// checking happen upstream and hand this crate an already-elaborated
// `ast::Program` plus a populated `elaboration::TypeRegistry` (§1
// "Non-goals"). Everything nondeterministic or effectful — resolving
// an import, reading storage, minting a uuid — is delegated to the
// `host` traits an embedder implements.

pub mod activation;
pub mod ast;
pub mod dynamic_cast;
pub mod elaboration;
pub mod errors;
pub mod host;
pub mod interpreter;
pub mod location;
pub mod numeric;
pub mod static_type;
pub mod value;
