//! In-memory facts store for busnav.
//!
//! [`FactsStore`] holds the declarations and call sites of a project and
//! answers the queries of `busnav_core::adapter::SyntaxTreeProvider` from
//! its indexes. Host integrations (language servers, parsers) populate it;
//! the engine only reads it.
//!
//! - Files, classes, methods and call sites with allocated ids
//! - Postings lists for owner, callee and annotation lookups
//! - An expression type table keyed by file and span
//! - Deterministic traversal: file order, then source position

mod store;

pub use store::{
    CallFact, CallId, ClassFact, ClassId, FactsStore, File, FileId, MethodFact, MethodId,
};
