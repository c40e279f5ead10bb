//! Node model types.
//!
//! This module contains:
//! - Type tags and lookup keys (`TypeTag`, `LookupKey`, `CompositeKey`)
//! - The per-request `RequestContext`
//! - Resolved domain objects (`Node` and its entity structs)

mod context;
mod node;
mod types;
#[cfg(test)]
mod types_proptest;

pub use context::RequestContext;
pub use node::*;
pub use types::*;
