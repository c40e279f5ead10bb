//! Node resolver.
//!
//! Maps an opaque `(type tag, key, context)` triple to a permission-checked
//! domain object.
//!
//! # Architecture
//!
//! - **Dispatch table**: [`ResolveStrategy::for_tag`] is an exhaustive match
//!   over the closed [`TypeTag`](crate::model::TypeTag) set. Unknown tags are
//!   rejected before any lookup with `DomainError::UnsupportedType`.
//!
//! - **Strategies**: primary key and external id lookups are scoped to the
//!   request's root account; the composite key strategy joins on several
//!   fields. Submissions additionally pass the anonymous grading rule.
//!
//! - **Information hiding**: not found and not authorized both resolve to
//!   `Ok(None)`. They are never reported through the error channel.
//!
//! - **Timeout**: each resolution is bounded by `ResolverConfig::fetch_timeout`.
//!
//! Request coalescing lives one layer up, in the server's batch scope.

mod config;
mod node_resolver;
mod strategy;
mod traits;

#[cfg(test)]
pub(crate) mod tests;

pub use config::ResolverConfig;
pub use node_resolver::NodeResolver;
pub use strategy::ResolveStrategy;
pub use traits::{EntityReader, MembershipReader};
