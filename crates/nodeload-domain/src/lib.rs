//! nodeload-domain: Core node resolution logic
//!
//! This crate contains the domain layer of the keyed batch resolver:
//! - Type tags, lookup keys and the request context
//! - Resolved domain objects (outcomes, terms, courses, assignments, submissions)
//! - Dispatch table and per-type resolver strategies
//! - Membership-backed visibility policy
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              nodeload-domain                 │
//! ├─────────────────────────────────────────────┤
//! │  model/       - Tags, keys, context, nodes  │
//! │  resolver/    - Dispatch + strategies       │
//! │  permissions/ - Visibility policy           │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod model;
pub mod permissions;
pub mod resolver;

// Re-export commonly used types at the crate root
pub use error::{DomainError, DomainResult};
pub use model::{LookupKey, Node, RequestContext, TypeTag};
pub use permissions::{Authorizer, MembershipAuthorizer};
pub use resolver::{EntityReader, MembershipReader, NodeResolver, ResolverConfig};
