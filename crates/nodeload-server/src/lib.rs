//! nodeload-server: batch loading, wiring and configuration
//!
//! This crate connects the resolver to storage and adds the batching layer:
//! - Adapters from `DataStore` to the domain reader traits
//! - Batch scope and load handler with deduplication
//! - Configuration management and logging setup
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              nodeload-server                 │
//! ├─────────────────────────────────────────────┤
//! │  adapters.rs      - DataStore -> readers    │
//! │  handlers/loader/ - Scope, batch handler    │
//! │  app.rs           - Wiring, request loop    │
//! │  config.rs        - Configuration           │
//! │  observability.rs - Logging                 │
//! └─────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod app;
pub mod config;
pub mod handlers;
pub mod observability;

// Re-exports for convenience
pub use config::{ConfigLoadError, NodeloadConfig};
pub use handlers::loader::{BatchScope, LoadHandler, LoadItem, LoadRequest, LoadResponse};
