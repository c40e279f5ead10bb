//! Batch loader with two-stage deduplication.
//!
//! This handler resolves many node loads in a single request:
//!
//! 1. **Intra-batch deduplication**: identical items execute only once
//! 2. **Batch scope**: concurrent loads of the same key inside one scope share
//!    a single resolution, and resolved values are reused for the rest of the
//!    scope
//!
//! A scope lives for one outer operation. There is no caching across scopes.

mod handler;
mod scope;
mod singleflight;
mod types;

pub use handler::LoadHandler;
pub use scope::BatchScope;
pub use types::{
    LoadError, LoadItem, LoadItemResult, LoadRequest, LoadResponse, LoadResult, MAX_BATCH_SIZE,
};
