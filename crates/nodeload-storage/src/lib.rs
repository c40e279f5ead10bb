//! nodeload-storage: Storage abstraction layer
//!
//! This crate provides the record store that node resolution reads from:
//! - DataStore trait and flat record types
//! - In-memory implementation on `DashMap`
//! - Fixture loading from JSON or YAML
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              nodeload-storage                │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs   - DataStore trait, records     │
//! │  memory.rs   - In-memory implementation     │
//! │  fixtures.rs - JSON/YAML seeding            │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod fixtures;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use fixtures::{load_fixture, Fixture};
pub use memory::MemoryDataStore;
pub use traits::{
    DataStore, StoredAccount, StoredAccountUser, StoredAssignment, StoredCourse, StoredEnrollment,
    StoredOutcome, StoredOutcomeGroup, StoredRecord, StoredSubmission, StoredTerm,
};
