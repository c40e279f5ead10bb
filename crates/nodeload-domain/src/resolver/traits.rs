//! Traits for the collaborators the resolver consumes.

use async_trait::async_trait;

use crate::error::DomainResult;
use crate::model::{CompositeKey, Enrollment, Node, NodeKind};

/// Read access to domain objects.
///
/// Lookups return `Ok(None)` when nothing matches; `Err` is reserved for
/// store failures.
#[async_trait]
pub trait EntityReader: Send + Sync {
    /// Fetches a record by primary key within a root account.
    async fn fetch_by_primary_key(
        &self,
        kind: NodeKind,
        id: u64,
        scope_account_id: u64,
    ) -> DomainResult<Option<Node>>;

    /// Fetches a record by its external (SIS) identifier within a root account.
    async fn fetch_by_external_id(
        &self,
        kind: NodeKind,
        sis_id: &str,
        scope_account_id: u64,
    ) -> DomainResult<Option<Node>>;

    /// Fetches a record by a structured key within a root account.
    async fn fetch_by_composite_key(
        &self,
        kind: NodeKind,
        key: &CompositeKey,
        scope_account_id: u64,
    ) -> DomainResult<Option<Node>>;
}

/// Read access to the membership data the visibility policy needs.
#[async_trait]
pub trait MembershipReader: Send + Sync {
    /// Returns the account and all of its ancestors, nearest first.
    async fn account_chain(&self, account_id: u64) -> DomainResult<Vec<u64>>;

    /// Returns true if the user holds an admin grant on exactly this account.
    async fn is_account_admin(&self, user_id: u64, account_id: u64) -> DomainResult<bool>;

    /// Returns the user's enrollments in a course, in any state.
    async fn course_enrollments(&self, user_id: u64, course_id: u64)
        -> DomainResult<Vec<Enrollment>>;

    /// Returns the account a course belongs to, if the course exists.
    async fn course_account(&self, course_id: u64) -> DomainResult<Option<u64>>;
}
