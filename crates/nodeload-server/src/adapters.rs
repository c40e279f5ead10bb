//! Adapters that bridge storage layer to domain layer.
//!
//! The domain layer (nodeload-domain) defines abstract traits for data access:
//! - `EntityReader`: fetch nodes by primary, external or composite key
//! - `MembershipReader`: account chains, admin grants and enrollments
//!
//! The storage layer (nodeload-storage) implements `DataStore` with flat
//! records. This module maps those records onto domain objects and storage
//! errors onto domain errors. A missing record is `Ok(None)`, never an error.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use nodeload_domain::error::{DomainError, DomainResult};
use nodeload_domain::model::{
    Assignment, CompositeKey, ContextRef, Course, Enrollment, EnrollmentTerm, LearningOutcome,
    LearningOutcomeGroup, Node, NodeKind, Submission,
};
use nodeload_domain::resolver::{EntityReader, MembershipReader};
use nodeload_storage::{
    DataStore, StorageError, StorageResult, StoredAssignment, StoredCourse, StoredEnrollment,
    StoredOutcome, StoredOutcomeGroup, StoredSubmission, StoredTerm,
};

fn storage_error(err: StorageError) -> DomainError {
    DomainError::StoreError {
        message: format!("storage error: {}", err),
    }
}

/// Turns a not-found result into `None`.
fn found<T>(result: StorageResult<T>) -> DomainResult<Option<T>> {
    match result {
        Ok(record) => Ok(Some(record)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(storage_error(err)),
    }
}

fn context_ref(context_type: &str, context_id: u64) -> DomainResult<ContextRef> {
    match context_type {
        "Account" => Ok(ContextRef::Account(context_id)),
        "Course" => Ok(ContextRef::Course(context_id)),
        other => Err(DomainError::InvalidRecord {
            message: format!("unknown context type: {other}"),
        }),
    }
}

fn outcome_node(r: StoredOutcome) -> DomainResult<Node> {
    Ok(Node::LearningOutcome(LearningOutcome {
        id: r.id,
        context: context_ref(&r.context_type, r.context_id)?,
        root_account_id: r.root_account_id,
        short_description: r.short_description,
        workflow_state: r.workflow_state.parse()?,
    }))
}

fn outcome_group_node(r: StoredOutcomeGroup) -> DomainResult<Node> {
    Ok(Node::LearningOutcomeGroup(LearningOutcomeGroup {
        id: r.id,
        context: context_ref(&r.context_type, r.context_id)?,
        root_account_id: r.root_account_id,
        title: r.title,
        parent_group_id: r.parent_group_id,
        workflow_state: r.workflow_state.parse()?,
    }))
}

fn term_node(r: StoredTerm) -> DomainResult<Node> {
    Ok(Node::EnrollmentTerm(EnrollmentTerm {
        id: r.id,
        root_account_id: r.root_account_id,
        name: r.name,
        sis_source_id: r.sis_source_id,
        workflow_state: r.workflow_state.parse()?,
    }))
}

fn course_node(r: StoredCourse) -> DomainResult<Node> {
    Ok(Node::Course(Course {
        id: r.id,
        root_account_id: r.root_account_id,
        account_id: r.account_id,
        name: r.name,
        sis_source_id: r.sis_source_id,
        workflow_state: r.workflow_state.parse()?,
    }))
}

fn assignment_node(r: StoredAssignment) -> DomainResult<Node> {
    Ok(Node::Assignment(Assignment {
        id: r.id,
        course_id: r.course_id,
        root_account_id: r.root_account_id,
        title: r.title,
        anonymous_grading: r.anonymous_grading,
        workflow_state: r.workflow_state.parse()?,
    }))
}

fn submission_node(r: StoredSubmission) -> DomainResult<Node> {
    Ok(Node::Submission(Submission {
        id: r.id,
        assignment_id: r.assignment_id,
        course_id: r.course_id,
        user_id: r.user_id,
        workflow_state: r.workflow_state.parse()?,
        score: r.score,
        posted_at: r.posted_at,
    }))
}

fn enrollment(r: StoredEnrollment) -> DomainResult<Enrollment> {
    Ok(Enrollment {
        user_id: r.user_id,
        course_id: r.course_id,
        role: r.enrollment_type.parse()?,
        active: r.workflow_state == "active",
    })
}

/// Adapter that implements `EntityReader` using a `DataStore`.
///
/// Every lookup is confined to the given root account. Submissions carry
/// no root account of their own; theirs is the one of their course.
pub struct DataStoreEntityReader<S: DataStore> {
    storage: Arc<S>,
}

impl<S: DataStore> DataStoreEntityReader<S> {
    /// Creates a new adapter wrapping the given storage.
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    async fn submission_in_scope(
        &self,
        submission: Option<StoredSubmission>,
        scope_account_id: u64,
    ) -> DomainResult<Option<Node>> {
        let Some(submission) = submission else {
            return Ok(None);
        };
        let course = found(self.storage.get_course(submission.course_id).await)?;
        match course {
            Some(course) if course.root_account_id == scope_account_id => {
                submission_node(submission).map(Some)
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl<S: DataStore> EntityReader for DataStoreEntityReader<S> {
    async fn fetch_by_primary_key(
        &self,
        kind: NodeKind,
        id: u64,
        scope_account_id: u64,
    ) -> DomainResult<Option<Node>> {
        let in_scope = |root_account_id: u64| root_account_id == scope_account_id;

        match kind {
            NodeKind::LearningOutcome => found(self.storage.get_outcome(id).await)?
                .filter(|r| in_scope(r.root_account_id))
                .map(outcome_node)
                .transpose(),
            NodeKind::LearningOutcomeGroup => found(self.storage.get_outcome_group(id).await)?
                .filter(|r| in_scope(r.root_account_id))
                .map(outcome_group_node)
                .transpose(),
            NodeKind::EnrollmentTerm => found(self.storage.get_term(id).await)?
                .filter(|r| in_scope(r.root_account_id))
                .map(term_node)
                .transpose(),
            NodeKind::Course => found(self.storage.get_course(id).await)?
                .filter(|r| in_scope(r.root_account_id))
                .map(course_node)
                .transpose(),
            NodeKind::Assignment => found(self.storage.get_assignment(id).await)?
                .filter(|r| in_scope(r.root_account_id))
                .map(assignment_node)
                .transpose(),
            NodeKind::Submission => {
                let submission = found(self.storage.get_submission(id).await)?;
                self.submission_in_scope(submission, scope_account_id).await
            }
        }
    }

    async fn fetch_by_external_id(
        &self,
        kind: NodeKind,
        sis_id: &str,
        scope_account_id: u64,
    ) -> DomainResult<Option<Node>> {
        match kind {
            NodeKind::EnrollmentTerm => {
                found(self.storage.find_term_by_sis_id(scope_account_id, sis_id).await)?
                    .map(term_node)
                    .transpose()
            }
            NodeKind::Course => {
                found(self.storage.find_course_by_sis_id(scope_account_id, sis_id).await)?
                    .map(course_node)
                    .transpose()
            }
            _ => Ok(None),
        }
    }

    async fn fetch_by_composite_key(
        &self,
        kind: NodeKind,
        key: &CompositeKey,
        scope_account_id: u64,
    ) -> DomainResult<Option<Node>> {
        match (kind, key) {
            (
                NodeKind::Submission,
                CompositeKey::AssignmentAndUser {
                    assignment_id,
                    user_id,
                },
            ) => {
                let submission =
                    found(self.storage.find_submission(*assignment_id, *user_id).await)?;
                self.submission_in_scope(submission, scope_account_id).await
            }
            _ => Ok(None),
        }
    }
}

/// Adapter that implements `MembershipReader` using a `DataStore`.
pub struct DataStoreMembershipReader<S: DataStore> {
    storage: Arc<S>,
}

impl<S: DataStore> DataStoreMembershipReader<S> {
    /// Creates a new adapter wrapping the given storage.
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl<S: DataStore> MembershipReader for DataStoreMembershipReader<S> {
    async fn account_chain(&self, account_id: u64) -> DomainResult<Vec<u64>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(account_id);

        while let Some(id) = current {
            if !seen.insert(id) {
                break;
            }
            let Some(account) = found(self.storage.get_account(id).await)? else {
                break;
            };
            chain.push(account.id);
            current = account.parent_account_id;
        }

        Ok(chain)
    }

    async fn is_account_admin(&self, user_id: u64, account_id: u64) -> DomainResult<bool> {
        let grants = self
            .storage
            .list_account_users(user_id)
            .await
            .map_err(storage_error)?;
        Ok(grants
            .iter()
            .any(|g| g.account_id == account_id && g.workflow_state == "active"))
    }

    async fn course_enrollments(
        &self,
        user_id: u64,
        course_id: u64,
    ) -> DomainResult<Vec<Enrollment>> {
        self.storage
            .list_enrollments(user_id, course_id)
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(enrollment)
            .collect()
    }

    async fn course_account(&self, course_id: u64) -> DomainResult<Option<u64>> {
        Ok(found(self.storage.get_course(course_id).await)?.map(|c| c.account_id))
    }
}
