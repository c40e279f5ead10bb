//! In-memory storage implementation.
//!
//! Every record kind lives in its own `DashMap` keyed by primary id. SIS ids
//! and the (assignment, user) pair of submissions get unique secondary indexes
//! so the lookups used by node resolution stay O(1).

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, instrument};

use crate::error::{StorageError, StorageResult};
use crate::traits::{
    validate_record, DataStore, StoredAccount, StoredAccountUser, StoredAssignment, StoredCourse,
    StoredEnrollment, StoredOutcome, StoredOutcomeGroup, StoredRecord, StoredSubmission,
    StoredTerm,
};

/// In-memory implementation of DataStore.
///
/// # Performance Characteristics
///
/// - **Insert**: O(1) average, plus one lookup per foreign key
/// - **Primary and SIS lookups**: O(1) (DashMap lookup)
/// - **Enrollment and admin listings**: O(N) over that record kind
#[derive(Debug, Default)]
pub struct MemoryDataStore {
    accounts: DashMap<u64, StoredAccount>,
    courses: DashMap<u64, StoredCourse>,
    terms: DashMap<u64, StoredTerm>,
    outcomes: DashMap<u64, StoredOutcome>,
    outcome_groups: DashMap<u64, StoredOutcomeGroup>,
    assignments: DashMap<u64, StoredAssignment>,
    submissions: DashMap<u64, StoredSubmission>,
    enrollments: DashMap<u64, StoredEnrollment>,
    account_users: DashMap<u64, StoredAccountUser>,
    /// (root_account_id, sis_source_id) -> course id
    course_sis_index: DashMap<(u64, String), u64>,
    /// (root_account_id, sis_source_id) -> term id
    term_sis_index: DashMap<(u64, String), u64>,
    /// (assignment_id, user_id) -> submission id
    submission_index: DashMap<(u64, u64), u64>,
}

impl MemoryDataStore {
    /// Creates a new in-memory data store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory data store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Total number of stored records across all kinds.
    pub fn len(&self) -> usize {
        self.accounts.len()
            + self.courses.len()
            + self.terms.len()
            + self.outcomes.len()
            + self.outcome_groups.len()
            + self.assignments.len()
            + self.submissions.len()
            + self.enrollments.len()
            + self.account_users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn require<T>(
        &self,
        map: &DashMap<u64, T>,
        record: &StoredRecord,
        missing_kind: &str,
        missing_id: u64,
    ) -> StorageResult<()> {
        if map.contains_key(&missing_id) {
            return Ok(());
        }
        Err(StorageError::DanglingReference {
            kind: record.kind(),
            key: record.id().to_string(),
            missing: format!("{missing_kind} {missing_id}"),
        })
    }

    fn require_context(
        &self,
        record: &StoredRecord,
        context_type: &str,
        context_id: u64,
    ) -> StorageResult<()> {
        match context_type {
            "Course" => self.require(&self.courses, record, "course", context_id),
            _ => self.require(&self.accounts, record, "account", context_id),
        }
    }

    /// Checks that every record this one points at is already stored.
    fn check_references(&self, record: &StoredRecord) -> StorageResult<()> {
        match record {
            StoredRecord::Account(r) => {
                if let Some(parent) = r.parent_account_id {
                    self.require(&self.accounts, record, "account", parent)?;
                }
            }
            StoredRecord::Course(r) => {
                self.require(&self.accounts, record, "account", r.root_account_id)?;
                self.require(&self.accounts, record, "account", r.account_id)?;
            }
            StoredRecord::Term(r) => {
                self.require(&self.accounts, record, "account", r.root_account_id)?;
            }
            StoredRecord::Outcome(r) => {
                self.require_context(record, &r.context_type, r.context_id)?;
            }
            StoredRecord::OutcomeGroup(r) => {
                self.require_context(record, &r.context_type, r.context_id)?;
                if let Some(parent) = r.parent_group_id {
                    self.require(&self.outcome_groups, record, "learning outcome group", parent)?;
                }
            }
            StoredRecord::Assignment(r) => {
                self.require(&self.courses, record, "course", r.course_id)?;
            }
            StoredRecord::Submission(r) => {
                let assignment_course = self
                    .assignments
                    .get(&r.assignment_id)
                    .map(|a| a.course_id)
                    .ok_or_else(|| StorageError::DanglingReference {
                        kind: record.kind(),
                        key: r.id.to_string(),
                        missing: format!("assignment {}", r.assignment_id),
                    })?;
                if assignment_course != r.course_id {
                    return Err(StorageError::InvalidInput {
                        message: format!(
                            "submission {} course_id {} does not match assignment course {}",
                            r.id, r.course_id, assignment_course
                        ),
                    });
                }
            }
            StoredRecord::Enrollment(r) => {
                self.require(&self.courses, record, "course", r.course_id)?;
            }
            StoredRecord::AccountUser(r) => {
                self.require(&self.accounts, record, "account", r.account_id)?;
            }
        }
        Ok(())
    }
}

/// Inserts into a primary map, failing if the id is taken.
fn insert_unique<T>(
    map: &DashMap<u64, T>,
    kind: &'static str,
    id: u64,
    value: T,
) -> StorageResult<()> {
    // Use atomic entry API to prevent race condition between check and insert
    match map.entry(id) {
        Entry::Occupied(_) => Err(StorageError::duplicate(kind, id)),
        Entry::Vacant(entry) => {
            entry.insert(value);
            Ok(())
        }
    }
}

/// Inserts a record that carries an optional unique secondary key.
///
/// The secondary index entry is reserved before the primary one so a
/// failed insert never leaves a half-indexed record behind.
fn insert_indexed<K, T>(
    map: &DashMap<u64, T>,
    index: &DashMap<K, u64>,
    kind: &'static str,
    id: u64,
    index_key: Option<K>,
    value: T,
) -> StorageResult<()>
where
    K: std::hash::Hash + Eq + std::fmt::Debug,
{
    if map.contains_key(&id) {
        return Err(StorageError::duplicate(kind, id));
    }
    let Some(index_key) = index_key else {
        return insert_unique(map, kind, id, value);
    };

    match index.entry(index_key) {
        Entry::Occupied(entry) => Err(StorageError::duplicate(kind, format!("{:?}", entry.key()))),
        Entry::Vacant(entry) => {
            let key = format!("{:?}", entry.key());
            match map.entry(id) {
                Entry::Occupied(_) => Err(StorageError::duplicate(kind, key)),
                Entry::Vacant(slot) => {
                    slot.insert(value);
                    entry.insert(id);
                    Ok(())
                }
            }
        }
    }
}

fn get_cloned<T: Clone>(map: &DashMap<u64, T>, kind: &'static str, id: u64) -> StorageResult<T> {
    map.get(&id)
        .map(|r| r.value().clone())
        .ok_or_else(|| StorageError::not_found(kind, id))
}

#[async_trait]
impl DataStore for MemoryDataStore {
    #[instrument(skip(self, record), fields(kind = record.kind(), id = record.id()))]
    async fn insert(&self, record: StoredRecord) -> StorageResult<()> {
        validate_record(&record)?;
        self.check_references(&record)?;

        let kind = record.kind();
        match record {
            StoredRecord::Account(r) => insert_unique(&self.accounts, kind, r.id, r),
            StoredRecord::Course(r) => {
                let index_key = r.sis_source_id.clone().map(|sis| (r.root_account_id, sis));
                insert_indexed(&self.courses, &self.course_sis_index, kind, r.id, index_key, r)
            }
            StoredRecord::Term(r) => {
                let index_key = r.sis_source_id.clone().map(|sis| (r.root_account_id, sis));
                insert_indexed(&self.terms, &self.term_sis_index, kind, r.id, index_key, r)
            }
            StoredRecord::Outcome(r) => insert_unique(&self.outcomes, kind, r.id, r),
            StoredRecord::OutcomeGroup(r) => insert_unique(&self.outcome_groups, kind, r.id, r),
            StoredRecord::Assignment(r) => insert_unique(&self.assignments, kind, r.id, r),
            StoredRecord::Submission(r) => {
                let index_key = Some((r.assignment_id, r.user_id));
                insert_indexed(
                    &self.submissions,
                    &self.submission_index,
                    kind,
                    r.id,
                    index_key,
                    r,
                )
            }
            StoredRecord::Enrollment(r) => insert_unique(&self.enrollments, kind, r.id, r),
            StoredRecord::AccountUser(r) => insert_unique(&self.account_users, kind, r.id, r),
        }?;

        debug!("record inserted");
        Ok(())
    }

    async fn get_account(&self, id: u64) -> StorageResult<StoredAccount> {
        get_cloned(&self.accounts, "account", id)
    }

    async fn get_course(&self, id: u64) -> StorageResult<StoredCourse> {
        get_cloned(&self.courses, "course", id)
    }

    async fn get_term(&self, id: u64) -> StorageResult<StoredTerm> {
        get_cloned(&self.terms, "enrollment term", id)
    }

    async fn get_outcome(&self, id: u64) -> StorageResult<StoredOutcome> {
        get_cloned(&self.outcomes, "learning outcome", id)
    }

    async fn get_outcome_group(&self, id: u64) -> StorageResult<StoredOutcomeGroup> {
        get_cloned(&self.outcome_groups, "learning outcome group", id)
    }

    async fn get_assignment(&self, id: u64) -> StorageResult<StoredAssignment> {
        get_cloned(&self.assignments, "assignment", id)
    }

    async fn get_submission(&self, id: u64) -> StorageResult<StoredSubmission> {
        get_cloned(&self.submissions, "submission", id)
    }

    #[instrument(skip(self))]
    async fn find_course_by_sis_id(
        &self,
        root_account_id: u64,
        sis_id: &str,
    ) -> StorageResult<StoredCourse> {
        let id = self
            .course_sis_index
            .get(&(root_account_id, sis_id.to_string()))
            .map(|r| *r.value())
            .ok_or_else(|| StorageError::not_found("course", sis_id))?;
        get_cloned(&self.courses, "course", id)
    }

    #[instrument(skip(self))]
    async fn find_term_by_sis_id(
        &self,
        root_account_id: u64,
        sis_id: &str,
    ) -> StorageResult<StoredTerm> {
        let id = self
            .term_sis_index
            .get(&(root_account_id, sis_id.to_string()))
            .map(|r| *r.value())
            .ok_or_else(|| StorageError::not_found("enrollment term", sis_id))?;
        get_cloned(&self.terms, "enrollment term", id)
    }

    #[instrument(skip(self))]
    async fn find_submission(
        &self,
        assignment_id: u64,
        user_id: u64,
    ) -> StorageResult<StoredSubmission> {
        let id = self
            .submission_index
            .get(&(assignment_id, user_id))
            .map(|r| *r.value())
            .ok_or_else(|| {
                StorageError::not_found("submission", format!("{assignment_id}/{user_id}"))
            })?;
        get_cloned(&self.submissions, "submission", id)
    }

    async fn list_enrollments(
        &self,
        user_id: u64,
        course_id: u64,
    ) -> StorageResult<Vec<StoredEnrollment>> {
        let mut enrollments: Vec<StoredEnrollment> = self
            .enrollments
            .iter()
            .filter(|e| e.user_id == user_id && e.course_id == course_id)
            .map(|e| e.value().clone())
            .collect();
        enrollments.sort_by_key(|e| e.id);
        Ok(enrollments)
    }

    async fn list_account_users(&self, user_id: u64) -> StorageResult<Vec<StoredAccountUser>> {
        let mut grants: Vec<StoredAccountUser> = self
            .account_users
            .iter()
            .filter(|a| a.user_id == user_id)
            .map(|a| a.value().clone())
            .collect();
        grants.sort_by_key(|a| a.id);
        Ok(grants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: u64, parent: Option<u64>) -> StoredRecord {
        StoredRecord::Account(StoredAccount {
            id,
            parent_account_id: parent,
            name: format!("Account {id}"),
            workflow_state: "active".to_string(),
        })
    }

    fn course(id: u64, sis: Option<&str>) -> StoredRecord {
        StoredRecord::Course(StoredCourse {
            id,
            root_account_id: 1,
            account_id: 1,
            name: format!("Course {id}"),
            sis_source_id: sis.map(str::to_string),
            workflow_state: "available".to_string(),
        })
    }

    fn assignment(id: u64, course_id: u64) -> StoredRecord {
        StoredRecord::Assignment(StoredAssignment {
            id,
            course_id,
            root_account_id: 1,
            title: "Lab report".to_string(),
            anonymous_grading: true,
            workflow_state: "active".to_string(),
        })
    }

    fn submission(id: u64, assignment_id: u64, course_id: u64, user_id: u64) -> StoredRecord {
        StoredRecord::Submission(StoredSubmission {
            id,
            assignment_id,
            course_id,
            user_id,
            workflow_state: "submitted".to_string(),
            score: None,
            posted_at: None,
        })
    }

    async fn seeded() -> MemoryDataStore {
        let store = MemoryDataStore::new();
        store.insert(account(1, None)).await.unwrap();
        store.insert(course(10, Some("BIO-101"))).await.unwrap();
        store.insert(assignment(50, 10)).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_memory_store_can_be_created() {
        let store = MemoryDataStore::new();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_shared() {
        let store = MemoryDataStore::new_shared();
        store.insert(account(1, None)).await.unwrap();

        let store2 = Arc::clone(&store);
        let retrieved = store2.get_account(1).await.unwrap();
        assert_eq!(retrieved.name, "Account 1");
    }

    #[tokio::test]
    async fn test_get_nonexistent_course() {
        let store = MemoryDataStore::new();
        let result = store.get_course(404).await;

        assert!(matches!(result, Err(StorageError::RecordNotFound { .. })));
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_primary_key_is_rejected() {
        let store = seeded().await;
        let result = store.insert(course(10, None)).await;
        assert!(matches!(result, Err(StorageError::DuplicateRecord { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_sis_id_is_rejected() {
        let store = seeded().await;
        let result = store.insert(course(11, Some("BIO-101"))).await;
        assert!(matches!(result, Err(StorageError::DuplicateRecord { .. })));

        // The failed insert must not leave the primary row behind
        assert!(store.get_course(11).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_primary_does_not_claim_sis_id() {
        let store = seeded().await;
        let result = store.insert(course(10, Some("CHEM-201"))).await;
        assert!(result.is_err());

        store.insert(course(12, Some("CHEM-201"))).await.unwrap();
        let found = store.find_course_by_sis_id(1, "CHEM-201").await.unwrap();
        assert_eq!(found.id, 12);
    }

    #[tokio::test]
    async fn test_dangling_reference_is_rejected() {
        let store = MemoryDataStore::new();
        let result = store.insert(course(10, None)).await;
        assert!(matches!(result, Err(StorageError::DanglingReference { .. })));
    }

    #[tokio::test]
    async fn test_find_course_by_sis_id_is_scoped_to_root_account() {
        let store = seeded().await;

        let found = store.find_course_by_sis_id(1, "BIO-101").await.unwrap();
        assert_eq!(found.id, 10);

        let other_root = store.find_course_by_sis_id(2, "BIO-101").await;
        assert!(other_root.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_find_submission_by_assignment_and_user() {
        let store = seeded().await;
        store.insert(submission(900, 50, 10, 20)).await.unwrap();

        let found = store.find_submission(50, 20).await.unwrap();
        assert_eq!(found.id, 900);

        assert!(store.find_submission(50, 21).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_second_submission_for_same_user_is_rejected() {
        let store = seeded().await;
        store.insert(submission(900, 50, 10, 20)).await.unwrap();

        let result = store.insert(submission(901, 50, 10, 20)).await;
        assert!(matches!(result, Err(StorageError::DuplicateRecord { .. })));
    }

    #[tokio::test]
    async fn test_submission_course_must_match_assignment() {
        let store = seeded().await;
        store.insert(course(11, None)).await.unwrap();

        let result = store.insert(submission(900, 50, 11, 20)).await;
        assert!(matches!(result, Err(StorageError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_list_enrollments_filters_by_user_and_course() {
        let store = seeded().await;
        for (id, user_id, enrollment_type) in [
            (2, 20, "StudentEnrollment"),
            (1, 20, "ObserverEnrollment"),
            (3, 21, "TeacherEnrollment"),
        ] {
            store
                .insert(StoredRecord::Enrollment(StoredEnrollment {
                    id,
                    user_id,
                    course_id: 10,
                    enrollment_type: enrollment_type.to_string(),
                    workflow_state: "active".to_string(),
                }))
                .await
                .unwrap();
        }

        let enrollments = store.list_enrollments(20, 10).await.unwrap();
        let ids: Vec<u64> = enrollments.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2]);

        assert!(store.list_enrollments(20, 11).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_account_users() {
        let store = MemoryDataStore::new();
        store.insert(account(1, None)).await.unwrap();
        store.insert(account(2, Some(1))).await.unwrap();
        store
            .insert(StoredRecord::AccountUser(StoredAccountUser {
                id: 7,
                user_id: 30,
                account_id: 2,
                workflow_state: "active".to_string(),
            }))
            .await
            .unwrap();

        let grants = store.list_account_users(30).await.unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].account_id, 2);
        assert!(store.list_account_users(31).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_inserts_with_same_id_keep_one() {
        let store = Arc::new(MemoryDataStore::new());
        store.insert(account(1, None)).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .insert(course(10, Some(&format!("SIS-{i}"))))
                    .await
                    .is_ok()
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(store.courses.len(), 1);
        assert_eq!(store.course_sis_index.len(), 1);
    }
}
