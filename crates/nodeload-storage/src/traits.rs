//! DataStore trait definition and stored record types.
//!
//! Records are flat and relational in shape: string workflow states and
//! roles, foreign keys as plain ids. Mapping them onto domain objects is the
//! job of the adapters in the server crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Maximum length of an external (SIS) identifier.
pub const MAX_SIS_ID_LENGTH: usize = 255;

/// Maximum length of a display name or title.
pub const MAX_NAME_LENGTH: usize = 255;

/// Workflow states accepted on accounts, courses, terms, outcomes and assignments.
pub const WORKFLOW_STATES: [&str; 7] = [
    "active",
    "available",
    "created",
    "claimed",
    "unpublished",
    "completed",
    "deleted",
];

/// Workflow states accepted on submissions.
pub const SUBMISSION_STATES: [&str; 5] =
    ["unsubmitted", "submitted", "pending_review", "graded", "deleted"];

/// Workflow states accepted on enrollments and account users.
pub const MEMBERSHIP_STATES: [&str; 5] = ["active", "invited", "inactive", "completed", "deleted"];

/// Enrollment types accepted on enrollments.
pub const ENROLLMENT_TYPES: [&str; 5] = [
    "TeacherEnrollment",
    "TaEnrollment",
    "DesignerEnrollment",
    "StudentEnrollment",
    "ObserverEnrollment",
];

/// Owner types accepted on outcomes and outcome groups.
pub const CONTEXT_TYPES: [&str; 2] = ["Account", "Course"];

fn default_active() -> String {
    "active".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAccount {
    pub id: u64,
    /// `None` for a root account.
    #[serde(default)]
    pub parent_account_id: Option<u64>,
    pub name: String,
    #[serde(default = "default_active")]
    pub workflow_state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCourse {
    pub id: u64,
    pub root_account_id: u64,
    pub account_id: u64,
    pub name: String,
    #[serde(default)]
    pub sis_source_id: Option<String>,
    #[serde(default = "default_active")]
    pub workflow_state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTerm {
    pub id: u64,
    pub root_account_id: u64,
    pub name: String,
    #[serde(default)]
    pub sis_source_id: Option<String>,
    #[serde(default = "default_active")]
    pub workflow_state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredOutcome {
    pub id: u64,
    /// `"Account"` or `"Course"`.
    pub context_type: String,
    pub context_id: u64,
    pub root_account_id: u64,
    pub short_description: String,
    #[serde(default = "default_active")]
    pub workflow_state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredOutcomeGroup {
    pub id: u64,
    pub context_type: String,
    pub context_id: u64,
    pub root_account_id: u64,
    pub title: String,
    #[serde(default)]
    pub parent_group_id: Option<u64>,
    #[serde(default = "default_active")]
    pub workflow_state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAssignment {
    pub id: u64,
    pub course_id: u64,
    pub root_account_id: u64,
    pub title: String,
    #[serde(default)]
    pub anonymous_grading: bool,
    #[serde(default = "default_active")]
    pub workflow_state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSubmission {
    pub id: u64,
    pub assignment_id: u64,
    pub course_id: u64,
    pub user_id: u64,
    #[serde(default = "default_unsubmitted")]
    pub workflow_state: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
}

fn default_unsubmitted() -> String {
    "unsubmitted".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEnrollment {
    pub id: u64,
    pub user_id: u64,
    pub course_id: u64,
    /// One of [`ENROLLMENT_TYPES`].
    #[serde(rename = "type")]
    pub enrollment_type: String,
    #[serde(default = "default_active")]
    pub workflow_state: String,
}

/// An admin grant on an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAccountUser {
    pub id: u64,
    pub user_id: u64,
    pub account_id: u64,
    #[serde(default = "default_active")]
    pub workflow_state: String,
}

/// Any record that can be written to a [`DataStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoredRecord {
    Account(StoredAccount),
    Course(StoredCourse),
    Term(StoredTerm),
    Outcome(StoredOutcome),
    OutcomeGroup(StoredOutcomeGroup),
    Assignment(StoredAssignment),
    Submission(StoredSubmission),
    Enrollment(StoredEnrollment),
    AccountUser(StoredAccountUser),
}

impl StoredRecord {
    /// Human-readable record kind used in errors and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StoredRecord::Account(_) => "account",
            StoredRecord::Course(_) => "course",
            StoredRecord::Term(_) => "enrollment term",
            StoredRecord::Outcome(_) => "learning outcome",
            StoredRecord::OutcomeGroup(_) => "learning outcome group",
            StoredRecord::Assignment(_) => "assignment",
            StoredRecord::Submission(_) => "submission",
            StoredRecord::Enrollment(_) => "enrollment",
            StoredRecord::AccountUser(_) => "account user",
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            StoredRecord::Account(r) => r.id,
            StoredRecord::Course(r) => r.id,
            StoredRecord::Term(r) => r.id,
            StoredRecord::Outcome(r) => r.id,
            StoredRecord::OutcomeGroup(r) => r.id,
            StoredRecord::Assignment(r) => r.id,
            StoredRecord::Submission(r) => r.id,
            StoredRecord::Enrollment(r) => r.id,
            StoredRecord::AccountUser(r) => r.id,
        }
    }
}

/// Abstract storage interface for learning-management records.
///
/// Implementations must be thread-safe (Send + Sync) and support
/// async operations. Lookups that match nothing return
/// [`StorageError::RecordNotFound`].
#[async_trait]
pub trait DataStore: Send + Sync + 'static {
    // Write operations

    /// Inserts a record. Fails on duplicate primary or SIS keys and on
    /// references to records that have not been inserted yet.
    async fn insert(&self, record: StoredRecord) -> StorageResult<()>;

    // Primary key lookups

    async fn get_account(&self, id: u64) -> StorageResult<StoredAccount>;

    async fn get_course(&self, id: u64) -> StorageResult<StoredCourse>;

    async fn get_term(&self, id: u64) -> StorageResult<StoredTerm>;

    async fn get_outcome(&self, id: u64) -> StorageResult<StoredOutcome>;

    async fn get_outcome_group(&self, id: u64) -> StorageResult<StoredOutcomeGroup>;

    async fn get_assignment(&self, id: u64) -> StorageResult<StoredAssignment>;

    async fn get_submission(&self, id: u64) -> StorageResult<StoredSubmission>;

    // Secondary key lookups

    /// Finds a course by SIS id within a root account.
    async fn find_course_by_sis_id(
        &self,
        root_account_id: u64,
        sis_id: &str,
    ) -> StorageResult<StoredCourse>;

    /// Finds an enrollment term by SIS id within a root account.
    async fn find_term_by_sis_id(&self, root_account_id: u64, sis_id: &str)
        -> StorageResult<StoredTerm>;

    /// Finds the submission of a user for an assignment.
    async fn find_submission(&self, assignment_id: u64, user_id: u64)
        -> StorageResult<StoredSubmission>;

    // Membership lookups

    /// Lists a user's enrollments in a course, in any state.
    async fn list_enrollments(&self, user_id: u64, course_id: u64)
        -> StorageResult<Vec<StoredEnrollment>>;

    /// Lists the admin grants a user holds, in any state.
    async fn list_account_users(&self, user_id: u64) -> StorageResult<Vec<StoredAccountUser>>;
}

// ============================================================
// Validation
// ============================================================

fn invalid(message: impl Into<String>) -> StorageError {
    StorageError::InvalidInput {
        message: message.into(),
    }
}

fn validate_id(kind: &str, field: &str, id: u64) -> StorageResult<()> {
    if id == 0 {
        return Err(invalid(format!("{kind} {field} must be greater than 0")));
    }
    Ok(())
}

fn validate_name(kind: &str, field: &str, value: &str) -> StorageResult<()> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{kind} {field} cannot be empty")));
    }
    if value.len() > MAX_NAME_LENGTH {
        return Err(invalid(format!(
            "{kind} {field} exceeds {MAX_NAME_LENGTH} bytes"
        )));
    }
    Ok(())
}

fn validate_one_of(kind: &str, field: &str, value: &str, allowed: &[&str]) -> StorageResult<()> {
    if !allowed.contains(&value) {
        return Err(invalid(format!(
            "{kind} {field} must be one of: {allowed:?}, got: {value}"
        )));
    }
    Ok(())
}

/// Validates an external (SIS) identifier.
pub fn validate_sis_id(sis_id: &str) -> StorageResult<()> {
    if sis_id.trim().is_empty() {
        return Err(invalid("sis_source_id cannot be empty"));
    }
    if sis_id.len() > MAX_SIS_ID_LENGTH {
        return Err(invalid(format!(
            "sis_source_id exceeds {MAX_SIS_ID_LENGTH} bytes"
        )));
    }
    Ok(())
}

/// Validates the fields of a record without looking at other records.
pub fn validate_record(record: &StoredRecord) -> StorageResult<()> {
    let kind = record.kind();
    validate_id(kind, "id", record.id())?;

    match record {
        StoredRecord::Account(r) => {
            validate_name(kind, "name", &r.name)?;
            validate_one_of(kind, "workflow_state", &r.workflow_state, &WORKFLOW_STATES)?;
            if r.parent_account_id == Some(r.id) {
                return Err(invalid("account cannot be its own parent"));
            }
        }
        StoredRecord::Course(r) => {
            validate_id(kind, "root_account_id", r.root_account_id)?;
            validate_id(kind, "account_id", r.account_id)?;
            validate_name(kind, "name", &r.name)?;
            if let Some(sis_id) = &r.sis_source_id {
                validate_sis_id(sis_id)?;
            }
            validate_one_of(kind, "workflow_state", &r.workflow_state, &WORKFLOW_STATES)?;
        }
        StoredRecord::Term(r) => {
            validate_id(kind, "root_account_id", r.root_account_id)?;
            validate_name(kind, "name", &r.name)?;
            if let Some(sis_id) = &r.sis_source_id {
                validate_sis_id(sis_id)?;
            }
            validate_one_of(kind, "workflow_state", &r.workflow_state, &WORKFLOW_STATES)?;
        }
        StoredRecord::Outcome(r) => {
            validate_one_of(kind, "context_type", &r.context_type, &CONTEXT_TYPES)?;
            validate_id(kind, "context_id", r.context_id)?;
            validate_id(kind, "root_account_id", r.root_account_id)?;
            validate_name(kind, "short_description", &r.short_description)?;
            validate_one_of(kind, "workflow_state", &r.workflow_state, &WORKFLOW_STATES)?;
        }
        StoredRecord::OutcomeGroup(r) => {
            validate_one_of(kind, "context_type", &r.context_type, &CONTEXT_TYPES)?;
            validate_id(kind, "context_id", r.context_id)?;
            validate_id(kind, "root_account_id", r.root_account_id)?;
            validate_name(kind, "title", &r.title)?;
            validate_one_of(kind, "workflow_state", &r.workflow_state, &WORKFLOW_STATES)?;
        }
        StoredRecord::Assignment(r) => {
            validate_id(kind, "course_id", r.course_id)?;
            validate_id(kind, "root_account_id", r.root_account_id)?;
            validate_name(kind, "title", &r.title)?;
            validate_one_of(kind, "workflow_state", &r.workflow_state, &WORKFLOW_STATES)?;
        }
        StoredRecord::Submission(r) => {
            validate_id(kind, "assignment_id", r.assignment_id)?;
            validate_id(kind, "course_id", r.course_id)?;
            validate_id(kind, "user_id", r.user_id)?;
            validate_one_of(kind, "workflow_state", &r.workflow_state, &SUBMISSION_STATES)?;
            if let Some(score) = r.score {
                if !score.is_finite() {
                    return Err(invalid("submission score must be finite"));
                }
            }
        }
        StoredRecord::Enrollment(r) => {
            validate_id(kind, "user_id", r.user_id)?;
            validate_id(kind, "course_id", r.course_id)?;
            validate_one_of(kind, "type", &r.enrollment_type, &ENROLLMENT_TYPES)?;
            validate_one_of(kind, "workflow_state", &r.workflow_state, &MEMBERSHIP_STATES)?;
        }
        StoredRecord::AccountUser(r) => {
            validate_id(kind, "user_id", r.user_id)?;
            validate_id(kind, "account_id", r.account_id)?;
            validate_one_of(kind, "workflow_state", &r.workflow_state, &MEMBERSHIP_STATES)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course() -> StoredCourse {
        StoredCourse {
            id: 10,
            root_account_id: 1,
            account_id: 1,
            name: "Biology 101".to_string(),
            sis_source_id: Some("BIO-101".to_string()),
            workflow_state: "available".to_string(),
        }
    }

    #[test]
    fn test_valid_course_passes() {
        assert!(validate_record(&StoredRecord::Course(course())).is_ok());
    }

    #[test]
    fn test_zero_id_is_rejected() {
        let mut record = course();
        record.id = 0;
        let err = validate_record(&StoredRecord::Course(record)).unwrap_err();
        assert!(err.to_string().contains("id must be greater than 0"));
    }

    #[test]
    fn test_blank_sis_id_is_rejected() {
        let mut record = course();
        record.sis_source_id = Some("   ".to_string());
        assert!(validate_record(&StoredRecord::Course(record)).is_err());

        let mut record = course();
        record.sis_source_id = Some("x".repeat(MAX_SIS_ID_LENGTH + 1));
        assert!(validate_record(&StoredRecord::Course(record)).is_err());
    }

    #[test]
    fn test_unknown_workflow_state_is_rejected() {
        let mut record = course();
        record.workflow_state = "archived".to_string();
        let err = validate_record(&StoredRecord::Course(record)).unwrap_err();
        assert!(err.to_string().contains("workflow_state"));
    }

    #[test]
    fn test_unknown_context_type_is_rejected() {
        let record = StoredRecord::Outcome(StoredOutcome {
            id: 3,
            context_type: "Group".to_string(),
            context_id: 1,
            root_account_id: 1,
            short_description: "Explains photosynthesis".to_string(),
            workflow_state: "active".to_string(),
        });
        let err = validate_record(&record).unwrap_err();
        assert!(err.to_string().contains("context_type"));
    }

    #[test]
    fn test_unknown_enrollment_type_is_rejected() {
        let record = StoredRecord::Enrollment(StoredEnrollment {
            id: 1,
            user_id: 20,
            course_id: 10,
            enrollment_type: "AuditorEnrollment".to_string(),
            workflow_state: "active".to_string(),
        });
        assert!(validate_record(&record).is_err());
    }

    #[test]
    fn test_non_finite_score_is_rejected() {
        let record = StoredRecord::Submission(StoredSubmission {
            id: 900,
            assignment_id: 50,
            course_id: 10,
            user_id: 20,
            workflow_state: "graded".to_string(),
            score: Some(f64::NAN),
            posted_at: None,
        });
        assert!(validate_record(&record).is_err());
    }

    #[test]
    fn test_account_cannot_parent_itself() {
        let record = StoredRecord::Account(StoredAccount {
            id: 2,
            parent_account_id: Some(2),
            name: "Science".to_string(),
            workflow_state: "active".to_string(),
        });
        assert!(validate_record(&record).is_err());
    }
}
