//! Domain objects returned by the resolver.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::NodeKind;
use crate::error::DomainError;

/// Lifecycle state shared by accounts, courses, terms, outcomes and assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Active,
    Unpublished,
    Completed,
    Deleted,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Active => "active",
            WorkflowState::Unpublished => "unpublished",
            WorkflowState::Completed => "completed",
            WorkflowState::Deleted => "deleted",
        }
    }
}

impl FromStr for WorkflowState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" | "available" => Ok(WorkflowState::Active),
            "unpublished" | "created" | "claimed" => Ok(WorkflowState::Unpublished),
            "completed" => Ok(WorkflowState::Completed),
            "deleted" => Ok(WorkflowState::Deleted),
            other => Err(DomainError::InvalidRecord {
                message: format!("unknown workflow state: {other}"),
            }),
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    Unsubmitted,
    Submitted,
    PendingReview,
    Graded,
    Deleted,
}

impl FromStr for SubmissionState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unsubmitted" => Ok(SubmissionState::Unsubmitted),
            "submitted" => Ok(SubmissionState::Submitted),
            "pending_review" => Ok(SubmissionState::PendingReview),
            "graded" => Ok(SubmissionState::Graded),
            "deleted" => Ok(SubmissionState::Deleted),
            other => Err(DomainError::InvalidRecord {
                message: format!("unknown submission state: {other}"),
            }),
        }
    }
}

/// Role a user holds in a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentRole {
    Teacher,
    Ta,
    Designer,
    Student,
    Observer,
}

impl EnrollmentRole {
    /// Teachers and TAs grade; they may see every submission in the course.
    pub fn is_grader(&self) -> bool {
        matches!(self, EnrollmentRole::Teacher | EnrollmentRole::Ta)
    }
}

impl FromStr for EnrollmentRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "teacher" | "TeacherEnrollment" => Ok(EnrollmentRole::Teacher),
            "ta" | "TaEnrollment" => Ok(EnrollmentRole::Ta),
            "designer" | "DesignerEnrollment" => Ok(EnrollmentRole::Designer),
            "student" | "StudentEnrollment" => Ok(EnrollmentRole::Student),
            "observer" | "ObserverEnrollment" => Ok(EnrollmentRole::Observer),
            other => Err(DomainError::InvalidRecord {
                message: format!("unknown enrollment role: {other}"),
            }),
        }
    }
}

/// A user's membership in a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    pub user_id: u64,
    pub course_id: u64,
    pub role: EnrollmentRole,
    /// Only active enrollments grant visibility.
    pub active: bool,
}

/// Owner of an outcome or outcome group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "id")]
pub enum ContextRef {
    Account(u64),
    Course(u64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningOutcome {
    pub id: u64,
    pub context: ContextRef,
    pub root_account_id: u64,
    pub short_description: String,
    pub workflow_state: WorkflowState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningOutcomeGroup {
    pub id: u64,
    pub context: ContextRef,
    pub root_account_id: u64,
    pub title: String,
    pub parent_group_id: Option<u64>,
    pub workflow_state: WorkflowState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrollmentTerm {
    pub id: u64,
    pub root_account_id: u64,
    pub name: String,
    pub sis_source_id: Option<String>,
    pub workflow_state: WorkflowState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Course {
    pub id: u64,
    pub root_account_id: u64,
    pub account_id: u64,
    pub name: String,
    pub sis_source_id: Option<String>,
    pub workflow_state: WorkflowState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub id: u64,
    pub course_id: u64,
    pub root_account_id: u64,
    pub title: String,
    /// Hides student identity from graders until grades are posted.
    pub anonymous_grading: bool,
    pub workflow_state: WorkflowState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub id: u64,
    pub assignment_id: u64,
    pub course_id: u64,
    pub user_id: u64,
    pub workflow_state: SubmissionState,
    pub score: Option<f64>,
    /// Set once the grade has been released to the student.
    pub posted_at: Option<DateTime<Utc>>,
}

impl Submission {
    pub fn is_posted(&self) -> bool {
        self.posted_at.is_some()
    }
}

/// A resolved domain object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "__typename")]
pub enum Node {
    LearningOutcome(LearningOutcome),
    LearningOutcomeGroup(LearningOutcomeGroup),
    EnrollmentTerm(EnrollmentTerm),
    Course(Course),
    Assignment(Assignment),
    Submission(Submission),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::LearningOutcome(_) => NodeKind::LearningOutcome,
            Node::LearningOutcomeGroup(_) => NodeKind::LearningOutcomeGroup,
            Node::EnrollmentTerm(_) => NodeKind::EnrollmentTerm,
            Node::Course(_) => NodeKind::Course,
            Node::Assignment(_) => NodeKind::Assignment,
            Node::Submission(_) => NodeKind::Submission,
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            Node::LearningOutcome(n) => n.id,
            Node::LearningOutcomeGroup(n) => n.id,
            Node::EnrollmentTerm(n) => n.id,
            Node::Course(n) => n.id,
            Node::Assignment(n) => n.id,
            Node::Submission(n) => n.id,
        }
    }

    /// Soft-deleted records are never resolved.
    pub fn is_deleted(&self) -> bool {
        match self {
            Node::LearningOutcome(n) => n.workflow_state == WorkflowState::Deleted,
            Node::LearningOutcomeGroup(n) => n.workflow_state == WorkflowState::Deleted,
            Node::EnrollmentTerm(n) => n.workflow_state == WorkflowState::Deleted,
            Node::Course(n) => n.workflow_state == WorkflowState::Deleted,
            Node::Assignment(n) => n.workflow_state == WorkflowState::Deleted,
            Node::Submission(n) => n.workflow_state == SubmissionState::Deleted,
        }
    }

    pub fn as_submission(&self) -> Option<&Submission> {
        match self {
            Node::Submission(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_assignment(&self) -> Option<&Assignment> {
        match self {
            Node::Assignment(a) => Some(a),
            _ => None,
        }
    }
}
