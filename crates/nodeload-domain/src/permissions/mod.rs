//! Visibility policy for resolved nodes.
//!
//! The resolver asks an [`Authorizer`] whether the acting principal may view a
//! node it has fetched. [`MembershipAuthorizer`] is the default policy, backed
//! by account admin grants and course enrollments:
//!
//! | Node | Visible to |
//! |------|------------|
//! | Account-owned outcome / group | admins of the account or an ancestor |
//! | Course-owned outcome / group | anyone who can view the course |
//! | Enrollment term | admins of the term's root account |
//! | Course | active enrollments, admins of the course's account chain |
//! | Assignment | as course; unpublished ones are hidden from students and observers |
//! | Submission | its owner, course teachers and TAs, course admins |
//!
//! An anonymous principal sees nothing.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DomainResult;
use crate::model::{ContextRef, EnrollmentRole, Node, WorkflowState};
use crate::resolver::MembershipReader;

/// Decides whether a principal may view a node.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn can_view(&self, principal: Option<u64>, node: &Node) -> DomainResult<bool>;
}

/// Membership-backed visibility policy.
pub struct MembershipAuthorizer<M> {
    memberships: Arc<M>,
}

impl<M: MembershipReader> MembershipAuthorizer<M> {
    pub fn new(memberships: Arc<M>) -> Self {
        Self { memberships }
    }

    /// Admin grants are inherited down the account tree.
    async fn is_admin_of_chain(&self, user_id: u64, account_id: u64) -> DomainResult<bool> {
        for account in self.memberships.account_chain(account_id).await? {
            if self.memberships.is_account_admin(user_id, account).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn is_course_admin(&self, user_id: u64, course_id: u64) -> DomainResult<bool> {
        match self.memberships.course_account(course_id).await? {
            Some(account_id) => self.is_admin_of_chain(user_id, account_id).await,
            None => Ok(false),
        }
    }

    async fn active_roles(&self, user_id: u64, course_id: u64) -> DomainResult<Vec<EnrollmentRole>> {
        Ok(self
            .memberships
            .course_enrollments(user_id, course_id)
            .await?
            .into_iter()
            .filter(|e| e.active)
            .map(|e| e.role)
            .collect())
    }

    async fn can_view_course(&self, user_id: u64, course_id: u64) -> DomainResult<bool> {
        if !self.active_roles(user_id, course_id).await?.is_empty() {
            return Ok(true);
        }
        self.is_course_admin(user_id, course_id).await
    }

    async fn can_view_context(&self, user_id: u64, context: ContextRef) -> DomainResult<bool> {
        match context {
            ContextRef::Account(account_id) => self.is_admin_of_chain(user_id, account_id).await,
            ContextRef::Course(course_id) => self.can_view_course(user_id, course_id).await,
        }
    }
}

#[async_trait]
impl<M: MembershipReader + 'static> Authorizer for MembershipAuthorizer<M> {
    async fn can_view(&self, principal: Option<u64>, node: &Node) -> DomainResult<bool> {
        let Some(user_id) = principal else {
            return Ok(false);
        };

        match node {
            Node::LearningOutcome(outcome) => self.can_view_context(user_id, outcome.context).await,
            Node::LearningOutcomeGroup(group) => self.can_view_context(user_id, group.context).await,
            Node::EnrollmentTerm(term) => self.is_admin_of_chain(user_id, term.root_account_id).await,
            Node::Course(course) => self.can_view_course(user_id, course.id).await,
            Node::Assignment(assignment) => {
                let roles = self.active_roles(user_id, assignment.course_id).await?;
                let published = assignment.workflow_state != WorkflowState::Unpublished;
                if roles.iter().any(|role| {
                    published
                        || !matches!(role, EnrollmentRole::Student | EnrollmentRole::Observer)
                }) {
                    return Ok(true);
                }
                self.is_course_admin(user_id, assignment.course_id).await
            }
            Node::Submission(submission) => {
                if submission.user_id == user_id {
                    return Ok(true);
                }
                let roles = self.active_roles(user_id, submission.course_id).await?;
                if roles.iter().any(EnrollmentRole::is_grader) {
                    return Ok(true);
                }
                self.is_course_admin(user_id, submission.course_id).await
            }
        }
    }
}
