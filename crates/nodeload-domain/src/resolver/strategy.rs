//! Dispatch table and per-type lookup strategies.

use tracing::debug;

use crate::error::DomainResult;
use crate::model::{CompositeKey, LookupKey, Node, NodeKind, RequestContext, Submission, TypeTag};

use super::traits::EntityReader;

/// How the records behind a type tag are looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStrategy {
    /// Scalar primary key inside the request's root account.
    PrimaryKey(NodeKind),
    /// Scalar external (SIS) id inside the request's root account.
    ExternalId(NodeKind),
    /// Structured key joined on several fields.
    CompositeKey(NodeKind),
}

impl ResolveStrategy {
    /// The dispatch table. Adding a [`TypeTag`] fails to compile until it is
    /// registered here.
    pub fn for_tag(tag: TypeTag) -> Self {
        match tag {
            TypeTag::LearningOutcome
            | TypeTag::LearningOutcomeGroup
            | TypeTag::Term
            | TypeTag::Course
            | TypeTag::Assignment
            | TypeTag::Submission => ResolveStrategy::PrimaryKey(tag.node_kind()),
            TypeTag::TermBySis | TypeTag::CourseBySis => {
                ResolveStrategy::ExternalId(tag.node_kind())
            }
            TypeTag::SubmissionByAssignmentAndUser => {
                ResolveStrategy::CompositeKey(tag.node_kind())
            }
        }
    }

    pub fn node_kind(&self) -> NodeKind {
        match self {
            ResolveStrategy::PrimaryKey(kind)
            | ResolveStrategy::ExternalId(kind)
            | ResolveStrategy::CompositeKey(kind) => *kind,
        }
    }

    /// Returns the form of `key` used to look the record up and to coalesce
    /// identical loads.
    ///
    /// External ids are opaque text and are only trimmed; primary and
    /// composite keys normalize numeric text to numbers.
    pub fn canonical_key(&self, key: &LookupKey) -> LookupKey {
        match self {
            ResolveStrategy::ExternalId(_) => key.normalized_external(),
            ResolveStrategy::PrimaryKey(_) | ResolveStrategy::CompositeKey(_) => key.normalized(),
        }
    }

    /// Fetches the record the key points at.
    ///
    /// A key of the wrong shape for the strategy yields `Ok(None)`.
    pub(crate) async fn fetch<R>(
        &self,
        reader: &R,
        key: &LookupKey,
        context: &RequestContext,
    ) -> DomainResult<Option<Node>>
    where
        R: EntityReader + ?Sized,
    {
        match *self {
            ResolveStrategy::PrimaryKey(kind) => {
                let Some(id) = key.as_id() else {
                    debug!(%kind, %key, "key is not a primary key");
                    return Ok(None);
                };
                reader
                    .fetch_by_primary_key(kind, id, context.domain_root_account_id)
                    .await
            }
            ResolveStrategy::ExternalId(kind) => {
                let Some(sis_id) = key.as_external_id() else {
                    debug!(%kind, %key, "key is not an external id");
                    return Ok(None);
                };
                reader
                    .fetch_by_external_id(kind, &sis_id, context.domain_root_account_id)
                    .await
            }
            ResolveStrategy::CompositeKey(kind) => {
                let Some(composite) = composite_key_for(kind, key) else {
                    debug!(%kind, %key, "key does not match composite shape");
                    return Ok(None);
                };
                reader
                    .fetch_by_composite_key(kind, &composite, context.domain_root_account_id)
                    .await
            }
        }
    }
}

fn composite_key_for(kind: NodeKind, key: &LookupKey) -> Option<CompositeKey> {
    match kind {
        NodeKind::Submission => CompositeKey::assignment_and_user(key),
        _ => None,
    }
}

/// Applies the anonymous grading rule to a fetched submission.
///
/// While the assignment grades anonymously and the submission has not been
/// posted, only the submission's owner may see it. Returns `false` when the
/// submission must be suppressed, including when its assignment is not
/// visible inside the request's root account.
pub(crate) async fn passes_anonymity<R>(
    reader: &R,
    submission: &Submission,
    context: &RequestContext,
) -> DomainResult<bool>
where
    R: EntityReader + ?Sized,
{
    if context.is_user(submission.user_id) {
        return Ok(true);
    }

    let assignment = reader
        .fetch_by_primary_key(
            NodeKind::Assignment,
            submission.assignment_id,
            context.domain_root_account_id,
        )
        .await?;
    let Some(assignment) = assignment.as_ref().and_then(Node::as_assignment) else {
        debug!(
            assignment_id = submission.assignment_id,
            "submission's assignment not found in scope"
        );
        return Ok(false);
    };

    let actively_anonymous = assignment.anonymous_grading && !submission.is_posted();
    if actively_anonymous {
        debug!(
            submission_id = submission.id,
            assignment_id = assignment.id,
            "suppressing anonymous submission"
        );
    }
    Ok(!actively_anonymous)
}
