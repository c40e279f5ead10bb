//! Node resolver: dispatch, fetch and visibility check.

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{DomainError, DomainResult};
use crate::model::{LookupKey, Node, RequestContext, TypeTag};
use crate::permissions::Authorizer;

use super::config::ResolverConfig;
use super::strategy::{passes_anonymity, ResolveStrategy};
use super::traits::EntityReader;

/// Resolves `(type tag, key, context)` to a visible node or absence.
///
/// Absence covers every non-fatal outcome: malformed key, no such record,
/// soft-deleted record, record of another root account, anonymity
/// suppression and failed visibility check. Only an unknown tag, a store
/// failure or a timeout produce an error.
pub struct NodeResolver<R, A> {
    reader: Arc<R>,
    authorizer: Arc<A>,
    config: ResolverConfig,
}

impl<R, A> NodeResolver<R, A>
where
    R: EntityReader + 'static,
    A: Authorizer + 'static,
{
    /// Creates a new node resolver.
    pub fn new(reader: Arc<R>, authorizer: Arc<A>) -> Self {
        Self::with_config(reader, authorizer, ResolverConfig::default())
    }

    /// Creates a new node resolver with custom configuration.
    pub fn with_config(reader: Arc<R>, authorizer: Arc<A>, config: ResolverConfig) -> Self {
        Self {
            reader,
            authorizer,
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves a node from its wire type tag.
    pub async fn resolve(
        &self,
        type_tag: &str,
        key: &LookupKey,
        context: &RequestContext,
    ) -> DomainResult<Option<Node>> {
        let tag = TypeTag::parse(type_tag)?;
        self.resolve_tag(tag, key, context).await
    }

    /// Resolves a node for an already parsed tag.
    pub async fn resolve_tag(
        &self,
        tag: TypeTag,
        key: &LookupKey,
        context: &RequestContext,
    ) -> DomainResult<Option<Node>> {
        let fetch_timeout = self.config.fetch_timeout;
        match timeout(fetch_timeout, self.resolve_unbounded(tag, key, context)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%tag, %key, request_id = %context.request_id, "resolution timed out");
                Err(DomainError::Timeout {
                    duration_ms: u64::try_from(fetch_timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }

    async fn resolve_unbounded(
        &self,
        tag: TypeTag,
        key: &LookupKey,
        context: &RequestContext,
    ) -> DomainResult<Option<Node>> {
        let strategy = ResolveStrategy::for_tag(tag);
        let Some(node) = strategy.fetch(self.reader.as_ref(), key, context).await? else {
            debug!(%tag, %key, "no record");
            return Ok(None);
        };

        if node.kind() != strategy.node_kind() {
            return Err(DomainError::InvalidRecord {
                message: format!(
                    "{tag} lookup returned a {} record",
                    node.kind().as_str()
                ),
            });
        }

        if node.is_deleted() {
            debug!(%tag, id = node.id(), "record is deleted");
            return Ok(None);
        }

        if let Some(submission) = node.as_submission() {
            if !passes_anonymity(self.reader.as_ref(), submission, context).await? {
                return Ok(None);
            }
        }

        if !self
            .authorizer
            .can_view(context.current_user_id, &node)
            .await?
        {
            debug!(%tag, id = node.id(), user_id = ?context.current_user_id, "not visible to principal");
            return Ok(None);
        }

        Ok(Some(node))
    }
}
