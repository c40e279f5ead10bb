//! Batch load handler implementation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, instrument};

use nodeload_domain::model::{LookupKey, Node, RequestContext};
use nodeload_domain::permissions::Authorizer;
use nodeload_domain::resolver::{EntityReader, NodeResolver};

use super::scope::BatchScope;
use super::types::{
    LoadError, LoadItem, LoadItemResult, LoadRequest, LoadResponse, LoadResult, MAX_BATCH_SIZE,
};

/// Key for identifying identical items within one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ItemKey {
    type_tag: String,
    key: LookupKey,
}

impl From<&LoadItem> for ItemKey {
    fn from(item: &LoadItem) -> Self {
        Self {
            type_tag: item.type_tag.trim().to_string(),
            key: item.lookup_key(),
        }
    }
}

/// Handler for batched node loads.
///
/// Processes a request with two-stage deduplication:
/// 1. Intra-batch: identical items within a request resolve once
/// 2. Scope: concurrent loads of the same key share one flight
pub struct LoadHandler<R, A>
where
    R: EntityReader + 'static,
    A: Authorizer + 'static,
{
    resolver: Arc<NodeResolver<R, A>>,
    max_batch_size: usize,
    metrics_enabled: bool,
}

impl<R, A> LoadHandler<R, A>
where
    R: EntityReader + 'static,
    A: Authorizer + 'static,
{
    /// Creates a new load handler.
    pub fn new(resolver: Arc<NodeResolver<R, A>>) -> Self {
        Self {
            resolver,
            max_batch_size: MAX_BATCH_SIZE,
            metrics_enabled: true,
        }
    }

    /// Lowers the per-request item limit. Values above `MAX_BATCH_SIZE` are capped.
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.min(MAX_BATCH_SIZE);
        self
    }

    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    /// Opens a fresh coalescing scope for one outer operation.
    pub fn scope(&self) -> BatchScope<R, A> {
        BatchScope::new(Arc::clone(&self.resolver)).with_metrics(self.metrics_enabled)
    }

    /// Validates a load request.
    pub fn validate(&self, request: &LoadRequest) -> LoadResult<()> {
        if request.loads.is_empty() {
            return Err(LoadError::EmptyRequest);
        }

        if request.loads.len() > self.max_batch_size {
            return Err(LoadError::RequestTooLarge {
                size: request.loads.len(),
                max: self.max_batch_size,
            });
        }

        for (index, item) in request.loads.iter().enumerate() {
            if item.type_tag.trim().is_empty() {
                return Err(LoadError::InvalidItem {
                    index,
                    message: "type cannot be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Executes a load request in its own scope.
    ///
    /// The results are returned in the same order as the input items. A
    /// fatal error on one item is reported on that item only.
    #[instrument(skip(self, request), fields(items = request.loads.len()))]
    pub async fn load_many(&self, request: LoadRequest) -> LoadResult<LoadResponse> {
        self.validate(&request)?;
        let context = request.context();

        // Stage 1: intra-batch deduplication
        let mut unique_items: Vec<ItemKey> = Vec::new();
        let mut key_to_index: HashMap<ItemKey, usize> = HashMap::new();
        let mut position_to_unique: Vec<usize> = Vec::with_capacity(request.loads.len());

        for item in &request.loads {
            let key = ItemKey::from(item);
            let unique_index = *key_to_index.entry(key.clone()).or_insert_with(|| {
                unique_items.push(key);
                unique_items.len() - 1
            });
            position_to_unique.push(unique_index);
        }
        debug!(unique = unique_items.len(), "deduplicated load request");

        // Stage 2: resolve unique items concurrently through one scope
        let scope = self.scope();
        let load_futures = unique_items
            .iter()
            .map(|item| scope.load(&item.type_tag, &item.key, &context));
        let unique_results: Vec<LoadItemResult> = join_all(load_futures)
            .await
            .into_iter()
            .map(LoadItemResult::from)
            .collect();

        // Map results back to original positions
        let results = position_to_unique
            .iter()
            .map(|&idx| unique_results[idx].clone())
            .collect();

        Ok(LoadResponse { results })
    }

    /// Loads a single node in a fresh scope.
    pub async fn load_one(
        &self,
        type_tag: &str,
        key: &LookupKey,
        context: &RequestContext,
    ) -> LoadResult<Option<Node>> {
        Ok(self.scope().load(type_tag, key, context).await?)
    }

    /// Returns statistics about deduplication for a load request.
    /// Returns (total_items, unique_items).
    pub fn dedup_stats(&self, request: &LoadRequest) -> (usize, usize) {
        let seen: HashSet<ItemKey> = request.loads.iter().map(ItemKey::from).collect();
        (request.loads.len(), seen.len())
    }
}
