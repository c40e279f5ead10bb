//! Per-request batch scope that coalesces identical loads.

use std::sync::Arc;

use dashmap::DashMap;
use metrics::counter;
use tracing::{debug, instrument, warn};

use nodeload_domain::error::DomainResult;
use nodeload_domain::model::{LookupKey, Node, RequestContext, TypeTag};
use nodeload_domain::permissions::Authorizer;
use nodeload_domain::resolver::{EntityReader, NodeResolver, ResolveStrategy};

use super::singleflight::{Singleflight, SingleflightGuard, SingleflightSlot};

/// Identity of one load inside a scope.
///
/// Two loads coalesce only when they would resolve identically: same tag,
/// same canonical key for the tag's strategy, same principal and same root
/// account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct LoadKey {
    tag: TypeTag,
    key: LookupKey,
    user_id: Option<u64>,
    root_account_id: u64,
}

impl LoadKey {
    pub(crate) fn new(tag: TypeTag, key: &LookupKey, context: &RequestContext) -> Self {
        Self {
            tag,
            key: ResolveStrategy::for_tag(tag).canonical_key(key),
            user_id: context.current_user_id,
            root_account_id: context.domain_root_account_id,
        }
    }
}

type FlightResult = DomainResult<Option<Node>>;

/// Coalescing scope for one outer operation.
///
/// Each key moves from *pending* (a flight is running; later callers attach
/// to it) to *resolved* (the value is kept and returned immediately). Failed
/// flights are delivered to their waiters but not kept, so a later load of
/// the same key starts over. Nothing outlives the scope.
pub struct BatchScope<R, A>
where
    R: EntityReader + 'static,
    A: Authorizer + 'static,
{
    resolver: Arc<NodeResolver<R, A>>,
    resolved: DashMap<LoadKey, Option<Node>>,
    flights: Singleflight<LoadKey, FlightResult>,
    metrics_enabled: bool,
}

impl<R, A> BatchScope<R, A>
where
    R: EntityReader + 'static,
    A: Authorizer + 'static,
{
    pub fn new(resolver: Arc<NodeResolver<R, A>>) -> Self {
        Self {
            resolver,
            resolved: DashMap::new(),
            flights: Singleflight::new(),
            metrics_enabled: true,
        }
    }

    /// Enables or disables the `nodeload_*` counters for this scope.
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    /// Loads a node by wire type tag and key.
    ///
    /// Returns `Ok(None)` for anything missing or not visible. Fails only for
    /// an unknown tag or a fatal resolution error.
    #[instrument(skip(self, key, context), fields(request_id = %context.request_id))]
    pub async fn load(
        &self,
        type_tag: &str,
        key: &LookupKey,
        context: &RequestContext,
    ) -> FlightResult {
        self.count("nodeload_loads_total");
        let tag = match TypeTag::parse(type_tag) {
            Ok(tag) => tag,
            Err(err) => {
                self.count("nodeload_load_errors_total");
                return Err(err);
            }
        };
        self.load_tag(LoadKey::new(tag, key, context), context).await
    }

    /// Number of keys resolved so far.
    pub fn resolved_len(&self) -> usize {
        self.resolved.len()
    }

    async fn load_tag(&self, load_key: LoadKey, context: &RequestContext) -> FlightResult {
        if let Some(value) = self.resolved.get(&load_key) {
            self.count("nodeload_coalesced_total");
            return Ok(value.value().clone());
        }

        match self.flights.acquire(load_key.clone()) {
            SingleflightSlot::Follower(mut receiver) => match receiver.recv().await {
                Ok(result) => {
                    self.count("nodeload_coalesced_total");
                    result
                }
                Err(_) => {
                    // Leader went away without a result; take over
                    debug!(tag = %load_key.tag, key = %load_key.key, "retrying abandoned load");
                    Box::pin(self.load_tag(load_key, context)).await
                }
            },
            SingleflightSlot::Leader(sender) => {
                let guard = SingleflightGuard::new(&self.flights, load_key.clone());

                // A flight may have finished between the lookup above and acquire
                if let Some(value) = self.resolved.get(&load_key).map(|v| v.value().clone()) {
                    let result = Ok(value);
                    let _ = sender.send(result.clone());
                    guard.complete();
                    self.count("nodeload_coalesced_total");
                    return result;
                }

                self.count("nodeload_fetches_total");
                let result = self
                    .resolver
                    .resolve_tag(load_key.tag, &load_key.key, context)
                    .await;

                match &result {
                    Ok(value) => {
                        self.resolved.insert(load_key.clone(), value.clone());
                    }
                    Err(err) => {
                        warn!(tag = %load_key.tag, key = %load_key.key, error = %err, "load failed");
                        self.count("nodeload_load_errors_total");
                    }
                }

                // Broadcast the result to any waiters (ignore send errors - no receivers)
                let _ = sender.send(result.clone());
                guard.complete();

                result
            }
        }
    }

    fn count(&self, name: &'static str) {
        if self.metrics_enabled {
            counter!(name).increment(1);
        }
    }
}
