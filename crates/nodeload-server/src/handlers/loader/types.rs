//! Data types for batch load operations.

use nodeload_domain::error::DomainError;
use nodeload_domain::model::{LookupKey, Node, RequestContext, TypeTag};
use nodeload_domain::resolver::ResolveStrategy;
use serde::{Deserialize, Serialize};

/// Maximum number of loads accepted in one request.
pub const MAX_BATCH_SIZE: usize = 100;

/// A single load within a batch request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoadItem {
    /// Wire type tag (e.g., "LearningOutcome", "TermBySis").
    #[serde(rename = "type")]
    pub type_tag: String,
    /// Scalar id or structured key, as sent by the client.
    pub key: serde_json::Value,
}

impl LoadItem {
    pub fn new(type_tag: impl Into<String>, key: impl Into<serde_json::Value>) -> Self {
        Self {
            type_tag: type_tag.into(),
            key: key.into(),
        }
    }

    /// The key in the canonical form of its tag's strategy.
    ///
    /// Keys of unknown tags are normalized generically; those items fail
    /// before any lookup.
    pub fn lookup_key(&self) -> LookupKey {
        let key = LookupKey::from(self.key.clone());
        match TypeTag::parse(self.type_tag.trim()) {
            Ok(tag) => ResolveStrategy::for_tag(tag).canonical_key(&key),
            Err(_) => key.normalized(),
        }
    }
}

/// Request for a batch of loads made on behalf of one principal.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadRequest {
    /// Requesting user; `None` for an anonymous request.
    #[serde(default)]
    pub user_id: Option<u64>,
    /// Root account (tenant) the request is scoped to.
    pub root_account_id: u64,
    /// Correlation id carried into logs.
    #[serde(default)]
    pub request_id: Option<String>,
    pub loads: Vec<LoadItem>,
}

impl LoadRequest {
    pub fn new(root_account_id: u64, user_id: Option<u64>, loads: Vec<LoadItem>) -> Self {
        Self {
            user_id,
            root_account_id,
            request_id: None,
            loads,
        }
    }

    /// Builds the context every load of this request runs under.
    pub fn context(&self) -> RequestContext {
        let mut context = RequestContext::new(self.root_account_id);
        if let Some(user_id) = self.user_id {
            context = context.with_user(user_id);
        }
        if let Some(request_id) = &self.request_id {
            context = context.with_request_id(request_id.clone());
        }
        context
    }
}

/// Outcome of one load.
///
/// Serializes as the node itself, `null`, or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LoadItemResult {
    Found(Node),
    Failed { error: String },
    Absent,
}

impl LoadItemResult {
    pub fn node(&self) -> Option<&Node> {
        match self {
            LoadItemResult::Found(node) => Some(node),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadItemResult::Failed { error } => Some(error),
            _ => None,
        }
    }
}

impl From<Result<Option<Node>, DomainError>> for LoadItemResult {
    fn from(result: Result<Option<Node>, DomainError>) -> Self {
        match result {
            Ok(Some(node)) => LoadItemResult::Found(node),
            Ok(None) => LoadItemResult::Absent,
            Err(err) => LoadItemResult::Failed {
                error: err.to_string(),
            },
        }
    }
}

/// Response from a batch load, one result per request item, in order.
#[derive(Debug, Clone, Serialize)]
pub struct LoadResponse {
    pub results: Vec<LoadItemResult>,
}

/// Errors that reject a whole load request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    /// The request has no loads.
    #[error("load request cannot be empty")]
    EmptyRequest,

    /// The request exceeds the maximum allowed size.
    #[error("batch size {size} exceeds maximum allowed {max}")]
    RequestTooLarge { size: usize, max: usize },

    /// A load item has invalid format.
    #[error("invalid load at index {index}: {message}")]
    InvalidItem { index: usize, message: String },

    /// Domain error during a single load.
    #[error("load error: {0}")]
    Domain(#[from] DomainError),
}

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;
