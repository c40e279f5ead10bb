//! Per-request resolution context.

/// Acting principal and ambient request metadata.
///
/// A context is built once per outer operation and threaded by reference into
/// every resolution; nothing reads request state from globals.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestContext {
    /// The signed-in user, or `None` for an anonymous request.
    pub current_user_id: Option<u64>,
    /// Tenant the request was made against. Records of other root accounts
    /// are never resolved.
    pub domain_root_account_id: u64,
    /// Correlation id used in log output.
    pub request_id: String,
}

impl RequestContext {
    /// Creates an anonymous context for the given root account.
    pub fn new(domain_root_account_id: u64) -> Self {
        Self {
            current_user_id: None,
            domain_root_account_id,
            request_id: String::new(),
        }
    }

    /// Creates a context for a signed-in user.
    pub fn for_user(domain_root_account_id: u64, user_id: u64) -> Self {
        Self::new(domain_root_account_id).with_user(user_id)
    }

    pub fn with_user(mut self, user_id: u64) -> Self {
        self.current_user_id = Some(user_id);
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Returns true when `user_id` is the acting principal.
    pub fn is_user(&self, user_id: u64) -> bool {
        self.current_user_id == Some(user_id)
    }
}
