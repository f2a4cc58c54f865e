//! Application state for shared services

use std::sync::Arc;
use std::time::Duration;

use crate::domain::CallContext;
use crate::infrastructure::session::SessionService;
use crate::infrastructure::user::UserService;

/// Services shared by all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub session_service: Arc<SessionService>,
    /// Deadline applied to each request's store calls
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        user_service: Arc<UserService>,
        session_service: Arc<SessionService>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            user_service,
            session_service,
            request_timeout,
        }
    }

    /// A fresh context bounded by the request timeout
    pub fn request_context(&self) -> CallContext {
        CallContext::with_timeout(self.request_timeout)
    }
}
