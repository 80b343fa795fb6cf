//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is built once at startup and cloned into every front-end task.
//! It holds the backend seam, the Session Holder, and the auth flow. A feed
//! controller is created per identity, so it is not stored here.

use std::sync::Arc;

use crate::auth::AuthFlow;
use crate::backend::Backend;
use crate::backend::hosted::HostedBackend;
use crate::config::ClientConfig;
use crate::error::BackendError;
use crate::feed::FeedController;
use crate::session::SessionHolder;

/// Clone is cheap: every field is `Arc`-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn Backend>,
    pub sessions: Arc<SessionHolder>,
    pub auth: Arc<AuthFlow>,
}

impl AppState {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let sessions = Arc::new(SessionHolder::new());
        let auth = Arc::new(AuthFlow::new(backend.clone(), sessions.clone()));
        Self { backend, sessions, auth }
    }

    /// State over the hosted backend described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, BackendError> {
        let backend: Arc<dyn Backend> = Arc::new(HostedBackend::new(config)?);
        Ok(Self::new(backend))
    }

    /// Feed controller for whoever is signed in right now.
    #[must_use]
    pub fn feed(&self) -> FeedController {
        FeedController::new(self.backend.clone(), self.sessions.current())
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
