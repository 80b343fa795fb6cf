//! Session Holder state for the browser.
//!
//! SYSTEM CONTEXT
//! ==============
//! Provided as `RwSignal<SessionState>` by the root `App`. The root mounts
//! the auth page or the feed page from [`SessionState::user_id`]; every
//! publish notifies the signal's subscribers, and a component's reactive
//! scope is its subscription handle.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use domain::model::REFRESH_MARGIN_SECS;
use domain::wire::PublicConfig;
use domain::{AuthEvent, Session};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionState {
    /// Backend settings from the host; `None` until loaded.
    pub config: Option<PublicConfig>,
    pub session: Option<Session>,
    pub last_event: AuthEvent,
    /// True until the initial session fetch settles.
    pub loading: bool,
    /// Set when the backend settings could not be loaded.
    pub config_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            config: None,
            session: None,
            last_event: AuthEvent::InitialSession,
            loading: true,
            config_error: None,
        }
    }
}

impl SessionState {
    /// Record a session change.
    pub fn publish(&mut self, event: AuthEvent, session: Option<Session>) {
        self.last_event = event;
        self.session = session;
        if event == AuthEvent::InitialSession {
            self.loading = false;
        }
    }

    #[must_use]
    pub fn user_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.user.id)
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.session.as_ref().map(|s| s.access_token.clone())
    }

    /// Milliseconds until the current session should be refreshed.
    #[must_use]
    pub fn refresh_delay_ms(&self, now_unix: i64) -> Option<u64> {
        let secs = self.session.as_ref()?.refresh_due_in(now_unix, REFRESH_MARGIN_SECS)?;
        u64::try_from(secs).ok().map(|s| s.saturating_mul(1_000))
    }

    /// What a scheduled refresh depends on: the token and its expiry.
    #[must_use]
    pub fn refresh_key(&self) -> Option<(String, i64)> {
        let session = self.session.as_ref()?;
        Some((session.access_token.clone(), session.expires_at?))
    }

    /// Backend settings and session together, when both are present.
    #[must_use]
    pub fn identity(&self) -> Option<(PublicConfig, Session)> {
        self.config.clone().zip(self.session.clone())
    }
}
