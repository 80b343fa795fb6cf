//! Session Holder: the current authenticated identity and its change feed.
//!
//! DESIGN
//! ======
//! The holder owns a `watch` channel of [`SessionSnapshot`]s. Every change
//! (initial restore, sign-in, sign-out, token refresh) replaces the snapshot
//! and wakes subscribers. A [`SessionSubscription`] is the unsubscribe
//! handle: dropping it drops the receiver and notifications stop. A
//! subscriber that falls behind sees only the latest snapshot, which is what
//! a view re-rendering from current state needs.
//!
//! Startup restore never retries. A failed restore is logged and leaves the
//! session absent, which routes the user to the auth view.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;
use std::time::Duration;

pub use domain::AuthEvent;
use domain::Session;
use domain::model::REFRESH_MARGIN_SECS;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::backend::Backend;

/// One notification: the event plus the session after it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

pub struct SessionHolder {
    tx: watch::Sender<SessionSnapshot>,
}

impl Default for SessionHolder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHolder {
    /// Holder with no session yet.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SessionSnapshot { event: AuthEvent::InitialSession, session: None });
        Self { tx }
    }

    /// Fetch the initial session and publish `InitialSession`.
    ///
    /// With a refresh token the holder exchanges it for a session and
    /// confirms the user behind it; without one it starts absent.
    pub async fn start(&self, backend: &dyn Backend, refresh_token: Option<&str>) -> Option<Session> {
        let session = match refresh_token {
            None => None,
            Some(token) => restore(backend, token).await,
        };
        self.publish(AuthEvent::InitialSession, session.clone());
        session
    }

    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().session.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription { rx: self.tx.subscribe() }
    }

    /// Live subscription handles.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Replace the snapshot and notify subscribers.
    pub fn publish(&self, event: AuthEvent, session: Option<Session>) {
        tracing::debug!(?event, signed_in = session.is_some(), "session changed");
        self.tx.send_replace(SessionSnapshot { event, session });
    }

    /// Remote sign-out is best effort; the local session is always cleared.
    pub async fn sign_out(&self, backend: &dyn Backend) {
        if let Some(session) = self.current() {
            if let Err(e) = backend.sign_out(&session.access_token).await {
                warn!(error = %e, "remote sign-out failed; clearing local session anyway");
            }
        }
        self.publish(AuthEvent::SignedOut, None);
    }

    /// Keep the session fresh in the background.
    ///
    /// Sleeps until `REFRESH_MARGIN_SECS` before expiry, exchanges the
    /// refresh token, and publishes `TokenRefreshed`. A failed refresh
    /// publishes `SignedOut`. The task runs until aborted.
    pub fn spawn_refresh(self: Arc<Self>, backend: Arc<dyn Backend>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut rx = self.tx.subscribe();
            loop {
                let session = rx.borrow_and_update().session.clone();
                let due = session
                    .as_ref()
                    .and_then(|s| s.refresh_due_in(now_unix(), REFRESH_MARGIN_SECS));
                match (session, due) {
                    (Some(session), Some(secs)) => {
                        let delay = Duration::from_secs(u64::try_from(secs).unwrap_or(0));
                        tokio::select! {
                            changed = rx.changed() => {
                                if changed.is_err() {
                                    return;
                                }
                            }
                            () = tokio::time::sleep(delay) => {
                                self.refresh(backend.as_ref(), &session).await;
                            }
                        }
                    }
                    _ => {
                        if rx.changed().await.is_err() {
                            return;
                        }
                    }
                }
            }
        })
    }

    async fn refresh(&self, backend: &dyn Backend, session: &Session) {
        let outcome = backend.refresh_session(&session.refresh_token).await;
        // Signed out or replaced while the request was in flight.
        if self.current().map(|s| s.access_token) != Some(session.access_token.clone()) {
            return;
        }
        match outcome {
            Ok(fresh) => {
                info!(user_id = %fresh.user.id, expires_at = ?fresh.expires_at, "access token refreshed");
                self.publish(AuthEvent::TokenRefreshed, Some(fresh));
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed; signing out");
                self.publish(AuthEvent::SignedOut, None);
            }
        }
    }
}

async fn restore(backend: &dyn Backend, refresh_token: &str) -> Option<Session> {
    let mut session = match backend.refresh_session(refresh_token).await {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "session restore failed; starting signed out");
            return None;
        }
    };
    match backend.get_user(&session.access_token).await {
        Ok(user) => {
            info!(user_id = %user.id, "session restored");
            session.user = user;
            Some(session)
        }
        Err(e) => {
            warn!(error = %e, "restored token has no user; starting signed out");
            None
        }
    }
}

/// Unsubscribes on drop.
pub struct SessionSubscription {
    rx: watch::Receiver<SessionSnapshot>,
}

impl SessionSubscription {
    /// Wait for the next change. `None` once the holder is gone.
    pub async fn changed(&mut self) -> Option<SessionSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    #[must_use]
    pub fn current(&self) -> SessionSnapshot {
        self.rx.borrow().clone()
    }
}

pub(crate) fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}
