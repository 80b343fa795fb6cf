//! Auth flow: the auth form driven against the backend.
//!
//! DESIGN
//! ======
//! [`AuthForm`] owns validation and the `idle -> submitting -> idle`
//! machine. This module runs the network calls between `begin` and `finish`,
//! publishes new sessions to the [`SessionHolder`], and upserts the user's
//! profile after any successful authentication.
//!
//! ERROR HANDLING
//! ==============
//! Profile upsert failures never fail the action: they are logged at `warn`
//! and handed back in [`Settled::soft`]. A row-level-security rejection on
//! the auth path is treated the same way.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use domain::{AuthAction, AuthForm, Credentials, FeedError, Settled, User, profile_for, username_hint};
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::error::BackendError;
use crate::session::{AuthEvent, SessionHolder};

pub struct AuthFlow {
    backend: Arc<dyn Backend>,
    sessions: Arc<SessionHolder>,
    form: Mutex<AuthForm>,
}

impl AuthFlow {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, sessions: Arc<SessionHolder>) -> Self {
        Self { backend, sessions, form: Mutex::new(AuthForm::new()) }
    }

    /// Snapshot of the form for rendering.
    #[must_use]
    pub fn form(&self) -> AuthForm {
        self.lock_form().clone()
    }

    /// Submit `email`/`password` for `action`.
    ///
    /// A submission while another is in flight is ignored. Validation
    /// failures leave the form idle with its error set.
    pub async fn submit(&self, action: AuthAction, email: &str, password: &str) -> Settled<AuthForm> {
        let credentials = {
            let mut form = self.lock_form();
            if form.is_submitting() {
                debug!(?action, "auth submit ignored; already submitting");
                return Settled::clean(form.clone());
            }
            email.clone_into(&mut form.email);
            password.clone_into(&mut form.password);
            match form.begin(action) {
                Ok(credentials) => credentials,
                Err(rejection) => {
                    debug!(?action, ?rejection, "auth form rejected");
                    return Settled::clean(form.clone());
                }
            }
        };

        let mut settled = Settled::clean(());
        let outcome = match action {
            AuthAction::SignIn => self.sign_in(&credentials, &mut settled).await,
            AuthAction::SignUp => self.sign_up(&credentials, &mut settled).await,
        };

        let mut form = self.lock_form();
        if let Some(soft) = form.finish(outcome) {
            warn!(?action, error = %soft, "auth failure not shown");
            settled.absorb(soft);
        }
        settled.map(|()| form.clone())
    }

    async fn sign_in(&self, credentials: &Credentials, settled: &mut Settled<()>) -> Result<(), FeedError> {
        let session = self
            .backend
            .sign_in_with_password(credentials)
            .await
            .map_err(BackendError::into_auth_error)?;
        info!(user_id = %session.user.id, "signed in");
        self.sync_profile(Some(&session.access_token), &session.user, settled).await;
        self.sessions.publish(AuthEvent::SignedIn, Some(session));
        Ok(())
    }

    async fn sign_up(&self, credentials: &Credentials, settled: &mut Settled<()>) -> Result<(), FeedError> {
        let username = username_hint(&credentials.email).unwrap_or_default();
        let result = self
            .backend
            .sign_up(credentials, &username)
            .await
            .map_err(BackendError::into_auth_error)?;
        info!(user_id = %result.user.id, confirmed = result.session.is_some(), "signed up");
        let access_token = result.session.as_ref().map(|s| s.access_token.clone());
        self.sync_profile(access_token.as_deref(), &result.user, settled).await;
        if let Some(session) = result.session {
            self.sessions.publish(AuthEvent::SignedIn, Some(session));
        }
        Ok(())
    }

    async fn sync_profile(&self, access_token: Option<&str>, user: &User, settled: &mut Settled<()>) {
        if let Err(e) = upsert_profile(self.backend.as_ref(), access_token, user).await {
            warn!(user_id = %user.id, error = %e, "profile upsert failed");
            settled.absorb(e);
        }
    }

    fn lock_form(&self) -> MutexGuard<'_, AuthForm> {
        self.form.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Upsert the profile derived from `user`, classified for the caller.
///
/// # Errors
///
/// Returns [`FeedError::AuthorizationDenied`] for a row-level-security
/// rejection and [`FeedError::ProfileSync`] otherwise. Both are soft.
pub async fn upsert_profile(backend: &dyn Backend, access_token: Option<&str>, user: &User) -> Result<(), FeedError> {
    backend
        .upsert_profile(access_token, &profile_for(user))
        .await
        .map_err(BackendError::into_profile_error)
}
