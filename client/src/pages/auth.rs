//! Sign-in / sign-up page.
//!
//! SYSTEM CONTEXT
//! ==============
//! Mounted by the root `App` while no session exists. A successful sign-in
//! (or a sign-up that returns a session) publishes `SignedIn` to the shared
//! `SessionState`, which swaps this page for the feed.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use domain::{AuthAction, AuthForm, FeedError, Session};
use leptos::prelude::*;

use crate::state::session::SessionState;

/// Shown when the host never delivered backend settings.
pub const CONFIG_MISSING_MESSAGE: &str = "Service is not configured. Please reload the page.";

/// Split an auth result into the form outcome and the session to publish.
pub fn settle_outcome(result: Result<Option<Session>, FeedError>) -> (Result<(), FeedError>, Option<Session>) {
    match result {
        Ok(session) => (Ok(()), session),
        Err(failure) => (Err(failure), None),
    }
}

#[component]
pub fn AuthPage() -> impl IntoView {
    let sessions = expect_context::<RwSignal<SessionState>>();
    let form = RwSignal::new(AuthForm::new());

    let submit = move |action: AuthAction| {
        let mut started = None;
        form.update(|f| started = f.begin(action).ok());
        let Some(credentials) = started else {
            return;
        };
        let Some(config) = sessions.with_untracked(|s| s.config.clone()) else {
            form.update(|f| {
                let _ = f.finish(Err(FeedError::auth(CONFIG_MISSING_MESSAGE)));
            });
            return;
        };

        #[cfg(feature = "hydrate")]
        leptos::task::spawn_local(async move {
            let (outcome, session) = settle_outcome(authenticate(&config, action, &credentials).await);
            let mut soft = None;
            form.try_update(|f| soft = f.finish(outcome));
            if let Some(failure) = soft {
                leptos::logging::warn!("auth failure not shown: {failure}");
            }
            if let Some(session) = session {
                sessions.update(|s| s.publish(domain::AuthEvent::SignedIn, Some(session)));
            }
        });
        #[cfg(not(feature = "hydrate"))]
        let _ = (config, credentials);
    };

    let busy = move || form.with(AuthForm::is_submitting);

    view! {
        <div class="auth-page">
            <div class="auth-card">
                <h1>"Murmur"</h1>
                <form
                    class="auth-form"
                    on:submit=move |ev: leptos::ev::SubmitEvent| {
                        ev.prevent_default();
                        submit(AuthAction::SignIn);
                    }
                >
                    <input
                        class="auth-input"
                        type="email"
                        placeholder="you@example.com"
                        prop:value=move || form.with(|f| f.email.clone())
                        on:input=move |ev| form.update(|f| f.email = event_target_value(&ev))
                    />
                    <input
                        class="auth-input"
                        type="password"
                        placeholder="Password"
                        prop:value=move || form.with(|f| f.password.clone())
                        on:input=move |ev| form.update(|f| f.password = event_target_value(&ev))
                    />
                    <div class="auth-actions">
                        <button class="auth-button" type="submit" disabled=busy>
                            "Sign In"
                        </button>
                        <button
                            class="auth-button auth-button--secondary"
                            type="button"
                            disabled=busy
                            on:click=move |_| submit(AuthAction::SignUp)
                        >
                            "Sign Up"
                        </button>
                    </div>
                </form>
                <Show when=move || form.with(|f| f.message().is_some())>
                    <p class="auth-message">{move || form.with(|f| f.message().unwrap_or_default().to_owned())}</p>
                </Show>
                <Show when=move || form.with(|f| f.error().is_some())>
                    <p class="auth-message auth-message--error">
                        {move || form.with(|f| f.error().unwrap_or_default().to_owned())}
                    </p>
                </Show>
                <Show when=move || sessions.with(|s| s.config_error.is_some())>
                    <p class="auth-message auth-message--error">{CONFIG_MISSING_MESSAGE}</p>
                </Show>
            </div>
        </div>
    }
}

/// Run the backend calls for `action`, then upsert the profile. Profile
/// failures are logged and never fail the action.
#[cfg(feature = "hydrate")]
async fn authenticate(
    config: &domain::wire::PublicConfig,
    action: AuthAction,
    credentials: &domain::Credentials,
) -> Result<Option<Session>, FeedError> {
    use crate::net::api::{self, ApiError};

    let (access_token, user, session) = match action {
        AuthAction::SignIn => {
            let session = api::sign_in(config, credentials).await.map_err(ApiError::into_auth_error)?;
            (Some(session.access_token.clone()), session.user.clone(), Some(session))
        }
        AuthAction::SignUp => {
            let username = domain::username_hint(&credentials.email).unwrap_or_default();
            let result = api::sign_up(config, credentials, &username)
                .await
                .map_err(ApiError::into_auth_error)?;
            let access_token = result.session.as_ref().map(|s| s.access_token.clone());
            (access_token, result.user, result.session)
        }
    };
    if let Err(e) = api::sync_profile(config, access_token.as_deref(), &user).await {
        leptos::logging::warn!("profile upsert failed: {e}");
    }
    Ok(session)
}
