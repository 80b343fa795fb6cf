//! Root application component: the Session Holder for the browser.
//!
//! SYSTEM CONTEXT
//! ==============
//! Loads the backend settings from the host, publishes the initial (absent)
//! session, keeps the access token fresh, and mounts the auth page or the
//! feed page depending on whether a user is signed in.

use leptos::prelude::*;
use leptos_meta::{MetaTags, Stylesheet, Title, provide_meta_context};

use crate::pages::{auth::AuthPage, feed::FeedPage};
use crate::state::session::SessionState;

/// HTML shell rendered on the server for SSR + hydration.
pub fn shell(options: LeptosOptions) -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8"/>
                <meta name="viewport" content="width=device-width, initial-scale=1"/>
                <AutoReload options=options.clone()/>
                <HydrationScripts options/>
                <MetaTags/>
            </head>
            <body>
                <App/>
            </body>
        </html>
    }
}

#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();

    let sessions = RwSignal::new(SessionState::default());
    provide_context(sessions);

    #[cfg(feature = "hydrate")]
    {
        load_config(sessions);
        keep_session_fresh(sessions);
    }

    // Memos so a token refresh does not remount the feed.
    let loading = Memo::new(move |_| sessions.with(|s| s.loading));
    let user_id = Memo::new(move |_| sessions.with(SessionState::user_id));

    view! {
        <Stylesheet id="leptos" href="/pkg/murmur.css"/>
        <Title text="Murmur"/>

        <main class="app">
            {move || {
                if loading.get() {
                    view! { <p class="app-status">"Loading..."</p> }.into_any()
                } else if user_id.get().is_some() {
                    view! { <FeedPage/> }.into_any()
                } else {
                    view! { <AuthPage/> }.into_any()
                }
            }}
        </main>
    }
}

#[cfg(feature = "hydrate")]
fn load_config(sessions: RwSignal<SessionState>) {
    leptos::task::spawn_local(async move {
        match crate::net::api::fetch_config().await {
            Ok(config) => sessions.update(|s| s.config = Some(config)),
            Err(e) => {
                leptos::logging::warn!("backend settings unavailable: {}", e.message);
                sessions.update(|s| s.config_error = Some(e.message));
            }
        }
        sessions.update(|s| s.publish(domain::AuthEvent::InitialSession, None));
    });
}

/// Refresh the session shortly before it expires. Each new session
/// schedules its own refresh; a refresh that finds the token already
/// replaced does nothing.
#[cfg(feature = "hydrate")]
fn keep_session_fresh(sessions: RwSignal<SessionState>) {
    use crate::net::api;

    // Only a new token or expiry reschedules.
    let refresh_key = Memo::new(move |_| sessions.with(SessionState::refresh_key));

    Effect::new(move || {
        if refresh_key.get().is_none() {
            return;
        }
        let Some(delay_ms) = sessions.with_untracked(|s| s.refresh_delay_ms(api::now_unix())) else {
            return;
        };
        let Some((config, session)) = sessions.with_untracked(SessionState::identity) else {
            return;
        };
        leptos::task::spawn_local(async move {
            gloo_timers::future::sleep(std::time::Duration::from_millis(delay_ms)).await;
            let is_current = || {
                sessions.with_untracked(|s| s.access_token().as_deref() == Some(session.access_token.as_str()))
            };
            if !is_current() {
                return;
            }
            let refreshed = api::refresh_session(&config, &session.refresh_token).await;
            if !is_current() {
                return;
            }
            match refreshed {
                Ok(fresh) => sessions.update(|s| s.publish(domain::AuthEvent::TokenRefreshed, Some(fresh))),
                Err(e) => {
                    leptos::logging::warn!("session refresh failed: {}", e.message);
                    sessions.update(|s| s.publish(domain::AuthEvent::SignedOut, None));
                }
            }
        });
    });
}
