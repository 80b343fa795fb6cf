//! Feed page: composer, post list, and the realtime subscription.
//!
//! SYSTEM CONTEXT
//! ==============
//! Mounted by the root `App` while a session exists, keyed on the user id so
//! a token refresh never remounts it. On mount it upserts the user's profile,
//! loads the feed, then joins the realtime channel for the user's own posts.
//! Unmounting (sign-out or a different user) leaves the channel.
//!
//! DESIGN
//! ======
//! All page state lives in one `RwSignal<FeedState>`. Async work writes back
//! with `try_update` because in-flight requests are not cancelled and may
//! finish after the page is gone.

#[cfg(test)]
#[path = "feed_test.rs"]
mod feed_test;

use domain::{Post, SAMPLE_POST_CONTENT};
use leptos::prelude::*;

use crate::components::post_card::PostCard;
use crate::state::feed::FeedState;
use crate::state::session::SessionState;

#[component]
pub fn FeedPage() -> impl IntoView {
    let sessions = expect_context::<RwSignal<SessionState>>();
    let feed = RwSignal::new(FeedState { loading: true, ..FeedState::default() });

    #[cfg(feature = "hydrate")]
    mount_feed(sessions, feed);

    let submit = move |content: &str, refetch: bool| {
        let Some((config, session)) = sessions.with_untracked(SessionState::identity) else {
            return;
        };
        let mut claimed = None;
        feed.update(|f| claimed = f.begin_submit(content));
        let Some(content) = claimed else {
            return;
        };

        #[cfg(feature = "hydrate")]
        leptos::task::spawn_local(async move {
            let body = domain::wire::new_post_body(&content, session.user.id);
            let result = crate::net::api::insert_post(&config, &session.access_token, &body)
                .await
                .map_err(crate::net::api::ApiError::into_submit_error);
            let stored = result.is_ok();
            feed.try_update(|f| f.finish_submit(&content, result));
            if stored && refetch {
                load_posts(&config, &session.access_token, feed).await;
            }
        });
        #[cfg(not(feature = "hydrate"))]
        let _ = (config, session, content, refetch);
    };

    let sign_out = move |_: leptos::ev::MouseEvent| {
        let Some((config, session)) = sessions.with_untracked(SessionState::identity) else {
            return;
        };

        #[cfg(feature = "hydrate")]
        leptos::task::spawn_local(async move {
            if let Err(e) = crate::net::api::sign_out(&config, &session.access_token).await {
                leptos::logging::warn!("remote sign-out failed: {}", e.message);
            }
            sessions.update(|s| s.publish(domain::AuthEvent::SignedOut, None));
        });
        #[cfg(not(feature = "hydrate"))]
        let _ = (config, session);
    };

    let email = move || sessions.with(|s| s.session.as_ref().map(|x| x.email().to_owned()).unwrap_or_default());

    view! {
        <div class="feed-page">
            <header class="feed-header">
                <span class="feed-header__title">"Murmur"</span>
                <span class="feed-header__user">{email}</span>
                <button class="feed-button feed-button--ghost" on:click=sign_out>
                    "Sign Out"
                </button>
            </header>
            <form
                class="composer"
                on:submit=move |ev: leptos::ev::SubmitEvent| {
                    ev.prevent_default();
                    let draft = feed.with_untracked(|f| f.draft.clone());
                    submit(&draft, false);
                }
            >
                <textarea
                    class="composer__input"
                    placeholder="What's on your mind?"
                    prop:value=move || feed.with(|f| f.draft.clone())
                    on:input=move |ev| feed.update(|f| f.draft = event_target_value(&ev))
                ></textarea>
                <button class="feed-button" type="submit" disabled=move || !feed.with(FeedState::can_post)>
                    {move || if feed.with(|f| f.submitting) { "Posting..." } else { "Post" }}
                </button>
            </form>
            <Show when=move || feed.with(|f| f.error.is_some())>
                <p class="feed-error">{move || feed.with(|f| f.error.clone().unwrap_or_default())}</p>
            </Show>
            <Show when=move || feed.with(|f| f.loading && f.posts.is_empty())>
                <p class="feed-status">"Loading posts..."</p>
            </Show>
            <Show when=move || feed.with(FeedState::offers_sample_post)>
                <div class="feed-empty">
                    <p>"No posts yet."</p>
                    <button
                        class="feed-button"
                        disabled=move || feed.with(|f| f.submitting)
                        on:click=move |_| submit(SAMPLE_POST_CONTENT, true)
                    >
                        "Create Sample Post"
                    </button>
                </div>
            </Show>
            <div class="feed-list">
                <For
                    each=move || feed.with(|f| f.posts.to_vec())
                    key=post_key
                    children=move |post: Post| view! { <PostCard post/> }
                />
            </div>
        </div>
    }
}

/// Rendering key: a row re-renders when its content or author changes.
fn post_key(post: &Post) -> (String, String, String) {
    (post.id.as_str().to_owned(), post.content.clone(), post.author_label())
}

// =============================================================================
// MOUNT
// =============================================================================

#[cfg(feature = "hydrate")]
fn mount_feed(sessions: RwSignal<SessionState>, feed: RwSignal<FeedState>) {
    use crate::net::realtime::{RealtimeHandle, spawn_posts_channel};

    let channel = StoredValue::new_local(None::<RealtimeHandle>);

    if let Some((config, session)) = sessions.with_untracked(SessionState::identity) {
        leptos::task::spawn_local(async move {
            if let Err(e) = crate::net::api::sync_profile(&config, Some(&session.access_token), &session.user).await {
                leptos::logging::warn!("profile bootstrap failed: {e}");
            }
            feed.try_update(|f| f.posts.learn_author(domain::profile_for(&session.user)));
            load_posts(&config, &session.access_token, feed).await;

            let url = config.endpoints().realtime_socket(&config.anon_key);
            let handle = spawn_posts_channel(url, &session, move |change| {
                let outcome = feed.try_update(|f| f.apply(&change));
                if outcome == Some(domain::ApplyOutcome::NeedsRefetch) {
                    leptos::logging::log!("refetching feed after change: {change:?}");
                    if let Some((config, session)) = sessions.with_untracked(SessionState::identity) {
                        leptos::task::spawn_local(async move {
                            load_posts(&config, &session.access_token, feed).await;
                        });
                    }
                }
            });
            if let Some(Some(orphan)) = channel.try_set_value(Some(handle)) {
                orphan.leave();
            }
        });
    }

    Effect::new(move || {
        let Some(token) = sessions.with(SessionState::access_token) else {
            return;
        };
        channel.with_value(|handle| {
            if let Some(handle) = handle {
                handle.update_access_token(&token);
            }
        });
    });

    on_cleanup(move || {
        channel.update_value(|handle| {
            if let Some(handle) = handle.take() {
                handle.leave();
            }
        });
    });
}

#[cfg(feature = "hydrate")]
async fn load_posts(config: &domain::wire::PublicConfig, access_token: &str, feed: RwSignal<FeedState>) {
    feed.try_update(FeedState::begin_fetch);
    match crate::net::api::select_posts(config, access_token).await {
        Ok(posts) => {
            feed.try_update(|f| f.finish_fetch(Ok(posts)));
        }
        Err(e) => {
            leptos::logging::warn!("feed load failed: {}", e.message);
            let failure = e.into_fetch_error();
            feed.try_update(|f| f.finish_fetch(Err(failure)));
        }
    }
}
