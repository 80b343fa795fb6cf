//! Feed View controller: load, submit, and reconcile posts for one identity.
//!
//! DESIGN
//! ======
//! State lives behind a plain mutex that is never held across an await.
//! The list itself is a [`FeedList`], so a row arriving twice (the confirmed
//! insert and its realtime echo) still shows once. Busy flags admit one
//! fetch result and one submission at a time; realtime changes are applied
//! serially by whoever drives [`FeedController::follow`].
//!
//! ERROR HANDLING
//! ==============
//! Fetch and submit failures set `FeedState::error` to the text shown to the
//! user and are also returned. Profile bootstrap failures are soft.

#[cfg(test)]
#[path = "feed_test.rs"]
mod feed_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use domain::{ApplyOutcome, ChangeEvent, FeedError, FeedList, Post, SAMPLE_POST_CONTENT, Session, Settled, profile_for};
use tracing::{debug, info, warn};

use crate::auth::upsert_profile;
use crate::backend::{Backend, ChangeSubscription};
use crate::error::BackendError;
use crate::session::SessionSubscription;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeedState {
    pub posts: FeedList,
    pub loading: bool,
    pub submitting: bool,
    /// Text shown above the feed, if any.
    pub error: Option<String>,
}

/// Why [`FeedController::follow`] returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FollowEnd {
    /// The change feed closed.
    ChannelClosed,
    /// The identity changed or the session ended; the feed must remount.
    IdentityChanged(Option<Session>),
}

pub struct FeedController {
    backend: Arc<dyn Backend>,
    session: Mutex<Option<Session>>,
    state: Mutex<FeedState>,
}

impl FeedController {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, session: Option<Session>) -> Self {
        Self { backend, session: Mutex::new(session), state: Mutex::new(FeedState::default()) }
    }

    #[must_use]
    pub fn state(&self) -> FeedState {
        lock(&self.state).clone()
    }

    #[must_use]
    pub fn session(&self) -> Option<Session> {
        lock(&self.session).clone()
    }

    /// Swap in a refreshed session for the same identity.
    pub fn update_session(&self, session: Option<Session>) {
        *lock(&self.session) = session;
    }

    /// Upsert the signed-in user's profile before the first render.
    pub async fn bootstrap_profile(&self) -> Settled<()> {
        let mut settled = Settled::clean(());
        let Some(session) = self.session() else {
            return settled;
        };
        lock(&self.state).posts.learn_author(profile_for(&session.user));
        if let Err(e) = upsert_profile(self.backend.as_ref(), Some(&session.access_token), &session.user).await {
            warn!(user_id = %session.user.id, error = %e, "profile bootstrap failed");
            settled.absorb(e);
        }
        settled
    }

    /// Replace the list with every post, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Fetch`] when the request fails or the response
    /// is not a list of rows. The list is left as it was.
    pub async fn fetch_posts(&self) -> Result<usize, FeedError> {
        let Some(session) = self.session() else {
            debug!("fetch skipped; no session");
            return Ok(0);
        };
        lock(&self.state).loading = true;
        let result = self.backend.select_posts(&session.access_token).await;

        let mut state = lock(&self.state);
        state.loading = false;
        match result {
            Ok(posts) => {
                state.posts.replace_all(posts);
                state.error = None;
                debug!(count = state.posts.len(), "posts loaded");
                Ok(state.posts.len())
            }
            Err(e) => {
                let failure = e.into_fetch_error();
                warn!(error = %failure, "feed load failed");
                state.error = failure.user_message();
                Err(failure)
            }
        }
    }

    /// Insert a post authored by the signed-in user and prepend the stored
    /// row.
    ///
    /// Returns `Ok(None)` without calling the backend when `content` is
    /// blank, nobody is signed in, or a submission is already in flight.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Submit`] with the backend's message.
    pub async fn submit_post(&self, content: &str) -> Result<Option<Post>, FeedError> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(None);
        }
        let Some(session) = self.session() else {
            return Ok(None);
        };
        {
            let mut state = lock(&self.state);
            if state.submitting {
                debug!("submit ignored; already submitting");
                return Ok(None);
            }
            state.submitting = true;
        }

        let new_post = domain::wire::new_post_body(content, session.user.id);
        let result = self.backend.insert_post(&session.access_token, &new_post).await;

        let mut state = lock(&self.state);
        state.submitting = false;
        match result {
            Ok(post) => {
                info!(post_id = %post.id, "post created");
                state.posts.prepend(post.clone());
                state.error = None;
                Ok(Some(post))
            }
            Err(e) => {
                let failure = e.into_submit_error();
                warn!(error = %failure, "post submit failed");
                state.error = failure.user_message();
                Err(failure)
            }
        }
    }

    /// Offered on an empty feed: submit the sample post, then reload.
    ///
    /// # Errors
    ///
    /// Returns the submit or fetch failure.
    pub async fn create_sample_post(&self) -> Result<(), FeedError> {
        self.submit_post(SAMPLE_POST_CONTENT).await?;
        self.fetch_posts().await?;
        Ok(())
    }

    /// Apply one realtime change, refetching when it cannot be applied
    /// locally.
    pub async fn apply_change(&self, change: &ChangeEvent) -> ApplyOutcome {
        let outcome = lock(&self.state).posts.apply(change);
        if outcome == ApplyOutcome::NeedsRefetch {
            debug!(?change, "change needs refetch");
            // Fetch failures already land in `FeedState::error`.
            let _ = self.fetch_posts().await;
        }
        outcome
    }

    /// Subscribe to changes on the signed-in user's posts.
    ///
    /// # Errors
    ///
    /// Returns the backend error when the subscription cannot be opened.
    pub async fn subscribe(&self) -> Result<Option<ChangeSubscription>, BackendError> {
        let Some(session) = self.session() else {
            return Ok(None);
        };
        let subscription = self.backend.subscribe_posts(&session).await?;
        info!(topic = subscription.topic(), "subscribed to post changes");
        Ok(Some(subscription))
    }

    /// Apply changes until the channel closes or the identity changes.
    ///
    /// `on_change` sees each change with the state after it. Any new
    /// session for the same user has its token pushed to the channel. The
    /// subscription is removed before returning.
    pub async fn follow(
        &self,
        mut subscription: ChangeSubscription,
        sessions: &mut SessionSubscription,
        mut on_change: impl FnMut(&ChangeEvent, &FeedState),
    ) -> FollowEnd {
        let end = loop {
            tokio::select! {
                change = subscription.next() => match change {
                    Some(change) => {
                        self.apply_change(&change).await;
                        on_change(&change, &self.state());
                    }
                    None => break FollowEnd::ChannelClosed,
                },
                snapshot = sessions.changed() => {
                    let Some(snapshot) = snapshot else {
                        break FollowEnd::IdentityChanged(None);
                    };
                    let same_user = match (&snapshot.session, self.session()) {
                        (Some(next), Some(current)) => next.user.id == current.user.id,
                        _ => false,
                    };
                    if !same_user {
                        break FollowEnd::IdentityChanged(snapshot.session);
                    }
                    if let Some(session) = &snapshot.session {
                        subscription.update_access_token(&session.access_token);
                    }
                    self.update_session(snapshot.session);
                }
            }
        };
        subscription.remove().await;
        end
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
