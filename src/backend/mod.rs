//! Backend seam: the hosted auth, table, and realtime services.
//!
//! DESIGN
//! ======
//! Everything the client asks of the outside world goes through [`Backend`].
//! [`hosted::HostedBackend`] speaks the real HTTP and websocket APIs; tests
//! substitute an in-memory implementation. The trait mirrors the operations
//! the client library exposes, one method per call site.

pub mod hosted;
pub mod realtime;

use async_trait::async_trait;
use domain::wire::SignUpResult;
use domain::{ChangeEvent, Credentials, NewPost, Post, Profile, Session, User};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::BackendError;

#[async_trait]
pub trait Backend: Send + Sync {
    /// `auth.signInWithPassword`
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session, BackendError>;

    /// `auth.signUp` with the email redirect and `{username}` metadata.
    async fn sign_up(&self, credentials: &Credentials, username: &str) -> Result<SignUpResult, BackendError>;

    /// `auth.getUser`
    async fn get_user(&self, access_token: &str) -> Result<User, BackendError>;

    /// Exchange a refresh token for a new session.
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError>;

    /// `auth.signOut`
    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;

    /// `profiles.upsert(..., onConflict: id)`. `access_token` is `None` when
    /// no session exists yet (sign-up awaiting verification).
    async fn upsert_profile(&self, access_token: Option<&str>, profile: &Profile) -> Result<(), BackendError>;

    /// `posts.select(..).order(created_at, desc)`
    async fn select_posts(&self, access_token: &str) -> Result<Vec<Post>, BackendError>;

    /// `posts.insert(..).select(..).single()`
    async fn insert_post(&self, access_token: &str, post: &NewPost) -> Result<Post, BackendError>;

    /// `channel(..).on(postgres_changes, user_id=eq.<id>).subscribe()`
    async fn subscribe_posts(&self, session: &Session) -> Result<ChangeSubscription, BackendError>;
}

/// Commands from a subscription handle to the task that owns the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelControl {
    /// Push a refreshed access token to the joined channel.
    AccessToken(String),
    /// `removeChannel`: leave and close.
    Leave,
}

/// A live change-feed subscription.
///
/// Events arrive in delivery order. Dropping the handle removes the channel.
pub struct ChangeSubscription {
    topic: String,
    events: mpsc::Receiver<ChangeEvent>,
    control: Option<mpsc::UnboundedSender<ChannelControl>>,
    task: Option<JoinHandle<()>>,
}

impl ChangeSubscription {
    #[must_use]
    pub fn new(
        topic: String,
        events: mpsc::Receiver<ChangeEvent>,
        control: mpsc::UnboundedSender<ChannelControl>,
        task: JoinHandle<()>,
    ) -> Self {
        Self { topic, events, control: Some(control), task: Some(task) }
    }

    /// Subscription fed directly by the holder of the sender, with no
    /// socket behind it.
    #[must_use]
    pub fn detached(topic: String, events: mpsc::Receiver<ChangeEvent>) -> Self {
        Self { topic, events, control: None, task: None }
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Next change, or `None` once the channel is gone.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    pub fn update_access_token(&self, access_token: &str) {
        if let Some(control) = &self.control {
            let _ = control.send(ChannelControl::AccessToken(access_token.to_owned()));
        }
    }

    /// `removeChannel`. Waits for the socket task to send `phx_leave`.
    pub async fn remove(mut self) {
        self.leave();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn leave(&mut self) {
        if let Some(control) = self.control.take() {
            let _ = control.send(ChannelControl::Leave);
        }
        self.events.close();
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        self.leave();
    }
}
