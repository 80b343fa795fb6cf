//! Shared feed model for the native engine and the browser client.
//!
//! This crate owns everything both front-ends must agree on: the records the
//! hosted backend returns, the keyed feed list, realtime change decoding, the
//! auth form state machine, and the wire helpers for the auth, table, and
//! realtime endpoints. It performs no I/O so it compiles unchanged for WASM.

pub mod auth_form;
pub mod error;
pub mod feed_list;
pub mod model;
pub mod realtime;
pub mod username;
pub mod wire;

pub use auth_form::{AuthAction, AuthForm, Credentials, FormRejection};
pub use error::{FeedError, Settled};
pub use feed_list::{ApplyOutcome, FeedList};
pub use model::{AuthEvent, NewPost, Post, PostId, Profile, Session, User};
pub use realtime::{ChangeEvent, PhoenixMessage, RealtimeSignal};
pub use username::{derive_username, profile_for, username_hint};

/// Content of the convenience post offered on an empty feed.
pub const SAMPLE_POST_CONTENT: &str = "Check out my first post!";
