//! Native engine for the murmur feed client.
//!
//! SYSTEM CONTEXT
//! ==============
//! murmur is a small social feed whose auth, storage, and realtime delivery
//! are all provided by a hosted backend. This crate is the tokio side: the
//! [`backend::Backend`] seam and its hosted implementation, the Session
//! Holder, the auth flow, the feed controller, and the terminal front-end
//! used by the `murmur` binary. Pure model code lives in the `domain` crate
//! and is shared with the browser client.

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod feed;
pub mod session;
pub mod state;
pub mod terminal;
