//! Browser networking: backend HTTP calls and the realtime channel.

pub mod api;
pub mod realtime;
