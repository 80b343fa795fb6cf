//! Shared client-side state.
//!
//! DESIGN
//! ======
//! One plain struct per concern, each provided as an `RwSignal` by the root
//! component. The auth form's state is `domain::AuthForm` itself.

pub mod feed;
pub mod session;
