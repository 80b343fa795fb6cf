//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds only the public backend settings handed to browsers; the server
//! never talks to the backend itself.

#[cfg(test)]
#[path = "state_test.rs"]
mod state_test;

use std::sync::Arc;

use domain::wire::PublicConfig;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StateError {
    #[error("missing required env var {var}")]
    Missing { var: &'static str },
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Clone)]
pub struct AppState {
    pub public: Arc<PublicConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(public: PublicConfig) -> Self {
        Self { public: Arc::new(public) }
    }

    /// Read settings from the process environment.
    ///
    /// Required: `SUPABASE_URL`, `SUPABASE_ANON_KEY`.
    /// Optional: `MURMUR_EMAIL_REDIRECT_TO`.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or the URL is not http(s).
    pub fn from_env() -> Result<Self, StateError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read settings through `lookup`, which returns a variable's value.
    ///
    /// # Errors
    ///
    /// Same as [`AppState::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StateError> {
        let required = |var: &'static str| {
            lookup(var)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
                .ok_or(StateError::Missing { var })
        };
        let supabase_url = required("SUPABASE_URL")?.trim_end_matches('/').to_owned();
        if !supabase_url.starts_with("http://") && !supabase_url.starts_with("https://") {
            return Err(StateError::Invalid { var: "SUPABASE_URL", value: supabase_url });
        }
        let anon_key = required("SUPABASE_ANON_KEY")?;
        let email_redirect_to = lookup("MURMUR_EMAIL_REDIRECT_TO")
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty());
        Ok(Self::new(PublicConfig { supabase_url, anon_key, email_redirect_to }))
    }
}
