//! Failure taxonomy shared by every feed and auth action.
//!
//! ERROR HANDLING
//! ==============
//! Every backend failure is caught where the action is issued and becomes one
//! of these variants. Nothing propagates further: the user sees at most the
//! text from [`FeedError::user_message`], and soft variants are only logged.
//! Soft failures travel inside [`Settled`] instead of being dropped, so each
//! suppression stays visible to the caller that has to log it.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

/// Marker the store uses in row-level-security rejections.
pub const RLS_MARKER: &str = "row-level security policy";

/// PostgreSQL `insufficient_privilege`, returned by the table API on RLS rejection.
pub const RLS_ERROR_CODE: &str = "42501";

/// Text shown when the feed cannot be loaded.
pub const FETCH_FAILED_MESSAGE: &str = "Error loading posts. Please try reloading the page.";

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    /// Sign-in or sign-up was rejected.
    #[error("auth failed: {0}")]
    Auth(String),
    /// Profile upsert failed. Never shown.
    #[error("profile sync failed: {0}")]
    ProfileSync(String),
    /// Feed load failed or returned something other than a list of rows.
    #[error("feed load failed: {0}")]
    Fetch(String),
    /// Post insert failed.
    #[error("post submit failed: {0}")]
    Submit(String),
    /// Row-level-security rejection. Never shown.
    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),
}

impl FeedError {
    /// Auth failure, reclassified as [`FeedError::AuthorizationDenied`] when
    /// the message is a row-level-security rejection.
    #[must_use]
    pub fn auth(message: impl Into<String>) -> Self {
        let message = message.into();
        if mentions_rls(&message) { Self::AuthorizationDenied(message) } else { Self::Auth(message) }
    }

    /// Logged-only variants.
    #[must_use]
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::ProfileSync(_) | Self::AuthorizationDenied(_))
    }

    /// Text to show the user, `None` for soft failures.
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Auth(message) | Self::Submit(message) => Some(message.clone()),
            Self::Fetch(_) => Some(FETCH_FAILED_MESSAGE.to_owned()),
            Self::ProfileSync(_) | Self::AuthorizationDenied(_) => None,
        }
    }

    /// Raw backend message without the category prefix.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::Auth(message)
            | Self::ProfileSync(message)
            | Self::Fetch(message)
            | Self::Submit(message)
            | Self::AuthorizationDenied(message) => message,
        }
    }
}

/// Whether a backend message is a row-level-security rejection.
#[must_use]
pub fn mentions_rls(message: &str) -> bool {
    message.to_ascii_lowercase().contains(RLS_MARKER)
}

/// Whether a table API failure is a row-level-security rejection, by
/// SQLSTATE code or by message.
#[must_use]
pub fn is_rls_rejection(code: Option<&str>, message: &str) -> bool {
    code == Some(RLS_ERROR_CODE) || mentions_rls(message)
}

/// A completed action plus the soft failures it absorbed along the way.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct Settled<T> {
    pub value: T,
    pub soft: Vec<FeedError>,
}

impl<T> Settled<T> {
    pub fn clean(value: T) -> Self {
        Self { value, soft: Vec::new() }
    }

    /// Record a failure that was logged instead of shown.
    pub fn absorb(&mut self, failure: FeedError) {
        self.soft.push(failure);
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.soft.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Settled<U> {
        Settled { value: f(self.value), soft: self.soft }
    }
}
