//! Transport-level errors for the hosted backend.
//!
//! ERROR HANDLING
//! ==============
//! `BackendError` describes what went wrong on the wire. Call sites convert it
//! into the user-facing taxonomy (`domain::FeedError`) with the helpers below,
//! choosing the category by which action failed.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use domain::FeedError;
use domain::error::is_rls_rejection;
use domain::wire::WireError;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The request never produced a response.
    #[error("request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("{message} (status {status})")]
    Status { status: u16, code: Option<String>, message: String },

    /// The response body did not have the expected shape.
    #[error("response parse failed: {0}")]
    Parse(#[from] WireError),

    /// Realtime socket failure.
    #[error("realtime failed: {0}")]
    Realtime(String),
}

impl BackendError {
    /// Build from a non-success response.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            code: domain::wire::error_code(body),
            message: domain::wire::error_message(status, body),
        }
    }

    /// Message without decoration, suitable for showing to the user.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Row-level-security rejection from the table API.
    #[must_use]
    pub fn is_authorization_denied(&self) -> bool {
        match self {
            Self::Status { code, message, .. } => is_rls_rejection(code.as_deref(), message),
            _ => false,
        }
    }

    #[must_use]
    pub fn into_auth_error(self) -> FeedError {
        if self.is_authorization_denied() {
            return FeedError::AuthorizationDenied(self.message());
        }
        FeedError::auth(self.message())
    }

    #[must_use]
    pub fn into_profile_error(self) -> FeedError {
        if self.is_authorization_denied() {
            return FeedError::AuthorizationDenied(self.message());
        }
        FeedError::ProfileSync(self.message())
    }

    #[must_use]
    pub fn into_fetch_error(self) -> FeedError {
        FeedError::Fetch(self.message())
    }

    #[must_use]
    pub fn into_submit_error(self) -> FeedError {
        FeedError::Submit(self.message())
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e.to_string())
    }
}
