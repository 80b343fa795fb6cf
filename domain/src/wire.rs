//! Wire helpers for the hosted auth and table APIs.
//!
//! SYSTEM CONTEXT
//! ==============
//! Both transports (`reqwest` natively, `gloo-net` in the browser) issue the
//! same requests: URLs, query pairs, headers, and bodies come from here, and
//! response bodies are parsed here. Each transport only moves bytes.

#[cfg(test)]
#[path = "wire_test.rs"]
mod wire_test;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::auth_form::Credentials;
use crate::model::{NewPost, Post, Session, User};

/// Columns requested for every post, with the author profile embedded.
pub const POST_COLUMNS: &str = "id,content,created_at,user_id,profiles(id,username,avatar_url)";

pub const HEADER_API_KEY: &str = "apikey";
pub const HEADER_PREFER: &str = "Prefer";

/// Upsert keyed on the primary key, no body back.
pub const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=minimal";
/// Insert returning the inserted row.
pub const PREFER_RETURN_ROW: &str = "return=representation";
/// Ask the table API for a single object instead of an array.
pub const ACCEPT_SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("invalid JSON: {0}")]
    Json(String),
    #[error("expected a list of rows")]
    NotASequence,
    #[error("response carried no session")]
    MissingSession,
}

impl From<serde_json::Error> for WireError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

/// Endpoint URLs under one project base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self { base: base_url.trim().trim_end_matches('/').to_owned() }
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Token endpoint; pair with [`password_grant_query`] or [`refresh_grant_query`].
    #[must_use]
    pub fn token(&self) -> String {
        format!("{}/auth/v1/token", self.base)
    }

    /// Registration endpoint; pair with [`sign_up_query`].
    #[must_use]
    pub fn sign_up(&self) -> String {
        format!("{}/auth/v1/signup", self.base)
    }

    #[must_use]
    pub fn user(&self) -> String {
        format!("{}/auth/v1/user", self.base)
    }

    #[must_use]
    pub fn logout(&self) -> String {
        format!("{}/auth/v1/logout", self.base)
    }

    #[must_use]
    pub fn table(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base)
    }

    /// Realtime websocket URL; `http` becomes `ws`, `https` becomes `wss`.
    #[must_use]
    pub fn realtime_socket(&self, anon_key: &str) -> String {
        let socket_base = if let Some(rest) = self.base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base.clone()
        };
        format!("{socket_base}/realtime/v1/websocket?apikey={anon_key}&vsn=1.0.0")
    }
}

/// Public backend settings the web host hands to the browser at
/// `GET /api/config`. The anon key is public by design of the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicConfig {
    pub supabase_url: String,
    pub anon_key: String,
    #[serde(default)]
    pub email_redirect_to: Option<String>,
}

impl PublicConfig {
    #[must_use]
    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(&self.supabase_url)
    }
}

#[must_use]
pub fn password_grant_query() -> [(&'static str, &'static str); 1] {
    [("grant_type", "password")]
}

#[must_use]
pub fn refresh_grant_query() -> [(&'static str, &'static str); 1] {
    [("grant_type", "refresh_token")]
}

#[must_use]
pub fn sign_up_query(redirect_to: Option<&str>) -> Vec<(&'static str, String)> {
    redirect_to
        .filter(|url| !url.is_empty())
        .map(|url| vec![("redirect_to", url.to_owned())])
        .unwrap_or_default()
}

/// Query for listing posts newest first.
#[must_use]
pub fn posts_select_query() -> [(&'static str, &'static str); 2] {
    [("select", POST_COLUMNS), ("order", "created_at.desc")]
}

/// Query for inserting a post and reading it back with its profile.
#[must_use]
pub fn posts_insert_query() -> [(&'static str, &'static str); 1] {
    [("select", POST_COLUMNS)]
}

#[must_use]
pub fn profiles_upsert_query() -> [(&'static str, &'static str); 1] {
    [("on_conflict", "id")]
}

/// `Authorization` value: the user's token, or the anon key when signed out.
#[must_use]
pub fn bearer(access_token: Option<&str>, anon_key: &str) -> String {
    format!("Bearer {}", access_token.unwrap_or(anon_key))
}

#[must_use]
pub fn password_body(credentials: &Credentials) -> Value {
    json!({ "email": credentials.email, "password": credentials.password })
}

#[must_use]
pub fn sign_up_body(credentials: &Credentials, username: &str) -> Value {
    json!({
        "email": credentials.email,
        "password": credentials.password,
        "data": { "username": username },
    })
}

#[must_use]
pub fn refresh_body(refresh_token: &str) -> Value {
    json!({ "refresh_token": refresh_token })
}

#[must_use]
pub fn new_post_body(content: &str, user_id: Uuid) -> NewPost {
    NewPost { content: content.to_owned(), user_id }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self, now_unix: i64) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| now_unix + secs));
        Session { access_token: self.access_token, refresh_token: self.refresh_token, expires_at, user: self.user }
    }
}

/// Parse a token-endpoint response (password or refresh grant).
///
/// # Errors
///
/// [`WireError::Json`] when the body is not a token response.
pub fn parse_session(body: &str, now_unix: i64) -> Result<Session, WireError> {
    let token: TokenResponse = serde_json::from_str(body)?;
    Ok(token.into_session(now_unix))
}

/// Registration outcome: the new user, plus a session when the project
/// skips email confirmation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignUpResult {
    pub user: User,
    pub session: Option<Session>,
}

/// Parse a sign-up response, which is either a token response or a bare user.
///
/// # Errors
///
/// [`WireError::Json`] when the body is neither shape.
pub fn parse_sign_up(body: &str, now_unix: i64) -> Result<SignUpResult, WireError> {
    let value: Value = serde_json::from_str(body)?;
    if value.get("access_token").is_some() {
        let token: TokenResponse = serde_json::from_value(value)?;
        let session = token.into_session(now_unix);
        return Ok(SignUpResult { user: session.user.clone(), session: Some(session) });
    }
    let user: User = serde_json::from_value(value)?;
    Ok(SignUpResult { user, session: None })
}

/// # Errors
///
/// [`WireError::Json`] when the body is not a user object.
pub fn parse_user(body: &str) -> Result<User, WireError> {
    Ok(serde_json::from_str(body)?)
}

/// Parse a post listing.
///
/// # Errors
///
/// [`WireError::NotASequence`] when the body is valid JSON but not an array,
/// [`WireError::Json`] otherwise.
pub fn parse_posts(body: &str) -> Result<Vec<Post>, WireError> {
    let value: Value = serde_json::from_str(body)?;
    if !value.is_array() {
        return Err(WireError::NotASequence);
    }
    Ok(serde_json::from_value(value)?)
}

/// # Errors
///
/// [`WireError::Json`] when the body is not a single post row.
pub fn parse_post(body: &str) -> Result<Post, WireError> {
    Ok(serde_json::from_str(body)?)
}

/// Human-readable message from an error body.
///
/// The auth API uses `msg`, `error_description`, or `error`; the table API
/// uses `message`. Falls back to the HTTP status.
#[must_use]
pub fn error_message(status: u16, body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    parsed
        .as_ref()
        .and_then(|value| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str))
        })
        .filter(|message| !message.is_empty())
        .map_or_else(|| format!("request failed with status {status}"), str::to_owned)
}

/// Machine-readable error code: `code` from the table API (SQLSTATE) or
/// `error_code` from the auth API.
#[must_use]
pub fn error_code(body: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(body).ok()?;
    value
        .get("code")
        .and_then(Value::as_str)
        .or_else(|| value.get("error_code").and_then(Value::as_str))
        .map(str::to_owned)
}
