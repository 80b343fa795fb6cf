//! Hosted backend calls from the browser.
//!
//! Client-side (hydrate): real HTTP calls via `gloo-net`, with URLs, headers,
//! bodies, and parsing from `domain::wire` so they match the native engine.
//! Server-side (SSR): stubs returning an error since these calls are only
//! meaningful in the browser.
//!
//! ERROR HANDLING
//! ==============
//! Every call returns `Result<_, ApiError>`. Call sites convert to
//! `domain::FeedError` with the `into_*` helpers, choosing the category by
//! which action failed.

#![allow(clippy::unused_async)]

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use domain::error::is_rls_rejection;
use domain::wire::{PublicConfig, SignUpResult, WireError};
use domain::{Credentials, FeedError, NewPost, Post, Profile, Session, User, profile_for};

/// Where the host serves [`PublicConfig`].
pub const CONFIG_ENDPOINT: &str = "/api/config";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status, `None` when no response arrived.
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        Self {
            status: Some(status),
            code: domain::wire::error_code(body),
            message: domain::wire::error_message(status, body),
        }
    }

    pub fn transport(error: impl std::fmt::Display) -> Self {
        Self { status: None, code: None, message: error.to_string() }
    }

    #[must_use]
    pub fn is_authorization_denied(&self) -> bool {
        self.status.is_some() && is_rls_rejection(self.code.as_deref(), &self.message)
    }

    #[must_use]
    pub fn into_auth_error(self) -> FeedError {
        if self.is_authorization_denied() {
            return FeedError::AuthorizationDenied(self.message);
        }
        FeedError::auth(self.message)
    }

    #[must_use]
    pub fn into_profile_error(self) -> FeedError {
        if self.is_authorization_denied() {
            return FeedError::AuthorizationDenied(self.message);
        }
        FeedError::ProfileSync(self.message)
    }

    #[must_use]
    pub fn into_fetch_error(self) -> FeedError {
        FeedError::Fetch(self.message)
    }

    #[must_use]
    pub fn into_submit_error(self) -> FeedError {
        FeedError::Submit(self.message)
    }
}

impl From<WireError> for ApiError {
    fn from(e: WireError) -> Self {
        Self::transport(e)
    }
}

#[cfg(not(feature = "hydrate"))]
fn unavailable() -> ApiError {
    ApiError::transport("not available on server")
}

/// Verification-email redirect: configured target, else the page origin.
#[must_use]
pub fn redirect_target(config: &PublicConfig, origin: Option<String>) -> Option<String> {
    config.email_redirect_to.clone().or(origin).filter(|url| !url.is_empty())
}

// =============================================================================
// TRANSPORT
// =============================================================================

#[cfg(feature = "hydrate")]
mod transport {
    use gloo_net::http::{Request, RequestBuilder};

    use super::ApiError;
    use domain::wire::{self, PublicConfig};

    pub fn auth(builder: RequestBuilder, config: &PublicConfig) -> RequestBuilder {
        builder.header(wire::HEADER_API_KEY, &config.anon_key)
    }

    pub fn table(builder: RequestBuilder, config: &PublicConfig, access_token: Option<&str>) -> RequestBuilder {
        builder
            .header(wire::HEADER_API_KEY, &config.anon_key)
            .header("Authorization", &wire::bearer(access_token, &config.anon_key))
    }

    /// Send and return the body of a successful response.
    pub async fn send(request: Result<Request, gloo_net::Error>) -> Result<String, ApiError> {
        let response = request.map_err(ApiError::transport)?.send().await.map_err(ApiError::transport)?;
        let status = response.status();
        let body = response.text().await.map_err(ApiError::transport)?;
        if !(200..300).contains(&status) {
            return Err(ApiError::from_response(status, &body));
        }
        Ok(body)
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn now_unix() -> i64 {
        (js_sys::Date::now() / 1_000.0) as i64
    }

    pub fn page_origin() -> Option<String> {
        web_sys::window().and_then(|w| w.location().origin().ok())
    }
}

#[cfg(feature = "hydrate")]
pub use transport::now_unix;

// =============================================================================
// CALLS
// =============================================================================

/// Fetch backend settings from the host.
pub async fn fetch_config() -> Result<PublicConfig, ApiError> {
    #[cfg(feature = "hydrate")]
    {
        let body = transport::send(gloo_net::http::Request::get(CONFIG_ENDPOINT).build()).await?;
        serde_json::from_str(&body).map_err(ApiError::transport)
    }
    #[cfg(not(feature = "hydrate"))]
    {
        Err(unavailable())
    }
}

pub async fn sign_in(config: &PublicConfig, credentials: &Credentials) -> Result<Session, ApiError> {
    #[cfg(feature = "hydrate")]
    {
        use domain::wire;
        let request = transport::auth(gloo_net::http::Request::post(&config.endpoints().token()), config)
            .query(wire::password_grant_query())
            .json(&wire::password_body(credentials));
        let body = transport::send(request).await?;
        Ok(wire::parse_session(&body, transport::now_unix())?)
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = (config, credentials);
        Err(unavailable())
    }
}

pub async fn sign_up(config: &PublicConfig, credentials: &Credentials, username: &str) -> Result<SignUpResult, ApiError> {
    #[cfg(feature = "hydrate")]
    {
        use domain::wire;
        let redirect = redirect_target(config, transport::page_origin());
        let request = transport::auth(gloo_net::http::Request::post(&config.endpoints().sign_up()), config)
            .query(wire::sign_up_query(redirect.as_deref()))
            .json(&wire::sign_up_body(credentials, username));
        let body = transport::send(request).await?;
        Ok(wire::parse_sign_up(&body, transport::now_unix())?)
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = (config, credentials, username);
        Err(unavailable())
    }
}

pub async fn refresh_session(config: &PublicConfig, refresh_token: &str) -> Result<Session, ApiError> {
    #[cfg(feature = "hydrate")]
    {
        use domain::wire;
        let request = transport::auth(gloo_net::http::Request::post(&config.endpoints().token()), config)
            .query(wire::refresh_grant_query())
            .json(&wire::refresh_body(refresh_token));
        let body = transport::send(request).await?;
        Ok(wire::parse_session(&body, transport::now_unix())?)
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = (config, refresh_token);
        Err(unavailable())
    }
}

pub async fn sign_out(config: &PublicConfig, access_token: &str) -> Result<(), ApiError> {
    #[cfg(feature = "hydrate")]
    {
        let request = transport::auth(gloo_net::http::Request::post(&config.endpoints().logout()), config)
            .header("Authorization", &format!("Bearer {access_token}"))
            .build();
        transport::send(request).await?;
        Ok(())
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = (config, access_token);
        Err(unavailable())
    }
}

pub async fn upsert_profile(config: &PublicConfig, access_token: Option<&str>, profile: &Profile) -> Result<(), ApiError> {
    #[cfg(feature = "hydrate")]
    {
        use domain::wire;
        let url = config.endpoints().table("profiles");
        let request = transport::table(gloo_net::http::Request::post(&url), config, access_token)
            .query(wire::profiles_upsert_query())
            .header(wire::HEADER_PREFER, wire::PREFER_UPSERT)
            .json(profile);
        transport::send(request).await?;
        Ok(())
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = (config, access_token, profile);
        Err(unavailable())
    }
}

pub async fn select_posts(config: &PublicConfig, access_token: &str) -> Result<Vec<Post>, ApiError> {
    #[cfg(feature = "hydrate")]
    {
        use domain::wire;
        let url = config.endpoints().table("posts");
        let request = transport::table(gloo_net::http::Request::get(&url), config, Some(access_token))
            .query(wire::posts_select_query())
            .build();
        let body = transport::send(request).await?;
        Ok(wire::parse_posts(&body)?)
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = (config, access_token);
        Err(unavailable())
    }
}

pub async fn insert_post(config: &PublicConfig, access_token: &str, post: &NewPost) -> Result<Post, ApiError> {
    #[cfg(feature = "hydrate")]
    {
        use domain::wire;
        let url = config.endpoints().table("posts");
        let request = transport::table(gloo_net::http::Request::post(&url), config, Some(access_token))
            .query(wire::posts_insert_query())
            .header(wire::HEADER_PREFER, wire::PREFER_RETURN_ROW)
            .header("Accept", wire::ACCEPT_SINGLE_OBJECT)
            .json(post);
        let body = transport::send(request).await?;
        Ok(wire::parse_post(&body)?)
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = (config, access_token, post);
        Err(unavailable())
    }
}

/// Upsert the profile derived from `user`.
///
/// # Errors
///
/// Returns a soft [`FeedError`]: `AuthorizationDenied` for a
/// row-level-security rejection, `ProfileSync` otherwise.
pub async fn sync_profile(config: &PublicConfig, access_token: Option<&str>, user: &User) -> Result<(), FeedError> {
    upsert_profile(config, access_token, &profile_for(user))
        .await
        .map_err(ApiError::into_profile_error)
}
