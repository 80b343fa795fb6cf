//! Hosted backend over HTTP (auth + table APIs) and websocket (realtime).
//!
//! Thin `reqwest` wrapper. URLs, bodies, and response parsing come from
//! `domain::wire` so the browser client issues identical requests.

use std::time::Duration;

use async_trait::async_trait;
use domain::wire::{self, Endpoints, SignUpResult};
use domain::{Credentials, NewPost, Post, Profile, Session, User};
use reqwest::header::{ACCEPT, AUTHORIZATION};

use super::{Backend, ChangeSubscription, realtime};
use crate::config::ClientConfig;
use crate::error::BackendError;
use crate::session::now_unix;

pub struct HostedBackend {
    http: reqwest::Client,
    endpoints: Endpoints,
    anon_key: String,
    email_redirect_to: Option<String>,
    heartbeat: Duration,
}

impl HostedBackend {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeouts.request())
            .connect_timeout(config.timeouts.connect())
            .build()
            .map_err(|e| BackendError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            endpoints: Endpoints::new(&config.supabase_url),
            anon_key: config.anon_key.clone(),
            email_redirect_to: config.email_redirect_to.clone(),
            heartbeat: Duration::from_secs(config.heartbeat_secs),
        })
    }

    fn auth_request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.http.request(method, url).header(wire::HEADER_API_KEY, &self.anon_key)
    }

    fn table_request(&self, method: reqwest::Method, table: &str, access_token: Option<&str>) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.endpoints.table(table))
            .header(wire::HEADER_API_KEY, &self.anon_key)
            .header(AUTHORIZATION, wire::bearer(access_token, &self.anon_key))
    }

    /// Send and return the body of a successful response.
    async fn send(&self, request: reqwest::RequestBuilder, what: &'static str) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        if !(200..300).contains(&status) {
            tracing::debug!(%status, what, "backend request rejected");
            return Err(BackendError::from_response(status, &body));
        }
        Ok(body)
    }
}

#[async_trait]
impl Backend for HostedBackend {
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session, BackendError> {
        let request = self
            .auth_request(reqwest::Method::POST, self.endpoints.token())
            .query(&wire::password_grant_query())
            .json(&wire::password_body(credentials));
        let body = self.send(request, "sign_in").await?;
        Ok(wire::parse_session(&body, now_unix())?)
    }

    async fn sign_up(&self, credentials: &Credentials, username: &str) -> Result<SignUpResult, BackendError> {
        let request = self
            .auth_request(reqwest::Method::POST, self.endpoints.sign_up())
            .query(&wire::sign_up_query(self.email_redirect_to.as_deref()))
            .json(&wire::sign_up_body(credentials, username));
        let body = self.send(request, "sign_up").await?;
        Ok(wire::parse_sign_up(&body, now_unix())?)
    }

    async fn get_user(&self, access_token: &str) -> Result<User, BackendError> {
        let request = self
            .auth_request(reqwest::Method::GET, self.endpoints.user())
            .bearer_auth(access_token);
        let body = self.send(request, "get_user").await?;
        Ok(wire::parse_user(&body)?)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError> {
        let request = self
            .auth_request(reqwest::Method::POST, self.endpoints.token())
            .query(&wire::refresh_grant_query())
            .json(&wire::refresh_body(refresh_token));
        let body = self.send(request, "refresh").await?;
        Ok(wire::parse_session(&body, now_unix())?)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let request = self
            .auth_request(reqwest::Method::POST, self.endpoints.logout())
            .bearer_auth(access_token);
        self.send(request, "sign_out").await?;
        Ok(())
    }

    async fn upsert_profile(&self, access_token: Option<&str>, profile: &Profile) -> Result<(), BackendError> {
        let request = self
            .table_request(reqwest::Method::POST, "profiles", access_token)
            .query(&wire::profiles_upsert_query())
            .header(wire::HEADER_PREFER, wire::PREFER_UPSERT)
            .json(profile);
        self.send(request, "upsert_profile").await?;
        Ok(())
    }

    async fn select_posts(&self, access_token: &str) -> Result<Vec<Post>, BackendError> {
        let request = self
            .table_request(reqwest::Method::GET, "posts", Some(access_token))
            .query(&wire::posts_select_query());
        let body = self.send(request, "select_posts").await?;
        Ok(wire::parse_posts(&body)?)
    }

    async fn insert_post(&self, access_token: &str, post: &NewPost) -> Result<Post, BackendError> {
        let request = self
            .table_request(reqwest::Method::POST, "posts", Some(access_token))
            .query(&wire::posts_insert_query())
            .header(wire::HEADER_PREFER, wire::PREFER_RETURN_ROW)
            .header(ACCEPT, wire::ACCEPT_SINGLE_OBJECT)
            .json(post);
        let body = self.send(request, "insert_post").await?;
        Ok(wire::parse_post(&body)?)
    }

    async fn subscribe_posts(&self, session: &Session) -> Result<ChangeSubscription, BackendError> {
        let url = self.endpoints.realtime_socket(&self.anon_key);
        Ok(realtime::spawn_posts_channel(url, session, self.heartbeat))
    }
}
