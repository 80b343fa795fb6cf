//! Public backend settings for the browser client.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, HeaderValue};
use axum::response::{IntoResponse, Json};
use domain::wire::PublicConfig;

use crate::state::AppState;

/// `GET /api/config`: backend URL, anon key, and verification redirect.
/// Only public values; the anon key is meant to ship to browsers.
pub async fn public_config(State(state): State<AppState>) -> impl IntoResponse {
    let body: PublicConfig = state.public.as_ref().clone();
    ([(CACHE_CONTROL, HeaderValue::from_static("no-store"))], Json(body))
}
