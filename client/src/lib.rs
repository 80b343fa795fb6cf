//! # client
//!
//! Leptos + WASM web client for the Murmur feed.
//!
//! This crate contains the root `App` (session holder), the auth and feed
//! pages, their state, and the browser networking for the hosted backend's
//! auth, table, and realtime APIs. Shared model and wire logic come from the
//! `domain` crate.

pub mod app;
pub mod components;
pub mod net;
pub mod pages;
pub mod state;

/// WASM entry point: hydrate the server-rendered shell.
#[cfg(feature = "hydrate")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub fn hydrate() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
    leptos::mount::hydrate_body(app::App);
}
