use std::collections::HashMap;

use super::*;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn reads_public_settings() {
    let state = AppState::from_lookup(lookup(&[
        ("SUPABASE_URL", "https://proj.supabase.co/"),
        ("SUPABASE_ANON_KEY", "anon"),
        ("MURMUR_EMAIL_REDIRECT_TO", "https://murmur.test/"),
    ]))
    .unwrap();
    assert_eq!(state.public.supabase_url, "https://proj.supabase.co");
    assert_eq!(state.public.anon_key, "anon");
    assert_eq!(state.public.email_redirect_to.as_deref(), Some("https://murmur.test/"));
}

#[test]
fn redirect_is_optional() {
    let state =
        AppState::from_lookup(lookup(&[("SUPABASE_URL", "http://localhost:54321"), ("SUPABASE_ANON_KEY", "anon")]))
            .unwrap();
    assert_eq!(state.public.email_redirect_to, None);
}

#[test]
fn missing_url_is_an_error() {
    let result = AppState::from_lookup(lookup(&[("SUPABASE_ANON_KEY", "anon")]));
    assert_eq!(result.err(), Some(StateError::Missing { var: "SUPABASE_URL" }));
}

#[test]
fn blank_anon_key_is_missing() {
    let result = AppState::from_lookup(lookup(&[("SUPABASE_URL", "https://proj.supabase.co"), ("SUPABASE_ANON_KEY", "  ")]));
    assert_eq!(result.err(), Some(StateError::Missing { var: "SUPABASE_ANON_KEY" }));
}

#[test]
fn non_http_url_is_invalid() {
    let result = AppState::from_lookup(lookup(&[("SUPABASE_URL", "ftp://proj"), ("SUPABASE_ANON_KEY", "anon")]));
    assert!(matches!(result, Err(StateError::Invalid { var: "SUPABASE_URL", .. })));
}
