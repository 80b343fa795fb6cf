use super::*;

const RLS_BODY: &str = r#"{"code":"42501","message":"new row violates row-level security policy for table \"posts\""}"#;

fn config(redirect: Option<&str>) -> PublicConfig {
    PublicConfig {
        supabase_url: "https://proj.supabase.co".to_owned(),
        anon_key: "anon".to_owned(),
        email_redirect_to: redirect.map(str::to_owned),
    }
}

#[test]
fn rls_rejection_on_auth_path_is_soft() {
    let err = ApiError::from_response(403, RLS_BODY).into_auth_error();
    assert!(matches!(err, FeedError::AuthorizationDenied(_)));
    assert_eq!(err.user_message(), None);
}

#[test]
fn ordinary_auth_failure_is_shown() {
    let err = ApiError::from_response(400, r#"{"error_description":"Invalid login credentials"}"#).into_auth_error();
    assert_eq!(err.user_message().as_deref(), Some("Invalid login credentials"));
}

#[test]
fn profile_failures_are_always_soft() {
    assert!(ApiError::from_response(403, RLS_BODY).into_profile_error().is_soft());
    assert!(ApiError::transport("offline").into_profile_error().is_soft());
}

#[test]
fn submit_shows_raw_message_even_for_rls() {
    let err = ApiError::from_response(403, RLS_BODY).into_submit_error();
    assert!(err.user_message().unwrap().contains("row-level security"));
}

#[test]
fn transport_errors_are_never_rls() {
    assert!(!ApiError::transport("row-level security policy").is_authorization_denied());
}

#[test]
fn redirect_prefers_configured_target() {
    assert_eq!(
        redirect_target(&config(Some("https://app.test/welcome")), Some("https://origin.test".into())).as_deref(),
        Some("https://app.test/welcome")
    );
    assert_eq!(redirect_target(&config(None), Some("https://origin.test".into())).as_deref(), Some("https://origin.test"));
    assert_eq!(redirect_target(&config(None), None), None);
}

#[test]
fn wire_errors_become_transport_errors() {
    let err = ApiError::from(WireError::NotASequence);
    assert_eq!(err.status, None);
    assert!(matches!(err.into_fetch_error(), FeedError::Fetch(_)));
}
