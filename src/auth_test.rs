use super::*;
use crate::state::test_helpers::{MockBackend, user_id};
use domain::auth_form::{INVALID_EMAIL_MESSAGE, SHORT_PASSWORD_MESSAGE, VERIFICATION_SENT_MESSAGE};

const RLS_BODY: &str =
    r#"{"code":"42501","message":"new row violates row-level security policy for table \"profiles\""}"#;

fn flow(backend: &Arc<MockBackend>) -> (AuthFlow, Arc<SessionHolder>) {
    let sessions = Arc::new(SessionHolder::new());
    (AuthFlow::new(backend.clone(), sessions.clone()), sessions)
}

// =========================================================================
// sign up
// =========================================================================

#[tokio::test]
async fn sign_up_shows_verification_even_when_profile_upsert_fails() {
    let backend = Arc::new(MockBackend::new());
    backend.fail("upsert_profile", 500, r#"{"message":"boom"}"#);
    let (flow, sessions) = flow(&backend);

    let settled = flow.submit(AuthAction::SignUp, "a@b.com", "secret1").await;

    assert_eq!(settled.value.message(), Some(VERIFICATION_SENT_MESSAGE));
    assert_eq!(settled.value.error(), None);
    assert!(!settled.value.is_submitting());
    assert_eq!(settled.soft, vec![FeedError::ProfileSync("boom".into())]);
    assert_eq!(backend.calls(), vec!["sign_up", "upsert_profile"]);
    assert!(sessions.current().is_none());
}

#[tokio::test]
async fn sign_up_upserts_profile_from_email_local_part() {
    let backend = Arc::new(MockBackend::new());
    let (flow, _) = flow(&backend);

    let settled = flow.submit(AuthAction::SignUp, "  a@b.com ", "secret1").await;

    assert!(settled.is_clean());
    let profiles = backend.profiles.lock().unwrap();
    assert_eq!(profiles.get(&user_id()).map(|p| p.username.as_str()), Some("a"));
}

#[tokio::test]
async fn sign_up_with_autoconfirm_signs_in() {
    let backend = Arc::new(MockBackend::autoconfirming());
    let (flow, sessions) = flow(&backend);

    let settled = flow.submit(AuthAction::SignUp, "a@b.com", "secret1").await;

    assert_eq!(settled.value.message(), Some(VERIFICATION_SENT_MESSAGE));
    assert_eq!(sessions.snapshot().event, crate::session::AuthEvent::SignedIn);
    assert!(sessions.current().is_some());
}

#[tokio::test]
async fn sign_up_failure_shows_backend_message() {
    let backend = Arc::new(MockBackend::new());
    backend.fail("sign_up", 422, r#"{"code":422,"error_code":"weak_password","msg":"Password is too weak"}"#);
    let (flow, _) = flow(&backend);

    let settled = flow.submit(AuthAction::SignUp, "a@b.com", "secret1").await;

    assert_eq!(settled.value.error(), Some("Password is too weak"));
    assert_eq!(settled.value.message(), None);
    assert_eq!(backend.count("upsert_profile"), 0);
}

// =========================================================================
// sign in
// =========================================================================

#[tokio::test]
async fn sign_in_publishes_session_and_upserts_profile() {
    let backend = Arc::new(MockBackend::new());
    let (flow, sessions) = flow(&backend);
    let mut subscription = sessions.subscribe();

    let settled = flow.submit(AuthAction::SignIn, "a@b.com", "secret1").await;

    assert!(settled.is_clean());
    assert_eq!(settled.value.message(), None);
    assert_eq!(settled.value.error(), None);
    let snapshot = subscription.changed().await.unwrap();
    assert_eq!(snapshot.event, crate::session::AuthEvent::SignedIn);
    assert_eq!(snapshot.session.unwrap().email(), "a@b.com");
    assert_eq!(backend.count("upsert_profile"), 1);
}

#[tokio::test]
async fn sign_in_rls_rejection_is_not_shown() {
    let backend = Arc::new(MockBackend::new());
    backend.fail("sign_in", 403, RLS_BODY);
    let (flow, sessions) = flow(&backend);

    let settled = flow.submit(AuthAction::SignIn, "a@b.com", "secret1").await;

    assert_eq!(settled.value.error(), None);
    assert_eq!(settled.value.message(), None);
    assert!(matches!(settled.soft.as_slice(), [FeedError::AuthorizationDenied(_)]));
    assert!(sessions.current().is_none());
}

#[tokio::test]
async fn sign_in_profile_rls_rejection_is_soft() {
    let backend = Arc::new(MockBackend::new());
    backend.fail("upsert_profile", 403, RLS_BODY);
    let (flow, sessions) = flow(&backend);

    let settled = flow.submit(AuthAction::SignIn, "a@b.com", "secret1").await;

    assert_eq!(settled.value.error(), None);
    assert!(matches!(settled.soft.as_slice(), [FeedError::AuthorizationDenied(_)]));
    assert!(sessions.current().is_some());
}

#[tokio::test]
async fn sign_in_bad_credentials_shows_message() {
    let backend = Arc::new(MockBackend::new());
    backend.fail("sign_in", 400, r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#);
    let (flow, _) = flow(&backend);

    let settled = flow.submit(AuthAction::SignIn, "a@b.com", "secret1").await;

    assert_eq!(settled.value.error(), Some("Invalid login credentials"));
    assert!(settled.is_clean());
}

// =========================================================================
// validation
// =========================================================================

#[tokio::test]
async fn invalid_input_never_reaches_backend() {
    let backend = Arc::new(MockBackend::new());
    let (flow, _) = flow(&backend);

    let settled = flow.submit(AuthAction::SignIn, "not-an-email", "secret1").await;
    assert_eq!(settled.value.error(), Some(INVALID_EMAIL_MESSAGE));

    let settled = flow.submit(AuthAction::SignUp, "a@b.com", "short").await;
    assert_eq!(settled.value.error(), Some(SHORT_PASSWORD_MESSAGE));

    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn upsert_profile_twice_keeps_one_row() {
    let backend = Arc::new(MockBackend::new());
    let user = crate::state::test_helpers::user("a@b.com");

    upsert_profile(backend.as_ref(), Some("at"), &user).await.unwrap();
    upsert_profile(backend.as_ref(), Some("at"), &user).await.unwrap();

    let profiles = backend.profiles.lock().unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[&user_id()].username, "a");
}
