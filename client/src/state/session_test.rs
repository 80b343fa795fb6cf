use super::*;
use domain::User;

fn session(expires_at: Option<i64>) -> Session {
    Session {
        access_token: "at".to_owned(),
        refresh_token: "rt".to_owned(),
        expires_at,
        user: User { id: Uuid::nil(), email: Some("a@b.com".to_owned()) },
    }
}

#[test]
fn starts_loading_without_session() {
    let state = SessionState::default();
    assert!(state.loading);
    assert_eq!(state.user_id(), None);
    assert_eq!(state.last_event, AuthEvent::InitialSession);
}

#[test]
fn initial_session_ends_loading() {
    let mut state = SessionState::default();
    state.publish(AuthEvent::InitialSession, None);
    assert!(!state.loading);
    assert_eq!(state.session, None);
}

#[test]
fn sign_in_and_out_track_identity() {
    let mut state = SessionState::default();
    state.publish(AuthEvent::SignedIn, Some(session(None)));
    assert_eq!(state.user_id(), Some(Uuid::nil()));
    assert_eq!(state.access_token().as_deref(), Some("at"));

    state.publish(AuthEvent::SignedOut, None);
    assert_eq!(state.user_id(), None);
    assert_eq!(state.last_event, AuthEvent::SignedOut);
}

#[test]
fn refresh_delay_keeps_margin() {
    let mut state = SessionState::default();
    state.publish(AuthEvent::SignedIn, Some(session(Some(1_000 + 3_600))));
    assert_eq!(state.refresh_delay_ms(1_000), Some((3_600 - 60) * 1_000));

    state.publish(AuthEvent::SignedIn, Some(session(Some(1_030))));
    assert_eq!(state.refresh_delay_ms(1_000), Some(0));

    state.publish(AuthEvent::SignedIn, Some(session(None)));
    assert_eq!(state.refresh_delay_ms(1_000), None);
}

#[test]
fn identity_needs_config_and_session() {
    let mut state = SessionState::default();
    state.publish(AuthEvent::SignedIn, Some(session(None)));
    assert_eq!(state.identity(), None);

    state.config = Some(PublicConfig {
        supabase_url: "https://proj.supabase.co".to_owned(),
        anon_key: "anon".to_owned(),
        email_redirect_to: None,
    });
    let (config, current) = state.identity().unwrap();
    assert_eq!(config.anon_key, "anon");
    assert_eq!(current.access_token, "at");
}

#[test]
fn refresh_key_ignores_unrelated_changes() {
    let mut state = SessionState::default();
    assert_eq!(state.refresh_key(), None);

    state.publish(AuthEvent::SignedIn, Some(session(Some(4_600))));
    let key = state.refresh_key();
    assert_eq!(key, Some(("at".to_owned(), 4_600)));

    state.config_error = Some("down".to_owned());
    state.last_event = AuthEvent::InitialSession;
    assert_eq!(state.refresh_key(), key);

    let mut refreshed = session(Some(8_200));
    refreshed.access_token = "at-2".to_owned();
    state.publish(AuthEvent::TokenRefreshed, Some(refreshed));
    assert_ne!(state.refresh_key(), key);

    state.publish(AuthEvent::SignedIn, Some(session(None)));
    assert_eq!(state.refresh_key(), None);
}
