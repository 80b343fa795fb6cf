use super::*;
use crate::model::PostId;

const UID: &str = "3b241101-e2bb-4255-8caf-4136c566a962";

fn creds() -> Credentials {
    Credentials { email: "a@b.com".to_owned(), password: "secret1".to_owned() }
}

#[test]
fn endpoints_trim_trailing_slash() {
    let endpoints = Endpoints::new("https://proj.supabase.co/");
    assert_eq!(endpoints.token(), "https://proj.supabase.co/auth/v1/token");
    assert_eq!(endpoints.table("posts"), "https://proj.supabase.co/rest/v1/posts");
    assert_eq!(endpoints.logout(), "https://proj.supabase.co/auth/v1/logout");
}

#[test]
fn realtime_socket_switches_scheme() {
    assert_eq!(
        Endpoints::new("https://proj.supabase.co").realtime_socket("anon"),
        "wss://proj.supabase.co/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
    );
    assert_eq!(
        Endpoints::new("http://localhost:54321").realtime_socket("anon"),
        "ws://localhost:54321/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
    );
}

#[test]
fn sign_up_body_embeds_username_metadata() {
    let body = sign_up_body(&creds(), "a");
    assert_eq!(body["email"], "a@b.com");
    assert_eq!(body["data"]["username"], "a");
    assert_eq!(sign_up_query(Some("https://app.test/")), vec![("redirect_to", "https://app.test/".to_owned())]);
    assert!(sign_up_query(None).is_empty());
}

#[test]
fn bearer_falls_back_to_anon_key() {
    assert_eq!(bearer(Some("jwt"), "anon"), "Bearer jwt");
    assert_eq!(bearer(None, "anon"), "Bearer anon");
}

#[test]
fn parse_session_computes_expiry_from_expires_in() {
    let body = format!(
        r#"{{"access_token":"at","token_type":"bearer","expires_in":3600,"refresh_token":"rt","user":{{"id":"{UID}","email":"a@b.com"}}}}"#
    );
    let session = parse_session(&body, 1_000).unwrap();
    assert_eq!(session.access_token, "at");
    assert_eq!(session.refresh_token, "rt");
    assert_eq!(session.expires_at, Some(4_600));
    assert_eq!(session.email(), "a@b.com");
}

#[test]
fn parse_sign_up_accepts_bare_user() {
    let body = format!(r#"{{"id":"{UID}","email":"a@b.com","confirmation_sent_at":"2024-05-01T10:00:00Z"}}"#);
    let result = parse_sign_up(&body, 0).unwrap();
    assert_eq!(result.user.email.as_deref(), Some("a@b.com"));
    assert!(result.session.is_none());
}

#[test]
fn parse_sign_up_accepts_session() {
    let body = format!(r#"{{"access_token":"at","expires_at":99,"user":{{"id":"{UID}"}}}}"#);
    let result = parse_sign_up(&body, 0).unwrap();
    assert_eq!(result.session.unwrap().expires_at, Some(99));
}

#[test]
fn parse_posts_rejects_non_sequence() {
    assert_eq!(parse_posts(r#"{"message":"oops"}"#), Err(WireError::NotASequence));
    assert!(matches!(parse_posts("not json"), Err(WireError::Json(_))));
}

#[test]
fn parse_posts_reads_rows() {
    let body = format!(
        r#"[{{"id":1,"content":"hi","created_at":"2024-05-01T10:00:00+00:00","user_id":"{UID}","profiles":{{"id":"{UID}","username":"a","avatar_url":null}}}}]"#
    );
    let posts = parse_posts(&body).unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, PostId::new("1"));
    assert_eq!(posts[0].author_label(), "a");
}

#[test]
fn parse_posts_tolerates_null_username() {
    let body = format!(
        r#"[{{"id":1,"content":"hi","created_at":"2024-05-01T10:00:00+00:00","user_id":"{UID}","profiles":{{"id":"{UID}","username":null,"avatar_url":null}}}}]"#
    );
    let posts = parse_posts(&body).unwrap();
    assert_eq!(posts[0].profile.as_ref().unwrap().username, "");
    assert_eq!(posts[0].author_label(), "user_3b241101");
}

#[test]
fn error_message_prefers_backend_text() {
    assert_eq!(
        error_message(400, r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#),
        "Invalid login credentials"
    );
    assert_eq!(
        error_message(400, r#"{"error":"invalid_grant","error_description":"Email not confirmed"}"#),
        "Email not confirmed"
    );
    assert_eq!(error_message(502, "<html>bad gateway</html>"), "request failed with status 502");
}

#[test]
fn error_code_reads_sqlstate() {
    let body = r#"{"code":"42501","message":"new row violates row-level security policy for table \"posts\""}"#;
    assert_eq!(error_code(body).as_deref(), Some("42501"));
    assert_eq!(error_code(r#"{"code":400,"error_code":"weak_password"}"#).as_deref(), Some("weak_password"));
    assert_eq!(error_code("nope"), None);
}

#[test]
fn new_post_body_serializes_user_scope() {
    let uid = Uuid::parse_str(UID).unwrap();
    let value = serde_json::to_value(new_post_body("hello", uid)).unwrap();
    assert_eq!(value, json!({ "content": "hello", "user_id": UID }));
}
