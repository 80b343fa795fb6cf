use super::*;

fn user_id() -> Uuid {
    Uuid::parse_str("8f14e45f-ceea-467f-a0e6-1c1f1b1f0a01").unwrap()
}

#[test]
fn post_id_accepts_integer_and_string_keys() {
    let from_int: PostId = serde_json::from_value(serde_json::json!(42)).unwrap();
    let from_str: PostId = serde_json::from_value(serde_json::json!("42")).unwrap();
    assert_eq!(from_int, from_str);
    assert_eq!(from_int.as_str(), "42");
}

#[test]
fn post_id_rejects_null_and_empty() {
    assert!(serde_json::from_value::<PostId>(serde_json::Value::Null).is_err());
    assert!(serde_json::from_value::<PostId>(serde_json::json!("")).is_err());
}

#[test]
fn post_deserializes_rest_row_with_embedded_profile() {
    let row = serde_json::json!({
        "id": 7,
        "content": "hello",
        "created_at": "2024-05-01T10:00:00.123456+00:00",
        "user_id": user_id(),
        "profiles": { "id": user_id(), "username": "alice", "avatar_url": null }
    });
    let post: Post = serde_json::from_value(row).unwrap();
    assert_eq!(post.id, PostId::new("7"));
    assert_eq!(post.author_label(), "alice");
    assert_eq!(post.created_label(), "2024-05-01 10:00");
}

#[test]
fn post_deserializes_realtime_row_without_profile() {
    let row = serde_json::json!({
        "id": "p-1",
        "content": "hi",
        "created_at": "2024-05-01T10:00:00",
        "user_id": user_id()
    });
    let post: Post = serde_json::from_value(row).unwrap();
    assert!(post.profile.is_none());
    assert_eq!(post.author_label(), "user_8f14e45f");
}

#[test]
fn parse_timestamp_accepts_store_variants() {
    let expected = parse_timestamp("2024-05-01T10:00:00Z").unwrap();
    assert_eq!(parse_timestamp("2024-05-01T10:00:00+00:00"), Some(expected));
    assert_eq!(parse_timestamp("2024-05-01 10:00:00+00"), Some(expected));
    assert_eq!(parse_timestamp("2024-05-01T10:00:00"), Some(expected));
    assert!(parse_timestamp("yesterday").is_none());
}

#[test]
fn profile_serializes_null_avatar() {
    let profile = Profile { id: user_id(), username: "alice".to_owned(), avatar_url: None };
    let value = serde_json::to_value(&profile).unwrap();
    assert_eq!(value["avatar_url"], serde_json::Value::Null);
}

#[test]
fn refresh_due_in_keeps_margin_and_clamps() {
    let session = Session {
        access_token: "t".to_owned(),
        refresh_token: "r".to_owned(),
        expires_at: Some(1_000),
        user: User { id: user_id(), email: None },
    };
    assert_eq!(session.refresh_due_in(800, 60), Some(140));
    assert_eq!(session.refresh_due_in(990, 60), Some(0));
    assert_eq!(session.refresh_due_in(800, REFRESH_MARGIN_SECS), Some(140));
    let no_expiry = Session { expires_at: None, ..session };
    assert_eq!(no_expiry.refresh_due_in(800, 60), None);
}
