use super::*;

fn uid() -> Uuid {
    Uuid::parse_str("11111111-2222-4333-8444-555555555555").unwrap()
}

fn row(id: i64, content: &str) -> Value {
    json!({
        "id": id,
        "content": content,
        "created_at": "2024-05-01T10:00:00+00:00",
        "user_id": uid(),
    })
}

fn change_message(topic: &str, data: Value) -> PhoenixMessage {
    PhoenixMessage {
        topic: topic.to_owned(),
        event: "postgres_changes".to_owned(),
        payload: json!({ "ids": [1], "data": data }),
        reference: None,
    }
}

#[test]
fn join_message_filters_on_user() {
    let topic = posts_topic(&uid());
    let msg = join_message(&topic, &uid(), "jwt", 1);
    assert_eq!(msg.event, "phx_join");
    assert_eq!(msg.reference.as_deref(), Some("1"));
    assert_eq!(msg.payload["access_token"], "jwt");
    let change = &msg.payload["config"]["postgres_changes"][0];
    assert_eq!(change["table"], "posts");
    assert_eq!(change["filter"], format!("user_id=eq.{}", uid()));
}

#[test]
fn text_encoding_uses_ref_field() {
    let text = heartbeat_message(9).to_text();
    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["topic"], PHOENIX_TOPIC);
    assert_eq!(value["ref"], "9");
    assert_eq!(PhoenixMessage::from_text(&text).unwrap(), heartbeat_message(9));
}

#[test]
fn decode_change_reads_wire_shape() {
    let insert = decode_change(&json!({ "type": "INSERT", "record": row(1, "a") }));
    assert!(matches!(insert, ChangeEvent::Insert(ref p) if p.content == "a"));

    let update = decode_change(&json!({ "type": "UPDATE", "record": row(1, "b"), "old_record": { "id": 1 } }));
    assert!(matches!(update, ChangeEvent::Update(ref p) if p.content == "b"));

    let delete = decode_change(&json!({ "type": "DELETE", "old_record": { "id": 1 } }));
    assert_eq!(delete, ChangeEvent::Delete(PostId::new("1")));
}

#[test]
fn decode_change_reads_client_library_shape() {
    let insert = decode_change(&json!({ "eventType": "INSERT", "new": row(2, "x"), "old": {} }));
    assert!(matches!(insert, ChangeEvent::Insert(ref p) if p.id == PostId::new("2")));
}

#[test]
fn decode_change_flags_unknown_and_malformed_events() {
    assert!(matches!(decode_change(&json!({ "type": "TRUNCATE" })), ChangeEvent::Unrecognized(_)));
    assert!(matches!(
        decode_change(&json!({ "type": "INSERT", "record": { "id": 1 } })),
        ChangeEvent::Unrecognized(_)
    ));
    assert!(matches!(decode_change(&json!({ "type": "DELETE", "old_record": {} })), ChangeEvent::Unrecognized(_)));
}

#[test]
fn classify_routes_changes_for_joined_topic_only() {
    let topic = posts_topic(&uid());
    let msg = change_message(&topic, json!({ "type": "DELETE", "old_record": { "id": 3 } }));
    assert_eq!(
        classify(&msg, &topic, "1"),
        RealtimeSignal::Change(ChangeEvent::Delete(PostId::new("3")))
    );
    assert_eq!(classify(&msg, "realtime:other", "1"), RealtimeSignal::Ignored);
}

#[test]
fn classify_join_replies_by_reference() {
    let topic = posts_topic(&uid());
    let ok = PhoenixMessage {
        topic: topic.clone(),
        event: "phx_reply".to_owned(),
        payload: json!({ "status": "ok", "response": {} }),
        reference: Some("1".to_owned()),
    };
    assert_eq!(classify(&ok, &topic, "1"), RealtimeSignal::Joined);
    assert_eq!(classify(&ok, &topic, "2"), RealtimeSignal::Ignored);

    let rejected = PhoenixMessage {
        payload: json!({ "status": "error", "response": { "reason": "invalid token" } }),
        ..ok
    };
    assert_eq!(classify(&rejected, &topic, "1"), RealtimeSignal::JoinRejected("invalid token".to_owned()));
}

#[test]
fn classify_system_errors_close_the_channel() {
    let topic = posts_topic(&uid());
    let msg = PhoenixMessage {
        topic: topic.clone(),
        event: "system".to_owned(),
        payload: json!({ "status": "error", "message": "subscription failed" }),
        reference: None,
    };
    assert_eq!(classify(&msg, &topic, "1"), RealtimeSignal::Closed("subscription failed".to_owned()));
}
