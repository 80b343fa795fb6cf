//! Realtime change-feed messages.
//!
//! SYSTEM CONTEXT
//! ==============
//! The hosted realtime service speaks Phoenix channels over a JSON websocket.
//! A client joins `realtime:<channel>` with a `postgres_changes` filter, keeps
//! the socket alive with heartbeats on the `phoenix` topic, and receives one
//! `postgres_changes` message per committed row change. This module builds
//! the outbound messages and classifies inbound ones; transports live in the
//! native engine and the browser client.

#[cfg(test)]
#[path = "realtime_test.rs"]
mod realtime_test;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::model::{Post, PostId};

/// Seconds between heartbeats; the service drops sockets silent for 60 s.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 25;

/// Topic used for socket-level heartbeats.
pub const PHOENIX_TOPIC: &str = "phoenix";

/// One Phoenix channel message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

impl PhoenixMessage {
    /// Encode as the JSON text frame sent over the socket.
    #[must_use]
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Decode a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for frames that are not a channel message.
    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Channel topic for the posts authored by `user_id`.
#[must_use]
pub fn posts_topic(user_id: &Uuid) -> String {
    format!("realtime:posts:{user_id}")
}

/// `phx_join` for `topic`, subscribed to every change on `public.posts`
/// authored by `user_id`.
#[must_use]
pub fn join_message(topic: &str, user_id: &Uuid, access_token: &str, reference: u64) -> PhoenixMessage {
    PhoenixMessage {
        topic: topic.to_owned(),
        event: "phx_join".to_owned(),
        payload: json!({
            "config": {
                "broadcast": { "ack": false, "self": false },
                "presence": { "key": "" },
                "postgres_changes": [{
                    "event": "*",
                    "schema": "public",
                    "table": "posts",
                    "filter": format!("user_id=eq.{user_id}"),
                }],
                "private": false,
            },
            "access_token": access_token,
        }),
        reference: Some(reference.to_string()),
    }
}

#[must_use]
pub fn leave_message(topic: &str, reference: u64) -> PhoenixMessage {
    PhoenixMessage {
        topic: topic.to_owned(),
        event: "phx_leave".to_owned(),
        payload: json!({}),
        reference: Some(reference.to_string()),
    }
}

#[must_use]
pub fn heartbeat_message(reference: u64) -> PhoenixMessage {
    PhoenixMessage {
        topic: PHOENIX_TOPIC.to_owned(),
        event: "heartbeat".to_owned(),
        payload: json!({}),
        reference: Some(reference.to_string()),
    }
}

/// Hand a refreshed access token to an already-joined channel.
#[must_use]
pub fn access_token_message(topic: &str, access_token: &str, reference: u64) -> PhoenixMessage {
    PhoenixMessage {
        topic: topic.to_owned(),
        event: "access_token".to_owned(),
        payload: json!({ "access_token": access_token }),
        reference: Some(reference.to_string()),
    }
}

/// A row change on `public.posts`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeEvent {
    Insert(Post),
    Update(Post),
    Delete(PostId),
    /// Event type not understood or row not decodable; callers refetch.
    Unrecognized(String),
}

/// Decode the `data` object of a `postgres_changes` payload.
///
/// Accepts both the wire shape (`type`, `record`, `old_record`) and the
/// client-library shape (`eventType`, `new`, `old`).
#[must_use]
pub fn decode_change(data: &Value) -> ChangeEvent {
    let kind = data
        .get("type")
        .or_else(|| data.get("eventType"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let record = data.get("record").or_else(|| data.get("new"));
    let old_record = data.get("old_record").or_else(|| data.get("old"));

    match kind {
        "INSERT" => match record.map(|r| serde_json::from_value::<Post>(r.clone())) {
            Some(Ok(post)) => ChangeEvent::Insert(post),
            Some(Err(e)) => ChangeEvent::Unrecognized(format!("bad INSERT record: {e}")),
            None => ChangeEvent::Unrecognized("INSERT without record".to_owned()),
        },
        "UPDATE" => match record.map(|r| serde_json::from_value::<Post>(r.clone())) {
            Some(Ok(post)) => ChangeEvent::Update(post),
            Some(Err(e)) => ChangeEvent::Unrecognized(format!("bad UPDATE record: {e}")),
            None => ChangeEvent::Unrecognized("UPDATE without record".to_owned()),
        },
        "DELETE" => match old_record
            .and_then(|r| r.get("id"))
            .map(|id| serde_json::from_value::<PostId>(id.clone()))
        {
            Some(Ok(id)) => ChangeEvent::Delete(id),
            _ => ChangeEvent::Unrecognized("DELETE without old id".to_owned()),
        },
        other => ChangeEvent::Unrecognized(format!("event type `{other}`")),
    }
}

/// What an inbound message means for a subscriber of `topic`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RealtimeSignal {
    Change(ChangeEvent),
    /// Join acknowledged by the service.
    Joined,
    /// Join refused; carries the service's reason.
    JoinRejected(String),
    /// Channel closed or errored server-side.
    Closed(String),
    /// Heartbeat replies, presence, and other topics.
    Ignored,
}

/// Classify an inbound message for the channel joined as `topic`.
///
/// `join_ref` is the reference the join was sent with; replies to other
/// references (heartbeats, token pushes) are ignored.
#[must_use]
pub fn classify(message: &PhoenixMessage, topic: &str, join_ref: &str) -> RealtimeSignal {
    if message.topic != topic {
        return RealtimeSignal::Ignored;
    }
    match message.event.as_str() {
        "postgres_changes" => {
            let data = message.payload.get("data").unwrap_or(&Value::Null);
            RealtimeSignal::Change(decode_change(data))
        }
        "phx_reply" if message.reference.as_deref() == Some(join_ref) => {
            let status = message
                .payload
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if status == "ok" {
                RealtimeSignal::Joined
            } else {
                let reason = message
                    .payload
                    .pointer("/response/reason")
                    .and_then(Value::as_str)
                    .unwrap_or(status);
                RealtimeSignal::JoinRejected(reason.to_owned())
            }
        }
        "phx_close" => RealtimeSignal::Closed("channel closed".to_owned()),
        "phx_error" => RealtimeSignal::Closed("channel error".to_owned()),
        "system" if message.payload.get("status").and_then(Value::as_str) == Some("error") => {
            let reason = message
                .payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("system error");
            RealtimeSignal::Closed(reason.to_owned())
        }
        _ => RealtimeSignal::Ignored,
    }
}
