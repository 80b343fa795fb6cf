//! Records consumed from the hosted backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! The client never owns any of these. Sessions come from the auth service,
//! profiles and posts from the table store. Field names follow the store's
//! column names so rows deserialize without mapping layers.

#[cfg(test)]
#[path = "model_test.rs"]
mod model_test;

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

/// Authenticated identity embedded in a [`Session`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Auth-service user identifier.
    pub id: Uuid,
    /// Email address, absent for phone or anonymous identities.
    #[serde(default)]
    pub email: Option<String>,
}

/// Refresh this long before the access token expires.
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// Bearer credential plus the identity it authenticates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Unix timestamp (seconds) after which the access token is rejected.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

impl Session {
    /// Seconds from `now_unix` until the token should be refreshed, keeping
    /// `margin_secs` of headroom. `None` when the session carries no expiry.
    #[must_use]
    pub fn refresh_due_in(&self, now_unix: i64, margin_secs: i64) -> Option<i64> {
        self.expires_at
            .map(|expires_at| (expires_at - margin_secs - now_unix).max(0))
    }

    /// Email of the embedded user, or an empty string.
    #[must_use]
    pub fn email(&self) -> &str {
        self.user.email.as_deref().unwrap_or_default()
    }
}

/// Why the current session changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// One row of the `profiles` table. Keyed on the auth user id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    /// Rows created elsewhere may carry `null`; read as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub username: String,
    /// Serialized as an explicit `null` so upserts clear stale avatars.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Post identifier as returned by the store.
///
/// The `posts` table may use integer or UUID keys; both are held as their
/// string form so realtime rows and REST rows compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PostId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(raw) if !raw.is_empty() => Ok(Self(raw)),
            serde_json::Value::Number(number) => Ok(Self(number.to_string())),
            other => Err(D::Error::custom(format!("expected string or integer post id, got {other}"))),
        }
    }
}

/// One row of the `posts` table with the author's profile embedded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub content: String,
    #[serde(with = "timestamp")]
    pub created_at: OffsetDateTime,
    pub user_id: Uuid,
    /// Author profile from the `profiles(...)` embed. Realtime rows never
    /// carry it.
    #[serde(default, rename = "profiles", skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

impl Post {
    /// Author name for display, falling back to a short user id.
    #[must_use]
    pub fn author_label(&self) -> String {
        match &self.profile {
            Some(profile) if !profile.username.is_empty() => profile.username.clone(),
            _ => crate::username::fallback_username(&self.user_id),
        }
    }

    /// Creation time formatted as `YYYY-MM-DD HH:MM` (UTC).
    #[must_use]
    pub fn created_label(&self) -> String {
        let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
        self.created_at
            .format(&format)
            .unwrap_or_else(|_| self.created_at.to_string())
    }
}

/// Insert body for the `posts` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewPost {
    pub content: String,
    pub user_id: Uuid,
}

/// Parse a store timestamp.
///
/// Accepts RFC 3339 as returned by the REST API plus the offset-less and
/// space-separated forms that show up in realtime records (assumed UTC).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let normalized = raw.trim().replacen(' ', "T", 1);
    if let Ok(ts) = OffsetDateTime::parse(&normalized, &Rfc3339) {
        return Some(ts);
    }
    let short_offset =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]][offset_hour sign:mandatory]");
    if let Ok(ts) = OffsetDateTime::parse(&normalized, &short_offset) {
        return Some(ts);
    }
    let naive = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]");
    PrimitiveDateTime::parse(&normalized, &naive)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

mod timestamp {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;
    use time::format_description::well_known::Rfc3339;

    pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let text = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
    }
}
