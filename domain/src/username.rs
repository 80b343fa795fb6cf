//! Username policy for profiles created by the client.

#[cfg(test)]
#[path = "username_test.rs"]
mod username_test;

use uuid::Uuid;

use crate::model::{Profile, User};

/// Derive a username from an email's local part.
///
/// Falls back to `user_<first 8 chars of id>` when the local part is empty.
#[must_use]
pub fn derive_username(email: &str, user_id: &Uuid) -> String {
    username_hint(email).unwrap_or_else(|| fallback_username(user_id))
}

/// Email local part, when there is one. Used before the user id is known
/// (sign-up metadata).
#[must_use]
pub fn username_hint(email: &str) -> Option<String> {
    let local = email.split('@').next().unwrap_or_default().trim();
    (!local.is_empty()).then(|| local.to_owned())
}

/// `user_<first 8 chars of id>`.
#[must_use]
pub fn fallback_username(user_id: &Uuid) -> String {
    let id = user_id.to_string();
    format!("user_{}", &id[..8])
}

/// Profile row the client upserts for `user`: derived username, no avatar.
#[must_use]
pub fn profile_for(user: &User) -> Profile {
    Profile {
        id: user.id,
        username: derive_username(user.email.as_deref().unwrap_or_default(), &user.id),
        avatar_url: None,
    }
}
