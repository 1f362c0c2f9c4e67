//! Wire DTOs for the auth and tracking endpoints.
//!
//! DESIGN
//! ======
//! The user record is kept as raw JSON: the session layer only checks that
//! one exists, so any profile field the backend adds survives a
//! persist/restore cycle untouched.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// An authenticated user as returned by the profile, login and register endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct User(pub serde_json::Value);

impl User {
    /// Best-effort display name (`username`, then `name`).
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        ["username", "name"]
            .iter()
            .find_map(|key| self.0.get(key).and_then(serde_json::Value::as_str))
    }

    fn is_present(&self) -> bool {
        match &self.0 {
            serde_json::Value::Null | serde_json::Value::Bool(false) => false,
            serde_json::Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }
}

/// Login form payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Registration payload. Fields beyond the account basics are passed through as-is.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RegistrationData {
    pub username: String,
    pub password: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Success envelope shared by the login and register endpoints.
///
/// Older backend builds answer with `usuario`, newer ones with `user`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub usuario: Option<User>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AuthResponse {
    /// Extract the user object, preferring `usuario` over `user`.
    #[must_use]
    pub fn into_user(self) -> Option<User> {
        self.usuario
            .filter(User::is_present)
            .or_else(|| self.user.filter(User::is_present))
    }
}

/// A study-tracking session opened by the tracking service.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TrackingSession {
    #[serde(deserialize_with = "deserialize_id")]
    pub sesion_id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Accept an identifier sent either as a JSON string or an integer.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Ok(s),
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        _ => Err(D::Error::custom("expected string or integer id")),
    }
}
