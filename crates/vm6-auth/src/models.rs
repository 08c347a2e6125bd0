//! Request and response bodies of the `auth/v4` endpoints.

use serde::{Deserialize, Deserializer, Serialize};

/// Credentials posted to `auth/v4/public/token`.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    /// Account email.
    pub email: &'a str,
    /// Account password.
    pub password: &'a str,
}

/// Response of `auth/v4/public/token`.
///
/// Absent and `null` fields decode to their defaults; only `token` is used by
/// the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoginResponse {
    /// Whether the account is confirmed.
    #[serde(default, deserialize_with = "null_as_default")]
    pub confirmed: bool,
    /// Token expiry as reported by the API (format varies, kept as raw JSON).
    #[serde(default)]
    pub expires_at: serde_json::Value,
    /// User id the token belongs to.
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: i64,
    /// Session token.
    #[serde(default, deserialize_with = "null_as_default")]
    pub token: String,
}

impl LoginResponse {
    /// Whether the response carried a usable token.
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Response of `auth/v4/user/{id}/key`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthKey {
    /// The key; empty when the API omits it.
    #[serde(default, deserialize_with = "null_as_default")]
    pub key: String,
}
