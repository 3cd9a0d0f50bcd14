use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
///
/// A record that has not been saved yet carries `id: None` and
/// `registration_time: None`; both are filled in before it reaches the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Option<i64>,                          // assigned by the store
    pub username: String,
    pub normalized_username: String,              // uppercase of username
    pub email: String,
    pub normalized_email: String,                 // uppercase of email
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,                    // Argon2 hash, not exposed in JSON
    pub registration_time: Option<OffsetDateTime>,
}

/// Locale-invariant uppercase transform used for the normalized columns.
pub fn normalize(value: &str) -> String {
    value.to_uppercase()
}
