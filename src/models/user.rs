use chrono::{DateTime, Utc};

/// Represents a registered user.
#[derive(Clone, Debug)]
pub struct User {
    /// The unique identifier for the user.
    pub id: i64,
    /// The user's username, unique across the table.
    pub username: String,
    /// The user's Argon2id password hash in PHC format.
    pub password: String,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
}
