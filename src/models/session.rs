use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Represents a logged-in session, stored in Redis under `session:{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// The ID of the user this session belongs to.
    pub user_id: i64,
    /// The username, kept here so pages can greet the user without a query.
    pub username: String,
    /// The timestamp when the session was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the session expires.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Starts a session for `user_id` lasting `duration_days`.
    pub fn new(user_id: i64, username: String, duration_days: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            username,
            created_at: now,
            expires_at: now + Duration::days(duration_days),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// The session resolved for the current request, if any.
///
/// Inserted into request extensions by `resolve_session` for every route.
#[derive(Debug, Clone, Default)]
pub struct CurrentSession(pub Option<Session>);

impl CurrentSession {
    pub fn session(&self) -> Option<&Session> {
        self.0.as_ref()
    }
}
