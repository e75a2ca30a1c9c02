//! Session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-side record of the one bearer token currently valid for a user.
///
/// Logging in again overwrites `token`; logging out blanks it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Owning user
    pub user_id: i64,
    /// Current bearer token, empty once logged out
    pub token: String,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: i64, token: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            token,
            expires_at,
            created_at: Utc::now(),
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Check if the session was cleared by a logout
    pub fn is_cleared(&self) -> bool {
        self.token.is_empty()
    }

    /// Whether `presented` is exactly the token this session holds
    pub fn holds(&self, presented: &str) -> bool {
        !self.is_cleared() && self.token == presented
    }
}
