//! User model
//!
//! A user is either a tutor or a student; the matching profile lives in the
//! `tutors` / `students` tables.

use super::ChatSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Tutor or student
    pub user_type: UserType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User.
    ///
    /// The password must already be hashed with `services::password::hash_password()`.
    pub fn new(name: String, email: String, password_hash: String, user_type: UserType) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            name,
            email,
            password_hash,
            user_type,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_tutor(&self) -> bool {
        self.user_type == UserType::Tutor
    }
}

/// Signed-in user's overview: account details plus their chats
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub user_type: UserType,
    pub chats: Vec<ChatSummary>,
}

impl Dashboard {
    pub fn new(user: &User, chats: Vec<ChatSummary>) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            user_type: user.user_type,
            chats,
        }
    }
}

/// Kind of marketplace account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Tutor,
    #[default]
    Student,
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserType::Tutor => write!(f, "tutor"),
            UserType::Student => write!(f, "student"),
        }
    }
}

impl FromStr for UserType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tutor" => Ok(UserType::Tutor),
            "student" => Ok(UserType::Student),
            _ => Err(anyhow::anyhow!("Invalid user type: {}", s)),
        }
    }
}
