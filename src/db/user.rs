//! User model for Gator.

use chrono::{DateTime, Utc};

/// A registered user.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    /// User ID.
    pub id: i64,
    /// Unique user name.
    pub name: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// New user for registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// User name.
    pub name: String,
}

impl NewUser {
    /// Create a new user request.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
