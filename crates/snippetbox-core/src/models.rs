//! Domain records.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A published snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    /// Store-assigned identifier, starting at 1
    pub id: i64,
    /// Short title
    pub title: String,
    /// Body text
    pub content: String,
    /// Creation time
    pub created: DateTime<Utc>,
    /// Time after which the snippet is no longer served
    pub expires: DateTime<Utc>,
}

impl Snippet {
    /// Returns true if the snippet is still visible at `now`.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires > now
    }
}

/// A registered user.
///
/// The password hash stays inside the store and is never part of this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Store-assigned identifier, starting at 1
    pub id: i64,
    /// Display name
    pub name: String,
    /// Unique login email
    pub email: String,
    /// Signup time
    pub created: DateTime<Utc>,
    /// Deactivated users cannot log in and lose existing sessions
    pub active: bool,
}
