//! In-memory storage collaborator.

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use parking_lot::RwLock;

use crate::error::{ModelError, ModelResult};
use crate::models::{Snippet, User};
use crate::security::{PasswordHash, DEFAULT_PASSWORD_COST};
use crate::store::{SnippetStore, UserStore};

#[derive(Debug)]
struct UserRow {
    user: User,
    password: PasswordHash,
}

#[derive(Debug, Default)]
struct Tables {
    snippets: Vec<Snippet>,
    users: Vec<UserRow>,
}

/// Snippet and user tables held in process memory.
///
/// Rows are append-only and ids are row positions plus one, which keeps
/// them monotonic. Reads take a shared lock; writes an exclusive one.
/// Password work happens outside the lock.
#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    password_cost: u32,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_password_cost(DEFAULT_PASSWORD_COST)
    }
}

impl MemoryStore {
    /// Creates an empty store hashing passwords at the default bcrypt cost.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store hashing passwords at bcrypt work factor `cost`.
    #[must_use]
    pub fn with_password_cost(cost: u32) -> Self {
        Self {
            tables: RwLock::default(),
            password_cost: cost,
        }
    }

    /// Marks a user active or inactive.
    pub fn set_active(&self, id: i64, active: bool) -> ModelResult<()> {
        let mut tables = self.tables.write();
        let row = tables
            .users
            .iter_mut()
            .find(|row| row.user.id == id)
            .ok_or(ModelError::NoRecord)?;
        row.user.active = active;
        Ok(())
    }
}

fn next_id(len: usize) -> ModelResult<i64> {
    i64::try_from(len + 1).map_err(|_| ModelError::storage("id space exhausted"))
}

#[async_trait]
impl SnippetStore for MemoryStore {
    async fn insert(&self, title: &str, content: &str, expires_days: i64) -> ModelResult<i64> {
        let now = Utc::now();
        let expires = TimeDelta::try_days(expires_days)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                ModelError::storage(format!("expiry of {expires_days} days is out of range"))
            })?;
        let mut tables = self.tables.write();
        let id = next_id(tables.snippets.len())?;
        tables.snippets.push(Snippet {
            id,
            title: title.to_string(),
            content: content.to_string(),
            created: now,
            expires,
        });
        Ok(id)
    }

    async fn get(&self, id: i64) -> ModelResult<Snippet> {
        let now = Utc::now();
        self.tables
            .read()
            .snippets
            .iter()
            .find(|s| s.id == id && s.is_live(now))
            .cloned()
            .ok_or(ModelError::NoRecord)
    }

    async fn latest(&self, limit: usize) -> ModelResult<Vec<Snippet>> {
        let now = Utc::now();
        Ok(self
            .tables
            .read()
            .snippets
            .iter()
            .rev()
            .filter(|s| s.is_live(now))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, name: &str, email: &str, password: &str) -> ModelResult<i64> {
        let password = PasswordHash::new(password, self.password_cost)?;
        let mut tables = self.tables.write();
        if tables
            .users
            .iter()
            .any(|row| row.user.email.eq_ignore_ascii_case(email))
        {
            return Err(ModelError::DuplicateEmail);
        }
        let id = next_id(tables.users.len())?;
        tables.users.push(UserRow {
            user: User {
                id,
                name: name.to_string(),
                email: email.to_string(),
                created: Utc::now(),
                active: true,
            },
            password,
        });
        Ok(id)
    }

    async fn authenticate(&self, email: &str, password: &str) -> ModelResult<i64> {
        let (id, hash) = self
            .tables
            .read()
            .users
            .iter()
            .find(|row| row.user.active && row.user.email.eq_ignore_ascii_case(email))
            .map(|row| (row.user.id, row.password.clone()))
            .ok_or(ModelError::InvalidCredentials)?;
        if hash.verify(password) {
            Ok(id)
        } else {
            Err(ModelError::InvalidCredentials)
        }
    }

    async fn get(&self, id: i64) -> ModelResult<User> {
        self.tables
            .read()
            .users
            .iter()
            .find(|row| row.user.id == id)
            .map(|row| row.user.clone())
            .ok_or(ModelError::NoRecord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::MIN_PASSWORD_COST;

    fn store() -> MemoryStore {
        MemoryStore::with_password_cost(MIN_PASSWORD_COST)
    }

    #[tokio::test]
    async fn test_snippet_insert_and_get() {
        let store = store();
        let id = SnippetStore::insert(&store, "O snail", "Climb Mount Fuji", 365)
            .await
            .unwrap();
        assert_eq!(id, 1);

        let snippet = SnippetStore::get(&store, id).await.unwrap();
        assert_eq!(snippet.title, "O snail");
        assert!(snippet.expires > snippet.created);
    }

    #[tokio::test]
    async fn test_out_of_range_expiry_is_storage_error() {
        let store = store();
        for days in [1_000_000_000, i64::MAX, i64::MIN] {
            let result = SnippetStore::insert(&store, "t", "c", days).await;
            assert!(matches!(result, Err(ModelError::Storage(_))), "{days}");
        }
        assert!(SnippetStore::latest(&store, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_snippet_is_no_record() {
        let store = store();
        assert_eq!(SnippetStore::get(&store, 42).await, Err(ModelError::NoRecord));
    }

    #[tokio::test]
    async fn test_expired_snippet_is_no_record() {
        let store = store();
        let id = SnippetStore::insert(&store, "gone", "already expired", 0)
            .await
            .unwrap();
        assert_eq!(SnippetStore::get(&store, id).await, Err(ModelError::NoRecord));
        assert!(store.latest(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_latest_is_newest_first_and_limited() {
        let store = store();
        for i in 0..12 {
            SnippetStore::insert(&store, &format!("s{i}"), "c", 7).await.unwrap();
        }
        let latest = store.latest(10).await.unwrap();
        assert_eq!(latest.len(), 10);
        assert_eq!(latest[0].title, "s11");
        assert_eq!(latest[9].title, "s2");
    }

    #[tokio::test]
    async fn test_user_signup_and_authenticate() {
        let store = store();
        let id = UserStore::insert(&store, "Alice", "alice@example.com", "pa55word123")
            .await
            .unwrap();

        assert_eq!(store.authenticate("alice@example.com", "pa55word123").await, Ok(id));
        assert_eq!(
            store.authenticate("alice@example.com", "wrong").await,
            Err(ModelError::InvalidCredentials)
        );
        assert_eq!(
            store.authenticate("bob@example.com", "pa55word123").await,
            Err(ModelError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let store = store();
        UserStore::insert(&store, "Alice", "alice@example.com", "pa55word123")
            .await
            .unwrap();
        let err = UserStore::insert(&store, "Other", "ALICE@example.com", "pa55word456")
            .await
            .unwrap_err();
        assert_eq!(err, ModelError::DuplicateEmail);
    }

    #[tokio::test]
    async fn test_inactive_user_cannot_authenticate() {
        let store = store();
        let id = UserStore::insert(&store, "Alice", "alice@example.com", "pa55word123")
            .await
            .unwrap();
        store.set_active(id, false).unwrap();

        assert_eq!(
            store.authenticate("alice@example.com", "pa55word123").await,
            Err(ModelError::InvalidCredentials)
        );
        assert!(!UserStore::get(&store, id).await.unwrap().active);
    }

    #[tokio::test]
    async fn test_bad_password_cost_stores_nothing() {
        let store = MemoryStore::with_password_cost(2);
        let err = UserStore::insert(&store, "Alice", "alice@example.com", "pa55word123")
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Storage(_)));
        assert_eq!(UserStore::get(&store, 1).await, Err(ModelError::NoRecord));
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let store = store();
        assert_eq!(UserStore::get(&store, 9).await, Err(ModelError::NoRecord));
        assert_eq!(store.set_active(9, false), Err(ModelError::NoRecord));
    }
}
