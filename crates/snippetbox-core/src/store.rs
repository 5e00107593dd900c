//! Storage collaborator traits.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ModelError, ModelResult};
use crate::memory::MemoryStore;
use crate::models::{Snippet, User};

/// Snippet persistence.
#[async_trait]
pub trait SnippetStore: Send + Sync + 'static {
    /// Stores a snippet that expires `expires_days` from now and returns its id.
    async fn insert(&self, title: &str, content: &str, expires_days: i64) -> ModelResult<i64>;

    /// Returns the snippet with `id` if it exists and has not expired.
    async fn get(&self, id: i64) -> ModelResult<Snippet>;

    /// Returns up to `limit` non-expired snippets, newest first.
    async fn latest(&self, limit: usize) -> ModelResult<Vec<Snippet>>;
}

/// User persistence and credential checks.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Registers a user. Fails with [`ModelError::DuplicateEmail`] if the
    /// email is taken.
    async fn insert(&self, name: &str, email: &str, password: &str) -> ModelResult<i64>;

    /// Returns the id of the active user matching `email` and `password`.
    async fn authenticate(&self, email: &str, password: &str) -> ModelResult<i64>;

    /// Returns the user with `id`.
    async fn get(&self, id: i64) -> ModelResult<User>;
}

/// The storage handles an application is built with.
#[derive(Clone)]
pub struct Storage {
    /// Snippet collaborator
    pub snippets: Arc<dyn SnippetStore>,
    /// User collaborator
    pub users: Arc<dyn UserStore>,
}

impl Storage {
    /// Uses one value for both collaborators.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: SnippetStore + UserStore,
    {
        Self {
            snippets: store.clone(),
            users: store,
        }
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

/// Opens the store named by `dsn`, hashing new passwords at bcrypt work
/// factor `password_cost`.
///
/// Only `memory://` is available in this build. Any other scheme is a
/// [`ModelError::Storage`], which the binary treats as fatal.
pub fn connect(dsn: &str, password_cost: u32) -> ModelResult<Storage> {
    let scheme = dsn.split_once("://").map_or(dsn, |(scheme, _)| scheme);
    match scheme {
        "memory" => {
            tracing::debug!(dsn, password_cost, "opening in-memory store");
            Ok(Storage::from_store(Arc::new(MemoryStore::with_password_cost(
                password_cost,
            ))))
        }
        other => Err(ModelError::storage(format!(
            "unsupported storage scheme `{other}`"
        ))),
    }
}
