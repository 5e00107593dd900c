//! Core types for Snippetbox.
//!
//! This crate holds everything the HTTP layers share but that has no HTTP
//! in it:
//!
//! - [`Snippet`] and [`User`] records
//! - [`ModelError`], which keeps "no record" apart from infrastructure failure
//! - the [`SnippetStore`] and [`UserStore`] collaborator traits with the
//!   in-memory [`MemoryStore`]
//! - [`Form`] validation for the HTML forms
//!
//! # Example
//!
//! ```
//! use snippetbox_core::{MemoryStore, SnippetStore};
//!
//! # tokio_test::block_on(async {
//! let store = MemoryStore::new();
//! let id = store.insert("O snail", "Climb Mount Fuji", 7).await.unwrap();
//! let snippet = store.get(id).await.unwrap();
//! assert_eq!(snippet.title, "O snail");
//! # });
//! ```

mod error;
mod forms;
mod memory;
mod models;
pub mod security;
mod store;

pub use error::{ModelError, ModelResult};
pub use forms::{email_pattern, Form, FormErrors};
pub use memory::MemoryStore;
pub use models::{Snippet, User};
pub use store::{connect, SnippetStore, Storage, UserStore};
