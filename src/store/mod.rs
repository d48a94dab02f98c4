//! Durable storage collaborators.
//!
//! The auth core talks to storage only through these traits; the SQLite
//! implementation lives in [`sqlite`]. Email uniqueness is enforced
//! atomically by the store (a database constraint), not by read-then-write
//! in the core.

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::bookmarks::{Bookmark, BookmarkPatch, NewBookmark};

/// A registered account. `password_hash` is never logged or serialized
/// into a response.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Unix seconds.
    pub created_at: i64,
}

/// Profile fields an account holder may change about themselves.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("record already exists")]
    AlreadyExists,
    #[error("record not found")]
    NotFound,
    #[error("storage failure: {0}")]
    Internal(#[from] rusqlite::Error),
}

/// Durable account records. Two concurrent `create` calls with the same
/// email yield exactly one success and one `AlreadyExists`.
pub trait CredentialStore: Send + Sync {
    fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;
    fn create(&self, email: &str, password_hash: &str) -> Result<Account, StoreError>;
    fn get_account(&self, id: &str) -> Result<Option<Account>, StoreError>;
    fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<Account, StoreError>;
}

/// Durable bookmark records. Ownership decisions happen in the caller;
/// the store only surfaces `owner_id` alongside each row.
pub trait BookmarkStore: Send + Sync {
    fn create_bookmark(&self, owner_id: &str, new: &NewBookmark) -> Result<Bookmark, StoreError>;
    fn list_bookmarks(&self, owner_id: &str) -> Result<Vec<Bookmark>, StoreError>;
    fn get_bookmark(&self, id: &str) -> Result<Option<Bookmark>, StoreError>;
    fn update_bookmark(&self, id: &str, patch: &BookmarkPatch) -> Result<Bookmark, StoreError>;
    fn delete_bookmark(&self, id: &str) -> Result<(), StoreError>;
}
