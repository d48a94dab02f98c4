//! SQLite-backed store.
//!
//! Tables:
//! - `users`: id, email (UNIQUE, byte-exact), password_hash, profile, created_at
//! - `bookmarks`: id, owner_id, title, link, description, timestamps

use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode};
use std::path::Path;

use super::{Account, BookmarkStore, CredentialStore, ProfileUpdate, StoreError};
use crate::bookmarks::{Bookmark, BookmarkPatch, NewBookmark};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at the given path.
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        // WAL mode for concurrent reads + crash safety
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                first_name TEXT,
                last_name TEXT,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS bookmarks (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                link TEXT NOT NULL,
                description TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_bookmarks_owner ON bookmarks(owner_id);",
        )?;
        Ok(())
    }

    fn account_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
        Ok(Account {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            first_name: row.get(3)?,
            last_name: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn bookmark_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Bookmark> {
        Ok(Bookmark {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            title: row.get(2)?,
            link: row.get(3)?,
            description: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, first_name, last_name, created_at";
const BOOKMARK_COLUMNS: &str = "id, owner_id, title, link, description, created_at, updated_at";

/// Map a uniqueness-constraint rejection to `AlreadyExists`.
fn map_write_error(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            StoreError::AlreadyExists
        }
        other => StoreError::Internal(other),
    }
}

fn epoch_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

impl CredentialStore for SqliteStore {
    fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let conn = self.conn.lock();
        let row = conn.query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            Self::account_row,
        );
        match row {
            Ok(account) => Ok(Some(account)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn create(&self, email: &str, password_hash: &str) -> Result<Account, StoreError> {
        let account = Account {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            first_name: None,
            last_name: None,
            created_at: epoch_secs(),
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO users (id, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![account.id, account.email, account.password_hash, account.created_at],
        )
        .map_err(map_write_error)?;
        Ok(account)
    }

    fn get_account(&self, id: &str) -> Result<Option<Account>, StoreError> {
        let conn = self.conn.lock();
        let row = conn.query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            Self::account_row,
        );
        match row {
            Ok(account) => Ok(Some(account)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<Account, StoreError> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE users SET
                    email = COALESCE(?2, email),
                    first_name = COALESCE(?3, first_name),
                    last_name = COALESCE(?4, last_name)
                 WHERE id = ?1",
                params![id, update.email, update.first_name, update.last_name],
            )
            .map_err(map_write_error)?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        conn.query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            Self::account_row,
        )
        .map_err(StoreError::Internal)
    }
}

impl BookmarkStore for SqliteStore {
    fn create_bookmark(&self, owner_id: &str, new: &NewBookmark) -> Result<Bookmark, StoreError> {
        let now = epoch_secs();
        let bookmark = Bookmark {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            title: new.title.clone(),
            link: new.link.clone(),
            description: new.description.clone(),
            created_at: now,
            updated_at: now,
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO bookmarks (id, owner_id, title, link, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                bookmark.id,
                bookmark.owner_id,
                bookmark.title,
                bookmark.link,
                bookmark.description,
                bookmark.created_at,
                bookmark.updated_at,
            ],
        )
        .map_err(map_write_error)?;
        Ok(bookmark)
    }

    fn list_bookmarks(&self, owner_id: &str) -> Result<Vec<Bookmark>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {BOOKMARK_COLUMNS} FROM bookmarks
             WHERE owner_id = ?1 ORDER BY created_at DESC, id"
        ))?;
        let bookmarks = stmt
            .query_map(params![owner_id], Self::bookmark_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bookmarks)
    }

    fn get_bookmark(&self, id: &str) -> Result<Option<Bookmark>, StoreError> {
        let conn = self.conn.lock();
        let row = conn.query_row(
            &format!("SELECT {BOOKMARK_COLUMNS} FROM bookmarks WHERE id = ?1"),
            params![id],
            Self::bookmark_row,
        );
        match row {
            Ok(bookmark) => Ok(Some(bookmark)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn update_bookmark(&self, id: &str, patch: &BookmarkPatch) -> Result<Bookmark, StoreError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE bookmarks SET
                title = COALESCE(?2, title),
                link = COALESCE(?3, link),
                description = COALESCE(?4, description),
                updated_at = ?5
             WHERE id = ?1",
            params![id, patch.title, patch.link, patch.description, epoch_secs()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        conn.query_row(
            &format!("SELECT {BOOKMARK_COLUMNS} FROM bookmarks WHERE id = ?1"),
            params![id],
            Self::bookmark_row,
        )
        .map_err(StoreError::Internal)
    }

    fn delete_bookmark(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let deleted = conn.execute("DELETE FROM bookmarks WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn seeded_account(store: &SqliteStore, email: &str) -> Account {
        store.create(email, "$argon2id$placeholder").unwrap()
    }

    fn new_bookmark(title: &str) -> NewBookmark {
        NewBookmark {
            title: title.to_string(),
            link: "https://example.com".to_string(),
            description: None,
        }
    }

    #[test]
    fn file_backed_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");

        let account_id = {
            let store = SqliteStore::open(&path).unwrap();
            let account = store.create("a@x.com", "$argon2id$placeholder").unwrap();
            store
                .create_bookmark(&account.id, &new_bookmark("Persisted"))
                .unwrap();
            account.id
        };

        let store = SqliteStore::open(&path).unwrap();
        let found = store.find_by_email("a@x.com").unwrap().unwrap();
        assert_eq!(found.id, account_id);
        assert_eq!(store.list_bookmarks(&account_id).unwrap().len(), 1);
    }

    #[test]
    fn create_and_find_by_email() {
        let store = store();
        let created = seeded_account(&store, "a@x.com");

        let found = store.find_by_email("a@x.com").unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.password_hash, "$argon2id$placeholder");

        assert!(store.find_by_email("b@x.com").unwrap().is_none());
    }

    #[test]
    fn email_lookup_is_case_sensitive() {
        let store = store();
        seeded_account(&store, "a@x.com");
        assert!(store.find_by_email("A@X.COM").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_already_exists() {
        let store = store();
        seeded_account(&store, "a@x.com");
        let result = store.create("a@x.com", "other-hash");
        assert!(matches!(result, Err(StoreError::AlreadyExists)));
    }

    #[test]
    fn concurrent_create_same_email_one_winner() {
        let store = Arc::new(store());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.create("race@x.com", "hash"))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::AlreadyExists)))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 3);
    }

    #[test]
    fn update_profile_partial() {
        let store = store();
        let account = seeded_account(&store, "a@x.com");

        let updated = store
            .update_profile(
                &account.id,
                &ProfileUpdate {
                    first_name: Some("Ada".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.email, "a@x.com");
        assert_eq!(updated.first_name.as_deref(), Some("Ada"));
        assert!(updated.last_name.is_none());
    }

    #[test]
    fn update_profile_email_collision_conflicts() {
        let store = store();
        seeded_account(&store, "a@x.com");
        let other = seeded_account(&store, "b@x.com");

        let result = store.update_profile(
            &other.id,
            &ProfileUpdate {
                email: Some("a@x.com".to_string()),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(StoreError::AlreadyExists)));
    }

    #[test]
    fn update_profile_unknown_account_not_found() {
        let store = store();
        let result = store.update_profile("missing", &ProfileUpdate::default());
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[test]
    fn bookmark_crud_roundtrip() {
        let store = store();
        let owner = seeded_account(&store, "a@x.com");

        let created = store
            .create_bookmark(&owner.id, &new_bookmark("Test Bookmark"))
            .unwrap();
        assert_eq!(created.owner_id, owner.id);

        let listed = store.list_bookmarks(&owner.id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);

        let fetched = store.get_bookmark(&created.id).unwrap().unwrap();
        assert_eq!(fetched.title, "Test Bookmark");

        let patched = store
            .update_bookmark(
                &created.id,
                &BookmarkPatch {
                    title: Some("Updated title".to_string()),
                    description: Some("Updated description".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(patched.title, "Updated title");
        assert_eq!(patched.link, created.link);
        assert_eq!(patched.description.as_deref(), Some("Updated description"));

        store.delete_bookmark(&created.id).unwrap();
        assert!(store.get_bookmark(&created.id).unwrap().is_none());
        assert!(store.list_bookmarks(&owner.id).unwrap().is_empty());
    }

    #[test]
    fn list_is_owner_scoped() {
        let store = store();
        let a = seeded_account(&store, "a@x.com");
        let b = seeded_account(&store, "b@x.com");

        store.create_bookmark(&a.id, &new_bookmark("A's")).unwrap();

        assert_eq!(store.list_bookmarks(&a.id).unwrap().len(), 1);
        assert!(store.list_bookmarks(&b.id).unwrap().is_empty());
    }

    #[test]
    fn missing_bookmark_operations_are_not_found() {
        let store = store();
        assert!(store.get_bookmark("missing").unwrap().is_none());
        assert!(matches!(
            store.update_bookmark("missing", &BookmarkPatch::default()),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.delete_bookmark("missing"),
            Err(StoreError::NotFound)
        ));
    }
}
