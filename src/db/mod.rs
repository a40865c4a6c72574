//! SQLite storage of the index.
//!
//! Row-level operations are free functions over a [`rusqlite::Connection`] so
//! that the merge engine can run them inside one transaction. The
//! [`Database`] handle owns the connection and hands it out behind a lock:
//! readers and writers never see each other's uncommitted state.

mod schema;
pub mod albums;
pub mod directories;
pub mod media;
pub mod meta_files;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{IndexError, Result};

pub use directories::DirectoryRow;
pub use media::PersonMatch;
pub use schema::{MIGRATIONS, SCHEMA};

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        Self::from_connection(conn)
    }

    /// A private database that disappears with the handle.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn initialize(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA)?;
        for migration in MIGRATIONS {
            let _ = conn.execute(migration, []);
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| IndexError::LockPoisoned)
    }

    /// Run read-only work against committed state.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` in one immediate transaction. An error rolls everything back.
    pub fn transaction<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Remove every indexed row.
    pub fn reset(&self) -> Result<()> {
        self.transaction(|tx| {
            tx.execute_batch(
                r#"
                DELETE FROM albums;
                DELETE FROM face_regions;
                DELETE FROM persons;
                DELETE FROM meta_files;
                UPDATE directories SET preview_id = NULL;
                DELETE FROM media;
                DELETE FROM directories;
                "#,
            )?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_transaction_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        let result: Result<()> = db.transaction(|tx| {
            directories::insert(tx, "kept?", "./", None, 1, Some(2))?;
            Err(IndexError::Worker("boom".to_string()))
        });
        assert!(result.is_err());

        let found = db.read(|conn| directories::find(conn, "kept?", "./")).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_open_file_database_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("index.db");
        {
            let db = Database::open(&path).unwrap();
            db.initialize().unwrap();
            db.transaction(|tx| directories::insert(tx, "a", "./", None, 1, None))
                .unwrap();
        }
        let db = Database::open(&path).unwrap();
        db.initialize().unwrap();
        let row = db.read(|conn| directories::find(conn, "a", "./")).unwrap();
        assert!(row.is_some());
    }

    #[test]
    fn test_reset_clears_rows() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db.transaction(|tx| {
            let id = directories::insert(tx, "a", "./", None, 1, Some(1))?;
            let media_id = media::insert(tx, id, &crate::model::Media::photo("x.jpg"))?;
            directories::set_preview(tx, id, Some(media_id))?;
            Ok(())
        })
        .unwrap();

        db.reset().unwrap();
        let row = db.read(|conn| directories::find(conn, "a", "./")).unwrap();
        assert!(row.is_none());
    }
}
