//! Album rows. Albums are saved searches; their content is evaluated on read.

use rusqlite::{params, Connection};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumRow {
    pub id: i64,
    pub name: String,
    pub locked: bool,
    /// Serialized search query.
    pub search_query: String,
}

/// Insert or replace a locked album declared by a saved-search file.
pub fn upsert_locked(conn: &Connection, name: &str, search_query: &str) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO albums (name, locked, search_query) VALUES (?, 1, ?)
        ON CONFLICT(name) DO UPDATE SET locked = 1, search_query = excluded.search_query
        "#,
        params![name, search_query],
    )?;
    let id = conn.query_row(
        "SELECT id FROM albums WHERE name = ? COLLATE BINARY",
        [name],
        |row| row.get(0),
    )?;
    Ok(id)
}

pub fn list(conn: &Connection) -> Result<Vec<AlbumRow>> {
    let mut stmt =
        conn.prepare("SELECT id, name, locked, search_query FROM albums ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(AlbumRow {
                id: row.get(0)?,
                name: row.get(1)?,
                locked: row.get(2)?,
                search_query: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
