//! Directory rows.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::model::{Directory, DirectoryContents};

/// A stored directory without its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRow {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub parent_id: Option<i64>,
    pub last_modified: i64,
    pub last_scanned: Option<i64>,
    pub media_count: u32,
    pub preview_id: Option<i64>,
}

impl DirectoryRow {
    /// Convert to a partial directory. The preview is filled in by the caller.
    pub fn into_directory(self) -> Directory {
        Directory {
            id: Some(self.id),
            name: self.name,
            path: self.path,
            last_modified: self.last_modified,
            last_scanned: self.last_scanned,
            media_count: self.media_count,
            preview: None,
            contents: DirectoryContents::Partial,
        }
    }
}

const COLUMNS: &str =
    "id, name, path, parent_id, last_modified, last_scanned, media_count, preview_id";

fn from_row(row: &Row<'_>) -> rusqlite::Result<DirectoryRow> {
    Ok(DirectoryRow {
        id: row.get(0)?,
        name: row.get(1)?,
        path: row.get(2)?,
        parent_id: row.get(3)?,
        last_modified: row.get(4)?,
        last_scanned: row.get(5)?,
        media_count: row.get(6)?,
        preview_id: row.get(7)?,
    })
}

/// Case-sensitive lookup by identity.
pub fn find(conn: &Connection, name: &str, path: &str) -> Result<Option<DirectoryRow>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {COLUMNS} FROM directories \
                 WHERE name = ?1 COLLATE BINARY AND path = ?2 COLLATE BINARY"
            ),
            params![name, path],
            from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn get(conn: &Connection, id: i64) -> Result<Option<DirectoryRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM directories WHERE id = ?"),
            [id],
            from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn insert(
    conn: &Connection,
    name: &str,
    path: &str,
    parent_id: Option<i64>,
    last_modified: i64,
    last_scanned: Option<i64>,
) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO directories (name, path, parent_id, last_modified, last_scanned)
        VALUES (?, ?, ?, ?, ?)
        "#,
        params![name, path, parent_id, last_modified, last_scanned],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Refresh the timestamps of a directory whose content was rescanned.
pub fn update_scan(
    conn: &Connection,
    id: i64,
    last_modified: i64,
    last_scanned: Option<i64>,
) -> Result<()> {
    conn.execute(
        "UPDATE directories SET last_modified = ?, last_scanned = ? WHERE id = ?",
        params![last_modified, last_scanned, id],
    )?;
    Ok(())
}

pub fn set_parent(conn: &Connection, id: i64, parent_id: Option<i64>) -> Result<()> {
    conn.execute(
        "UPDATE directories SET parent_id = ? WHERE id = ?",
        params![parent_id, id],
    )?;
    Ok(())
}

pub fn set_preview(conn: &Connection, id: i64, preview_id: Option<i64>) -> Result<()> {
    conn.execute(
        "UPDATE directories SET preview_id = ? WHERE id = ?",
        params![preview_id, id],
    )?;
    Ok(())
}

pub fn set_media_count(conn: &Connection, id: i64, media_count: u32) -> Result<()> {
    conn.execute(
        "UPDATE directories SET media_count = ? WHERE id = ?",
        params![media_count, id],
    )?;
    Ok(())
}

/// Deletes the directory; sub-directories, media and meta files cascade.
pub fn delete(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM directories WHERE id = ?", [id])?;
    Ok(())
}

/// `(id, name)` of every directory stored at `path` apart from `exclude`,
/// oldest first. Includes orphans that were saved before their parent.
pub fn list_at_path(conn: &Connection, path: &str, exclude: i64) -> Result<Vec<(i64, String)>> {
    let mut stmt = conn.prepare(
        "SELECT id, name FROM directories WHERE path = ? COLLATE BINARY AND id != ? ORDER BY id",
    )?;
    let rows = stmt
        .query_map(params![path, exclude], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Linked children of a directory, ordered by name.
pub fn children(conn: &Connection, parent_id: i64) -> Result<Vec<DirectoryRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM directories WHERE parent_id = ? ORDER BY name COLLATE BINARY"
    ))?;
    let rows = stmt
        .query_map([parent_id], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Preview of the first child, by name, that has one.
pub fn first_child_preview(conn: &Connection, parent_id: i64) -> Result<Option<i64>> {
    let preview = conn
        .query_row(
            r#"
            SELECT preview_id FROM directories
            WHERE parent_id = ? AND preview_id IS NOT NULL
            ORDER BY name COLLATE BINARY
            LIMIT 1
            "#,
            [parent_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(preview)
}

pub fn count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM directories", [], |row| row.get(0))?;
    Ok(count)
}
