//! Meta file rows.

use rusqlite::{params, Connection};
use std::collections::HashMap;

use crate::error::Result;
use crate::model::MetaFile;

pub fn insert(conn: &Connection, directory_id: i64, file: &MetaFile) -> Result<i64> {
    conn.execute(
        "INSERT INTO meta_files (directory_id, name, file_size) VALUES (?, ?, ?)",
        params![directory_id, file.name, file.file_size as i64],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update(conn: &Connection, id: i64, file: &MetaFile) -> Result<()> {
    conn.execute(
        "UPDATE meta_files SET file_size = ? WHERE id = ?",
        params![file.file_size as i64, id],
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM meta_files WHERE id = ?", [id])?;
    Ok(())
}

/// Stored meta files of a directory keyed by exact name, see
/// [`crate::db::media::ids_by_name`].
pub fn ids_by_name(conn: &Connection, directory_id: i64) -> Result<(HashMap<String, i64>, Vec<i64>)> {
    let mut stmt =
        conn.prepare("SELECT id, name FROM meta_files WHERE directory_id = ? ORDER BY id")?;
    let rows = stmt
        .query_map([directory_id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut by_name = HashMap::with_capacity(rows.len());
    let mut duplicates = Vec::new();
    for (id, name) in rows {
        if by_name.contains_key(&name) {
            duplicates.push(id);
        } else {
            by_name.insert(name, id);
        }
    }
    Ok((by_name, duplicates))
}

pub fn for_directory(conn: &Connection, directory_id: i64) -> Result<Vec<MetaFile>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, file_size FROM meta_files WHERE directory_id = ? ORDER BY name COLLATE BINARY",
    )?;
    let files = stmt
        .query_map([directory_id], |row| {
            let file_size: i64 = row.get(2)?;
            Ok(MetaFile {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                file_size: file_size.max(0) as u64,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(files)
}
