//! Reconciles a scanned directory tree with the stored index.
//!
//! Every function here runs inside the caller's transaction. Names are
//! compared byte-for-byte in Rust and with `COLLATE BINARY` in SQL, so
//! `Test.jpg` and `test.jpg` are two different entries.

use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashSet;

use super::preview;
use crate::db::{directories, media, meta_files};
use crate::error::{EntryKind, IndexError, Result};
use crate::model::{parent_location, path_from_parent, Directory, Media, MetaFile};

#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    /// Reconcile meta files. When off, stored meta files are left alone.
    pub index_meta_files: bool,
}

/// Row changes made by one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub directories_inserted: usize,
    pub directories_updated: usize,
    pub directories_removed: usize,
    pub media_inserted: usize,
    pub media_updated: usize,
    pub media_removed: usize,
    pub meta_files_inserted: usize,
    pub meta_files_updated: usize,
    pub meta_files_removed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Row id of the merged tree's root directory.
    pub directory_id: i64,
    pub stats: MergeStats,
}

/// Make storage match `scanned` and everything materialized below it.
pub fn save_directory(
    conn: &Connection,
    scanned: &Directory,
    options: MergeOptions,
) -> Result<MergeOutcome> {
    validate(scanned, &scanned.path)?;

    // A parent that is already indexed adopts the tree; otherwise the tree is
    // stored as an orphan until its parent is merged.
    let parent_id = if scanned.is_root() {
        None
    } else {
        match parent_location(&scanned.path) {
            Some((name, path)) => directories::find(conn, &name, &path)?.map(|row| row.id),
            None => None,
        }
    };

    let mut stats = MergeStats::default();
    let directory_id = merge_node(conn, scanned, &scanned.path, parent_id, options, &mut stats)?;
    preview::refresh_ancestors(conn, parent_id)?;

    Ok(MergeOutcome {
        directory_id,
        stats,
    })
}

/// Reject trees where siblings share a name. Runs before any write.
pub fn validate(dir: &Directory, path: &str) -> Result<()> {
    let Some(children) = dir.children() else {
        return Ok(());
    };
    let here = path_from_parent(path, &dir.name);

    ensure_unique(
        children.directories.iter().map(|d| d.name.as_str()),
        EntryKind::Directory,
        &here,
    )?;
    ensure_unique(children.media.iter().map(|m| m.name.as_str()), EntryKind::Media, &here)?;
    ensure_unique(
        children.meta_files.iter().map(|f| f.name.as_str()),
        EntryKind::MetaFile,
        &here,
    )?;

    for child in &children.directories {
        validate(child, &here)?;
    }
    Ok(())
}

fn ensure_unique<'a>(
    names: impl Iterator<Item = &'a str>,
    kind: EntryKind,
    path: &str,
) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(IndexError::IdentityConflict {
                kind,
                path: path.to_string(),
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn merge_node(
    conn: &Connection,
    dir: &Directory,
    path: &str,
    parent_id: Option<i64>,
    options: MergeOptions,
    stats: &mut MergeStats,
) -> Result<i64> {
    let children = dir.children();

    let id = match directories::find(conn, &dir.name, path)? {
        Some(row) => {
            if row.parent_id != parent_id {
                directories::set_parent(conn, row.id, parent_id)?;
            }
            // A partial entry says nothing about the folder's content, so the
            // stored scan state stays as it is.
            if children.is_some() {
                directories::update_scan(conn, row.id, dir.last_modified, dir.last_scanned)?;
                stats.directories_updated += 1;
            }
            row.id
        }
        None => {
            let last_scanned = children.and(dir.last_scanned);
            stats.directories_inserted += 1;
            directories::insert(conn, &dir.name, path, parent_id, dir.last_modified, last_scanned)?
        }
    };

    let Some(children) = children else {
        return Ok(id);
    };

    merge_media(conn, id, &children.media, stats)?;
    if options.index_meta_files {
        merge_meta_files(conn, id, &children.meta_files, stats)?;
    }

    let child_path = path_from_parent(path, &dir.name);
    let scanned_names: HashSet<&str> =
        children.directories.iter().map(|d| d.name.as_str()).collect();
    for (stale_id, name) in directories::list_at_path(conn, &child_path, id)? {
        if !scanned_names.contains(name.as_str()) {
            tracing::debug!(path = %child_path, name = %name, "removing stale directory");
            directories::delete(conn, stale_id)?;
            stats.directories_removed += 1;
        }
    }
    for child in &children.directories {
        merge_node(conn, child, &child_path, Some(id), options, stats)?;
    }

    directories::set_media_count(conn, id, children.media.len() as u32)?;
    preview::refresh(conn, id)?;
    Ok(id)
}

fn merge_media(
    conn: &Connection,
    directory_id: i64,
    scanned: &[Media],
    stats: &mut MergeStats,
) -> Result<()> {
    let (mut stored, duplicates) = media::ids_by_name(conn, directory_id)?;
    for id in duplicates {
        media::delete(conn, id)?;
        stats.media_removed += 1;
    }

    for item in scanned {
        match stored.remove(&item.name) {
            Some(id) => {
                media::update(conn, id, item)?;
                stats.media_updated += 1;
            }
            None => {
                media::insert(conn, directory_id, item)?;
                stats.media_inserted += 1;
            }
        }
    }

    for (_, stale_id) in stored {
        media::delete(conn, stale_id)?;
        stats.media_removed += 1;
    }
    Ok(())
}

fn merge_meta_files(
    conn: &Connection,
    directory_id: i64,
    scanned: &[MetaFile],
    stats: &mut MergeStats,
) -> Result<()> {
    let (mut stored, duplicates) = meta_files::ids_by_name(conn, directory_id)?;
    for id in duplicates {
        meta_files::delete(conn, id)?;
        stats.meta_files_removed += 1;
    }

    for file in scanned {
        match stored.remove(&file.name) {
            Some(id) => {
                meta_files::update(conn, id, file)?;
                stats.meta_files_updated += 1;
            }
            None => {
                meta_files::insert(conn, directory_id, file)?;
                stats.meta_files_inserted += 1;
            }
        }
    }

    for (_, stale_id) in stored {
        meta_files::delete(conn, stale_id)?;
        stats.meta_files_removed += 1;
    }
    Ok(())
}
