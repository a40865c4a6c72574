//! The read side of the index.
//!
//! A directory is returned with its own media and meta files and with its
//! sub-directories as partial entries, so a front-end loads one level at a
//! time.

use rusqlite::Connection;
use serde::Serialize;
use std::sync::Arc;

use crate::config::{Config, ReIndexingSensitivity};
use crate::db::{directories, media, meta_files, Database};
use crate::error::Result;
use crate::indexing::IndexingManager;
use crate::model::{Directory, DirectoryChildren, DirectoryContents, Media};
use crate::scanner::{self, Scanner};

/// Case-sensitive lookup of a stored directory, returned partial.
pub fn select_parent_dir(conn: &Connection, name: &str, path: &str) -> Result<Option<Directory>> {
    let Some(row) = directories::find(conn, name, path)? else {
        return Ok(None);
    };
    let preview = load_media(conn, row.preview_id)?;
    let mut dir = row.into_directory();
    dir.preview = preview;
    Ok(Some(dir))
}

/// Load the content of `dir`: its media, its meta files when
/// `with_meta_files` is set, partial sub-directories and its preview.
/// A directory that is no longer stored ends up empty.
pub fn fill_parent_dir(conn: &Connection, dir: &mut Directory, with_meta_files: bool) -> Result<()> {
    let row = match dir.id {
        Some(id) => directories::get(conn, id)?,
        None => directories::find(conn, &dir.name, &dir.path)?,
    };
    let Some(row) = row else {
        dir.contents = DirectoryContents::Full(DirectoryChildren::default());
        return Ok(());
    };

    let mut children = Vec::new();
    for child in directories::children(conn, row.id)? {
        let preview = load_media(conn, child.preview_id)?;
        let mut partial = child.into_directory();
        partial.preview = preview;
        children.push(partial);
    }

    let media = media::for_directory(conn, row.id)?;
    let meta_files = if with_meta_files {
        meta_files::for_directory(conn, row.id)?
    } else {
        Vec::new()
    };

    dir.id = Some(row.id);
    dir.last_modified = row.last_modified;
    dir.last_scanned = row.last_scanned;
    dir.media_count = row.media_count;
    dir.preview = load_media(conn, row.preview_id)?;
    dir.contents = DirectoryContents::Full(DirectoryChildren {
        directories: children,
        media,
        meta_files,
    });
    Ok(())
}

fn load_media(conn: &Connection, id: Option<i64>) -> Result<Option<Media>> {
    match id {
        Some(id) => media::get(conn, id),
        None => Ok(None),
    }
}

/// Result of [`GalleryManager::list_directory`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "directory", rename_all = "lowercase")]
pub enum Listing {
    /// The folder was read from disk and indexed just now.
    Indexed(Directory),
    /// The caller's copy is still current.
    Unchanged,
    /// Served from the index.
    Cached(Directory),
}

#[derive(Clone)]
pub struct GalleryManager {
    indexing: IndexingManager,
}

impl GalleryManager {
    pub fn new(indexing: IndexingManager) -> Self {
        Self { indexing }
    }

    fn db(&self) -> Arc<Database> {
        Arc::clone(self.indexing.database())
    }

    fn config(&self) -> &Config {
        self.indexing.config()
    }

    pub async fn select_parent_dir(&self, name: &str, path: &str) -> Result<Option<Directory>> {
        let db = self.db();
        let (name, path) = (name.to_string(), path.to_string());
        tokio::task::spawn_blocking(move || db.read(|conn| select_parent_dir(conn, &name, &path)))
            .await?
    }

    /// Fill `dir` in place. Meta files are only returned while meta file
    /// indexing is enabled.
    pub async fn fill_parent_dir(&self, dir: &mut Directory) -> Result<()> {
        let db = self.db();
        let with_meta_files = self.config().meta_file.enabled;
        let mut target = dir.clone();
        let filled = tokio::task::spawn_blocking(move || {
            db.read(|conn| fill_parent_dir(conn, &mut target, with_meta_files))?;
            Ok::<_, crate::error::IndexError>(target)
        })
        .await??;
        *dir = filled;
        Ok(())
    }

    /// Select and fill in one step.
    pub async fn get_directory(&self, name: &str, path: &str) -> Result<Option<Directory>> {
        match self.select_parent_dir(name, path).await? {
            Some(mut dir) => {
                self.fill_parent_dir(&mut dir).await?;
                Ok(Some(dir))
            }
            None => Ok(None),
        }
    }

    /// Serve the folder at `relative`, from the index when it is still
    /// current and from disk otherwise.
    ///
    /// `known_last_modified` and `known_last_scanned` describe the copy the
    /// caller already holds, if any.
    pub async fn list_directory(
        &self,
        relative: &str,
        known_last_modified: Option<i64>,
        known_last_scanned: Option<i64>,
    ) -> Result<Listing> {
        let config = self.config();
        let scanner = Scanner::new(config.media.folder.clone(), config.scanner.clone());
        let last_modified = scanner.last_modified(relative)?;
        let (name, path) = scanner::location(relative)?;
        let stored = self.select_parent_dir(&name, &path).await?;

        let sensitivity = config.indexing.reindexing_sensitivity;
        let timeout_ms = (config.indexing.cached_folder_timeout_secs as i64).saturating_mul(1000);
        let now = chrono::Utc::now().timestamp_millis();

        let Some(mut dir) = stored else {
            return self.index_now(relative).await;
        };
        let Some(last_scanned) = dir.last_scanned else {
            return self.index_now(relative).await;
        };

        if known_last_scanned == Some(last_scanned) && known_last_modified == Some(last_modified) {
            match sensitivity {
                ReIndexingSensitivity::Low => return Ok(Listing::Unchanged),
                ReIndexingSensitivity::Medium if now - last_scanned <= timeout_ms => {
                    return Ok(Listing::Unchanged)
                }
                _ => {}
            }
        }

        if dir.last_modified != last_modified {
            return self.index_now(relative).await;
        }

        let stale = match sensitivity {
            ReIndexingSensitivity::Low => false,
            ReIndexingSensitivity::Medium => now - last_scanned > timeout_ms,
            ReIndexingSensitivity::High => true,
        };
        if stale {
            self.index_in_background(relative);
        }

        self.fill_parent_dir(&mut dir).await?;
        Ok(Listing::Cached(dir))
    }

    async fn index_now(&self, relative: &str) -> Result<Listing> {
        let tree = self.indexing.index_directory(relative, false).await?;
        Ok(Listing::Indexed(tree))
    }

    fn index_in_background(&self, relative: &str) {
        let indexing = self.indexing.clone();
        let relative = relative.to_string();
        tokio::spawn(async move {
            if let Err(e) = indexing.index_directory(&relative, false).await {
                tracing::warn!(path = %relative, error = %e, "background re-index failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::merge::{save_directory, MergeOptions};

    fn stored_tree(db: &Database, options: MergeOptions) {
        let mut dir = Directory::new("trip", "./");
        dir.last_modified = 3;
        dir.last_scanned = Some(4);
        dir.children_mut().media.push(Media::photo("b.jpg"));
        dir.children_mut().meta_files.push(crate::model::MetaFile::new("notes.md", 1));
        let mut child = Directory::new("day1", "");
        child.children_mut().media.push(Media::photo("a.jpg"));
        dir.children_mut().directories.push(child);
        db.transaction(|tx| save_directory(tx, &dir, options)).unwrap();
    }

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn test_select_missing_is_none() {
        let db = db();
        assert!(db.read(|conn| select_parent_dir(conn, "trip", "./")).unwrap().is_none());
    }

    #[test]
    fn test_fill_returns_partial_children() {
        let db = db();
        stored_tree(&db, MergeOptions { index_meta_files: true });

        let mut dir = db
            .read(|conn| select_parent_dir(conn, "trip", "./"))
            .unwrap()
            .unwrap();
        assert!(dir.is_partial());
        assert_eq!(dir.preview.as_ref().unwrap().name, "b.jpg");

        db.read(|conn| fill_parent_dir(conn, &mut dir, true)).unwrap();
        let children = dir.children().unwrap();
        assert_eq!(children.media.len(), 1);
        assert_eq!(children.meta_files.len(), 1);
        let day1 = &children.directories[0];
        assert!(day1.is_partial());
        assert_eq!(day1.path, "./trip/");
        assert_eq!(day1.preview.as_ref().unwrap().name, "a.jpg");
    }

    #[test]
    fn test_fill_hides_meta_files_when_disabled() {
        let db = db();
        stored_tree(&db, MergeOptions { index_meta_files: true });

        let mut dir = Directory::new("trip", "./");
        db.read(|conn| fill_parent_dir(conn, &mut dir, false)).unwrap();
        assert!(dir.children().unwrap().meta_files.is_empty());
        assert!(dir.id.is_some());
    }
}
