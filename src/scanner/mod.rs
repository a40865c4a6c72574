//! Reads folders of the media root into [`Directory`] trees.

pub mod discovery;
pub mod metadata;

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::ScannerConfig;
use crate::model::{Directory, MetaFile, ROOT_NAME, ROOT_PATH};

pub use discovery::{classify, list_folder, Entry, FileClass};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{0:?} is outside the media folder")]
    OutsideMediaFolder(String),

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Segments of a relative directory path. `""`, `"."` and `"./"` are the
/// root.
fn segments(relative: &str) -> Result<Vec<&str>, ScanError> {
    let mut parts = Vec::new();
    for part in relative.split('/') {
        match part {
            "" | "." => {}
            ".." => return Err(ScanError::OutsideMediaFolder(relative.to_string())),
            part => parts.push(part),
        }
    }
    Ok(parts)
}

/// Stored `(name, path)` of the directory at `relative`.
pub fn location(relative: &str) -> Result<(String, String), ScanError> {
    let parts = segments(relative)?;
    match parts.split_last() {
        None => Ok((ROOT_NAME.to_string(), ROOT_PATH.to_string())),
        Some((name, parents)) => {
            let mut path = ROOT_PATH.to_string();
            for parent in parents {
                path.push_str(parent);
                path.push('/');
            }
            Ok((name.to_string(), path))
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub struct Scanner {
    media_root: PathBuf,
    config: ScannerConfig,
}

impl Scanner {
    pub fn new(media_root: PathBuf, config: ScannerConfig) -> Self {
        Self { media_root, config }
    }

    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    /// Location of `relative` on disk.
    pub fn folder_path(&self, relative: &str) -> Result<PathBuf, ScanError> {
        let mut folder = self.media_root.clone();
        folder.extend(segments(relative)?);
        Ok(folder)
    }

    /// Modification time of the folder on disk, as stored in
    /// `Directory::last_modified`.
    pub fn last_modified(&self, relative: &str) -> Result<i64, ScanError> {
        metadata::last_modified(&self.folder_path(relative)?)
    }

    /// Read the folder at `relative`. Sub-folders come back partial unless
    /// `deep` is set, in which case the whole subtree is read.
    pub fn scan_directory(&self, relative: &str, deep: bool) -> Result<Directory, ScanError> {
        let (name, path) = location(relative)?;
        let folder = self.folder_path(relative)?;
        if !folder.is_dir() {
            return Err(ScanError::NotADirectory(folder));
        }
        self.scan_folder(&folder, name, path, deep)
    }

    fn scan_folder(
        &self,
        folder: &Path,
        name: String,
        path: String,
        deep: bool,
    ) -> Result<Directory, ScanError> {
        let mut dir = Directory::new(name, path);
        dir.last_modified = metadata::last_modified(folder)?;
        dir.last_scanned = Some(now_millis());
        let child_path = dir.child_path();

        let mut directories = Vec::new();
        let mut media = Vec::new();
        let mut meta_files = Vec::new();

        for entry in list_folder(folder, &self.config) {
            match entry {
                Entry::Directory { name, path } => {
                    let child = if deep {
                        match self.scan_folder(&path, name.clone(), child_path.clone(), true) {
                            Ok(child) => child,
                            Err(e) => {
                                tracing::warn!(path = %path.display(), error = %e, "scanning sub-folder failed");
                                self.partial_child(&path, name, &child_path)
                            }
                        }
                    } else {
                        self.partial_child(&path, name, &child_path)
                    };
                    directories.push(child);
                }
                Entry::Media { name, path, kind } => match metadata::read_media(&path, name, kind) {
                    Ok(item) => media.push(item),
                    Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping media"),
                },
                Entry::MetaFile { name, path } => match metadata::file_size(&path) {
                    Ok(size) => meta_files.push(MetaFile::new(name, size)),
                    Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping meta file"),
                },
            }
        }

        dir.media_count = media.len() as u32;
        let children = dir.children_mut();
        children.directories = directories;
        children.media = media;
        children.meta_files = meta_files;

        tracing::debug!(
            folder = %folder.display(),
            directories = children.directories.len(),
            media = children.media.len(),
            "scanned folder"
        );
        Ok(dir)
    }

    fn partial_child(&self, folder: &Path, name: String, path: &str) -> Directory {
        let mut child = Directory::new(name, path);
        child.last_modified = metadata::last_modified(folder).unwrap_or(0);
        child.into_partial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MediaKind;
    use std::fs::{self, File};
    use tempfile::tempdir;

    fn media_folder() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("a.jpg")).unwrap();
        File::create(dir.path().join("track.gpx")).unwrap();
        fs::write(dir.path().join(".saved_searches.pg2conf"), "[]").unwrap();
        fs::create_dir_all(dir.path().join("trip/day1")).unwrap();
        File::create(dir.path().join("trip/b.jpg")).unwrap();
        File::create(dir.path().join("trip/day1/c.mp4")).unwrap();
        dir
    }

    #[test]
    fn test_location() {
        assert_eq!(location("").unwrap(), (".".to_string(), "./".to_string()));
        assert_eq!(location("./").unwrap(), (".".to_string(), "./".to_string()));
        assert_eq!(location("trip").unwrap(), ("trip".to_string(), "./".to_string()));
        assert_eq!(
            location("trip/day1/").unwrap(),
            ("day1".to_string(), "./trip/".to_string())
        );
        assert!(matches!(location("../etc"), Err(ScanError::OutsideMediaFolder(_))));
    }

    #[test]
    fn test_shallow_scan_returns_partial_children() {
        let root = media_folder();
        let scanner = Scanner::new(root.path().to_path_buf(), ScannerConfig::default());

        let dir = scanner.scan_directory(".", false).unwrap();
        assert!(dir.is_root());
        assert!(dir.last_scanned.is_some());
        assert_eq!(dir.media_count, 2);

        let children = dir.children().unwrap();
        let kinds: Vec<MediaKind> = children.media.iter().map(|m| m.kind).collect();
        assert_eq!(kinds, vec![MediaKind::Photo, MediaKind::Gpx]);
        assert_eq!(children.meta_files.len(), 1);
        assert!(children.meta_files[0].is_saved_searches());

        assert_eq!(children.directories.len(), 1);
        let trip = &children.directories[0];
        assert_eq!((trip.name.as_str(), trip.path.as_str()), ("trip", "./"));
        assert!(trip.is_partial());
        assert!(trip.last_scanned.is_none());
    }

    #[test]
    fn test_deep_scan_reads_the_subtree() {
        let root = media_folder();
        let scanner = Scanner::new(root.path().to_path_buf(), ScannerConfig::default());

        let trip = scanner.scan_directory("trip", true).unwrap();
        assert_eq!(trip.path, "./");
        let day1 = &trip.children().unwrap().directories[0];
        assert_eq!(day1.path, "./trip/");
        assert_eq!(day1.children().unwrap().media[0].name, "c.mp4");
    }

    #[test]
    fn test_missing_folder() {
        let root = tempdir().unwrap();
        let scanner = Scanner::new(root.path().to_path_buf(), ScannerConfig::default());
        assert!(matches!(
            scanner.scan_directory("nope", false),
            Err(ScanError::NotADirectory(_))
        ));
    }
}
