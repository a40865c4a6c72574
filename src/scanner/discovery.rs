use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ScannerConfig;
use crate::model::MediaKind;

/// One indexable entry of a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Directory { name: String, path: PathBuf },
    Media { name: String, path: PathBuf, kind: MediaKind },
    MetaFile { name: String, path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    Media(MediaKind),
    MetaFile,
}

/// Classify a file by name. Meta file suffixes are checked first so a
/// sidecar never turns into media.
pub fn classify(name: &str, config: &ScannerConfig) -> Option<FileClass> {
    let lower = name.to_lowercase();
    if config
        .meta_suffixes
        .iter()
        .any(|suffix| lower.ends_with(&suffix.to_lowercase()))
    {
        return Some(FileClass::MetaFile);
    }

    if name.starts_with('.') {
        return None;
    }
    let ext = Path::new(&lower).extension()?.to_str()?;
    let matches = |list: &[String]| list.iter().any(|e| e.to_lowercase() == ext);

    if matches(&config.photo_extensions) {
        Some(FileClass::Media(MediaKind::Photo))
    } else if matches(&config.video_extensions) {
        Some(FileClass::Media(MediaKind::Video))
    } else if matches(&config.gpx_extensions) {
        Some(FileClass::Media(MediaKind::Gpx))
    } else {
        None
    }
}

/// Direct entries of `folder`, sorted by file name. Unreadable entries,
/// hidden folders and names that are not valid UTF-8 are skipped.
pub fn list_folder(folder: &Path, config: &ScannerConfig) -> Vec<Entry> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .follow_links(config.follow_links)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(folder = %folder.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };

        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            tracing::warn!(path = %entry.path().display(), "skipping non UTF-8 file name");
            continue;
        };
        let path = entry.path().to_path_buf();
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if !name.starts_with('.') {
                entries.push(Entry::Directory { name, path });
            }
        } else if file_type.is_file() {
            match classify(&name, config) {
                Some(FileClass::Media(kind)) => entries.push(Entry::Media { name, path, kind }),
                Some(FileClass::MetaFile) => entries.push(Entry::MetaFile { name, path }),
                None => {}
            }
        }
    }

    entries
}
