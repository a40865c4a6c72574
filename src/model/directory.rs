use serde::{Deserialize, Serialize};

use super::{Media, MetaFile};

/// Name of the directory at the top of the media folder.
pub const ROOT_NAME: &str = ".";

/// Path of the root directory, and of every direct child of the root.
pub const ROOT_PATH: &str = "./";

/// A directory of the gallery, either fully materialized or as a partial
/// placeholder that only carries aggregate data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub path: String,
    /// Milliseconds since the epoch, max(ctime, mtime) of the folder on disk.
    pub last_modified: i64,
    /// When the folder's own content was last read from disk. `None` for
    /// folders only seen as a child of a scanned folder.
    #[serde(default)]
    pub last_scanned: Option<i64>,
    #[serde(default)]
    pub media_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<Media>,
    #[serde(flatten)]
    pub contents: DirectoryContents,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum DirectoryContents {
    Full(DirectoryChildren),
    Partial,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryChildren {
    #[serde(default)]
    pub directories: Vec<Directory>,
    #[serde(default)]
    pub media: Vec<Media>,
    #[serde(default)]
    pub meta_files: Vec<MetaFile>,
}

impl Directory {
    /// An empty, fully materialized directory.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            path: path.into(),
            last_modified: 0,
            last_scanned: None,
            media_count: 0,
            preview: None,
            contents: DirectoryContents::Full(DirectoryChildren::default()),
        }
    }

    /// The root of the media folder.
    pub fn root() -> Self {
        Self::new(ROOT_NAME, ROOT_PATH)
    }

    pub fn is_root(&self) -> bool {
        self.name == ROOT_NAME
    }

    pub fn is_partial(&self) -> bool {
        matches!(self.contents, DirectoryContents::Partial)
    }

    pub fn children(&self) -> Option<&DirectoryChildren> {
        match &self.contents {
            DirectoryContents::Full(children) => Some(children),
            DirectoryContents::Partial => None,
        }
    }

    /// Mutable access to the children, materializing an empty set for a
    /// partial directory.
    pub fn children_mut(&mut self) -> &mut DirectoryChildren {
        if self.is_partial() {
            self.contents = DirectoryContents::Full(DirectoryChildren::default());
        }
        match &mut self.contents {
            DirectoryContents::Full(children) => children,
            DirectoryContents::Partial => unreachable!("contents were just materialized"),
        }
    }

    /// Path that every direct child of this directory carries.
    pub fn child_path(&self) -> String {
        path_from_parent(&self.path, &self.name)
    }

    /// Key of the path lineage this directory roots. Two merges overlap when
    /// one key is a prefix of the other.
    pub fn lineage_key(&self) -> String {
        self.child_path()
    }

    /// Relative location of the directory below the media folder.
    pub fn relative_path(&self) -> String {
        let child_path = self.child_path();
        let trimmed = child_path.trim_start_matches(ROOT_PATH).trim_end_matches('/');
        if trimmed.is_empty() {
            ROOT_NAME.to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Drop the nested content and keep the aggregate fields. A missing
    /// preview falls back to the first direct media.
    pub fn into_partial(mut self) -> Self {
        if self.preview.is_none() {
            if let Some(children) = self.children() {
                self.preview = children.media.first().cloned();
            }
        }
        self.contents = DirectoryContents::Partial;
        self
    }

    /// Depth-first visit of this directory and all materialized descendants.
    pub fn walk(&self, visit: &mut impl FnMut(&Directory)) {
        visit(self);
        if let Some(children) = self.children() {
            for child in &children.directories {
                child.walk(visit);
            }
        }
    }
}

/// Path carried by the children of the directory `(parent_name, parent_path)`.
pub fn path_from_parent(parent_path: &str, parent_name: &str) -> String {
    if parent_name == ROOT_NAME {
        parent_path.to_string()
    } else {
        format!("{}{}/", parent_path, parent_name)
    }
}

/// `(name, path)` of the directory whose children carry `path`. Inverse of
/// [`path_from_parent`].
pub fn parent_location(path: &str) -> Option<(String, String)> {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return None;
    }
    if trimmed == ROOT_NAME {
        return Some((ROOT_NAME.to_string(), ROOT_PATH.to_string()));
    }
    match trimmed.rfind('/') {
        Some(idx) => {
            let name = &trimmed[idx + 1..];
            let parent_path = &trimmed[..=idx];
            Some((name.to_string(), parent_path.to_string()))
        }
        None => Some((trimmed.to_string(), String::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_from_parent() {
        assert_eq!(path_from_parent(ROOT_PATH, ROOT_NAME), "./");
        assert_eq!(path_from_parent("./", "holiday"), "./holiday/");
        assert_eq!(path_from_parent("./holiday/", "day1"), "./holiday/day1/");
    }

    #[test]
    fn test_parent_location_inverts_path_from_parent() {
        for (path, name) in [("./", "holiday"), ("./holiday/", "day1"), ("album/", "x")] {
            let child_path = path_from_parent(path, name);
            assert_eq!(
                parent_location(&child_path),
                Some((name.to_string(), path.to_string()))
            );
        }
        assert_eq!(
            parent_location(ROOT_PATH),
            Some((ROOT_NAME.to_string(), ROOT_PATH.to_string()))
        );
        assert_eq!(parent_location(""), None);
    }

    #[test]
    fn test_into_partial_keeps_first_media_as_preview() {
        let mut dir = Directory::new("trip", "./");
        dir.children_mut()
            .media
            .push(Media::photo("a.jpg"));
        let partial = dir.into_partial();
        assert!(partial.is_partial());
        assert_eq!(partial.preview.map(|m| m.name), Some("a.jpg".to_string()));
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(Directory::root().relative_path(), ".");
        assert_eq!(Directory::new("day1", "./holiday/").relative_path(), "holiday/day1");
    }
}
