//! Conversion between the nested directory tree and a flat, parent-pointer
//! form that maps one-to-one onto storage rows.
//!
//! Packing derives every directory's `path` from its ancestor chain and turns
//! parent and preview links into indices. Both directions are idempotent:
//! packing a [`PackedTree`] and unpacking a [`Directory`] return the input.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{path_from_parent, Directory, DirectoryChildren, DirectoryContents, Media, MetaFile};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PackError {
    #[error("packed tree has no directories")]
    Empty,
    #[error("directory #{0} is not the root but has no parent")]
    DetachedDirectory(usize),
    #[error("directory #{index} points at parent #{parent}, which does not precede it")]
    ForwardParent { index: usize, parent: usize },
    #[error("{kind} row points at missing directory #{directory}")]
    DanglingDirectory { kind: &'static str, directory: usize },
    #[error("partial directory #{0} owns media or meta files")]
    PartialWithContent(usize),
    #[error("preview of directory #{directory} points at missing media #{media}")]
    DanglingPreview { directory: usize, media: usize },
}

/// Flat form of a directory tree. `directories[0]` is the root of the tree
/// and every parent precedes its children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackedTree {
    pub directories: Vec<PackedDirectory>,
    pub media: Vec<PackedMedia>,
    pub meta_files: Vec<PackedMetaFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackedDirectory {
    pub id: Option<i64>,
    pub name: String,
    pub path: String,
    pub parent: Option<usize>,
    pub last_modified: i64,
    pub last_scanned: Option<i64>,
    pub media_count: u32,
    pub is_partial: bool,
    pub preview: Option<PreviewRef>,
}

/// Preview link of a packed directory. Previews of partial directories point
/// at media that is not part of the packed rows and travel detached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PreviewRef {
    Member(usize),
    Detached(Media),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackedMedia {
    pub directory: usize,
    pub media: Media,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackedMetaFile {
    pub directory: usize,
    pub file: MetaFile,
}

pub trait Pack {
    fn pack(self) -> PackedTree;
}

pub trait Unpack {
    fn unpack(self) -> Result<Directory, PackError>;
}

impl Pack for PackedTree {
    fn pack(self) -> PackedTree {
        self
    }
}

impl Pack for Directory {
    fn pack(self) -> PackedTree {
        let mut tree = PackedTree::default();
        let mut previews = Vec::new();
        pack_into(self, None, &mut tree, &mut previews);

        for (index, preview) in previews {
            let link = match tree.media.iter().position(|row| row.media == preview) {
                Some(media) => PreviewRef::Member(media),
                None => PreviewRef::Detached(preview),
            };
            tree.directories[index].preview = Some(link);
        }
        tree
    }
}

fn pack_into(
    dir: Directory,
    parent: Option<usize>,
    tree: &mut PackedTree,
    previews: &mut Vec<(usize, Media)>,
) {
    let index = tree.directories.len();
    let path = match parent {
        Some(parent) => {
            let parent = &tree.directories[parent];
            path_from_parent(&parent.path, &parent.name)
        }
        None => dir.path,
    };
    if let Some(preview) = dir.preview {
        previews.push((index, preview));
    }

    let (is_partial, children) = match dir.contents {
        DirectoryContents::Full(children) => (false, children),
        DirectoryContents::Partial => (true, DirectoryChildren::default()),
    };

    tree.directories.push(PackedDirectory {
        id: dir.id,
        name: dir.name,
        path,
        parent,
        last_modified: dir.last_modified,
        last_scanned: dir.last_scanned,
        media_count: dir.media_count,
        is_partial,
        preview: None,
    });
    tree.media.extend(
        children
            .media
            .into_iter()
            .map(|media| PackedMedia { directory: index, media }),
    );
    tree.meta_files.extend(
        children
            .meta_files
            .into_iter()
            .map(|file| PackedMetaFile { directory: index, file }),
    );
    for child in children.directories {
        pack_into(child, Some(index), tree, previews);
    }
}

impl Unpack for Directory {
    fn unpack(self) -> Result<Directory, PackError> {
        Ok(self)
    }
}

impl Unpack for PackedTree {
    fn unpack(self) -> Result<Directory, PackError> {
        if self.directories.is_empty() {
            return Err(PackError::Empty);
        }

        let count = self.directories.len();
        let mut child_index: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (index, dir) in self.directories.iter().enumerate() {
            match dir.parent {
                None if index == 0 => {}
                None => return Err(PackError::DetachedDirectory(index)),
                Some(parent) if parent >= index => {
                    return Err(PackError::ForwardParent { index, parent })
                }
                Some(parent) => child_index[parent].push(index),
            }
        }

        let mut media: Vec<Vec<Media>> = vec![Vec::new(); count];
        let mut all_media = Vec::with_capacity(self.media.len());
        for row in self.media {
            if row.directory >= count {
                return Err(PackError::DanglingDirectory {
                    kind: "media",
                    directory: row.directory,
                });
            }
            all_media.push(row.media.clone());
            media[row.directory].push(row.media);
        }

        let mut meta_files: Vec<Vec<MetaFile>> = vec![Vec::new(); count];
        for row in self.meta_files {
            if row.directory >= count {
                return Err(PackError::DanglingDirectory {
                    kind: "meta file",
                    directory: row.directory,
                });
            }
            meta_files[row.directory].push(row.file);
        }

        let mut built: Vec<Option<Directory>> = Vec::with_capacity(count);
        for (index, packed) in self.directories.into_iter().enumerate() {
            if packed.is_partial
                && (!media[index].is_empty() || !meta_files[index].is_empty())
            {
                return Err(PackError::PartialWithContent(index));
            }
            let preview = match packed.preview {
                Some(PreviewRef::Member(media)) => Some(
                    all_media
                        .get(media)
                        .cloned()
                        .ok_or(PackError::DanglingPreview { directory: index, media })?,
                ),
                Some(PreviewRef::Detached(media)) => Some(media),
                None => None,
            };
            let contents = if packed.is_partial {
                DirectoryContents::Partial
            } else {
                DirectoryContents::Full(DirectoryChildren {
                    directories: Vec::new(),
                    media: std::mem::take(&mut media[index]),
                    meta_files: std::mem::take(&mut meta_files[index]),
                })
            };
            built.push(Some(Directory {
                id: packed.id,
                name: packed.name,
                path: packed.path,
                last_modified: packed.last_modified,
                last_scanned: packed.last_scanned,
                media_count: packed.media_count,
                preview,
                contents,
            }));
        }

        // Children always follow their parent, so assembling from the back
        // finishes every subtree before its parent takes it.
        for index in (1..count).rev() {
            let children: Vec<Directory> = child_index[index]
                .iter()
                .filter_map(|&child| built[child].take())
                .collect();
            attach(&mut built, index, children);
        }
        let root_children: Vec<Directory> = child_index[0]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        attach(&mut built, 0, root_children);

        built[0].take().ok_or(PackError::Empty)
    }
}

fn attach(built: &mut [Option<Directory>], index: usize, children: Vec<Directory>) {
    if children.is_empty() {
        return;
    }
    if let Some(dir) = built[index].as_mut() {
        dir.children_mut().directories = children;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> Directory {
        let mut root = Directory::new("gallery", "./");
        let mut trip = Directory::new("trip", "stale/path/");
        trip.children_mut().media.push(Media::photo("beach.jpg"));
        trip.children_mut().meta_files.push(MetaFile::new("track.gpx", 12));
        let mut day = Directory::new("day1", "");
        day.children_mut().media.push(Media::video("clip.mp4"));
        trip.children_mut().directories.push(day);
        trip.preview = Some(Media::photo("beach.jpg"));

        let mut later = Directory::new("later", "./gallery/");
        later.preview = Some(Media::photo("elsewhere.jpg"));
        later.contents = DirectoryContents::Partial;

        root.children_mut().directories.push(trip);
        root.children_mut().directories.push(later);
        root
    }

    #[test]
    fn test_pack_derives_paths_from_ancestors() {
        let packed = sample_tree().pack();
        let paths: Vec<(&str, &str)> = packed
            .directories
            .iter()
            .map(|d| (d.name.as_str(), d.path.as_str()))
            .collect();
        assert_eq!(
            paths,
            vec![
                ("gallery", "./"),
                ("trip", "./gallery/"),
                ("day1", "./gallery/trip/"),
                ("later", "./gallery/"),
            ]
        );
        assert_eq!(packed.directories[2].parent, Some(1));
        assert_eq!(packed.media[0].directory, 1);
        assert_eq!(packed.meta_files[0].directory, 1);
    }

    #[test]
    fn test_pack_links_previews() {
        let packed = sample_tree().pack();
        assert_eq!(packed.directories[1].preview, Some(PreviewRef::Member(0)));
        assert!(matches!(
            packed.directories[3].preview,
            Some(PreviewRef::Detached(ref m)) if m.name == "elsewhere.jpg"
        ));
        assert!(packed.directories[3].is_partial);
    }

    #[test]
    fn test_unpack_rebuilds_nested_tree() {
        let packed = sample_tree().pack();
        let unpacked = packed.clone().unpack().unwrap();
        // Unpacking a packed tree and packing it again is stable.
        assert_eq!(unpacked.clone().pack(), packed);

        let root_children = unpacked.children().unwrap();
        assert_eq!(root_children.directories.len(), 2);
        let trip = &root_children.directories[0];
        assert_eq!(trip.path, "./gallery/");
        assert_eq!(trip.children().unwrap().directories[0].name, "day1");
        assert!(root_children.directories[1].is_partial());
    }

    #[test]
    fn test_pack_and_unpack_are_idempotent() {
        let packed = sample_tree().pack();
        assert_eq!(packed.clone().pack(), packed);

        let dir = sample_tree();
        assert_eq!(dir.clone().unpack().unwrap(), dir);
    }

    #[test]
    fn test_unpack_rejects_forward_parent() {
        let mut packed = sample_tree().pack();
        packed.directories[1].parent = Some(2);
        assert_eq!(
            packed.unpack(),
            Err(PackError::ForwardParent { index: 1, parent: 2 })
        );
    }

    #[test]
    fn test_unpack_rejects_content_in_partial_directory() {
        let mut packed = sample_tree().pack();
        packed.media[0].directory = 3;
        assert_eq!(packed.unpack(), Err(PackError::PartialWithContent(3)));
    }
}
