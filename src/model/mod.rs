//! In-memory directory tree shared by the scanner, the merge engine and the
//! read path.

pub mod directory;
pub mod media;
pub mod meta_file;
pub mod pack;

pub use directory::{
    parent_location, path_from_parent, Directory, DirectoryChildren, DirectoryContents,
    ROOT_NAME, ROOT_PATH,
};
pub use media::{
    CameraData, Dimensions, FaceBox, FaceRegion, GpsData, Media, MediaKind, MediaMetadata,
    PositionData,
};
pub use meta_file::{MetaFile, SAVED_SEARCHES_FILE};
pub use pack::{
    Pack, PackError, PackedDirectory, PackedMedia, PackedMetaFile, PackedTree, PreviewRef, Unpack,
};
