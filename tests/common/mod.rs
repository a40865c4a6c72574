//! Builders and helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use galdex::db::Database;
use galdex::model::{
    CameraData, Dimensions, Directory, DirectoryContents, FaceBox, FaceRegion, GpsData, Media,
    MetaFile, PositionData,
};
use galdex::{Config, GalleryManager, IndexingManager};

pub struct Harness {
    pub db: Arc<Database>,
    pub indexing: IndexingManager,
    pub gallery: GalleryManager,
}

impl Harness {
    /// Fresh in-memory index.
    pub fn new(config: Config) -> Self {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        Self::sharing(Arc::new(db), config)
    }

    /// Another view of an existing index, e.g. with different settings.
    pub fn sharing(db: Arc<Database>, config: Config) -> Self {
        let indexing = IndexingManager::new(Arc::clone(&db), Arc::new(config));
        let gallery = GalleryManager::new(indexing.clone());
        Self {
            db,
            indexing,
            gallery,
        }
    }

    /// Select and fill `dir`'s stored counterpart with ids stripped.
    pub async fn select(&self, dir: &Directory) -> Option<Directory> {
        let mut selected = self.gallery.get_directory(&dir.name, &dir.path).await.unwrap()?;
        strip_ids(&mut selected);
        Some(selected)
    }
}

pub fn config(meta_files: bool) -> Config {
    let mut config = Config::default();
    config.meta_file.enabled = meta_files;
    config
}

pub fn directory(name: &str, path: &str) -> Directory {
    let mut dir = Directory::new(name, path);
    dir.last_modified = 1_600_000_000_000 + name.len() as i64;
    dir.last_scanned = Some(1_600_000_100_000);
    dir
}

pub fn sub_directory(parent: &Directory, name: &str) -> Directory {
    directory(name, &parent.child_path())
}

/// A photo with every metadata block filled in. `seed` varies the values.
pub fn photo(name: &str, seed: u32) -> Media {
    let mut photo = Media::photo(name);
    let meta = &mut photo.metadata;
    meta.size = Dimensions {
        width: 4000 + seed,
        height: 3000 + seed,
    };
    meta.creation_date = 1_500_000_000_000 + seed as i64 * 1000;
    meta.file_size = 2_000_000 + seed as u64;
    meta.caption = Some(format!("caption {seed}"));
    meta.keywords = vec!["sea".to_string(), format!("kw{seed}")];
    meta.rating = Some((seed % 5) as u8);
    meta.orientation = Some(1);
    meta.camera = Some(CameraData {
        iso: Some(100 + seed),
        make: Some("Fujifilm".to_string()),
        model: Some("X-T4".to_string()),
        lens: Some("XF23mm".to_string()),
        f_stop: Some(2.8),
        exposure: Some(1.0 / 250.0),
        focal_length: Some(23.0),
    });
    meta.position = Some(PositionData {
        gps: Some(GpsData {
            latitude: Some(47.5 + seed as f64),
            longitude: Some(19.04),
            altitude: Some(120),
        }),
        country: Some("Hungary".to_string()),
        state: None,
        city: Some("Budapest".to_string()),
    });
    meta.faces = vec![FaceRegion {
        name: format!("Person {seed}"),
        bbox: FaceBox {
            left: 10,
            top: 20,
            width: 30 + seed,
            height: 40,
        },
    }];
    photo
}

pub fn gpx(name: &str) -> Media {
    let mut track = Media::gpx(name);
    track.metadata.file_size = 4096;
    track.metadata.creation_date = 1_500_000_000_000;
    track
}

pub fn meta_file(name: &str) -> MetaFile {
    MetaFile::new(name, 128)
}

pub fn strip_ids(dir: &mut Directory) {
    dir.id = None;
    if let Some(preview) = dir.preview.as_mut() {
        preview.id = None;
    }
    if let DirectoryContents::Full(children) = &mut dir.contents {
        children.media.iter_mut().for_each(|m| m.id = None);
        children.meta_files.iter_mut().for_each(|f| f.id = None);
        children.directories.iter_mut().for_each(strip_ids);
    }
}

/// First media by name, else the first child's preview by name.
pub fn expected_preview(dir: &Directory) -> Option<Media> {
    let children = dir.children()?;
    if let Some(first) = children.media.iter().min_by(|a, b| a.name.cmp(&b.name)) {
        return Some(first.clone());
    }
    let mut subdirs: Vec<&Directory> = children.directories.iter().collect();
    subdirs.sort_by(|a, b| a.name.cmp(&b.name));
    subdirs.into_iter().find_map(expected_preview)
}

/// How the gallery should return `tree` once it is saved: content sorted by
/// name, sub-directories partial, previews computed.
pub fn expected_view(tree: &Directory, with_meta_files: bool) -> Directory {
    let mut view = tree.clone();
    view.id = None;
    view.preview = expected_preview(tree);

    let children = view.children_mut();
    children.directories = children.directories.iter().map(expected_partial).collect();
    children.directories.sort_by(|a, b| a.name.cmp(&b.name));
    children.media.sort_by(|a, b| a.name.cmp(&b.name));
    children.meta_files.sort_by(|a, b| a.name.cmp(&b.name));
    if !with_meta_files {
        children.meta_files.clear();
    }
    let media_count = children.media.len() as u32;
    view.media_count = media_count;
    view
}

fn expected_partial(dir: &Directory) -> Directory {
    Directory {
        id: None,
        name: dir.name.clone(),
        path: dir.path.clone(),
        last_modified: dir.last_modified,
        last_scanned: dir.last_scanned,
        media_count: dir.children().map_or(0, |c| c.media.len() as u32),
        preview: expected_preview(dir),
        contents: DirectoryContents::Partial,
    }
}
