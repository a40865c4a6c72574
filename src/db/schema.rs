pub const SCHEMA: &str = r#"
-- Directories: one row per folder below the media root.
-- Identity columns use BINARY collation so that "Trip" and "trip" stay distinct.
CREATE TABLE IF NOT EXISTS directories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL COLLATE BINARY,
    path TEXT NOT NULL COLLATE BINARY,
    parent_id INTEGER,
    last_modified INTEGER NOT NULL,
    last_scanned INTEGER,           -- NULL until the folder's own content was read
    media_count INTEGER NOT NULL DEFAULT 0,
    preview_id INTEGER,             -- media of this subtree representing it
    UNIQUE (name, path),
    FOREIGN KEY (parent_id) REFERENCES directories(id) ON DELETE CASCADE,
    FOREIGN KEY (preview_id) REFERENCES media(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_directories_parent ON directories(parent_id);
CREATE INDEX IF NOT EXISTS idx_directories_path ON directories(path);

-- Media: photos, videos and GPS tracks
CREATE TABLE IF NOT EXISTS media (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    directory_id INTEGER NOT NULL,
    name TEXT NOT NULL COLLATE BINARY,
    kind TEXT NOT NULL,             -- 'photo', 'video', 'gpx'
    file_size INTEGER NOT NULL,
    width INTEGER NOT NULL,
    height INTEGER NOT NULL,
    creation_date INTEGER NOT NULL,

    -- Video
    duration INTEGER,
    bitrate INTEGER,
    fps INTEGER,

    caption TEXT,
    keywords TEXT,                  -- JSON array
    rating INTEGER,
    orientation INTEGER,

    -- Camera
    camera_make TEXT,
    camera_model TEXT,
    lens TEXT,
    iso INTEGER,
    f_stop REAL,
    exposure REAL,
    focal_length REAL,

    -- Position
    gps_latitude REAL,
    gps_longitude REAL,
    gps_altitude INTEGER,
    country TEXT,
    state TEXT,
    city TEXT,

    UNIQUE (directory_id, name),
    FOREIGN KEY (directory_id) REFERENCES directories(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_media_directory ON media(directory_id);

-- People named on face regions
CREATE TABLE IF NOT EXISTS persons (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE COLLATE BINARY
);

-- Face regions: named bounding boxes on photos
CREATE TABLE IF NOT EXISTS face_regions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    media_id INTEGER NOT NULL,
    person_id INTEGER NOT NULL,
    box_left INTEGER NOT NULL,
    box_top INTEGER NOT NULL,
    box_width INTEGER NOT NULL,
    box_height INTEGER NOT NULL,
    FOREIGN KEY (media_id) REFERENCES media(id) ON DELETE CASCADE,
    FOREIGN KEY (person_id) REFERENCES persons(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_face_regions_media ON face_regions(media_id);
CREATE INDEX IF NOT EXISTS idx_face_regions_person ON face_regions(person_id);

-- Sidecar files
CREATE TABLE IF NOT EXISTS meta_files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    directory_id INTEGER NOT NULL,
    name TEXT NOT NULL COLLATE BINARY,
    file_size INTEGER NOT NULL,
    UNIQUE (directory_id, name),
    FOREIGN KEY (directory_id) REFERENCES directories(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_meta_files_directory ON meta_files(directory_id);

-- Albums backed by a saved search
CREATE TABLE IF NOT EXISTS albums (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE COLLATE BINARY,
    locked INTEGER NOT NULL DEFAULT 0,  -- declared by a config file, not editable
    search_query TEXT NOT NULL          -- JSON
);
"#;

/// Statements applied after [`SCHEMA`] on every start; failures mean the
/// change is already present.
pub const MIGRATIONS: &[&str] = &[];
