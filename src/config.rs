use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub meta_file: MetaFileConfig,

    #[serde(default)]
    pub album: AlbumConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub daemon: DaemonConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Folder whose tree is indexed. Directory paths are relative to it.
    #[serde(default = "default_media_folder")]
    pub folder: PathBuf,
}

fn default_media_folder() -> PathBuf {
    dirs::picture_dir().unwrap_or_else(|| PathBuf::from("."))
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            folder: default_media_folder(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_photo_extensions")]
    pub photo_extensions: Vec<String>,

    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,

    #[serde(default = "default_gpx_extensions")]
    pub gpx_extensions: Vec<String>,

    /// Sidecar files kept as meta files (matched against the full file name
    /// suffix, so `.saved_searches.pg2conf` works).
    #[serde(default = "default_meta_suffixes")]
    pub meta_suffixes: Vec<String>,

    #[serde(default)]
    pub follow_links: bool,
}

fn default_photo_extensions() -> Vec<String> {
    vec![
        "jpg".to_string(),
        "jpeg".to_string(),
        "png".to_string(),
        "gif".to_string(),
        "webp".to_string(),
        "heic".to_string(),
        "heif".to_string(),
    ]
}

fn default_video_extensions() -> Vec<String> {
    vec![
        "mp4".to_string(),
        "mov".to_string(),
        "webm".to_string(),
        "mkv".to_string(),
    ]
}

fn default_gpx_extensions() -> Vec<String> {
    vec!["gpx".to_string()]
}

fn default_meta_suffixes() -> Vec<String> {
    vec![".pg2conf".to_string(), ".md".to_string()]
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            photo_extensions: default_photo_extensions(),
            video_extensions: default_video_extensions(),
            gpx_extensions: default_gpx_extensions(),
            meta_suffixes: default_meta_suffixes(),
            follow_links: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetaFileConfig {
    /// Persist sidecar files. When off, stored meta files are neither
    /// created nor removed, and readers do not return them.
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AlbumConfig {
    /// Turn `.saved_searches.pg2conf` files into albums.
    #[serde(default)]
    pub enabled: bool,
}

/// How eagerly a cached directory listing is re-checked against disk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ReIndexingSensitivity {
    /// Only rescan when the folder's modification time changed.
    #[default]
    Low,
    /// Also rescan in the background once the cached listing is older than
    /// the cache timeout.
    Medium,
    /// Rescan in the background on every listing.
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    #[serde(default)]
    pub reindexing_sensitivity: ReIndexingSensitivity,

    #[serde(default = "default_cached_folder_timeout_secs")]
    pub cached_folder_timeout_secs: u64,
}

fn default_cached_folder_timeout_secs() -> u64 {
    60 * 60
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            reindexing_sensitivity: ReIndexingSensitivity::default(),
            cached_folder_timeout_secs: default_cached_folder_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Seconds between two full rescans of the media folder.
    #[serde(default = "default_daemon_interval")]
    pub interval_secs: u64,

    /// Hours of operation, e.g. 22 and 6 for overnight rescans. Both unset
    /// means always.
    #[serde(default)]
    pub hours_start: Option<u8>,
    #[serde(default)]
    pub hours_end: Option<u8>,
}

impl DaemonConfig {
    /// Whether `now` falls inside the hours of operation.
    pub fn is_active_at(&self, now: NaiveTime) -> bool {
        let (start, end) = match (self.hours_start, self.hours_end) {
            (Some(s), Some(e)) => (s, e),
            _ => return true,
        };

        let start_time = NaiveTime::from_hms_opt(start as u32, 0, 0).unwrap_or(NaiveTime::MIN);
        let end_time = NaiveTime::from_hms_opt(end as u32, 0, 0).unwrap_or(NaiveTime::MIN);

        if start <= end {
            now >= start_time && now < end_time
        } else {
            // Overnight range, e.g. 22:00 - 06:00
            now >= start_time || now < end_time
        }
    }
}

fn default_daemon_interval() -> u64 {
    15 * 60
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_daemon_interval(),
            hours_start: None,
            hours_end: None,
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("galdex")
        .join("galdex.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            media: MediaConfig::default(),
            scanner: ScannerConfig::default(),
            meta_file: MetaFileConfig::default(),
            album: AlbumConfig::default(),
            indexing: IndexingConfig::default(),
            daemon: DaemonConfig::default(),
        }
    }
}

impl Config {
    /// Load from `GALDEX_CONFIG` or the default location, writing the
    /// defaults there on first start.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("galdex")
    }

    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("GALDEX_CONFIG") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            db_path = "/tmp/index.db"

            [meta_file]
            enabled = true

            [indexing]
            reindexing_sensitivity = "medium"
            "#,
        )
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/index.db"));
        assert!(config.meta_file.enabled);
        assert!(!config.album.enabled);
        assert_eq!(
            config.indexing.reindexing_sensitivity,
            ReIndexingSensitivity::Medium
        );
        assert_eq!(config.indexing.cached_folder_timeout_secs, 3600);
        assert!(config.scanner.photo_extensions.contains(&"jpg".to_string()));
    }

    #[test]
    fn test_daemon_hours() {
        let at = |h| NaiveTime::from_hms_opt(h, 30, 0).unwrap();

        let always = DaemonConfig::default();
        assert!(always.is_active_at(at(3)));

        let overnight = DaemonConfig {
            hours_start: Some(22),
            hours_end: Some(6),
            ..DaemonConfig::default()
        };
        assert!(overnight.is_active_at(at(23)));
        assert!(overnight.is_active_at(at(5)));
        assert!(!overnight.is_active_at(at(12)));

        let office = DaemonConfig {
            hours_start: Some(9),
            hours_end: Some(17),
            ..DaemonConfig::default()
        };
        assert!(office.is_active_at(at(9)));
        assert!(!office.is_active_at(at(17)));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.album.enabled = true;
        config.daemon.interval_secs = 30;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert!(loaded.album.enabled);
        assert_eq!(loaded.daemon.interval_secs, 30);
    }
}
