use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A media file of a directory. Photos, videos and GPS tracks share the same
/// shape; which metadata fields are meaningful depends on `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub kind: MediaKind,
    pub metadata: MediaMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
    Gpx,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Gpx => "gpx",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "photo" => Ok(MediaKind::Photo),
            "video" => Ok(MediaKind::Video),
            "gpx" => Ok(MediaKind::Gpx),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    pub size: Dimensions,
    /// Milliseconds since the epoch.
    pub creation_date: i64,
    pub file_size: u64,

    // Video only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<PositionData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub faces: Vec<FaceRegion>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Camera parameters. A value with every field empty is stored as no camera
/// data at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraData {
    pub iso: Option<u32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub lens: Option<String>,
    pub f_stop: Option<f64>,
    pub exposure: Option<f64>,
    pub focal_length: Option<f64>,
}

impl CameraData {
    pub fn is_empty(&self) -> bool {
        *self == CameraData::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionData {
    pub gps: Option<GpsData>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
}

impl PositionData {
    pub fn is_empty(&self) -> bool {
        self.gps.as_ref().map_or(true, GpsData::is_empty)
            && self.country.is_none()
            && self.state.is_none()
            && self.city.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsData {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<i32>,
}

impl GpsData {
    pub fn is_empty(&self) -> bool {
        self.latitude.is_none() && self.longitude.is_none() && self.altitude.is_none()
    }
}

/// A named face on a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub name: String,
    #[serde(rename = "box")]
    pub bbox: FaceBox,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Media {
    pub fn new(name: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: None,
            name: name.into(),
            kind,
            metadata: MediaMetadata::default(),
        }
    }

    pub fn photo(name: impl Into<String>) -> Self {
        Self::new(name, MediaKind::Photo)
    }

    pub fn video(name: impl Into<String>) -> Self {
        Self::new(name, MediaKind::Video)
    }

    pub fn gpx(name: impl Into<String>) -> Self {
        Self::new(name, MediaKind::Gpx)
    }

    /// Names of the people tagged on this media, in tagging order.
    pub fn people(&self) -> impl Iterator<Item = &str> {
        self.metadata.faces.iter().map(|f| f.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_round_trips_through_str() {
        for kind in [MediaKind::Photo, MediaKind::Video, MediaKind::Gpx] {
            assert_eq!(kind.as_str().parse::<MediaKind>(), Ok(kind));
        }
        assert!("tiff".parse::<MediaKind>().is_err());
    }

    #[test]
    fn test_empty_position() {
        let mut position = PositionData::default();
        assert!(position.is_empty());
        position.gps = Some(GpsData::default());
        assert!(position.is_empty());
        position.gps = Some(GpsData { altitude: Some(-12), ..Default::default() });
        assert!(!position.is_empty());
    }
}
