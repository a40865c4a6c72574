use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use super::ScanError;
use crate::model::{CameraData, Dimensions, GpsData, Media, MediaKind, MediaMetadata, PositionData};

fn stat(path: &Path) -> Result<fs::Metadata, ScanError> {
    fs::metadata(path).map_err(|source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn modified_millis(meta: &fs::Metadata) -> Option<i64> {
    meta.modified()
        .ok()
        .map(|time| DateTime::<Utc>::from(time).timestamp_millis())
}

#[cfg(unix)]
fn changed_millis(meta: &fs::Metadata) -> Option<i64> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.ctime() * 1000 + meta.ctime_nsec() / 1_000_000)
}

#[cfg(not(unix))]
fn changed_millis(_meta: &fs::Metadata) -> Option<i64> {
    None
}

/// Latest of the status change and modification times, in milliseconds.
pub fn last_modified(path: &Path) -> Result<i64, ScanError> {
    let meta = stat(path)?;
    Ok(modified_millis(&meta).max(changed_millis(&meta)).unwrap_or(0))
}

pub fn file_size(path: &Path) -> Result<u64, ScanError> {
    Ok(stat(path)?.len())
}

/// Build the media entry for a file. Metadata that cannot be read is left
/// empty; only a failing stat is an error.
pub fn read_media(path: &Path, name: String, kind: MediaKind) -> Result<Media, ScanError> {
    let meta = stat(path)?;
    let mut media = Media::new(name, kind);
    media.metadata.file_size = meta.len();
    media.metadata.creation_date = modified_millis(&meta).unwrap_or(0);

    if kind == MediaKind::Photo {
        read_photo(path, &mut media.metadata);
    }
    Ok(media)
}

fn read_photo(path: &Path, metadata: &mut MediaMetadata) {
    if let Ok(reader) = image::ImageReader::open(path) {
        if let Ok((width, height)) = reader.into_dimensions() {
            metadata.size = Dimensions { width, height };
        }
    }

    let Ok(file) = File::open(path) else {
        return;
    };
    let mut bufreader = BufReader::new(file);
    let Ok(exif) = exif::Reader::new().read_from_container(&mut bufreader) else {
        return;
    };

    if let Some(taken) = ascii(&exif, exif::Tag::DateTimeOriginal).and_then(|s| parse_exif_date(&s)) {
        metadata.creation_date = taken;
    }
    metadata.caption = text(&exif, exif::Tag::ImageDescription);
    metadata.orientation = uint(&exif, exif::Tag::Orientation).and_then(|v| u8::try_from(v).ok());

    // Orientations 5-8 are rotated by 90 degrees.
    if matches!(metadata.orientation, Some(5..=8)) {
        let Dimensions { width, height } = metadata.size;
        metadata.size = Dimensions {
            width: height,
            height: width,
        };
    }

    let camera = CameraData {
        iso: uint(&exif, exif::Tag::PhotographicSensitivity),
        make: text(&exif, exif::Tag::Make),
        model: text(&exif, exif::Tag::Model),
        lens: text(&exif, exif::Tag::LensModel),
        f_stop: rational(&exif, exif::Tag::FNumber, 0),
        exposure: rational(&exif, exif::Tag::ExposureTime, 0),
        focal_length: rational(&exif, exif::Tag::FocalLength, 0),
    };
    if !camera.is_empty() {
        metadata.camera = Some(camera);
    }

    let gps = GpsData {
        latitude: coordinate(&exif, exif::Tag::GPSLatitude, exif::Tag::GPSLatitudeRef, 'S'),
        longitude: coordinate(&exif, exif::Tag::GPSLongitude, exif::Tag::GPSLongitudeRef, 'W'),
        altitude: altitude(&exif),
    };
    if !gps.is_empty() {
        metadata.position = Some(PositionData {
            gps: Some(gps),
            ..Default::default()
        });
    }
}

fn text(exif: &exif::Exif, tag: exif::Tag) -> Option<String> {
    let field = exif.get_field(tag, exif::In::PRIMARY)?;
    let value = field.display_value().to_string().trim_matches('"').trim().to_string();
    (!value.is_empty()).then_some(value)
}

fn ascii(exif: &exif::Exif, tag: exif::Tag) -> Option<String> {
    match &exif.get_field(tag, exif::In::PRIMARY)?.value {
        exif::Value::Ascii(values) => values
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string()),
        _ => None,
    }
}

fn uint(exif: &exif::Exif, tag: exif::Tag) -> Option<u32> {
    exif.get_field(tag, exif::In::PRIMARY)?.value.get_uint(0)
}

fn rational(exif: &exif::Exif, tag: exif::Tag, index: usize) -> Option<f64> {
    match &exif.get_field(tag, exif::In::PRIMARY)?.value {
        exif::Value::Rational(values) => {
            let r = values.get(index)?;
            (r.denom != 0).then(|| r.num as f64 / r.denom as f64)
        }
        _ => None,
    }
}

fn coordinate(exif: &exif::Exif, tag: exif::Tag, reference: exif::Tag, negative: char) -> Option<f64> {
    let value = dms_to_decimal(
        rational(exif, tag, 0)?,
        rational(exif, tag, 1)?,
        rational(exif, tag, 2)?,
    );
    let flip = exif
        .get_field(reference, exif::In::PRIMARY)
        .map(|f| f.display_value().to_string().contains(negative))
        .unwrap_or(false);
    Some(if flip { -value } else { value })
}

fn altitude(exif: &exif::Exif) -> Option<i32> {
    let meters = rational(exif, exif::Tag::GPSAltitude, 0)?;
    // Reference 1 means below sea level.
    let below = uint(exif, exif::Tag::GPSAltitudeRef) == Some(1);
    let meters = if below { -meters } else { meters };
    Some(meters.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32)
}

fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

/// Parse an EXIF timestamp such as `2019:06:01 18:30:00` as UTC milliseconds.
fn parse_exif_date(value: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(value, "%Y:%m:%d %H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc().timestamp_millis())
}
