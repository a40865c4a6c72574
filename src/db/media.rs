//! Media rows, their face regions and the person query.

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

use crate::error::{IndexError, Result};
use crate::model::{
    CameraData, Dimensions, FaceBox, FaceRegion, GpsData, Media, MediaKind, MediaMetadata,
    PositionData,
};

/// How a person query compares names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonMatch {
    /// Substring match (SQL LIKE, ASCII case-insensitive).
    #[default]
    Like,
    /// Byte-equal name.
    Exact,
}

const COLUMNS: &str = r#"
    id, name, kind, file_size, width, height, creation_date,
    duration, bitrate, fps,
    caption, keywords, rating, orientation,
    camera_make, camera_model, lens, iso, f_stop, exposure, focal_length,
    gps_latitude, gps_longitude, gps_altitude, country, state, city
"#;

/// Row as read, before the kind is validated and faces are attached.
struct RawMedia {
    id: i64,
    name: String,
    kind: String,
    keywords: Option<String>,
    metadata: MediaMetadata,
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<RawMedia> {
    let camera = CameraData {
        make: row.get(14)?,
        model: row.get(15)?,
        lens: row.get(16)?,
        iso: row.get(17)?,
        f_stop: row.get(18)?,
        exposure: row.get(19)?,
        focal_length: row.get(20)?,
    };
    let gps = GpsData {
        latitude: row.get(21)?,
        longitude: row.get(22)?,
        altitude: row.get(23)?,
    };
    let position = PositionData {
        gps: (!gps.is_empty()).then_some(gps),
        country: row.get(24)?,
        state: row.get(25)?,
        city: row.get(26)?,
    };
    let file_size: i64 = row.get(3)?;

    Ok(RawMedia {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        keywords: row.get(11)?,
        metadata: MediaMetadata {
            size: Dimensions {
                width: row.get(4)?,
                height: row.get(5)?,
            },
            creation_date: row.get(6)?,
            file_size: file_size.max(0) as u64,
            duration: row.get(7)?,
            bitrate: row.get(8)?,
            fps: row.get(9)?,
            caption: row.get(10)?,
            keywords: Vec::new(),
            rating: row.get(12)?,
            orientation: row.get(13)?,
            camera: (!camera.is_empty()).then_some(camera),
            position: (!position.is_empty()).then_some(position),
            faces: Vec::new(),
        },
    })
}

fn finish_row(conn: &Connection, raw: RawMedia) -> Result<Media> {
    let kind: MediaKind = raw.kind.parse().map_err(|value| IndexError::Corrupt {
        column: "media.kind",
        value,
    })?;
    let mut metadata = raw.metadata;
    if let Some(keywords) = raw.keywords {
        metadata.keywords = serde_json::from_str(&keywords)?;
    }
    metadata.faces = faces_for(conn, raw.id)?;
    Ok(Media {
        id: Some(raw.id),
        name: raw.name,
        kind,
        metadata,
    })
}

fn keywords_json(media: &Media) -> Result<Option<String>> {
    if media.metadata.keywords.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(&media.metadata.keywords)?))
    }
}

/// Flattened column values shared by insert and update.
fn column_values(media: &Media) -> Result<Vec<rusqlite::types::Value>> {
    use rusqlite::types::Value;

    fn opt_text(v: &Option<String>) -> Value {
        v.clone().map(Value::Text).unwrap_or(Value::Null)
    }
    fn opt_int<T: Into<i64> + Copy>(v: Option<T>) -> Value {
        v.map(|v| Value::Integer(v.into())).unwrap_or(Value::Null)
    }
    fn opt_real(v: Option<f64>) -> Value {
        v.map(Value::Real).unwrap_or(Value::Null)
    }

    let meta = &media.metadata;
    let camera = meta.camera.clone().unwrap_or_default();
    let position = meta.position.clone().unwrap_or_default();
    let gps = position.gps.unwrap_or_default();

    Ok(vec![
        Value::Text(media.kind.as_str().to_string()),
        Value::Integer(meta.file_size as i64),
        Value::Integer(meta.size.width.into()),
        Value::Integer(meta.size.height.into()),
        Value::Integer(meta.creation_date),
        opt_int(meta.duration),
        opt_int(meta.bitrate),
        opt_int(meta.fps),
        opt_text(&meta.caption),
        keywords_json(media)?.map(Value::Text).unwrap_or(Value::Null),
        opt_int(meta.rating),
        opt_int(meta.orientation),
        opt_text(&camera.make),
        opt_text(&camera.model),
        opt_text(&camera.lens),
        opt_int(camera.iso),
        opt_real(camera.f_stop),
        opt_real(camera.exposure),
        opt_real(camera.focal_length),
        opt_real(gps.latitude),
        opt_real(gps.longitude),
        opt_int(gps.altitude),
        opt_text(&position.country),
        opt_text(&position.state),
        opt_text(&position.city),
    ])
}

pub fn insert(conn: &Connection, directory_id: i64, media: &Media) -> Result<i64> {
    let mut values = vec![
        rusqlite::types::Value::Integer(directory_id),
        rusqlite::types::Value::Text(media.name.clone()),
    ];
    values.extend(column_values(media)?);

    conn.execute(
        r#"
        INSERT INTO media (
            directory_id, name,
            kind, file_size, width, height, creation_date,
            duration, bitrate, fps,
            caption, keywords, rating, orientation,
            camera_make, camera_model, lens, iso, f_stop, exposure, focal_length,
            gps_latitude, gps_longitude, gps_altitude, country, state, city
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        rusqlite::params_from_iter(values),
    )?;
    let id = conn.last_insert_rowid();
    replace_faces(conn, id, &media.metadata.faces)?;
    Ok(id)
}

/// Overwrite the mutable fields of an existing row, keeping its id.
pub fn update(conn: &Connection, id: i64, media: &Media) -> Result<()> {
    let mut values = column_values(media)?;
    values.push(rusqlite::types::Value::Integer(id));

    conn.execute(
        r#"
        UPDATE media SET
            kind = ?, file_size = ?, width = ?, height = ?, creation_date = ?,
            duration = ?, bitrate = ?, fps = ?,
            caption = ?, keywords = ?, rating = ?, orientation = ?,
            camera_make = ?, camera_model = ?, lens = ?, iso = ?, f_stop = ?, exposure = ?, focal_length = ?,
            gps_latitude = ?, gps_longitude = ?, gps_altitude = ?, country = ?, state = ?, city = ?
        WHERE id = ?
        "#,
        rusqlite::params_from_iter(values),
    )?;
    replace_faces(conn, id, &media.metadata.faces)?;
    Ok(())
}

pub fn delete(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM media WHERE id = ?", [id])?;
    Ok(())
}

/// Stored media of a directory keyed by exact name. When the same name
/// appears more than once the oldest row wins and the rest come back as
/// duplicates for removal.
pub fn ids_by_name(conn: &Connection, directory_id: i64) -> Result<(HashMap<String, i64>, Vec<i64>)> {
    let mut stmt = conn.prepare("SELECT id, name FROM media WHERE directory_id = ? ORDER BY id")?;
    let rows = stmt
        .query_map([directory_id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut by_name = HashMap::with_capacity(rows.len());
    let mut duplicates = Vec::new();
    for (id, name) in rows {
        if by_name.contains_key(&name) {
            duplicates.push(id);
        } else {
            by_name.insert(name, id);
        }
    }
    Ok((by_name, duplicates))
}

pub fn get(conn: &Connection, id: i64) -> Result<Option<Media>> {
    let raw = conn
        .query_row(&format!("SELECT {COLUMNS} FROM media WHERE id = ?"), [id], from_row)
        .optional()?;
    raw.map(|raw| finish_row(conn, raw)).transpose()
}

/// Media of a directory ordered by name.
pub fn for_directory(conn: &Connection, directory_id: i64) -> Result<Vec<Media>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM media WHERE directory_id = ? ORDER BY name COLLATE BINARY"
    ))?;
    let raws = stmt
        .query_map([directory_id], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(|raw| finish_row(conn, raw)).collect()
}

/// The media a directory is represented by when it has direct media.
pub fn first_in_directory(conn: &Connection, directory_id: i64) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM media WHERE directory_id = ? ORDER BY name COLLATE BINARY LIMIT 1",
            [directory_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

pub fn count_in_directory(conn: &Connection, directory_id: i64) -> Result<u32> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM media WHERE directory_id = ?",
        [directory_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM media", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// Face regions
// ============================================================================

fn person_id(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute("INSERT OR IGNORE INTO persons (name) VALUES (?)", [name])?;
    let id = conn.query_row(
        "SELECT id FROM persons WHERE name = ? COLLATE BINARY",
        [name],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn replace_faces(conn: &Connection, media_id: i64, faces: &[FaceRegion]) -> Result<()> {
    conn.execute("DELETE FROM face_regions WHERE media_id = ?", [media_id])?;
    for face in faces {
        let person = person_id(conn, &face.name)?;
        conn.execute(
            r#"
            INSERT INTO face_regions (media_id, person_id, box_left, box_top, box_width, box_height)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                media_id,
                person,
                face.bbox.left,
                face.bbox.top,
                face.bbox.width,
                face.bbox.height
            ],
        )?;
    }
    Ok(())
}

fn faces_for(conn: &Connection, media_id: i64) -> Result<Vec<FaceRegion>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT p.name, f.box_left, f.box_top, f.box_width, f.box_height
        FROM face_regions f
        JOIN persons p ON p.id = f.person_id
        WHERE f.media_id = ?
        ORDER BY f.id
        "#,
    )?;
    let faces = stmt
        .query_map([media_id], |row| {
            Ok(FaceRegion {
                name: row.get(0)?,
                bbox: FaceBox {
                    left: row.get(1)?,
                    top: row.get(2)?,
                    width: row.get(3)?,
                    height: row.get(4)?,
                },
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(faces)
}

/// Ids of media showing a person, oldest first.
pub fn find_by_person(conn: &Connection, text: &str, matching: PersonMatch) -> Result<Vec<i64>> {
    let (condition, pattern) = match matching {
        PersonMatch::Like => ("p.name LIKE ? ESCAPE '\\'", format!("%{}%", escape_like(text))),
        PersonMatch::Exact => ("p.name = ? COLLATE BINARY", text.to_string()),
    };
    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT DISTINCT f.media_id
        FROM face_regions f
        JOIN persons p ON p.id = f.person_id
        WHERE {condition}
        ORDER BY f.media_id
        "#
    ))?;
    let ids = stmt
        .query_map([pattern], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
