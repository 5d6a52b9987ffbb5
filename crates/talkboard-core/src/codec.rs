//! Stroke records stored in the remote list.
//!
//! A stroke travels as a tagged, versioned JSON record:
//!
//! ```json
//! { "type": "stroke", "version": 1, "color": 255, "points": [ { "x": 1, "y": 2 } ] }
//! ```
//!
//! Coordinates are truncated toward zero when encoded. Records written by
//! older clients carry no `type` tag and only a placeholder color; they are
//! still accepted and decode as black strokes.

use crate::stroke::Stroke;
use crate::style::StrokeColor;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Current record version.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors produced while decoding a remote value.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed stroke record: {0}")]
    Malformed(String),
    #[error("Unsupported stroke record version: {0}")]
    UnsupportedVersion(u32),
    #[error("Stroke record has no points")]
    EmptyStroke,
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::Malformed(err.to_string())
    }
}

/// Integer point as stored remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePoint {
    pub x: i64,
    pub y: i64,
}

impl WirePoint {
    /// Truncate a point toward zero.
    pub fn truncate(point: Point) -> Self {
        Self {
            x: point.x as i64,
            y: point.y as i64,
        }
    }
}

/// Versioned stroke payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeRecord {
    pub version: u32,
    /// Packed `0xRRGGBBAA` color.
    pub color: u32,
    pub points: Vec<WirePoint>,
}

/// Every kind of value the board writes to the remote list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RemoteRecord {
    Stroke(StrokeRecord),
}

/// Untagged record written by clients that predate [`SCHEMA_VERSION`].
#[derive(Debug, Deserialize)]
struct LegacyStrokeRecord {
    points: Vec<LegacyPoint>,
}

#[derive(Debug, Deserialize)]
struct LegacyPoint {
    x: f64,
    y: f64,
}

/// Encode a stroke into its record.
pub fn encode(stroke: &Stroke) -> StrokeRecord {
    StrokeRecord {
        version: SCHEMA_VERSION,
        color: stroke.color.to_packed(),
        points: stroke.points().iter().copied().map(WirePoint::truncate).collect(),
    }
}

/// Encode a stroke into the JSON value appended to the remote list.
pub fn to_value(stroke: &Stroke) -> Value {
    let record = RemoteRecord::Stroke(encode(stroke));
    // A record of integers and a tag has no way to fail serialization.
    serde_json::to_value(&record).unwrap_or(Value::Null)
}

/// Decode a remote value into a stroke.
///
/// Never panics; callers decide what to do with the error. The canvas skips
/// entries that fail to decode.
pub fn decode(value: &Value) -> Result<Stroke, DecodeError> {
    if value.get("type").is_some() {
        let RemoteRecord::Stroke(record) = RemoteRecord::deserialize(value)?;
        return decode_record(&record);
    }

    let legacy = LegacyStrokeRecord::deserialize(value)?;
    let points = legacy
        .points
        .into_iter()
        .map(|p| Point::new(p.x, p.y))
        .collect();
    Stroke::from_points(points, StrokeColor::black()).ok_or(DecodeError::EmptyStroke)
}

/// Decode an already-parsed record.
pub fn decode_record(record: &StrokeRecord) -> Result<Stroke, DecodeError> {
    if record.version != SCHEMA_VERSION {
        return Err(DecodeError::UnsupportedVersion(record.version));
    }
    let points = record
        .points
        .iter()
        .map(|p| Point::new(p.x as f64, p.y as f64))
        .collect();
    Stroke::from_points(points, StrokeColor::from_packed(record.color))
        .ok_or(DecodeError::EmptyStroke)
}
