//! LabelMe label file parsing and shape normalization.
//!
//! A label file is one JSON document per image with `imageWidth`,
//! `imageHeight`, an optional `imagePath`, and a `shapes` list. Each shape
//! is normalized into a [`Polygon`] as soon as it is parsed:
//!
//! - `polygon` shapes keep their vertices verbatim (order preserved);
//! - `rectangle` shapes carry two opposite corners in any order and expand
//!   to four vertices, clockwise from the top-left.
//!
//! Any other `shape_type` is an error rather than a silent drop.

mod discover;

pub(crate) use discover::image_stem_key;
pub use discover::{
    compare_relative_paths, discover_label_files, image_reference_key, normalize_image_ref,
    LabelFile,
};

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::FramelabelError;
use crate::ir::{Point, Polygon};

/// The closed set of geometry primitives a label file may contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Polygon,
    Rectangle,
}

impl ShapeKind {
    /// Parses a LabelMe `shape_type` value.
    pub fn from_labelme(raw: &str) -> Option<Self> {
        match raw {
            "polygon" => Some(Self::Polygon),
            "rectangle" => Some(Self::Rectangle),
            _ => None,
        }
    }

    /// The LabelMe `shape_type` spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Polygon => "polygon",
            Self::Rectangle => "rectangle",
        }
    }

    /// Turns raw LabelMe points into the canonical polygon for this kind.
    ///
    /// Returns a human-readable reason when the point count does not fit the
    /// kind.
    pub fn normalize(&self, points: &[Point]) -> Result<Polygon, String> {
        match self {
            Self::Polygon => {
                if points.len() < 3 {
                    return Err(format!(
                        "polygon needs at least 3 points, found {}",
                        points.len()
                    ));
                }
                Ok(Polygon::new(points.to_vec()))
            }
            Self::Rectangle => match points {
                [a, b] => Ok(Polygon::from_corners(*a, *b)),
                _ => Err(format!(
                    "rectangle needs exactly 2 points, found {}",
                    points.len()
                )),
            },
        }
    }
}

/// One shape from a label file, already normalized.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeRecord {
    pub label: String,
    pub kind: ShapeKind,
    /// Points as written in the label file.
    pub points: Vec<Point>,
    /// Canonical polygon all geometry is derived from.
    pub polygon: Polygon,
}

/// A parsed label file.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelRecord {
    pub source_path: PathBuf,
    /// The `imagePath` the label declares, if any.
    pub image_path: Option<String>,
    pub image_width: u32,
    pub image_height: u32,
    pub shapes: Vec<ShapeRecord>,
}

// ============================================================================
// LabelMe Schema Types (internal to this module)
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLabelFile {
    #[serde(default)]
    image_path: Option<String>,

    #[serde(default)]
    image_width: Option<f64>,

    #[serde(default)]
    image_height: Option<f64>,

    #[serde(default)]
    shapes: Vec<RawShape>,
}

#[derive(Debug, Deserialize)]
struct RawShape {
    label: String,

    /// LabelMe omits or nulls this for polygons in older files.
    #[serde(default)]
    shape_type: Option<String>,

    points: Vec<Point>,
}

// ============================================================================
// Public API
// ============================================================================

/// Reads and normalizes one LabelMe file.
///
/// # Errors
/// - [`FramelabelError::MalformedLabel`] for unreadable/invalid JSON, missing
///   or non-positive `imageWidth`/`imageHeight`, or bad point counts.
/// - [`FramelabelError::UnsupportedShape`] for shape types other than
///   polygon and rectangle.
pub fn parse_label_file(path: &Path) -> Result<LabelRecord, FramelabelError> {
    let bytes = fs::read(path)
        .map_err(|err| FramelabelError::malformed(path, format!("cannot read file: {err}")))?;
    parse_label_slice(&bytes, path)
}

/// Parses a LabelMe document from a string; `path` is only used for errors
/// and as the record's `source_path`.
pub fn parse_label_str(json: &str, path: &Path) -> Result<LabelRecord, FramelabelError> {
    parse_label_slice(json.as_bytes(), path)
}

/// Parses a LabelMe document from raw bytes.
pub fn parse_label_slice(bytes: &[u8], path: &Path) -> Result<LabelRecord, FramelabelError> {
    let raw: RawLabelFile = serde_json::from_slice(bytes)
        .map_err(|err| FramelabelError::malformed(path, format!("invalid JSON: {err}")))?;

    let image_width = dimension(raw.image_width, "imageWidth", path)?;
    let image_height = dimension(raw.image_height, "imageHeight", path)?;

    let shapes = raw
        .shapes
        .into_iter()
        .enumerate()
        .map(|(index, shape)| normalize_shape(shape, index, path))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LabelRecord {
        source_path: path.to_path_buf(),
        image_path: raw.image_path.filter(|p| !p.trim().is_empty()),
        image_width,
        image_height,
        shapes,
    })
}

/// Fuzz-only entrypoint for LabelMe parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_label(bytes: &[u8]) -> Result<(), FramelabelError> {
    let _ = parse_label_slice(bytes, Path::new("<fuzz>"))?;
    Ok(())
}

fn normalize_shape(
    shape: RawShape,
    index: usize,
    path: &Path,
) -> Result<ShapeRecord, FramelabelError> {
    let raw_type = shape.shape_type.as_deref().unwrap_or("polygon");
    let kind =
        ShapeKind::from_labelme(raw_type).ok_or_else(|| FramelabelError::UnsupportedShape {
            path: path.to_path_buf(),
            index,
            shape_type: raw_type.to_string(),
        })?;

    let polygon = kind.normalize(&shape.points).map_err(|message| {
        FramelabelError::malformed(path, format!("shape #{index} ('{}'): {message}", shape.label))
    })?;

    Ok(ShapeRecord {
        label: shape.label,
        kind,
        points: shape.points,
        polygon,
    })
}

fn dimension(value: Option<f64>, field: &str, path: &Path) -> Result<u32, FramelabelError> {
    let value = value.ok_or_else(|| {
        FramelabelError::malformed(path, format!("missing required field '{field}'"))
    })?;

    if !value.is_finite() || value <= 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(FramelabelError::malformed(
            path,
            format!("'{field}' must be a positive integer, found {value}"),
        ));
    }

    Ok(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<LabelRecord, FramelabelError> {
        parse_label_str(json, Path::new("labels/a.json"))
    }

    #[test]
    fn parses_rectangle_into_clockwise_polygon() {
        let record = parse(
            r#"{
                "imagePath": "a.jpg",
                "imageWidth": 640,
                "imageHeight": 480,
                "shapes": [
                    {"label": "car", "shape_type": "rectangle", "points": [[50, 40], [10, 10]]}
                ]
            }"#,
        )
        .expect("parse label");

        assert_eq!(record.image_width, 640);
        assert_eq!(record.image_height, 480);
        assert_eq!(record.image_path.as_deref(), Some("a.jpg"));

        let shape = &record.shapes[0];
        assert_eq!(shape.kind, ShapeKind::Rectangle);
        assert_eq!(shape.points.len(), 2);
        assert_eq!(
            shape.polygon.to_flat(),
            vec![10.0, 10.0, 50.0, 10.0, 50.0, 40.0, 10.0, 40.0]
        );
    }

    #[test]
    fn polygon_points_are_kept_in_order() {
        let record = parse(
            r#"{
                "imageWidth": 100,
                "imageHeight": 100,
                "shapes": [
                    {"label": "roof", "shape_type": "polygon", "points": [[5, 5], [1, 9], [9, 9]]}
                ]
            }"#,
        )
        .expect("parse label");

        assert_eq!(
            record.shapes[0].polygon.to_flat(),
            vec![5.0, 5.0, 1.0, 9.0, 9.0, 9.0]
        );
        assert_eq!(record.image_path, None);
    }

    #[test]
    fn missing_shape_type_defaults_to_polygon() {
        let record = parse(
            r#"{
                "imageWidth": 10,
                "imageHeight": 10,
                "shapes": [{"label": "x", "shape_type": null, "points": [[0, 0], [1, 0], [1, 1]]}]
            }"#,
        )
        .expect("parse label");
        assert_eq!(record.shapes[0].kind, ShapeKind::Polygon);
    }

    #[test]
    fn missing_dimensions_are_malformed() {
        let err = parse(r#"{"imageHeight": 10, "shapes": []}"#).unwrap_err();
        assert!(matches!(err, FramelabelError::MalformedLabel { .. }));
        assert!(err.to_string().contains("imageWidth"));

        let err = parse(r#"{"imageWidth": 10, "imageHeight": 0, "shapes": []}"#).unwrap_err();
        assert!(err.to_string().contains("imageHeight"));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = parse("{ not json").unwrap_err();
        assert!(matches!(err, FramelabelError::MalformedLabel { .. }));
        assert!(err.to_string().contains("labels/a.json"));
    }

    #[test]
    fn unsupported_shape_is_reported_with_index() {
        let err = parse(
            r#"{
                "imageWidth": 10,
                "imageHeight": 10,
                "shapes": [
                    {"label": "a", "shape_type": "rectangle", "points": [[0, 0], [1, 1]]},
                    {"label": "b", "shape_type": "circle", "points": [[5, 5], [6, 6]]}
                ]
            }"#,
        )
        .unwrap_err();

        match err {
            FramelabelError::UnsupportedShape {
                index, shape_type, ..
            } => {
                assert_eq!(index, 1);
                assert_eq!(shape_type, "circle");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn wrong_point_counts_are_malformed() {
        let err = parse(
            r#"{"imageWidth": 10, "imageHeight": 10,
                "shapes": [{"label": "r", "shape_type": "rectangle", "points": [[0, 0], [1, 1], [2, 2]]}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("exactly 2 points"));

        let err = parse(
            r#"{"imageWidth": 10, "imageHeight": 10,
                "shapes": [{"label": "p", "shape_type": "polygon", "points": [[0, 0], [1, 1]]}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("at least 3 points"));
    }

    #[test]
    fn image_data_and_extra_fields_are_ignored() {
        let record = parse(
            r#"{
                "version": "5.0.1",
                "flags": {},
                "imageData": "aGVsbG8=",
                "imageWidth": 4,
                "imageHeight": 3,
                "shapes": [
                    {"label": "a", "shape_type": "rectangle", "points": [[0, 0], [2, 2]],
                     "group_id": null, "flags": {}}
                ]
            }"#,
        )
        .expect("parse label");
        assert_eq!(record.shapes.len(), 1);
    }
}
