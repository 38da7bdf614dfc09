//! The unified annotation document.
//!
//! One document describes every frame of a media bundle: `images` in frame
//! order, `annotations` in (frame, shape) order, and `categories` in
//! first-seen order. The layout is COCO-compatible; the extra `info` fields
//! and `frame_index` tie entries back to the bundle.

use serde::{Deserialize, Serialize};

use super::bbox::BBoxXYXY;
use super::ids::{AnnotationId, CategoryId, ImageId};
use super::polygon::Polygon;

/// Schema version written into `info.version`.
pub const DOCUMENT_VERSION: &str = "1.0";

/// Width/height written for frames whose dimensions could not be determined.
pub const UNKNOWN_DIMENSION: u32 = 0;

/// A complete unified annotation document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UnifiedDocument {
    #[serde(default)]
    pub info: DocumentInfo,

    /// One entry per frame (or per label file when no manifest was used).
    pub images: Vec<ImageEntry>,

    /// One entry per shape, across all images.
    pub annotations: Vec<AnnotationEntry>,

    /// De-duplicated label names.
    pub categories: Vec<CategoryEntry>,
}

/// Build metadata tying the document to its bundle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentInfo {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Where the frame manifest came from (`-` for stdin).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_manifest: Option<String>,

    /// The media bundle the frame indices refer to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_path: Option<String>,

    #[serde(default)]
    pub frame_count: usize,

    /// Frames that were emitted without any label file.
    #[serde(default)]
    pub frames_without_labels: Vec<String>,

    /// Value used for width/height when a frame's size is unknown.
    #[serde(default)]
    pub unknown_dimension_sentinel: u32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frames_with_unknown_dimensions: Vec<String>,

    /// Label files that matched no manifest frame.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels_without_frames: Vec<String>,

    /// Label files dropped under a tolerance option.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_labels: Vec<String>,
}

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

impl Default for DocumentInfo {
    fn default() -> Self {
        Self {
            version: default_version(),
            description: None,
            frame_manifest: None,
            bundle_path: None,
            frame_count: 0,
            frames_without_labels: Vec::new(),
            unknown_dimension_sentinel: UNKNOWN_DIMENSION,
            frames_with_unknown_dimensions: Vec::new(),
            labels_without_frames: Vec::new(),
            skipped_labels: Vec::new(),
        }
    }
}

/// An image (frame) entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub id: ImageId,

    /// Image path relative to the image root / manifest source root.
    pub file_name: String,

    pub width: u32,

    pub height: u32,

    /// Label file this entry was built from; empty for unlabeled frames.
    #[serde(default)]
    pub source: String,

    /// Position in the media bundle; present only when a manifest was used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_index: Option<u64>,
}

impl ImageEntry {
    pub fn new(
        id: impl Into<ImageId>,
        file_name: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            width,
            height,
            source: String::new(),
            frame_index: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_frame_index(mut self, frame_index: Option<u64>) -> Self {
        self.frame_index = frame_index;
        self
    }
}

/// A single shape, normalized to a polygon.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotationEntry {
    pub id: AnnotationId,

    pub image_id: ImageId,

    pub category_id: CategoryId,

    /// COCO polygon layout: a list of flattened rings. Always one ring here.
    pub segmentation: Vec<Vec<f64>>,

    /// `[x_min, y_min, width, height]`.
    pub bbox: [f64; 4],

    pub area: f64,

    #[serde(default)]
    pub iscrowd: u8,

    /// Label file the shape was read from.
    #[serde(default)]
    pub source: String,
}

impl AnnotationEntry {
    /// Creates an annotation whose bbox and area are derived from `polygon`.
    pub fn from_polygon(
        id: impl Into<AnnotationId>,
        image_id: impl Into<ImageId>,
        category_id: impl Into<CategoryId>,
        polygon: &Polygon,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            image_id: image_id.into(),
            category_id: category_id.into(),
            segmentation: vec![polygon.to_flat()],
            bbox: polygon.bbox().to_xywh(),
            area: polygon.area(),
            iscrowd: 0,
            source: source.into(),
        }
    }

    /// Returns the bbox in XYXY form.
    pub fn bbox_xyxy(&self) -> BBoxXYXY {
        let [x, y, w, h] = self.bbox;
        BBoxXYXY::from_xywh(x, y, w, h)
    }

    /// Returns every segmentation ring as a polygon.
    pub fn polygons(&self) -> impl Iterator<Item = Polygon> + '_ {
        self.segmentation.iter().map(|ring| Polygon::from_flat(ring))
    }
}

/// A de-duplicated label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub id: CategoryId,
    pub name: String,
}

impl CategoryEntry {
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
