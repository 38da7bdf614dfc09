//! Reconstruction of per-image LabelMe files from a unified document.
//!
//! Every image entry yields one LabelMe document holding its annotations as
//! polygons. Rectangles were expanded during the build, so they come back as
//! their four corners with `shape_type: "polygon"`. `imageData` is always
//! null; the images themselves live in the media bundle.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::FramelabelError;
use crate::ir::{CategoryEntry, CategoryId, ImageEntry, ImageId, Point, UnifiedDocument};
use crate::label::{image_reference_key, normalize_image_ref};

/// `version` written into restored files.
pub const LABELME_VERSION: &str = "5.0.1";

/// Options for restoring label files.
#[derive(Clone, Debug, Default)]
pub struct RestoreOptions {
    /// Also write (shape-less) files for image-only entries, which were not
    /// built from any label file.
    pub include_unlabeled: bool,
}

/// A LabelMe document as written by the restore step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelMeDocument {
    pub version: String,
    pub flags: BTreeMap<String, bool>,
    pub shapes: Vec<LabelMeShape>,
    pub image_path: String,
    pub image_data: Option<String>,
    pub image_height: u32,
    pub image_width: u32,
    #[serde(default, rename = "frame_index", skip_serializing_if = "Option::is_none")]
    pub frame_index: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelMeShape {
    pub label: String,
    pub points: Vec<Point>,
    pub group_id: Option<u64>,
    pub shape_type: String,
    pub flags: BTreeMap<String, bool>,
}

/// One restored file: where it goes (relative to the output root) and what
/// it holds.
#[derive(Clone, Debug, PartialEq)]
pub struct RestoredLabel {
    pub relative_path: String,
    pub document: LabelMeDocument,
}

/// Builds the LabelMe documents for `document`, in image order.
///
/// Every image built from a label file is restored, including labels with
/// an empty `shapes` list.
///
/// A restored file keeps the relative path of the label it was built from;
/// image-only entries are named after their image. Colliding names get the
/// image ID appended.
///
/// # Errors
/// [`FramelabelError::RestoreWrite`] when an annotation references a
/// missing image or category.
pub fn restore_labels(
    document: &UnifiedDocument,
    options: &RestoreOptions,
) -> Result<Vec<RestoredLabel>, FramelabelError> {
    let categories: HashMap<CategoryId, &CategoryEntry> =
        document.categories.iter().map(|c| (c.id, c)).collect();
    let image_ids: HashSet<ImageId> = document.images.iter().map(|i| i.id).collect();

    let mut shapes_by_image: HashMap<ImageId, Vec<LabelMeShape>> = HashMap::new();
    for ann in &document.annotations {
        if !image_ids.contains(&ann.image_id) {
            return Err(FramelabelError::RestoreWrite {
                path: PathBuf::from(&ann.source),
                message: format!(
                    "annotation {} references missing image {}",
                    ann.id, ann.image_id
                ),
            });
        }
        let category = categories.get(&ann.category_id).ok_or_else(|| {
            FramelabelError::RestoreWrite {
                path: PathBuf::from(&ann.source),
                message: format!(
                    "annotation {} references missing category {}",
                    ann.id, ann.category_id
                ),
            }
        })?;

        let shapes = shapes_by_image.entry(ann.image_id).or_default();
        for polygon in ann.polygons() {
            shapes.push(LabelMeShape {
                label: category.name.clone(),
                points: polygon.into_vertices(),
                group_id: None,
                shape_type: "polygon".to_string(),
                flags: BTreeMap::new(),
            });
        }
    }

    let mut used_paths: HashSet<String> = HashSet::new();
    let mut restored = Vec::new();
    for image in &document.images {
        let shapes = shapes_by_image.remove(&image.id).unwrap_or_default();
        if image.source.is_empty() && !options.include_unlabeled {
            continue;
        }

        let mut relative_path = output_path(image);
        if !used_paths.insert(relative_path.clone()) {
            relative_path = format!(
                "{}_{}.json",
                image_reference_key(&relative_path),
                image.id
            );
            used_paths.insert(relative_path.clone());
        }

        restored.push(RestoredLabel {
            relative_path,
            document: LabelMeDocument {
                version: LABELME_VERSION.to_string(),
                flags: BTreeMap::new(),
                shapes,
                image_path: image.file_name.clone(),
                image_data: None,
                image_height: image.height,
                image_width: image.width,
                frame_index: image.frame_index,
            },
        });
    }

    Ok(restored)
}

/// Restores every label file of `document` under `output_dir`.
///
/// Returns the number of files written.
pub fn write_restored_labels(
    output_dir: &Path,
    document: &UnifiedDocument,
    options: &RestoreOptions,
) -> Result<usize, FramelabelError> {
    let restored = restore_labels(document, options)?;
    fs::create_dir_all(output_dir).map_err(FramelabelError::Io)?;

    for label in &restored {
        let path = output_dir.join(&label.relative_path);
        let json = serde_json::to_string_pretty(&label.document).map_err(|err| {
            FramelabelError::RestoreWrite {
                path: path.clone(),
                message: err.to_string(),
            }
        })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(FramelabelError::Io)?;
        }
        fs::write(&path, json).map_err(FramelabelError::Io)?;
        debug!("wrote {}", path.display());
    }

    info!(
        "restored {} label file(s) into {}",
        restored.len(),
        output_dir.display()
    );
    Ok(restored.len())
}

fn output_path(image: &ImageEntry) -> String {
    let source = normalize_image_ref(&image.source);
    if !source.is_empty() {
        return source;
    }
    format!("{}.json", image_reference_key(&image.file_name))
}
