//! Unified document validation.
//!
//! This module checks a built (or hand-edited) document for:
//! - Structural integrity (unique IDs, valid references)
//! - Data quality (non-empty, unique category names; known dimensions)
//! - Geometric validity (finite polygons, bbox and area consistent with them)
//! - Frame coverage (frame indices `0..N` in image order, consistent `info`)

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::{HashMap, HashSet};

use crate::ir::{
    AnnotationEntry, AnnotationId, BBoxXYXY, CategoryId, ImageId, UnifiedDocument,
    UNKNOWN_DIMENSION,
};

/// Absolute slack allowed when comparing derived geometry.
const GEOMETRY_TOLERANCE: f64 = 1e-6;

/// Options for validation behavior.
#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// If true, treat warnings as errors.
    pub strict: bool,
}

/// Validates a unified document and returns a report of all issues found.
pub fn validate_document(document: &UnifiedDocument, _opts: &ValidateOptions) -> ValidationReport {
    let mut report = ValidationReport::new();

    let image_ids: HashSet<ImageId> = document.images.iter().map(|i| i.id).collect();
    let category_ids: HashSet<CategoryId> = document.categories.iter().map(|c| c.id).collect();

    validate_images(document, &mut report);
    validate_frames(document, &mut report);
    validate_categories(document, &mut report);
    validate_annotations(document, &image_ids, &category_ids, &mut report);

    report
}

fn validate_images(document: &UnifiedDocument, report: &mut ValidationReport) {
    let mut seen_ids: HashMap<ImageId, usize> = HashMap::new();

    for (idx, image) in document.images.iter().enumerate() {
        let id = image.id.as_u64();

        if let Some(first_idx) = seen_ids.get(&image.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateImageId,
                format!(
                    "Duplicate image ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Image { id },
            ));
        } else {
            seen_ids.insert(image.id, idx);
        }

        if image.width == UNKNOWN_DIMENSION || image.height == UNKNOWN_DIMENSION {
            report.add(ValidationIssue::warning(
                IssueCode::UnknownImageDimensions,
                format!(
                    "Dimensions {}x{} unknown for '{}'",
                    image.width, image.height, image.file_name
                ),
                IssueContext::Image { id },
            ));
        }

        if image.file_name.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyFileName,
                "Empty filename",
                IssueContext::Image { id },
            ));
        }
    }
}

fn validate_frames(document: &UnifiedDocument, report: &mut ValidationReport) {
    let info = &document.info;

    if info.frame_count != document.images.len() {
        report.add(ValidationIssue::error(
            IssueCode::FrameCountMismatch,
            format!(
                "info.frame_count is {} but the document has {} images",
                info.frame_count,
                document.images.len()
            ),
            IssueContext::Document,
        ));
    }

    let indexed = document
        .images
        .iter()
        .filter(|i| i.frame_index.is_some())
        .count();
    if indexed != 0 && indexed != document.images.len() {
        report.add(ValidationIssue::error(
            IssueCode::MixedFrameIndex,
            format!(
                "{} of {} images carry a frame_index",
                indexed,
                document.images.len()
            ),
            IssueContext::Document,
        ));
    } else if indexed > 0 {
        // Only the first misplaced frame is reported.
        if let Some((position, image)) = document
            .images
            .iter()
            .enumerate()
            .find(|(position, image)| image.frame_index != Some(*position as u64))
        {
            report.add(ValidationIssue::error(
                IssueCode::FrameIndexOrder,
                format!(
                    "Image at position {} has frame_index {:?}; expected {}",
                    position, image.frame_index, position
                ),
                IssueContext::Image {
                    id: image.id.as_u64(),
                },
            ));
        }
    }

    let annotated: HashSet<ImageId> = document.annotations.iter().map(|a| a.image_id).collect();
    let image_only: HashSet<&str> = document
        .images
        .iter()
        .filter(|i| !annotated.contains(&i.id))
        .map(|i| i.file_name.as_str())
        .collect();
    for frame in &info.frames_without_labels {
        if !image_only.contains(frame.as_str()) {
            report.add(ValidationIssue::error(
                IssueCode::UnlistedFrame,
                format!(
                    "'{}' is listed in frames_without_labels but has no image-only entry",
                    frame
                ),
                IssueContext::Document,
            ));
        }
    }
}

fn validate_categories(document: &UnifiedDocument, report: &mut ValidationReport) {
    let mut seen_ids: HashMap<CategoryId, usize> = HashMap::new();
    let mut seen_names: HashMap<&str, CategoryId> = HashMap::new();

    for (idx, category) in document.categories.iter().enumerate() {
        let id = category.id.as_u64();

        if let Some(first_idx) = seen_ids.get(&category.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateCategoryId,
                format!(
                    "Duplicate category ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Category { id },
            ));
        } else {
            seen_ids.insert(category.id, idx);
        }

        if category.name.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyCategoryName,
                "Empty category name",
                IssueContext::Category { id },
            ));
        }

        if let Some(first_id) = seen_names.get(category.name.as_str()) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateCategoryName,
                format!(
                    "Duplicate category name '{}' (also used by category {})",
                    category.name, first_id
                ),
                IssueContext::Category { id },
            ));
        } else {
            seen_names.insert(&category.name, category.id);
        }
    }
}

fn validate_annotations(
    document: &UnifiedDocument,
    image_ids: &HashSet<ImageId>,
    category_ids: &HashSet<CategoryId>,
    report: &mut ValidationReport,
) {
    let mut seen_ids: HashMap<AnnotationId, usize> = HashMap::new();

    let image_dims: HashMap<ImageId, (u32, u32)> = document
        .images
        .iter()
        .map(|i| (i.id, (i.width, i.height)))
        .collect();

    for (idx, annotation) in document.annotations.iter().enumerate() {
        let id = annotation.id.as_u64();

        if let Some(first_idx) = seen_ids.get(&annotation.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateAnnotationId,
                format!(
                    "Duplicate annotation ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Annotation { id },
            ));
        } else {
            seen_ids.insert(annotation.id, idx);
        }

        if !image_ids.contains(&annotation.image_id) {
            report.add(ValidationIssue::error(
                IssueCode::MissingImageRef,
                format!("References non-existent image {}", annotation.image_id),
                IssueContext::Annotation { id },
            ));
        }

        if !category_ids.contains(&annotation.category_id) {
            report.add(ValidationIssue::error(
                IssueCode::MissingCategoryRef,
                format!(
                    "References non-existent category {}",
                    annotation.category_id
                ),
                IssueContext::Annotation { id },
            ));
        }

        if !validate_geometry(annotation, report) {
            continue;
        }

        let bbox = annotation.bbox_xyxy();
        if let Some(&(width, height)) = image_dims.get(&annotation.image_id) {
            if width == UNKNOWN_DIMENSION || height == UNKNOWN_DIMENSION {
                continue;
            }
            let (w, h) = (width as f64, height as f64);

            // Allow small tolerance for annotators clicking on the border
            let tolerance = 0.5;

            if bbox.xmin() < -tolerance
                || bbox.ymin() < -tolerance
                || bbox.xmax() > w + tolerance
                || bbox.ymax() > h + tolerance
            {
                report.add(ValidationIssue::warning(
                    IssueCode::BBoxOutOfBounds,
                    format!(
                        "Bounding box ({:.1}, {:.1}, {:.1}, {:.1}) extends outside image bounds (0, 0, {}, {})",
                        bbox.xmin(), bbox.ymin(), bbox.xmax(), bbox.ymax(), width, height
                    ),
                    IssueContext::Annotation { id },
                ));
            }
        }
    }
}

/// Checks one annotation's polygon, bbox and area. Returns false when the
/// geometry is too broken for bounds checks to mean anything.
fn validate_geometry(annotation: &AnnotationEntry, report: &mut ValidationReport) -> bool {
    let id = annotation.id.as_u64();

    let ring_ok = |ring: &Vec<f64>| ring.len() >= 6 && ring.len() % 2 == 0;
    if annotation.segmentation.is_empty() || !annotation.segmentation.iter().all(ring_ok) {
        report.add(ValidationIssue::error(
            IssueCode::InvalidSegmentation,
            "Segmentation must hold at least one ring of 3 or more (x, y) pairs",
            IssueContext::Annotation { id },
        ));
        return false;
    }

    let [x, y, w, h] = annotation.bbox;
    let finite = annotation.bbox.iter().all(|v| v.is_finite())
        && annotation.area.is_finite()
        && annotation.polygons().all(|p| p.is_finite());
    if !finite {
        report.add(ValidationIssue::error(
            IssueCode::GeometryNotFinite,
            format!(
                "Non-finite geometry: bbox ({}, {}, {}, {}), area {}",
                x, y, w, h, annotation.area
            ),
            IssueContext::Annotation { id },
        ));
        return false;
    }

    if !annotation.bbox_xyxy().is_ordered() {
        report.add(ValidationIssue::error(
            IssueCode::InvalidBBoxOrdering,
            format!("Negative bbox extent: width {}, height {}", w, h),
            IssueContext::Annotation { id },
        ));
    }

    let expected_bbox = annotation
        .polygons()
        .map(|p| p.bbox())
        .reduce(|a, b| {
            BBoxXYXY::from_xyxy(
                a.xmin().min(b.xmin()),
                a.ymin().min(b.ymin()),
                a.xmax().max(b.xmax()),
                a.ymax().max(b.ymax()),
            )
        });
    let expected_area: f64 = annotation.polygons().map(|p| p.area()).sum();

    let bbox_matches = expected_bbox
        .map(|b| {
            b.to_xywh()
                .iter()
                .zip(annotation.bbox.iter())
                .all(|(a, b)| (a - b).abs() <= GEOMETRY_TOLERANCE)
        })
        .unwrap_or(false);
    if !bbox_matches || (expected_area - annotation.area).abs() > GEOMETRY_TOLERANCE {
        report.add(ValidationIssue::warning(
            IssueCode::GeometryMismatch,
            format!(
                "Stored bbox/area ({:?}, {}) differ from the segmentation ({:?}, {})",
                annotation.bbox,
                annotation.area,
                expected_bbox.map(|b| b.to_xywh()),
                expected_area
            ),
            IssueContext::Annotation { id },
        ));
    }

    true
}
