#![allow(dead_code)]

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use framelabel::ir::{Point, UnifiedDocument};
use framelabel::label::{parse_label_str, LabelFile};
use framelabel::manifest::{FrameManifest, FrameManifestEntry, ManifestSource};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub const EPS_AREA: f64 = 1e-6;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Coordinates on a quarter-pixel grid so areas are exact in f64.
pub fn arb_coord() -> BoxedStrategy<f64> {
    (0i32..=8000).prop_map(|v| v as f64 / 4.0).boxed()
}

pub fn arb_point() -> BoxedStrategy<Point> {
    (arb_coord(), arb_coord())
        .prop_map(|(x, y)| Point::new(x, y))
        .boxed()
}

pub fn arb_polygon_points(max_vertices: usize) -> BoxedStrategy<Vec<Point>> {
    prop::collection::vec(arb_point(), 3..=max_vertices.max(3)).boxed()
}

/// Frame names for a manifest of `1..=max_frames` entries.
pub fn arb_frame_names(max_frames: usize) -> BoxedStrategy<Vec<String>> {
    (1..=max_frames)
        .prop_map(|n| (0..n).map(|i| format!("seq/frame_{i:04}.jpg")).collect())
        .boxed()
}

/// Frame names plus the subset of frame positions that have a label.
pub fn arb_frames_with_labels(max_frames: usize) -> BoxedStrategy<(Vec<String>, BTreeSet<usize>)> {
    arb_frame_names(max_frames)
        .prop_flat_map(|frames| {
            let n = frames.len();
            (
                Just(frames),
                prop::collection::btree_set(0..n, 0..=n),
            )
        })
        .boxed()
}

pub fn manifest_for(frames: &[String]) -> ManifestSource {
    let entries = frames
        .iter()
        .enumerate()
        .map(|(i, f)| FrameManifestEntry::new(i as u64, f.clone()))
        .collect();
    ManifestSource::Manifest(
        FrameManifest::from_entries("manifest.json", None, entries).expect("valid manifest"),
    )
}

/// An in-memory label file for `image_ref` with `shapes` rectangles.
pub fn label_file(relative_path: &str, image_ref: &str, labels: &[&str]) -> LabelFile {
    let shapes: Vec<String> = labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            format!(
                r#"{{"label": "{label}", "shape_type": "rectangle", "points": [[{i}, {i}], [{}, {}]]}}"#,
                i + 2,
                i + 3
            )
        })
        .collect();
    let json = format!(
        r#"{{"imagePath": "{image_ref}", "imageWidth": 64, "imageHeight": 48, "shapes": [{}]}}"#,
        shapes.join(", ")
    );

    LabelFile {
        path: PathBuf::from(relative_path),
        relative_path: relative_path.to_string(),
        image_ref: image_ref.to_string(),
        parsed: parse_label_str(&json, Path::new(relative_path)),
    }
}

/// Checks ID uniqueness, monotonic assignment and references.
pub fn assert_valid_references(document: &UnifiedDocument) -> Result<(), String> {
    let image_ids: Vec<u64> = document.images.iter().map(|i| i.id.as_u64()).collect();
    let expected: Vec<u64> = (1..=document.images.len() as u64).collect();
    if image_ids != expected {
        return Err(format!("image ids {:?} are not 1..=N", image_ids));
    }

    let ann_ids: Vec<u64> = document.annotations.iter().map(|a| a.id.as_u64()).collect();
    let expected: Vec<u64> = (1..=document.annotations.len() as u64).collect();
    if ann_ids != expected {
        return Err(format!("annotation ids {:?} are not 1..=N", ann_ids));
    }

    let images: HashSet<u64> = image_ids.into_iter().collect();
    let categories: HashSet<u64> = document.categories.iter().map(|c| c.id.as_u64()).collect();
    for ann in &document.annotations {
        if !images.contains(&ann.image_id.as_u64()) {
            return Err(format!("annotation {} has dangling image", ann.id));
        }
        if !categories.contains(&ann.category_id.as_u64()) {
            return Err(format!("annotation {} has dangling category", ann.id));
        }
    }

    let names: HashSet<&str> = document.categories.iter().map(|c| c.name.as_str()).collect();
    if names.len() != document.categories.len() {
        return Err("duplicate category names".to_string());
    }
    Ok(())
}
