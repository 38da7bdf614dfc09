//! Aligns discovered label files against the frame order.
//!
//! With a manifest, the manifest decides the order and every frame appears
//! exactly once, labeled or not. Without one, label files are ordered by
//! their relative path, which is how the bundler orders frames when it is
//! run without writing a manifest.

use std::collections::{BTreeMap, BTreeSet};

use super::ManifestSource;
use crate::label::{compare_relative_paths, image_reference_key, image_stem_key};

/// Anything that can be matched to a frame.
pub trait LabelSource {
    /// Path of the label file relative to the labels root.
    fn relative_path(&self) -> &str;
    /// Normalized image reference the label declares.
    fn image_ref(&self) -> &str;
}

impl LabelSource for crate::label::LabelFile {
    fn relative_path(&self) -> &str {
        &self.relative_path
    }

    fn image_ref(&self) -> &str {
        &self.image_ref
    }
}

/// One step of the processing order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlignedFrame {
    /// Bundle position; `None` when no manifest was used.
    pub frame_index: Option<u64>,
    /// Image path the frame is emitted under.
    pub relative_path: String,
    /// Index into the label slice passed to [`align`].
    pub label: Option<usize>,
}

/// A label that resolved to an already-claimed frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DuplicateLabel {
    pub dropped: usize,
    pub kept: usize,
}

/// The full processing plan for a build.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Alignment {
    pub frames: Vec<AlignedFrame>,
    /// Labels that match no manifest frame, in relative path order.
    pub unmatched_labels: Vec<usize>,
    /// Labels that lost a frame to a lexicographically earlier label.
    pub duplicate_labels: Vec<DuplicateLabel>,
}

impl Alignment {
    /// Frames that have no label, as their relative paths.
    pub fn frames_without_labels(&self) -> impl Iterator<Item = &str> {
        self.frames
            .iter()
            .filter(|frame| frame.label.is_none())
            .map(|frame| frame.relative_path.as_str())
    }
}

/// Produces the authoritative processing order.
///
/// Labels are matched to manifest entries by image reference with the
/// extension stripped (`sub/a.png` matches `sub/a.jpg`). A manifest entry
/// with no full-path match falls back to a label with the same file stem,
/// provided exactly one unclaimed label has that stem. When several labels
/// share a key, the one whose relative path sorts first (see
/// [`compare_relative_paths`]) wins.
pub fn align<L: LabelSource>(source: &ManifestSource, labels: &[L]) -> Alignment {
    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.sort_by(|&a, &b| {
        compare_relative_paths(labels[a].relative_path(), labels[b].relative_path())
    });

    // First label per image key wins; later ones are duplicates.
    let mut by_key: BTreeMap<String, usize> = BTreeMap::new();
    let mut duplicate_labels = Vec::new();
    for &idx in &order {
        let key = image_reference_key(labels[idx].image_ref());
        match by_key.get(&key) {
            Some(&kept) => duplicate_labels.push(DuplicateLabel { dropped: idx, kept }),
            None => {
                by_key.insert(key, idx);
            }
        }
    }

    let Some(manifest) = source.manifest() else {
        let frames = order
            .iter()
            .copied()
            .filter(|idx| !duplicate_labels.iter().any(|d| d.dropped == *idx))
            .map(|idx| AlignedFrame {
                frame_index: None,
                relative_path: labels[idx].image_ref().to_string(),
                label: Some(idx),
            })
            .collect();
        return Alignment {
            frames,
            unmatched_labels: Vec::new(),
            duplicate_labels,
        };
    };

    let mut claimed: BTreeSet<usize> = BTreeSet::new();
    let mut frames: Vec<AlignedFrame> = manifest
        .entries()
        .iter()
        .map(|entry| {
            let label = by_key
                .get(&image_reference_key(&entry.relative_path))
                .copied();
            if let Some(idx) = label {
                claimed.insert(idx);
            }
            AlignedFrame {
                frame_index: Some(entry.frame_index),
                relative_path: entry.relative_path.clone(),
                label,
            }
        })
        .collect();

    // Stem fallback for frames the full-path pass left unlabeled.
    let mut by_stem: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (key, &idx) in &by_key {
        if !claimed.contains(&idx) {
            by_stem.entry(image_stem_key(key)).or_default().push(idx);
        }
    }
    for frame in frames.iter_mut().filter(|f| f.label.is_none()) {
        let stem = image_stem_key(&frame.relative_path);
        if let Some([idx]) = by_stem.get(&stem).map(Vec::as_slice) {
            if claimed.insert(*idx) {
                frame.label = Some(*idx);
            }
        }
    }

    // A duplicate of a label that never landed on a frame is just unmatched.
    let (duplicate_labels, unmatched_duplicates): (Vec<_>, Vec<_>) = duplicate_labels
        .into_iter()
        .partition(|dup| claimed.contains(&dup.kept));

    let mut unmatched_labels: Vec<usize> = by_key
        .values()
        .copied()
        .filter(|idx| !claimed.contains(idx))
        .chain(unmatched_duplicates.into_iter().map(|dup| dup.dropped))
        .collect();
    unmatched_labels.sort_by(|&a, &b| {
        compare_relative_paths(labels[a].relative_path(), labels[b].relative_path())
    });

    Alignment {
        frames,
        unmatched_labels,
        duplicate_labels,
    }
}
