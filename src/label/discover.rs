//! Label file discovery and the parallel parse step.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use log::debug;
use rayon::prelude::*;
use walkdir::WalkDir;

use super::{parse_label_file, LabelRecord};
use crate::error::FramelabelError;

const LABEL_EXTENSION: &str = "json";

/// Image extension assumed when a label does not declare `imagePath`.
const FALLBACK_IMAGE_EXTENSION: &str = "jpg";

/// A discovered label file and the outcome of parsing it.
#[derive(Debug)]
pub struct LabelFile {
    pub path: PathBuf,
    /// Path relative to the labels root, `/`-separated.
    pub relative_path: String,
    /// The image this label describes, normalized (see [`normalize_image_ref`]).
    pub image_ref: String,
    pub parsed: Result<LabelRecord, FramelabelError>,
}

/// Finds every `.json` file under `root` and parses them in parallel.
///
/// The result is sorted by relative path. Parse failures are kept per file
/// so the caller decides whether they are fatal.
pub fn discover_label_files(root: &Path) -> Result<Vec<LabelFile>, FramelabelError> {
    if !root.is_dir() {
        return Err(FramelabelError::LabelDiscovery {
            path: root.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|source| FramelabelError::LabelDiscovery {
            path: root.to_path_buf(),
            message: format!("failed while traversing directory: {source}"),
        })?;

        if entry.file_type().is_file() && has_label_extension(entry.path()) {
            paths.push(entry.path().to_path_buf());
        }
    }

    let mut relative: Vec<(String, PathBuf)> = paths
        .into_iter()
        .map(|path| (rel_string(root, &path), path))
        .collect();
    relative.sort_by(|a, b| compare_relative_paths(&a.0, &b.0));
    debug!("discovered {} label file(s) under {}", relative.len(), root.display());

    let files = relative
        .into_par_iter()
        .map(|(relative_path, path)| {
            let parsed = parse_label_file(&path);
            let image_ref = parsed
                .as_ref()
                .ok()
                .and_then(|record| record.image_path.as_deref())
                .map(normalize_image_ref)
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| fallback_image_ref(&relative_path));
            LabelFile {
                path,
                relative_path,
                image_ref,
                parsed,
            }
        })
        .collect();

    Ok(files)
}

/// Frame order of relative paths: case-insensitive, ties broken by the raw
/// path. The bundler orders frames the same way when run without a manifest.
pub fn compare_relative_paths(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Normalizes a declared image path for matching and output.
///
/// Backslashes become `/`, empty and `.` components are dropped. Paths that
/// escape upwards (`..`) or carry a drive letter collapse to their file
/// name.
pub fn normalize_image_ref(raw: &str) -> String {
    let unified = raw.replace('\\', "/");
    let parts: Vec<&str> = unified
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();

    let escapes = parts.iter().any(|part| *part == "..");
    let has_drive = parts.first().map(|p| p.contains(':')).unwrap_or(false);
    if escapes || has_drive {
        return parts.last().map(|p| p.to_string()).unwrap_or_default();
    }
    parts.join("/")
}

/// The key two image references are compared by: the normalized path with
/// the final extension removed.
pub fn image_reference_key(image_ref: &str) -> String {
    let normalized = normalize_image_ref(image_ref);
    let (dir, file) = match normalized.rfind('/') {
        Some(pos) => normalized.split_at(pos + 1),
        None => ("", normalized.as_str()),
    };
    let stem = match file.rfind('.') {
        Some(0) | None => file,
        Some(pos) => &file[..pos],
    };
    format!("{dir}{stem}")
}

/// The file stem of an image reference (no directories, no extension).
pub(crate) fn image_stem_key(image_ref: &str) -> String {
    let key = image_reference_key(image_ref);
    match key.rfind('/') {
        Some(pos) => key[pos + 1..].to_string(),
        None => key,
    }
}

fn fallback_image_ref(label_relative_path: &str) -> String {
    let stem = image_reference_key(label_relative_path);
    format!("{stem}.{FALLBACK_IMAGE_EXTENSION}")
}

fn has_label_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(LABEL_EXTENSION))
        .unwrap_or(false)
}

fn rel_string(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}
