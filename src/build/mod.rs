//! Unified document assembly.
//!
//! A build runs in two phases:
//!
//! 1. **Parse** (parallel): every label file under the labels root is read
//!    and normalized (see [`crate::label::discover_label_files`]).
//! 2. **Fold** (sequential): the aligned frames are walked in order, image
//!    and annotation IDs are handed out, and labels are resolved to
//!    categories. Because the fold is the only place IDs are assigned, the
//!    output is a pure function of the inputs.
//!
//! Nothing is written here; the caller serializes the finished document in
//! one step, so a failed build never leaves a partial file behind.

pub mod report;
mod registry;

pub use registry::CategoryRegistry;
pub use report::{BuildCounts, BuildIssue, BuildIssueCode, BuildReport, BuildSeverity};

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::error::FramelabelError;
use crate::ir::{
    AnnotationEntry, AnnotationId, DocumentInfo, IdCounter, ImageEntry, ImageId, UnifiedDocument,
    UNKNOWN_DIMENSION,
};
use crate::label::{
    compare_relative_paths, discover_label_files, image_reference_key, LabelFile, LabelRecord,
};
use crate::manifest::{align, AlignedFrame, ManifestPolicy, ManifestSource};

/// Extensions tried when an image is looked up by stem.
const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "png", "jpeg", "bmp", "webp"];

/// Options for a single build.
#[derive(Clone, Debug, Default)]
pub struct BuildOptions {
    /// Skip labels whose image is absent under `image_root` instead of failing.
    pub skip_missing_images: bool,
    /// Fail when no manifest can be found.
    pub require_manifest: bool,
    /// Ignore any manifest and order frames by label file name.
    pub skip_manifest: bool,
    /// Directory the label images live under. When unset, images are not
    /// checked and unlabeled frames get the unknown-dimension sentinel.
    pub image_root: Option<PathBuf>,
    /// Skip malformed labels instead of failing.
    pub isolate_label_failures: bool,
    /// Overrides the bundle path recorded in `info`.
    pub bundle_path: Option<String>,
    /// Free-text description recorded in `info`.
    pub description: Option<String>,
}

impl BuildOptions {
    /// The manifest lookup policy these options imply.
    pub fn manifest_policy(&self) -> ManifestPolicy {
        ManifestPolicy {
            require_manifest: self.require_manifest,
            skip_manifest: self.skip_manifest,
        }
    }
}

/// A finished build: the document plus what happened along the way.
#[derive(Clone, Debug)]
pub struct BuildOutcome {
    pub document: UnifiedDocument,
    pub report: BuildReport,
}

/// Discovers, parses and folds every label file under `labels_dir`.
pub fn build_document(
    labels_dir: &Path,
    manifest: &ManifestSource,
    options: &BuildOptions,
) -> Result<BuildOutcome, FramelabelError> {
    let labels = discover_label_files(labels_dir)?;
    info!(
        "parsed {} label file(s) from {}",
        labels.len(),
        labels_dir.display()
    );
    assemble(labels, manifest, options)
}

/// Folds already-parsed label files into a unified document.
///
/// # Errors
/// A malformed label (unless isolated) or an unsupported shape in any label
/// file, including ones that match no frame; otherwise the first missing
/// image (unless skipped) in frame order.
pub fn assemble(
    labels: Vec<LabelFile>,
    manifest: &ManifestSource,
    options: &BuildOptions,
) -> Result<BuildOutcome, FramelabelError> {
    let alignment = align(manifest, &labels);

    let mut names = Vec::with_capacity(labels.len());
    let mut parsed = Vec::with_capacity(labels.len());
    for label in labels {
        names.push(LabelName {
            relative_path: label.relative_path,
            image_ref: label.image_ref,
        });
        parsed.push(Some(label.parsed));
    }

    let mut asm = Assembler::new(options);
    asm.report.labels_discovered = names.len();

    match manifest.manifest() {
        Some(manifest) => {
            asm.report.manifest_frames = manifest.len();
            asm.info.frame_manifest = Some(manifest.origin.clone());
        }
        None => asm.report.add(BuildIssue::info(
            BuildIssueCode::NoManifestOrdering,
            "no manifest: frames ordered by label file path",
        )),
    }
    asm.info.bundle_path = options.bundle_path.clone().or_else(|| {
        manifest
            .manifest()
            .and_then(|m| m.resolved_bundle_path())
            .map(str::to_string)
    });

    asm.info.frames_without_labels = alignment
        .frames_without_labels()
        .map(str::to_string)
        .collect();

    // Labels that never reach the fold still have to parse. A broken label's
    // image reference is only a guess, so it may have missed its frame.
    let unemitted = alignment
        .duplicate_labels
        .iter()
        .map(|dup| dup.dropped)
        .chain(alignment.unmatched_labels.iter().copied());
    let mut broken = Vec::new();
    for idx in unemitted {
        match parsed[idx].take() {
            Some(Err(err)) if options.isolate_label_failures && err.is_isolatable() => {
                warn!("skipping label: {err}");
                asm.report.add(BuildIssue::warning(
                    BuildIssueCode::LabelIsolated,
                    err.to_string(),
                ));
                asm.info.skipped_labels.push(names[idx].relative_path.clone());
                broken.push(idx);
            }
            Some(Err(err)) => return Err(err),
            _ => {}
        }
    }

    for dup in alignment
        .duplicate_labels
        .iter()
        .filter(|dup| !broken.contains(&dup.dropped))
    {
        let dropped = &names[dup.dropped].relative_path;
        let kept = &names[dup.kept].relative_path;
        warn!("{dropped} describes the same image as {kept}; keeping {kept}");
        asm.report.add(BuildIssue::warning(
            BuildIssueCode::DuplicateLabel,
            format!("{dropped}: same image as {kept}, dropped"),
        ));
        asm.info.skipped_labels.push(dropped.clone());
    }

    for &idx in alignment
        .unmatched_labels
        .iter()
        .filter(|idx| !broken.contains(idx))
    {
        let name = &names[idx];
        warn!(
            "{} (image {}) matches no manifest frame; not emitted",
            name.relative_path, name.image_ref
        );
        asm.report.add(BuildIssue::warning(
            BuildIssueCode::LabelWithoutFrame,
            format!("{}: no manifest frame for {}", name.relative_path, name.image_ref),
        ));
        asm.info.labels_without_frames.push(name.relative_path.clone());
    }

    for frame in &alignment.frames {
        let Some(idx) = frame.label else {
            asm.push_placeholder(frame, None);
            continue;
        };
        let Some(outcome) = parsed[idx].take() else {
            continue;
        };
        let name = &names[idx];

        match outcome {
            Ok(record) => asm.push_labeled(frame, name, record)?,
            Err(err) if options.isolate_label_failures && err.is_isolatable() => {
                warn!("skipping label: {err}");
                asm.report.add(BuildIssue::warning(
                    BuildIssueCode::LabelIsolated,
                    err.to_string(),
                ));
                asm.info.skipped_labels.push(name.relative_path.clone());
                asm.push_placeholder(frame, None);
            }
            Err(err) => return Err(err),
        }
    }

    Ok(asm.finish())
}

struct LabelName {
    relative_path: String,
    image_ref: String,
}

struct Assembler<'a> {
    options: &'a BuildOptions,
    image_ids: IdCounter,
    annotation_ids: IdCounter,
    registry: CategoryRegistry,
    images: Vec<ImageEntry>,
    annotations: Vec<AnnotationEntry>,
    info: DocumentInfo,
    report: BuildReport,
}

impl<'a> Assembler<'a> {
    fn new(options: &'a BuildOptions) -> Self {
        Self {
            options,
            image_ids: IdCounter::new(),
            annotation_ids: IdCounter::new(),
            registry: CategoryRegistry::new(),
            images: Vec::new(),
            annotations: Vec::new(),
            info: DocumentInfo {
                description: options.description.clone(),
                ..Default::default()
            },
            report: BuildReport::default(),
        }
    }

    fn push_labeled(
        &mut self,
        frame: &AlignedFrame,
        name: &LabelName,
        record: LabelRecord,
    ) -> Result<(), FramelabelError> {
        let options = self.options;
        if let Some(root) = &options.image_root {
            match locate_image(root, &[&frame.relative_path, &name.image_ref]) {
                Some(path) => self.check_dimensions(&path, &name.relative_path, &record),
                None if options.skip_missing_images => {
                    warn!(
                        "image {} for {} not found under {}; skipping label",
                        name.image_ref,
                        name.relative_path,
                        root.display()
                    );
                    self.report.add(BuildIssue::warning(
                        BuildIssueCode::MissingImageSkipped,
                        format!("{}: image {} not found", name.relative_path, name.image_ref),
                    ));
                    self.info.skipped_labels.push(name.relative_path.clone());
                    self.push_placeholder(frame, Some((record.image_width, record.image_height)));
                    return Ok(());
                }
                None => {
                    return Err(FramelabelError::MissingImage {
                        label: record.source_path,
                        image: name.image_ref.clone(),
                        image_root: root.clone(),
                    });
                }
            }
        }

        let image_id: ImageId = self.image_ids.next_id();
        self.images.push(
            ImageEntry::new(
                image_id,
                frame.relative_path.clone(),
                record.image_width,
                record.image_height,
            )
            .with_source(name.relative_path.clone())
            .with_frame_index(frame.frame_index),
        );

        for shape in &record.shapes {
            let category_id = self.registry.resolve(&shape.label);
            self.annotations.push(AnnotationEntry::from_polygon(
                self.annotation_ids.next_id::<AnnotationId>(),
                image_id,
                category_id,
                &shape.polygon,
                name.relative_path.clone(),
            ));
        }

        debug!(
            "frame {} <- {} ({} shape(s))",
            frame.relative_path,
            name.relative_path,
            record.shapes.len()
        );
        Ok(())
    }

    /// An image-only entry. Only manifest frames get one; without a manifest
    /// a frame exists only through its label.
    fn push_placeholder(&mut self, frame: &AlignedFrame, known: Option<(u32, u32)>) {
        if frame.frame_index.is_none() {
            return;
        }

        let (width, height) = known
            .or_else(|| self.probe_frame(frame))
            .unwrap_or_else(|| {
                self.info
                    .frames_with_unknown_dimensions
                    .push(frame.relative_path.clone());
                self.report.add(BuildIssue::info(
                    BuildIssueCode::UnknownDimensions,
                    format!(
                        "{}: size unknown, written as {UNKNOWN_DIMENSION}x{UNKNOWN_DIMENSION}",
                        frame.relative_path
                    ),
                ));
                (UNKNOWN_DIMENSION, UNKNOWN_DIMENSION)
            });

        let image_id: ImageId = self.image_ids.next_id();
        self.images.push(
            ImageEntry::new(image_id, frame.relative_path.clone(), width, height)
                .with_frame_index(frame.frame_index),
        );
    }

    fn probe_frame(&self, frame: &AlignedFrame) -> Option<(u32, u32)> {
        let root = self.options.image_root.as_ref()?;
        let path = locate_image(root, &[&frame.relative_path])?;
        match read_image_dimensions(&path) {
            Ok(dims) => Some(dims),
            Err(err) => {
                warn!("{err}");
                None
            }
        }
    }

    fn check_dimensions(&mut self, image: &Path, label: &str, record: &LabelRecord) {
        let (width, height) = match read_image_dimensions(image) {
            Ok(dims) => dims,
            Err(err) => {
                warn!("{err}; keeping label dimensions");
                return;
            }
        };
        if (width, height) == (record.image_width, record.image_height) {
            return;
        }

        let message = format!(
            "{label}: label says {}x{}, {} is {width}x{height}; keeping label dimensions",
            record.image_width,
            record.image_height,
            image.display()
        );
        warn!("{message}");
        self.report.add(BuildIssue::warning(
            BuildIssueCode::DimensionConflict,
            message,
        ));
    }

    fn finish(mut self) -> BuildOutcome {
        self.info.frame_count = self.images.len();
        self.info
            .skipped_labels
            .sort_by(|a, b| compare_relative_paths(a, b));

        self.report.output = BuildCounts {
            images: self.images.len(),
            categories: self.registry.len(),
            annotations: self.annotations.len(),
            frames_without_labels: self.info.frames_without_labels.len(),
        };
        info!(
            "built document: {} images, {} annotations, {} categories",
            self.report.output.images,
            self.report.output.annotations,
            self.report.output.categories
        );

        BuildOutcome {
            document: UnifiedDocument {
                info: self.info,
                images: self.images,
                annotations: self.annotations,
                categories: self.registry.into_categories(),
            },
            report: self.report,
        }
    }
}

/// Finds an image under `root` for any of `references`: as written, then
/// flattened to the file name, then by stem with a known image extension.
fn locate_image(root: &Path, references: &[&str]) -> Option<PathBuf> {
    let direct = references.iter().map(|r| root.join(r));
    let flat = references
        .iter()
        .map(|r| root.join(r.rsplit('/').next().unwrap_or(r)));

    if let Some(found) = direct.chain(flat).find(|p| p.is_file()) {
        return Some(found);
    }

    references.iter().find_map(|reference| {
        let key = image_reference_key(reference);
        let stem = key.rsplit('/').next().unwrap_or(&key).to_string();
        let found = [key, stem].iter().find_map(|base| {
            IMAGE_EXTENSIONS
                .iter()
                .map(|ext| root.join(format!("{base}.{ext}")))
                .find(|p| p.is_file())
        });
        found
    })
}

fn read_image_dimensions(path: &Path) -> Result<(u32, u32), FramelabelError> {
    let dimension_err = |source| FramelabelError::ImageDimensionRead {
        path: path.to_path_buf(),
        source,
    };
    let size = imagesize::size(path).map_err(dimension_err)?;

    let width = u32::try_from(size.width)
        .map_err(|_| dimension_err(imagesize::ImageError::CorruptedImage))?;
    let height = u32::try_from(size.height)
        .map_err(|_| dimension_err(imagesize::ImageError::CorruptedImage))?;
    Ok((width, height))
}
