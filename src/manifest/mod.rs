//! Frame manifests produced by the media bundler.
//!
//! A manifest lists, for every frame in the bundle, its `frame_index` and the
//! image path it was encoded from. Two layouts are accepted:
//!
//! - a wrapped document: `{"bundle_path": ..., "images": [entry, ...]}`
//!   (`frames` is accepted in place of `images`, `video_file` in place of
//!   `bundle_path`);
//! - a bare JSON array of entries.
//!
//! Entries are `{"frame_index": 0, "relative_path": "a.jpg"}` with an
//! optional per-entry `bundle_path`. Unknown fields are ignored.
//!
//! Frame indices must cover `0..N` exactly once; anything else is a
//! [`FramelabelError::ManifestIntegrity`] error.

mod align;

pub use align::{align, AlignedFrame, Alignment, DuplicateLabel, LabelSource};

use std::fs;
use std::io::Read;
use std::path::Path;

use log::{info, warn};
use serde::Deserialize;

use crate::error::FramelabelError;

/// Name used for a manifest read from standard input.
pub const STDIN_MANIFEST: &str = "-";

/// One frame of the media bundle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameManifestEntry {
    pub frame_index: u64,
    pub relative_path: String,
    pub bundle_path: Option<String>,
}

impl FrameManifestEntry {
    pub fn new(frame_index: u64, relative_path: impl Into<String>) -> Self {
        Self {
            frame_index,
            relative_path: relative_path.into(),
            bundle_path: None,
        }
    }
}

/// A validated manifest: entries sorted by `frame_index`, indices `0..N`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameManifest {
    /// Where the manifest was read from (a path, or `-` for stdin).
    pub origin: String,
    /// Document-level bundle path, if the manifest carried one.
    pub bundle_path: Option<String>,
    entries: Vec<FrameManifestEntry>,
}

impl FrameManifest {
    /// Validates and orders `entries`.
    ///
    /// # Errors
    /// [`FramelabelError::ManifestIntegrity`] on duplicate or missing frame
    /// indices.
    pub fn from_entries(
        origin: impl Into<String>,
        bundle_path: Option<String>,
        mut entries: Vec<FrameManifestEntry>,
    ) -> Result<Self, FramelabelError> {
        entries.sort_by_key(|entry| entry.frame_index);

        for (position, entry) in entries.iter().enumerate() {
            let expected = position as u64;
            if entry.frame_index == expected {
                continue;
            }
            let message = if position > 0 && entries[position - 1].frame_index == entry.frame_index
            {
                format!(
                    "frame_index {} appears more than once ('{}' and '{}')",
                    entry.frame_index,
                    entries[position - 1].relative_path,
                    entry.relative_path
                )
            } else {
                format!(
                    "frame_index {} is missing (next index present is {} for '{}')",
                    expected, entry.frame_index, entry.relative_path
                )
            };
            return Err(FramelabelError::ManifestIntegrity { message });
        }

        Ok(Self {
            origin: origin.into(),
            bundle_path,
            entries,
        })
    }

    /// Entries in ascending `frame_index` order.
    pub fn entries(&self) -> &[FrameManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The bundle the frames belong to: the document-level path, falling
    /// back to the first entry that names one.
    pub fn resolved_bundle_path(&self) -> Option<&str> {
        self.bundle_path
            .as_deref()
            .or_else(|| self.entries.iter().find_map(|e| e.bundle_path.as_deref()))
    }
}

/// The optional side input to a build, decided once up front.
#[derive(Clone, Debug, PartialEq)]
pub enum ManifestSource {
    Manifest(FrameManifest),
    NoManifest,
}

impl ManifestSource {
    pub fn manifest(&self) -> Option<&FrameManifest> {
        match self {
            Self::Manifest(manifest) => Some(manifest),
            Self::NoManifest => None,
        }
    }
}

/// How a manifest should be located for a build.
#[derive(Clone, Copy, Debug, Default)]
pub struct ManifestPolicy {
    pub require_manifest: bool,
    pub skip_manifest: bool,
}

/// Decides the [`ManifestSource`] for a build.
///
/// `input` is a file path, `-` for stdin, or `None`.
///
/// - `skip_manifest` ignores any input;
/// - a missing input (or a path that does not exist) falls back to
///   [`ManifestSource::NoManifest`] unless `require_manifest` is set, in
///   which case it is [`FramelabelError::ManifestRequired`];
/// - a manifest that exists but cannot be parsed is always an error.
pub fn resolve_manifest(
    input: Option<&Path>,
    policy: ManifestPolicy,
) -> Result<ManifestSource, FramelabelError> {
    if policy.skip_manifest {
        if policy.require_manifest {
            return Err(FramelabelError::ManifestRequired {
                reason: "manifest loading was disabled".to_string(),
            });
        }
        info!("manifest disabled; ordering frames by label file name");
        return Ok(ManifestSource::NoManifest);
    }

    let Some(input) = input else {
        if policy.require_manifest {
            return Err(FramelabelError::ManifestRequired {
                reason: "none was supplied".to_string(),
            });
        }
        info!("no manifest supplied; ordering frames by label file name");
        return Ok(ManifestSource::NoManifest);
    };

    if input == Path::new(STDIN_MANIFEST) {
        let mut buffer = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buffer)
            .map_err(FramelabelError::Io)?;
        return read_manifest_slice(&buffer, STDIN_MANIFEST).map(ManifestSource::Manifest);
    }

    if !input.is_file() {
        if policy.require_manifest {
            return Err(FramelabelError::ManifestRequired {
                reason: format!("{} does not exist", input.display()),
            });
        }
        warn!(
            "manifest {} not found; ordering frames by label file name",
            input.display()
        );
        return Ok(ManifestSource::NoManifest);
    }

    read_manifest(input).map(ManifestSource::Manifest)
}

/// Reads and validates a manifest file.
pub fn read_manifest(path: &Path) -> Result<FrameManifest, FramelabelError> {
    let bytes = fs::read(path).map_err(FramelabelError::Io)?;
    read_manifest_slice(&bytes, &path.display().to_string())
}

/// Parses and validates a manifest from raw bytes; `origin` names it in
/// errors and in the built document.
pub fn read_manifest_slice(bytes: &[u8], origin: &str) -> Result<FrameManifest, FramelabelError> {
    let parse_err = |source| FramelabelError::ManifestParse {
        source_name: origin.to_string(),
        source,
    };

    let value: serde_json::Value = serde_json::from_slice(bytes).map_err(parse_err)?;
    let (bundle_path, raw_entries) = if value.is_array() {
        let entries: Vec<RawEntry> = serde_json::from_value(value).map_err(parse_err)?;
        (None, entries)
    } else {
        let doc: RawManifestFile = serde_json::from_value(value).map_err(parse_err)?;
        (doc.bundle_path, doc.images)
    };

    let entries = raw_entries
        .into_iter()
        .map(|raw| FrameManifestEntry {
            frame_index: raw.frame_index,
            relative_path: raw.relative_path,
            bundle_path: raw.bundle_path.or_else(|| bundle_path.clone()),
        })
        .collect();

    let manifest = FrameManifest::from_entries(origin, bundle_path, entries)?;
    info!("loaded manifest {} with {} frame(s)", origin, manifest.len());
    Ok(manifest)
}

/// Fuzz-only entrypoint for manifest parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_manifest(bytes: &[u8]) -> Result<(), FramelabelError> {
    let _ = read_manifest_slice(bytes, "<fuzz>")?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RawManifestFile {
    #[serde(default, alias = "video_file")]
    bundle_path: Option<String>,

    #[serde(alias = "frames")]
    images: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    frame_index: u64,
    relative_path: String,
    #[serde(default)]
    bundle_path: Option<String>,
}
