use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationReport;

/// The main error type for framelabel operations.
#[derive(Debug, Error)]
pub enum FramelabelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed label file {path}: {message}")]
    MalformedLabel { path: PathBuf, message: String },

    #[error("Unsupported shape type '{shape_type}' in {path} (shape #{index}); expected 'polygon' or 'rectangle'")]
    UnsupportedShape {
        path: PathBuf,
        index: usize,
        shape_type: String,
    },

    #[error("Image '{image}' declared by {label} was not found under {image_root}")]
    MissingImage {
        label: PathBuf,
        image: String,
        image_root: PathBuf,
    },

    #[error("Frame manifest is inconsistent: {message}")]
    ManifestIntegrity { message: String },

    #[error("A frame manifest is required but {reason}")]
    ManifestRequired { reason: String },

    #[error("Failed to parse frame manifest from {source_name}: {source}")]
    ManifestParse {
        source_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to discover label files under {path}: {message}")]
    LabelDiscovery { path: PathBuf, message: String },

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageDimensionRead {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Failed to parse unified annotation document from {path}: {source}")]
    DocumentParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write unified annotation document to {path}: {source}")]
    DocumentWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write restored label file {path}: {message}")]
    RestoreWrite { path: PathBuf, message: String },

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },
}

impl FramelabelError {
    /// Builds a [`FramelabelError::MalformedLabel`] for `path`.
    pub(crate) fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::MalformedLabel {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns true for failures that `isolate_label_failures` may downgrade.
    ///
    /// Unsupported shapes always abort the run.
    pub fn is_isolatable(&self) -> bool {
        matches!(self, Self::MalformedLabel { .. })
    }
}
