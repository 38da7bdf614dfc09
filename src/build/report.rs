//! Build report types for tracking non-fatal decisions made during a build.
//!
//! Every warning logged while assembling a document also lands here, so the
//! CLI can print (or emit as JSON) exactly what was skipped or assumed.

use serde::Serialize;
use std::fmt;

/// A report generated while assembling a unified document.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BuildReport {
    /// Label files discovered under the labels directory.
    pub labels_discovered: usize,
    /// Frames in the manifest (0 when no manifest was used).
    pub manifest_frames: usize,
    /// Counts in the emitted document.
    pub output: BuildCounts,
    /// Issues encountered while building.
    pub issues: Vec<BuildIssue>,
}

impl BuildReport {
    pub fn add(&mut self, issue: BuildIssue) {
        self.issues.push(issue);
    }

    pub fn warning_count(&self) -> usize {
        self.count(BuildSeverity::Warning)
    }

    pub fn info_count(&self) -> usize {
        self.count(BuildSeverity::Info)
    }

    /// Issues with the given code.
    pub fn issues_with(&self, code: BuildIssueCode) -> impl Iterator<Item = &BuildIssue> {
        self.issues.iter().filter(move |i| i.code == code)
    }

    fn count(&self, severity: BuildSeverity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "  {} images, {} categories, {} annotations",
            self.output.images, self.output.categories, self.output.annotations
        )?;
        writeln!(
            f,
            "  {} label file(s) discovered, {} frame(s) without labels",
            self.labels_discovered, self.output.frames_without_labels
        )?;

        for (title, severity) in [
            ("Warnings", BuildSeverity::Warning),
            ("Notes", BuildSeverity::Info),
        ] {
            let count = self.count(severity);
            if count == 0 {
                continue;
            }
            writeln!(f)?;
            writeln!(f, "{} ({}):", title, count)?;
            for issue in self.issues.iter().filter(|i| i.severity == severity) {
                writeln!(f, "  - {}", issue.message)?;
            }
        }

        Ok(())
    }
}

/// Counts of document elements.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BuildCounts {
    pub images: usize,
    pub categories: usize,
    pub annotations: usize,
    pub frames_without_labels: usize,
}

/// A single issue raised during a build.
#[derive(Clone, Debug, Serialize)]
pub struct BuildIssue {
    pub severity: BuildSeverity,
    pub code: BuildIssueCode,
    pub message: String,
}

impl BuildIssue {
    pub fn warning(code: BuildIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: BuildSeverity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn info(code: BuildIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: BuildSeverity::Info,
            code,
            message: message.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildSeverity {
    /// Data was dropped or assumed.
    Warning,
    /// A policy decision worth knowing about.
    Info,
}

/// Stable issue codes for programmatic consumption.
///
/// These codes are part of the JSON report and should remain stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildIssueCode {
    /// A malformed label was skipped instead of aborting the run.
    LabelIsolated,
    /// A label's image was not found under the image root and was skipped.
    MissingImageSkipped,
    /// A label file matched no manifest frame.
    LabelWithoutFrame,
    /// Two label files describe the same frame; the later one was dropped.
    DuplicateLabel,
    /// Label dimensions disagree with the image on disk.
    DimensionConflict,
    /// An unlabeled frame's size could not be determined.
    UnknownDimensions,
    /// Frames were ordered by label file name because no manifest was used.
    NoManifestOrdering,
}
