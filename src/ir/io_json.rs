//! JSON serialization for the unified annotation document.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use super::model::UnifiedDocument;
use crate::error::FramelabelError;

/// Reads a unified annotation document from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn read_document(path: &Path) -> Result<UnifiedDocument, FramelabelError> {
    let file = File::open(path).map_err(FramelabelError::Io)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| FramelabelError::DocumentParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a unified annotation document as pretty-printed JSON.
///
/// The document is serialized in memory first, so a serialization failure
/// never leaves a truncated file behind.
///
/// # Errors
/// Returns an error if the document cannot be serialized or written.
pub fn write_document(path: &Path, document: &UnifiedDocument) -> Result<(), FramelabelError> {
    let json = to_json_string(document).map_err(|source| FramelabelError::DocumentWrite {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(FramelabelError::Io)?;
    }
    fs::write(path, json).map_err(FramelabelError::Io)
}

/// Reads a document from a JSON string.
///
/// Useful for testing without file I/O.
pub fn from_json_str(json: &str) -> Result<UnifiedDocument, serde_json::Error> {
    serde_json::from_str(json)
}

/// Writes a document to a pretty JSON string.
///
/// Useful for testing without file I/O.
pub fn to_json_string(document: &UnifiedDocument) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{AnnotationEntry, CategoryEntry, DocumentInfo, ImageEntry, Point, Polygon};

    fn sample_document() -> UnifiedDocument {
        let polygon = Polygon::new(vec![
            Point::new(1.0, 1.0),
            Point::new(9.0, 1.0),
            Point::new(5.0, 7.0),
        ]);
        UnifiedDocument {
            info: DocumentInfo {
                bundle_path: Some("bundle.mp4".into()),
                frame_count: 2,
                frames_without_labels: vec!["b.jpg".into()],
                ..Default::default()
            },
            images: vec![
                ImageEntry::new(1u64, "a.jpg", 640, 480)
                    .with_source("a.json")
                    .with_frame_index(Some(0)),
                ImageEntry::new(2u64, "b.jpg", 640, 480).with_frame_index(Some(1)),
            ],
            annotations: vec![AnnotationEntry::from_polygon(
                1u64, 1u64, 1u64, &polygon, "a.json",
            )],
            categories: vec![CategoryEntry::new(1u64, "car")],
        }
    }

    #[test]
    fn test_json_roundtrip() {
        let original = sample_document();

        let json = to_json_string(&original).expect("serialization failed");
        let restored = from_json_str(&json).expect("deserialization failed");

        assert_eq!(restored.images, original.images);
        assert_eq!(restored.annotations, original.annotations);
        assert_eq!(restored.categories, original.categories);
        assert_eq!(restored.info.frames_without_labels, vec!["b.jpg"]);
        assert_eq!(restored.info.bundle_path.as_deref(), Some("bundle.mp4"));
    }

    #[test]
    fn test_json_key_order() {
        let json = to_json_string(&sample_document()).expect("serialization failed");

        let info = json.find("\"info\"").expect("info");
        let images = json.find("\"images\"").expect("images");
        let annotations = json.find("\"annotations\"").expect("annotations");
        let categories = json.find("\"categories\"").expect("categories");
        assert!(info < images && images < annotations && annotations < categories);
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("nested/out/unified.json");

        write_document(&path, &sample_document()).expect("write");
        let restored = read_document(&path).expect("read back");
        assert_eq!(restored.images.len(), 2);
    }
}
