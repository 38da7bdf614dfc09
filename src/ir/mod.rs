//! In-memory representation of the unified annotation document.
//!
//! # Design Principles
//!
//! 1. **Type Safety**: Newtype IDs keep image, annotation and category
//!    identifiers from being mixed up.
//!
//! 2. **One Geometry**: Every shape becomes a [`Polygon`]; bbox and area are
//!    always derived from it, never from raw label coordinates.
//!
//! 3. **Permissive Construction**: Types allow "invalid" data to be
//!    represented (e.g., negative coordinates), so that validation can
//!    report issues rather than panic while reading a document.
//!
//! # Example
//!
//! ```
//! use framelabel::ir::{AnnotationEntry, CategoryEntry, ImageEntry, Point, Polygon, UnifiedDocument};
//!
//! let car = Polygon::from_corners(Point::new(10.0, 10.0), Point::new(50.0, 40.0));
//! let document = UnifiedDocument {
//!     images: vec![ImageEntry::new(1u64, "a.jpg", 640, 480).with_frame_index(Some(0))],
//!     annotations: vec![AnnotationEntry::from_polygon(1u64, 1u64, 1u64, &car, "a.json")],
//!     categories: vec![CategoryEntry::new(1u64, "car")],
//!     ..Default::default()
//! };
//! assert_eq!(document.annotations[0].area, 1200.0);
//! ```

mod bbox;
mod coord;
mod ids;
pub mod io_json;
mod model;
mod polygon;

// Re-export core types for convenient access
pub use bbox::BBoxXYXY;
pub use coord::Point;
pub(crate) use ids::IdCounter;
pub use ids::{AnnotationId, CategoryId, ImageId};
pub use model::{
    AnnotationEntry, CategoryEntry, DocumentInfo, ImageEntry, UnifiedDocument, DOCUMENT_VERSION,
    UNKNOWN_DIMENSION,
};
pub use polygon::Polygon;
