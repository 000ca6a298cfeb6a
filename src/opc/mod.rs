/// Open Packaging Conventions (OPC) plumbing.
///
/// Everything here is independent of the presentation vocabulary:
///
/// - Package structure (part names, relationships, content types)
/// - Raw part storage with disk-backed overflow for oversized parts
/// - Lazy decoding through the [`XmlPart`] codec trait
/// - Namespace compatibility between the Strict and Transitional dialects
/// - ZIP ingest and assembly
///
/// # Performance Features
///
/// - Uses `aho-corasick` for multi-pattern byte substitution
/// - Uses `memchr` for fast byte searching in encoded parts
/// - Uses `atoi_simd` for fast integer parsing
/// - Uses `quick-xml` pull parsing over borrowed slices

pub mod cache;
pub mod compat;
pub mod constants;
pub mod content_types;
pub mod overflow;
pub mod packuri;
pub mod part;
pub mod pkgreader;
pub mod pkgwriter;
pub mod rel;
pub mod store;
pub mod xml;

// Re-export commonly used types
pub use cache::PartCache;
pub use compat::{NamespaceRegistry, XmlAttr};
pub use content_types::ContentTypes;
pub use overflow::OverflowBuffer;
pub use packuri::PackURI;
pub use part::{PartHandle, XmlPart};
pub use rel::{Relationship, Relationships};
pub use store::PartStore;
