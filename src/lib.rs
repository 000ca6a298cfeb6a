//! Longan - an in-memory model of PresentationML (.pptx) packages
//!
//! A package is read from its ZIP container under configurable size limits, its
//! XML parts are decoded lazily on first access, and structural edits keep the
//! slide list, the relationships and the content type declarations consistent.
//! Saving writes a deterministic archive; parts that were never decoded are copied
//! byte for byte.
//!
//! # Features
//!
//! - **Bounded ingest**: a whole-archive size limit and a per-part limit above which
//!   parts are kept in temporary files instead of memory
//! - **Lazy decoding**: parts are parsed once, on first access, and shared as
//!   lockable handles
//! - **Slide index**: add and remove slides with monotonic ids
//! - **Dialects**: Strict documents are read as Transitional
//!
//! # Example
//!
//! ```no_run
//! use longan::{Options, Package};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let opts = Options::new().with_unzip_xml_size_limit(4 << 20);
//! let mut pkg = Package::open_with_options("presentation.pptx", opts)?;
//!
//! for id in pkg.slide_ids()? {
//!     for shape in pkg.shapes(id)? {
//!         println!("slide {}: {}", id, shape.text());
//!     }
//! }
//!
//! let id = pkg.add_slide()?;
//! pkg.set_slide_name(id, "Summary")?;
//! pkg.save_as("presentation-2.pptx")?;
//! pkg.close()?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod opc;
pub mod options;
pub mod pptx;

pub use error::{Error, Result};
pub use options::{Limits, Options};
pub use pptx::Package;
