//! PowerPoint (.pptx) presentation support.
//!
//! This module builds the presentation model on top of the [`crate::opc`] plumbing:
//!
//! - [`Package`]: the container; open, edit, save and close a package
//! - [`Presentation`]: the main part, with its slide list and slide size
//! - [`Slide`]: one slide's shape tree
//! - [`Theme`]: the document theme (read-only)
//!
//! # Example
//!
//! ```rust,no_run
//! use longan::pptx::{Package, Transform};
//!
//! let mut pkg = Package::open("presentation.pptx")?;
//! let id = pkg.add_slide()?;
//! pkg.slide(id)?
//!     .write()
//!     .add_text_box(Transform::new(914400, 914400, 4572000, 914400), "Hello");
//! pkg.save()?;
//! pkg.close()?;
//! # Ok::<(), longan::Error>(())
//! ```

mod graph;
pub mod package;
pub mod presentation;
pub mod slide;
mod slides;
pub mod template;
pub mod theme;
mod writer;

pub use package::Package;
pub use presentation::{NotesSize, Presentation, SlideId, SlideMasterId, SlideSize};
pub use slide::{
    GroupShapeProperties, NonVisualGroupShapeProperties, Paragraph, Placeholder, Point, Run,
    Shape, Size, Slide, TextBody, Transform, TreeItem,
};
pub use slides::FIRST_SLIDE_ID;
pub use theme::{ColorScheme, Theme, ThemeColor};
pub use writer::main_content_type_for;
