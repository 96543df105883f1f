//! PDF viewing and annotation
//!
//! Loads a document, renders pages through a [`Rasterizer`], and turns pointer
//! input into highlights, text and images drawn with lopdf. After every edit
//! the document is serialized and reloaded so the display matches the bytes
//! that will be saved.
//!
//! The crate is platform independent: rendering and presentation are reached
//! through the [`Rasterizer`] and [`EditorView`] traits.

pub mod config;
pub mod controller;
pub mod coords;
pub mod error;
pub mod image;
pub mod model;
pub mod operations;
pub mod raster;
pub mod session;
pub mod slot;
pub mod validation;
pub mod view;

pub use config::EditorConfig;
pub use controller::{Annotator, EditOutcome, SavedDocument};
pub use coords::{to_document_space, DeviceRect, Point, Size};
pub use error::{AnnotError, ErrorKind};
pub use image::{DecodedImage, ImageFormat};
pub use model::DocumentModel;
pub use operations::{Edit, PdfRect, Rgb, TextStyle};
pub use raster::{RasterHandle, Rasterizer};
pub use session::DocumentSession;
pub use slot::{EditorSlot, SlotGuard};
pub use view::{CursorHint, EditorView, PageNavigation, Tool, ToolbarState};

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, AnnotError> {
    validation::quick_validate(bytes).map_err(AnnotError::LoadFailure)?;
    Ok(DocumentModel::load(bytes)?.page_count())
}
