//! Rasterization collaborator
//!
//! The browser build implements these traits on top of pdf.js; tests use an
//! in-memory stub. Errors are plain strings because they come from foreign
//! code and are only ever shown to the user.

use crate::coords::Size;

/// Opens raster handles from raw document bytes.
#[allow(async_fn_in_trait)]
pub trait Rasterizer {
    type Handle: RasterHandle;

    async fn open(&self, bytes: &[u8]) -> Result<Self::Handle, String>;
}

/// A read-only, rasterizable view of one version of the document.
#[allow(async_fn_in_trait)]
pub trait RasterHandle {
    fn page_count(&self) -> u32;

    /// Draw a 1-indexed page at `scale` onto the display surface, resizing
    /// the surface to fit. Returns the surface size in pixels.
    async fn render(&self, page: u32, scale: f64) -> Result<Size, String>;
}
