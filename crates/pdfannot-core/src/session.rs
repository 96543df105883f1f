//! A loaded document held in two parallel representations
//!
//! The raster handle displays pages; the object model accepts edits. Both are
//! rebuilt from the same serialized bytes after every edit, so outside of
//! [`DocumentSession::apply`] they always describe the same document.

use crate::coords::{to_document_space, Point, Size};
use crate::error::AnnotError;
use crate::model::DocumentModel;
use crate::operations::Edit;
use crate::raster::{RasterHandle, Rasterizer};
use crate::validation::{header_version, quick_validate};
use tracing::{debug, info};

pub struct DocumentSession<H> {
    raster: H,
    model: DocumentModel,
    raw_bytes: Vec<u8>,
    current_page: u32,
    /// Pixel size of the last successful render
    surface: Size,
    edits_applied: usize,
}

impl<H: RasterHandle> DocumentSession<H> {
    /// Build both representations from `bytes`. Nothing is rendered yet.
    pub async fn open<R>(bytes: Vec<u8>, rasterizer: &R) -> Result<Self, AnnotError>
    where
        R: Rasterizer<Handle = H>,
    {
        quick_validate(&bytes).map_err(AnnotError::LoadFailure)?;

        let raster = rasterizer
            .open(&bytes)
            .await
            .map_err(AnnotError::LoadFailure)?;
        if raster.page_count() == 0 {
            return Err(AnnotError::LoadFailure(
                "document has no pages".to_string(),
            ));
        }

        let model = DocumentModel::load(&bytes)?;
        debug!(
            version = header_version(&bytes).unwrap_or("unknown"),
            pages = model.page_count(),
            "Parsed document"
        );
        if model.page_count() != raster.page_count() {
            debug!(
                model_pages = model.page_count(),
                raster_pages = raster.page_count(),
                "Page counts disagree"
            );
        }

        Ok(Self {
            raster,
            model,
            raw_bytes: bytes,
            current_page: 1,
            surface: Size::default(),
            edits_applied: 0,
        })
    }

    /// Number of pages in the displayed document
    pub fn page_count(&self) -> u32 {
        self.raster.page_count()
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn surface(&self) -> Size {
        self.surface
    }

    /// Bytes of the last load or resync
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    pub fn model(&self) -> &DocumentModel {
        &self.model
    }

    pub fn edits_applied(&self) -> usize {
        self.edits_applied
    }

    /// Size of the current page in points
    pub fn page_size(&self) -> Option<Size> {
        self.model.page_size(self.current_page)
    }

    /// Convert a point on the rendered surface to current-page coordinates.
    pub fn to_document_space(&self, device: Point) -> Point {
        match self.page_size() {
            Some(page) => to_document_space(device, page, self.surface),
            None => Point::ZERO,
        }
    }

    /// Render `page`. The current page only changes once the render succeeds.
    pub async fn render(&mut self, page: u32, scale: f64) -> Result<Size, AnnotError> {
        let surface = self
            .raster
            .render(page, scale)
            .await
            .map_err(|reason| AnnotError::RenderFailure { page, reason })?;

        self.current_page = page;
        self.surface = surface;
        Ok(surface)
    }

    /// Apply an edit, then serialize and rebuild both representations and
    /// re-render the current page.
    pub async fn apply<R>(&mut self, edit: &Edit, rasterizer: &R, scale: f64) -> Result<(), AnnotError>
    where
        R: Rasterizer<Handle = H>,
    {
        self.model.apply_edit(edit)?;
        self.edits_applied += 1;
        self.resync(rasterizer, scale).await
    }

    /// Serialize the object model for download.
    pub fn serialize(&mut self) -> Result<Vec<u8>, AnnotError> {
        self.model.serialize()
    }

    async fn resync<R>(&mut self, rasterizer: &R, scale: f64) -> Result<(), AnnotError>
    where
        R: Rasterizer<Handle = H>,
    {
        let bytes = self
            .model
            .serialize()
            .map_err(|e| AnnotError::ResyncFailure(e.to_string()))?;
        self.raw_bytes = bytes;

        let raster = rasterizer
            .open(&self.raw_bytes)
            .await
            .map_err(AnnotError::ResyncFailure)?;
        let model = DocumentModel::load(&self.raw_bytes)
            .map_err(|e| AnnotError::ResyncFailure(e.to_string()))?;
        self.raster = raster;
        self.model = model;

        let page = self.current_page.min(self.raster.page_count()).max(1);
        self.render(page, scale)
            .await
            .map_err(|e| AnnotError::ResyncFailure(e.to_string()))?;

        info!(
            bytes = self.raw_bytes.len(),
            edits = self.edits_applied,
            "Document resynced"
        );
        Ok(())
    }
}
