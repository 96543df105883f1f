//! The annotation controller
//!
//! [`Annotator`] owns the loaded session and interprets user input against
//! the active tool. Every operation takes `&mut self`, so two operations can
//! never interleave; the browser adapter additionally keeps the annotator in
//! an [`EditorSlot`](crate::slot::EditorSlot) for the duration of each call.

use crate::config::EditorConfig;
use crate::coords::{DeviceRect, Point};
use crate::error::AnnotError;
use crate::image::DecodedImage;
use crate::operations::{Edit, PdfRect};
use crate::raster::Rasterizer;
use crate::session::DocumentSession;
use crate::validation::is_pdf_mime;
use crate::view::{CursorHint, EditorView, PageNavigation, Tool, ToolbarState};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// What an input event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EditOutcome {
    /// Not meaningful in the current state
    Ignored,
    /// Started something that a later event completes
    Pending,
    /// Completed without changing the document
    Discarded,
    /// The document was changed and resynced
    Applied,
}

impl EditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditOutcome::Ignored => "ignored",
            EditOutcome::Pending => "pending",
            EditOutcome::Discarded => "discarded",
            EditOutcome::Applied => "applied",
        }
    }
}

/// A serialized document ready to download.
#[derive(Debug, Clone)]
pub struct SavedDocument {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum DragState {
    #[default]
    Idle,
    Dragging {
        start: Point,
    },
}

enum PendingImage {
    /// File picker is open
    AwaitingFile,
    /// Decoded; the next click places it
    Ready(DecodedImage),
}

pub struct Annotator<R: Rasterizer, V: EditorView> {
    rasterizer: R,
    view: V,
    config: EditorConfig,
    session: Option<DocumentSession<R::Handle>>,
    zoom: f64,
    tool: Option<Tool>,
    drag: DragState,
    text_anchor: Option<Point>,
    pending_image: Option<PendingImage>,
}

impl<R: Rasterizer, V: EditorView> Annotator<R, V> {
    pub fn new(rasterizer: R, mut view: V, config: EditorConfig) -> Result<Self, AnnotError> {
        config.validate()?;
        view.reset();
        Ok(Self {
            rasterizer,
            view,
            zoom: config.zoom,
            config,
            session: None,
            tool: None,
            drag: DragState::Idle,
            text_anchor: None,
            pending_image: None,
        })
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn session(&self) -> Option<&DocumentSession<R::Handle>> {
        self.session.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.session.is_some()
    }

    /// 1-indexed current page, 0 with no document
    pub fn current_page(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.current_page())
    }

    pub fn page_count(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.page_count())
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn active_tool(&self) -> Option<Tool> {
        self.tool
    }

    /// True while an image has been decoded and awaits its placement click
    pub fn has_pending_image(&self) -> bool {
        matches!(self.pending_image, Some(PendingImage::Ready(_)))
    }

    /// Load a file picked by the user, rejecting non-PDF MIME types.
    pub async fn load_file(&mut self, name: &str, mime: &str, bytes: Vec<u8>) -> Result<(), AnnotError> {
        if !is_pdf_mime(mime) {
            warn!(name, mime, "Rejected non-PDF file");
            self.reset();
            return Err(AnnotError::UnsupportedFile(format!(
                "{} is {}, please select a valid PDF file",
                name, mime
            )));
        }

        info!(name, size = bytes.len(), "Loading file");
        self.load_document(bytes).await
    }

    /// Replace the current document. On any failure the editor is left empty.
    pub async fn load_document(&mut self, bytes: Vec<u8>) -> Result<(), AnnotError> {
        self.reset();

        match self.open_session(bytes).await {
            Ok(()) => {
                self.view.set_tools(ToolbarState {
                    enabled: true,
                    active: None,
                });
                self.view.set_save_enabled(true);
                info!(pages = self.page_count(), "Document loaded");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to load document");
                self.reset();
                Err(match e {
                    AnnotError::LoadFailure(_) => e,
                    other => AnnotError::LoadFailure(other.to_string()),
                })
            }
        }
    }

    async fn open_session(&mut self, bytes: Vec<u8>) -> Result<(), AnnotError> {
        let mut session = DocumentSession::open(bytes, &self.rasterizer).await?;
        let surface = session.render(1, self.zoom).await?;

        self.view.resize_overlay(surface);
        self.view.update_navigation(PageNavigation {
            page: 1,
            page_count: session.page_count(),
        });
        self.session = Some(session);
        Ok(())
    }

    /// Render `page` at the current zoom. Out-of-range pages are ignored.
    pub async fn render_page(&mut self, page: u32) -> Result<(), AnnotError> {
        let Some(session) = self.session.as_mut() else {
            warn!(page, "Render requested with no document");
            return Ok(());
        };

        if page < 1 || page > session.page_count() {
            warn!(page, page_count = session.page_count(), "Page out of range");
            return Ok(());
        }

        let surface = match session.render(page, self.zoom).await {
            Ok(surface) => surface,
            Err(e) => {
                error!(error = %e, "Render failed");
                return Err(e);
            }
        };

        self.drag = DragState::Idle;
        self.view.resize_overlay(surface);
        self.view.update_navigation(PageNavigation {
            page,
            page_count: session.page_count(),
        });
        debug!(page, width = surface.width, height = surface.height, "Rendered page");
        Ok(())
    }

    pub async fn next_page(&mut self) -> Result<(), AnnotError> {
        let (page, count) = (self.current_page(), self.page_count());
        if page == 0 || page >= count {
            return Ok(());
        }
        self.render_page(page + 1).await
    }

    pub async fn prev_page(&mut self) -> Result<(), AnnotError> {
        let page = self.current_page();
        if page <= 1 {
            return Ok(());
        }
        self.render_page(page - 1).await
    }

    /// Change the render scale and re-render the current page.
    pub async fn set_zoom(&mut self, zoom: f64) -> Result<(), AnnotError> {
        if !(zoom.is_finite() && zoom > 0.0) {
            return Err(AnnotError::InvalidConfig(format!(
                "zoom must be positive, got {}",
                zoom
            )));
        }

        self.zoom = zoom;
        self.drag = DragState::Idle;
        let page = self.current_page();
        if page > 0 {
            self.render_page(page).await?;
        }
        Ok(())
    }

    /// Activate `tool`, or deselect it when it is already active.
    pub fn select_tool(&mut self, tool: Tool) -> Result<Option<Tool>, AnnotError> {
        if self.session.is_none() {
            return Err(AnnotError::NoDocument);
        }

        self.drag = DragState::Idle;
        self.text_anchor = None;
        self.pending_image = None;
        self.view.hide_text_entry();
        self.view.clear_overlay();

        if self.tool == Some(tool) {
            self.tool = None;
            self.view.set_cursor(CursorHint::Default);
        } else {
            self.tool = Some(tool);
            self.view.set_cursor(tool.cursor());
            if tool == Tool::Image {
                self.pending_image = Some(PendingImage::AwaitingFile);
                self.view.request_image_file();
            }
        }

        self.view.set_tools(ToolbarState {
            enabled: true,
            active: self.tool,
        });
        debug!(tool = ?self.tool, "Tool changed");
        Ok(self.tool)
    }

    pub fn pointer_down(&mut self, at: Point) -> EditOutcome {
        if self.tool != Some(Tool::Highlight) || self.session.is_none() {
            return EditOutcome::Ignored;
        }
        self.drag = DragState::Dragging { start: at };
        debug!(x = at.x, y = at.y, "Highlight drag started");
        EditOutcome::Pending
    }

    /// Update the drag preview. Never touches the document.
    pub fn pointer_move(&mut self, at: Point) -> EditOutcome {
        match self.drag {
            DragState::Dragging { start } => {
                self.view.draw_preview(DeviceRect::from_corners(start, at));
                EditOutcome::Pending
            }
            DragState::Idle => EditOutcome::Ignored,
        }
    }

    /// Finish a highlight drag; drags too small in either direction are dropped.
    pub async fn pointer_up(&mut self, at: Point) -> Result<EditOutcome, AnnotError> {
        let DragState::Dragging { start } = std::mem::take(&mut self.drag) else {
            return Ok(EditOutcome::Ignored);
        };
        self.view.clear_overlay();

        let Some(session) = self.session.as_ref() else {
            return Ok(EditOutcome::Ignored);
        };
        if self.tool != Some(Tool::Highlight) {
            return Ok(EditOutcome::Ignored);
        }

        let rect = PdfRect::from_corners(
            session.to_document_space(start),
            session.to_document_space(at),
        );
        let min = self.config.min_highlight_extent;
        if rect.width <= min || rect.height <= min {
            debug!(width = rect.width, height = rect.height, "Highlight too small, discarded");
            return Ok(EditOutcome::Discarded);
        }

        let edit = Edit::Highlight {
            page: session.current_page(),
            rect,
            color: self.config.highlight_rgb()?,
            opacity: self.config.highlight_opacity,
        };
        self.apply(edit).await?;
        Ok(EditOutcome::Applied)
    }

    /// A click on the page: opens the text entry or places a pending image.
    pub async fn click(&mut self, at: Point) -> Result<EditOutcome, AnnotError> {
        if self.session.is_none() {
            return Ok(EditOutcome::Ignored);
        }

        match self.tool {
            Some(Tool::Text) => {
                self.text_anchor = Some(at);
                self.view.show_text_entry(at);
                Ok(EditOutcome::Pending)
            }
            Some(Tool::Image) => match self.pending_image.take() {
                Some(PendingImage::Ready(image)) => {
                    let result = self.place_image(image, at).await;
                    self.deselect_tool();
                    result.map(|_| EditOutcome::Applied)
                }
                other => {
                    self.pending_image = other;
                    Ok(EditOutcome::Ignored)
                }
            },
            _ => Ok(EditOutcome::Ignored),
        }
    }

    /// Commit the text entry. Blank input is discarded.
    pub async fn confirm_text(&mut self, value: &str) -> Result<EditOutcome, AnnotError> {
        self.view.hide_text_entry();

        let Some(anchor) = self.text_anchor.take() else {
            return Ok(EditOutcome::Ignored);
        };
        let Some(session) = self.session.as_ref() else {
            return Ok(EditOutcome::Ignored);
        };
        if self.tool != Some(Tool::Text) {
            return Ok(EditOutcome::Ignored);
        }

        let text = value.trim();
        if text.is_empty() {
            return Ok(EditOutcome::Discarded);
        }

        let doc = session.to_document_space(anchor);
        let edit = Edit::Text {
            page: session.current_page(),
            origin: Point::new(doc.x, doc.y - self.config.baseline_offset),
            text: text.to_string(),
            style: self.config.text_style()?,
        };
        self.apply(edit).await?;
        Ok(EditOutcome::Applied)
    }

    /// Receive the file chosen after selecting the image tool.
    pub fn load_image(&mut self, mime: &str, bytes: &[u8]) -> Result<EditOutcome, AnnotError> {
        if self.tool != Some(Tool::Image) || self.session.is_none() {
            warn!(mime, "Image received while the image tool is inactive");
            return Ok(EditOutcome::Ignored);
        }

        if !self.config.accepts_image(mime) {
            self.cancel_image();
            return Err(AnnotError::UnsupportedFile(format!(
                "{} (please select a PNG or JPEG image)",
                mime
            )));
        }

        match DecodedImage::decode(Some(mime), bytes) {
            Ok(image) => {
                debug!(width = image.width, height = image.height, "Image ready to place");
                self.pending_image = Some(PendingImage::Ready(image));
                Ok(EditOutcome::Pending)
            }
            Err(e) => {
                error!(error = %e, "Rejected image");
                self.cancel_image();
                Err(e)
            }
        }
    }

    /// The file picker was dismissed or the upload failed.
    pub fn cancel_image(&mut self) {
        self.pending_image = None;
        if self.tool == Some(Tool::Image) {
            self.deselect_tool();
        }
    }

    /// Serialize the edited document for download.
    pub fn save(&mut self) -> Result<SavedDocument, AnnotError> {
        let Some(session) = self.session.as_mut() else {
            warn!("Save requested with no document");
            return Err(AnnotError::NoDocument);
        };

        self.view.set_save_enabled(false);
        let result = session.serialize();
        self.view.set_save_enabled(true);

        match result {
            Ok(bytes) => {
                info!(size = bytes.len(), "Document saved");
                Ok(SavedDocument {
                    bytes,
                    file_name: self.config.download_file_name.clone(),
                    mime: self.config.download_mime.clone(),
                })
            }
            Err(e) => {
                error!(error = %e, "Save failed");
                Err(match e {
                    AnnotError::SaveFailure(_) => e,
                    other => AnnotError::SaveFailure(other.to_string()),
                })
            }
        }
    }

    /// Drop the document and return the UI to its empty state.
    pub fn reset(&mut self) {
        self.session = None;
        self.tool = None;
        self.drag = DragState::Idle;
        self.text_anchor = None;
        self.pending_image = None;
        self.view.reset();
    }

    async fn place_image(&mut self, image: DecodedImage, at: Point) -> Result<(), AnnotError> {
        let Some(session) = self.session.as_ref() else {
            return Err(AnnotError::NoDocument);
        };

        let doc = session.to_document_space(at);
        let size = image.scaled_to_width(self.config.image_width);
        let edit = Edit::Image {
            page: session.current_page(),
            // Top-left corner at the click point
            rect: PdfRect {
                x: doc.x,
                y: doc.y - size.height,
                width: size.width,
                height: size.height,
            },
            image,
        };
        self.apply(edit).await
    }

    fn deselect_tool(&mut self) {
        self.tool = None;
        self.view.set_cursor(CursorHint::Default);
        self.view.set_tools(ToolbarState {
            enabled: self.session.is_some(),
            active: None,
        });
    }

    async fn apply(&mut self, edit: Edit) -> Result<(), AnnotError> {
        let Some(session) = self.session.as_mut() else {
            return Err(AnnotError::NoDocument);
        };

        if let Err(e) = session.apply(&edit, &self.rasterizer, self.zoom).await {
            error!(edit = edit.label(), error = %e, "Edit failed");
            return Err(e);
        }

        self.view.resize_overlay(session.surface());
        self.view.update_navigation(PageNavigation {
            page: session.current_page(),
            page_count: session.page_count(),
        });
        info!(edit = edit.label(), page = edit.page(), "Edit applied");
        Ok(())
    }
}
