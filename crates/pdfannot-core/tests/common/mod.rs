//! Shared fixtures: a lopdf document builder, a stub rasterizer and a view
//! that records what the annotator asked it to do.

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use pdfannot_core::{
    CursorHint, DeviceRect, DocumentModel, EditorView, PageNavigation, Point, RasterHandle,
    Rasterizer, Size, ToolbarState,
};
use std::cell::RefCell;
use std::rc::Rc;

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Create a PDF with `num_pages` pages of `width` x `height` points.
pub fn create_test_pdf(num_pages: u32, width: i64, height: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut page_ids = Vec::new();
    for i in 0..num_pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), Object::Integer(12)],
                ),
                Operation::new("Td", vec![Object::Integer(72), Object::Integer(72)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("Page {}", i + 1).into_bytes(),
                        lopdf::StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id =
            doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(width),
                Object::Integer(height),
            ],
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => num_pages as i64,
            "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Small RGBA PNG with partial transparency
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        let data = vec![0x80; (width * height * 4) as usize];
        writer.write_image_data(&data).unwrap();
    }
    out
}

pub fn page_content(bytes: &[u8], page: u32) -> String {
    let model = DocumentModel::load(bytes).unwrap();
    String::from_utf8_lossy(&model.page_content(page).unwrap()).into_owned()
}

#[derive(Default)]
pub struct StubState {
    pub opens: usize,
    pub fail_open: bool,
    pub fail_render: bool,
    /// Overrides the page-size-times-scale surface
    pub surface: Option<Size>,
    pub renders: Vec<(u32, f64)>,
    pub last_opened: Vec<u8>,
}

/// Rasterizer that reads page sizes with lopdf and draws nothing.
#[derive(Clone, Default)]
pub struct StubRasterizer {
    pub state: Rc<RefCell<StubState>>,
}

impl StubRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_surface(surface: Size) -> Self {
        let stub = Self::default();
        stub.state.borrow_mut().surface = Some(surface);
        stub
    }

    pub fn opens(&self) -> usize {
        self.state.borrow().opens
    }

    pub fn renders(&self) -> Vec<(u32, f64)> {
        self.state.borrow().renders.clone()
    }

    pub fn last_opened(&self) -> Vec<u8> {
        self.state.borrow().last_opened.clone()
    }

    pub fn fail_open(&self, fail: bool) {
        self.state.borrow_mut().fail_open = fail;
    }

    pub fn fail_render(&self, fail: bool) {
        self.state.borrow_mut().fail_render = fail;
    }
}

pub struct StubHandle {
    pages: Vec<Size>,
    state: Rc<RefCell<StubState>>,
}

impl Rasterizer for StubRasterizer {
    type Handle = StubHandle;

    async fn open(&self, bytes: &[u8]) -> Result<StubHandle, String> {
        let mut state = self.state.borrow_mut();
        state.opens += 1;
        if state.fail_open {
            return Err("stub rasterizer refused to open".to_string());
        }

        let model = DocumentModel::load(bytes).map_err(|e| e.to_string())?;
        let pages = (1..=model.page_count())
            .filter_map(|page| model.page_size(page))
            .collect();
        state.last_opened = bytes.to_vec();

        Ok(StubHandle {
            pages,
            state: Rc::clone(&self.state),
        })
    }
}

impl RasterHandle for StubHandle {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    async fn render(&self, page: u32, scale: f64) -> Result<Size, String> {
        let mut state = self.state.borrow_mut();
        if state.fail_render {
            return Err("stub rasterizer refused to render".to_string());
        }
        let size = page
            .checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .ok_or_else(|| format!("no page {}", page))?;
        state.renders.push((page, scale));
        Ok(state.surface.unwrap_or_else(|| size.scaled(scale)))
    }
}

/// View that remembers its current state and counts notable calls.
#[derive(Debug)]
pub struct RecordingView {
    pub overlay: Size,
    pub overlay_clears: usize,
    pub previews: Vec<DeviceRect>,
    pub cursor: CursorHint,
    pub navigation: Option<PageNavigation>,
    pub text_entry: Option<Point>,
    pub toolbar: ToolbarState,
    pub save_enabled: bool,
    pub save_toggles: usize,
    pub image_requests: usize,
    pub resets: usize,
}

impl Default for RecordingView {
    fn default() -> Self {
        Self {
            overlay: Size::default(),
            overlay_clears: 0,
            previews: Vec::new(),
            cursor: CursorHint::Default,
            navigation: None,
            text_entry: None,
            toolbar: ToolbarState {
                enabled: false,
                active: None,
            },
            save_enabled: false,
            save_toggles: 0,
            image_requests: 0,
            resets: 0,
        }
    }
}

impl EditorView for RecordingView {
    fn resize_overlay(&mut self, size: Size) {
        self.overlay = size;
        self.overlay_clears += 1;
    }

    fn clear_overlay(&mut self) {
        self.overlay_clears += 1;
    }

    fn draw_preview(&mut self, rect: DeviceRect) {
        self.previews.push(rect);
    }

    fn set_cursor(&mut self, cursor: CursorHint) {
        self.cursor = cursor;
    }

    fn update_navigation(&mut self, nav: PageNavigation) {
        self.navigation = Some(nav);
    }

    fn show_text_entry(&mut self, at: Point) {
        self.text_entry = Some(at);
    }

    fn hide_text_entry(&mut self) {
        self.text_entry = None;
    }

    fn set_tools(&mut self, toolbar: ToolbarState) {
        self.toolbar = toolbar;
    }

    fn set_save_enabled(&mut self, enabled: bool) {
        self.save_enabled = enabled;
        self.save_toggles += 1;
    }

    fn request_image_file(&mut self) {
        self.image_requests += 1;
    }

    fn reset(&mut self) {
        let resets = self.resets + 1;
        *self = RecordingView {
            resets,
            ..RecordingView::default()
        };
    }
}
