//! WASM bindings for the PDF annotator
//!
//! All editor state lives in Rust. JavaScript forwards DOM events and file
//! contents; rendering goes through pdf.js via `www/js/pdf-bridge.js`.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { PdfAnnotator } from './pkg/pdfannot_wasm.js';
//!
//! await init();
//! const editor = new PdfAnnotator(null);
//! await editor.loadFile(file.name, file.type, new Uint8Array(await file.arrayBuffer()));
//! canvas.addEventListener('mousedown', (e) => editor.pointerDown(e));
//! canvas.addEventListener('mouseup', (e) => editor.pointerUp(e).catch(showError));
//! ```
//!
//! Async methods return promises. While one is pending every other call is
//! rejected with an error whose `name` is `"busy"`.

pub mod bridge;
pub mod dom_view;
pub mod download;
pub mod logging;

use bridge::PdfJsRasterizer;
use dom_view::{element_by_id, DomView, PDF_CANVAS_ID};
use js_sys::Promise;
use pdfannot_core::{
    AnnotError, Annotator, EditOutcome, EditorConfig, EditorSlot, SlotGuard, Tool,
};
use serde::Serialize;
use tracing::{info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::{Document, HtmlCanvasElement, MouseEvent};

type Editor = Annotator<PdfJsRasterizer, DomView>;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    logging::init();
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Quick validation check for a PDF file
#[wasm_bindgen]
pub fn quick_validate(bytes: &[u8]) -> Result<(), JsValue> {
    pdfannot_core::validation::quick_validate(bytes).map_err(|e| JsValue::from_str(&e))
}

/// Get page count from PDF bytes
#[wasm_bindgen]
pub fn get_page_count(bytes: &[u8]) -> Result<u32, JsValue> {
    pdfannot_core::get_page_count(bytes).map_err(to_js)
}

#[wasm_bindgen]
pub struct PdfAnnotator {
    slot: EditorSlot<Editor>,
    document: Document,
}

#[wasm_bindgen]
impl PdfAnnotator {
    /// Bind to the page's canvases and controls. `config_json` may override
    /// any editor setting.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<PdfAnnotator, JsValue> {
        let window =
            web_sys::window().ok_or_else(|| JsValue::from_str("No window object available"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("No document object available"))?;

        let config = match config_json.as_deref().map(str::trim) {
            Some(json) if !json.is_empty() => EditorConfig::from_json(json).map_err(to_js)?,
            _ => EditorConfig::default(),
        };

        let canvas: HtmlCanvasElement = element_by_id(&document, PDF_CANVAS_ID)?;
        let view = DomView::from_document(&document)?;
        let annotator =
            Annotator::new(PdfJsRasterizer::new(canvas), view, config).map_err(to_js)?;

        Ok(Self {
            slot: EditorSlot::new(annotator),
            document,
        })
    }

    /// Load a PDF picked by the user. Resolves to the page count.
    #[wasm_bindgen(js_name = loadFile)]
    pub fn load_file(&self, file_name: String, mime: String, bytes: Vec<u8>) -> Promise {
        let mut editor = match self.acquire() {
            Ok(editor) => editor,
            Err(e) => return Promise::reject(&e),
        };

        future_to_promise(async move {
            info!(
                file = %file_name,
                size = %download::format_bytes(bytes.len()),
                "Opening file"
            );
            editor.load_file(&file_name, &mime, bytes).await.map_err(to_js)?;
            editor.view().mark_loaded();
            Ok(JsValue::from(editor.page_count()))
        })
    }

    #[wasm_bindgen(js_name = nextPage)]
    pub fn next_page(&self) -> Promise {
        let mut editor = match self.acquire() {
            Ok(editor) => editor,
            Err(e) => return Promise::reject(&e),
        };

        future_to_promise(async move {
            editor.next_page().await.map_err(to_js)?;
            Ok(JsValue::from(editor.current_page()))
        })
    }

    #[wasm_bindgen(js_name = prevPage)]
    pub fn prev_page(&self) -> Promise {
        let mut editor = match self.acquire() {
            Ok(editor) => editor,
            Err(e) => return Promise::reject(&e),
        };

        future_to_promise(async move {
            editor.prev_page().await.map_err(to_js)?;
            Ok(JsValue::from(editor.current_page()))
        })
    }

    #[wasm_bindgen(js_name = setZoom)]
    pub fn set_zoom(&self, zoom: f64) -> Promise {
        let mut editor = match self.acquire() {
            Ok(editor) => editor,
            Err(e) => return Promise::reject(&e),
        };

        future_to_promise(async move {
            editor.set_zoom(zoom).await.map_err(to_js)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Toggle a tool by its `data-tool` name. Returns the active tool, if any.
    #[wasm_bindgen(js_name = selectTool)]
    pub fn select_tool(&self, name: &str) -> Result<Option<String>, JsValue> {
        let tool = Tool::parse(name)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown tool: {}", name)))?;
        let mut editor = self.acquire()?;
        let active = editor.select_tool(tool).map_err(to_js)?;
        Ok(active.map(|t| t.as_str().to_string()))
    }

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&self, event: MouseEvent) -> Result<String, JsValue> {
        let mut editor = self.acquire()?;
        let at = editor.view().event_point(&event);
        Ok(outcome_label(editor.pointer_down(at)))
    }

    /// Update the drag preview. Skipped while another operation runs.
    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&self, event: MouseEvent) {
        if let Ok(mut editor) = self.slot.acquire() {
            let at = editor.view().event_point(&event);
            editor.pointer_move(at);
        }
    }

    /// Finish a highlight drag. Resolves to the outcome name.
    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&self, event: MouseEvent) -> Promise {
        let mut editor = match self.acquire() {
            Ok(editor) => editor,
            Err(e) => return Promise::reject(&e),
        };
        let at = editor.view().event_point(&event);

        future_to_promise(async move {
            let outcome = editor.pointer_up(at).await.map_err(to_js)?;
            Ok(JsValue::from_str(&outcome_label(outcome)))
        })
    }

    #[wasm_bindgen]
    pub fn click(&self, event: MouseEvent) -> Promise {
        let mut editor = match self.acquire() {
            Ok(editor) => editor,
            Err(e) => return Promise::reject(&e),
        };
        let at = editor.view().event_point(&event);

        future_to_promise(async move {
            let outcome = editor.click(at).await.map_err(to_js)?;
            Ok(JsValue::from_str(&outcome_label(outcome)))
        })
    }

    /// Commit the inline text entry's current value.
    #[wasm_bindgen(js_name = confirmText)]
    pub fn confirm_text(&self) -> Promise {
        let mut editor = match self.acquire() {
            Ok(editor) => editor,
            Err(e) => return Promise::reject(&e),
        };
        let value = editor.view().text_value();

        future_to_promise(async move {
            let outcome = editor.confirm_text(&value).await.map_err(to_js)?;
            Ok(JsValue::from_str(&outcome_label(outcome)))
        })
    }

    /// Receive the image chosen after selecting the image tool.
    #[wasm_bindgen(js_name = loadImage)]
    pub fn load_image(&self, mime: &str, bytes: &[u8]) -> Result<String, JsValue> {
        let mut editor = self.acquire()?;
        let outcome = editor.load_image(mime, bytes).map_err(to_js)?;
        Ok(outcome_label(outcome))
    }

    #[wasm_bindgen(js_name = cancelImage)]
    pub fn cancel_image(&self) -> Result<(), JsValue> {
        let mut editor = self.acquire()?;
        editor.cancel_image();
        Ok(())
    }

    /// Serialize the edited document and start the download.
    #[wasm_bindgen]
    pub fn save(&self) -> Result<(), JsValue> {
        let mut editor = self.acquire()?;
        let saved = editor.save().map_err(to_js)?;
        info!(
            file = %saved.file_name,
            size = %download::format_bytes(saved.bytes.len()),
            "Downloading"
        );
        download::download_bytes(&self.document, &saved.bytes, &saved.file_name, &saved.mime)
    }

    #[wasm_bindgen]
    pub fn reset(&self) -> Result<(), JsValue> {
        let mut editor = self.acquire()?;
        editor.reset();
        Ok(())
    }

    /// 0 with no document, or while an operation is running
    #[wasm_bindgen(js_name = currentPage)]
    pub fn current_page(&self) -> u32 {
        self.slot
            .acquire()
            .map(|editor| editor.current_page())
            .unwrap_or(0)
    }

    #[wasm_bindgen(js_name = pageCount)]
    pub fn page_count(&self) -> u32 {
        self.slot
            .acquire()
            .map(|editor| editor.page_count())
            .unwrap_or(0)
    }

    #[wasm_bindgen(js_name = isBusy)]
    pub fn is_busy(&self) -> bool {
        self.slot.is_busy()
    }

    /// Snapshot of the editor for the page script. `busy` is the only
    /// populated field while an operation is running.
    #[wasm_bindgen]
    pub fn state(&self) -> Result<JsValue, JsValue> {
        let snapshot = match self.slot.acquire() {
            Ok(editor) => EditorSnapshot::of(&editor),
            Err(_) => EditorSnapshot::busy(),
        };
        serde_wasm_bindgen::to_value(&snapshot).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    fn acquire(&self) -> Result<SlotGuard<Editor>, JsValue> {
        self.slot.acquire().map_err(|e| {
            warn!("Input rejected while another operation is running");
            to_js(e)
        })
    }
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct EditorSnapshot {
    busy: bool,
    loaded: bool,
    page: u32,
    page_count: u32,
    zoom: f64,
    tool: Option<&'static str>,
    pending_image: bool,
}

impl EditorSnapshot {
    fn of(editor: &Editor) -> Self {
        Self {
            busy: false,
            loaded: editor.is_loaded(),
            page: editor.current_page(),
            page_count: editor.page_count(),
            zoom: editor.zoom(),
            tool: editor.active_tool().map(|t| t.as_str()),
            pending_image: editor.has_pending_image(),
        }
    }

    fn busy() -> Self {
        Self {
            busy: true,
            ..Self::default()
        }
    }
}

fn outcome_label(outcome: EditOutcome) -> String {
    outcome.as_str().to_string()
}

/// Convert to a JavaScript `Error` whose `name` is the error kind.
fn to_js(err: AnnotError) -> JsValue {
    let error = js_sys::Error::new(&err.to_string());
    error.set_name(err.kind().as_str());
    error.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_matches_package() {
        assert_eq!(get_version(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome_label(EditOutcome::Applied), "applied");
        assert_eq!(outcome_label(EditOutcome::Discarded), "discarded");
        assert_eq!(outcome_label(EditOutcome::Pending), "pending");
        assert_eq!(outcome_label(EditOutcome::Ignored), "ignored");
    }

    #[test]
    fn test_busy_snapshot_uses_camel_case() {
        let json = serde_json::to_value(EditorSnapshot::busy()).unwrap();
        assert_eq!(json["busy"], true);
        assert_eq!(json["pageCount"], 0);
        assert_eq!(json["pendingImage"], false);
        assert!(json["tool"].is_null());
    }
}
