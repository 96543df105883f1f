//! pdf.js rasterizer reached through `www/js/pdf-bridge.js`

use js_sys::{Reflect, Uint8Array};
use pdfannot_core::{RasterHandle, Rasterizer, Size};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlCanvasElement;

#[wasm_bindgen(module = "/www/js/pdf-bridge.js")]
extern "C" {
    #[wasm_bindgen(js_name = openDocument, catch)]
    async fn open_document_internal(data: Uint8Array) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_name = renderPage, catch)]
    async fn render_page_internal(
        document: &JsValue,
        page_num: u32,
        canvas: &HtmlCanvasElement,
        scale: f64,
    ) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_name = destroyDocument)]
    fn destroy_document_internal(document: &JsValue);
}

/// Opens documents with pdf.js and renders onto the display canvas.
pub struct PdfJsRasterizer {
    canvas: HtmlCanvasElement,
}

impl PdfJsRasterizer {
    pub fn new(canvas: HtmlCanvasElement) -> Self {
        Self { canvas }
    }
}

impl Rasterizer for PdfJsRasterizer {
    type Handle = PdfJsDocument;

    async fn open(&self, bytes: &[u8]) -> Result<PdfJsDocument, String> {
        let data = Uint8Array::new_with_length(bytes.len() as u32);
        data.copy_from(bytes);

        let proxy = open_document_internal(data)
            .await
            .map_err(|e| js_error_message(&e))?;
        if proxy.is_undefined() || proxy.is_null() {
            return Err("pdf.js returned no document".to_string());
        }

        let page_count = number_property(&proxy, "numPages")
            .map(|n| n as u32)
            .ok_or_else(|| "pdf.js document has no page count".to_string())?;

        Ok(PdfJsDocument {
            proxy,
            page_count,
            canvas: self.canvas.clone(),
        })
    }
}

/// A pdf.js document proxy. Destroyed when dropped.
pub struct PdfJsDocument {
    proxy: JsValue,
    page_count: u32,
    canvas: HtmlCanvasElement,
}

impl RasterHandle for PdfJsDocument {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    async fn render(&self, page: u32, scale: f64) -> Result<Size, String> {
        let result = render_page_internal(&self.proxy, page, &self.canvas, scale)
            .await
            .map_err(|e| js_error_message(&e))?;

        // The bridge reports the viewport size; fall back to the canvas itself
        let width = number_property(&result, "width").unwrap_or(self.canvas.width() as f64);
        let height = number_property(&result, "height").unwrap_or(self.canvas.height() as f64);
        Ok(Size::new(width, height))
    }
}

impl Drop for PdfJsDocument {
    fn drop(&mut self) {
        destroy_document_internal(&self.proxy);
    }
}

fn number_property(object: &JsValue, key: &str) -> Option<f64> {
    Reflect::get(object, &JsValue::from_str(key))
        .ok()
        .and_then(|v| v.as_f64())
}

/// Best-effort message from a thrown JavaScript value
pub fn js_error_message(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value
        .as_string()
        .unwrap_or_else(|| format!("{:?}", value))
}
