//! DOM implementation of the editor view

use pdfannot_core::{
    CursorHint, DeviceRect, EditorView, PageNavigation, Point, Size, Tool, ToolbarState,
};
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, HtmlCanvasElement, HtmlElement,
    HtmlInputElement, MouseEvent,
};

/// Drag preview fill, matching the default highlight colour
const PREVIEW_FILL: &str = "rgba(255, 255, 0, 0.3)";

pub const PDF_CANVAS_ID: &str = "pdf-canvas";
const ANNOTATION_CANVAS_ID: &str = "annotation-canvas";
const TEXT_INPUT_ID: &str = "text-input";
const IMAGE_INPUT_ID: &str = "image-input";
const PAGE_NUM_ID: &str = "page-num";
const PAGE_COUNT_ID: &str = "page-count";
const PREV_PAGE_ID: &str = "prev-page";
const NEXT_PAGE_ID: &str = "next-page";
const SAVE_ID: &str = "save-pdf";
const VIEWER_ID: &str = "pdf-viewer";

pub struct DomView {
    overlay: HtmlCanvasElement,
    overlay_ctx: CanvasRenderingContext2d,
    text_input: HtmlInputElement,
    image_input: HtmlInputElement,
    page_num: Element,
    page_count: Element,
    prev_page: Element,
    next_page: Element,
    save: Element,
    viewer: HtmlElement,
    tool_buttons: Vec<(Tool, Element)>,
}

impl DomView {
    pub fn from_document(document: &Document) -> Result<Self, JsValue> {
        let overlay: HtmlCanvasElement = element_by_id(document, ANNOTATION_CANVAS_ID)?;
        let overlay_ctx = overlay
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("annotation canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;

        let mut tool_buttons = Vec::new();
        for tool in Tool::ALL {
            let selector = format!(".tool-button[data-tool=\"{}\"]", tool.as_str());
            if let Some(button) = document.query_selector(&selector)? {
                tool_buttons.push((tool, button));
            }
        }

        Ok(Self {
            overlay,
            overlay_ctx,
            text_input: element_by_id(document, TEXT_INPUT_ID)?,
            image_input: element_by_id(document, IMAGE_INPUT_ID)?,
            page_num: element_by_id(document, PAGE_NUM_ID)?,
            page_count: element_by_id(document, PAGE_COUNT_ID)?,
            prev_page: element_by_id(document, PREV_PAGE_ID)?,
            next_page: element_by_id(document, NEXT_PAGE_ID)?,
            save: element_by_id(document, SAVE_ID)?,
            viewer: element_by_id(document, VIEWER_ID)?,
            tool_buttons,
        })
    }

    /// Pointer position relative to the overlay's top-left corner
    pub fn event_point(&self, event: &MouseEvent) -> Point {
        let rect = self.overlay.get_bounding_client_rect();
        Point::new(
            event.client_x() as f64 - rect.left(),
            event.client_y() as f64 - rect.top(),
        )
    }

    pub fn text_value(&self) -> String {
        self.text_input.value()
    }

    fn overlay_size(&self) -> (f64, f64) {
        (self.overlay.width() as f64, self.overlay.height() as f64)
    }
}

impl EditorView for DomView {
    fn resize_overlay(&mut self, size: Size) {
        // Assigning the size also clears the canvas
        self.overlay.set_width(size.width.round().max(0.0) as u32);
        self.overlay.set_height(size.height.round().max(0.0) as u32);
    }

    fn clear_overlay(&mut self) {
        let (width, height) = self.overlay_size();
        self.overlay_ctx.clear_rect(0.0, 0.0, width, height);
    }

    #[allow(deprecated)]
    fn draw_preview(&mut self, rect: DeviceRect) {
        self.clear_overlay();
        self.overlay_ctx
            .set_fill_style(&JsValue::from_str(PREVIEW_FILL));
        self.overlay_ctx
            .fill_rect(rect.x, rect.y, rect.width, rect.height);
    }

    fn set_cursor(&mut self, cursor: CursorHint) {
        log_dom(
            self.overlay.style().set_property("cursor", cursor.css()),
            "cursor",
        );
    }

    fn update_navigation(&mut self, nav: PageNavigation) {
        self.page_num.set_text_content(Some(&nav.page.to_string()));
        self.page_count
            .set_text_content(Some(&nav.page_count.to_string()));
        set_disabled(&self.prev_page, !nav.can_go_prev());
        set_disabled(&self.next_page, !nav.can_go_next());
    }

    fn show_text_entry(&mut self, at: Point) {
        let style = self.text_input.style();
        log_dom(style.set_property("display", "block"), "text entry");
        log_dom(style.set_property("left", &format!("{}px", at.x)), "text entry");
        log_dom(style.set_property("top", &format!("{}px", at.y)), "text entry");
        self.text_input.set_value("");
        log_dom(self.text_input.focus(), "text entry focus");
    }

    fn hide_text_entry(&mut self) {
        log_dom(
            self.text_input.style().set_property("display", "none"),
            "text entry",
        );
    }

    fn set_tools(&mut self, toolbar: ToolbarState) {
        for (tool, button) in &self.tool_buttons {
            set_disabled(button, !toolbar.enabled);
            let active = toolbar.active == Some(*tool);
            log_dom(
                button
                    .class_list()
                    .toggle_with_force("active", active)
                    .map(|_| ()),
                "tool button",
            );
        }
    }

    fn set_save_enabled(&mut self, enabled: bool) {
        set_disabled(&self.save, !enabled);
    }

    fn request_image_file(&mut self) {
        // Clear so picking the same file again still fires `change`
        self.image_input.set_value("");
        self.image_input.click();
    }

    fn reset(&mut self) {
        self.update_navigation(PageNavigation {
            page: 0,
            page_count: 0,
        });
        self.set_save_enabled(false);
        self.set_tools(ToolbarState {
            enabled: false,
            active: None,
        });
        self.clear_overlay();
        self.hide_text_entry();
        self.set_cursor(CursorHint::Default);
        log_dom(
            self.viewer.class_list().remove_1("loaded"),
            "viewer",
        );
    }
}

impl DomView {
    /// Mark the viewer as showing a document.
    pub fn mark_loaded(&self) {
        log_dom(self.viewer.class_list().add_1("loaded"), "viewer");
    }
}

pub fn element_by_id<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("Element #{} not found", id)))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("Element #{} has an unexpected type", id)))
}

fn set_disabled(element: &Element, disabled: bool) {
    let result = if disabled {
        element.set_attribute("disabled", "")
    } else {
        element.remove_attribute("disabled")
    };
    log_dom(result, "disabled state");
}

fn log_dom(result: Result<(), JsValue>, what: &str) {
    if let Err(e) = result {
        warn!(what, error = ?e, "DOM update failed");
    }
}
