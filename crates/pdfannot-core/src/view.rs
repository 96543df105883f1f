//! Presentation callbacks driven by the annotator

use crate::coords::{DeviceRect, Point, Size};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Highlight,
    Text,
    Image,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Highlight, Tool::Text, Tool::Image];

    /// Name used by the toolbar's `data-tool` attribute
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Highlight => "highlight",
            Tool::Text => "text",
            Tool::Image => "image",
        }
    }

    pub fn parse(name: &str) -> Option<Tool> {
        Tool::ALL
            .into_iter()
            .find(|tool| tool.as_str().eq_ignore_ascii_case(name.trim()))
    }

    pub fn cursor(&self) -> CursorHint {
        match self {
            Tool::Highlight => CursorHint::Crosshair,
            Tool::Text => CursorHint::Text,
            Tool::Image => CursorHint::Copy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorHint {
    Default,
    Crosshair,
    Text,
    Copy,
}

impl CursorHint {
    /// CSS `cursor` value
    pub fn css(&self) -> &'static str {
        match self {
            CursorHint::Default => "default",
            CursorHint::Crosshair => "crosshair",
            CursorHint::Text => "text",
            CursorHint::Copy => "copy",
        }
    }
}

/// Page indicator and navigation button state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageNavigation {
    pub page: u32,
    pub page_count: u32,
}

impl PageNavigation {
    pub fn can_go_prev(&self) -> bool {
        self.page > 1
    }

    pub fn can_go_next(&self) -> bool {
        self.page < self.page_count
    }
}

/// Toolbar state: whether tools accept input, and which one is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolbarState {
    pub enabled: bool,
    pub active: Option<Tool>,
}

/// Everything the annotator needs from the UI.
///
/// Implementations only touch presentation; they never call back into the
/// annotator.
pub trait EditorView {
    /// Match the overlay to the rendered surface. Also clears it.
    fn resize_overlay(&mut self, size: Size);

    fn clear_overlay(&mut self);

    /// Draw the translucent drag preview (after clearing the overlay).
    fn draw_preview(&mut self, rect: DeviceRect);

    fn set_cursor(&mut self, cursor: CursorHint);

    fn update_navigation(&mut self, nav: PageNavigation);

    /// Show the inline text entry at `at`, empty and focused.
    fn show_text_entry(&mut self, at: Point);

    fn hide_text_entry(&mut self);

    fn set_tools(&mut self, toolbar: ToolbarState);

    fn set_save_enabled(&mut self, enabled: bool);

    /// Ask the user to pick an image file.
    fn request_image_file(&mut self);

    /// Back to the empty state: labels at 0, controls disabled, overlay
    /// cleared, text entry hidden, default cursor.
    fn reset(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_round_trip() {
        for tool in Tool::ALL {
            assert_eq!(Tool::parse(tool.as_str()), Some(tool));
        }
        assert_eq!(Tool::parse("Highlight"), Some(Tool::Highlight));
        assert_eq!(Tool::parse("eraser"), None);
    }

    #[test]
    fn test_tool_cursors() {
        assert_eq!(Tool::Text.cursor().css(), "text");
        assert_eq!(Tool::Highlight.cursor().css(), "crosshair");
        assert_eq!(Tool::Image.cursor().css(), "copy");
        assert_eq!(CursorHint::Default.css(), "default");
    }

    #[test]
    fn test_navigation_bounds() {
        let first = PageNavigation {
            page: 1,
            page_count: 3,
        };
        assert!(!first.can_go_prev());
        assert!(first.can_go_next());

        let last = PageNavigation {
            page: 3,
            page_count: 3,
        };
        assert!(last.can_go_prev());
        assert!(!last.can_go_next());

        let only = PageNavigation {
            page: 1,
            page_count: 1,
        };
        assert!(!only.can_go_prev() && !only.can_go_next());
    }
}
