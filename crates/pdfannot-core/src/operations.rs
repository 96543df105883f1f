//! Edits that can be applied to a loaded document
//!
//! An [`Edit`] is fully resolved to document space before it reaches the
//! object model: page number, rectangle in points, colours as RGB.

use crate::coords::Point;
use crate::image::DecodedImage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PdfRect {
    /// Build a rectangle spanning two document-space corners in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }
}

/// Colour with components in the 0-1 range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const YELLOW: Rgb = Rgb {
        r: 1.0,
        g: 1.0,
        b: 0.0,
    };

    /// Parse "#RRGGBB" or "RRGGBB".
    pub fn from_hex(color: &str) -> Option<Rgb> {
        let hex = color.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .ok()
                .map(|v| v as f32 / 255.0)
        };
        Some(Rgb {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextStyle {
    pub font_size: f64,
    pub color: Rgb,
    /// Font family; mapped to one of the PDF standard fonts.
    #[serde(default)]
    pub font_name: Option<String>,
    #[serde(default)]
    pub is_italic: bool,
    #[serde(default)]
    pub is_bold: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            color: Rgb::BLACK,
            font_name: None,
            is_italic: false,
            is_bold: false,
        }
    }
}

impl TextStyle {
    /// Standard 14 font name for this style's family and flags.
    pub fn pdf_font_name(&self) -> &'static str {
        let base_font = match &self.font_name {
            Some(name) => map_font_family_to_base(name),
            None => "Helvetica",
        };

        match base_font {
            "Times-Roman" => match (self.is_bold, self.is_italic) {
                (true, true) => "Times-BoldItalic",
                (true, false) => "Times-Bold",
                (false, true) => "Times-Italic",
                (false, false) => "Times-Roman",
            },
            "Courier" => match (self.is_bold, self.is_italic) {
                (true, true) => "Courier-BoldOblique",
                (true, false) => "Courier-Bold",
                (false, true) => "Courier-Oblique",
                (false, false) => "Courier",
            },
            _ => match (self.is_bold, self.is_italic) {
                (true, true) => "Helvetica-BoldOblique",
                (true, false) => "Helvetica-Bold",
                (false, true) => "Helvetica-Oblique",
                (false, false) => "Helvetica",
            },
        }
    }

    /// Distance between consecutive baselines of multi-line text.
    pub fn line_height(&self) -> f64 {
        self.font_size * 1.2
    }
}

/// Map a font family name to a base PDF font (without style variants)
fn map_font_family_to_base(name: &str) -> &'static str {
    let lower = name.to_lowercase();

    match lower.as_str() {
        "serif" => return "Times-Roman",
        "sans-serif" => return "Helvetica",
        "monospace" => return "Courier",
        _ => {}
    }

    if lower.contains("times") || lower.contains("georgia") || lower.contains("garamond") {
        return "Times-Roman";
    }

    if lower.contains("courier")
        || lower.contains("mono")
        || lower.contains("consolas")
        || lower.contains("monaco")
    {
        return "Courier";
    }

    "Helvetica"
}

#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// Filled translucent rectangle
    Highlight {
        page: u32,
        rect: PdfRect,
        color: Rgb,
        opacity: f64,
    },
    /// Text drawn with its first baseline at `origin`
    Text {
        page: u32,
        origin: Point,
        text: String,
        style: TextStyle,
    },
    /// Image scaled into `rect` (bottom-left anchored)
    Image {
        page: u32,
        rect: PdfRect,
        image: DecodedImage,
    },
}

impl Edit {
    pub fn page(&self) -> u32 {
        match self {
            Edit::Highlight { page, .. } => *page,
            Edit::Text { page, .. } => *page,
            Edit::Image { page, .. } => *page,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Edit::Highlight { .. } => "highlight",
            Edit::Text { .. } => "text",
            Edit::Image { .. } => "image",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_from_corners_any_order() {
        let a = Point::new(330.0, 420.0);
        let b = Point::new(30.0, 570.0);
        let rect = PdfRect::from_corners(a, b);
        assert_eq!(rect.x, 30.0);
        assert_eq!(rect.y, 420.0);
        assert_eq!(rect.width, 300.0);
        assert_eq!(rect.height, 150.0);
        assert_eq!(PdfRect::from_corners(b, a), rect);
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(Rgb::from_hex("#FFFF00"), Some(Rgb::YELLOW));
        assert_eq!(Rgb::from_hex("000000"), Some(Rgb::BLACK));
        let red = Rgb::from_hex("#ff0000").unwrap();
        assert_eq!((red.r, red.g, red.b), (1.0, 0.0, 0.0));
    }

    #[test]
    fn test_parse_hex_color_rejects_garbage() {
        assert_eq!(Rgb::from_hex("#FFF"), None);
        assert_eq!(Rgb::from_hex("#GG0000"), None);
        assert_eq!(Rgb::from_hex(""), None);
        assert_eq!(Rgb::from_hex("#ÄÄÄ"), None);
    }

    #[test]
    fn test_font_mapping_families() {
        let style = |name: &str| TextStyle {
            font_name: Some(name.to_string()),
            ..TextStyle::default()
        };
        assert_eq!(style("serif").pdf_font_name(), "Times-Roman");
        assert_eq!(style("sans-serif").pdf_font_name(), "Helvetica");
        assert_eq!(style("monospace").pdf_font_name(), "Courier");
        assert_eq!(style("Georgia").pdf_font_name(), "Times-Roman");
        assert_eq!(style("Consolas").pdf_font_name(), "Courier");
        assert_eq!(style("UnknownFont").pdf_font_name(), "Helvetica");
    }

    #[test]
    fn test_default_style_is_helvetica_12() {
        let style = TextStyle::default();
        assert_eq!(style.pdf_font_name(), "Helvetica");
        assert_eq!(style.font_size, 12.0);
        assert_eq!(style.color, Rgb::BLACK);
    }

    #[test]
    fn test_font_variants() {
        let style = TextStyle {
            font_name: Some("serif".to_string()),
            is_bold: true,
            is_italic: true,
            ..TextStyle::default()
        };
        assert_eq!(style.pdf_font_name(), "Times-BoldItalic");

        let style = TextStyle {
            is_italic: true,
            ..TextStyle::default()
        };
        assert_eq!(style.pdf_font_name(), "Helvetica-Oblique");

        let style = TextStyle {
            font_name: Some("Courier New".to_string()),
            is_bold: true,
            ..TextStyle::default()
        };
        assert_eq!(style.pdf_font_name(), "Courier-Bold");
    }

    #[test]
    fn test_edit_page_and_label() {
        let edit = Edit::Text {
            page: 3,
            origin: Point::new(10.0, 20.0),
            text: "Hi".to_string(),
            style: TextStyle::default(),
        };
        assert_eq!(edit.page(), 3);
        assert_eq!(edit.label(), "text");

        let edit = Edit::Highlight {
            page: 1,
            rect: PdfRect::from_corners(Point::ZERO, Point::new(5.0, 5.0)),
            color: Rgb::YELLOW,
            opacity: 0.3,
        };
        assert_eq!(edit.page(), 1);
        assert_eq!(edit.label(), "highlight");
    }
}
