//! Editor configuration
//!
//! Every field has a default; the browser may pass a partial JSON object to
//! override any of them.

use crate::error::AnnotError;
use crate::image::ImageFormat;
use crate::operations::{Rgb, TextStyle};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Render scale applied to page size in points
    pub zoom: f64,
    /// Highlight fill colour as "#RRGGBB"
    pub highlight_color: String,
    pub highlight_opacity: f64,
    /// Drags must exceed this in both directions (document points)
    pub min_highlight_extent: f64,
    pub font_family: Option<String>,
    pub font_size: f64,
    pub text_color: String,
    pub bold: bool,
    pub italic: bool,
    /// Text is drawn this far below the click point
    pub baseline_offset: f64,
    /// Placed images are scaled to this width in points
    pub image_width: f64,
    pub download_file_name: String,
    pub download_mime: String,
    pub image_mime_types: Vec<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            zoom: 1.5,
            highlight_color: "#FFFF00".to_string(),
            highlight_opacity: 0.3,
            min_highlight_extent: 1.0,
            font_family: None,
            font_size: 12.0,
            text_color: "#000000".to_string(),
            bold: false,
            italic: false,
            baseline_offset: 12.0,
            image_width: 150.0,
            download_file_name: "edited_document.pdf".to_string(),
            download_mime: "application/pdf".to_string(),
            image_mime_types: vec!["image/png".to_string(), "image/jpeg".to_string()],
        }
    }
}

impl EditorConfig {
    /// Parse a (possibly partial) JSON object and validate it.
    pub fn from_json(json: &str) -> Result<Self, AnnotError> {
        let config: EditorConfig = serde_json::from_str(json)
            .map_err(|e| AnnotError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnnotError> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(AnnotError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )))
            }
        };

        positive("zoom", self.zoom)?;
        positive("font_size", self.font_size)?;
        positive("image_width", self.image_width)?;

        if !(self.highlight_opacity > 0.0 && self.highlight_opacity <= 1.0) {
            return Err(AnnotError::InvalidConfig(format!(
                "highlight_opacity must be in (0, 1], got {}",
                self.highlight_opacity
            )));
        }

        if !self.min_highlight_extent.is_finite() || self.min_highlight_extent < 0.0 {
            return Err(AnnotError::InvalidConfig(
                "min_highlight_extent must not be negative".to_string(),
            ));
        }

        if !self.baseline_offset.is_finite() {
            return Err(AnnotError::InvalidConfig(
                "baseline_offset must be finite".to_string(),
            ));
        }

        self.highlight_rgb()?;
        self.text_rgb()?;

        if self.download_file_name.trim().is_empty() {
            return Err(AnnotError::InvalidConfig(
                "download_file_name must not be empty".to_string(),
            ));
        }

        if let Some(unknown) = self
            .image_mime_types
            .iter()
            .find(|m| ImageFormat::from_mime(m).is_none())
        {
            return Err(AnnotError::InvalidConfig(format!(
                "unsupported image type {}",
                unknown
            )));
        }

        Ok(())
    }

    pub fn highlight_rgb(&self) -> Result<Rgb, AnnotError> {
        parse_color("highlight_color", &self.highlight_color)
    }

    pub fn text_rgb(&self) -> Result<Rgb, AnnotError> {
        parse_color("text_color", &self.text_color)
    }

    pub fn text_style(&self) -> Result<TextStyle, AnnotError> {
        Ok(TextStyle {
            font_size: self.font_size,
            color: self.text_rgb()?,
            font_name: self.font_family.clone(),
            is_italic: self.italic,
            is_bold: self.bold,
        })
    }

    /// True when uploads of this MIME type are allowed. An empty type is
    /// left to content sniffing.
    pub fn accepts_image(&self, mime: &str) -> bool {
        mime.is_empty()
            || self
                .image_mime_types
                .iter()
                .any(|m| m.eq_ignore_ascii_case(mime.trim()))
    }
}

fn parse_color(field: &str, value: &str) -> Result<Rgb, AnnotError> {
    Rgb::from_hex(value).ok_or_else(|| {
        AnnotError::InvalidConfig(format!("{} is not a #RRGGBB colour: {}", field, value))
    })
}
