//! Mutable PDF object model on top of lopdf
//!
//! Every drawing is appended as a new content stream on the page, wrapped in
//! its own `q`/`Q` pair. The page's original content is wrapped once so any
//! graphics state it leaves behind cannot leak into added drawings.

use crate::coords::Size;
use crate::error::AnnotError;
use crate::image::DecodedImage;
use crate::operations::{Edit, PdfRect, Rgb, TextStyle};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

/// US Letter, used when a page carries no usable MediaBox
const DEFAULT_PAGE_SIZE: Size = Size {
    width: 612.0,
    height: 792.0,
};

/// Guard against malformed, cyclic page trees
const MAX_TREE_DEPTH: usize = 32;

/// Content stream that opens the wrap around a page's original content
const WRAP_OPEN: &[u8] = b"q\n";

/// Private stream dictionary key marking the wrap stream
const WRAP_MARKER: &[u8] = b"PdfannotWrap";

pub struct DocumentModel {
    doc: Document,
}

impl DocumentModel {
    /// Parse a document from raw bytes. A document without pages is rejected.
    pub fn load(bytes: &[u8]) -> Result<Self, AnnotError> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| AnnotError::LoadFailure(format!("PDF parse error: {}", e)))?;

        if doc.get_pages().is_empty() {
            return Err(AnnotError::LoadFailure(
                "document has no pages".to_string(),
            ));
        }

        Ok(Self { doc })
    }

    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Page object ID for a 1-indexed page number
    pub fn page_id(&self, page: u32) -> Option<ObjectId> {
        self.doc.get_pages().get(&page).copied()
    }

    /// Page size in points, from the (possibly inherited) MediaBox.
    pub fn page_size(&self, page: u32) -> Option<Size> {
        let page_id = self.page_id(page)?;
        let size = self
            .inherited_attribute(page_id, b"MediaBox")
            .and_then(|obj| self.parse_box(obj))
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Some(size)
    }

    /// Decoded content of a page, all streams concatenated.
    pub fn page_content(&self, page: u32) -> Option<Vec<u8>> {
        let page_id = self.page_id(page)?;
        self.doc.get_page_content(page_id).ok()
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Serialize the current object model.
    pub fn serialize(&mut self) -> Result<Vec<u8>, AnnotError> {
        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| AnnotError::SaveFailure(e.to_string()))?;
        Ok(buffer)
    }

    /// Draw an edit onto its page. Only called from the session's resync path.
    pub(crate) fn apply_edit(&mut self, edit: &Edit) -> Result<(), AnnotError> {
        let label = edit.label();
        let page_id = self
            .page_id(edit.page())
            .ok_or_else(|| AnnotError::mutation(label, format!("page {} not found", edit.page())))?;

        let result = match edit {
            Edit::Highlight {
                rect,
                color,
                opacity,
                ..
            } => self.draw_rectangle(page_id, rect, *color, *opacity),
            Edit::Text {
                origin,
                text,
                style,
                ..
            } => self.draw_text(page_id, origin.x, origin.y, text, style),
            Edit::Image { rect, image, .. } => self.draw_image(page_id, rect, image),
        };

        result.map_err(|reason| AnnotError::mutation(label, reason))
    }

    pub(crate) fn draw_rectangle(
        &mut self,
        page_id: ObjectId,
        rect: &PdfRect,
        color: Rgb,
        opacity: f64,
    ) -> Result<(), String> {
        let gs_id = self.doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => Object::Real(opacity as f32),
            "CA" => Object::Real(opacity as f32),
        });
        let gs_name = format!("AnnotGS{}", gs_id.0);
        self.register_resource(page_id, b"ExtGState", &gs_name, gs_id)?;

        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(gs_name.into_bytes())]),
            fill_color(color),
            Operation::new(
                "re",
                vec![real(rect.x), real(rect.y), real(rect.width), real(rect.height)],
            ),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ];

        debug!(?page_id, ?rect, opacity, "Drawing rectangle");
        self.append_content(page_id, operations)
    }

    /// Draw `text` with its first baseline at (x, y). Lines split on `\n`.
    pub(crate) fn draw_text(
        &mut self,
        page_id: ObjectId,
        x: f64,
        y: f64,
        text: &str,
        style: &TextStyle,
    ) -> Result<(), String> {
        // Encode everything before touching the document
        let lines = text
            .split('\n')
            .map(|line| encode_win_ansi(line.trim_end_matches('\r')))
            .collect::<Result<Vec<_>, _>>()?;

        let base_font = style.pdf_font_name();
        let font_id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => base_font,
            "Encoding" => "WinAnsiEncoding",
        });
        let font_name = format!("AnnotF{}", font_id.0);
        self.register_resource(page_id, b"Font", &font_name, font_id)?;

        let mut operations = vec![
            Operation::new("q", vec![]),
            fill_color(style.color),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(font_name.into_bytes()), real(style.font_size)],
            ),
            Operation::new("Td", vec![real(x), real(y)]),
        ];
        for (i, line) in lines.into_iter().enumerate() {
            if i > 0 {
                operations.push(Operation::new(
                    "Td",
                    vec![real(0.0), real(-style.line_height())],
                ));
            }
            if !line.is_empty() {
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::String(line, StringFormat::Literal)],
                ));
            }
        }
        operations.push(Operation::new("ET", vec![]));
        operations.push(Operation::new("Q", vec![]));

        debug!(?page_id, x, y, font = base_font, "Drawing text");
        self.append_content(page_id, operations)
    }

    /// Embed `image` as an XObject and paint it into `rect`.
    pub(crate) fn draw_image(
        &mut self,
        page_id: ObjectId,
        rect: &PdfRect,
        image: &DecodedImage,
    ) -> Result<(), String> {
        let mut image_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width as i64,
            "Height" => image.height as i64,
            "ColorSpace" => image.color_space.pdf_name(),
            "BitsPerComponent" => 8,
            "Filter" => image.filter(),
        };

        if let Some(decode) = image.decode_array() {
            image_dict.set(
                "Decode",
                Object::Array(decode.into_iter().map(real).collect()),
            );
        }

        if let Some(alpha) = &image.alpha {
            let smask_id = self.doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => image.width as i64,
                    "Height" => image.height as i64,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                    "Filter" => "FlateDecode",
                },
                alpha.clone(),
            ));
            image_dict.set("SMask", smask_id);
        }

        let image_id = self
            .doc
            .add_object(Stream::new(image_dict, image.data.clone()));
        let image_name = format!("AnnotIm{}", image_id.0);
        self.register_resource(page_id, b"XObject", &image_name, image_id)?;

        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    real(rect.width),
                    real(0.0),
                    real(0.0),
                    real(rect.height),
                    real(rect.x),
                    real(rect.y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(image_name.into_bytes())]),
            Operation::new("Q", vec![]),
        ];

        debug!(?page_id, ?rect, format = ?image.format, "Drawing image");
        self.append_content(page_id, operations)
    }

    /// Add `name -> target` to the page's resource category, copying
    /// inherited or shared resources into the page first.
    fn register_resource(
        &mut self,
        page_id: ObjectId,
        category: &[u8],
        name: &str,
        target: ObjectId,
    ) -> Result<(), String> {
        let mut resources = match self.inherited_attribute(page_id, b"Resources") {
            Some(obj) => self.resolve_dict(obj)?,
            None => Dictionary::new(),
        };

        let mut entries = match resources.remove(category) {
            Some(obj) => self.resolve_dict(&obj)?,
            None => Dictionary::new(),
        };
        entries.set(name, Object::Reference(target));
        resources.set(category, Object::Dictionary(entries));

        self.page_dict_mut(page_id)?
            .set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    /// Append one content stream. The first call on a page also wraps the
    /// existing content in `q`/`Q`.
    fn append_content(&mut self, page_id: ObjectId, operations: Vec<Operation>) -> Result<(), String> {
        let mut body = Content { operations }
            .encode()
            .map_err(|e| format!("Failed to encode content: {}", e))?;

        let mut contents = self.content_ids(page_id)?;
        if !contents.is_empty() && !self.is_wrapped(&contents) {
            let mut marker = Dictionary::new();
            marker.set(WRAP_MARKER, true);
            let open_id = self
                .doc
                .add_object(Stream::new(marker, WRAP_OPEN.to_vec()));
            contents.insert(0, open_id);
            let mut closed = b"Q\n".to_vec();
            closed.append(&mut body);
            body = closed;
        }

        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), body));
        contents.push(content_id);

        self.page_dict_mut(page_id)?.set(
            "Contents",
            Object::Array(contents.into_iter().map(Object::Reference).collect()),
        );
        Ok(())
    }

    fn is_wrapped(&self, contents: &[ObjectId]) -> bool {
        contents
            .first()
            .and_then(|id| self.doc.get_object(*id).ok())
            .and_then(|obj| obj.as_stream().ok())
            .and_then(|stream| stream.dict.get(WRAP_MARKER).ok())
            .and_then(|marker| marker.as_bool().ok())
            .unwrap_or(false)
    }

    fn content_ids(&self, page_id: ObjectId) -> Result<Vec<ObjectId>, String> {
        let page = self
            .doc
            .get_object(page_id)
            .and_then(|o| o.as_dict())
            .map_err(|_| "Page is not a dictionary".to_string())?;

        let refs = |items: &[Object]| {
            items
                .iter()
                .filter_map(|o| o.as_reference().ok())
                .collect::<Vec<_>>()
        };

        match page.get(b"Contents") {
            Err(_) => Ok(Vec::new()),
            Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                Ok(Object::Array(items)) => Ok(refs(items)),
                Ok(_) => Ok(vec![*id]),
                Err(e) => Err(format!("Failed to resolve page contents: {}", e)),
            },
            Ok(Object::Array(items)) => Ok(refs(items)),
            Ok(_) => Err("Page contents are neither a stream nor an array".to_string()),
        }
    }

    fn page_dict_mut(&mut self, page_id: ObjectId) -> Result<&mut Dictionary, String> {
        self.doc
            .get_object_mut(page_id)
            .and_then(|o| o.as_dict_mut())
            .map_err(|_| "Page is not a dictionary".to_string())
    }

    /// Look up a page attribute, walking up the page tree for inheritable keys.
    fn inherited_attribute(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = Some(page_id);
        for _ in 0..MAX_TREE_DEPTH {
            let id = current?;
            let dict = self.doc.get_object(id).and_then(|o| o.as_dict()).ok()?;
            if let Ok(value) = dict.get(key) {
                return Some(value);
            }
            current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
        }
        None
    }

    fn resolve_dict(&self, obj: &Object) -> Result<Dictionary, String> {
        match obj {
            Object::Dictionary(dict) => Ok(dict.clone()),
            Object::Reference(id) => self
                .doc
                .get_object(*id)
                .and_then(|o| o.as_dict())
                .cloned()
                .map_err(|e| format!("Failed to resolve dictionary: {}", e)),
            _ => Err("Expected a dictionary".to_string()),
        }
    }

    /// Width and height of a `[x1 y1 x2 y2]` box.
    fn parse_box(&self, obj: &Object) -> Option<Size> {
        let arr = match obj {
            Object::Reference(id) => self.doc.get_object(*id).ok()?.as_array().ok()?,
            other => other.as_array().ok()?,
        };
        if arr.len() != 4 {
            return None;
        }

        let mut values = [0.0f64; 4];
        for (slot, obj) in values.iter_mut().zip(arr) {
            *slot = self.number(obj)?;
        }

        let size = Size::new((values[2] - values[0]).abs(), (values[3] - values[1]).abs());
        (!size.is_degenerate()).then_some(size)
    }

    fn number(&self, obj: &Object) -> Option<f64> {
        match obj {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r as f64),
            Object::Reference(id) => self.number(self.doc.get_object(*id).ok()?),
            _ => None,
        }
    }
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn fill_color(color: Rgb) -> Operation {
    Operation::new(
        "rg",
        vec![
            Object::Real(color.r),
            Object::Real(color.g),
            Object::Real(color.b),
        ],
    )
}

/// Encode a line for a WinAnsiEncoding standard font.
///
/// Tabs become spaces; anything outside printable Latin-1 is rejected.
fn encode_win_ansi(line: &str) -> Result<Vec<u8>, String> {
    line.chars()
        .map(|c| match c as u32 {
            0x09 => Ok(b' '),
            code @ (0x20..=0x7E | 0xA0..=0xFF) => Ok(code as u8),
            _ => win_ansi_extra(c).ok_or_else(|| {
                format!("character {:?} cannot be drawn with a standard PDF font", c)
            }),
        })
        .collect()
}

/// WinAnsi 0x80-0x9F, the slots where it departs from Latin-1
fn win_ansi_extra(c: char) -> Option<u8> {
    let byte = match c {
        '\u{20AC}' => 0x80, // €
        '\u{201A}' => 0x82, // ‚
        '\u{0192}' => 0x83, // ƒ
        '\u{201E}' => 0x84, // „
        '\u{2026}' => 0x85, // …
        '\u{2020}' => 0x86, // †
        '\u{2021}' => 0x87, // ‡
        '\u{02C6}' => 0x88, // ˆ
        '\u{2030}' => 0x89, // ‰
        '\u{0160}' => 0x8A, // Š
        '\u{2039}' => 0x8B, // ‹
        '\u{0152}' => 0x8C, // Œ
        '\u{017D}' => 0x8E, // Ž
        '\u{2018}' => 0x91, // ‘
        '\u{2019}' => 0x92, // ’
        '\u{201C}' => 0x93, // “
        '\u{201D}' => 0x94, // ”
        '\u{2022}' => 0x95, // •
        '\u{2013}' => 0x96, // –
        '\u{2014}' => 0x97, // —
        '\u{02DC}' => 0x98, // ˜
        '\u{2122}' => 0x99, // ™
        '\u{0161}' => 0x9A, // š
        '\u{203A}' => 0x9B, // ›
        '\u{0153}' => 0x9C, // œ
        '\u{017E}' => 0x9E, // ž
        '\u{0178}' => 0x9F, // Ÿ
        _ => return None,
    };
    Some(byte)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::coords::Point;
    use crate::image::tests::{jpeg_stub, rgba_png};

    /// Build a PDF with `num_pages` pages of the given size, each with a
    /// short text content stream.
    pub(crate) fn sample_pdf(num_pages: u32, width: i64, height: i64) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });

        let mut kids = Vec::new();
        for i in 0..num_pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new(
                        "Tj",
                        vec![Object::string_literal(format!("Page {}", i + 1))],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        // MediaBox and Resources inherited from the page tree root
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => num_pages as i64,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(width),
                    Object::Integer(height),
                ],
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

    fn content_text(model: &DocumentModel, page: u32) -> String {
        String::from_utf8_lossy(&model.page_content(page).unwrap()).into_owned()
    }

    fn page_resources(model: &DocumentModel, page: u32) -> Dictionary {
        let page_id = model.page_id(page).unwrap();
        let page = model.document().get_object(page_id).unwrap().as_dict().unwrap();
        page.get(b"Resources").unwrap().as_dict().unwrap().clone()
    }

    #[test]
    fn test_load_counts_pages_and_inherits_media_box() {
        let model = DocumentModel::load(&sample_pdf(3, 600, 600)).unwrap();
        assert_eq!(model.page_count(), 3);
        assert_eq!(model.page_size(2), Some(Size::new(600.0, 600.0)));
        assert_eq!(model.page_size(4), None);
    }

    #[test]
    fn test_load_rejects_garbage() {
        assert!(matches!(
            DocumentModel::load(b"not a pdf at all"),
            Err(AnnotError::LoadFailure(_))
        ));
        assert!(DocumentModel::load(&[]).is_err());
    }

    #[test]
    fn test_highlight_appends_wrapped_content() {
        let mut model = DocumentModel::load(&sample_pdf(1, 600, 600)).unwrap();
        let edit = Edit::Highlight {
            page: 1,
            rect: PdfRect::from_corners(Point::new(30.0, 420.0), Point::new(330.0, 570.0)),
            color: Rgb::YELLOW,
            opacity: 0.3,
        };
        model.apply_edit(&edit).unwrap();

        let content = content_text(&model, 1);
        assert!(content.starts_with("q\n"), "original content wrapped: {}", content);
        assert!(content.contains("Page 1"));
        assert!(content.contains("30 420 300 150 re"), "{}", content);
        assert!(content.contains("1 1 0 rg"));

        // Inherited font stays available next to the new graphics state
        let resources = page_resources(&model, 1);
        assert!(resources.get(b"Font").unwrap().as_dict().unwrap().has(b"F1"));
        assert_eq!(resources.get(b"ExtGState").unwrap().as_dict().unwrap().len(), 1);
    }

    #[test]
    fn test_wrap_applied_once() {
        let mut model = DocumentModel::load(&sample_pdf(1, 612, 792)).unwrap();
        let edit = Edit::Highlight {
            page: 1,
            rect: PdfRect::from_corners(Point::ZERO, Point::new(10.0, 10.0)),
            color: Rgb::YELLOW,
            opacity: 0.3,
        };
        model.apply_edit(&edit).unwrap();
        model.apply_edit(&edit).unwrap();

        let content = content_text(&model, 1);
        assert_eq!(content.matches("re").count(), 2);
        assert_eq!(content.matches('q').count(), content.matches('Q').count());
    }

    #[test]
    fn test_text_multiline() {
        let mut model = DocumentModel::load(&sample_pdf(1, 612, 792)).unwrap();
        let edit = Edit::Text {
            page: 1,
            origin: Point::new(100.0, 500.0),
            text: "Hello\nWorld".to_string(),
            style: TextStyle::default(),
        };
        model.apply_edit(&edit).unwrap();

        let content = content_text(&model, 1);
        assert!(content.contains("(Hello) Tj"), "{}", content);
        assert!(content.contains("(World) Tj"));
        assert!(content.contains("100 500 Td"));
        assert!(content.contains("0 -14.4 Td"));

        let fonts = page_resources(&model, 1);
        let fonts = fonts.get(b"Font").unwrap().as_dict().unwrap();
        assert_eq!(fonts.len(), 2);
    }

    #[test]
    fn test_text_outside_latin1_is_rejected_without_mutation() {
        let mut model = DocumentModel::load(&sample_pdf(1, 612, 792)).unwrap();
        let before = model.page_content(1).unwrap();
        let edit = Edit::Text {
            page: 1,
            origin: Point::new(10.0, 10.0),
            text: "snowman \u{2603}".to_string(),
            style: TextStyle::default(),
        };
        let err = model.apply_edit(&edit).unwrap_err();
        assert!(matches!(err, AnnotError::MutationFailure { edit: "text", .. }));
        assert_eq!(model.page_content(1).unwrap(), before);
    }

    #[test]
    fn test_latin1_text_is_encoded() {
        assert_eq!(encode_win_ansi("café").unwrap(), b"caf\xE9".to_vec());
        assert_eq!(encode_win_ansi("a\tb").unwrap(), b"a b".to_vec());
    }

    #[test]
    fn test_smart_punctuation_uses_win_ansi_slots() {
        assert_eq!(encode_win_ansi("\u{20AC}5").unwrap(), b"\x805".to_vec());
        assert_eq!(encode_win_ansi("it\u{2019}s").unwrap(), b"it\x92s".to_vec());
        assert_eq!(encode_win_ansi("a \u{2013} b").unwrap(), b"a \x96 b".to_vec());
        assert_eq!(
            encode_win_ansi("\u{201C}q\u{201D}").unwrap(),
            b"\x93q\x94".to_vec()
        );
        assert_eq!(encode_win_ansi("\u{2122}\u{0178}").unwrap(), b"\x99\x9F".to_vec());
    }

    #[test]
    fn test_characters_without_win_ansi_slot_are_rejected() {
        assert!(encode_win_ansi("\u{4E2D}").is_err());
        assert!(encode_win_ansi("\u{0080}").is_err());
        assert!(encode_win_ansi("\u{2603}").is_err());
    }

    #[test]
    fn test_page_starting_with_save_state_is_still_wrapped() {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        let mut model = DocumentModel::load(&bytes).unwrap();
        let edit = Edit::Highlight {
            page: 1,
            rect: PdfRect::from_corners(Point::new(10.0, 10.0), Point::new(60.0, 30.0)),
            color: Rgb::YELLOW,
            opacity: 0.3,
        };
        model.apply_edit(&edit).unwrap();

        let content = content_text(&model, 1);
        assert!(content.starts_with("q\nq\n"), "source content wrapped: {}", content);
        // One Q closes the wrap, one closes the highlight
        assert_eq!(content.matches('Q').count(), 2, "{}", content);
    }

    #[test]
    fn test_wrap_survives_reload() {
        let mut model = DocumentModel::load(&sample_pdf(1, 612, 792)).unwrap();
        let edit = Edit::Highlight {
            page: 1,
            rect: PdfRect::from_corners(Point::new(10.0, 10.0), Point::new(60.0, 30.0)),
            color: Rgb::YELLOW,
            opacity: 0.3,
        };
        model.apply_edit(&edit).unwrap();
        let bytes = model.serialize().unwrap();

        let mut reloaded = DocumentModel::load(&bytes).unwrap();
        reloaded.apply_edit(&edit).unwrap();
        let content = content_text(&reloaded, 1);
        assert!(content.starts_with("q\nBT"), "wrapped once: {}", content);
        assert_eq!(content.matches('q').count(), content.matches('Q').count());
    }

    #[test]
    fn test_png_image_gets_soft_mask() {
        let mut model = DocumentModel::load(&sample_pdf(1, 612, 792)).unwrap();
        let image = DecodedImage::decode(Some("image/png"), &rgba_png(4, 4, 0x40)).unwrap();
        let edit = Edit::Image {
            page: 1,
            rect: PdfRect {
                x: 50.0,
                y: 600.0,
                width: 150.0,
                height: 150.0,
            },
            image,
        };
        model.apply_edit(&edit).unwrap();

        let content = content_text(&model, 1);
        assert!(content.contains("150 0 0 150 50 600 cm"), "{}", content);

        let resources = page_resources(&model, 1);
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let (_, image_ref) = xobjects.iter().next().unwrap();
        let stream = model
            .document()
            .get_object(image_ref.as_reference().unwrap())
            .unwrap()
            .as_stream()
            .unwrap();
        assert!(stream.dict.has(b"SMask"));
        assert_eq!(stream.dict.get(b"Filter").unwrap().as_name().unwrap(), b"FlateDecode");
    }

    #[test]
    fn test_jpeg_passthrough() {
        let mut model = DocumentModel::load(&sample_pdf(1, 612, 792)).unwrap();
        let jpeg = jpeg_stub(20, 10, 3);
        let image = DecodedImage::decode(Some("image/jpeg"), &jpeg).unwrap();
        let edit = Edit::Image {
            page: 1,
            rect: PdfRect {
                x: 0.0,
                y: 0.0,
                width: 150.0,
                height: 75.0,
            },
            image,
        };
        model.apply_edit(&edit).unwrap();

        let found = model.document().objects.values().any(|obj| {
            obj.as_stream()
                .map(|s| s.content == jpeg && !s.dict.has(b"SMask"))
                .unwrap_or(false)
        });
        assert!(found, "JPEG bytes embedded unchanged");
    }

    fn embedded_image_dict(model: &DocumentModel, components: u8) -> Dictionary {
        model
            .document()
            .objects
            .values()
            .filter_map(|obj| obj.as_stream().ok())
            .find(|s| s.content == jpeg_stub(20, 10, components))
            .map(|s| s.dict.clone())
            .unwrap()
    }

    fn place_jpeg(model: &mut DocumentModel, components: u8) {
        let image =
            DecodedImage::decode(Some("image/jpeg"), &jpeg_stub(20, 10, components)).unwrap();
        let edit = Edit::Image {
            page: 1,
            rect: PdfRect {
                x: 0.0,
                y: 0.0,
                width: 150.0,
                height: 75.0,
            },
            image,
        };
        model.apply_edit(&edit).unwrap();
    }

    #[test]
    fn test_cmyk_jpeg_gets_inverting_decode() {
        let mut model = DocumentModel::load(&sample_pdf(1, 612, 792)).unwrap();
        place_jpeg(&mut model, 4);

        let dict = embedded_image_dict(&model, 4);
        assert_eq!(dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceCMYK");
        let decode: Vec<f32> = dict
            .get(b"Decode")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_float().unwrap())
            .collect();
        assert_eq!(decode, vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_rgb_jpeg_has_no_decode() {
        let mut model = DocumentModel::load(&sample_pdf(1, 612, 792)).unwrap();
        place_jpeg(&mut model, 3);

        assert!(!embedded_image_dict(&model, 3).has(b"Decode"));
    }

    #[test]
    fn test_edit_on_missing_page_fails() {
        let mut model = DocumentModel::load(&sample_pdf(1, 612, 792)).unwrap();
        let edit = Edit::Highlight {
            page: 5,
            rect: PdfRect::from_corners(Point::ZERO, Point::new(10.0, 10.0)),
            color: Rgb::YELLOW,
            opacity: 0.3,
        };
        assert!(matches!(
            model.apply_edit(&edit),
            Err(AnnotError::MutationFailure { edit: "highlight", .. })
        ));
    }

    #[test]
    fn test_serialize_round_trip_keeps_edit() {
        let mut model = DocumentModel::load(&sample_pdf(2, 612, 792)).unwrap();
        let edit = Edit::Highlight {
            page: 2,
            rect: PdfRect::from_corners(Point::new(1.0, 2.0), Point::new(11.0, 22.0)),
            color: Rgb::YELLOW,
            opacity: 0.3,
        };
        model.apply_edit(&edit).unwrap();
        let bytes = model.serialize().unwrap();

        let reloaded = DocumentModel::load(&bytes).unwrap();
        assert_eq!(reloaded.page_count(), 2);
        assert!(content_text(&reloaded, 2).contains("1 2 10 20 re"));
        assert!(!content_text(&reloaded, 1).contains(" re"));
    }
}
