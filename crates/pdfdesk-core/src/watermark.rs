//! Centered, semi-transparent text stamped over every page

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::builder::copy_document;
use crate::error::PdfEditError;
use crate::output::PdfOutput;

pub const DEFAULT_FONT_SIZE: f32 = 40.0;
pub const DEFAULT_OPACITY: f32 = 0.3;
const DEFAULT_COLOR: (f32, f32, f32) = (0.5, 0.5, 0.5);

/// Average Helvetica glyph width as a fraction of the font size
const AVG_GLYPH_WIDTH: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct Watermark {
    pub text: String,
    pub font_size: f32,
    pub color: (f32, f32, f32),
    pub opacity: f32,
}

impl Watermark {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_size: DEFAULT_FONT_SIZE,
            color: DEFAULT_COLOR,
            opacity: DEFAULT_OPACITY,
        }
    }

    pub fn with_font_size(mut self, size: f32) -> Result<Self, PdfEditError> {
        if !size.is_finite() || size <= 0.0 {
            return Err(PdfEditError::InvalidInput(
                "Font size must be greater than 0".into(),
            ));
        }
        self.font_size = size;
        Ok(self)
    }

    pub fn with_color(mut self, hex: &str) -> Result<Self, PdfEditError> {
        self.color = parse_hex_color(hex).ok_or_else(|| {
            PdfEditError::InvalidInput(format!("Invalid color '{}'. Use #RRGGBB", hex))
        })?;
        Ok(self)
    }
}

/// Parse hex color string (e.g., "#FF0000" or "FF0000") to RGB floats (0-1 range)
fn parse_hex_color(color: &str) -> Option<(f32, f32, f32)> {
    let hex = color.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16)
            .ok()
            .map(|v| v as f32 / 255.0)
    };
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Stamp `watermark` at the center of every page
pub fn add_watermark(
    bytes: &[u8],
    watermark: &Watermark,
    output_name: &str,
) -> Result<PdfOutput, PdfEditError> {
    if watermark.text.trim().is_empty() {
        return Err(PdfEditError::InvalidInput(
            "Watermark text cannot be empty".into(),
        ));
    }

    let source = crate::load(bytes)?;
    let mut doc = copy_document(&source)?;

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ]));
    let gs_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"ExtGState".to_vec())),
        ("ca", Object::Real(watermark.opacity)),
        ("CA", Object::Real(watermark.opacity)),
    ]));
    // Wraps the original content so its graphics state cannot leak into the stamp
    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));

    let stamp = Stamp {
        watermark,
        font_id,
        gs_id,
        save_id,
    };
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for page_id in page_ids {
        stamp.apply(&mut doc, page_id)?;
    }

    doc.compress();
    let content = crate::save(doc)?;
    Ok(PdfOutput::new(
        output_name,
        "Watermark added successfully",
        content,
    ))
}

struct Stamp<'a> {
    watermark: &'a Watermark,
    font_id: ObjectId,
    gs_id: ObjectId,
    save_id: ObjectId,
}

impl Stamp<'_> {
    fn apply(&self, doc: &mut Document, page_id: ObjectId) -> Result<(), PdfEditError> {
        let page = doc.get_dictionary(page_id)?.clone();

        let mut resources = resolve_dict(doc, page.get(b"Resources").ok());
        let mut fonts = resolve_dict(doc, resources.get(b"Font").ok());
        let mut states = resolve_dict(doc, resources.get(b"ExtGState").ok());
        let font_name = unique_name(&fonts, "WmF");
        let gs_name = unique_name(&states, "WmGs");
        fonts.set(font_name.clone(), Object::Reference(self.font_id));
        states.set(gs_name.clone(), Object::Reference(self.gs_id));
        resources.set("Font", Object::Dictionary(fonts));
        resources.set("ExtGState", Object::Dictionary(states));

        let (llx, lly, urx, ury) = page_box(doc, &page);
        let operations = self.operations(font_name, gs_name, (llx + urx) / 2.0, (lly + ury) / 2.0);
        // Leading newline keeps the stamp tokens apart from the previous stream
        let mut encoded = b"\n".to_vec();
        encoded.extend(Content { operations }.encode()?);
        let stamp_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

        let mut contents = vec![Object::Reference(self.save_id)];
        match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Array(items)) => contents.extend(items.iter().cloned()),
                _ => contents.push(Object::Reference(*id)),
            },
            Ok(Object::Array(items)) => contents.extend(items.iter().cloned()),
            _ => {}
        }
        contents.push(Object::Reference(stamp_id));

        let dict = doc.get_object_mut(page_id).and_then(Object::as_dict_mut)?;
        dict.set("Resources", Object::Dictionary(resources));
        dict.set("Contents", Object::Array(contents));
        Ok(())
    }

    fn operations(&self, font: Vec<u8>, gs: Vec<u8>, mid_x: f32, mid_y: f32) -> Vec<Operation> {
        let wm = self.watermark;
        let text = encode_win_ansi(&wm.text);
        let width = text.len() as f32 * AVG_GLYPH_WIDTH * wm.font_size;
        let (r, g, b) = wm.color;

        vec![
            Operation::new("Q", vec![]),
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(gs)]),
            Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(font), Object::Real(wm.font_size)]),
            Operation::new(
                "Td",
                vec![Object::Real(mid_x - width / 2.0), Object::Real(mid_y)],
            ),
            Operation::new("Tj", vec![Object::String(text, StringFormat::Literal)]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]
    }
}

/// Clone a dictionary held inline or behind a reference
fn resolve_dict(doc: &Document, obj: Option<&Object>) -> Dictionary {
    match obj {
        Some(Object::Dictionary(dict)) => dict.clone(),
        Some(Object::Reference(id)) => doc
            .get_dictionary(*id)
            .map(Clone::clone)
            .unwrap_or_else(|_| Dictionary::new()),
        _ => Dictionary::new(),
    }
}

fn unique_name(dict: &Dictionary, prefix: &str) -> Vec<u8> {
    (1..)
        .map(|n| format!("{}{}", prefix, n).into_bytes())
        .find(|name| !dict.has(name))
        .unwrap_or_else(|| prefix.as_bytes().to_vec())
}

/// Visible area of the page: CropBox, else MediaBox, else US Letter
fn page_box(doc: &Document, page: &Dictionary) -> (f32, f32, f32, f32) {
    for key in [b"CropBox".as_slice(), b"MediaBox".as_slice()] {
        let Ok(value) = page.get(key) else {
            continue;
        };
        let value = match value {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(resolved) => resolved,
                Err(_) => continue,
            },
            other => other,
        };
        if let Ok(arr) = value.as_array() {
            let nums: Vec<f32> = arr.iter().filter_map(|v| v.as_float().ok()).collect();
            if let &[x0, y0, x1, y1] = nums.as_slice() {
                return (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1));
            }
        }
    }
    (0.0, 0.0, 612.0, 792.0)
}

/// Latin-1 characters map directly; anything else becomes '?'
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
