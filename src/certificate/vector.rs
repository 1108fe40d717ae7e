use chrono::NaiveDate;
use printpdf::{
    lopdf, BuiltinFont, Color, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject,
    IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Px, Rgb,
};
use tracing::warn;

use super::fonts::{truetype_advance, FontFace, FontHandle, ResolvedFonts};
use super::layout::{LayoutConfig, Positions, TextMeasure};
use super::template::TemplateAsset;
use super::{format_date, issued_label, validate, CertificateError, CertificateStyle, Ink};
use crate::roster::StudentRecord;

const FOOTER_FONT_SIZE: f32 = 12.0;
const FOOTER_LEFT: f32 = 50.0;
const FOOTER_ISSUED_X: f32 = 400.0;
/// Footer baselines, measured up from the bottom edge.
const FOOTER_BATCH_Y: f32 = 50.0;
const FOOTER_ID_Y: f32 = 35.0;

/// Page units are points; one template pixel maps to one point.
fn pt(value: f32) -> Mm {
    Mm(value * 25.4 / 72.0)
}

fn fill(layer: &PdfLayerReference, ink: Ink) {
    let (r, g, b) = ink.unit_rgb();
    layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
}

/// Builds a one-page PDF the size of the template with the template as
/// background and the record as vector text.
pub fn render_vector(
    template: &TemplateAsset,
    record: &StudentRecord,
    positions: &Positions,
    fonts: &ResolvedFonts,
    layout: &LayoutConfig,
    style: &CertificateStyle,
    issued_on: NaiveDate,
) -> Result<Vec<u8>, CertificateError> {
    validate(record)?;

    let dims = template.dimensions();
    let page_height = dims.height as f32;
    let (doc, page, layer) = PdfDocument::new(
        "Certificate of Completion",
        pt(dims.width as f32),
        pt(page_height),
        "Certificate",
    );
    let layer = doc.get_page(page).get_layer(layer);

    // 72 dpi keeps the artwork at one pixel per point, so it covers the page exactly.
    let background = Image::from(ImageXObject {
        width: Px(dims.width as usize),
        height: Px(dims.height as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: false,
        image_data: template.image().as_raw().clone(),
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    });
    background.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(0.0)),
            translate_y: Some(Mm(0.0)),
            dpi: Some(72.0),
            ..Default::default()
        },
    );

    let (bold, regular) = document_fonts(&doc, fonts)?;

    let name = record.student_name.trim().to_uppercase();
    let start = format_date(&record.batch_start_date, layout.date_mode);
    let end = format_date(&record.batch_end_date, layout.date_mode);

    fill(&layer, style.name_color);
    layer.use_text(
        name,
        fonts.name.size(),
        pt(positions.name.x),
        pt(page_height - positions.name.y),
        &bold,
    );

    fill(&layer, style.date_color);
    for (text, at) in [(start, positions.start_date), (end, positions.end_date)] {
        layer.use_text(text, fonts.date.size(), pt(at.x), pt(page_height - at.y), &regular);
    }

    fill(&layer, style.footer_color);
    for line in footer_lines(record, issued_on) {
        layer.use_text(line.text, FOOTER_FONT_SIZE, pt(line.x), pt(line.y), &regular);
    }

    let raw = doc
        .save_to_bytes()
        .map_err(|e| CertificateError::Encoding(format!("PDF encoding failed: {}", e)))?;
    compress(&raw)
}

/// One footer string, positioned from the bottom-left corner of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct FooterLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

pub fn footer_lines(record: &StudentRecord, issued_on: NaiveDate) -> [FooterLine; 3] {
    [
        FooterLine {
            text: format!("Batch: {}", record.batch_number),
            x: FOOTER_LEFT,
            y: FOOTER_BATCH_Y,
        },
        FooterLine {
            text: format!("SixerClass ID: {}", record.sixerclass_id),
            x: FOOTER_LEFT,
            y: FOOTER_ID_Y,
        },
        FooterLine {
            text: format!("Issued on: {}", issued_label(issued_on)),
            x: FOOTER_ISSUED_X,
            y: FOOTER_ID_Y,
        },
    ]
}

/// Flate-compresses every stream, the background image included. The
/// writer only does this itself in release builds.
fn compress(raw: &[u8]) -> Result<Vec<u8>, CertificateError> {
    let mut doc = lopdf::Document::load_mem(raw)
        .map_err(|e| CertificateError::Encoding(format!("PDF reload failed: {}", e)))?;
    doc.compress();
    let mut out = Vec::with_capacity(raw.len() / 4);
    doc.save_to(&mut out)
        .map_err(|e| CertificateError::Encoding(format!("PDF compression failed: {}", e)))?;
    Ok(out)
}

/// Bold font for the name and regular font for dates and footer. A resolved
/// TrueType face is embedded when it is a standalone font file; the name only
/// takes the TrueType face when it is a bold weight, otherwise Helvetica-Bold.
fn document_fonts(
    doc: &PdfDocumentReference,
    fonts: &ResolvedFonts,
) -> Result<(IndirectFontRef, IndirectFontRef), CertificateError> {
    let builtin = |font: BuiltinFont| {
        doc.add_builtin_font(font)
            .map_err(|e| CertificateError::Encoding(format!("PDF font setup failed: {}", e)))
    };

    let bold = match embeddable_bold(&fonts.name).and_then(|data| embed(doc, data)) {
        Some(font) => font,
        None => builtin(BuiltinFont::HelveticaBold)?,
    };
    let regular = match embeddable_face(&fonts.date).and_then(|data| embed(doc, data)) {
        Some(font) => font,
        None => builtin(BuiltinFont::Helvetica)?,
    };
    Ok((bold, regular))
}

fn embed(doc: &PdfDocumentReference, data: &[u8]) -> Option<IndirectFontRef> {
    doc.add_external_font(data)
        .map_err(|e| warn!("Cannot embed certificate font, using Helvetica: {}", e))
        .ok()
}

fn embeddable_face(handle: &FontHandle) -> Option<&[u8]> {
    match handle.face() {
        FontFace::TrueType(face) if face.index() == 0 => Some(face.data()),
        _ => None,
    }
}

fn embeddable_bold(handle: &FontHandle) -> Option<&[u8]> {
    embeddable_face(handle).filter(|_| handle.is_bold())
}

/// Measures text the way the PDF will draw it: the embedded bold face when
/// there is one, Helvetica-Bold metrics otherwise.
pub struct PdfTextMeasure<'a> {
    handle: &'a FontHandle,
}

impl<'a> PdfTextMeasure<'a> {
    pub fn bold(handle: &'a FontHandle) -> Self {
        Self { handle }
    }
}

impl TextMeasure for PdfTextMeasure<'_> {
    fn text_width(&self, text: &str) -> f32 {
        match self.handle.face() {
            FontFace::TrueType(face) if embeddable_bold(self.handle).is_some() => {
                truetype_advance(face.font(), self.handle.size(), text)
            }
            _ => helvetica_bold_width(text, self.handle.size()),
        }
    }
}

/// Helvetica-Bold advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 278, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    333, 333, 584, 584, 584, 611, 975, // ':'..'@'
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    333, 278, 333, 584, 556, 333, // '['..'`'
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // 'a'..'m'
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // 'n'..'z'
    389, 280, 389, 584, // '{'..'~'
];

pub fn helvetica_bold_width(text: &str, size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| match c as u32 {
            code @ 32..=126 => HELVETICA_BOLD_WIDTHS[(code - 32) as usize] as u32,
            _ => 556,
        })
        .sum();
    units as f32 * size / 1000.0
}
