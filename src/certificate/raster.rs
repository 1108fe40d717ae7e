use image::{Rgb, RgbImage};
use png::{BitDepth, ColorType, Encoder};
use rusttype::{point, Scale};

use super::fonts::{FontFace, FontHandle, ResolvedFonts};
use super::layout::{LayoutConfig, Point, Positions};
use super::template::TemplateAsset;
use super::{bitmap_font, format_date, validate, CertificateError, CertificateStyle, Ink};
use crate::roster::StudentRecord;

/// Stamps the record onto a copy of the template and returns PNG bytes.
pub fn render_raster(
    template: &TemplateAsset,
    record: &StudentRecord,
    positions: &Positions,
    fonts: &ResolvedFonts,
    layout: &LayoutConfig,
    style: &CertificateStyle,
) -> Result<Vec<u8>, CertificateError> {
    validate(record)?;

    let mut canvas = template.image().clone();
    let name = record.student_name.trim().to_uppercase();
    let start = format_date(&record.batch_start_date, layout.date_mode);
    let end = format_date(&record.batch_end_date, layout.date_mode);

    draw_text(&mut canvas, &fonts.name, positions.name, style.name_color, &name);
    draw_text(&mut canvas, &fonts.date, positions.start_date, style.date_color, &start);
    draw_text(&mut canvas, &fonts.date, positions.end_date, style.date_color, &end);

    encode_png(&canvas, style.dpi)
        .map_err(|e| CertificateError::Encoding(format!("PNG encoding failed: {}", e)))
}

/// Draws `text` with its baseline at `at.y`, starting at `at.x`.
pub fn draw_text(canvas: &mut RgbImage, font: &FontHandle, at: Point, ink: Ink, text: &str) {
    match font.face() {
        FontFace::TrueType(face) => {
            let scale = Scale::uniform(font.size());
            for glyph in face.font().layout(text, scale, point(at.x, at.y)) {
                if let Some(bb) = glyph.pixel_bounding_box() {
                    glyph.draw(|gx, gy, coverage| {
                        let px = gx as i32 + bb.min.x;
                        let py = gy as i32 + bb.min.y;
                        blend(canvas, px, py, ink, coverage);
                    });
                }
            }
        }
        FontFace::Builtin => {
            bitmap_font::for_each_dot(text, font.size(), at.x.round() as i32, at.y.round() as i32, |x, y, size| {
                for dy in 0..size as i32 {
                    for dx in 0..size as i32 {
                        blend(canvas, x + dx, y + dy, ink, 1.0);
                    }
                }
            });
        }
    }
}

fn blend(canvas: &mut RgbImage, x: i32, y: i32, ink: Ink, coverage: f32) {
    if x < 0 || y < 0 || x as u32 >= canvas.width() || y as u32 >= canvas.height() || coverage <= 0.0 {
        return;
    }
    let alpha = coverage.min(1.0);
    let Rgb(dst) = canvas.get_pixel_mut(x as u32, y as u32);
    for (channel, src) in dst.iter_mut().zip(ink.0) {
        *channel = (src as f32 * alpha + *channel as f32 * (1.0 - alpha)).round() as u8;
    }
}

/// Lossless 8-bit RGB PNG with the print resolution stored in `pHYs`.
pub fn encode_png(image: &RgbImage, dpi: u32) -> Result<Vec<u8>, png::EncodingError> {
    let pixels_per_meter = (dpi as f64 / 0.0254).round() as u32;
    let mut buf = Vec::new();
    {
        let mut enc = Encoder::new(&mut buf, image.width(), image.height());
        enc.set_color(ColorType::Rgb);
        enc.set_depth(BitDepth::Eight);
        enc.set_pixel_dims(Some(png::PixelDimensions {
            xppu: pixels_per_meter,
            yppu: pixels_per_meter,
            unit: png::Unit::Meter,
        }));
        let mut writer = enc.write_header()?;
        writer.write_image_data(image.as_raw())?;
        writer.finish()?;
    }
    Ok(buf)
}
