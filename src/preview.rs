//! Annotated preview: the processed image with component boxes (colored by
//! kind), text polygons and their recognized strings drawn on top, encoded
//! as a PNG data URI.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::error::{M2cError, Result};
use crate::image_loader::PixelBuffer;
use crate::types::{Component, ComponentKind, TextBlock};

pub const DATA_URI_PREFIX: &str = "data:image/png;base64,";

const TEXT_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
/// Box outline thickness in pixels.
const STROKE: i32 = 2;
/// Glyph cell size of the label font.
const GLYPH: i64 = 8;
/// Gap between a text polygon and its label.
const LABEL_GAP: i64 = 1;

pub fn kind_color(kind: ComponentKind) -> Rgb<u8> {
    match kind {
        ComponentKind::Button => Rgb([0, 123, 255]),
        ComponentKind::Input => Rgb([255, 152, 0]),
        ComponentKind::Container => Rgb([156, 39, 176]),
    }
}

pub fn render(buffer: &PixelBuffer, components: &[Component], text_blocks: &[TextBlock]) -> RgbImage {
    let mut canvas = buffer.as_rgb().clone();

    for component in components {
        let bbox = component.bounding_box;
        let color = kind_color(component.kind);
        for inset in 0..STROKE {
            let w = bbox.width - 2 * inset;
            let h = bbox.height - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(bbox.x + inset, bbox.y + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(&mut canvas, rect, color);
        }
    }

    for block in text_blocks {
        let points = &block.polygon;
        for (i, p) in points.iter().enumerate() {
            let q = points[(i + 1) % points.len()];
            draw_line_segment_mut(
                &mut canvas,
                (p.x as f32, p.y as f32),
                (q.x as f32, q.y as f32),
                TEXT_COLOR,
            );
        }
        draw_label(&mut canvas, block);
    }

    canvas
}

/// Writes the block's text above its box, or below it when there is no
/// room above. Glyphs outside the canvas are clipped.
fn draw_label(canvas: &mut RgbImage, block: &TextBlock) {
    let bbox = block.bounding_box;
    let above = i64::from(bbox.y) - LABEL_GAP - GLYPH;
    let top = if above >= 0 {
        above
    } else {
        i64::from(bbox.y) + i64::from(bbox.height) + LABEL_GAP
    };
    let (width, height) = (i64::from(canvas.width()), i64::from(canvas.height()));

    let mut left = i64::from(bbox.x);
    for ch in block.text.chars() {
        if left >= width {
            break;
        }
        if let Some(rows) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) {
            for (dy, bits) in (0..GLYPH).zip(rows) {
                for dx in 0..GLYPH {
                    if (bits >> dx) & 1 == 0 {
                        continue;
                    }
                    let (px, py) = (left + dx, top + dy);
                    if (0..width).contains(&px) && (0..height).contains(&py) {
                        canvas.put_pixel(px as u32, py as u32, TEXT_COLOR);
                    }
                }
            }
        }
        left += GLYPH;
    }
}

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut png, ImageOutputFormat::Png)
        .map_err(|e| M2cError::generation(format!("failed to encode preview: {e}")))?;
    Ok(png.into_inner())
}

pub fn to_data_uri(png: &[u8]) -> String {
    format!("{DATA_URI_PREFIX}{}", BASE64_STANDARD.encode(png))
}

/// Inverse of [`to_data_uri`]; `None` for anything that is not a base64 PNG URI.
pub fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let payload = uri.strip_prefix(DATA_URI_PREFIX)?;
    BASE64_STANDARD.decode(payload).ok()
}

pub fn preview_data_uri(
    buffer: &PixelBuffer,
    components: &[Component],
    text_blocks: &[TextBlock],
) -> Result<String> {
    let annotated = render(buffer, components, text_blocks);
    let png = encode_png(&annotated)?;
    Ok(to_data_uri(&png))
}
