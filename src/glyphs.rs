//! Text to particle targets.
//!
//! Labels are rasterized with a built-in 5x7 pixel font into an offscreen
//! 8-bit bitmap the size of the viewport, centered, then sampled on a grid.
//! Every sampled pixel above the alpha threshold becomes one formation
//! target. Long labels are sampled more coarsely so the point count stays
//! within what the pool can supply.

use glam::Vec2;
use image::{GrayImage, Luma};

/// Pixels brighter than this become targets.
pub const ALPHA_THRESHOLD: u8 = 128;

const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;
/// Horizontal advance per character in font cells (glyph plus one gap).
const ADVANCE: u32 = GLYPH_W + 1;

/// Rows of a glyph, top first; bit 4 is the leftmost column.
fn glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
        '!' => [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04],
        '?' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '\'' => [0x04, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00],
        '&' => [0x0C, 0x12, 0x14, 0x08, 0x15, 0x12, 0x0D],
        _ => [0; 7],
    }
}

/// Rasterize `text` centered in a `width` x `height` bitmap.
///
/// `font_size` is the cap height in pixels; it shrinks if the line would not
/// fit in 90% of the width.
pub fn rasterize(text: &str, font_size: f32, width: u32, height: u32) -> GrayImage {
    let mut bitmap = GrayImage::new(width.max(1), height.max(1));
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return bitmap;
    }

    let scale = pixel_scale(chars.len(), font_size, width);
    let text_w = (chars.len() as u32 * ADVANCE - 1) * scale;
    let text_h = GLYPH_H * scale;
    let origin_x = (width as i64 - text_w as i64) / 2;
    let origin_y = (height as i64 - text_h as i64) / 2;

    for (i, &c) in chars.iter().enumerate() {
        let rows = glyph(c);
        let cell_x = origin_x + (i as u32 * ADVANCE * scale) as i64;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (0x10 >> col) == 0 {
                    continue;
                }
                let x0 = cell_x + (col * scale) as i64;
                let y0 = origin_y + (row as u32 * scale) as i64;
                fill_block(&mut bitmap, x0, y0, scale);
            }
        }
    }
    bitmap
}

fn pixel_scale(len: usize, font_size: f32, width: u32) -> u32 {
    let wanted = (font_size / GLYPH_H as f32).round().max(1.0) as u32;
    let cells = (len as u32 * ADVANCE).saturating_sub(1).max(1);
    let fits = ((width as f32 * 0.9) / cells as f32).floor().max(1.0) as u32;
    wanted.min(fits)
}

fn fill_block(bitmap: &mut GrayImage, x0: i64, y0: i64, size: u32) {
    let (w, h) = bitmap.dimensions();
    for y in y0.max(0)..(y0 + size as i64).min(h as i64) {
        for x in x0.max(0)..(x0 + size as i64).min(w as i64) {
            bitmap.put_pixel(x as u32, y as u32, Luma([255]));
        }
    }
}

/// Sample stride in pixels for a label of `len` characters at `scale`.
fn sample_stride(len: usize, scale: u32) -> u32 {
    let base = ((scale as f32) * 0.6).round().max(2.0) as u32;
    base + len as u32 / 10
}

/// Formation targets for `text`, centered in the viewport.
pub fn text_to_glyph_positions(text: &str, font_size: f32, width: u32, height: u32) -> Vec<Vec2> {
    let len = text.chars().count();
    if len == 0 || width == 0 || height == 0 {
        return Vec::new();
    }
    let bitmap = rasterize(text, font_size, width, height);
    let stride = sample_stride(len, pixel_scale(len, font_size, width));

    let mut points = Vec::new();
    let mut y = stride / 2;
    while y < height {
        let mut x = stride / 2;
        while x < width {
            if bitmap.get_pixel(x, y)[0] > ALPHA_THRESHOLD {
                points.push(Vec2::new(x as f32, y as f32));
            }
            x += stride;
        }
        y += stride;
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_has_no_points() {
        assert!(text_to_glyph_positions("", 48.0, 800, 600).is_empty());
        assert!(text_to_glyph_positions("   ", 48.0, 800, 600).is_empty());
    }

    #[test]
    fn test_points_are_centered() {
        let points = text_to_glyph_positions("CODER", 70.0, 800, 600);
        assert!(!points.is_empty());
        let centroid = points.iter().copied().sum::<Vec2>() / points.len() as f32;
        assert!((centroid.x - 400.0).abs() < 40.0, "{centroid}");
        assert!((centroid.y - 300.0).abs() < 40.0, "{centroid}");
        assert!(points.iter().all(|p| p.x >= 0.0 && p.x < 800.0 && p.y < 600.0));
    }

    #[test]
    fn test_long_text_shrinks_to_fit() {
        let bitmap = rasterize("A VERY LONG LABEL THAT WOULD OVERFLOW", 140.0, 400, 300);
        let lit_columns: Vec<u32> = (0..400)
            .filter(|&x| (0..300).any(|y| bitmap.get_pixel(x, y)[0] > 0))
            .collect();
        let first = *lit_columns.first().unwrap();
        let last = *lit_columns.last().unwrap();
        assert!(first > 0 && last < 399);
    }

    #[test]
    fn test_lowercase_matches_uppercase() {
        assert_eq!(
            text_to_glyph_positions("lattice", 56.0, 640, 480),
            text_to_glyph_positions("LATTICE", 56.0, 640, 480)
        );
    }
}
