// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Caption layout and rasterization.
//!
//! Captions are word-wrapped to their box width, centered line by line and
//! painted as a filled glyph mask followed by a thin dark outline so they
//! stay legible over any background.

use ab_glyph::{point, Font, FontArc, FontVec, GlyphId, OutlinedGlyph, PxScale, PxScaleFont, ScaleFont};
use anyhow::{Context, Result};
use egui::{Color32, Pos2};
use image::RgbaImage;
use std::path::Path;

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT: f32 = 1.2;

/// egui's bundled face used when no caption font is configured.
pub const DEFAULT_FONT_NAME: &str = "Ubuntu-Light";

/// Load the caption font from `path`, or fall back to the face bundled with egui.
pub fn load_font(path: Option<&Path>) -> Result<FontArc> {
    match path {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read font file {}", path.display()))?;
            FontArc::try_from_vec(bytes)
                .with_context(|| format!("{} is not a usable TrueType/OpenType font", path.display()))
        }
        None => default_font(),
    }
}

pub fn default_font() -> Result<FontArc> {
    let definitions = egui::FontDefinitions::default();
    let data = definitions
        .font_data
        .get(DEFAULT_FONT_NAME)
        .with_context(|| format!("egui does not bundle the {DEFAULT_FONT_NAME} font"))?;
    let font = FontVec::try_from_vec_and_index(data.font.to_vec(), data.index)
        .context("Bundled font could not be parsed")?;
    Ok(FontArc::new(font))
}

/// One wrapped line and its advance width in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    pub width: f32,
}

/// A caption laid out for a given font size and box width.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<Line>,
    pub font_px: f32,
    pub line_height: f32,
}

impl TextBlock {
    pub fn height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }
}

/// Scale at which one em of `font` spans `font_px` pixels.
fn px_scale(font: &FontArc, font_px: f32) -> PxScale {
    let units_per_em = font.units_per_em().unwrap_or(1000.0);
    PxScale::from(font_px * font.height_unscaled() / units_per_em)
}

fn line_width(scaled: &PxScaleFont<&FontArc>, text: &str) -> f32 {
    let mut width = 0.0;
    let mut previous: Option<GlyphId> = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        previous = Some(id);
    }
    width
}

/// Word-wrap `content` to `box_width`.
///
/// Explicit newlines always start a new line. A word wider than the box is
/// broken between characters.
pub fn layout(font: &FontArc, content: &str, font_px: f32, box_width: f32) -> TextBlock {
    let scaled = font.as_scaled(px_scale(font, font_px));
    let measure = |text: &str| line_width(&scaled, text);
    let mut lines = Vec::new();

    let finish = |text: String, lines: &mut Vec<Line>| {
        let width = measure(&text);
        lines.push(Line { text, width });
    };

    for paragraph in content.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        let mut current = String::new();

        for word in paragraph.split(' ').filter(|w| !w.is_empty()) {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if measure(&candidate) <= box_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                finish(std::mem::take(&mut current), &mut lines);
            }

            if measure(word) <= box_width {
                current = word.to_string();
                continue;
            }

            for ch in word.chars() {
                let mut candidate = current.clone();
                candidate.push(ch);
                if !current.is_empty() && measure(&candidate) > box_width {
                    finish(std::mem::replace(&mut current, ch.to_string()), &mut lines);
                } else {
                    current = candidate;
                }
            }
        }

        finish(current, &mut lines);
    }

    TextBlock {
        lines,
        font_px,
        line_height: font_px * LINE_HEIGHT,
    }
}

/// Paint a laid-out caption whose box starts at `origin` (surface pixels).
pub fn draw_block(
    surface: &mut RgbaImage,
    font: &FontArc,
    block: &TextBlock,
    origin: Pos2,
    box_width: f32,
    fill: Color32,
    stroke_width: f32,
) {
    let scaled = font.as_scaled(px_scale(font, block.font_px));
    let glyph_height = scaled.ascent() - scaled.descent();

    let mut outlines: Vec<OutlinedGlyph> = Vec::new();
    for (index, line) in block.lines.iter().enumerate() {
        let top = origin.y + index as f32 * block.line_height;
        let baseline = top + (block.line_height - glyph_height) / 2.0 + scaled.ascent();
        let mut caret = origin.x + (box_width - line.width) / 2.0;
        let mut previous: Option<GlyphId> = None;

        for ch in line.text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(scaled.scale(), point(caret, baseline));
            if let Some(outline) = font.outline_glyph(glyph) {
                outlines.push(outline);
            }
            caret += scaled.h_advance(id);
            previous = Some(id);
        }
    }

    if outlines.is_empty() {
        return;
    }

    let radius = ((stroke_width / 2.0).round() as i32).max(1);
    let stroke_alpha = (stroke_width / (2.0 * radius as f32)).min(1.0);
    let Some(mut mask) = CoverageMask::enclosing(&outlines, radius + 1, surface) else {
        return;
    };
    for outline in &outlines {
        mask.add(outline);
    }

    let outline_ring = mask.ring(radius as usize);

    for (index, &coverage) in mask.values.iter().enumerate() {
        let Some((x, y)) = mask.surface_coords(index, surface) else {
            continue;
        };
        let pixel = surface.get_pixel_mut(x, y);
        if coverage > 0.0 {
            blend_pixel(pixel, fill, coverage);
        }
        let ring = outline_ring[index] * stroke_alpha;
        if ring > 0.0 {
            blend_pixel(pixel, Color32::BLACK, ring);
        }
    }
}

/// Glyph coverage in [0, 1] over a pixel-aligned rectangle.
struct CoverageMask {
    x0: i32,
    y0: i32,
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl CoverageMask {
    /// Mask covering the glyphs, padded by `padding` and clipped to the
    /// surface grown by the same padding. `None` when nothing is visible.
    fn enclosing(outlines: &[OutlinedGlyph], padding: i32, surface: &RgbaImage) -> Option<Self> {
        let pad = padding as f32;
        let clip_max_x = surface.width() as f32 + pad;
        let clip_max_y = surface.height() as f32 + pad;

        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for outline in outlines {
            let bounds = outline.px_bounds();
            min_x = min_x.min(bounds.min.x - pad);
            min_y = min_y.min(bounds.min.y - pad);
            max_x = max_x.max(bounds.max.x + pad);
            max_y = max_y.max(bounds.max.y + pad);
        }

        let min_x = min_x.max(-pad).floor();
        let min_y = min_y.max(-pad).floor();
        let max_x = max_x.min(clip_max_x).ceil();
        let max_y = max_y.min(clip_max_y).ceil();
        if !(min_x < max_x && min_y < max_y) {
            return None;
        }

        let width = (max_x - min_x) as usize;
        let height = (max_y - min_y) as usize;
        Some(Self {
            x0: min_x as i32,
            y0: min_y as i32,
            width,
            height,
            values: vec![0.0; width * height],
        })
    }

    fn add(&mut self, outline: &OutlinedGlyph) {
        let bounds = outline.px_bounds();
        let left = bounds.min.x as i64 - self.x0 as i64;
        let top = bounds.min.y as i64 - self.y0 as i64;
        if left >= self.width as i64
            || top >= self.height as i64
            || left + bounds.width() as i64 <= 0
            || top + bounds.height() as i64 <= 0
        {
            return;
        }
        outline.draw(|gx, gy, coverage| {
            let mx = left + gx as i64;
            let my = top + gy as i64;
            if mx < 0 || my < 0 || mx as usize >= self.width || my as usize >= self.height {
                return;
            }
            let value = &mut self.values[my as usize * self.width + mx as usize];
            *value = (*value + coverage).min(1.0);
        });
    }

    /// Band straddling the glyph edges: dilation minus erosion.
    fn ring(&self, radius: usize) -> Vec<f32> {
        let dilated = self.morph(radius, f32::max, 0.0);
        let eroded = self.morph(radius, f32::min, 1.0);
        dilated
            .iter()
            .zip(&eroded)
            .map(|(d, e)| (d - e).clamp(0.0, 1.0))
            .collect()
    }

    /// Separable square min/max filter. Out-of-mask samples count as empty.
    fn morph(&self, radius: usize, op: fn(f32, f32) -> f32, identity: f32) -> Vec<f32> {
        let (w, h) = (self.width, self.height);
        let mut horizontal = vec![identity; w * h];
        for y in 0..h {
            for x in 0..w {
                let mut acc = identity;
                for sx in x.saturating_sub(radius)..=(x + radius) {
                    let sample = if sx < w { self.values[y * w + sx] } else { 0.0 };
                    acc = op(acc, sample);
                }
                if x < radius {
                    acc = op(acc, 0.0);
                }
                horizontal[y * w + x] = acc;
            }
        }

        let mut out = vec![identity; w * h];
        for y in 0..h {
            for x in 0..w {
                let mut acc = identity;
                for sy in y.saturating_sub(radius)..=(y + radius) {
                    let sample = if sy < h { horizontal[sy * w + x] } else { 0.0 };
                    acc = op(acc, sample);
                }
                if y < radius {
                    acc = op(acc, 0.0);
                }
                out[y * w + x] = acc;
            }
        }
        out
    }

    fn surface_coords(&self, index: usize, surface: &RgbaImage) -> Option<(u32, u32)> {
        let x = self.x0 as i64 + (index % self.width) as i64;
        let y = self.y0 as i64 + (index / self.width) as i64;
        if x < 0 || y < 0 || x as u32 >= surface.width() || y as u32 >= surface.height() {
            return None;
        }
        Some((x as u32, y as u32))
    }
}

/// Source-over blend of `color` at `coverage` onto an unpremultiplied pixel.
pub fn blend_pixel(pixel: &mut image::Rgba<u8>, color: Color32, coverage: f32) {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    let src_a = coverage.clamp(0.0, 1.0) * (a as f32 / 255.0);
    if src_a <= 0.0 {
        return;
    }

    let dst_a = pixel[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        return;
    }

    for (channel, src) in [r, g, b].into_iter().enumerate() {
        let dst = pixel[channel] as f32;
        let value = (src as f32 * src_a + dst * dst_a * (1.0 - src_a)) / out_a;
        pixel[channel] = value.round().clamp(0.0, 255.0) as u8;
    }
    pixel[3] = (out_a * 255.0).round() as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font() -> FontArc {
        default_font().expect("bundled font")
    }

    #[test]
    fn test_short_text_is_one_line() {
        let block = layout(&font(), "HELLO", 36.0, 300.0);
        assert_eq!(block.lines.len(), 1);
        assert_eq!(block.lines[0].text, "HELLO");
        assert!(block.lines[0].width > 0.0 && block.lines[0].width <= 300.0);
        assert!((block.height() - 36.0 * LINE_HEIGHT).abs() < 1e-3);
    }

    #[test]
    fn test_wraps_at_word_boundaries() {
        let font = font();
        let block = layout(&font, "WHEN THE CODE COMPILES ON THE FIRST TRY", 36.0, 200.0);
        assert!(block.lines.len() > 1);
        for line in &block.lines {
            assert!(line.width <= 200.0, "{line:?}");
            assert!(!line.text.starts_with(' ') && !line.text.ends_with(' '));
        }
        let rejoined: Vec<&str> = block.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(rejoined.join(" "), "WHEN THE CODE COMPILES ON THE FIRST TRY");
    }

    #[test]
    fn test_long_word_breaks_between_characters() {
        let block = layout(&font(), "AAAAAAAAAAAAAAAAAAAAAAAA", 36.0, 60.0);
        assert!(block.lines.len() > 1);
        assert!(block.lines.iter().all(|l| !l.text.is_empty()));
        let joined: String = block.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(joined, "AAAAAAAAAAAAAAAAAAAAAAAA");
    }

    #[test]
    fn test_newlines_start_lines() {
        let block = layout(&font(), "TOP\n\nBOTTOM", 24.0, 300.0);
        let texts: Vec<&str> = block.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["TOP", "", "BOTTOM"]);
    }

    #[test]
    fn test_draw_block_paints_fill_and_outline() {
        let font = font();
        let mut surface = RgbaImage::from_pixel(300, 100, image::Rgba([128, 128, 128, 255]));
        let block = layout(&font, "WOW", 72.0, 300.0);
        draw_block(&mut surface, &font, &block, Pos2::new(0.0, 0.0), 300.0, Color32::WHITE, 2.0);

        let has_white = surface.pixels().any(|p| p[0] > 200 && p[1] > 200 && p[2] > 200);
        let has_dark = surface.pixels().any(|p| p[0] < 40 && p[1] < 40 && p[2] < 40);
        assert!(has_white, "fill missing");
        assert!(has_dark, "outline missing");

        // Centered: the left and right margins hold untouched background.
        assert_eq!(surface.get_pixel(0, 50), &image::Rgba([128, 128, 128, 255]));
        assert_eq!(surface.get_pixel(299, 50), &image::Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn test_draw_outside_surface_is_clipped() {
        let font = font();
        let mut surface = RgbaImage::from_pixel(20, 20, image::Rgba([0, 0, 0, 255]));
        let block = layout(&font, "CLIPPED", 36.0, 300.0);
        draw_block(&mut surface, &font, &block, Pos2::new(-500.0, -500.0), 300.0, Color32::WHITE, 1.0);
        assert!(surface.pixels().all(|p| *p == image::Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn test_draw_far_away_block_allocates_nothing_visible() {
        let font = font();
        let mut surface = RgbaImage::from_pixel(40, 40, image::Rgba([0, 0, 0, 255]));
        let block = layout(&font, "FAR AWAY", 144.0, 1.0e10);
        draw_block(&mut surface, &font, &block, Pos2::new(1.0e10, 1.0e10), 1.0e10, Color32::WHITE, 4.0);
        draw_block(&mut surface, &font, &block, Pos2::new(-1.0e10, 0.0), 1.0e10, Color32::WHITE, 4.0);
        assert!(surface.pixels().all(|p| *p == image::Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn test_blend_pixel() {
        let mut pixel = image::Rgba([0, 0, 0, 255]);
        blend_pixel(&mut pixel, Color32::WHITE, 0.5);
        assert!((pixel[0] as i32 - 128).abs() <= 1);
        assert_eq!(pixel[3], 255);

        let mut transparent = image::Rgba([0, 0, 0, 0]);
        blend_pixel(&mut transparent, Color32::from_rgb(255, 0, 0), 1.0);
        assert_eq!(transparent, image::Rgba([255, 0, 0, 255]));
    }
}
