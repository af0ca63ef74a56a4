// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Off-screen rendering and PNG export.
//!
//! The renderer owns a single raster surface. Painting is deterministic:
//! the background is resampled exactly to the surface bounds and every
//! caption is drawn on top in layer order. Flattening paints at the export
//! density and encodes the surface as PNG.

pub mod text;

use crate::error::EditorError;
use crate::models::composition::{Composition, TextLayer};
use ab_glyph::FontArc;
use egui::{Pos2, Rect, Vec2};
use image::imageops::FilterType;
use image::RgbaImage;
use std::io::Cursor;

/// Outline width around captions, in logical units.
pub const STROKE_WIDTH: f32 = 1.0;

/// Default export density relative to display units.
pub const EXPORT_SCALE: f32 = 2.0;

struct ScaledBackground {
    source_id: u64,
    image: RgbaImage,
}

pub struct Renderer {
    font: FontArc,
    surface: RgbaImage,
    background: Option<ScaledBackground>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("surface", &self.surface.dimensions())
            .field("cached_background", &self.background.as_ref().map(|bg| bg.source_id))
            .finish()
    }
}

impl Renderer {
    pub fn new(font: FontArc) -> Self {
        Self {
            font,
            surface: RgbaImage::new(1, 1),
            background: None,
        }
    }

    /// Paint `composition` at `scale` pixels per display unit.
    ///
    /// Returns `None` when the composition has no background.
    pub fn paint(&mut self, composition: &Composition, scale: f32) -> Option<&RgbaImage> {
        let background = composition.background()?;
        let (width, height) = background.display.pixel_size(scale);

        let cached = self.background.as_ref().is_some_and(|bg| {
            bg.source_id == background.source.id() && bg.image.dimensions() == (width, height)
        });
        if !cached {
            // Dropping the previous resample releases the old background.
            let image = image::imageops::resize(
                background.source.pixels(),
                width,
                height,
                FilterType::Triangle,
            );
            self.background = Some(ScaledBackground {
                source_id: background.source.id(),
                image,
            });
        }

        if let Some(bg) = &self.background {
            if self.surface.dimensions() == bg.image.dimensions() {
                self.surface.copy_from_slice(bg.image.as_raw());
            } else {
                self.surface = bg.image.clone();
            }
        }

        for layer in composition.text_layers() {
            self.paint_layer(layer, scale);
        }

        Some(&self.surface)
    }

    fn paint_layer(&mut self, layer: &TextLayer, scale: f32) {
        let font_px = layer.font_size_px as f32 * scale;
        let box_width = layer.box_width * scale;
        let block = text::layout(&self.font, &layer.content, font_px, box_width);
        let origin = Pos2::new(layer.position.x * scale, layer.position.y * scale);
        text::draw_block(
            &mut self.surface,
            &self.font,
            &block,
            origin,
            box_width,
            layer.fill,
            STROKE_WIDTH * scale,
        );
    }

    /// Paint at `scale` and encode the surface as PNG.
    pub fn flatten(&mut self, composition: &Composition, scale: f32) -> Result<Vec<u8>, EditorError> {
        let background = composition
            .background()
            .ok_or(EditorError::PreconditionViolation {
                operation: "export",
                state: "empty",
            })?;
        if background.source.is_tainted() {
            return Err(EditorError::ExportTaintedSurface);
        }

        let surface = self
            .paint(composition, scale)
            .ok_or(EditorError::PreconditionViolation {
                operation: "export",
                state: "empty",
            })?;

        let mut bytes = Vec::new();
        surface.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        Ok(bytes)
    }

    /// Box occupied by `layer` in display coordinates.
    pub fn text_bounds(&self, layer: &TextLayer) -> Rect {
        let block = text::layout(
            &self.font,
            &layer.content,
            layer.font_size_px as f32,
            layer.box_width,
        );
        Rect::from_min_size(layer.position, Vec2::new(layer.box_width, block.height()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::composition::tests::solid_source;
    use crate::models::composition::{ImageOrigin, RasterSource, TextLayerPatch};
    use egui::Color32;
    use std::sync::Arc;

    fn renderer() -> Renderer {
        Renderer::new(text::default_font().unwrap())
    }

    #[test]
    fn test_paint_requires_background() {
        let mut renderer = renderer();
        assert!(renderer.paint(&Composition::default(), 1.0).is_none());
        assert!(matches!(
            renderer.flatten(&Composition::default(), EXPORT_SCALE),
            Err(EditorError::PreconditionViolation { .. })
        ));
    }

    #[test]
    fn test_surface_matches_display_size() {
        let mut renderer = renderer();
        let mut composition = Composition::default();
        composition.set_background(solid_source(1200, 600));

        let surface = renderer.paint(&composition, 1.0).unwrap();
        assert_eq!(surface.dimensions(), (600, 300));
        assert_eq!(surface.get_pixel(10, 10), &image::Rgba([40, 90, 160, 255]));

        let surface = renderer.paint(&composition, 2.0).unwrap();
        assert_eq!(surface.dimensions(), (1200, 600));
    }

    #[test]
    fn test_flatten_roundtrip_dimensions() {
        let mut renderer = renderer();
        let mut composition = Composition::default();
        composition.set_background(solid_source(700, 1000));
        composition.add_text_layer();

        let bytes = renderer.flatten(&composition, EXPORT_SCALE).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        let (w, h) = composition.display_size().unwrap().pixel_size(EXPORT_SCALE);
        assert_eq!((decoded.width(), decoded.height()), (w, h));
        assert_eq!((w, h), (840, 1200));
    }

    #[test]
    fn test_captions_paint_over_background_in_order() {
        let mut renderer = renderer();
        let mut composition = Composition::default();
        composition.set_background(solid_source(600, 300));

        let id = composition.add_text_layer().unwrap();
        composition.update_text_layer(
            id,
            &TextLayerPatch {
                content: Some("MMMM".to_string()),
                position: Some(Pos2::new(0.0, 0.0)),
                font_size_px: Some(72),
                fill: Some(Color32::from_rgb(255, 0, 0)),
                ..Default::default()
            },
        );

        let surface = renderer.paint(&composition, 1.0).unwrap();
        assert!(surface.pixels().any(|p| p[0] > 200 && p[1] < 60 && p[2] < 60));

        // Removing the caption restores the plain background.
        composition.remove_text_layer(id);
        let surface = renderer.paint(&composition, 1.0).unwrap();
        assert!(surface.pixels().all(|p| *p == image::Rgba([40, 90, 160, 255])));
    }

    #[test]
    fn test_tainted_surface_is_not_exported() {
        let mut renderer = renderer();
        let mut composition = Composition::default();
        let source = RasterSource::new(
            RgbaImage::new(10, 10),
            ImageOrigin::Template {
                url: "https://example.com/t.png".to_string(),
                cross_origin_granted: false,
            },
        );
        composition.set_background(Arc::new(source));

        assert!(renderer.paint(&composition, 1.0).is_some());
        assert!(matches!(
            renderer.flatten(&composition, EXPORT_SCALE),
            Err(EditorError::ExportTaintedSurface)
        ));
    }

    #[test]
    fn test_text_bounds_follow_layout() {
        let renderer = renderer();
        let mut composition = Composition::default();
        composition.set_background(solid_source(600, 300));
        let id = composition.add_text_layer().unwrap();
        let layer = composition.layer(id).unwrap();

        let bounds = renderer.text_bounds(layer);
        assert_eq!(bounds.min, layer.position);
        assert_eq!(bounds.width(), layer.box_width);
        assert!(bounds.height() >= layer.font_size_px as f32 * text::LINE_HEIGHT - 1e-3);
    }

    #[test]
    fn test_oversized_caption_box_exports() {
        let mut renderer = renderer();
        let mut composition = Composition::default();
        composition.set_background(solid_source(600, 300));
        let id = composition.add_text_layer().unwrap();

        composition.update_text_layer(
            id,
            &TextLayerPatch {
                box_width: Some(1.0e10),
                ..Default::default()
            },
        );
        assert!(renderer.flatten(&composition, EXPORT_SCALE).is_ok());

        composition.update_text_layer(
            id,
            &TextLayerPatch {
                position: Some(Pos2::new(1.0e10, 1.0e10)),
                ..Default::default()
            },
        );
        let bytes = renderer.flatten(&composition, EXPORT_SCALE).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert!(decoded.pixels().all(|p| *p == image::Rgba([40, 90, 160, 255])));
    }
}
