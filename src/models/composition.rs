// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Composition data structures.
//!
//! A composition is one background raster plus an ordered list of caption
//! layers. Later layers paint on top of earlier ones. The mutators here keep
//! the composition's invariants: no captions without a background, at most
//! one selected layer, and selection always referring to a live layer.

use crate::util::geometry::{fit_to_bounds, DisplaySize, MAX_DISPLAY_EXTENT};
use egui::{Color32, Pos2};
use image::RgbaImage;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

pub const MIN_FONT_SIZE: u32 = 12;
pub const MAX_FONT_SIZE: u32 = 72;
pub const MIN_BOX_WIDTH: f32 = 20.0;
pub const MAX_BOX_WIDTH: f32 = 4000.0;

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Where a background raster came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOrigin {
    /// Bytes supplied by the user.
    Upload { name: Option<String> },
    /// A catalog template fetched over the network.
    Template {
        url: String,
        cross_origin_granted: bool,
    },
    /// A catalog template read from disk.
    LocalFile { path: PathBuf },
}

/// A decoded background image.
pub struct RasterSource {
    id: u64,
    pixels: RgbaImage,
    origin: ImageOrigin,
}

impl std::fmt::Debug for RasterSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterSource")
            .field("id", &self.id)
            .field("width", &self.pixels.width())
            .field("height", &self.pixels.height())
            .field("origin", &self.origin)
            .finish()
    }
}

impl RasterSource {
    pub fn new(pixels: RgbaImage, origin: ImageOrigin) -> Self {
        Self {
            id: NEXT_SOURCE_ID.fetch_add(1, Ordering::SeqCst),
            pixels,
            origin,
        }
    }

    /// Process-unique id, used to key cached resamples of this source.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn origin(&self) -> &ImageOrigin {
        &self.origin
    }

    /// A template fetched without cross-origin permission cannot be exported.
    pub fn is_tainted(&self) -> bool {
        matches!(
            self.origin,
            ImageOrigin::Template {
                cross_origin_granted: false,
                ..
            }
        )
    }
}

/// The background of a composition together with its fitted display size.
#[derive(Debug, Clone)]
pub struct Background {
    pub source: Arc<RasterSource>,
    pub display: DisplaySize,
}

/// Opaque, never-reused identifier of a caption layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(Uuid);

impl LayerId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One positioned, styled caption.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayer {
    pub id: LayerId,
    pub content: String,
    /// Top-left anchor of the text box, in display coordinates.
    pub position: Pos2,
    /// Wrap width of the text box.
    pub box_width: f32,
    pub font_size_px: u32,
    pub fill: Color32,
}

/// Partial update of a caption; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLayerPatch {
    pub content: Option<String>,
    pub position: Option<Pos2>,
    pub box_width: Option<f32>,
    pub font_size_px: Option<u32>,
    pub fill: Option<Color32>,
}

impl TextLayerPatch {
    pub fn position(position: Pos2) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn size(box_width: f32, font_size_px: u32) -> Self {
        Self {
            box_width: Some(box_width),
            font_size_px: Some(font_size_px),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl TextLayer {
    fn apply(&mut self, patch: &TextLayerPatch) {
        if let Some(content) = &patch.content {
            self.content.clone_from(content);
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(box_width) = patch.box_width {
            self.box_width = clamp_box_width(box_width);
        }
        if let Some(font_size_px) = patch.font_size_px {
            self.font_size_px = clamp_font_size(font_size_px);
        }
        if let Some(fill) = patch.fill {
            self.fill = fill;
        }
    }
}

pub fn clamp_font_size(size: u32) -> u32 {
    size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
}

pub fn clamp_box_width(width: f32) -> f32 {
    if width.is_finite() {
        width.clamp(MIN_BOX_WIDTH, MAX_BOX_WIDTH)
    } else {
        MIN_BOX_WIDTH
    }
}

/// Initial values of a freshly added caption.
#[derive(Debug, Clone, PartialEq)]
pub struct TextDefaults {
    pub content: String,
    pub box_width: f32,
    pub font_size_px: u32,
    pub fill: Color32,
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            content: "ADD TEXT HERE".to_string(),
            box_width: 300.0,
            font_size_px: 36,
            fill: Color32::WHITE,
        }
    }
}

/// The in-memory scene the editor manipulates.
#[derive(Debug, Clone)]
pub struct Composition {
    max_extent: f32,
    defaults: TextDefaults,
    background: Option<Background>,
    text_layers: Vec<TextLayer>,
    selected: Option<LayerId>,
    revision: u64,
}

impl Default for Composition {
    fn default() -> Self {
        Self::new(MAX_DISPLAY_EXTENT, TextDefaults::default())
    }
}

impl Composition {
    /// Create an empty composition whose backgrounds are fitted into a
    /// `max_extent`×`max_extent` box.
    pub fn new(max_extent: f32, defaults: TextDefaults) -> Self {
        Self {
            max_extent,
            defaults,
            background: None,
            text_layers: Vec::new(),
            selected: None,
            revision: 0,
        }
    }

    pub fn background(&self) -> Option<&Background> {
        self.background.as_ref()
    }

    pub fn display_size(&self) -> Option<DisplaySize> {
        self.background.as_ref().map(|bg| bg.display)
    }

    pub fn text_layers(&self) -> &[TextLayer] {
        &self.text_layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&TextLayer> {
        self.text_layers.iter().find(|layer| layer.id == id)
    }

    pub fn selected(&self) -> Option<LayerId> {
        self.selected
    }

    pub fn selected_layer(&self) -> Option<&TextLayer> {
        self.selected.and_then(|id| self.layer(id))
    }

    /// Bumped on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replace the background, discarding all captions and the selection.
    pub fn set_background(&mut self, source: Arc<RasterSource>) -> DisplaySize {
        let display = fit_to_bounds(source.width(), source.height(), self.max_extent);
        self.background = Some(Background { source, display });
        self.text_layers.clear();
        self.selected = None;
        self.revision += 1;
        display
    }

    /// Append a caption at the image center and select it.
    ///
    /// Returns `None` without touching anything when there is no background.
    pub fn add_text_layer(&mut self) -> Option<LayerId> {
        let display = self.display_size()?;
        let id = LayerId::generate();

        self.text_layers.push(TextLayer {
            id,
            content: self.defaults.content.clone(),
            position: display.center(),
            box_width: clamp_box_width(self.defaults.box_width),
            font_size_px: clamp_font_size(self.defaults.font_size_px),
            fill: self.defaults.fill,
        });
        self.selected = Some(id);
        self.revision += 1;
        Some(id)
    }

    /// Apply the supplied fields of `patch`. Returns false for an unknown id.
    pub fn update_text_layer(&mut self, id: LayerId, patch: &TextLayerPatch) -> bool {
        match self.text_layers.iter_mut().find(|layer| layer.id == id) {
            Some(layer) => {
                layer.apply(patch);
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    pub fn remove_text_layer(&mut self, id: LayerId) -> Option<TextLayer> {
        let index = self.text_layers.iter().position(|layer| layer.id == id)?;
        let removed = self.text_layers.remove(index);
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.revision += 1;
        Some(removed)
    }

    /// Select an existing layer. Unknown ids leave the selection unchanged.
    pub fn select(&mut self, id: LayerId) -> bool {
        if self.layer(id).is_none() {
            return false;
        }
        if self.selected != Some(id) {
            self.selected = Some(id);
            self.revision += 1;
        }
        true
    }

    pub fn clear_selection(&mut self) {
        if self.selected.take().is_some() {
            self.revision += 1;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn solid_source(width: u32, height: u32) -> Arc<RasterSource> {
        let pixels = RgbaImage::from_pixel(width, height, image::Rgba([40, 90, 160, 255]));
        Arc::new(RasterSource::new(pixels, ImageOrigin::Upload { name: None }))
    }

    fn composition_with_background() -> Composition {
        let mut composition = Composition::default();
        composition.set_background(solid_source(1200, 600));
        composition
    }

    #[test]
    fn test_add_text_requires_background() {
        let mut composition = Composition::default();
        assert_eq!(composition.add_text_layer(), None);
        assert!(composition.text_layers().is_empty());
        assert_eq!(composition.selected(), None);
        assert_eq!(composition.revision(), 0);
    }

    #[test]
    fn test_add_text_defaults() {
        let mut composition = composition_with_background();
        let id = composition.add_text_layer().unwrap();

        let layer = composition.layer(id).unwrap();
        assert_eq!(layer.position, Pos2::new(300.0, 150.0));
        assert_eq!(layer.font_size_px, 36);
        assert_eq!(layer.fill, Color32::WHITE);
        assert_eq!(layer.content, "ADD TEXT HERE");
        assert_eq!(composition.selected(), Some(id));
    }

    #[test]
    fn test_ids_are_unique_and_order_is_insertion() {
        let mut composition = composition_with_background();
        let a = composition.add_text_layer().unwrap();
        let b = composition.add_text_layer().unwrap();
        assert_ne!(a, b);

        let ids: Vec<LayerId> = composition.text_layers().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(composition.selected(), Some(b));
    }

    #[test]
    fn test_set_background_clears_layers_and_selection() {
        let mut composition = composition_with_background();
        composition.add_text_layer();
        composition.add_text_layer();

        let display = composition.set_background(solid_source(300, 900));
        assert!(composition.text_layers().is_empty());
        assert_eq!(composition.selected(), None);
        assert!((display.height - 600.0).abs() < 1e-3);
        assert!((display.width - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_partial_update_touches_only_supplied_fields() {
        let mut composition = composition_with_background();
        let id = composition.add_text_layer().unwrap();
        let before = composition.layer(id).unwrap().clone();

        let patch = TextLayerPatch {
            content: Some("ONE DOES NOT SIMPLY".to_string()),
            ..Default::default()
        };
        assert!(composition.update_text_layer(id, &patch));

        let after = composition.layer(id).unwrap();
        assert_eq!(after.content, "ONE DOES NOT SIMPLY");
        assert_eq!(after.position, before.position);
        assert_eq!(after.box_width, before.box_width);
        assert_eq!(after.font_size_px, before.font_size_px);
        assert_eq!(after.fill, before.fill);
    }

    #[test]
    fn test_font_size_and_width_are_clamped() {
        let mut composition = composition_with_background();
        let id = composition.add_text_layer().unwrap();

        composition.update_text_layer(id, &TextLayerPatch::size(2.0, 200));
        let layer = composition.layer(id).unwrap();
        assert_eq!(layer.font_size_px, MAX_FONT_SIZE);
        assert_eq!(layer.box_width, MIN_BOX_WIDTH);

        composition.update_text_layer(id, &TextLayerPatch::size(250.0, 3));
        let layer = composition.layer(id).unwrap();
        assert_eq!(layer.font_size_px, MIN_FONT_SIZE);
        assert_eq!(layer.box_width, 250.0);

        composition.update_text_layer(id, &TextLayerPatch::size(1.0e10, 36));
        assert_eq!(composition.layer(id).unwrap().box_width, MAX_BOX_WIDTH);
    }

    #[test]
    fn test_remove_then_update_is_noop() {
        let mut composition = composition_with_background();
        let keep = composition.add_text_layer().unwrap();
        let id = composition.add_text_layer().unwrap();

        assert!(composition.remove_text_layer(id).is_some());
        assert_eq!(composition.selected(), None);

        let revision = composition.revision();
        assert!(!composition.update_text_layer(id, &TextLayerPatch::position(Pos2::ZERO)));
        assert!(composition.remove_text_layer(id).is_none());
        assert_eq!(composition.revision(), revision);
        assert_eq!(composition.text_layers().len(), 1);
        assert_eq!(composition.text_layers()[0].id, keep);
    }

    #[test]
    fn test_removing_unselected_layer_keeps_selection() {
        let mut composition = composition_with_background();
        let first = composition.add_text_layer().unwrap();
        let second = composition.add_text_layer().unwrap();

        composition.remove_text_layer(first);
        assert_eq!(composition.selected(), Some(second));
    }

    #[test]
    fn test_select_unknown_layer_is_ignored() {
        let mut composition = composition_with_background();
        let id = composition.add_text_layer().unwrap();
        composition.remove_text_layer(id);

        assert!(!composition.select(id));
        assert_eq!(composition.selected(), None);
    }

    #[test]
    fn test_tainted_template_source() {
        let pixels = RgbaImage::new(4, 4);
        let source = RasterSource::new(
            pixels,
            ImageOrigin::Template {
                url: "https://example.com/a.png".to_string(),
                cross_origin_granted: false,
            },
        );
        assert!(source.is_tainted());

        let upload = solid_source(4, 4);
        assert!(!upload.is_tainted());
        assert_ne!(upload.id(), source.id());
    }
}
