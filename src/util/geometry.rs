// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! This module provides the fit-to-bounds scaling applied to every new
//! background, and the conversions between canvas (screen) coordinates and
//! display coordinates of the composition.

use egui::{Pos2, Rect, Vec2};

/// Default bounding box (in logical units) a background is fitted into.
pub const MAX_DISPLAY_EXTENT: f32 = 600.0;

/// Size of the background after fit-to-bounds scaling, in logical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySize {
    pub width: f32,
    pub height: f32,
}

impl DisplaySize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Pos2 {
        Pos2::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Pixel dimensions of a surface painted at `scale` pixels per unit.
    pub fn pixel_size(&self, scale: f32) -> (u32, u32) {
        let w = (self.width * scale).round().max(1.0) as u32;
        let h = (self.height * scale).round().max(1.0) as u32;
        (w, h)
    }
}

/// Scale natural image dimensions to fit within a `max`×`max` box,
/// preserving the aspect ratio.
///
/// Width is clamped first; if the resulting height still exceeds the box,
/// both dimensions are scaled again by the height ratio.
pub fn fit_to_bounds(natural_width: u32, natural_height: u32, max: f32) -> DisplaySize {
    let mut width = natural_width as f32;
    let mut height = natural_height as f32;

    if width > max {
        let ratio = max / width;
        width = max;
        height *= ratio;
    }

    if height > max {
        let ratio = max / height;
        height = max;
        width *= ratio;
    }

    DisplaySize { width, height }
}

/// Convert a screen position to display coordinates of a canvas drawn at
/// `canvas_rect` with one logical unit per point.
pub fn screen_to_display(pos: Pos2, canvas_rect: Rect) -> Pos2 {
    (pos - canvas_rect.min).to_pos2()
}

/// Convert a display-space rectangle to screen space.
pub fn display_to_screen(rect: Rect, canvas_rect: Rect) -> Rect {
    rect.translate(canvas_rect.min.to_vec2())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_fits(natural_width: u32, natural_height: u32) {
        let size = fit_to_bounds(natural_width, natural_height, MAX_DISPLAY_EXTENT);
        assert!(size.width <= MAX_DISPLAY_EXTENT + 1e-3, "{natural_width}x{natural_height} -> {size:?}");
        assert!(size.height <= MAX_DISPLAY_EXTENT + 1e-3, "{natural_width}x{natural_height} -> {size:?}");

        let natural_ratio = natural_width as f64 / natural_height as f64;
        let display_ratio = size.width as f64 / size.height as f64;
        assert!(
            (natural_ratio - display_ratio).abs() / natural_ratio < 1e-4,
            "aspect changed for {natural_width}x{natural_height}: {size:?}"
        );
    }

    #[test]
    fn test_fit_wide_image() {
        let size = fit_to_bounds(1200, 600, MAX_DISPLAY_EXTENT);
        assert_eq!(size, DisplaySize::new(600.0, 300.0));
    }

    #[test]
    fn test_fit_tall_image_needs_second_pass() {
        let size = fit_to_bounds(800, 1600, MAX_DISPLAY_EXTENT);
        assert!((size.width - 300.0).abs() < 1e-3);
        assert!((size.height - 600.0).abs() < 1e-3);
    }

    #[test]
    fn test_small_image_is_unchanged() {
        let size = fit_to_bounds(320, 240, MAX_DISPLAY_EXTENT);
        assert_eq!(size, DisplaySize::new(320.0, 240.0));
    }

    #[test]
    fn test_fit_preserves_aspect_and_bounds() {
        for (w, h) in [(1, 1), (601, 1), (1, 601), (4000, 3000), (3000, 4000), (599, 5000), (12345, 77), (600, 600)] {
            assert_fits(w, h);
        }
    }

    #[test]
    fn test_pixel_size_rounds() {
        let size = DisplaySize::new(600.0, 300.0);
        assert_eq!(size.pixel_size(2.0), (1200, 600));
        assert_eq!(DisplaySize::new(420.4, 0.2).pixel_size(1.0), (420, 1));
    }

    #[test]
    fn test_screen_display_roundtrip() {
        let canvas = Rect::from_min_size(Pos2::new(40.0, 70.0), Vec2::new(600.0, 300.0));
        let display = screen_to_display(Pos2::new(140.0, 120.0), canvas);
        assert_eq!(display, Pos2::new(100.0, 50.0));

        let layer = Rect::from_min_size(display, Vec2::new(10.0, 10.0));
        assert_eq!(display_to_screen(layer, canvas).min, Pos2::new(140.0, 120.0));
    }
}
