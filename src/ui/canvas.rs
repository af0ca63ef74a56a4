// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Editor canvas.
//!
//! Shows the rendered composition at its display size and turns pointer
//! input into caption gestures. A gesture is previewed live and committed
//! only when the drag ends.

use crate::controller::LayerPreview;
use crate::models::composition::{clamp_box_width, clamp_font_size, LayerId, TextLayerPatch};
use crate::util::geometry::{display_to_screen, screen_to_display, DisplaySize};
use egui::{Color32, Pos2, Rect, Sense, Stroke, Vec2};

/// Side of the square resize handle, in points.
pub const HANDLE_SIZE: f32 = 10.0;

const SELECTION_COLOR: Color32 = Color32::from_rgb(0, 161, 255);

/// Hit box of one caption.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerBox {
    pub id: LayerId,
    /// Display coordinates.
    pub bounds: Rect,
    pub font_size_px: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Move,
    Resize,
}

/// A drag in progress on one caption.
#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    pub layer: LayerId,
    pub kind: GestureKind,
    /// Caption box when the drag began.
    pub start: Rect,
    pub start_font_size_px: u32,
    pub delta: Vec2,
}

impl Gesture {
    fn begin(kind: GestureKind, layer: &LayerBox) -> Self {
        Self {
            layer: layer.id,
            kind,
            start: layer.bounds,
            start_font_size_px: layer.font_size_px,
            delta: Vec2::ZERO,
        }
    }

    pub fn position(&self) -> Pos2 {
        self.start.min + self.delta
    }

    /// Box width and font size implied by a resize.
    ///
    /// Width follows the horizontal drag; the font scales with the box height.
    pub fn size(&self) -> (f32, u32) {
        let width = clamp_box_width(self.start.width() + self.delta.x);
        let height = self.start.height();
        let font = if height > 0.0 {
            let ratio = ((height + self.delta.y) / height).max(0.0);
            (self.start_font_size_px as f32 * ratio).round() as u32
        } else {
            self.start_font_size_px
        };
        (width, clamp_font_size(font))
    }

    pub fn patch(&self) -> TextLayerPatch {
        match self.kind {
            GestureKind::Move => TextLayerPatch::position(self.position()),
            GestureKind::Resize => {
                let (width, font) = self.size();
                TextLayerPatch::size(width, font)
            }
        }
    }

    pub fn preview(&self) -> LayerPreview {
        LayerPreview {
            id: self.layer,
            patch: self.patch(),
        }
    }

    /// Outline to draw while the gesture is live.
    fn outline(&self) -> Rect {
        match self.kind {
            GestureKind::Move => self.start.translate(self.delta),
            GestureKind::Resize => {
                let (width, _) = self.size();
                let height = (self.start.height() + self.delta.y).max(1.0);
                Rect::from_min_size(self.start.min, Vec2::new(width, height))
            }
        }
    }
}

/// Result of canvas interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasAction {
    None,
    Select(LayerId),
    ClearSelection,
    MoveFinished { id: LayerId, position: Pos2 },
    ResizeFinished { id: LayerId, width: f32, font_size_px: u32 },
}

/// Topmost caption under `pos` (display coordinates).
pub fn hit_test(layers: &[LayerBox], pos: Pos2) -> Option<&LayerBox> {
    layers.iter().rev().find(|layer| layer.bounds.contains(pos))
}

fn handle_rect(bounds: Rect) -> Rect {
    Rect::from_center_size(bounds.right_bottom(), Vec2::splat(HANDLE_SIZE))
}

/// Display the canvas and handle pointer interaction.
pub fn show(
    ui: &mut egui::Ui,
    texture: Option<&egui::TextureHandle>,
    display: Option<DisplaySize>,
    layers: &[LayerBox],
    selected: Option<LayerId>,
    gesture: &mut Option<Gesture>,
) -> CanvasAction {
    let (Some(texture), Some(display)) = (texture, display) else {
        show_placeholder(ui);
        return CanvasAction::None;
    };

    let mut action = CanvasAction::None;
    let available = ui.available_rect_before_wrap();
    let canvas_rect = Rect::from_center_size(available.center(), display.to_vec2());
    let response = ui.allocate_rect(canvas_rect, Sense::click_and_drag());

    ui.painter().image(
        texture.id(),
        canvas_rect,
        Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
        Color32::WHITE,
    );

    let selected_box = selected.and_then(|id| layers.iter().find(|l| l.id == id));

    if response.drag_started() {
        if let Some(pos) = response.interact_pointer_pos() {
            let pos = screen_to_display(pos, canvas_rect);
            let on_handle = selected_box.filter(|l| handle_rect(l.bounds).contains(pos));
            *gesture = match on_handle {
                Some(layer) => Some(Gesture::begin(GestureKind::Resize, layer)),
                None => hit_test(layers, pos).map(|layer| {
                    if selected != Some(layer.id) {
                        action = CanvasAction::Select(layer.id);
                    }
                    Gesture::begin(GestureKind::Move, layer)
                }),
            };
        }
    }

    if response.dragged() {
        if let Some(g) = gesture.as_mut() {
            g.delta += response.drag_delta();
        }
    }

    if response.drag_stopped() {
        if let Some(g) = gesture.take() {
            action = match g.kind {
                GestureKind::Move => CanvasAction::MoveFinished {
                    id: g.layer,
                    position: g.position(),
                },
                GestureKind::Resize => {
                    let (width, font_size_px) = g.size();
                    CanvasAction::ResizeFinished {
                        id: g.layer,
                        width,
                        font_size_px,
                    }
                }
            };
        }
    } else if response.clicked() {
        action = match response
            .interact_pointer_pos()
            .and_then(|pos| hit_test(layers, screen_to_display(pos, canvas_rect)))
        {
            Some(layer) => CanvasAction::Select(layer.id),
            None => CanvasAction::ClearSelection,
        };
    }

    // Selection chrome is drawn by the UI only; it is never part of the raster.
    let outline = match (gesture.as_ref(), selected_box) {
        (Some(g), _) => Some(g.outline()),
        (None, Some(layer)) => Some(layer.bounds),
        (None, None) => None,
    };
    if let Some(bounds) = outline {
        let painter = ui.painter_at(canvas_rect.expand(HANDLE_SIZE));
        let screen = display_to_screen(bounds, canvas_rect);
        painter.rect_stroke(screen, 0.0, Stroke::new(1.0, SELECTION_COLOR));
        let handle = handle_rect(screen);
        painter.rect_filled(handle, 0.0, Color32::WHITE);
        painter.rect_stroke(handle, 0.0, Stroke::new(1.0, SELECTION_COLOR));
    }

    if let Some(pos) = response.hover_pos() {
        let pos = screen_to_display(pos, canvas_rect);
        if selected_box.is_some_and(|l| handle_rect(l.bounds).contains(pos)) {
            ui.ctx().set_cursor_icon(egui::CursorIcon::ResizeNwSe);
        } else if hit_test(layers, pos).is_some() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grab);
        }
    }

    action
}

fn show_placeholder(ui: &mut egui::Ui) {
    ui.centered_and_justified(|ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(20.0);
            ui.heading(
                egui::RichText::new("memesmith")
                    .size(32.0)
                    .color(Color32::from_gray(200)),
            );
            ui.add_space(20.0);
            ui.label(
                egui::RichText::new("Upload an image or pick a template to start")
                    .color(Color32::from_gray(180)),
            );
            ui.add_space(10.0);
            ui.label(
                egui::RichText::new("Drop an image file here, or use File → Upload Image...")
                    .weak()
                    .color(Color32::from_gray(130)),
            );
        });
    });
}
