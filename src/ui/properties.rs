// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Caption properties panel.
//!
//! Edits the content, size and color of the selected caption. Every edit
//! is returned as a patch for the controller to apply.

use crate::models::composition::{
    LayerId, TextLayer, TextLayerPatch, MAX_BOX_WIDTH, MAX_FONT_SIZE, MIN_BOX_WIDTH,
    MIN_FONT_SIZE,
};
use crate::util::color::{parse_color, to_hex};

/// Result of properties panel interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertiesAction {
    None,
    Update(TextLayerPatch),
}

/// Panel state that outlives a frame.
#[derive(Debug, Default)]
pub struct PropertiesPanel {
    editing: Option<LayerId>,
    color_text: String,
}

impl PropertiesPanel {
    /// Reset the color field when the selection changes.
    fn sync(&mut self, layer: Option<&TextLayer>) {
        let id = layer.map(|l| l.id);
        if self.editing != id {
            self.editing = id;
            self.color_text = layer.map(|l| to_hex(l.fill)).unwrap_or_default();
        }
    }

    /// Display the panel for `layer`.
    pub fn show(&mut self, ui: &mut egui::Ui, layer: Option<&TextLayer>) -> PropertiesAction {
        self.sync(layer);

        ui.heading("Text");
        ui.separator();

        let Some(layer) = layer else {
            ui.label(egui::RichText::new("Select a caption to edit it").weak());
            return PropertiesAction::None;
        };

        let mut patch = TextLayerPatch::default();

        ui.label("Content");
        let mut content = layer.content.clone();
        if ui
            .add(egui::TextEdit::multiline(&mut content).desired_rows(3))
            .changed()
        {
            patch.content = Some(content);
        }

        ui.add_space(8.0);
        ui.label("Font size");
        let mut font_size = layer.font_size_px;
        if ui
            .add(egui::Slider::new(&mut font_size, MIN_FONT_SIZE..=MAX_FONT_SIZE).suffix(" px"))
            .changed()
        {
            patch.font_size_px = Some(font_size);
        }

        ui.add_space(8.0);
        ui.label("Box width");
        let mut box_width = layer.box_width;
        if ui
            .add(
                egui::DragValue::new(&mut box_width)
                    .clamp_range(MIN_BOX_WIDTH..=MAX_BOX_WIDTH)
                    .speed(1.0),
            )
            .changed()
        {
            patch.box_width = Some(box_width);
        }

        ui.add_space(8.0);
        ui.label("Color");
        ui.horizontal(|ui| {
            let mut fill = layer.fill;
            if ui.color_edit_button_srgba(&mut fill).changed() {
                patch.fill = Some(fill);
                self.color_text = to_hex(fill);
            }

            let response = ui.add(egui::TextEdit::singleline(&mut self.color_text).desired_width(80.0));
            if response.changed() {
                if let Some(color) = parse_color(&self.color_text) {
                    patch.fill = Some(color);
                }
            }
            if response.lost_focus() {
                self.color_text = to_hex(patch.fill.unwrap_or(layer.fill));
            }
        });

        if patch.is_empty() {
            PropertiesAction::None
        } else {
            PropertiesAction::Update(patch)
        }
    }
}
