// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Editor toolbar.
//!
//! Image sources on the left, caption and export commands on the right.
//! Buttons are enabled from the controller's state so a disabled command
//! can never be issued.

use crate::models::template::Template;

/// Which toolbar commands are currently available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolbarState {
    pub loading: bool,
    pub can_add_text: bool,
    pub can_remove_text: bool,
    pub can_generate: bool,
}

/// Result of toolbar interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolbarAction {
    None,
    UploadImage,
    SelectTemplate(String),
    AddText,
    RemoveText,
    Generate,
}

/// Display the toolbar.
pub fn show(ui: &mut egui::Ui, state: ToolbarState, templates: &[Template]) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        if ui.button("📂 Upload Image").clicked() {
            action = ToolbarAction::UploadImage;
        }

        ui.menu_button("🖼 Templates", |ui| {
            for template in templates {
                if ui.button(&template.name).clicked() {
                    action = ToolbarAction::SelectTemplate(template.url.clone());
                    ui.close_menu();
                }
            }
        });

        ui.separator();

        if ui
            .add_enabled(state.can_add_text, egui::Button::new("➕ Add Text"))
            .clicked()
        {
            action = ToolbarAction::AddText;
        }

        if ui
            .add_enabled(state.can_remove_text, egui::Button::new("🗑 Remove Selected"))
            .clicked()
        {
            action = ToolbarAction::RemoveText;
        }

        ui.separator();

        if ui
            .add_enabled(state.can_generate, egui::Button::new("✨ Generate Meme"))
            .on_disabled_hover_text("Load an exportable image first")
            .clicked()
        {
            action = ToolbarAction::Generate;
        }

        if state.loading {
            ui.separator();
            ui.spinner();
            ui.label(egui::RichText::new("Loading image...").italics().weak());
        }
    });

    action
}
