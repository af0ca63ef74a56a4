// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Meme details form: sign-in, profile, title, tags and publishing.

use crate::io::backend::User;
use crate::models::meme::MemeDraft;

/// Result of form interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitAction {
    None,
    SignIn(String),
    SignOut,
    Rename(String),
    UploadAvatar,
    Create,
}

/// Display the form.
///
/// `username_input` holds the sign-in name while signed out and the new
/// name while signed in.
pub fn show(
    ui: &mut egui::Ui,
    draft: &mut MemeDraft,
    user: Option<&User>,
    username_input: &mut String,
    preview: Option<&egui::TextureHandle>,
) -> SubmitAction {
    let mut action = SubmitAction::None;

    ui.heading("Meme Details");
    ui.separator();

    match user {
        Some(user) => {
            ui.horizontal(|ui| {
                ui.label(format!("Signed in as {}", user.username));
                if ui.small_button("Sign out").clicked() {
                    action = SubmitAction::SignOut;
                }
            });
            ui.collapsing("Profile", |ui| {
                ui.horizontal(|ui| {
                    ui.add(
                        egui::TextEdit::singleline(username_input)
                            .hint_text("New username")
                            .desired_width(120.0),
                    );
                    if ui.button("Rename").clicked() {
                        action = SubmitAction::Rename(username_input.clone());
                    }
                });
                if ui.button("Upload Avatar...").clicked() {
                    action = SubmitAction::UploadAvatar;
                }
            });
        }
        None => {
            ui.horizontal(|ui| {
                let response = ui.add(
                    egui::TextEdit::singleline(username_input)
                        .hint_text("Username")
                        .desired_width(120.0),
                );
                let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("Sign in").clicked() || submitted {
                    action = SubmitAction::SignIn(username_input.clone());
                }
            });
        }
    }

    ui.add_space(8.0);
    ui.label("Title");
    ui.add(egui::TextEdit::singleline(&mut draft.title).hint_text("Give your meme a title"));

    ui.add_space(8.0);
    ui.label("Tags");
    ui.horizontal(|ui| {
        let response = ui.add(
            egui::TextEdit::singleline(&mut draft.tag_input)
                .hint_text("Add a tag")
                .desired_width(120.0),
        );
        let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if ui.button("Add").clicked() || submitted {
            draft.add_tag();
        }
    });

    let mut removed = None;
    ui.horizontal_wrapped(|ui| {
        for tag in draft.tags() {
            if ui.small_button(format!("#{tag} ✖")).clicked() {
                removed = Some(tag.clone());
            }
        }
    });
    if let Some(tag) = removed {
        draft.remove_tag(&tag);
    }

    ui.add_space(8.0);
    match preview {
        Some(texture) => {
            let size = texture.size_vec2();
            let scale = (ui.available_width() / size.x).min(1.0);
            ui.image((texture.id(), size * scale));
        }
        None => {
            ui.label(egui::RichText::new("Generate a meme to preview it here").weak());
        }
    }

    ui.add_space(8.0);
    if ui
        .add_enabled(user.is_some(), egui::Button::new("Create Meme"))
        .on_disabled_hover_text("Sign in to publish")
        .clicked()
    {
        action = SubmitAction::Create;
    }

    action
}
