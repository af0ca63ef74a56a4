// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Community feed window: published memes, likes and comments.

use crate::io::backend::User;
use crate::models::social::{Comment, FeedEntry, FeedFilter};
use egui::{Color32, RichText};

const LIKED_COLOR: Color32 = Color32::from_rgb(230, 70, 90);

/// Result of feed interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedAction {
    None,
    /// Filters changed or the user asked for a reload.
    Refresh,
    ToggleLike(String),
    /// Comments for this meme should be (re)loaded.
    OpenComments(String),
    AddComment { meme_id: String, content: String },
    DeleteComment(String),
}

#[derive(Debug, Default)]
pub struct FeedPanel {
    pub open: bool,
    tag_input: String,
    only_mine: bool,
    /// Meme whose comments are showing.
    expanded: Option<String>,
    comment_input: String,
}

impl FeedPanel {
    pub fn expanded(&self) -> Option<&str> {
        self.expanded.as_deref()
    }

    /// Query for the current filter controls.
    pub fn filter(&self, user: Option<&User>) -> FeedFilter {
        let tag = self.tag_input.trim();
        FeedFilter {
            creator_id: user.filter(|_| self.only_mine).map(|u| u.id.clone()),
            tag: (!tag.is_empty()).then(|| tag.to_string()),
        }
    }

    /// Display the window while it is open.
    pub fn show(
        &mut self,
        ctx: &egui::Context,
        entries: &[FeedEntry],
        comments: &[Comment],
        user: Option<&User>,
    ) -> FeedAction {
        let mut action = FeedAction::None;
        let mut open = self.open;

        egui::Window::new("Community")
            .open(&mut open)
            .default_width(360.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut self.tag_input)
                            .hint_text("Filter by tag")
                            .desired_width(140.0),
                    );
                    if response.lost_focus() {
                        action = FeedAction::Refresh;
                    }
                    if user.is_some() && ui.checkbox(&mut self.only_mine, "Mine").changed() {
                        action = FeedAction::Refresh;
                    }
                    if ui.button("⟳").on_hover_text("Reload").clicked() {
                        action = FeedAction::Refresh;
                    }
                });
                ui.separator();

                if entries.is_empty() {
                    ui.label(RichText::new("No memes yet").weak());
                }

                egui::ScrollArea::vertical().show(ui, |ui| {
                    for entry in entries {
                        if let Some(a) = self.show_entry(ui, entry, comments, user) {
                            action = a;
                        }
                        ui.separator();
                    }
                });
            });

        self.open = open;
        action
    }

    fn show_entry(
        &mut self,
        ui: &mut egui::Ui,
        entry: &FeedEntry,
        comments: &[Comment],
        user: Option<&User>,
    ) -> Option<FeedAction> {
        let meme = &entry.meme;
        let mut action = None;

        ui.label(RichText::new(&meme.title).strong());
        ui.horizontal_wrapped(|ui| {
            if let Some(creator) = &entry.creator {
                ui.label(RichText::new(format!("by {creator}")).weak());
            }
            for tag in &meme.tags {
                ui.label(RichText::new(format!("#{tag}")).small());
            }
        });

        ui.horizontal(|ui| {
            let heart = if entry.liked {
                RichText::new(format!("♥ {}", meme.likes_count)).color(LIKED_COLOR)
            } else {
                RichText::new(format!("♡ {}", meme.likes_count))
            };
            if ui
                .add_enabled(user.is_some(), egui::Button::new(heart))
                .on_disabled_hover_text("Sign in to like memes")
                .clicked()
            {
                action = Some(FeedAction::ToggleLike(meme.id.clone()));
            }

            let showing = self.expanded.as_deref() == Some(meme.id.as_str());
            let label = if showing { "Hide comments" } else { "Comments" };
            if ui.small_button(label).clicked() {
                if showing {
                    self.expanded = None;
                } else {
                    self.expanded = Some(meme.id.clone());
                    self.comment_input.clear();
                    action = Some(FeedAction::OpenComments(meme.id.clone()));
                }
            }
        });

        if self.expanded.as_deref() == Some(meme.id.as_str()) {
            if let Some(a) = self.show_comments(ui, &meme.id, comments, user) {
                action = Some(a);
            }
        }
        action
    }

    fn show_comments(
        &mut self,
        ui: &mut egui::Ui,
        meme_id: &str,
        comments: &[Comment],
        user: Option<&User>,
    ) -> Option<FeedAction> {
        let mut action = None;

        ui.indent(meme_id, |ui| {
            if let Some(user) = user {
                ui.horizontal(|ui| {
                    ui.add(
                        egui::TextEdit::singleline(&mut self.comment_input)
                            .hint_text("Add a comment")
                            .desired_width(200.0),
                    );
                    if ui.button("Post").clicked() && !self.comment_input.trim().is_empty() {
                        action = Some(FeedAction::AddComment {
                            meme_id: meme_id.to_string(),
                            content: std::mem::take(&mut self.comment_input),
                        });
                    }
                });

                for comment in comments {
                    ui.horizontal_wrapped(|ui| {
                        ui.label(&comment.content);
                        if comment.user_id == user.id && ui.small_button("🗑").clicked() {
                            action = Some(FeedAction::DeleteComment(comment.id.clone()));
                        }
                    });
                }
            } else {
                for comment in comments {
                    ui.label(&comment.content);
                }
            }
            if comments.is_empty() {
                ui.label(RichText::new("No comments yet").weak());
            }
        });
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_follows_controls() {
        let user = User {
            id: "u1".to_string(),
            username: "doge".to_string(),
        };
        let mut panel = FeedPanel::default();
        assert_eq!(panel.filter(Some(&user)), FeedFilter::default());

        panel.tag_input = "  cats ".to_string();
        panel.only_mine = true;
        let filter = panel.filter(Some(&user));
        assert_eq!(filter.tag.as_deref(), Some("cats"));
        assert_eq!(filter.creator_id.as_deref(), Some("u1"));

        // "Mine" means nothing when signed out.
        assert_eq!(panel.filter(None).creator_id, None);
    }
}
