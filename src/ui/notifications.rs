// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toast notifications and the celebration banner.

use crate::state::{Notification, NotificationKind};

fn color(kind: NotificationKind) -> egui::Color32 {
    match kind {
        NotificationKind::Success => egui::Color32::from_rgb(46, 160, 67),
        NotificationKind::Error => egui::Color32::from_rgb(207, 34, 46),
        NotificationKind::Info => egui::Color32::from_rgb(9, 105, 218),
    }
}

/// Display the notification stack. Returns the id of a dismissed notification.
pub fn show(ctx: &egui::Context, notifications: &[Notification]) -> Option<u64> {
    let mut dismissed = None;
    if notifications.is_empty() {
        return None;
    }

    egui::Area::new(egui::Id::new("notifications"))
        .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-12.0, -12.0))
        .order(egui::Order::Foreground)
        .show(ctx, |ui| {
            for notification in notifications {
                egui::Frame::popup(ui.style())
                    .fill(color(notification.kind))
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.label(
                                egui::RichText::new(&notification.message).color(egui::Color32::WHITE),
                            );
                            if ui.small_button("✖").clicked() {
                                dismissed = Some(notification.id);
                            }
                        });
                    });
                ui.add_space(4.0);
            }
        });

    dismissed
}

/// Display the post-publish celebration banner.
pub fn show_celebration(ctx: &egui::Context) {
    egui::Area::new(egui::Id::new("celebration"))
        .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 48.0))
        .order(egui::Order::Foreground)
        .interactable(false)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.label(egui::RichText::new("🎉 Meme published! 🎉").size(24.0).strong());
            });
        });
}
