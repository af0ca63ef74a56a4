// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Transient application state shown around the editor.
//!
//! Notifications and the post-publish celebration live here and are passed
//! to the UI by `&mut` each frame.

use std::time::{Duration, Instant};

/// How long a notification stays on screen.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(4);

/// How long the celebration banner stays up.
pub const CELEBRATION_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub kind: NotificationKind,
    pub created: Instant,
}

#[derive(Debug, Default)]
pub struct AppState {
    notifications: Vec<Notification>,
    next_id: u64,
    pending_celebrations: u32,
    celebrating_until: Option<Instant>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) -> u64 {
        self.notify_at(kind, message, Instant::now())
    }

    fn notify_at(&mut self, kind: NotificationKind, message: impl Into<String>, now: Instant) -> u64 {
        self.next_id += 1;
        self.notifications.push(Notification {
            id: self.next_id,
            message: message.into(),
            kind,
            created: now,
        });
        self.next_id
    }

    pub fn success(&mut self, message: impl Into<String>) -> u64 {
        self.notify(NotificationKind::Success, message)
    }

    pub fn error(&mut self, message: impl Into<String>) -> u64 {
        self.notify(NotificationKind::Error, message)
    }

    pub fn info(&mut self, message: impl Into<String>) -> u64 {
        self.notify(NotificationKind::Info, message)
    }

    pub fn dismiss(&mut self, id: u64) {
        self.notifications.retain(|n| n.id != id);
    }

    /// Drop notifications older than `ttl`.
    pub fn expire(&mut self, now: Instant, ttl: Duration) {
        self.notifications
            .retain(|n| now.saturating_duration_since(n.created) < ttl);
    }

    /// Request a celebration. Fire and forget.
    pub fn celebrate(&mut self) {
        self.pending_celebrations += 1;
    }

    pub fn pending_celebrations(&self) -> u32 {
        self.pending_celebrations
    }

    /// Start any pending celebration and report whether one is showing.
    pub fn update_celebration(&mut self, now: Instant) -> bool {
        if self.pending_celebrations > 0 {
            self.pending_celebrations = 0;
            self.celebrating_until = Some(now + CELEBRATION_DURATION);
        }
        match self.celebrating_until {
            Some(until) if now < until => true,
            Some(_) => {
                self.celebrating_until = None;
                false
            }
            None => false,
        }
    }
}
