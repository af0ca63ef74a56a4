// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Community data around published memes: profiles, likes and comments.

use super::meme::MemeRecord;
use serde::{Deserialize, Serialize};

/// One row per (user, meme) like.
pub const LIKES_TABLE: &str = "likes";

pub const COMMENTS_TABLE: &str = "comments";

/// A user's public profile row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Milliseconds since the epoch.
    #[serde(default)]
    pub created_at: u64,
}

/// Changes a user may make to their own profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub meme_id: String,
    pub user_id: String,
    pub content: String,
    #[serde(default)]
    pub created_at: u64,
}

/// A meme as listed in the feed, seen by a particular viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub meme: MemeRecord,
    pub creator: Option<String>,
    /// Whether the viewer has liked it. Always false when signed out.
    pub liked: bool,
}

/// Feed query. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedFilter {
    pub creator_id: Option<String>,
    pub tag: Option<String>,
}

/// Storage path for an avatar uploaded at `timestamp_millis`.
pub fn avatar_file_name(user_id: &str, timestamp_millis: u128, extension: &str) -> String {
    let extension = extension.trim_start_matches('.').to_lowercase();
    let extension = if extension.is_empty() { "png".to_string() } else { extension };
    format!("avatars/{user_id}/{timestamp_millis}.{extension}")
}
