// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Meme submission data.
//!
//! A `MemeDraft` collects the title, tags and exported image on the
//! "create meme" form. Once validated it becomes a `NewMeme` row inserted
//! into the backend's `memes` table.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Table that stores published memes.
pub const MEMES_TABLE: &str = "memes";

/// Tag applied when the user gives none.
pub const FALLBACK_TAG: &str = "untagged";

/// Reasons a draft cannot be submitted yet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("Please enter a title for your meme")]
    MissingTitle,
    #[error("Please generate a meme image first")]
    MissingImage,
}

/// State of the meme details form.
#[derive(Debug, Clone, Default)]
pub struct MemeDraft {
    pub title: String,
    pub tag_input: String,
    tags: Vec<String>,
    image: Option<Vec<u8>>,
}

/// A draft that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDraft<'a> {
    pub title: String,
    pub tags: Vec<String>,
    pub image: &'a [u8],
}

impl MemeDraft {
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn image(&self) -> Option<&[u8]> {
        self.image.as_deref()
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// Store the bytes of a freshly generated meme, replacing any previous one.
    pub fn set_image(&mut self, bytes: Vec<u8>) {
        self.image = Some(bytes);
    }

    /// Move the pending tag input into the tag list.
    ///
    /// Tags are trimmed and lowercased; empty and duplicate tags are
    /// rejected and leave the input untouched.
    pub fn add_tag(&mut self) -> bool {
        let tag = normalize_tag(&self.tag_input);
        if tag.is_empty() || self.tags.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        self.tag_input.clear();
        true
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.retain(|t| t != tag);
    }

    pub fn validate(&self) -> Result<ValidDraft<'_>, DraftError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(DraftError::MissingTitle);
        }
        let image = self.image.as_deref().ok_or(DraftError::MissingImage)?;

        let tags = if self.tags.is_empty() {
            vec![FALLBACK_TAG.to_string()]
        } else {
            self.tags.clone()
        };

        Ok(ValidDraft {
            title: title.to_string(),
            tags,
            image,
        })
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

pub fn normalize_tag(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Storage path for an exported meme created at `timestamp_millis`.
pub fn image_file_name(timestamp_millis: u128) -> String {
    format!("meme-{timestamp_millis}.png")
}

/// Row inserted into the `memes` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMeme {
    pub title: String,
    pub image_url: String,
    pub tags: Vec<String>,
    pub creator_id: String,
}

/// A stored meme as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemeRecord {
    pub id: String,
    pub title: String,
    pub image_url: String,
    pub tags: Vec<String>,
    pub creator_id: String,
    pub created_at: u64,
    #[serde(default)]
    pub likes_count: u32,
}
