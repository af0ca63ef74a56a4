// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Built-in meme template catalog.

use serde::{Deserialize, Serialize};

/// A named template background.
///
/// `url` is either an `http(s)://` URL or a path on the local filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub url: String,
}

impl Template {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

pub fn is_remote_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// The catalog shown when the configuration does not provide one.
pub fn default_catalog() -> Vec<Template> {
    vec![
        Template::new(
            "Drake Hotline Bling",
            "https://images.pexels.com/photos/3195482/pexels-photo-3195482.jpeg",
        ),
        Template::new(
            "Distracted Boyfriend",
            "https://images.pexels.com/photos/5257537/pexels-photo-5257537.jpeg",
        ),
        Template::new(
            "Change My Mind",
            "https://images.pexels.com/photos/8088448/pexels-photo-8088448.jpeg",
        ),
        Template::new(
            "Two Buttons",
            "https://images.pexels.com/photos/1918290/pexels-photo-1918290.jpeg",
        ),
    ]
}
