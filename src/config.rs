// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Application settings.
//!
//! Settings come from the file named by `MEMESMITH_CONFIG`, else from
//! `memesmith.yaml` in the working directory, else from built-in defaults.
//! Every field is optional in the file.

use crate::controller::EditorSettings;
use crate::io::serialization;
use crate::models::composition::{clamp_box_width, clamp_font_size, TextDefaults};
use crate::models::template::{default_catalog, Template};
use crate::render::EXPORT_SCALE;
use crate::util::color::{parse_color, to_hex};
use crate::util::geometry::MAX_DISPLAY_EXTENT;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "MEMESMITH_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "memesmith.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Largest displayed width or height of a background.
    pub max_display_extent: f32,
    /// Export pixels per display unit.
    pub export_scale: f32,
    /// TrueType/OpenType font for captions. The bundled font when unset.
    pub font_path: Option<PathBuf>,
    pub default_text: String,
    pub default_box_width: f32,
    pub default_font_size: u32,
    pub default_fill: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        let text = TextDefaults::default();
        Self {
            max_display_extent: MAX_DISPLAY_EXTENT,
            export_scale: EXPORT_SCALE,
            font_path: None,
            default_text: text.content,
            default_box_width: text.box_width,
            default_font_size: text.font_size_px,
            default_fill: to_hex(text.fill),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Sent as `Origin` on template requests.
    pub request_origin: String,
    pub fetch_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_origin: "app://memesmith".to_string(),
            fetch_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub storage_dir: PathBuf,
    /// Signed in at startup when set.
    pub username: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("memesmith-data"),
            username: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub editor: EditorConfig,
    pub network: NetworkConfig,
    pub backend: BackendConfig,
    pub templates: Vec<Template>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            editor: EditorConfig::default(),
            network: NetworkConfig::default(),
            backend: BackendConfig::default(),
            templates: default_catalog(),
        }
    }
}

impl Config {
    /// Load settings from the usual locations.
    ///
    /// Returns the settings and the file they came from, if any.
    pub fn load() -> Result<(Self, Option<PathBuf>)> {
        match resolve_path(std::env::var_os(CONFIG_ENV).map(PathBuf::from), Path::new(".")) {
            Some(path) => {
                let config = Self::from_file(&path)?;
                Ok((config, Some(path)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let config: Self = serialization::load(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let editor = &self.editor;
        if !(editor.max_display_extent.is_finite() && editor.max_display_extent >= 1.0) {
            bail!("editor.max_display_extent must be at least 1");
        }
        if !(editor.export_scale.is_finite() && editor.export_scale > 0.0) {
            bail!("editor.export_scale must be positive");
        }
        if parse_color(&editor.default_fill).is_none() {
            bail!("editor.default_fill {:?} is not a color", editor.default_fill);
        }
        Ok(())
    }

    pub fn text_defaults(&self) -> TextDefaults {
        let editor = &self.editor;
        let fallback = TextDefaults::default();
        TextDefaults {
            content: editor.default_text.clone(),
            box_width: clamp_box_width(editor.default_box_width),
            font_size_px: clamp_font_size(editor.default_font_size),
            fill: parse_color(&editor.default_fill).unwrap_or(fallback.fill),
        }
    }

    pub fn editor_settings(&self) -> EditorSettings {
        EditorSettings {
            max_display_extent: self.editor.max_display_extent,
            export_scale: self.editor.export_scale,
            text_defaults: self.text_defaults(),
        }
    }
}

/// Pick the settings file: an explicit path wins, then the default file in `dir`.
pub fn resolve_path(explicit: Option<PathBuf>, dir: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
        return Some(path);
    }
    let candidate = dir.join(DEFAULT_CONFIG_FILE);
    candidate.is_file().then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::Color32;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memesmith.yaml");
        std::fs::write(
            &path,
            "editor:\n  default_font_size: 200\n  default_fill: yellow\nbackend:\n  username: doge\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.editor.max_display_extent, 600.0);
        assert_eq!(config.network, NetworkConfig::default());
        assert_eq!(config.backend.username.as_deref(), Some("doge"));
        assert_eq!(config.templates, default_catalog());

        let defaults = config.text_defaults();
        assert_eq!(defaults.font_size_px, 72);
        assert_eq!(defaults.fill, Color32::from_rgb(255, 255, 0));
        assert_eq!(defaults.content, "ADD TEXT HERE");
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut config = Config::default();
        config.templates = vec![Template::new("Local", "/tmp/local.png")];
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = Config::default();
        config.editor.export_scale = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.editor.default_fill = "not-a-color".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_path() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_path(None, dir.path()), None);

        let explicit = PathBuf::from("/somewhere/else.json");
        assert_eq!(resolve_path(Some(explicit.clone()), dir.path()), Some(explicit));

        let default = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&default, "{}").unwrap();
        assert_eq!(resolve_path(None, dir.path()), Some(default.clone()));
        assert_eq!(resolve_path(Some(PathBuf::new()), dir.path()), Some(default));
    }

    #[test]
    fn test_editor_settings() {
        let settings = Config::default().editor_settings();
        assert_eq!(settings, EditorSettings::default());
    }
}
