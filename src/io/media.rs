// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Media loading (uploads and templates).
//!
//! This module decodes image bytes into raster sources and fetches template
//! backgrounds. Remote templates are requested cross-origin: the request
//! carries an `Origin` header and the response must grant access for the
//! resulting surface to be exportable.

use crate::error::EditorError;
use crate::models::composition::{ImageOrigin, RasterSource};
use crate::models::template::is_remote_url;
use std::path::{Path, PathBuf};

/// Image file extensions offered in the upload dialog.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "tif", "tiff"];

/// Raw template bytes plus where they came from.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub origin: ImageOrigin,
}

/// Retrieves template images. Implementations run on worker threads.
pub trait TemplateFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchedImage, EditorError>;
}

/// Fetches `http(s)` templates with `minreq` and reads anything else from disk.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    origin: String,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new(origin: &str, timeout_secs: u64) -> Self {
        Self {
            origin: origin.to_string(),
            timeout_secs,
        }
    }
}

impl TemplateFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedImage, EditorError> {
        if !is_remote_url(url) {
            let path = PathBuf::from(url.strip_prefix("file://").unwrap_or(url));
            let bytes = read_file(&path)?;
            return Ok(FetchedImage {
                bytes,
                origin: ImageOrigin::LocalFile { path },
            });
        }

        let response = minreq::get(url)
            .with_header("Origin", self.origin.as_str())
            .with_timeout(self.timeout_secs)
            .send()
            .map_err(|e| EditorError::DecodeFailure(format!("{url}: {e}")))?;

        if !(200..300).contains(&response.status_code) {
            return Err(EditorError::DecodeFailure(format!(
                "{url}: server returned {} {}",
                response.status_code, response.reason_phrase
            )));
        }

        let granted = cross_origin_granted(
            response
                .headers
                .get("access-control-allow-origin")
                .map(String::as_str),
            &self.origin,
        );

        Ok(FetchedImage {
            bytes: response.into_bytes(),
            origin: ImageOrigin::Template {
                url: url.to_string(),
                cross_origin_granted: granted,
            },
        })
    }
}

/// Whether an `Access-Control-Allow-Origin` value admits `origin`.
pub fn cross_origin_granted(allow_origin: Option<&str>, origin: &str) -> bool {
    match allow_origin.map(str::trim) {
        Some("*") => true,
        Some(value) => value.eq_ignore_ascii_case(origin),
        None => false,
    }
}

pub fn read_file(path: &Path) -> Result<Vec<u8>, EditorError> {
    std::fs::read(path).map_err(|e| EditorError::DecodeFailure(format!("{}: {e}", path.display())))
}

/// Decode encoded image bytes into an RGBA raster.
pub fn decode_image(bytes: &[u8], origin: ImageOrigin) -> Result<RasterSource, EditorError> {
    let image = image::load_from_memory(bytes).map_err(|e| EditorError::DecodeFailure(e.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(EditorError::DecodeFailure("image has no pixels".to_string()));
    }
    Ok(RasterSource::new(image.to_rgba8(), origin))
}

/// Check if a path looks like an image based on its extension.
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    pub(crate) fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_png() {
        let source = decode_image(&png_bytes(12, 7, [1, 2, 3, 255]), ImageOrigin::Upload { name: None }).unwrap();
        assert_eq!((source.width(), source.height()), (12, 7));
        assert_eq!(source.pixels().get_pixel(0, 0), &Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = decode_image(b"definitely not an image", ImageOrigin::Upload { name: None }).unwrap_err();
        assert!(err.is_decode_failure());
    }

    #[test]
    fn test_cross_origin_header() {
        assert!(cross_origin_granted(Some("*"), "app://memesmith"));
        assert!(cross_origin_granted(Some("app://memesmith"), "app://memesmith"));
        assert!(!cross_origin_granted(Some("https://other.example"), "app://memesmith"));
        assert!(!cross_origin_granted(None, "app://memesmith"));
    }

    #[test]
    fn test_local_template_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.png");
        std::fs::write(&path, png_bytes(3, 3, [0, 0, 0, 255])).unwrap();

        let fetcher = HttpFetcher::new("app://memesmith", 5);
        let fetched = fetcher.fetch(path.to_str().unwrap()).unwrap();
        assert_eq!(fetched.origin, ImageOrigin::LocalFile { path: path.clone() });

        let missing = fetcher.fetch(dir.path().join("missing.png").to_str().unwrap());
        assert!(missing.unwrap_err().is_decode_failure());
    }

    #[test]
    fn test_is_image_path() {
        assert!(is_image_path(Path::new("cat.PNG")));
        assert!(is_image_path(Path::new("dir/dog.jpeg")));
        assert!(!is_image_path(Path::new("notes.txt")));
        assert!(!is_image_path(Path::new("no_extension")));
    }
}
