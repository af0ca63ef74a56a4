// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Editor error taxonomy.
//!
//! The editor core reports every outcome to its caller through these
//! variants; presentation (notifications, logging) is left to the host.

use thiserror::Error;

/// Errors produced by the compositing editor.
#[derive(Debug, Error)]
pub enum EditorError {
    /// Image bytes or a template URL could not be rasterized.
    #[error("could not load image: {0}")]
    DecodeFailure(String),

    /// An operation was invoked while its control should have been disabled.
    /// Nothing was mutated.
    #[error("cannot {operation} while the editor is {state}")]
    PreconditionViolation {
        operation: &'static str,
        state: &'static str,
    },

    /// The background was fetched without cross-origin permission and the
    /// surface cannot be flattened.
    #[error("image was loaded without cross-origin permission and cannot be exported")]
    ExportTaintedSurface,

    /// PNG encoding of the flattened surface failed.
    #[error("failed to encode exported image: {0}")]
    Encode(#[from] image::ImageError),
}

impl EditorError {
    /// True for the recoverable "could not load image" condition.
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, Self::DecodeFailure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_condition() {
        let err = EditorError::DecodeFailure("unsupported format".to_string());
        assert_eq!(err.to_string(), "could not load image: unsupported format");
        assert!(err.is_decode_failure());

        let err = EditorError::PreconditionViolation {
            operation: "add text",
            state: "empty",
        };
        assert_eq!(err.to_string(), "cannot add text while the editor is empty");
        assert!(!err.is_decode_failure());
    }
}
