//! Error types for variant-eval operations.
//!
//! [`Error`] is what library functions return. [`ErrorKind`] is the
//! coarse, serializable classification stored on a
//! [`ComparisonRecord`](crate::compare::report::ComparisonRecord) when a
//! single file cannot be compared.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::ColorMode;

/// Result type alias for variant-eval operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while comparing image directories.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A comparison root does not exist or is not a directory.
    #[error("Directory not found: {}", path.display())]
    DirectoryNotFound {
        /// The offending path.
        path: PathBuf,
    },

    /// The file exists but could not be parsed as an image or animation.
    #[error("Decode failed: {}: {reason}", path.display())]
    Decode {
        /// Path to the file that failed to decode.
        path: PathBuf,
        /// Reason reported by the decoder.
        reason: String,
    },

    /// The container was recognized but no decoder backend handles it.
    #[error("Unsupported format: {}: {reason}", path.display())]
    UnsupportedFormat {
        /// Path to the unsupported file.
        path: PathBuf,
        /// Reason reported by the decoder.
        reason: String,
    },

    /// Both inputs decoded but are not pixel-aligned or differ in channels.
    #[error("Dimension or mode mismatch: {expected} vs {actual}")]
    DimensionOrModeMismatch {
        /// Shape of the first input.
        expected: FrameShape,
        /// Shape of the second input.
        actual: FrameShape,
    },

    /// I/O error wrapper.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Build a decode error from any displayable reason.
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Classify an `image` crate failure for `path`.
    pub(crate) fn from_image(path: impl Into<PathBuf>, err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => Self::UnsupportedFormat {
                path: path.into(),
                reason: e.to_string(),
            },
            other => Self::decode(path, other),
        }
    }

    /// The per-record classification of this error.
    ///
    /// I/O failures while reading a candidate file count as decode errors:
    /// from the report's point of view the file could not be read as an image.
    /// Report-writing errors have no record classification.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Decode { .. } | Self::Io(_) => Some(ErrorKind::Decode),
            Self::UnsupportedFormat { .. } => Some(ErrorKind::UnsupportedFormat),
            Self::DimensionOrModeMismatch { .. } => Some(ErrorKind::DimensionOrModeMismatch),
            Self::DirectoryNotFound { .. } | Self::Json(_) | Self::Csv(_) => None,
        }
    }
}

/// Why a single record (or frame pair) is not comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// File exists but cannot be parsed as an image/animation.
    #[serde(rename = "DecodeError")]
    Decode,
    /// Both files decode but are not pixel-comparable.
    DimensionOrModeMismatch,
    /// Decode succeeded in principle but no backend handles the container.
    #[serde(rename = "UnsupportedFormatError")]
    UnsupportedFormat,
}

impl ErrorKind {
    /// Stable name used in CSV and table output.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Decode => "DecodeError",
            Self::DimensionOrModeMismatch => "DimensionOrModeMismatch",
            Self::UnsupportedFormat => "UnsupportedFormatError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Dimensions and color mode of a decoded buffer, used in mismatch errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameShape {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Color mode of the buffer.
    pub mode: ColorMode,
}

impl std::fmt::Display for FrameShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} {}", self.width, self.height, self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = Error::decode("a.png", "truncated");
        assert_eq!(err.kind(), Some(ErrorKind::Decode));

        let err = Error::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no"));
        assert_eq!(err.kind(), Some(ErrorKind::Decode));

        let err = Error::DirectoryNotFound { path: PathBuf::from("/missing") };
        assert_eq!(err.kind(), None);
    }

    #[test]
    fn test_kind_serialized_names() {
        let json = serde_json::to_string(&ErrorKind::Decode).unwrap();
        assert_eq!(json, "\"DecodeError\"");
        let json = serde_json::to_string(&ErrorKind::UnsupportedFormat).unwrap();
        assert_eq!(json, "\"UnsupportedFormatError\"");
        assert_eq!(ErrorKind::DimensionOrModeMismatch.to_string(), "DimensionOrModeMismatch");
    }

    #[test]
    fn test_mismatch_message() {
        let err = Error::DimensionOrModeMismatch {
            expected: FrameShape { width: 100, height: 100, mode: ColorMode::Rgb8 },
            actual: FrameShape { width: 200, height: 200, mode: ColorMode::Rgb8 },
        };
        assert_eq!(
            err.to_string(),
            "Dimension or mode mismatch: 100x100 rgb8 vs 200x200 rgb8"
        );
    }
}
