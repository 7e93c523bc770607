//! Per-file property snapshots.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageDecoder, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};

use super::ColorMode;
use crate::container::{self, ContainerFormat, LoopCount};
use crate::error::{Error, ErrorKind, Result};

/// Read-only properties of one image file.
///
/// Built from file metadata, the container walk and the decoder header.
/// Pixels are not decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    /// Path the descriptor was read from.
    pub path: PathBuf,
    /// File size in bytes.
    pub byte_size: u64,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Decoded color mode, when a decoder backend understands the file.
    pub color_mode: Option<ColorMode>,
    /// Whether the container declares more than one frame.
    pub is_animated: bool,
    /// Declared frame count (1 for still images).
    pub frame_count: u32,
    /// Frames per second for animations.
    pub fps: Option<f64>,
    /// Sniffed container format.
    pub format: ContainerFormat,
    /// Declared loop behavior for animations.
    pub loop_count: Option<LoopCount>,
}

impl ImageDescriptor {
    /// Snapshot the file at `path`.
    ///
    /// A container the decoder cannot handle still yields a descriptor when
    /// the container walk found canvas dimensions (AVIF without the `avif-decode`
    /// feature, for example); `color_mode` is then `None`.
    pub fn read(path: &Path) -> Result<Self> {
        let byte_size = std::fs::metadata(path)
            .map_err(|e| Error::decode(path, e))?
            .len();
        let bytes = std::fs::read(path).map_err(|e| Error::decode(path, e))?;
        let info = container::inspect(&bytes);

        let (width, height, color_mode) = match read_header(path, bytes) {
            Ok((w, h, mode)) => (w, h, mode),
            Err(err) if err.kind() == Some(ErrorKind::UnsupportedFormat) => match info.canvas {
                Some((w, h)) => (w, h, None),
                None => return Err(err),
            },
            Err(err) => return Err(err),
        };

        let is_animated = info.is_animated();
        Ok(Self {
            path: path.to_path_buf(),
            byte_size,
            width,
            height,
            color_mode,
            is_animated,
            frame_count: info.frame_count,
            fps: if is_animated { info.fps() } else { None },
            format: info.format,
            loop_count: if is_animated { info.loop_count } else { None },
        })
    }

    /// `"WxH"` string.
    #[must_use]
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    /// Pixel count of one frame in millions.
    #[must_use]
    pub fn megapixels(&self) -> f64 {
        f64::from(self.width) * f64::from(self.height) / 1_000_000.0
    }

    /// Decoded bits per pixel: channels times sample depth.
    #[must_use]
    pub fn bits_per_pixel(&self) -> Option<u32> {
        self.color_mode
            .map(|mode| mode.channels() as u32 * mode.bit_depth().bits())
    }

    /// Decoded size of one frame divided by the file size.
    #[must_use]
    pub fn compression_ratio(&self) -> Option<f64> {
        if self.byte_size == 0 {
            return None;
        }
        let bits = self.bits_per_pixel()?;
        let raw_bytes = f64::from(self.width) * f64::from(self.height) * f64::from(bits) / 8.0;
        Some(raw_bytes / self.byte_size as f64)
    }
}

fn read_header(path: &Path, bytes: Vec<u8>) -> Result<(u32, u32, Option<ColorMode>)> {
    let mut reader = ImageReader::new(Cursor::new(bytes));
    if let Ok(format) = ImageFormat::from_path(path) {
        reader.set_format(format);
    }
    let decoder = reader
        .with_guessed_format()
        .map_err(|e| Error::decode(path, e))?
        .into_decoder()
        .map_err(|e| Error::from_image(path, e))?;
    let (width, height) = decoder.dimensions();
    Ok((width, height, ColorMode::from_color_type(decoder.color_type())))
}
