//! Decoding files into pixel buffers and frame sequences.
//!
//! The [`Decoder`] trait is the seam between the comparator and image
//! backends. [`StandardDecoder`] is the default, built on the `image` crate.
//! Files that may animate (every GIF, APNG, animation-flagged WebP) are opened
//! through the animation decoder, and the decoded frame count decides: more
//! than one frame means animated, so a single-frame GIF is a still image.

pub mod descriptor;
mod pixels;

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, ImageFormat, ImageReader};

use crate::animation::{Frame, FrameSequence};
use crate::container::{self, ContainerFormat, ContainerInfo};
use crate::error::{Error, Result};

pub use descriptor::ImageDescriptor;
pub use pixels::{BitDepth, ColorMode, PixelBuffer, Samples};

/// A source of decoded images.
///
/// Implementations must be shareable across the comparator's worker threads.
pub trait Decoder: Send + Sync {
    /// Open and decode the file at `path`.
    fn open(&self, path: &Path) -> Result<Decoded>;
}

/// Result of opening a file.
#[derive(Debug)]
pub enum Decoded {
    /// A single still image, fully decoded.
    Static(StaticImage),
    /// An animation whose frames decode on demand.
    Animated(AnimatedImage),
}

/// A fully decoded still image.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticImage {
    /// Sniffed container format.
    pub format: ContainerFormat,
    /// Decoded pixels.
    pub pixels: PixelBuffer,
}

/// An animation opened for streaming.
#[derive(Debug)]
pub struct AnimatedImage {
    /// Sniffed container format.
    pub format: ContainerFormat,
    /// Frames in display order.
    pub frames: FrameSequence,
}

impl Decoded {
    /// Sniffed container format.
    #[must_use]
    pub fn format(&self) -> ContainerFormat {
        match self {
            Self::Static(img) => img.format,
            Self::Animated(anim) => anim.format,
        }
    }

    /// Whether the file is an animation.
    #[must_use]
    pub fn is_animated(&self) -> bool {
        matches!(self, Self::Animated(_))
    }

    /// View as a frame sequence; a still image becomes one frame.
    pub fn into_sequence(self) -> FrameSequence {
        match self {
            Self::Static(img) => FrameSequence::single(img.pixels),
            Self::Animated(anim) => anim.frames,
        }
    }
}

/// Decoder backed by the `image` crate.
///
/// Handles JPEG, PNG, APNG, GIF and WebP. AVIF decodes only when the crate is
/// built with the `avif-decode` feature; otherwise it is reported as an
/// unsupported format.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDecoder;

impl Decoder for StandardDecoder {
    fn open(&self, path: &Path) -> Result<Decoded> {
        let bytes = std::fs::read(path).map_err(|e| Error::decode(path, e))?;
        let info = container::inspect(&bytes);
        tracing::debug!(
            path = %path.display(),
            format = %info.format,
            frames = info.frame_count,
            "opening"
        );

        if info.may_animate() {
            open_animated(path, bytes, &info)
        } else {
            let pixels = decode_still(path, bytes)?;
            Ok(Decoded::Static(StaticImage {
                format: info.format,
                pixels,
            }))
        }
    }
}

/// Decode a still image. The extension provides a format hint; the content
/// sniff overrides it.
fn decode_still(path: &Path, bytes: Vec<u8>) -> Result<PixelBuffer> {
    let mut reader = ImageReader::new(Cursor::new(bytes));
    if let Ok(format) = ImageFormat::from_path(path) {
        reader.set_format(format);
    }
    let reader = reader.with_guessed_format().map_err(|e| Error::decode(path, e))?;
    let img = reader.decode().map_err(|e| Error::from_image(path, e))?;
    Ok(PixelBuffer::from(img))
}

fn open_animated(path: &Path, bytes: Vec<u8>, info: &ContainerInfo) -> Result<Decoded> {
    let cursor = Cursor::new(bytes);
    let frames = match info.format {
        ContainerFormat::Gif => GifDecoder::new(cursor)
            .map_err(|e| Error::from_image(path, e))?
            .into_frames(),
        ContainerFormat::Png => PngDecoder::new(cursor)
            .and_then(|d| d.apng())
            .map_err(|e| Error::from_image(path, e))?
            .into_frames(),
        ContainerFormat::WebP => WebPDecoder::new(cursor)
            .map_err(|e| Error::from_image(path, e))?
            .into_frames(),
        other => {
            return Err(Error::UnsupportedFormat {
                path: path.to_path_buf(),
                reason: format!("animated {other} is not supported"),
            });
        }
    };

    let owned: PathBuf = path.to_path_buf();
    let mut frames = frames.map(move |frame| {
        let frame = frame.map_err(|e| Error::from_image(&owned, e))?;
        let (numer, denom) = frame.delay().numer_denom_ms();
        let duration_ms = if denom == 0 {
            0.0
        } else {
            f64::from(numer) / f64::from(denom)
        };
        let buffer = frame.into_buffer();
        let (width, height) = buffer.dimensions();
        Ok(Frame {
            pixels: PixelBuffer::from_rgba8(width, height, buffer.into_raw()),
            duration_ms,
        })
    });

    // Decode up to two frames here so a damaged second frame fails the open
    // and a lone frame comes back as a still image.
    let first = frames
        .next()
        .ok_or_else(|| Error::decode(path, "container holds no frames"))??;
    let Some(second) = frames.next() else {
        return Ok(Decoded::Static(StaticImage {
            format: info.format,
            pixels: first.pixels,
        }));
    };
    let head = [Ok(first), Ok(second?)];

    Ok(Decoded::Animated(AnimatedImage {
        format: info.format,
        frames: FrameSequence::new(head.into_iter().chain(frames), info.loop_count),
    }))
}
