//! Decoded pixel buffers.
//!
//! A [`PixelBuffer`] keeps samples at their native depth (8-bit, 16-bit or
//! float) so that PSNR and SSIM can use the correct peak value. Nothing here
//! converts between color modes: two buffers with different modes are simply
//! not comparable.

use image::DynamicImage;
use imgref::ImgVec;
use rgb::FromSlice;
use serde::{Deserialize, Serialize};

use crate::error::FrameShape;

/// Channel layout and sample depth of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// 8-bit grayscale.
    L8,
    /// 8-bit grayscale with alpha.
    La8,
    /// 8-bit RGB.
    Rgb8,
    /// 8-bit RGBA.
    Rgba8,
    /// 16-bit grayscale.
    L16,
    /// 16-bit grayscale with alpha.
    La16,
    /// 16-bit RGB.
    Rgb16,
    /// 16-bit RGBA.
    Rgba16,
    /// 32-bit float RGB.
    Rgb32F,
    /// 32-bit float RGBA.
    Rgba32F,
}

/// Sample depth of a color mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    /// 8-bit integer samples.
    Eight,
    /// 16-bit integer samples.
    Sixteen,
    /// 32-bit float samples in `0.0..=1.0`.
    Float,
}

impl BitDepth {
    /// Bits per sample.
    #[must_use]
    pub fn bits(self) -> u32 {
        match self {
            Self::Eight => 8,
            Self::Sixteen => 16,
            Self::Float => 32,
        }
    }

    /// Largest representable sample value (the `MAX_I` of PSNR).
    #[must_use]
    pub fn peak(self) -> f64 {
        match self {
            Self::Eight => 255.0,
            Self::Sixteen => 65535.0,
            Self::Float => 1.0,
        }
    }
}

impl ColorMode {
    /// Map an `image` color type to a mode, if it is one we keep natively.
    #[must_use]
    pub fn from_color_type(color: image::ColorType) -> Option<Self> {
        use image::ColorType;
        Some(match color {
            ColorType::L8 => Self::L8,
            ColorType::La8 => Self::La8,
            ColorType::Rgb8 => Self::Rgb8,
            ColorType::Rgba8 => Self::Rgba8,
            ColorType::L16 => Self::L16,
            ColorType::La16 => Self::La16,
            ColorType::Rgb16 => Self::Rgb16,
            ColorType::Rgba16 => Self::Rgba16,
            ColorType::Rgb32F => Self::Rgb32F,
            ColorType::Rgba32F => Self::Rgba32F,
            _ => return None,
        })
    }

    /// Number of interleaved channels.
    #[must_use]
    pub fn channels(self) -> usize {
        match self {
            Self::L8 | Self::L16 => 1,
            Self::La8 | Self::La16 => 2,
            Self::Rgb8 | Self::Rgb16 | Self::Rgb32F => 3,
            Self::Rgba8 | Self::Rgba16 | Self::Rgba32F => 4,
        }
    }

    /// Sample depth.
    #[must_use]
    pub fn bit_depth(self) -> BitDepth {
        match self {
            Self::L8 | Self::La8 | Self::Rgb8 | Self::Rgba8 => BitDepth::Eight,
            Self::L16 | Self::La16 | Self::Rgb16 | Self::Rgba16 => BitDepth::Sixteen,
            Self::Rgb32F | Self::Rgba32F => BitDepth::Float,
        }
    }

    /// Whether the mode carries color (as opposed to grayscale) channels.
    #[must_use]
    pub fn is_color(self) -> bool {
        self.channels() >= 3
    }

    /// Lowercase name used in reports.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::L8 => "l8",
            Self::La8 => "la8",
            Self::Rgb8 => "rgb8",
            Self::Rgba8 => "rgba8",
            Self::L16 => "l16",
            Self::La16 => "la16",
            Self::Rgb16 => "rgb16",
            Self::Rgba16 => "rgba16",
            Self::Rgb32F => "rgb32f",
            Self::Rgba32F => "rgba32f",
        }
    }
}

impl std::fmt::Display for ColorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Interleaved samples at native depth.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    /// 8-bit samples.
    U8(Vec<u8>),
    /// 16-bit samples.
    U16(Vec<u16>),
    /// Float samples, nominally `0.0..=1.0`.
    F32(Vec<f32>),
}

impl Samples {
    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::U8(s) => s.len(),
            Self::U16(s) => s.len(),
            Self::F32(s) => s.len(),
        }
    }

    /// Whether there are no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn depth(&self) -> BitDepth {
        match self {
            Self::U8(_) => BitDepth::Eight,
            Self::U16(_) => BitDepth::Sixteen,
            Self::F32(_) => BitDepth::Float,
        }
    }
}

/// One decoded image or animation frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    mode: ColorMode,
    samples: Samples,
}

impl PixelBuffer {
    /// Wrap interleaved samples.
    ///
    /// # Panics
    ///
    /// Panics if the sample type does not match the mode's depth or the sample
    /// count is not `width * height * channels`.
    #[must_use]
    pub fn new(width: u32, height: u32, mode: ColorMode, samples: Samples) -> Self {
        assert_eq!(samples.depth(), mode.bit_depth(), "sample type does not match {mode}");
        assert_eq!(
            samples.len(),
            width as usize * height as usize * mode.channels(),
            "sample count does not match {width}x{height} {mode}"
        );
        Self { width, height, mode, samples }
    }

    /// 8-bit RGBA buffer, the layout animation decoders produce.
    #[must_use]
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::new(width, height, ColorMode::Rgba8, Samples::U8(data))
    }

    /// Image width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Color mode.
    #[must_use]
    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    /// Interleaved samples.
    #[must_use]
    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Dimensions and mode, for comparability checks.
    #[must_use]
    pub fn shape(&self) -> FrameShape {
        FrameShape {
            width: self.width,
            height: self.height,
            mode: self.mode,
        }
    }

    /// Extract one channel as a float plane.
    ///
    /// # Panics
    ///
    /// Panics if `channel` is out of range for the mode.
    #[must_use]
    pub fn channel_plane(&self, channel: usize) -> ImgVec<f64> {
        let channels = self.mode.channels();
        assert!(channel < channels);
        let plane = match &self.samples {
            Samples::U8(s) => strided(s, channel, channels),
            Samples::U16(s) => strided(s, channel, channels),
            Samples::F32(s) => strided(s, channel, channels),
        };
        ImgVec::new(plane, self.width as usize, self.height as usize)
    }

    /// BT.601 luma plane. Grayscale modes return their gray channel; alpha is
    /// ignored.
    #[must_use]
    pub fn luma_plane(&self) -> ImgVec<f64> {
        let plane = match (&self.samples, self.mode.channels()) {
            (_, 1 | 2) => return self.channel_plane(0),
            (Samples::U8(s), 3) => luma(s.as_rgb().iter().map(|p| (p.r, p.g, p.b))),
            (Samples::U8(s), _) => luma(s.as_rgba().iter().map(|p| (p.r, p.g, p.b))),
            (Samples::U16(s), 3) => luma(s.as_rgb().iter().map(|p| (p.r, p.g, p.b))),
            (Samples::U16(s), _) => luma(s.as_rgba().iter().map(|p| (p.r, p.g, p.b))),
            (Samples::F32(s), 3) => luma(s.as_rgb().iter().map(|p| (p.r, p.g, p.b))),
            (Samples::F32(s), _) => luma(s.as_rgba().iter().map(|p| (p.r, p.g, p.b))),
        };
        ImgVec::new(plane, self.width as usize, self.height as usize)
    }
}

fn strided<T: Copy + Into<f64>>(samples: &[T], offset: usize, step: usize) -> Vec<f64> {
    samples.iter().skip(offset).step_by(step).map(|&v| v.into()).collect()
}

fn luma<T: Copy + Into<f64>>(pixels: impl Iterator<Item = (T, T, T)>) -> Vec<f64> {
    pixels
        .map(|(r, g, b)| 0.299 * r.into() + 0.587 * g.into() + 0.114 * b.into())
        .collect()
}

impl From<DynamicImage> for PixelBuffer {
    fn from(img: DynamicImage) -> Self {
        let (width, height) = (img.width(), img.height());
        let (mode, samples) = match img {
            DynamicImage::ImageLuma8(b) => (ColorMode::L8, Samples::U8(b.into_raw())),
            DynamicImage::ImageLumaA8(b) => (ColorMode::La8, Samples::U8(b.into_raw())),
            DynamicImage::ImageRgb8(b) => (ColorMode::Rgb8, Samples::U8(b.into_raw())),
            DynamicImage::ImageRgba8(b) => (ColorMode::Rgba8, Samples::U8(b.into_raw())),
            DynamicImage::ImageLuma16(b) => (ColorMode::L16, Samples::U16(b.into_raw())),
            DynamicImage::ImageLumaA16(b) => (ColorMode::La16, Samples::U16(b.into_raw())),
            DynamicImage::ImageRgb16(b) => (ColorMode::Rgb16, Samples::U16(b.into_raw())),
            DynamicImage::ImageRgba16(b) => (ColorMode::Rgba16, Samples::U16(b.into_raw())),
            DynamicImage::ImageRgb32F(b) => (ColorMode::Rgb32F, Samples::F32(b.into_raw())),
            DynamicImage::ImageRgba32F(b) => (ColorMode::Rgba32F, Samples::F32(b.into_raw())),
            other => (ColorMode::Rgba8, Samples::U8(other.to_rgba8().into_raw())),
        };
        Self::new(width, height, mode, samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_properties() {
        assert_eq!(ColorMode::La8.channels(), 2);
        assert_eq!(ColorMode::Rgba16.channels(), 4);
        assert_eq!(ColorMode::L16.bit_depth().peak(), 65535.0);
        assert_eq!(ColorMode::Rgb8.bit_depth().peak(), 255.0);
        assert!(!ColorMode::La8.is_color());
        assert_eq!(
            ColorMode::from_color_type(image::ColorType::Rgb16),
            Some(ColorMode::Rgb16)
        );
        assert_eq!(serde_json::to_string(&ColorMode::Rgb32F).unwrap(), "\"rgb32f\"");
    }

    #[test]
    fn test_from_dynamic_keeps_depth() {
        let img = image::ImageBuffer::<image::Luma<u16>, _>::from_pixel(3, 2, image::Luma([40000u16]));
        let buf = PixelBuffer::from(DynamicImage::ImageLuma16(img));
        assert_eq!(buf.mode(), ColorMode::L16);
        assert_eq!(buf.samples(), &Samples::U16(vec![40000; 6]));
    }

    #[test]
    fn test_channel_plane() {
        let buf = PixelBuffer::new(2, 1, ColorMode::Rgb8, Samples::U8(vec![1, 2, 3, 4, 5, 6]));
        let green = buf.channel_plane(1);
        assert_eq!(green.width(), 2);
        assert_eq!(green.buf().as_slice(), &[2.0, 5.0]);
    }

    #[test]
    fn test_luma_plane_ignores_alpha() {
        let buf = PixelBuffer::from_rgba8(1, 1, vec![255, 255, 255, 0]);
        let luma = buf.luma_plane();
        assert!((luma.buf()[0] - 255.0).abs() < 1e-9);
    }

    #[test]
    #[should_panic(expected = "sample count")]
    fn test_new_rejects_short_buffer() {
        let _ = PixelBuffer::new(2, 2, ColorMode::L8, Samples::U8(vec![0; 3]));
    }
}
