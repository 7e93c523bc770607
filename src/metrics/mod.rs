//! Full-reference quality metrics for pixel-aligned image pairs.
//!
//! - **PSNR**: Peak Signal-to-Noise Ratio in dB (higher is better,
//!   [`Psnr::Infinite`] for identical inputs)
//! - **SSIM**: Structural similarity index (1.0 = identical)
//!
//! Both metrics require the two buffers to have the same dimensions and
//! color mode; nothing is resampled or converted. Samples are compared at
//! their native depth, so the PSNR peak is 255 for 8-bit data, 65535 for
//! 16-bit data and 1.0 for float data unless configured otherwise.
//!
//! ## Typical values (8-bit)
//!
//! | PSNR (dB) | SSIM | Description |
//! |-----------|------|-------------|
//! | inf | 1.0 | Pixel-identical |
//! | > 45 | > 0.99 | Visually lossless |
//! | 35-45 | 0.95-0.99 | High quality |
//! | 25-35 | 0.80-0.95 | Visible artifacts |
//! | < 25 | < 0.80 | Heavily degraded |

pub mod ssim;

use std::cmp::Ordering;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::decode::{PixelBuffer, Samples};
use crate::error::{Error, Result};

pub use ssim::{SsimChannels, SsimConfig, SsimWindow};

/// Peak value `MAX_I` used by PSNR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PsnrPeak {
    /// Largest value of the buffer's sample depth.
    #[default]
    BitDepth,
    /// A fixed peak regardless of depth.
    Fixed(f64),
}

impl PsnrPeak {
    /// Peak value for `buffer`.
    #[must_use]
    pub fn resolve(self, buffer: &PixelBuffer) -> f64 {
        match self {
            Self::BitDepth => buffer.mode().bit_depth().peak(),
            Self::Fixed(peak) => peak,
        }
    }
}

/// Configuration for metric calculation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricConfig {
    /// PSNR peak selection.
    pub psnr_peak: PsnrPeak,
    /// SSIM window and channel handling.
    pub ssim: SsimConfig,
}

/// PSNR value.
///
/// Identical inputs have zero error and therefore no finite PSNR; that case
/// is the [`Psnr::Infinite`] sentinel, which orders above every finite value.
/// Serializes as a JSON number, or the string `"inf"`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum Psnr {
    /// Finite PSNR in dB.
    Db(f64),
    /// Zero mean squared error.
    Infinite,
}

impl Psnr {
    /// From a mean squared error and peak value.
    #[must_use]
    pub fn from_mse(mse: f64, peak: f64) -> Self {
        if mse == 0.0 {
            Self::Infinite
        } else {
            Self::Db(10.0 * (peak * peak / mse).log10())
        }
    }

    /// Finite dB value, if any.
    #[must_use]
    pub fn db(self) -> Option<f64> {
        match self {
            Self::Db(v) => Some(v),
            Self::Infinite => None,
        }
    }

    /// Whether this is the identical-image sentinel.
    #[must_use]
    pub fn is_infinite(self) -> bool {
        matches!(self, Self::Infinite)
    }

    /// Total order: finite values by magnitude, `Infinite` above all of them.
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Db(a), Self::Db(b)) => a.total_cmp(b),
            (Self::Db(_), Self::Infinite) => Ordering::Less,
            (Self::Infinite, Self::Db(_)) => Ordering::Greater,
            (Self::Infinite, Self::Infinite) => Ordering::Equal,
        }
    }
}

impl std::fmt::Display for Psnr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(v) => match f.precision() {
                Some(p) => write!(f, "{v:.p$}"),
                None => write!(f, "{v}"),
            },
            Self::Infinite => f.write_str("inf"),
        }
    }
}

impl Serialize for Psnr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Db(v) => serializer.serialize_f64(*v),
            Self::Infinite => serializer.serialize_str("inf"),
        }
    }
}

impl<'de> Deserialize<'de> for Psnr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(Self::Db(v)),
            Repr::Text(s) if s == "inf" => Ok(Self::Infinite),
            Repr::Text(s) => Err(serde::de::Error::custom(format!("invalid PSNR value: {s}"))),
        }
    }
}

/// Metrics for one image pair (or the worst frame pair of an animation).
///
/// Both fields are `None` when the pair was not comparable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PairMetric {
    /// PSNR.
    pub psnr: Option<Psnr>,
    /// SSIM in `[-1, 1]`.
    pub ssim: Option<f64>,
}

/// Fail with [`Error::DimensionOrModeMismatch`] unless `a` and `b` have the
/// same dimensions and color mode.
pub fn ensure_comparable(a: &PixelBuffer, b: &PixelBuffer) -> Result<()> {
    if a.shape() == b.shape() {
        Ok(())
    } else {
        Err(Error::DimensionOrModeMismatch {
            expected: a.shape(),
            actual: b.shape(),
        })
    }
}

/// Calculate PSNR between two buffers.
///
/// The mean squared error is taken over every sample, alpha included.
pub fn calculate_psnr(a: &PixelBuffer, b: &PixelBuffer, peak: f64) -> Result<Psnr> {
    ensure_comparable(a, b)?;
    let sse = match (a.samples(), b.samples()) {
        (Samples::U8(x), Samples::U8(y)) => squared_error(x, y),
        (Samples::U16(x), Samples::U16(y)) => squared_error(x, y),
        (Samples::F32(x), Samples::F32(y)) => squared_error(x, y),
        _ => {
            return Err(Error::DimensionOrModeMismatch {
                expected: a.shape(),
                actual: b.shape(),
            });
        }
    };
    let count = a.samples().len().max(1) as f64;
    Ok(Psnr::from_mse(sse / count, peak))
}

fn squared_error<T: Copy + Into<f64>>(x: &[T], y: &[T]) -> f64 {
    x.iter()
        .zip(y)
        .map(|(&p, &q)| {
            let d = p.into() - q.into();
            d * d
        })
        .sum()
}

/// Compare two buffers with PSNR and SSIM.
///
/// Fails with [`Error::DimensionOrModeMismatch`] for differently shaped
/// inputs. The result does not depend on argument order.
pub fn compare_buffers(a: &PixelBuffer, b: &PixelBuffer, config: &MetricConfig) -> Result<PairMetric> {
    let psnr = calculate_psnr(a, b, config.psnr_peak.resolve(a))?;
    let ssim = ssim::ssim(a, b, a.mode().bit_depth().peak(), &config.ssim);
    Ok(PairMetric {
        psnr: Some(psnr),
        ssim: Some(ssim),
    })
}
