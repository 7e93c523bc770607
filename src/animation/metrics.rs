//! Worst-case metrics over aligned animation frames.

use serde::{Deserialize, Serialize};

use super::{FrameSequence, SequenceInfo, align};
use crate::error::{Error, FrameShape, Result};
use crate::metrics::{MetricConfig, PairMetric, Psnr, compare_buffers};
use crate::stats::Summary;

/// Spread of per-frame metrics for an animated comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameStats {
    /// Finite per-frame PSNR values. Identical frames are counted separately.
    pub psnr: Option<Summary>,
    /// Per-frame SSIM values.
    pub ssim: Option<Summary>,
    /// Frame pairs with zero error.
    pub identical_frames: usize,
    /// Aligned frame pairs that could not be compared.
    pub frames_skipped: usize,
}

/// Result of comparing two frame sequences.
#[derive(Debug)]
pub struct AnimationOutcome {
    /// Walk summary of the first sequence.
    pub a: SequenceInfo,
    /// Walk summary of the second sequence.
    pub b: SequenceInfo,
    /// Number of aligned pairs that were comparable.
    pub frames_compared: usize,
    /// Worst (minimum) PSNR and SSIM over comparable pairs, or why no pair
    /// was comparable.
    pub metric: Result<PairMetric>,
    /// Per-frame spread.
    pub frame_stats: FrameStats,
    /// Shapes of the first aligned pair, when the sequences overlap.
    pub first_shapes: Option<(FrameShape, FrameShape)>,
}

/// Compare two sequences frame by frame and keep the worst case.
///
/// Pairs with differing shape are skipped. When no pair is comparable,
/// `metric` holds the first skipped pair's error, or a dimension mismatch if
/// the sequences share no index at all. Only frame decode failures are
/// returned as `Err`.
pub fn compare_sequences(a: FrameSequence, b: FrameSequence, config: &MetricConfig) -> Result<AnimationOutcome> {
    let mut psnr_worst: Option<Psnr> = None;
    let mut ssim_worst: Option<f64> = None;
    let mut finite_psnr = Vec::new();
    let mut ssim_values = Vec::new();
    let mut identical_frames = 0;
    let mut skipped = 0;
    let mut first_error: Option<Error> = None;
    let mut first_shapes: Option<(FrameShape, FrameShape)> = None;

    let (info_a, info_b) = align(a, b, |index, fa, fb| {
        first_shapes.get_or_insert((fa.pixels.shape(), fb.pixels.shape()));
        match compare_buffers(&fa.pixels, &fb.pixels, config) {
            Ok(metric) => {
                if let Some(psnr) = metric.psnr {
                    match psnr.db() {
                        Some(db) => finite_psnr.push(db),
                        None => identical_frames += 1,
                    }
                    psnr_worst = Some(match psnr_worst {
                        Some(w) if w.total_cmp(&psnr).is_le() => w,
                        _ => psnr,
                    });
                }
                if let Some(ssim) = metric.ssim {
                    ssim_values.push(ssim);
                    ssim_worst = Some(ssim_worst.map_or(ssim, |w| w.min(ssim)));
                }
            }
            Err(err) => {
                tracing::warn!(frame = index, error = %err, "skipping frame pair");
                skipped += 1;
                first_error.get_or_insert(err);
            }
        }
    })?;

    let frames_compared = ssim_values.len();
    let metric = if frames_compared > 0 {
        Ok(PairMetric {
            psnr: psnr_worst,
            ssim: ssim_worst,
        })
    } else {
        Err(first_error.unwrap_or_else(|| no_overlap(&info_a, &info_b)))
    };

    Ok(AnimationOutcome {
        a: info_a,
        b: info_b,
        frames_compared,
        metric,
        frame_stats: FrameStats {
            psnr: Summary::compute(&finite_psnr),
            ssim: Summary::compute(&ssim_values),
            identical_frames,
            frames_skipped: skipped,
        },
        first_shapes,
    })
}

fn no_overlap(a: &SequenceInfo, b: &SequenceInfo) -> Error {
    tracing::warn!(
        frames_a = a.frame_count,
        frames_b = b.frame_count,
        "no overlapping frames to compare"
    );
    Error::DimensionOrModeMismatch {
        expected: empty_shape(),
        actual: empty_shape(),
    }
}

fn empty_shape() -> FrameShape {
    FrameShape {
        width: 0,
        height: 0,
        mode: crate::decode::ColorMode::Rgba8,
    }
}
