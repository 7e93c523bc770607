//! Single-scale windowed SSIM.
//!
//! Follows Wang et al. (2004) with the conventions of scikit-image's
//! `structural_similarity`: local statistics come from a separable window
//! and are evaluated only where the window lies fully inside the image.
//! The default 7x7 uniform window uses sample covariance; the 11x11
//! Gaussian window (sigma 1.5) uses population covariance.
//!
//! An image narrower or shorter than the window is scored with a single
//! uniform window covering the whole image (sample covariance), so tiny
//! images such as icons still get a score.

use imgref::{ImgRef, ImgVec};
use serde::{Deserialize, Serialize};

use crate::decode::PixelBuffer;

const K1: f64 = 0.01;
const K2: f64 = 0.03;

/// Window shape for local statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SsimWindow {
    /// 7x7 box window.
    #[default]
    Uniform7,
    /// 11x11 Gaussian window, sigma 1.5.
    Gaussian11,
}

impl SsimWindow {
    /// Side length of the window.
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            Self::Uniform7 => 7,
            Self::Gaussian11 => 11,
        }
    }

    fn kernel(self) -> Vec<f64> {
        let n = self.size();
        match self {
            Self::Uniform7 => vec![1.0 / n as f64; n],
            Self::Gaussian11 => {
                let sigma = 1.5_f64;
                let radius = (n / 2) as f64;
                let raw: Vec<f64> = (0..n)
                    .map(|i| {
                        let x = i as f64 - radius;
                        (-(x * x) / (2.0 * sigma * sigma)).exp()
                    })
                    .collect();
                let total: f64 = raw.iter().sum();
                raw.into_iter().map(|w| w / total).collect()
            }
        }
    }

    fn cov_norm(self) -> f64 {
        match self {
            Self::Uniform7 => {
                let np = (self.size() * self.size()) as f64;
                np / (np - 1.0)
            }
            Self::Gaussian11 => 1.0,
        }
    }
}

/// Which planes SSIM is computed on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SsimChannels {
    /// Every channel (alpha included), averaged.
    #[default]
    PerChannel,
    /// BT.601 luma only; alpha is ignored.
    Luma,
}

/// SSIM settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsimConfig {
    /// Local statistics window.
    pub window: SsimWindow,
    /// Planes to score.
    pub channels: SsimChannels,
}

/// Mean SSIM of two buffers of identical shape.
///
/// `peak` is the dynamic range `L`.
#[must_use]
pub fn ssim(a: &PixelBuffer, b: &PixelBuffer, peak: f64, config: &SsimConfig) -> f64 {
    let size = config.window.size();
    let fits = a.width() as usize >= size && a.height() as usize >= size;
    let plane_ssim = |x: ImgRef<'_, f64>, y: ImgRef<'_, f64>| {
        if fits {
            mean_ssim(x, y, peak, config.window)
        } else {
            whole_image_ssim(x, y, peak)
        }
    };

    match config.channels {
        SsimChannels::Luma => plane_ssim(a.luma_plane().as_ref(), b.luma_plane().as_ref()),
        SsimChannels::PerChannel => {
            let channels = a.mode().channels();
            let total: f64 = (0..channels)
                .map(|c| plane_ssim(a.channel_plane(c).as_ref(), b.channel_plane(c).as_ref()))
                .sum();
            total / channels as f64
        }
    }
}

/// SSIM index from local means, variances and covariance.
fn ssim_index(mx: f64, my: f64, vx: f64, vy: f64, vxy: f64, c1: f64, c2: f64) -> f64 {
    let a1 = 2.0 * mx * my + c1;
    let b1 = mx * mx + my * my + c1;
    let a2 = 2.0 * vxy + c2;
    let b2 = vx + vy + c2;
    (a1 * a2) / (b1 * b2)
}

/// SSIM of one uniform window spanning the whole plane.
fn whole_image_ssim(x: ImgRef<'_, f64>, y: ImgRef<'_, f64>, peak: f64) -> f64 {
    let c1 = (K1 * peak).powi(2);
    let c2 = (K2 * peak).powi(2);

    let (mut sx, mut sy, mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (rx, ry) in x.rows().zip(y.rows()) {
        for (&p, &q) in rx.iter().zip(ry) {
            sx += p;
            sy += q;
            sxx += p * p;
            syy += q * q;
            sxy += p * q;
        }
    }

    let n = (x.width() * x.height()) as f64;
    let cov_norm = if n > 1.0 { n / (n - 1.0) } else { 1.0 };
    let (mx, my) = (sx / n, sy / n);
    let vx = cov_norm * (sxx / n - mx * mx);
    let vy = cov_norm * (syy / n - my * my);
    let vxy = cov_norm * (sxy / n - mx * my);
    ssim_index(mx, my, vx, vy, vxy, c1, c2)
}

/// Mean SSIM of two planes over every position where the window fits.
fn mean_ssim(x: ImgRef<'_, f64>, y: ImgRef<'_, f64>, peak: f64, window: SsimWindow) -> f64 {
    let kernel = window.kernel();
    let cov_norm = window.cov_norm();
    let c1 = (K1 * peak).powi(2);
    let c2 = (K2 * peak).powi(2);

    let xx = map2(x, x, |p, q| p * q);
    let yy = map2(y, y, |p, q| p * q);
    let xy = map2(x, y, |p, q| p * q);

    let ux = filter_valid(x, &kernel);
    let uy = filter_valid(y, &kernel);
    let uxx = filter_valid(xx.as_ref(), &kernel);
    let uyy = filter_valid(yy.as_ref(), &kernel);
    let uxy = filter_valid(xy.as_ref(), &kernel);

    let mut sum = 0.0;
    let mut count = 0usize;
    for i in 0..ux.buf().len() {
        let (mx, my) = (ux.buf()[i], uy.buf()[i]);
        let vx = cov_norm * (uxx.buf()[i] - mx * mx);
        let vy = cov_norm * (uyy.buf()[i] - my * my);
        let vxy = cov_norm * (uxy.buf()[i] - mx * my);
        sum += ssim_index(mx, my, vx, vy, vxy, c1, c2);
        count += 1;
    }
    sum / count as f64
}

fn map2(a: ImgRef<'_, f64>, b: ImgRef<'_, f64>, f: impl Fn(f64, f64) -> f64) -> ImgVec<f64> {
    let buf = a
        .rows()
        .zip(b.rows())
        .flat_map(|(ra, rb)| ra.iter().zip(rb).map(|(&p, &q)| f(p, q)).collect::<Vec<_>>())
        .collect();
    ImgVec::new(buf, a.width(), a.height())
}

/// Separable correlation keeping only fully covered positions.
fn filter_valid(plane: ImgRef<'_, f64>, kernel: &[f64]) -> ImgVec<f64> {
    let k = kernel.len();
    let out_w = plane.width() + 1 - k;
    let out_h = plane.height() + 1 - k;

    let mut horizontal = Vec::with_capacity(out_w * plane.height());
    for row in plane.rows() {
        for x in 0..out_w {
            horizontal.push(row[x..x + k].iter().zip(kernel).map(|(v, w)| v * w).sum::<f64>());
        }
    }

    let mut out = Vec::with_capacity(out_w * out_h);
    for y in 0..out_h {
        for x in 0..out_w {
            let v: f64 = kernel
                .iter()
                .enumerate()
                .map(|(j, w)| horizontal[(y + j) * out_w + x] * w)
                .sum();
            out.push(v);
        }
    }
    ImgVec::new(out, out_w, out_h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{ColorMode, Samples};

    fn gray(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> PixelBuffer {
        let data = (0..height).flat_map(|y| (0..width).map(move |x| (x, y))).map(|(x, y)| f(x, y)).collect();
        PixelBuffer::new(width, height, ColorMode::L8, Samples::U8(data))
    }

    fn pattern(x: u32, y: u32) -> u8 {
        ((x * 37 + y * 11) % 251) as u8
    }

    #[test]
    fn test_identical_is_exactly_one() {
        let a = gray(32, 24, pattern);
        for window in [SsimWindow::Uniform7, SsimWindow::Gaussian11] {
            let config = SsimConfig { window, ..Default::default() };
            assert_eq!(ssim(&a, &a, 255.0, &config), 1.0);
        }
    }

    #[test]
    fn test_symmetric() {
        let a = gray(20, 20, pattern);
        let b = gray(20, 20, |x, y| pattern(x, y).saturating_add((x % 5) as u8 * 9));
        let config = SsimConfig::default();
        let ab = ssim(&a, &b, 255.0, &config);
        let ba = ssim(&b, &a, 255.0, &config);
        assert_eq!(ab, ba);
        assert!(ab < 1.0);
        assert!(ab > 0.0);
    }

    #[test]
    fn test_noise_lowers_score() {
        let a = gray(16, 16, pattern);
        let slight = gray(16, 16, |x, y| pattern(x, y).saturating_add(((x + y) % 2) as u8 * 2));
        let heavy = gray(16, 16, |x, y| pattern(x, y).saturating_add(((x + y) % 2) as u8 * 60));
        let config = SsimConfig::default();
        let s1 = ssim(&a, &slight, 255.0, &config);
        let s2 = ssim(&a, &heavy, 255.0, &config);
        assert!(s1 > s2);
    }

    #[test]
    fn test_flat_images_with_offset() {
        // Constant planes: only the luminance term contributes.
        let a = gray(8, 8, |_, _| 100);
        let b = gray(8, 8, |_, _| 110);
        let s = ssim(&a, &b, 255.0, &SsimConfig::default());
        let c1 = (K1 * 255.0).powi(2);
        let expected = (2.0 * 100.0 * 110.0 + c1) / (100.0f64.powi(2) + 110.0f64.powi(2) + c1);
        assert!((s - expected).abs() < 1e-9);
    }

    #[test]
    fn test_smaller_than_window_uses_whole_image() {
        let a = gray(4, 4, pattern);
        for window in [SsimWindow::Uniform7, SsimWindow::Gaussian11] {
            let config = SsimConfig { window, ..Default::default() };
            assert_eq!(ssim(&a, &a, 255.0, &config), 1.0);
        }

        let flat = gray(6, 40, |_, _| 100);
        let lighter = gray(6, 40, |_, _| 110);
        let c1 = (K1 * 255.0).powi(2);
        let expected = (2.0 * 100.0 * 110.0 + c1) / (100.0f64.powi(2) + 110.0f64.powi(2) + c1);
        let s = ssim(&flat, &lighter, 255.0, &SsimConfig::default());
        assert!((s - expected).abs() < 1e-9);

        let b = gray(4, 4, |x, y| pattern(x, y).saturating_add(30));
        let ab = ssim(&a, &b, 255.0, &SsimConfig::default());
        assert_eq!(ab, ssim(&b, &a, 255.0, &SsimConfig::default()));
        assert!(ab < 1.0);
    }

    #[test]
    fn test_single_pixel() {
        let a = gray(1, 1, |_, _| 50);
        assert_eq!(ssim(&a, &a, 255.0, &SsimConfig::default()), 1.0);
    }

    #[test]
    fn test_luma_ignores_alpha_channel() {
        let opaque = PixelBuffer::from_rgba8(8, 8, [10, 20, 30, 255].repeat(64));
        let clear = PixelBuffer::from_rgba8(8, 8, [10, 20, 30, 0].repeat(64));
        let luma = SsimConfig { channels: SsimChannels::Luma, ..Default::default() };
        assert_eq!(ssim(&opaque, &clear, 255.0, &luma), 1.0);
        assert!(ssim(&opaque, &clear, 255.0, &SsimConfig::default()) < 1.0);
    }

    #[test]
    fn test_gaussian_kernel_normalized() {
        let kernel = SsimWindow::Gaussian11.kernel();
        assert_eq!(kernel.len(), 11);
        assert!((kernel.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(kernel[5] > kernel[4]);
    }
}
