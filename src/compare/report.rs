//! Report types for directory comparisons.
//!
//! This module defines the data structures for comparison reports. Field
//! names are the serialized schema for JSON and CSV output.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::fileset::FileSet;
use crate::animation::FrameStats;
use crate::container::{ContainerFormat, LoopCount};
use crate::decode::ColorMode;
use crate::error::ErrorKind;
use crate::metrics::{MetricConfig, PairMetric};
use crate::stats::Summary;

/// Image dimensions, serialized as `"WxH"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (w, h) = s.split_once('x').ok_or_else(|| format!("invalid resolution: {s}"))?;
        let width = w.parse().map_err(|_| format!("invalid width in {s}"))?;
        let height = h.parse().map_err(|_| format!("invalid height in {s}"))?;
        Ok(Self { width, height })
    }
}

impl From<Resolution> for String {
    fn from(r: Resolution) -> Self {
        r.to_string()
    }
}

impl TryFrom<String> for Resolution {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// Outcome of comparing one file name present in both directories.
///
/// `comparable` is false exactly when `error` is set, and then `psnr` and
/// `ssim` are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    /// File name shared by both directories.
    pub filename: String,

    /// Size of the file in A, in bytes.
    pub size_a: u64,
    /// Size of the file in B, in bytes.
    pub size_b: u64,
    /// `size_b - size_a`.
    pub size_diff: i64,
    /// `size_b / size_a`; absent when `size_a` is zero.
    pub size_ratio: Option<f64>,

    /// Dimensions of A (first frame for animations).
    pub resolution_a: Option<Resolution>,
    /// Dimensions of B.
    pub resolution_b: Option<Resolution>,
    /// Decoded color mode of A.
    pub mode_a: Option<ColorMode>,
    /// Decoded color mode of B.
    pub mode_b: Option<ColorMode>,
    /// Sniffed container of A, set whenever A opened.
    pub format_a: Option<ContainerFormat>,
    /// Sniffed container of B.
    pub format_b: Option<ContainerFormat>,

    /// PSNR and SSIM; for animations, the minimum over compared frames.
    #[serde(flatten)]
    pub metric: PairMetric,

    /// Frame count of A (1 for still images). Absent when A failed to decode.
    pub frame_count_a: Option<u32>,
    /// Frame count of B.
    pub frame_count_b: Option<u32>,
    /// Frames per second of A, for animations with known frame durations.
    pub fps_a: Option<f64>,
    /// Frames per second of B.
    pub fps_b: Option<f64>,
    /// Loop count declared by A.
    pub loop_count_a: Option<LoopCount>,
    /// Loop count declared by B.
    pub loop_count_b: Option<LoopCount>,

    /// Number of frame pairs that contributed to `metric`.
    pub frames_compared: usize,
    /// Per-frame spread, for animated comparisons.
    pub frame_stats: Option<FrameStats>,

    /// Whether metrics were computed.
    pub comparable: bool,
    /// Why the pair could not be compared.
    pub error: Option<ErrorKind>,
    /// Human readable reason accompanying `error`.
    pub error_detail: Option<String>,
}

impl ComparisonRecord {
    /// A record with sizes filled in and nothing compared yet.
    #[must_use]
    pub fn new(filename: impl Into<String>, size_a: u64, size_b: u64) -> Self {
        Self {
            filename: filename.into(),
            size_a,
            size_b,
            size_diff: size_b as i64 - size_a as i64,
            size_ratio: (size_a != 0).then(|| size_b as f64 / size_a as f64),
            resolution_a: None,
            resolution_b: None,
            mode_a: None,
            mode_b: None,
            format_a: None,
            format_b: None,
            metric: PairMetric::default(),
            frame_count_a: None,
            frame_count_b: None,
            fps_a: None,
            fps_b: None,
            loop_count_a: None,
            loop_count_b: None,
            frames_compared: 0,
            frame_stats: None,
            comparable: false,
            error: None,
            error_detail: None,
        }
    }

    /// Mark the record comparable with `metric`.
    pub fn set_metric(&mut self, metric: PairMetric) {
        self.metric = metric;
        self.comparable = true;
        self.error = None;
        self.error_detail = None;
    }

    /// Mark the record not comparable.
    pub fn set_error(&mut self, kind: ErrorKind, detail: impl Into<String>) {
        self.metric = PairMetric::default();
        self.comparable = false;
        self.error = Some(kind);
        self.error_detail = Some(detail.into());
    }

    /// Whether both sides report different frame counts.
    #[must_use]
    pub fn frame_count_mismatch(&self) -> bool {
        matches!((self.frame_count_a, self.frame_count_b), (Some(a), Some(b)) if a != b)
    }
}

/// Aggregate counts and metric spread over a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Number of records (common file names).
    pub total_compared: usize,
    /// Records with metrics.
    pub total_comparable: usize,
    /// Records with an error.
    pub total_errored: usize,
    /// Names present only in A.
    pub total_only_a: usize,
    /// Names present only in B.
    pub total_only_b: usize,
    /// Files listed in A.
    pub total_files_a: usize,
    /// Files listed in B.
    pub total_files_b: usize,
    /// Records whose two sides have different frame counts.
    pub frame_count_mismatches: usize,
    /// Records with infinite PSNR.
    pub total_identical: usize,
    /// Spread of finite PSNR over comparable records.
    pub psnr: Option<Summary>,
    /// Spread of SSIM over comparable records.
    pub ssim: Option<Summary>,
}

impl ReportSummary {
    /// Summarize `records` for `file_set`.
    #[must_use]
    pub fn from_records(file_set: &FileSet, records: &[ComparisonRecord]) -> Self {
        let comparable: Vec<&ComparisonRecord> = records.iter().filter(|r| r.comparable).collect();
        let psnr: Vec<f64> = comparable.iter().filter_map(|r| r.metric.psnr?.db()).collect();
        let ssim: Vec<f64> = comparable.iter().filter_map(|r| r.metric.ssim).collect();

        Self {
            total_compared: records.len(),
            total_comparable: comparable.len(),
            total_errored: records.iter().filter(|r| r.error.is_some()).count(),
            total_only_a: file_set.only_a.len(),
            total_only_b: file_set.only_b.len(),
            total_files_a: file_set.total_a(),
            total_files_b: file_set.total_b(),
            frame_count_mismatches: records.iter().filter(|r| r.frame_count_mismatch()).count(),
            total_identical: comparable
                .iter()
                .filter(|r| r.metric.psnr.is_some_and(|p| p.is_infinite()))
                .count(),
            psnr: Summary::compute(&psnr),
            ssim: Summary::compute(&ssim),
        }
    }
}

/// Full result of comparing two directories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Directory of originals.
    pub dir_a: PathBuf,
    /// Directory of variations.
    pub dir_b: PathBuf,
    /// Metric settings the report was produced with.
    pub config: MetricConfig,
    /// How names split between the directories.
    pub file_set: FileSet,
    /// One record per common name, in lexicographic order.
    pub records: Vec<ComparisonRecord>,
    /// Totals over `records`.
    pub summary: ReportSummary,
}

impl ComparisonReport {
    /// Assemble a report and compute its summary.
    #[must_use]
    pub fn new(
        dir_a: PathBuf,
        dir_b: PathBuf,
        config: MetricConfig,
        file_set: FileSet,
        records: Vec<ComparisonRecord>,
    ) -> Self {
        let summary = ReportSummary::from_records(&file_set, &records);
        Self {
            dir_a,
            dir_b,
            config,
            file_set,
            records,
            summary,
        }
    }

    /// Record for `filename`, if it was compared.
    #[must_use]
    pub fn record(&self, filename: &str) -> Option<&ComparisonRecord> {
        self.records
            .binary_search_by(|r| r.filename.as_str().cmp(filename))
            .ok()
            .map(|i| &self.records[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Psnr;

    #[test]
    fn test_resolution_string_form() {
        let r = Resolution::new(1920, 1080);
        assert_eq!(serde_json::to_string(&r).unwrap(), "\"1920x1080\"");
        let back: Resolution = serde_json::from_str("\"64x48\"").unwrap();
        assert_eq!(back, Resolution::new(64, 48));
        assert!("64by48".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_size_ratio() {
        let r = ComparisonRecord::new("a.png", 200, 100);
        assert_eq!(r.size_ratio, Some(0.5));
        assert_eq!(r.size_diff, -100);

        let r = ComparisonRecord::new("empty.png", 0, 100);
        assert_eq!(r.size_ratio, None);
    }

    #[test]
    fn test_error_clears_metric() {
        let mut r = ComparisonRecord::new("a.png", 1, 1);
        r.set_metric(PairMetric { psnr: Some(Psnr::Db(30.0)), ssim: Some(0.9) });
        assert!(r.comparable);
        r.set_error(ErrorKind::Decode, "truncated");
        assert!(!r.comparable);
        assert_eq!(r.metric, PairMetric::default());
        assert_eq!(r.error, Some(ErrorKind::Decode));
    }

    #[test]
    fn test_record_json_field_names() {
        let mut r = ComparisonRecord::new("a.png", 10, 20);
        r.set_metric(PairMetric { psnr: Some(Psnr::Infinite), ssim: Some(1.0) });
        let value = serde_json::to_value(&r).unwrap();
        for field in ["size_a", "size_b", "psnr", "ssim", "frame_count_a", "frame_count_b", "fps_a", "fps_b"] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
        assert_eq!(value["psnr"], "inf");

        let back: ComparisonRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_summary_counts() {
        let file_set = FileSet::from_names(
            ["a", "b", "c", "x"].iter().map(|s| (*s).to_string()).collect(),
            ["a", "b", "c"].iter().map(|s| (*s).to_string()).collect(),
        );
        let mut a = ComparisonRecord::new("a", 1, 1);
        a.set_metric(PairMetric { psnr: Some(Psnr::Db(40.0)), ssim: Some(0.99) });
        let mut b = ComparisonRecord::new("b", 1, 1);
        b.set_metric(PairMetric { psnr: Some(Psnr::Infinite), ssim: Some(1.0) });
        b.frame_count_a = Some(10);
        b.frame_count_b = Some(8);
        let mut c = ComparisonRecord::new("c", 1, 1);
        c.set_error(ErrorKind::Decode, "bad");

        let report = ComparisonReport::new(
            PathBuf::from("A"),
            PathBuf::from("B"),
            MetricConfig::default(),
            file_set,
            vec![a, b, c],
        );
        let s = &report.summary;
        assert_eq!(s.total_compared, 3);
        assert_eq!(s.total_comparable, 2);
        assert_eq!(s.total_errored, 1);
        assert_eq!(s.total_only_a, 1);
        assert_eq!(s.total_files_a, 4);
        assert_eq!(s.frame_count_mismatches, 1);
        assert_eq!(s.total_identical, 1);
        assert_eq!(s.psnr.as_ref().unwrap().count, 1);
        assert_eq!(s.ssim.as_ref().unwrap().count, 2);
        assert!(report.record("b").is_some());
        assert!(report.record("x").is_none());
    }
}
