//! Table, JSON and CSV renderings of a [`ComparisonReport`].
//!
//! Renderers only read the report. JSON carries every field; CSV flattens
//! one record per row; the table is for people.

use std::fmt::Write as _;
use std::io::Write;

use serde::Serialize;

use super::report::{ComparisonRecord, ComparisonReport, Resolution};
use crate::decode::ColorMode;
use crate::error::{ErrorKind, Result};
use crate::metrics::Psnr;

/// Human readable byte count: `0B`, `512.0B`, `1.5KB`, `3.2MB`.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0B".to_string();
    }
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1}{}", UNITS[unit])
}

fn or_na<T>(value: Option<T>, f: impl FnOnce(T) -> String) -> String {
    value.map_or_else(|| "N/A".to_string(), f)
}

fn name_list<'a>(names: impl ExactSizeIterator<Item = &'a String>) -> String {
    if names.len() == 0 {
        "(none)".to_string()
    } else {
        names.map(String::as_str).collect::<Vec<_>>().join(", ")
    }
}

/// Render the report as a fixed-width text table.
#[must_use]
pub fn render_table(report: &ComparisonReport) -> String {
    let mut out = String::new();
    let rule = "=".repeat(80);
    let s = &report.summary;

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "VARIATION COMPARISON REPORT");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Directory A: {} ({} files)", report.dir_a.display(), s.total_files_a);
    let _ = writeln!(out, "Directory B: {} ({} files)", report.dir_b.display(), s.total_files_b);
    let _ = writeln!(out, "Common files: {}", report.file_set.common.len());
    let _ = writeln!(out, "Only in A: {}", name_list(report.file_set.only_a.iter()));
    let _ = writeln!(out, "Only in B: {}", name_list(report.file_set.only_b.iter()));
    let _ = writeln!(out);

    if !report.records.is_empty() {
        let header = format!(
            "{:<30} {:<10} {:<10} {:<8} {:<10} {:<10} {:<9} {:<9} {:<7} {:<7}",
            "Filename", "Size A", "Size B", "Ratio", "PSNR(min)", "SSIM(min)", "Frames A", "Frames B", "FPS A", "FPS B"
        );
        let _ = writeln!(out, "DETAILED COMPARISON");
        let _ = writeln!(out, "{}", "-".repeat(80));
        let _ = writeln!(out, "{header}");
        let _ = writeln!(out, "{}", "-".repeat(header.len()));
        for record in &report.records {
            write_row(&mut out, record);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "SUMMARY");
    let _ = writeln!(out, "{}", "-".repeat(80));
    let _ = writeln!(
        out,
        "Compared: {}  Comparable: {}  Errored: {}  Identical: {}",
        s.total_compared, s.total_comparable, s.total_errored, s.total_identical
    );
    if s.frame_count_mismatches > 0 {
        let _ = writeln!(out, "Frame count mismatches: {}", s.frame_count_mismatches);
    }
    if let Some(p) = &s.psnr {
        let _ = writeln!(out, "PSNR (finite): mean {:.2}  min {:.2}  max {:.2}", p.mean, p.min, p.max);
    }
    if let Some(v) = &s.ssim {
        let _ = writeln!(out, "SSIM: mean {:.4}  min {:.4}  max {:.4}", v.mean, v.min, v.max);
    }
    out
}

fn write_row(out: &mut String, r: &ComparisonRecord) {
    let filename: String = r.filename.chars().take(29).collect();
    let ratio = or_na(r.size_ratio, |v| format!("{v:.2}"));
    let psnr = or_na(r.metric.psnr, |p| format!("{p:.2}"));
    let ssim = or_na(r.metric.ssim, |v| format!("{v:.3}"));
    let frames_a = or_na(r.frame_count_a, |v| v.to_string());
    let frames_b = or_na(r.frame_count_b, |v| v.to_string());
    let fps_a = or_na(r.fps_a, |v| format!("{v:.1}"));
    let fps_b = or_na(r.fps_b, |v| format!("{v:.1}"));
    let _ = writeln!(
        out,
        "{filename:<30} {:<10} {:<10} {ratio:<8} {psnr:<10} {ssim:<10} {frames_a:<9} {frames_b:<9} {fps_a:<7} {fps_b:<7}",
        format_size(r.size_a),
        format_size(r.size_b),
    );
    if let Some(kind) = r.error {
        match &r.error_detail {
            Some(detail) => {
                let _ = writeln!(out, "  ERROR: {kind}: {detail}");
            }
            None => {
                let _ = writeln!(out, "  ERROR: {kind}");
            }
        }
    }
}

/// Write the full report as pretty-printed JSON.
pub fn write_json<W: Write>(report: &ComparisonReport, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    Ok(())
}

#[derive(Serialize)]
struct CsvRow<'a> {
    filename: &'a str,
    size_a: u64,
    size_b: u64,
    size_diff: i64,
    size_ratio: Option<f64>,
    resolution_a: Option<Resolution>,
    resolution_b: Option<Resolution>,
    mode_a: Option<ColorMode>,
    mode_b: Option<ColorMode>,
    comparable: bool,
    psnr: Option<Psnr>,
    ssim: Option<f64>,
    frame_count_a: Option<u32>,
    frame_count_b: Option<u32>,
    fps_a: Option<f64>,
    fps_b: Option<f64>,
    frames_compared: usize,
    error: Option<ErrorKind>,
}

impl<'a> From<&'a ComparisonRecord> for CsvRow<'a> {
    fn from(r: &'a ComparisonRecord) -> Self {
        Self {
            filename: &r.filename,
            size_a: r.size_a,
            size_b: r.size_b,
            size_diff: r.size_diff,
            size_ratio: r.size_ratio,
            resolution_a: r.resolution_a,
            resolution_b: r.resolution_b,
            mode_a: r.mode_a,
            mode_b: r.mode_b,
            comparable: r.comparable,
            psnr: r.metric.psnr,
            ssim: r.metric.ssim,
            frame_count_a: r.frame_count_a,
            frame_count_b: r.frame_count_b,
            fps_a: r.fps_a,
            fps_b: r.fps_b,
            frames_compared: r.frames_compared,
            error: r.error,
        }
    }
}

/// Column names of [`write_csv`], in order.
pub const CSV_COLUMNS: [&str; 18] = [
    "filename",
    "size_a",
    "size_b",
    "size_diff",
    "size_ratio",
    "resolution_a",
    "resolution_b",
    "mode_a",
    "mode_b",
    "comparable",
    "psnr",
    "ssim",
    "frame_count_a",
    "frame_count_b",
    "fps_a",
    "fps_b",
    "frames_compared",
    "error",
];

/// Write one CSV row per record. The header is written even with no records.
pub fn write_csv<W: Write>(report: &ComparisonReport, writer: W) -> Result<()> {
    let mut csv = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    csv.write_record(CSV_COLUMNS)?;
    for record in &report.records {
        csv.serialize(CsvRow::from(record))?;
    }
    csv.flush()?;
    Ok(())
}

/// Write `filename,only_in` rows for names missing from one side.
pub fn write_missing_csv<W: Write>(report: &ComparisonReport, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["filename", "only_in"])?;
    for name in &report.file_set.only_a {
        csv.write_record([name.as_str(), "a"])?;
    }
    for name in &report.file_set.only_b {
        csv.write_record([name.as_str(), "b"])?;
    }
    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::compare::fileset::FileSet;
    use crate::metrics::{MetricConfig, PairMetric};

    fn report() -> ComparisonReport {
        let file_set = FileSet::from_names(
            ["a.png", "b.gif", "only.png"].iter().map(|s| (*s).to_string()).collect(),
            ["a.png", "b.gif"].iter().map(|s| (*s).to_string()).collect(),
        );
        let mut a = ComparisonRecord::new("a.png", 2048, 1024);
        a.resolution_a = Some(Resolution::new(64, 64));
        a.resolution_b = Some(Resolution::new(64, 64));
        a.frame_count_a = Some(1);
        a.frame_count_b = Some(1);
        a.set_metric(PairMetric { psnr: Some(Psnr::Db(38.123)), ssim: Some(0.98765) });
        let mut b = ComparisonRecord::new("b.gif", 0, 10);
        b.set_error(ErrorKind::Decode, "truncated");

        ComparisonReport::new(
            PathBuf::from("dir_a"),
            PathBuf::from("dir_b"),
            MetricConfig::default(),
            file_set,
            vec![a, b],
        )
    }

    fn empty_report() -> ComparisonReport {
        ComparisonReport::new(
            PathBuf::from("a"),
            PathBuf::from("b"),
            MetricConfig::default(),
            FileSet::default(),
            Vec::new(),
        )
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0B");
        assert_eq!(format_size(512), "512.0B");
        assert_eq!(format_size(1536), "1.5KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0MB");
    }

    #[test]
    fn test_table() {
        let table = render_table(&report());
        assert!(table.contains("Only in A: only.png"));
        assert!(table.contains("Only in B: (none)"));
        assert!(table.contains("38.12"));
        assert!(table.contains("0.988"));
        assert!(table.contains("2.0KB"));
        assert!(table.contains("  ERROR: DecodeError: truncated"));
        assert!(table.contains("Comparable: 1  Errored: 1"));
    }

    #[test]
    fn test_json_always_has_name_sets() {
        let mut buf = Vec::new();
        write_json(&empty_report(), &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["file_set"]["only_a"], serde_json::json!([]));
        assert_eq!(value["file_set"]["only_b"], serde_json::json!([]));
        assert_eq!(value["summary"]["total_compared"], 0);
    }

    #[test]
    fn test_json_round_trip() {
        let original = report();
        let mut buf = Vec::new();
        write_json(&original, &mut buf).unwrap();
        let back: ComparisonReport = serde_json::from_slice(&buf).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_csv_rows() {
        let mut buf = Vec::new();
        write_csv(&report(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), CSV_COLUMNS.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "a.png,2048,1024,-1024,0.5,64x64,64x64,,,true,38.123,0.98765,1,1,,,1,"
        );
        assert_eq!(lines.next().unwrap(), "b.gif,0,10,10,,,,,,false,,,,,,,0,DecodeError");
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_csv_header_without_records() {
        let mut buf = Vec::new();
        write_csv(&empty_report(), &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().trim_end(), CSV_COLUMNS.join(","));
    }

    #[test]
    fn test_missing_csv() {
        let mut buf = Vec::new();
        write_missing_csv(&report(), &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "filename,only_in\nonly.png,a\n");

        let mut buf = Vec::new();
        write_missing_csv(&empty_report(), &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "filename,only_in\n");
    }
}
