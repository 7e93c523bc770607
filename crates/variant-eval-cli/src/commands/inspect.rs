//! Inspect command.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ValueEnum;
use rayon::prelude::*;
use serde::Serialize;
use variant_eval::compare::{fileset, render::format_size};
use variant_eval::stats::Summary;
use variant_eval::ImageDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InspectFormat {
    Table,
    Json,
}

#[derive(Debug, Serialize)]
struct Entry {
    filename: String,
    descriptor: Option<ImageDescriptor>,
    megapixels: Option<f64>,
    bits_per_pixel: Option<u32>,
    /// Decoded frame size over file size.
    compression_ratio: Option<f64>,
    error: Option<String>,
}

impl Entry {
    fn described(filename: String, descriptor: ImageDescriptor) -> Self {
        Self {
            filename,
            megapixels: Some(descriptor.megapixels()),
            bits_per_pixel: descriptor.bits_per_pixel(),
            compression_ratio: descriptor.compression_ratio(),
            descriptor: Some(descriptor),
            error: None,
        }
    }

    fn failed(filename: String, error: String) -> Self {
        Self {
            filename,
            descriptor: None,
            megapixels: None,
            bits_per_pixel: None,
            compression_ratio: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize)]
struct InspectReport {
    directory: PathBuf,
    total: usize,
    errors: usize,
    /// File sizes in bytes over successfully described files.
    byte_size: Option<Summary>,
    megapixels: Option<Summary>,
    /// Over files whose color mode is known.
    compression_ratio: Option<Summary>,
    entries: Vec<Entry>,
}

pub fn run(dir: PathBuf, format: InspectFormat, output: Option<PathBuf>) -> Result<()> {
    let report = inspect(dir)?;

    let mut writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    match format {
        InspectFormat::Table => writer.write_all(render_table(&report).as_bytes())?,
        InspectFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, &report)?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;

    if let Some(path) = output {
        eprintln!("Analysis saved to: {}", path.display());
    }
    Ok(())
}

fn inspect(dir: PathBuf) -> Result<InspectReport> {
    let names = fileset::list_files(&dir).with_context(|| format!("Failed to list {}", dir.display()))?;
    let names: Vec<String> = names.into_iter().collect();
    tracing::info!(dir = %dir.display(), files = names.len(), "inspecting");

    let entries: Vec<Entry> = names
        .into_par_iter()
        .map(|filename| match ImageDescriptor::read(&dir.join(&filename)) {
            Ok(descriptor) => Entry::described(filename, descriptor),
            Err(e) => Entry::failed(filename, e.to_string()),
        })
        .collect();

    let sizes: Vec<f64> = entries
        .iter()
        .filter_map(|e| e.descriptor.as_ref())
        .map(|d| d.byte_size as f64)
        .collect();
    let megapixels: Vec<f64> = entries.iter().filter_map(|e| e.megapixels).collect();
    let ratios: Vec<f64> = entries.iter().filter_map(|e| e.compression_ratio).collect();

    Ok(InspectReport {
        directory: dir,
        total: entries.len(),
        errors: entries.iter().filter(|e| e.error.is_some()).count(),
        byte_size: Summary::compute(&sizes),
        megapixels: Summary::compute(&megapixels),
        compression_ratio: Summary::compute(&ratios),
        entries,
    })
}

fn render_table(report: &InspectReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<30} {:<10} {:<11} {:<8} {:<6} {:<7} {:<7}\n",
        "Filename", "Size", "Resolution", "Mode", "Format", "Frames", "FPS"
    ));
    out.push_str(&format!("{:-<83}\n", ""));

    for entry in &report.entries {
        let name: String = entry.filename.chars().take(29).collect();
        match (&entry.descriptor, &entry.error) {
            (Some(d), _) => {
                let mode = d.color_mode.map_or_else(|| "N/A".to_string(), |m| m.to_string());
                let fps = d.fps.map_or_else(|| "N/A".to_string(), |f| format!("{f:.1}"));
                out.push_str(&format!(
                    "{name:<30} {:<10} {:<11} {mode:<8} {:<6} {:<7} {fps:<7}\n",
                    format_size(d.byte_size),
                    d.resolution(),
                    d.format.to_string(),
                    d.frame_count,
                ));
            }
            (None, error) => {
                out.push_str(&format!("{name:<30} ERROR: {}\n", error.as_deref().unwrap_or("unknown")));
            }
        }
    }

    out.push('\n');
    out.push_str("QUALITY ANALYSIS SUMMARY\n");
    out.push_str(&format!("{:=<50}\n", ""));
    out.push_str(&format!("Total images analyzed: {}\n", report.total));
    out.push_str(&format!("Successful analyses: {}\n", report.total - report.errors));
    out.push_str(&format!("Errors: {}\n", report.errors));
    if let Some(s) = &report.byte_size {
        out.push_str("\nFile size statistics:\n");
        out.push_str(&format!("  Mean: {}\n", format_size(s.mean as u64)));
        out.push_str(&format!("  Min: {}\n", format_size(s.min as u64)));
        out.push_str(&format!("  Max: {}\n", format_size(s.max as u64)));
    }
    if let Some(s) = &report.megapixels {
        out.push_str("\nResolution statistics:\n");
        out.push_str(&format!("  Mean megapixels: {:.2}\n", s.mean));
        out.push_str(&format!("  Min megapixels: {:.2}\n", s.min));
        out.push_str(&format!("  Max megapixels: {:.2}\n", s.max));
    }
    if let Some(s) = &report.compression_ratio {
        out.push_str("\nCompression ratio statistics:\n");
        out.push_str(&format!("  Mean: {:.2}x\n", s.mean));
        out.push_str(&format!("  Min: {:.2}x\n", s.min));
        out.push_str(&format!("  Max: {:.2}x\n", s.max));
    }
    out
}
