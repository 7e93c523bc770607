//! # variant-eval
//!
//! Quality comparison of image variations across two directories.
//!
//! Given a directory of originals and a directory of variations (re-encodes,
//! resizes, transcodes), files are matched by name and each pair is scored
//! with PSNR and SSIM. Animated GIF, APNG and WebP files are compared frame
//! by frame and scored by their worst frame.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use variant_eval::{CompareConfig, Comparator, MetricConfig};
//!
//! let config = CompareConfig::builder()
//!     .metrics(MetricConfig::default())
//!     .parallel(true)
//!     .build();
//!
//! let report = Comparator::new(config).compare_dirs(Path::new("originals"), Path::new("variants"))?;
//! for record in &report.records {
//!     println!("{}: {:?}", record.filename, record.metric.psnr);
//! }
//! # Ok::<(), variant_eval::Error>(())
//! ```
//!
//! ## Modules
//!
//! - [`error`]: Error types for the library
//! - [`container`]: Container sniffing and frame metadata
//! - [`decode`]: Decoder trait, pixel buffers and file descriptors
//! - [`metrics`]: PSNR and SSIM
//! - [`animation`]: Frame sequences, alignment and worst-case metrics
//! - [`compare`]: File matching, comparison session and report output
//! - [`stats`]: Descriptive statistics

pub mod animation;
pub mod compare;
pub mod container;
pub mod decode;
pub mod error;
pub mod metrics;
pub mod stats;

// Re-export commonly used types
pub use compare::{
    CompareConfig, Comparator, ComparisonRecord, ComparisonReport, FileSet, ReportSummary, Resolution,
};
pub use decode::{ColorMode, Decoded, Decoder, ImageDescriptor, PixelBuffer, StandardDecoder};
pub use error::{Error, ErrorKind, Result};
pub use metrics::{MetricConfig, PairMetric, Psnr, PsnrPeak, SsimChannels, SsimConfig, SsimWindow};
pub use stats::Summary;
