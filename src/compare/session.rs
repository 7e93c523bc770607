//! Directory comparison session.
//!
//! [`Comparator`] is the main entry point. It matches files between two
//! directories, decodes each common pair through a [`Decoder`], computes
//! metrics and collects one [`ComparisonRecord`] per name. A file that fails
//! to decode or compare is recorded with an error; it never aborts the batch.

use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::fileset;
use super::report::{ComparisonRecord, ComparisonReport, Resolution};
use crate::animation::compare_sequences;
use crate::decode::{Decoded, Decoder, StandardDecoder, StaticImage};
use crate::error::{ErrorKind, Result};
use crate::metrics::{MetricConfig, compare_buffers};

/// Configuration for a comparison run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareConfig {
    /// Metric settings.
    pub metrics: MetricConfig,
    /// Compare files on the rayon thread pool.
    pub parallel: bool,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            metrics: MetricConfig::default(),
            parallel: true,
        }
    }
}

impl CompareConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> CompareConfigBuilder {
        CompareConfigBuilder::default()
    }
}

/// Builder for [`CompareConfig`].
#[derive(Debug, Default)]
pub struct CompareConfigBuilder {
    metrics: Option<MetricConfig>,
    parallel: Option<bool>,
}

impl CompareConfigBuilder {
    /// Set the metric configuration.
    #[must_use]
    pub fn metrics(mut self, metrics: MetricConfig) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Enable or disable parallel comparison.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> CompareConfig {
        CompareConfig {
            metrics: self.metrics.unwrap_or_default(),
            parallel: self.parallel.unwrap_or(true),
        }
    }
}

/// Compares same-named files across two directories.
pub struct Comparator {
    config: CompareConfig,
    decoder: Box<dyn Decoder>,
}

impl Comparator {
    /// Create a comparator using the [`StandardDecoder`].
    #[must_use]
    pub fn new(config: CompareConfig) -> Self {
        Self {
            config,
            decoder: Box::new(StandardDecoder),
        }
    }

    /// Replace the decoder backend.
    #[must_use]
    pub fn with_decoder(mut self, decoder: Box<dyn Decoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    /// Compare every file name present in both directories.
    ///
    /// Fails only when a directory cannot be listed. Records are in
    /// lexicographic file name order whether or not the run is parallel.
    #[tracing::instrument(skip_all, fields(dir_a = %dir_a.display(), dir_b = %dir_b.display()))]
    pub fn compare_dirs(&self, dir_a: &Path, dir_b: &Path) -> Result<ComparisonReport> {
        let file_set = fileset::resolve(dir_a, dir_b)?;
        let names: Vec<&String> = file_set.common.iter().collect();

        let compare = |name: &&String| self.compare_pair(name, &dir_a.join(name), &dir_b.join(name));
        let records: Vec<ComparisonRecord> = if self.config.parallel {
            names.par_iter().map(compare).collect()
        } else {
            names.iter().map(compare).collect()
        };

        let report = ComparisonReport::new(
            dir_a.to_path_buf(),
            dir_b.to_path_buf(),
            self.config.metrics,
            file_set,
            records,
        );
        tracing::info!(
            compared = report.summary.total_compared,
            comparable = report.summary.total_comparable,
            errored = report.summary.total_errored,
            only_a = report.summary.total_only_a,
            only_b = report.summary.total_only_b,
            "comparison finished"
        );
        Ok(report)
    }

    /// Compare one pair of files.
    ///
    /// Never fails: problems are captured in the record's `error`.
    pub fn compare_pair(&self, name: &str, path_a: &Path, path_b: &Path) -> ComparisonRecord {
        let mut record = ComparisonRecord::new(name, file_size(path_a), file_size(path_b));

        let decoded_a = self.decoder.open(path_a);
        let decoded_b = self.decoder.open(path_b);
        if let Ok(a) = &decoded_a {
            record.format_a = Some(a.format());
        }
        if let Ok(b) = &decoded_b {
            record.format_b = Some(b.format());
        }

        let outcome = match (decoded_a, decoded_b) {
            (Ok(Decoded::Static(a)), Ok(Decoded::Static(b))) => self.compare_static(&mut record, &a, &b),
            (Ok(a), Ok(b)) => self.compare_animated(&mut record, a, b),
            (Err(err), _) | (_, Err(err)) => Err(err),
        };

        if let Err(err) = outcome {
            tracing::debug!(file = name, error = %err, "not comparable");
            record.set_error(err.kind().unwrap_or(ErrorKind::Decode), err.to_string());
        }
        record
    }

    fn compare_static(&self, record: &mut ComparisonRecord, a: &StaticImage, b: &StaticImage) -> Result<()> {
        record.resolution_a = Some(Resolution::new(a.pixels.width(), a.pixels.height()));
        record.resolution_b = Some(Resolution::new(b.pixels.width(), b.pixels.height()));
        record.mode_a = Some(a.pixels.mode());
        record.mode_b = Some(b.pixels.mode());
        record.frame_count_a = Some(1);
        record.frame_count_b = Some(1);

        let metric = compare_buffers(&a.pixels, &b.pixels, &self.config.metrics)?;
        record.frames_compared = 1;
        record.set_metric(metric);
        Ok(())
    }

    fn compare_animated(&self, record: &mut ComparisonRecord, a: Decoded, b: Decoded) -> Result<()> {
        let outcome = compare_sequences(a.into_sequence(), b.into_sequence(), &self.config.metrics)?;

        if let Some((shape_a, shape_b)) = outcome.first_shapes {
            record.resolution_a = Some(Resolution::new(shape_a.width, shape_a.height));
            record.resolution_b = Some(Resolution::new(shape_b.width, shape_b.height));
            record.mode_a = Some(shape_a.mode);
            record.mode_b = Some(shape_b.mode);
        }
        record.frame_count_a = Some(outcome.a.frame_count);
        record.frame_count_b = Some(outcome.b.frame_count);
        record.fps_a = outcome.a.fps;
        record.fps_b = outcome.b.fps;
        record.loop_count_a = outcome.a.loop_count;
        record.loop_count_b = outcome.b.loop_count;
        record.frames_compared = outcome.frames_compared;
        record.frame_stats = Some(outcome.frame_stats);

        if record.frame_count_mismatch() {
            tracing::debug!(
                file = %record.filename,
                frames_a = outcome.a.frame_count,
                frames_b = outcome.b.frame_count,
                "frame counts differ"
            );
        }

        record.set_metric(outcome.metric?);
        Ok(())
    }
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

impl std::fmt::Debug for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Comparator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
