//! Compare command.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use variant_eval::compare::render;
use variant_eval::{CompareConfig, Comparator, ComparisonReport, MetricConfig, SsimChannels, SsimWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WindowArg {
    /// 7x7 uniform window with sample covariance
    Uniform7,
    /// 11x11 Gaussian window, sigma 1.5
    Gaussian11,
}

impl From<WindowArg> for SsimWindow {
    fn from(w: WindowArg) -> Self {
        match w {
            WindowArg::Uniform7 => Self::Uniform7,
            WindowArg::Gaussian11 => Self::Gaussian11,
        }
    }
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Directory of originals
    pub dir_a: PathBuf,

    /// Directory of variations
    pub dir_b: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table, env = "VARIANT_EVAL_FORMAT")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Metric configuration (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// SSIM window (overrides the config file)
    #[arg(long, value_enum)]
    pub window: Option<WindowArg>,

    /// Compute SSIM on luma instead of per channel
    #[arg(long)]
    pub luma: bool,

    /// Compare files one at a time
    #[arg(long)]
    pub sequential: bool,
}

pub fn run(args: CompareArgs) -> Result<()> {
    let metrics = metric_config(&args)?;
    let config = CompareConfig::builder()
        .metrics(metrics)
        .parallel(!args.sequential)
        .build();

    let report = Comparator::new(config)
        .compare_dirs(&args.dir_a, &args.dir_b)
        .with_context(|| {
            format!(
                "Failed to compare {} with {}",
                args.dir_a.display(),
                args.dir_b.display()
            )
        })?;

    match &args.output {
        Some(path) => {
            write_report(&report, args.format, create(path)?)?;
            if args.format == OutputFormat::Csv {
                let missing = missing_path(path);
                render::write_missing_csv(&report, create(&missing)?)?;
                eprintln!("Missing files saved to: {}", missing.display());
            }
            eprintln!("Report saved to: {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            write_report(&report, args.format, &mut out)?;
            if args.format == OutputFormat::Csv {
                writeln!(out)?;
                render::write_missing_csv(&report, &mut out)?;
            }
        }
    }

    Ok(())
}

fn metric_config(args: &CompareArgs) -> Result<MetricConfig> {
    let mut metrics: MetricConfig = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("Invalid config: {}", path.display()))?
        }
        None => MetricConfig::default(),
    };
    if let Some(window) = args.window {
        metrics.ssim.window = window.into();
    }
    if args.luma {
        metrics.ssim.channels = SsimChannels::Luma;
    }
    Ok(metrics)
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn write_report<W: Write>(report: &ComparisonReport, format: OutputFormat, mut writer: W) -> Result<()> {
    match format {
        OutputFormat::Table => writer.write_all(render::render_table(report).as_bytes())?,
        OutputFormat::Json => render::write_json(report, &mut writer)?,
        OutputFormat::Csv => render::write_csv(report, &mut writer)?,
    }
    writer.flush()?;
    Ok(())
}

/// `report.csv` -> `report.missing.csv`, next to the report.
fn missing_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map_or_else(|| "report".into(), |s| s.to_string_lossy().into_owned());
    output.with_file_name(format!("{stem}.missing.csv"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(config: Option<PathBuf>) -> CompareArgs {
        CompareArgs {
            dir_a: PathBuf::from("a"),
            dir_b: PathBuf::from("b"),
            format: OutputFormat::Table,
            output: None,
            config,
            window: None,
            luma: false,
            sequential: false,
        }
    }

    #[test]
    fn test_missing_path() {
        assert_eq!(
            missing_path(Path::new("out/report.csv")),
            PathBuf::from("out/report.missing.csv")
        );
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        std::fs::write(&path, r#"{"ssim": {"window": "gaussian11"}}"#).unwrap();

        let loaded = metric_config(&args(Some(path.clone()))).unwrap();
        assert_eq!(loaded.ssim.window, SsimWindow::Gaussian11);

        let mut overridden = args(Some(path));
        overridden.window = Some(WindowArg::Uniform7);
        overridden.luma = true;
        let metrics = metric_config(&overridden).unwrap();
        assert_eq!(metrics.ssim.window, SsimWindow::Uniform7);
        assert_eq!(metrics.ssim.channels, SsimChannels::Luma);
    }

    #[test]
    fn test_csv_output_writes_missing_file() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        std::fs::write(a.path().join("only.png"), b"x").unwrap();
        let out = tempfile::tempdir().unwrap();
        let report = out.path().join("report.csv");

        let mut cli_args = args(None);
        cli_args.dir_a = a.path().to_path_buf();
        cli_args.dir_b = b.path().to_path_buf();
        cli_args.format = OutputFormat::Csv;
        cli_args.output = Some(report.clone());
        run(cli_args).unwrap();

        assert!(report.exists());
        let missing = std::fs::read_to_string(out.path().join("report.missing.csv")).unwrap();
        assert_eq!(missing, "filename,only_in\nonly.png,a\n");
    }
}
