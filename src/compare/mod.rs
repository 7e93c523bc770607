//! Directory-to-directory comparison.
//!
//! - [`fileset`]: Matching file names between two directories
//! - [`session`]: The [`Comparator`] that produces a report
//! - [`report`]: Report data model
//! - [`render`]: Table, JSON and CSV output

pub mod fileset;
pub mod render;
pub mod report;
pub mod session;

pub use fileset::{FileSet, resolve};
pub use report::{ComparisonRecord, ComparisonReport, ReportSummary, Resolution};
pub use session::{CompareConfig, CompareConfigBuilder, Comparator};
