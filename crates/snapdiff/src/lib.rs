#![forbid(unsafe_code)]

//! `snapdiff` is a headless visual regression checker.
//!
//! It compares a directory of baseline PNG screenshots against a directory of freshly captured
//! ones, writes a diff image for every mismatching pair and emits a Markdown report with the
//! three images embedded as data URIs.
//!
//! The pieces can be used on their own:
//! - [`compare::compare_screenshots`] / [`compare::compare_images`] for a single pair
//! - [`pixelmatch::pixelmatch`] for raw RGBA buffers of equal size
//! - [`run::run`] for a whole directory pass

pub mod compare;
pub mod error;
pub mod fit;
pub mod pixelmatch;
pub mod report;
pub mod run;
pub mod scan;

pub use compare::{CompareOptions, Comparison, compare_images, compare_screenshots};
pub use error::{Error, Result};
pub use report::{NO_DIFF_MESSAGE, Report};
pub use run::{Mismatch, RunConfig, RunSummary, run};

/// Baseline screenshots (the accepted reference state).
pub const BASELINE_DIR_NAME: &str = "imageSnapshots-master";
/// Freshly captured screenshots under validation.
pub const CANDIDATE_DIR_NAME: &str = "imageSnapshots";
/// Output directory for diff images; created when absent.
pub const DIFF_DIR_NAME: &str = "imageDiffSnapshots";
pub const REPORT_FILE_NAME: &str = "visual-regression-report.md";

/// Per-pixel color tolerance in `[0, 1]`; smaller is stricter.
pub const DEFAULT_THRESHOLD: f64 = 0.1;
