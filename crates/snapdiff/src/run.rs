//! One visual regression pass over the baseline and candidate snapshot directories.

use crate::compare::{CompareOptions, compare_screenshots};
use crate::report::Report;
use crate::scan::{self, Classification};
use crate::{
    BASELINE_DIR_NAME, CANDIDATE_DIR_NAME, DIFF_DIR_NAME, Error, REPORT_FILE_NAME, Result,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub baseline_dir: PathBuf,
    pub candidate_dir: PathBuf,
    pub diff_dir: PathBuf,
    pub report_path: PathBuf,
    pub compare: CompareOptions,
}

impl RunConfig {
    /// The standard layout: the three snapshot directories and the report side by side under
    /// `root`.
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            baseline_dir: root.join(BASELINE_DIR_NAME),
            candidate_dir: root.join(CANDIDATE_DIR_NAME),
            diff_dir: root.join(DIFF_DIR_NAME),
            report_path: root.join(REPORT_FILE_NAME),
            compare: CompareOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub name: String,
    pub percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub missing: Vec<String>,
    pub added: Vec<String>,
    pub passed: Vec<String>,
    pub mismatched: Vec<Mismatch>,
    /// Listed as candidates but gone by the time they were compared.
    pub skipped: Vec<String>,
    pub report_path: PathBuf,
}

impl RunSummary {
    pub fn has_differences(&self) -> bool {
        !self.mismatched.is_empty()
    }
}

/// Compares every baseline snapshot with its candidate and writes the report.
///
/// Only names present in both listings are compared, in baseline order. A candidate that is
/// no longer a regular file at comparison time is logged and skipped; any other failure
/// (unreadable or undecodable image, failed write) aborts the pass.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    tracing::info!(
        "Checking image snapshots against baseline {}",
        config.baseline_dir.display()
    );

    let baseline = scan::list_pngs(&config.baseline_dir)?;
    let candidate = scan::list_pngs(&config.candidate_dir)?;

    let Classification {
        missing,
        added,
        common,
    } = scan::classify(&baseline, &candidate);
    if !missing.is_empty() {
        tracing::error!("Missing images compared to baseline:\n{}", pretty_list(&missing));
    }
    if !added.is_empty() {
        tracing::info!("Added images:\n{}", pretty_list(&added));
    }

    fs::create_dir_all(&config.diff_dir).map_err(|source| Error::CreateDir {
        path: config.diff_dir.clone(),
        source,
    })?;

    for name in &missing {
        tracing::error!("Missing image: {name}");
    }

    let mut skipped = Vec::new();
    let mut passed = Vec::new();
    let mut mismatched = Vec::new();
    let mut report = Report::new();

    for name in &common {
        let baseline_path = config.baseline_dir.join(name);
        let candidate_path = config.candidate_dir.join(name);
        let diff_path = config.diff_dir.join(name);

        if !candidate_path.is_file() {
            tracing::error!("Missing image: {name}");
            skipped.push(name.clone());
            continue;
        }

        let percent =
            compare_screenshots(&baseline_path, &candidate_path, &diff_path, &config.compare)?;

        if percent > 0.0 {
            tracing::warn!("Mismatched pixels for: {name} {percent:.2}%");
            report.push_row(
                name,
                &read_file(&baseline_path)?,
                &read_file(&candidate_path)?,
                &read_file(&diff_path)?,
            );
            mismatched.push(Mismatch {
                name: name.clone(),
                percent,
            });
        } else {
            tracing::info!("Passed for: {name}");
            passed.push(name.clone());
        }
    }

    report.write(&config.report_path)?;
    tracing::info!(
        rows = report.len(),
        passed = passed.len(),
        "Report written to {}",
        config.report_path.display()
    );

    Ok(RunSummary {
        missing,
        added,
        passed,
        mismatched,
        skipped,
        report_path: config.report_path.clone(),
    })
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

fn pretty_list(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!(" * {name}"))
        .collect::<Vec<_>>()
        .join("\n")
}
