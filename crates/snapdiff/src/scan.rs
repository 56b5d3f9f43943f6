//! Snapshot directory listing and baseline/candidate classification.

use crate::{Error, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Lists the `.png` files directly inside `dir`, sorted by name.
///
/// Subdirectories are not descended into, and names that are not valid UTF-8 are skipped.
pub fn list_pngs(dir: &Path) -> Result<Vec<String>> {
    let read_dir_err = |source| Error::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_err)? {
        let entry = entry.map_err(read_dir_err)?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !name.ends_with(".png") || !entry.path().is_file() {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// In the baseline but not among the candidates.
    pub missing: Vec<String>,
    /// Among the candidates but not in the baseline.
    pub added: Vec<String>,
    /// Present on both sides, in baseline order.
    pub common: Vec<String>,
}

pub fn classify(baseline: &[String], candidate: &[String]) -> Classification {
    let baseline_set: BTreeSet<&str> = baseline.iter().map(String::as_str).collect();
    let candidate_set: BTreeSet<&str> = candidate.iter().map(String::as_str).collect();

    let (common, missing): (Vec<String>, Vec<String>) = baseline
        .iter()
        .cloned()
        .partition(|name| candidate_set.contains(name.as_str()));
    let added: Vec<String> = candidate
        .iter()
        .filter(|name| !baseline_set.contains(name.as_str()))
        .cloned()
        .collect();

    Classification {
        missing,
        added,
        common,
    }
}
