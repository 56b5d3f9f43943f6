//! Markdown report with the baseline, candidate and diff images embedded as data URIs.

use crate::{Error, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Report content when no image mismatched.
pub const NO_DIFF_MESSAGE: &str = "No visual diff differences have been found";

const TABLE_HEADER: &str = "| image_name | expected | actual | diff |\n| --- | --- | --- | --- |";

#[derive(Debug, Clone, Default)]
pub struct Report {
    rows: Vec<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row for a mismatching image. The three byte slices are the PNG files as stored
    /// on disk.
    pub fn push_row(&mut self, name: &str, baseline: &[u8], candidate: &[u8], diff: &[u8]) {
        let row = [
            name.to_string(),
            format!("![master ref]({})", png_data_uri(baseline)),
            format!("![pr commit-id]({})", png_data_uri(candidate)),
            format!("![diff]({})", png_data_uri(diff)),
        ]
        .join(" | ");
        self.rows.push(format!("| {row} |"));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders the table, or [`NO_DIFF_MESSAGE`] when no row was pushed.
    pub fn render(&self) -> String {
        if self.rows.is_empty() {
            return NO_DIFF_MESSAGE.to_string();
        }

        let mut out = String::from(TABLE_HEADER);
        for row in &self.rows {
            let _ = write!(&mut out, "\n{row}");
        }
        out
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render()).map_err(|source| Error::WriteFile {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn png_data_uri(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
}
