use crate::fit::{TRANSPARENT_WHITE, fit_contain};
use crate::pixelmatch::{MatchOptions, pixelmatch};
use crate::{Error, Result};
use image::{ImageFormat, ImageReader, Rgba, RgbaImage};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompareOptions {
    pub matching: MatchOptions,
    /// Fill color for the area a resized candidate does not cover.
    pub padding: Rgba<u8>,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            matching: MatchOptions::default(),
            padding: TRANSPARENT_WHITE,
        }
    }
}

impl CompareOptions {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.matching.threshold = threshold;
        self
    }
}

/// Outcome of comparing a candidate image against a baseline.
#[derive(Debug, Clone)]
pub struct Comparison {
    /// Baseline width; the candidate is fitted to it before matching.
    pub width: u32,
    pub height: u32,
    pub mismatched: u64,
    pub diff: RgbaImage,
}

impl Comparison {
    /// Share of mismatched pixels relative to the baseline area, in `[0, 100]`.
    pub fn mismatch_percent(&self) -> f64 {
        let total = f64::from(self.width) * f64::from(self.height);
        self.mismatched as f64 / total * 100.0
    }

    pub fn is_match(&self) -> bool {
        self.mismatched == 0
    }
}

/// Compares two decoded images.
///
/// The candidate is fitted into the baseline dimensions first (see [`fit_contain`]), so images
/// of different sizes can still be compared.
pub fn compare_images(
    baseline: &RgbaImage,
    candidate: &RgbaImage,
    options: &CompareOptions,
) -> Result<Comparison> {
    let (width, height) = baseline.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::EmptyImage { width, height });
    }

    let candidate = fit_contain(candidate, width, height, options.padding);
    let mut diff = RgbaImage::new(width, height);
    let mismatched = pixelmatch(
        baseline.as_raw(),
        candidate.as_raw(),
        Some(&mut *diff),
        width,
        height,
        &options.matching,
    )?;

    Ok(Comparison {
        width,
        height,
        mismatched,
        diff,
    })
}

/// Compares the PNG at `candidate_path` against the one at `baseline_path` and returns the
/// mismatch percentage.
///
/// A diff image is written to `diff_path` only when at least one pixel mismatches.
pub fn compare_screenshots(
    baseline_path: &Path,
    candidate_path: &Path,
    diff_path: &Path,
    options: &CompareOptions,
) -> Result<f64> {
    let baseline = decode_rgba(baseline_path)?;
    let candidate = decode_rgba(candidate_path)?;

    let comparison = compare_images(&baseline, &candidate, options)?;
    if !comparison.is_match() {
        comparison
            .diff
            .save_with_format(diff_path, ImageFormat::Png)
            .map_err(|source| Error::Encode {
                path: diff_path.to_path_buf(),
                source,
            })?;
    }

    Ok(comparison.mismatch_percent())
}

pub fn decode_rgba(path: &Path) -> Result<RgbaImage> {
    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
    let image = reader.decode().map_err(|source| Error::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgba8())
}
