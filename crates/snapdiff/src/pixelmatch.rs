//! Per-pixel comparison of two RGBA8 buffers (a port of the `pixelmatch` algorithm).
//!
//! Colors are compared in YIQ space after blending each pixel over white. Pixels that differ
//! only because of anti-aliasing along an edge in either image are painted with a separate
//! color and are not counted as mismatches.

use crate::{DEFAULT_THRESHOLD, Error, Result};

/// Squared YIQ distance between the two most distant colors; scaled by `threshold^2`.
const MAX_YIQ_DELTA: f64 = 35215.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    /// Matching threshold in `[0, 1]`; smaller values make the comparison more sensitive.
    pub threshold: f64,
    /// Count anti-aliased pixels as mismatches instead of ignoring them.
    pub include_anti_aliasing: bool,
    /// Opacity of the baseline image drawn underneath the diff.
    pub alpha: f64,
    pub anti_aliasing_color: [u8; 3],
    pub diff_color: [u8; 3],
    /// Color for pixels that got darker; `diff_color` is used for both directions when unset.
    pub diff_color_alt: Option<[u8; 3]>,
    /// Draw only the differing pixels on a transparent background.
    pub diff_mask: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            include_anti_aliasing: false,
            alpha: 0.1,
            anti_aliasing_color: [255, 255, 0],
            diff_color: [255, 0, 0],
            diff_color_alt: None,
            diff_mask: false,
        }
    }
}

/// Compares `img1` and `img2` (both `width * height` RGBA8 pixels) and returns the number of
/// mismatched pixels.
///
/// When `output` is provided it receives the diff visualization and must have the same size as
/// the inputs.
pub fn pixelmatch(
    img1: &[u8],
    img2: &[u8],
    mut output: Option<&mut [u8]>,
    width: u32,
    height: u32,
    options: &MatchOptions,
) -> Result<u64> {
    if !(0.0..=1.0).contains(&options.threshold) {
        return Err(Error::InvalidThreshold(options.threshold));
    }

    let expected = (width as usize) * (height as usize) * 4;
    let output_len = output.as_deref().map(<[u8]>::len);
    for actual in [Some(img1.len()), Some(img2.len()), output_len]
        .into_iter()
        .flatten()
    {
        if actual != expected {
            return Err(Error::BufferSize { expected, actual });
        }
    }

    if img1 == img2 {
        if let Some(out) = output.as_deref_mut() {
            if !options.diff_mask {
                for pos in (0..expected).step_by(4) {
                    draw_gray_pixel(img1, pos, options.alpha, out);
                }
            }
        }
        return Ok(0);
    }

    let max_delta = MAX_YIQ_DELTA * options.threshold * options.threshold;
    let mut mismatched = 0u64;

    for y in 0..height {
        for x in 0..width {
            let pos = pixel_offset(x, y, width);
            let delta = color_delta(img1, img2, pos, pos, false);

            if delta.abs() > max_delta {
                let anti_aliased = !options.include_anti_aliasing
                    && (antialiased(img1, x, y, width, height, img2)
                        || antialiased(img2, x, y, width, height, img1));
                if anti_aliased {
                    if let Some(out) = output.as_deref_mut() {
                        if !options.diff_mask {
                            draw_pixel(out, pos, options.anti_aliasing_color);
                        }
                    }
                } else {
                    if let Some(out) = output.as_deref_mut() {
                        let color = match options.diff_color_alt {
                            Some(alt) if delta < 0.0 => alt,
                            _ => options.diff_color,
                        };
                        draw_pixel(out, pos, color);
                    }
                    mismatched += 1;
                }
            } else if let Some(out) = output.as_deref_mut() {
                if !options.diff_mask {
                    draw_gray_pixel(img1, pos, options.alpha, out);
                }
            }
        }
    }

    Ok(mismatched)
}

/// Checks whether the pixel at `(x1, y1)` sits on an anti-aliased edge: it must have both a
/// darker and a brighter neighbor, and one of those must lie in a flat region of both images.
fn antialiased(img: &[u8], x1: u32, y1: u32, width: u32, height: u32, other: &[u8]) -> bool {
    let x0 = x1.saturating_sub(1);
    let y0 = y1.saturating_sub(1);
    let x2 = (x1 + 1).min(width - 1);
    let y2 = (y1 + 1).min(height - 1);
    let pos = pixel_offset(x1, y1, width);

    let mut zeroes = u32::from(x1 == x0 || x1 == x2 || y1 == y0 || y1 == y2);
    let mut min = 0.0;
    let mut max = 0.0;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (0, 0, 0, 0);

    for x in x0..=x2 {
        for y in y0..=y2 {
            if x == x1 && y == y1 {
                continue;
            }

            let delta = color_delta(img, img, pos, pixel_offset(x, y, width), true);
            if delta == 0.0 {
                zeroes += 1;
                if zeroes > 2 {
                    return false;
                }
            } else if delta < min {
                min = delta;
                min_x = x;
                min_y = y;
            } else if delta > max {
                max = delta;
                max_x = x;
                max_y = y;
            }
        }
    }

    if min == 0.0 || max == 0.0 {
        return false;
    }

    (has_many_siblings(img, min_x, min_y, width, height)
        && has_many_siblings(other, min_x, min_y, width, height))
        || (has_many_siblings(img, max_x, max_y, width, height)
            && has_many_siblings(other, max_x, max_y, width, height))
}

/// Checks whether a pixel has more than two identical neighbors.
fn has_many_siblings(img: &[u8], x1: u32, y1: u32, width: u32, height: u32) -> bool {
    let x0 = x1.saturating_sub(1);
    let y0 = y1.saturating_sub(1);
    let x2 = (x1 + 1).min(width - 1);
    let y2 = (y1 + 1).min(height - 1);
    let pos = pixel_offset(x1, y1, width);
    let pixel = &img[pos..pos + 4];

    let mut zeroes = u32::from(x1 == x0 || x1 == x2 || y1 == y0 || y1 == y2);

    for x in x0..=x2 {
        for y in y0..=y2 {
            if x == x1 && y == y1 {
                continue;
            }
            let other = pixel_offset(x, y, width);
            if pixel == &img[other..other + 4] {
                zeroes += 1;
            }
            if zeroes > 2 {
                return true;
            }
        }
    }

    false
}

/// Squared YIQ distance between the pixel at `k` in `img1` and the pixel at `m` in `img2`.
///
/// The sign tells which pixel is brighter (negative when `img1` is). With `y_only` only the
/// signed luma difference is returned.
fn color_delta(img1: &[u8], img2: &[u8], k: usize, m: usize, y_only: bool) -> f64 {
    let [r1, g1, b1, a1] = channels(img1, k);
    let [r2, g2, b2, a2] = channels(img2, m);

    if a1 == a2 && r1 == r2 && g1 == g2 && b1 == b2 {
        return 0.0;
    }

    let (r1, g1, b1) = blend_over_white(r1, g1, b1, a1);
    let (r2, g2, b2) = blend_over_white(r2, g2, b2, a2);

    let y1 = rgb2y(r1, g1, b1);
    let y2 = rgb2y(r2, g2, b2);
    let y = y1 - y2;

    if y_only {
        return y;
    }

    let i = rgb2i(r1, g1, b1) - rgb2i(r2, g2, b2);
    let q = rgb2q(r1, g1, b1) - rgb2q(r2, g2, b2);

    let delta = 0.5053 * y * y + 0.299 * i * i + 0.1957 * q * q;
    if y1 > y2 { -delta } else { delta }
}

fn channels(img: &[u8], pos: usize) -> [f64; 4] {
    [
        f64::from(img[pos]),
        f64::from(img[pos + 1]),
        f64::from(img[pos + 2]),
        f64::from(img[pos + 3]),
    ]
}

fn blend_over_white(r: f64, g: f64, b: f64, a: f64) -> (f64, f64, f64) {
    if a < 255.0 {
        let a = a / 255.0;
        (blend(r, a), blend(g, a), blend(b, a))
    } else {
        (r, g, b)
    }
}

fn rgb2y(r: f64, g: f64, b: f64) -> f64 {
    r * 0.29889531 + g * 0.58662247 + b * 0.11448223
}

fn rgb2i(r: f64, g: f64, b: f64) -> f64 {
    r * 0.59597799 - g * 0.27417610 - b * 0.32180189
}

fn rgb2q(r: f64, g: f64, b: f64) -> f64 {
    r * 0.21147017 - g * 0.52261711 + b * 0.31114694
}

fn blend(c: f64, a: f64) -> f64 {
    255.0 + (c - 255.0) * a
}

fn pixel_offset(x: u32, y: u32, width: u32) -> usize {
    ((y as usize) * (width as usize) + (x as usize)) * 4
}

fn draw_pixel(output: &mut [u8], pos: usize, [r, g, b]: [u8; 3]) {
    output[pos] = r;
    output[pos + 1] = g;
    output[pos + 2] = b;
    output[pos + 3] = 255;
}

fn draw_gray_pixel(img: &[u8], pos: usize, alpha: f64, output: &mut [u8]) {
    let [r, g, b, a] = channels(img, pos);
    let value = blend(rgb2y(r, g, b), alpha * a / 255.0) as u8;
    draw_pixel(output, pos, [value, value, value]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        rgba.repeat((width * height) as usize)
    }

    fn set_pixel(buf: &mut [u8], width: u32, x: u32, y: u32, rgba: [u8; 4]) {
        let pos = pixel_offset(x, y, width);
        buf[pos..pos + 4].copy_from_slice(&rgba);
    }

    /// Two black columns, a gray column, two white columns.
    fn edge_image() -> Vec<u8> {
        let mut buf = solid(5, 5, [0, 0, 0, 255]);
        for y in 0..5 {
            set_pixel(&mut buf, 5, 2, y, [128, 128, 128, 255]);
            set_pixel(&mut buf, 5, 3, y, [255, 255, 255, 255]);
            set_pixel(&mut buf, 5, 4, y, [255, 255, 255, 255]);
        }
        buf
    }

    #[test]
    fn identical_buffers_have_no_mismatch_and_fade_the_baseline() {
        let img = solid(3, 2, [200, 10, 10, 255]);
        let mut out = vec![0u8; img.len()];
        let n = pixelmatch(
            &img,
            &img,
            Some(out.as_mut_slice()),
            3,
            2,
            &MatchOptions::default(),
        )
        .unwrap();
        assert_eq!(n, 0);

        let gray = blend(rgb2y(200.0, 10.0, 10.0), 0.1) as u8;
        assert_eq!(&out[0..4], &[gray, gray, gray, 255]);
        assert!(gray > 200, "faded pixel should be close to white, got {gray}");
    }

    #[test]
    fn black_against_white_counts_every_pixel() {
        let black = solid(4, 4, [0, 0, 0, 255]);
        let white = solid(4, 4, [255, 255, 255, 255]);
        let mut out = vec![0u8; black.len()];
        let n = pixelmatch(
            &black,
            &white,
            Some(out.as_mut_slice()),
            4,
            4,
            &MatchOptions::default(),
        )
        .unwrap();
        assert_eq!(n, 16);
        assert!(out.chunks_exact(4).all(|px| px == [255, 0, 0, 255]));
    }

    #[test]
    fn small_color_shift_stays_under_the_threshold() {
        let a = solid(2, 2, [100, 100, 100, 255]);
        let b = solid(2, 2, [102, 101, 100, 255]);
        let n = pixelmatch(&a, &b, None, 2, 2, &MatchOptions::default()).unwrap();
        assert_eq!(n, 0);

        let strict = MatchOptions {
            threshold: 0.0,
            ..Default::default()
        };
        assert_eq!(pixelmatch(&a, &b, None, 2, 2, &strict).unwrap(), 4);
    }

    #[test]
    fn diff_color_alt_marks_darkened_pixels() {
        let white = solid(1, 1, [255, 255, 255, 255]);
        let black = solid(1, 1, [0, 0, 0, 255]);
        let options = MatchOptions {
            diff_color_alt: Some([0, 255, 0]),
            ..Default::default()
        };
        let mut out = vec![0u8; 4];
        pixelmatch(&white, &black, Some(out.as_mut_slice()), 1, 1, &options).unwrap();
        assert_eq!(out, [0, 255, 0, 255]);

        pixelmatch(&black, &white, Some(out.as_mut_slice()), 1, 1, &options).unwrap();
        assert_eq!(out, [255, 0, 0, 255]);
    }

    #[test]
    fn anti_aliased_edge_pixel_is_not_counted() {
        let base = edge_image();
        let mut shifted = base.clone();
        set_pixel(&mut shifted, 5, 2, 2, [255, 255, 255, 255]);

        let mut out = vec![0u8; base.len()];
        let options = MatchOptions::default();
        let n = pixelmatch(&base, &shifted, Some(out.as_mut_slice()), 5, 5, &options).unwrap();
        assert_eq!(n, 0);
        let pos = pixel_offset(2, 2, 5);
        assert_eq!(&out[pos..pos + 4], &[255, 255, 0, 255]);

        let include = MatchOptions {
            include_anti_aliasing: true,
            ..Default::default()
        };
        assert_eq!(pixelmatch(&base, &shifted, None, 5, 5, &include).unwrap(), 1);
    }

    #[test]
    fn diff_mask_leaves_matching_pixels_untouched() {
        let mut a = solid(2, 1, [0, 0, 0, 255]);
        let b = solid(2, 1, [0, 0, 0, 255]);
        set_pixel(&mut a, 2, 1, 0, [255, 255, 255, 255]);
        let options = MatchOptions {
            diff_mask: true,
            ..Default::default()
        };
        let mut out = vec![0u8; a.len()];
        let n = pixelmatch(&a, &b, Some(out.as_mut_slice()), 2, 1, &options).unwrap();
        assert_eq!(n, 1);
        assert_eq!(out, [0, 0, 0, 0, 255, 0, 0, 255]);
    }

    #[test]
    fn transparent_pixels_are_blended_over_white() {
        let transparent_black = solid(1, 1, [0, 0, 0, 0]);
        let white = solid(1, 1, [255, 255, 255, 255]);
        assert_eq!(color_delta(&transparent_black, &white, 0, 0, false), 0.0);
        let n = pixelmatch(&transparent_black, &white, None, 1, 1, &MatchOptions::default())
            .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn rejects_mismatched_buffer_sizes() {
        let a = solid(2, 2, [0, 0, 0, 255]);
        let b = solid(2, 1, [0, 0, 0, 255]);
        let err = pixelmatch(&a, &b, None, 2, 2, &MatchOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferSize {
                expected: 16,
                actual: 8
            }
        ));
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let a = solid(1, 1, [0, 0, 0, 255]);
        let options = MatchOptions {
            threshold: 1.5,
            ..Default::default()
        };
        let err = pixelmatch(&a, &a, None, 1, 1, &options).unwrap_err();
        assert!(matches!(err, Error::InvalidThreshold(t) if t == 1.5));
    }
}
