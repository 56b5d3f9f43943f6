//! "Contain" fitting: scale an image into a target box without distorting it and pad the rest.

use image::imageops::{self, FilterType};
use image::{Rgba, Rgba32FImage, RgbaImage};
use std::borrow::Cow;

/// Fully transparent white, used to pad the area a fitted image does not cover.
pub const TRANSPARENT_WHITE: Rgba<u8> = Rgba([255, 255, 255, 0]);

/// Fits `image` into a `width x height` canvas, preserving its aspect ratio.
///
/// The scaled image is centered and the uncovered area is filled with `background`. An image
/// that already has the target size is returned as-is, so equal-sized inputs are compared
/// pixel for pixel.
///
/// Resampling runs on premultiplied alpha, so the color of fully transparent pixels never
/// bleeds into the edges of visible ones.
pub fn fit_contain(
    image: &RgbaImage,
    width: u32,
    height: u32,
    background: Rgba<u8>,
) -> Cow<'_, RgbaImage> {
    let (src_width, src_height) = image.dimensions();
    if (src_width, src_height) == (width, height) {
        return Cow::Borrowed(image);
    }

    let mut canvas = RgbaImage::from_pixel(width, height, background);
    if src_width == 0 || src_height == 0 || width == 0 || height == 0 {
        return Cow::Owned(canvas);
    }

    let (fit_width, fit_height) = contain_size(src_width, src_height, width, height);
    let resized = unpremultiply(&imageops::resize(
        &premultiply(image),
        fit_width,
        fit_height,
        FilterType::Lanczos3,
    ));
    let left = (width - fit_width) / 2;
    let top = (height - fit_height) / 2;
    imageops::replace(&mut canvas, &resized, i64::from(left), i64::from(top));

    Cow::Owned(canvas)
}

fn premultiply(image: &RgbaImage) -> Rgba32FImage {
    Rgba32FImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
        let alpha = f32::from(a) / 255.0;
        let channel = |c: u8| f32::from(c) / 255.0 * alpha;
        Rgba([channel(r), channel(g), channel(b), alpha])
    })
}

fn unpremultiply(image: &Rgba32FImage) -> RgbaImage {
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
        let alpha = a.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return Rgba([0, 0, 0, 0]);
        }
        let channel = |c: f32| ((c / alpha).clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba([channel(r), channel(g), channel(b), (alpha * 255.0).round() as u8])
    })
}

/// Largest size with the source aspect ratio that fits inside the target box.
pub fn contain_size(src_width: u32, src_height: u32, width: u32, height: u32) -> (u32, u32) {
    let scale = (f64::from(width) / f64::from(src_width))
        .min(f64::from(height) / f64::from(src_height));
    let fit_width = (f64::from(src_width) * scale).round() as u32;
    let fit_height = (f64::from(src_height) * scale).round() as u32;
    (fit_width.clamp(1, width), fit_height.clamp(1, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contain_size_keeps_the_aspect_ratio() {
        assert_eq!(contain_size(200, 100, 100, 100), (100, 50));
        assert_eq!(contain_size(100, 200, 100, 100), (50, 100));
        assert_eq!(contain_size(50, 50, 200, 100), (100, 100));
        assert_eq!(contain_size(1000, 1, 10, 10), (10, 1));
    }

    #[test]
    fn same_size_image_is_borrowed_unchanged() {
        let img = RgbaImage::from_pixel(4, 3, Rgba([1, 2, 3, 4]));
        let fitted = fit_contain(&img, 4, 3, TRANSPARENT_WHITE);
        assert!(matches!(fitted, Cow::Borrowed(_)));
        assert_eq!(fitted.as_ref(), &img);
    }

    #[test]
    fn wide_image_is_letterboxed_with_transparent_white() {
        let img = RgbaImage::from_pixel(8, 4, Rgba([0, 0, 0, 255]));
        let fitted = fit_contain(&img, 4, 4, TRANSPARENT_WHITE);
        assert_eq!(fitted.dimensions(), (4, 4));

        // 8x4 scales to 4x2, centered vertically: rows 0 and 3 are padding.
        for x in 0..4 {
            assert_eq!(*fitted.get_pixel(x, 0), TRANSPARENT_WHITE);
            assert_eq!(*fitted.get_pixel(x, 3), TRANSPARENT_WHITE);
            assert_eq!(*fitted.get_pixel(x, 1), Rgba([0, 0, 0, 255]));
            assert_eq!(*fitted.get_pixel(x, 2), Rgba([0, 0, 0, 255]));
        }
    }

    #[test]
    fn upscales_to_fill_the_target() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255]));
        let fitted = fit_contain(&img, 6, 6, TRANSPARENT_WHITE);
        assert_eq!(fitted.dimensions(), (6, 6));
        assert!(fitted.pixels().all(|p| p[3] == 255));
        assert!(fitted.pixels().all(|p| p.0 == [10, 20, 30, 255]));
    }

    #[test]
    fn transparent_pixels_do_not_bleed_color_when_resampled() {
        // Left half invisible red, right half opaque blue.
        let img = RgbaImage::from_fn(4, 2, |x, _| {
            if x < 2 {
                Rgba([255, 0, 0, 0])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        let fitted = fit_contain(&img, 12, 6, TRANSPARENT_WHITE);
        assert_eq!(fitted.dimensions(), (12, 6));

        let visible: Vec<_> = fitted.pixels().filter(|p| p[3] > 0).collect();
        assert!(!visible.is_empty());
        for p in visible {
            assert_eq!(p[0], 0, "red leaked into {p:?}");
            assert_eq!(p[2], 255, "blue diluted in {p:?}");
        }
    }
}
