//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;
use super::params::AspectMode;

/// Calculate the output size of a resize.
///
/// With [`AspectMode::Preserve`] the source is scaled uniformly so that it
/// fits inside the requested box; a `None` side leaves that axis
/// unconstrained. With [`AspectMode::Exact`] the requested sides are used
/// as-is and a `None` side keeps the source length.
///
/// When `allow_upscale` is false the output never exceeds the source on
/// either axis.
///
/// # Examples
/// ```
/// # use derivcache::imaging::{AspectMode, Dimensions, calculations::resize_dimensions};
/// let src = Dimensions { width: 800, height: 600 };
/// // 4:3 into a 200px square → 200x150
/// assert_eq!(
///     resize_dimensions(src, Some(200), Some(200), AspectMode::Preserve, false),
///     Dimensions { width: 200, height: 150 }
/// );
/// ```
pub fn resize_dimensions(
    source: Dimensions,
    width: Option<u32>,
    height: Option<u32>,
    aspect: AspectMode,
    allow_upscale: bool,
) -> Dimensions {
    match aspect {
        AspectMode::Exact => {
            let mut w = width.unwrap_or(source.width);
            let mut h = height.unwrap_or(source.height);
            if !allow_upscale {
                w = w.min(source.width);
                h = h.min(source.height);
            }
            Dimensions {
                width: w.max(1),
                height: h.max(1),
            }
        }
        AspectMode::Preserve => {
            let fx = width.map(|w| w as f64 / source.width as f64);
            let fy = height.map(|h| h as f64 / source.height as f64);

            let mut factor = match (fx, fy) {
                (Some(x), Some(y)) => x.min(y),
                (Some(x), None) => x,
                (None, Some(y)) => y,
                (None, None) => 1.0,
            };
            if !allow_upscale {
                factor = factor.min(1.0);
            }

            let mut w = ((source.width as f64 * factor).round() as u32).max(1);
            let mut h = ((source.height as f64 * factor).round() as u32).max(1);
            // Rounding must never push the result outside the box
            if let Some(max_w) = width {
                w = w.min(max_w.max(1));
            }
            if let Some(max_h) = height {
                h = h.min(max_h.max(1));
            }
            Dimensions {
                width: w,
                height: h,
            }
        }
    }
}

/// Offset of an image's top-left corner when centered on a canvas.
///
/// Offsets are negative when the image is larger than the canvas on that
/// axis, which clips (crops) equal parts from both sides.
pub fn center_offset(image: Dimensions, canvas: Dimensions) -> (i64, i64) {
    let slack = |image: u32, canvas: u32| (i64::from(canvas) - i64::from(image)) / 2;
    (
        slack(image.width, canvas.width),
        slack(image.height, canvas.height),
    )
}

/// A square crop region in source coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub x: i64,
    pub y: i64,
    pub size: u32,
}

/// The square of side `2 * half_length` centered at `(center_x, center_y)`.
///
/// The window may extend past the source edges; the codec fills that area.
/// Returns `None` when the window's edges or side do not fit their types.
pub fn centered_crop_window(center_x: i64, center_y: i64, half_length: u32) -> Option<CropWindow> {
    let half = i64::from(half_length);
    // The far edges must be representable too
    center_x.checked_add(half)?;
    center_y.checked_add(half)?;
    Some(CropWindow {
        x: center_x.checked_sub(half)?,
        y: center_y.checked_sub(half)?,
        size: half_length.checked_mul(2)?,
    })
}

/// Canvas width needed to bring an image down to `max_ratio` (width / height).
///
/// Returns `None` when the source is already at or below the ratio.
pub fn aspect_crop_width(source: Dimensions, max_ratio: f64) -> Option<u32> {
    let ratio = source.width as f64 / source.height as f64;
    if ratio <= max_ratio {
        return None;
    }
    let width = ((source.height as f64 * max_ratio).floor() as u32).max(1);
    (width < source.width).then_some(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    // =========================================================================
    // resize_dimensions
    // =========================================================================

    #[test]
    fn preserve_fits_landscape_into_square() {
        let out = resize_dimensions(dims(800, 600), Some(200), Some(200), AspectMode::Preserve, false);
        assert_eq!(out, dims(200, 150));
    }

    #[test]
    fn preserve_fits_portrait_into_square() {
        let out = resize_dimensions(dims(600, 800), Some(200), Some(200), AspectMode::Preserve, false);
        assert_eq!(out, dims(150, 200));
    }

    #[test]
    fn preserve_with_width_only() {
        let out = resize_dimensions(dims(1000, 500), Some(300), None, AspectMode::Preserve, false);
        assert_eq!(out, dims(300, 150));
    }

    #[test]
    fn preserve_with_height_only() {
        let out = resize_dimensions(dims(1000, 500), None, Some(100), AspectMode::Preserve, false);
        assert_eq!(out, dims(200, 100));
    }

    #[test]
    fn preserve_without_box_keeps_source() {
        let out = resize_dimensions(dims(640, 480), None, None, AspectMode::Preserve, true);
        assert_eq!(out, dims(640, 480));
    }

    #[test]
    fn preserve_does_not_upscale_by_default() {
        let out = resize_dimensions(dims(100, 50), Some(400), Some(400), AspectMode::Preserve, false);
        assert_eq!(out, dims(100, 50));
    }

    #[test]
    fn preserve_upscales_when_allowed() {
        let out = resize_dimensions(dims(100, 50), Some(400), Some(400), AspectMode::Preserve, true);
        assert_eq!(out, dims(400, 200));
    }

    #[test]
    fn preserve_never_rounds_outside_box() {
        // 3:1 into 100x33 → factor 0.33, height would round to 33
        let out = resize_dimensions(dims(300, 101), Some(100), Some(33), AspectMode::Preserve, false);
        assert!(out.width <= 100 && out.height <= 33, "{out:?}");
    }

    #[test]
    fn preserve_keeps_at_least_one_pixel() {
        let out = resize_dimensions(dims(10_000, 10), Some(100), None, AspectMode::Preserve, false);
        assert_eq!(out, dims(100, 1));
    }

    #[test]
    fn exact_stretches_with_upscale() {
        let out = resize_dimensions(dims(50, 80), Some(100), Some(100), AspectMode::Exact, true);
        assert_eq!(out, dims(100, 100));
    }

    #[test]
    fn exact_caps_without_upscale() {
        let out = resize_dimensions(dims(50, 80), Some(100), Some(60), AspectMode::Exact, false);
        assert_eq!(out, dims(50, 60));
    }

    // =========================================================================
    // center_offset
    // =========================================================================

    #[test]
    fn center_pads_evenly() {
        // 200x150 on 200x200 → 25px top and bottom
        assert_eq!(center_offset(dims(200, 150), dims(200, 200)), (0, 25));
    }

    #[test]
    fn center_clips_wider_image() {
        assert_eq!(center_offset(dims(300, 100), dims(100, 100)), (-100, 0));
    }

    #[test]
    fn center_odd_slack_rounds_toward_origin() {
        assert_eq!(center_offset(dims(50, 50), dims(101, 80)), (25, 15));
        assert_eq!(center_offset(dims(101, 50), dims(50, 50)), (-25, 0));
    }

    // =========================================================================
    // crop windows
    // =========================================================================

    #[test]
    fn crop_window_is_centered() {
        let w = centered_crop_window(150, 150, 50);
        assert_eq!(w, Some(CropWindow { x: 100, y: 100, size: 100 }));
    }

    #[test]
    fn crop_window_may_start_before_origin() {
        let w = centered_crop_window(10, 20, 30);
        assert_eq!(w, Some(CropWindow { x: -20, y: -10, size: 60 }));
    }

    #[test]
    fn crop_window_out_of_range() {
        assert_eq!(centered_crop_window(i64::MIN, 0, 5), None);
        assert_eq!(centered_crop_window(0, i64::MAX, 5), None);
        assert_eq!(centered_crop_window(20, 20, 1 << 31), None);
        assert_eq!(
            centered_crop_window(i64::MIN + 5, 0, 5),
            Some(CropWindow { x: i64::MIN, y: -5, size: 10 })
        );
    }

    // =========================================================================
    // aspect_crop_width
    // =========================================================================

    #[test]
    fn aspect_crop_narrows_wide_source() {
        // 1600x400 is 4:1; cap at 2:1 → 800 wide
        assert_eq!(aspect_crop_width(dims(1600, 400), 2.0), Some(800));
    }

    #[test]
    fn aspect_crop_leaves_narrow_source() {
        assert_eq!(aspect_crop_width(dims(400, 400), 2.0), None);
        assert_eq!(aspect_crop_width(dims(800, 400), 2.0), None);
    }
}
