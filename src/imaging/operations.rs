//! Transform recipes.
//!
//! Each recipe is a short sequence of [`Raster`] primitives. They are
//! generic over the raster so the same recipe runs against the real codec
//! and the recording mock in tests. The derivative cache wraps each one as a
//! named operation with its own cache-key parameters.

use super::backend::{check_geometry, CodecError, Raster};
use super::calculations::{aspect_crop_width, centered_crop_window};
use super::params::{AspectMode, Background};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Scale into a `width × height` box keeping proportions.
pub fn resize<R: Raster>(
    image: R,
    width: Option<u32>,
    height: Option<u32>,
    allow_upscale: bool,
) -> Result<R> {
    image.resize(width, height, AspectMode::Preserve, allow_upscale)
}

/// Scale into the box keeping proportions, then pad to exactly
/// `width × height`.
///
/// The padding is centered and filled with `background`, so the output
/// always has the requested dimensions regardless of the source aspect.
pub fn fit<R: Raster>(
    image: R,
    width: u32,
    height: u32,
    background: Background,
    allow_upscale: bool,
) -> Result<R> {
    let image = image.resize(Some(width), Some(height), AspectMode::Preserve, allow_upscale)?;
    let dims = image.dimensions();
    if dims.width < width || dims.height < height {
        return image.resize_canvas(width, height, background);
    }
    Ok(image)
}

/// Cut the square of side `2 * half_length` centered at `(x, y)` and scale
/// it to `length × length`, enlarging if necessary.
pub fn crop_to_fit_square<R: Raster>(
    image: R,
    length: u32,
    x: i64,
    y: i64,
    half_length: u32,
) -> Result<R> {
    if half_length == 0 {
        return Err(CodecError::InvalidGeometry(
            "crop half-length must be non-zero".into(),
        ));
    }
    let window = centered_crop_window(x, y, half_length).ok_or_else(|| {
        CodecError::InvalidGeometry(format!(
            "crop window of half-length {half_length} around ({x}, {y}) is out of range"
        ))
    })?;
    check_geometry(window.size, window.size, "crop window")?;
    check_geometry(length, length, "crop target")?;
    image
        .crop(window.size, window.size, window.x, window.y)?
        .resize(Some(length), Some(length), AspectMode::Exact, true)
}

/// Limit the aspect ratio (width / height) to `max_ratio`, then the width
/// to `max_width`.
///
/// Sources wider than the ratio lose equal strips on the left and right.
/// The result is only ever scaled down.
pub fn fit_aspect_ratio<R: Raster>(image: R, max_width: u32, max_ratio: f64) -> Result<R> {
    if !max_ratio.is_finite() || max_ratio <= 0.0 {
        return Err(CodecError::InvalidGeometry(format!(
            "aspect ratio must be a positive number, got {max_ratio}"
        )));
    }

    let dims = image.dimensions();
    let image = match aspect_crop_width(dims, max_ratio) {
        Some(width) => {
            image.resize_canvas(width, dims.height, Background::Transparent)?
        }
        None => image,
    };

    if image.dimensions().width > max_width {
        return image.resize(Some(max_width), None, AspectMode::Preserve, false);
    }
    Ok(image)
}
