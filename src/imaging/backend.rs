//! Image codec traits and shared types.
//!
//! The cache never touches pixels itself. It talks to an [`ImageCodec`],
//! which turns bytes into a decoded [`Raster`] and back, and the raster
//! exposes the three geometric primitives every recipe is built from:
//! exact resize, canvas placement and crop.
//!
//! Decoded images are plain owned values. Each primitive consumes the
//! handle and returns a new one, so the decoded buffer is released on every
//! exit path (including `?` early returns) without explicit cleanup.
//!
//! The production implementation is
//! [`RustCodec`](super::rust_backend::RustCodec), built on the `image` crate.

use super::calculations::{center_offset, resize_dimensions};
use super::params::{AspectMode, Background, OutputFormat, Quality};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
}

/// Largest image, in pixels, any primitive may allocate (16384 × 16384).
pub const MAX_PIXELS: u64 = 1 << 28;

/// Reject empty sizes and sizes over [`MAX_PIXELS`] before anything is
/// allocated for them.
pub fn check_geometry(width: u32, height: u32, what: &str) -> Result<(), CodecError> {
    if width == 0 || height == 0 {
        return Err(CodecError::InvalidGeometry(format!(
            "{what} must be non-zero, got {width}x{height}"
        )));
    }
    if u64::from(width) * u64::from(height) > MAX_PIXELS {
        return Err(CodecError::InvalidGeometry(format!(
            "{what} of {width}x{height} exceeds {MAX_PIXELS} pixels"
        )));
    }
    Ok(())
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A decoded image.
///
/// Implementors provide the primitives; [`resize`](Raster::resize) and
/// [`resize_canvas`](Raster::resize_canvas) are derived from them using
/// the pure functions in [`calculations`](super::calculations).
pub trait Raster: Sized {
    /// Current pixel dimensions.
    fn dimensions(&self) -> Dimensions;

    /// Resample to exactly `width × height`.
    fn resize_exact(self, width: u32, height: u32) -> Result<Self, CodecError>;

    /// Place the image with its top-left corner at `(x, y)` on a new
    /// `width × height` canvas filled with `background`. Parts of the image
    /// outside the canvas are clipped.
    fn place_on_canvas(
        self,
        width: u32,
        height: u32,
        x: i64,
        y: i64,
        background: Background,
    ) -> Result<Self, CodecError>;

    /// Cut a `width × height` region whose top-left corner is `(x, y)`.
    ///
    /// The result is always exactly `width × height`; any part of the
    /// region outside the source is transparent.
    fn crop(self, width: u32, height: u32, x: i64, y: i64) -> Result<Self, CodecError>;

    /// Resize into a box, optionally keeping proportions and optionally
    /// allowing the image to grow. A `None` side is unconstrained.
    fn resize(
        self,
        width: Option<u32>,
        height: Option<u32>,
        aspect: AspectMode,
        allow_upscale: bool,
    ) -> Result<Self, CodecError> {
        if width == Some(0) || height == Some(0) {
            return Err(CodecError::InvalidGeometry(
                "resize target must be non-zero".into(),
            ));
        }
        let target = resize_dimensions(self.dimensions(), width, height, aspect, allow_upscale);
        check_geometry(target.width, target.height, "resize target")?;
        if target == self.dimensions() {
            return Ok(self);
        }
        self.resize_exact(target.width, target.height)
    }

    /// Change the canvas to exactly `width × height` without resampling,
    /// keeping the image centered. Padding is filled with `background` and
    /// overflow is clipped equally from both sides.
    fn resize_canvas(
        self,
        width: u32,
        height: u32,
        background: Background,
    ) -> Result<Self, CodecError> {
        check_geometry(width, height, "canvas")?;
        let canvas = Dimensions::new(width, height);
        if canvas == self.dimensions() {
            return Ok(self);
        }
        let (x, y) = center_offset(self.dimensions(), canvas);
        self.place_on_canvas(width, height, x, y, background)
    }
}

/// Decoder/encoder consumed by the derivative cache.
///
/// Must be `Sync`: one codec is shared by every worker when a batch is
/// warmed in parallel.
pub trait ImageCodec: Sync {
    type Image: Raster;

    /// Decode an encoded image.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Image, CodecError>;

    /// Encode an image in the given format.
    fn encode(
        &self,
        image: &Self::Image,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, CodecError>;
}
