//! Pure Rust codec built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, TIFF, WebP) | `image::load_from_memory` (format sniffed from bytes) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Canvas / padding | `RgbaImage::from_pixel` + `imageops::overlay` |
//! | Crop | `DynamicImage::crop_imm`, or `imageops::replace` onto a transparent canvas when the region leaves the source |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → PNG, GIF, TIFF, WebP | `DynamicImage::write_to` |

use super::backend::{check_geometry, CodecError, Dimensions, ImageCodec, Raster};
use super::params::{Background, OutputFormat, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// Codec backed by the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Raster for DynamicImage {
    fn dimensions(&self) -> Dimensions {
        let (width, height) = GenericImageView::dimensions(self);
        Dimensions { width, height }
    }

    fn resize_exact(self, width: u32, height: u32) -> Result<Self, CodecError> {
        check_geometry(width, height, "resize target")?;
        Ok(DynamicImage::resize_exact(
            &self,
            width,
            height,
            FilterType::Lanczos3,
        ))
    }

    fn place_on_canvas(
        self,
        width: u32,
        height: u32,
        x: i64,
        y: i64,
        background: Background,
    ) -> Result<Self, CodecError> {
        check_geometry(width, height, "canvas")?;
        let mut canvas = RgbaImage::from_pixel(width, height, Rgba(background.rgba()));
        imageops::overlay(&mut canvas, &self.to_rgba8(), x, y);
        Ok(DynamicImage::ImageRgba8(canvas))
    }

    fn crop(self, width: u32, height: u32, x: i64, y: i64) -> Result<Self, CodecError> {
        check_geometry(width, height, "crop region")?;
        let (src_w, src_h) = GenericImageView::dimensions(&self);
        let x_span = axis_span(x, width, src_w)?;
        let y_span = axis_span(y, height, src_h)?;

        if x_span == Span::Inside && y_span == Span::Inside {
            return Ok(self.crop_imm(x as u32, y as u32, width, height));
        }

        let mut canvas = RgbaImage::new(width, height);
        if x_span != Span::Outside && y_span != Span::Outside {
            // Overlapping, so both offsets are within a u32 of the origin
            imageops::replace(&mut canvas, &self.to_rgba8(), -x, -y);
        }
        Ok(DynamicImage::ImageRgba8(canvas))
    }
}

/// How a crop region relates to the source along one axis.
#[derive(Debug, PartialEq, Eq)]
enum Span {
    Inside,
    Overlapping,
    Outside,
}

fn axis_span(start: i64, len: u32, source: u32) -> Result<Span, CodecError> {
    let end = start.checked_add(i64::from(len)).ok_or_else(|| {
        CodecError::InvalidGeometry(format!("crop region at {start} overflows"))
    })?;
    Ok(if start >= 0 && end <= i64::from(source) {
        Span::Inside
    } else if end <= 0 || start >= i64::from(source) {
        Span::Outside
    } else {
        Span::Overlapping
    })
}

impl ImageCodec for RustCodec {
    type Image = DynamicImage;

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        image::load_from_memory(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, CodecError> {
        let mut buffer = Cursor::new(Vec::new());
        let encode_err = |e: image::ImageError| CodecError::Encode(e.to_string());

        match format {
            OutputFormat::Jpeg => {
                let encoder =
                    JpegEncoder::new_with_quality(&mut buffer, quality.value().min(100) as u8);
                image.to_rgb8().write_with_encoder(encoder).map_err(encode_err)?;
            }
            OutputFormat::Png => image
                .write_to(&mut buffer, ImageFormat::Png)
                .map_err(encode_err)?,
            OutputFormat::Tiff => image
                .write_to(&mut buffer, ImageFormat::Tiff)
                .map_err(encode_err)?,
            // GIF and (lossless) WebP encoders only take 8-bit RGBA
            OutputFormat::Gif => DynamicImage::ImageRgba8(image.to_rgba8())
                .write_to(&mut buffer, ImageFormat::Gif)
                .map_err(encode_err)?,
            OutputFormat::WebP => DynamicImage::ImageRgba8(image.to_rgba8())
                .write_to(&mut buffer, ImageFormat::WebP)
                .map_err(encode_err)?,
        }

        Ok(buffer.into_inner())
    }
}
