//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` |
//! | **Resize** | Lanczos3 via `DynamicImage::resize_exact` |
//! | **Canvas / crop** | `imageops::overlay` / `imageops::replace` |
//! | **Encode** | `image` encoders, format taken from the source extension |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Value types describing image operations
//! - **Backend**: [`ImageCodec`] and [`Raster`] traits + [`RustCodec`]
//! - **Operations**: Transform recipes composed from raster primitives

pub mod backend;
pub mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{CodecError, Dimensions, ImageCodec, Raster};
pub use params::{AspectMode, Background, OutputFormat, Quality};
pub use rust_backend::RustCodec;
