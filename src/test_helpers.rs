//! Shared test utilities for the derivcache test suite.
//!
//! Provides on-disk fixture builders (a public root with source files in it)
//! and synthetic image encoders for tests that run the real codec.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_test_image(tmp.path(), "photos/wide.jpg", 800, 600);
//! let cache = DerivativeCache::new(RustCodec::new(), settings_for(tmp.path()));
//! ```

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgba, RgbaImage};

use crate::cache::CacheSettings;

// =========================================================================
// Fixture setup
// =========================================================================

/// Stock cache settings rooted at `root`.
pub fn settings_for(root: &Path) -> CacheSettings {
    CacheSettings::new(root)
}

/// Write `bytes` to `root/relative`, creating parent directories.
pub fn write_source(root: &Path, relative: &str, bytes: &[u8]) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Write a real `width × height` image to `root/relative`, encoded in the
/// format named by its extension.
pub fn write_test_image(root: &Path, relative: &str, width: u32, height: u32) -> PathBuf {
    let format = ImageFormat::from_path(relative)
        .unwrap_or_else(|e| panic!("no image format for '{relative}': {e}"));
    write_source(root, relative, &encode_test_image(width, height, format))
}

// =========================================================================
// Synthetic images
// =========================================================================

/// Encode an opaque gradient of the given size.
///
/// Each pixel differs from its neighbours, so crops and resizes are
/// observable in the output.
pub fn encode_test_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    });
    let mut buf = Vec::new();
    let dynamic = image::DynamicImage::ImageRgba8(img);
    let dynamic = if format == ImageFormat::Jpeg {
        image::DynamicImage::ImageRgb8(dynamic.to_rgb8())
    } else {
        dynamic
    };
    dynamic.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

// =========================================================================
// Inspection
// =========================================================================

/// Every regular file under `dir`, recursively, sorted.
pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    collect_files(dir, &mut files);
    files.sort();
    files
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect_files(&path, files);
        } else {
            files.push(path);
        }
    }
}
