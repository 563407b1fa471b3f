//! # derivcache
//!
//! A content-addressed cache of image derivatives. Ask for a source image
//! transformed by a named operation and get back a path you can serve; the
//! work is done once, the first time anyone asks.
//!
//! ```no_run
//! use derivcache::cache::{CacheSettings, DerivativeCache};
//! use derivcache::imaging::{Background, RustCodec};
//!
//! let cache = DerivativeCache::new(RustCodec::new(), CacheSettings::new("public"));
//! match cache.fit("avatars/ana.jpg", 200, 200, Some(Background::white())).path() {
//!     Some(path) => println!("<img src=\"/{path}\">"),
//!     None => println!("<img src=\"/placeholder.png\">"),
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! request (src, op, params)
//!     │
//!     ▼
//! key      CacheKey::compute   → {cache_dir}/{shard}/{digest}.{ext}
//!     │
//!     ▼
//! cache    exists? → Hit       (no decode)
//!          else decode → transform → encode → atomic rename → Created
//! ```
//!
//! The file system is the entire persisted state. There is no index, no
//! manifest and no lock: a derivative exists exactly when its file does.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`cache`] | `DerivativeCache`: the derive primitive, the named operations, atomic persistence |
//! | [`key`] | CRC32 cache keys, shard prefixes, deterministic file names |
//! | [`types`] | `Param`, `Operation` and `DerivativeRequest` shared by the cache, batches and CLI |
//! | [`imaging`] | Codec seam (`ImageCodec`, `Raster`), the `image`-crate codec, dimension math, transform recipes |
//! | [`process`] | Parallel batch warming with progress events |
//! | [`config`] | `derivcache.toml` loading, merging over stock defaults, validation |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Deterministic Keys
//!
//! The derivative path is a pure function of (source identity, operation,
//! parameters). Any process resolves the same request to the same file, so
//! the existence check is the only coordination needed between callers.
//! Sources can be identified by their path (no I/O to build a key) or by the
//! SHA-256 of their bytes (an edited source gets fresh derivatives without
//! any invalidation step).
//!
//! ## Sharded Directories
//!
//! Files are spread over 65 536 directories named by the first four hex
//! characters of the key, so no single directory grows large enough to
//! slow down file systems with poor large-directory performance.
//!
//! ## Failures Are Outcomes
//!
//! A missing source or a corrupt image is something a web page must handle
//! with a placeholder, not a crash. Every operation returns a
//! [`cache::Derivation`]; failures are logged where they happen and never
//! leave a partial file behind.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate (Lanczos3 resampling) for
//! decoding, transforming and encoding. No ImageMagick, no system libraries:
//! the binary is self-contained. The cache itself only sees the
//! [`imaging::ImageCodec`] trait, so tests run against a recording mock.

pub mod cache;
pub mod config;
pub mod imaging;
pub mod key;
pub mod logging;
pub mod output;
pub mod process;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
