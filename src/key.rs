//! Cache-key derivation.
//!
//! A derivative is identified by three inputs: the source identity, the
//! operation category and the ordered operation parameters. From those the
//! key produces three CRC32 checksums (zero-padded, 8 hex chars each):
//!
//! - **`source_hash`**: of the source identity alone.
//! - **`variant_hash`**: of the key material `category:param,param,…`.
//! - **shard**: first [`SHARD_LEN`] hex chars of the checksum of both
//!   together, used as the directory name.
//!
//! The file lives at `{cache_dir}/{shard}/{source_hash}{variant_hash}.{ext}`.
//! Every part is a pure function of the inputs, so any caller in any
//! process resolves the same path for the same request.
//!
//! The source identity is either the reference string itself or, with
//! [`KeySource::Content`], the SHA-256 of the source bytes.

use crate::types::Param;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;

/// Number of hex characters in a shard directory name (65 536 shards).
pub const SHARD_LEN: usize = 4;

/// What identifies a source in its cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeySource {
    /// The source reference string. No I/O needed to compute the key.
    #[default]
    Path,
    /// SHA-256 of the source file. An edited source gets new derivatives.
    Content,
}

/// CRC32 of a string, as 8 lowercase hex characters.
pub fn crc32_hex(value: &str) -> String {
    format!("{:08x}", crc32fast::hash(value.as_bytes()))
}

/// The string that identifies an operation and its parameters.
///
/// Parameters are comma-separated so `[1, 23]` and `[12, 3]` differ.
pub fn key_material(category: &str, params: &[Param]) -> String {
    let joined = params
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("{category}:{joined}")
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// Deterministic identity of one derivative.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub shard: String,
    pub source_hash: String,
    pub variant_hash: String,
}

impl CacheKey {
    /// Compute the key for `identity` transformed by `category(params)`.
    pub fn compute(identity: &str, category: &str, params: &[Param]) -> Self {
        let material = key_material(category, params);
        let combined = crc32_hex(&format!("{identity}|{material}"));
        Self {
            shard: combined[..SHARD_LEN].to_string(),
            source_hash: crc32_hex(identity),
            variant_hash: crc32_hex(&material),
        }
    }

    /// The 16-hex-char digest used as the file stem.
    pub fn digest(&self) -> String {
        format!("{}{}", self.source_hash, self.variant_hash)
    }

    /// File name of the derivative, e.g. `1a2b3c4d5e6f7a8b.jpg`.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.digest(), extension)
    }

    /// Public-relative path of the derivative under `cache_dir`.
    ///
    /// Always uses `/` separators so the result can be served as a URL path.
    pub fn relative_path(&self, cache_dir: &str, extension: &str) -> String {
        let dir = cache_dir.trim_matches('/');
        if dir.is_empty() {
            format!("{}/{}", self.shard, self.file_name(extension))
        } else {
            format!("{}/{}/{}", dir, self.shard, self.file_name(extension))
        }
    }
}
