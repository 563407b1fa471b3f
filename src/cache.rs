//! The derivative cache.
//!
//! [`DerivativeCache::derive`] answers "give me `src` transformed by
//! `category(params)`", decoding and transforming at most once per distinct
//! input triple. The six named operations (`square`, `resize`, `fit`, …) are
//! parameter sets over that one primitive.
//!
//! ## Lifecycle of a request
//!
//! ```text
//! src ──resolve──▶ missing? ──▶ SourceMissing   (no I/O beyond a stat)
//!      │
//!      ▼
//! key  = CacheKey(identity, category, params)
//! path = {cache_dir}/{shard}/{digest}.{ext}
//!      │
//!      ▼
//! exists? ──▶ Hit(path)                         (codec never touched)
//!      │
//!      ▼
//! decode → transform → encode → temp file → rename ──▶ Created(path)
//!                   any error ──▶ log, Failed(err)  (temp file removed)
//! ```
//!
//! ## Concurrency
//!
//! There are no locks. The path is a pure function of the inputs, so two
//! callers racing on the same derivative compute the same bytes for the same
//! path. Each writer persists through its own temp file and an atomic
//! rename, so a reader that sees the file always sees all of it. The last
//! rename wins and nothing is lost.
//!
//! ## Failures
//!
//! Derivation never returns `Err`: a missing source is a normal outcome
//! ([`Derivation::SourceMissing`]) and codec or I/O failures are logged and
//! returned as [`Derivation::Failed`]. Nothing is recorded for a failure, so
//! the next request for the same triple simply tries again.

use crate::config::{CacheConfig, ConfigError};
use crate::imaging::{operations, Background, CodecError, ImageCodec, OutputFormat, Quality};
use crate::key::{self, CacheKey, KeySource};
use crate::types::Param;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum DeriveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("image error: {0}")]
    Codec(#[from] CodecError),
    #[error("unsupported image format: {0:?}")]
    UnsupportedFormat(String),
}

/// Everything the cache needs besides the codec.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Directory source references and derivative paths are relative to.
    pub public_root: PathBuf,
    /// Derivative root, relative to `public_root`.
    pub cache_dir: String,
    pub key_source: KeySource,
    /// Permission bits for created directories. Files drop the execute bits.
    pub dir_mode: u32,
    /// Whether `resize` and `fit` may enlarge small sources.
    pub allow_upscale: bool,
    pub quality: Quality,
}

impl CacheSettings {
    /// Stock settings rooted at `public_root`.
    pub fn new(public_root: impl Into<PathBuf>) -> Self {
        Self {
            public_root: public_root.into(),
            cache_dir: "cache/images".to_string(),
            key_source: KeySource::Path,
            dir_mode: 0o755,
            allow_upscale: false,
            quality: Quality::default(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            public_root: PathBuf::from(&config.public_root),
            cache_dir: config.cache_dir.clone(),
            key_source: config.key_source,
            dir_mode: config.dir_mode_bits()?,
            allow_upscale: config.resize.allow_upscale,
            quality: Quality::new(config.encoding.quality),
        })
    }
}

/// Where a derivative lives, resolved without touching the codec.
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    /// Absolute path of the source image.
    pub source: PathBuf,
    /// Public-relative derivative path, `/`-separated.
    pub relative: String,
    /// Absolute derivative path on disk.
    pub target: PathBuf,
    pub format: OutputFormat,
    pub key: CacheKey,
}

/// Outcome of one derivation request.
#[derive(Debug)]
pub enum Derivation {
    /// The derivative already existed.
    Hit(String),
    /// The derivative was produced by this call.
    Created(String),
    /// The source reference was empty, unsafe or does not exist.
    SourceMissing,
    /// Producing the derivative failed. Already logged.
    Failed(DeriveError),
}

/// Coarse outcome of a [`Derivation`], used for stats and progress output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationStatus {
    Hit,
    Created,
    Missing,
    Failed,
}

impl fmt::Display for DerivationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DerivationStatus::Hit => "cached",
            DerivationStatus::Created => "created",
            DerivationStatus::Missing => "missing",
            DerivationStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

impl Derivation {
    /// Relative path of the derivative, if one is available.
    pub fn path(&self) -> Option<&str> {
        match self {
            Derivation::Hit(path) | Derivation::Created(path) => Some(path),
            _ => None,
        }
    }

    pub fn into_path(self) -> Option<String> {
        match self {
            Derivation::Hit(path) | Derivation::Created(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.path().is_some()
    }

    pub fn status(&self) -> DerivationStatus {
        match self {
            Derivation::Hit(_) => DerivationStatus::Hit,
            Derivation::Created(_) => DerivationStatus::Created,
            Derivation::SourceMissing => DerivationStatus::Missing,
            Derivation::Failed(_) => DerivationStatus::Failed,
        }
    }
}

/// Content-addressed cache of image derivatives.
pub struct DerivativeCache<C: ImageCodec> {
    codec: C,
    settings: CacheSettings,
}

impl<C: ImageCodec> DerivativeCache<C> {
    pub fn new(codec: C, settings: CacheSettings) -> Self {
        Self { codec, settings }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    // =========================================================================
    // Named operations
    // =========================================================================

    /// Scale into a `length × length` box keeping proportions.
    pub fn square(&self, src: &str, length: u32) -> Derivation {
        self.resize(src, Some(length), Some(length))
    }

    /// Scale into a `width × height` box keeping proportions. A `None` side
    /// is unconstrained.
    pub fn resize(&self, src: &str, width: Option<u32>, height: Option<u32>) -> Derivation {
        let allow_upscale = self.settings.allow_upscale;
        let params = [
            Param::from(width),
            Param::from(height),
            upscale_param(allow_upscale),
        ];
        self.derive("resize", src, &params, |image| {
            operations::resize(image, width, height, allow_upscale)
        })
    }

    /// Scale into the box and pad to exactly `width × height`.
    ///
    /// Without a background the padding is transparent, or white when the
    /// output format has no alpha channel.
    pub fn fit(
        &self,
        src: &str,
        width: u32,
        height: u32,
        background: Option<Background>,
    ) -> Derivation {
        let allow_upscale = self.settings.allow_upscale;
        let params = [
            Param::from(width),
            Param::from(height),
            Param::from(background),
            upscale_param(allow_upscale),
        ];
        let fill = background.unwrap_or_else(|| default_fill(src));
        self.derive("fit", src, &params, |image| {
            operations::fit(image, width, height, fill, allow_upscale)
        })
    }

    pub fn fit_to_square(&self, src: &str, length: u32, background: Option<Background>) -> Derivation {
        self.fit(src, length, length, background)
    }

    /// Crop the square of side `2 * half_length` centered at `(x, y)`, then
    /// scale it to `length × length`. Always enlarges when needed.
    pub fn crop_to_fit_square(
        &self,
        src: &str,
        length: u32,
        x: i64,
        y: i64,
        half_length: u32,
    ) -> Derivation {
        let params = [
            Param::from(length),
            Param::from(x),
            Param::from(y),
            Param::from(half_length),
        ];
        self.derive("crop", src, &params, |image| {
            operations::crop_to_fit_square(image, length, x, y, half_length)
        })
    }

    /// Cap the aspect ratio at `ratio` (centered crop), then the width at
    /// `width`.
    pub fn fit_aspect_ratio(&self, src: &str, width: u32, ratio: f64) -> Derivation {
        let params = [Param::from(width), Param::from(ratio)];
        self.derive("fitar", src, &params, |image| {
            operations::fit_aspect_ratio(image, width, ratio)
        })
    }

    // =========================================================================
    // Core primitive
    // =========================================================================

    /// Return the derivative of `src` for `category(params)`, running
    /// `transform` on the decoded source only when it does not exist yet.
    ///
    /// `params` must contain every input that changes the output: they are
    /// the only thing distinguishing two derivatives of one source.
    pub fn derive<F>(&self, category: &str, src: &str, params: &[Param], transform: F) -> Derivation
    where
        F: FnOnce(C::Image) -> Result<C::Image, CodecError>,
    {
        let located = match self.locate(category, src, params) {
            Ok(Some(located)) => located,
            Ok(None) => {
                debug!(source = src, category, "source missing");
                return Derivation::SourceMissing;
            }
            Err(err) => return self.failed(category, src, err),
        };

        if let Some(dir) = located.target.parent() {
            if let Err(err) = self.ensure_dir(dir) {
                return self.failed(category, src, err.into());
            }
        }

        if located.target.is_file() {
            debug!(source = src, category, path = %located.relative, "cache hit");
            return Derivation::Hit(located.relative);
        }

        debug!(source = src, category, path = %located.relative, "cache miss");
        match self.produce(&located, transform) {
            Ok(()) => {
                info!(source = src, category, path = %located.relative, "created derivative");
                Derivation::Created(located.relative)
            }
            Err(err) => self.failed(category, src, err),
        }
    }

    /// Resolve where the derivative of `src` for `category(params)` lives.
    ///
    /// Returns `Ok(None)` when the source is missing. Nothing is created and
    /// the codec is not used, so this is cheap enough for building URLs.
    pub fn locate(
        &self,
        category: &str,
        src: &str,
        params: &[Param],
    ) -> Result<Option<Located>, DeriveError> {
        let Some((normalized, source)) = self.resolve_source(src) else {
            return Ok(None);
        };

        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let format = OutputFormat::from_extension(&extension)
            .ok_or_else(|| DeriveError::UnsupportedFormat(extension.clone()))?;

        let identity = match self.settings.key_source {
            KeySource::Path => normalized,
            KeySource::Content => key::hash_file(&source)?,
        };
        let key = CacheKey::compute(&identity, category, params);
        let relative = key.relative_path(&self.settings.cache_dir, &extension);
        let target = self.settings.public_root.join(&relative);

        Ok(Some(Located {
            source,
            relative,
            target,
            format,
            key,
        }))
    }

    /// Normalized reference and absolute path of `src`, if it is a safe
    /// relative reference to an existing file under the public root.
    ///
    /// The normalized form drops surrounding whitespace and `.` components
    /// and joins the rest with `/`, so every spelling of one file keys the
    /// same. Symlinks are followed only while they stay inside the root.
    fn resolve_source(&self, src: &str) -> Option<(String, PathBuf)> {
        let mut parts = Vec::new();
        for component in Path::new(src.trim()).components() {
            match component {
                Component::Normal(part) => parts.push(part.to_str()?),
                Component::CurDir => {}
                _ => return None,
            }
        }
        if parts.is_empty() {
            return None;
        }
        let normalized = parts.join("/");
        let path = self.settings.public_root.join(&normalized);
        if !path.is_file() {
            return None;
        }

        let root = self.settings.public_root.canonicalize().ok()?;
        let resolved = path.canonicalize().ok()?;
        if !resolved.starts_with(&root) {
            debug!(source = src, resolved = %resolved.display(), "source escapes public root");
            return None;
        }
        Some((normalized, path))
    }

    /// Decode, transform, encode and persist. The decoded image is dropped
    /// on every path out of here.
    fn produce<F>(&self, located: &Located, transform: F) -> Result<(), DeriveError>
    where
        F: FnOnce(C::Image) -> Result<C::Image, CodecError>,
    {
        let bytes = fs::read(&located.source)?;
        let image = self.codec.decode(&bytes)?;
        let image = transform(image)?;
        let encoded = self
            .codec
            .encode(&image, located.format, self.settings.quality)?;
        drop(image);
        self.write_atomically(&located.target, &encoded)?;
        Ok(())
    }

    /// Create `dir` and any missing parents. Already existing is success,
    /// including when a concurrent caller created it first.
    fn ensure_dir(&self, dir: &Path) -> io::Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(self.settings.dir_mode);
        }
        builder.create(dir)
    }

    /// Write through a temp file in the target directory and rename into
    /// place. The temp file is removed if anything fails.
    fn write_atomically(&self, target: &Path, bytes: &[u8]) -> io::Result<()> {
        let dir = target.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = self.settings.dir_mode & 0o666;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(mode))?;
        }
        tmp.persist(target).map_err(|e| e.error)?;
        Ok(())
    }

    fn failed(&self, category: &str, src: &str, err: DeriveError) -> Derivation {
        error!(source = src, category, error = %err, "derivation failed");
        Derivation::Failed(err)
    }
}

fn upscale_param(allow_upscale: bool) -> Param {
    Param::from(if allow_upscale { "upscale" } else { "noupscale" })
}

/// Padding used by `fit` when the caller gives no background.
fn default_fill(src: &str) -> Background {
    let supports_alpha = Path::new(src)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(OutputFormat::from_extension)
        .is_none_or(OutputFormat::supports_alpha);
    if supports_alpha {
        Background::Transparent
    } else {
        Background::white()
    }
}

/// Tallies of derivation outcomes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub created: u32,
    pub missing: u32,
    pub failed: u32,
}

impl CacheStats {
    pub fn record(&mut self, status: DerivationStatus) {
        match status {
            DerivationStatus::Hit => self.hits += 1,
            DerivationStatus::Created => self.created += 1,
            DerivationStatus::Missing => self.missing += 1,
            DerivationStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.hits + self.created + self.missing + self.failed
    }

    /// Whether every request produced a derivative.
    pub fn all_available(&self) -> bool {
        self.missing == 0 && self.failed == 0
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(f, "{} cached, {} created", self.hits, self.created)?;
        } else {
            write!(f, "{} created", self.created)?;
        }
        if self.missing > 0 {
            write!(f, ", {} missing", self.missing)?;
        }
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        if self.total() != self.created {
            write!(f, " ({} total)", self.total())?;
        }
        Ok(())
    }
}
