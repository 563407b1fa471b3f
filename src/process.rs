//! Batch warming.
//!
//! Derives a list of requests ahead of time so web requests only ever see
//! cache hits. The list is a JSON array of [`DerivativeRequest`]s:
//!
//! ```json
//! [
//!   { "source": "avatars/ana.jpg", "op": "fit-to-square", "length": 64 },
//!   { "source": "posts/hero.png", "op": "fit-aspect-ratio", "width": 1200, "ratio": 2.0 }
//! ]
//! ```
//!
//! ## Parallel Processing
//!
//! Requests are derived in parallel using [rayon](https://docs.rs/rayon). The
//! cache needs no coordination between workers: duplicate requests resolve to
//! the same path and the atomic rename makes the last writer win harmlessly.
//! Progress is reported over an optional channel as each request finishes, so
//! events arrive in completion order while [`WarmReport::results`] keeps input
//! order.

use crate::cache::{CacheStats, DerivationStatus, DerivativeCache};
use crate::imaging::ImageCodec;
use crate::types::DerivativeRequest;
use rayon::prelude::*;
use std::path::Path;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read a request list from a JSON file.
pub fn load_requests(path: &Path) -> Result<Vec<DerivativeRequest>, ProcessError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Outcome of one request in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct WarmResult {
    pub source: String,
    /// Operation tag, e.g. `fit-to-square`.
    pub operation: &'static str,
    pub status: DerivationStatus,
    /// Relative derivative path when one is available.
    pub path: Option<String>,
}

/// Progress events emitted while a batch is warmed.
#[derive(Debug, Clone)]
pub enum WarmEvent {
    /// Sent once before any work starts.
    Started { total: usize },
    /// Sent as each request finishes. `index` is its position in the batch.
    Derived { index: usize, result: WarmResult },
}

#[derive(Debug)]
pub struct WarmReport {
    /// One entry per request, in input order.
    pub results: Vec<WarmResult>,
    pub stats: CacheStats,
}

/// Derive every request through `cache` on the current rayon pool.
///
/// Never fails as a whole: each request's outcome is in the report.
pub fn warm<C: ImageCodec>(
    cache: &DerivativeCache<C>,
    requests: &[DerivativeRequest],
    events: Option<Sender<WarmEvent>>,
) -> WarmReport {
    if let Some(tx) = &events {
        tx.send(WarmEvent::Started {
            total: requests.len(),
        })
        .ok();
    }

    let results: Vec<WarmResult> = requests
        .par_iter()
        .enumerate()
        .map(|(index, request)| {
            let derivation = request.operation.apply(cache, &request.source);
            let result = WarmResult {
                source: request.source.clone(),
                operation: request.operation.name(),
                status: derivation.status(),
                path: derivation.into_path(),
            };
            if let Some(tx) = &events {
                tx.send(WarmEvent::Derived {
                    index,
                    result: result.clone(),
                })
                .ok();
            }
            result
        })
        .collect();

    let mut stats = CacheStats::default();
    for result in &results {
        stats.record(result.status);
    }
    WarmReport { results, stats }
}
