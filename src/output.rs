//! CLI output formatting.
//!
//! stdout carries data only: a derive command prints the derivative's
//! relative path and nothing else, so `$(derivcache fit …)` can be used in
//! scripts. `warm` prints a progress listing followed by a summary.
//!
//! # Output Format
//!
//! ## Warm
//!
//! ```text
//! Warming 3 derivatives
//!     001 fit-to-square avatars/ana.jpg
//!         cached: cache/images/3fa2/9c1e0b7a51d2e4f0.jpg
//!     002 square avatars/bob.jpg
//!         missing
//!     003 fit-aspect-ratio posts/hero.png
//!         created: cache/images/07bd/1b2c3d4e5f607182.png
//! Cache: 1 cached, 1 created, 1 missing (3 total)
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>` or `String`)
//! for testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::cache::{CacheStats, DerivationStatus};
use crate::process::{WarmEvent, WarmResult};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Status line for one result: the status, plus the path when there is one.
fn status_line(result: &WarmResult) -> String {
    match &result.path {
        Some(path) => format!("{}{}: {}", indent(2), result.status, path),
        None => format!("{}{}", indent(2), result.status),
    }
}

// ============================================================================
// Warm output
// ============================================================================

/// Format a single warm progress event as display lines.
///
/// Each request leads with its positional index (1-based, input order), the
/// operation and the source; the outcome is shown as indented context.
pub fn format_warm_event(event: &WarmEvent) -> Vec<String> {
    match event {
        WarmEvent::Started { total } => {
            let noun = if *total == 1 { "derivative" } else { "derivatives" };
            vec![format!("Warming {} {}", total, noun)]
        }
        WarmEvent::Derived { index, result } => vec![
            format!(
                "{}{} {} {}",
                indent(1),
                format_index(index + 1),
                result.operation,
                result.source
            ),
            status_line(result),
        ],
    }
}

/// Print a warm progress event to stdout.
pub fn print_warm_event(event: &WarmEvent) {
    for line in format_warm_event(event) {
        println!("{}", line);
    }
}

/// One-line batch summary.
pub fn format_warm_summary(stats: &CacheStats) -> String {
    format!("Cache: {}", stats)
}

pub fn print_warm_summary(stats: &CacheStats) {
    println!("{}", format_warm_summary(stats));
}

// ============================================================================
// Single derivations
// ============================================================================

/// Explanation for a derivation that produced no path, for stderr.
///
/// Returns `None` for the two success statuses.
pub fn format_unavailable(source: &str, status: DerivationStatus) -> Option<String> {
    match status {
        DerivationStatus::Hit | DerivationStatus::Created => None,
        DerivationStatus::Missing => Some(format!("{}: source not found", source)),
        DerivationStatus::Failed => Some(format!("{}: derivation failed", source)),
    }
}
