//! Loader telemetry for observability.
//!
//! Lock-free atomic counters recording what a paging loader has done, with
//! point-in-time snapshots for display or serialization.
//!
//! # Example
//!
//! ```
//! use quadpager::telemetry::LoaderMetrics;
//!
//! let metrics = LoaderMetrics::new();
//! metrics.tile_requested();
//! metrics.tile_loaded();
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.tiles_requested, 1);
//! assert_eq!(snapshot.tiles_loaded, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic event counters for one paging loader.
#[derive(Debug, Default)]
pub struct LoaderMetrics {
    tiles_requested: AtomicU64,
    tiles_loaded: AtomicU64,
    tiles_failed: AtomicU64,
    fetches_cancelled: AtomicU64,
    completions_discarded: AtomicU64,
}

impl LoaderMetrics {
    /// Creates a zeroed metrics instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a tile becoming wanted.
    pub fn tile_requested(&self) {
        self.tiles_requested.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a tile handed to the interpreter without a fetch error.
    pub fn tile_loaded(&self) {
        self.tiles_loaded.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a tile handed to the interpreter with a fetch error.
    pub fn tile_failed(&self) {
        self.tiles_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a fetch cancelled because its tile became unwanted.
    pub fn fetch_cancelled(&self) {
        self.fetches_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a completion discarded (late arrival after cancel/shutdown).
    pub fn completion_discarded(&self) {
        self.completions_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of all counters.
    pub fn snapshot(&self) -> LoaderSnapshot {
        LoaderSnapshot {
            tiles_requested: self.tiles_requested.load(Ordering::Relaxed),
            tiles_loaded: self.tiles_loaded.load(Ordering::Relaxed),
            tiles_failed: self.tiles_failed.load(Ordering::Relaxed),
            fetches_cancelled: self.fetches_cancelled.load(Ordering::Relaxed),
            completions_discarded: self.completions_discarded.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of loader counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoaderSnapshot {
    /// Tiles announced wanted by the sampling layer.
    pub tiles_requested: u64,
    /// Tiles interpreted successfully.
    pub tiles_loaded: u64,
    /// Tiles interpreted with a fetch error recorded.
    pub tiles_failed: u64,
    /// Fetches cancelled before completion.
    pub fetches_cancelled: u64,
    /// Completions dropped after cancel or shutdown.
    pub completions_discarded: u64,
}

/// Installs a global tracing subscriber reading `RUST_LOG`.
///
/// Intended for binaries and examples; safe to call more than once (later
/// calls are no-ops).
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = LoaderMetrics::new();
        metrics.tile_requested();
        metrics.tile_requested();
        metrics.tile_loaded();
        metrics.tile_failed();
        metrics.fetch_cancelled();
        metrics.completion_discarded();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tiles_requested, 2);
        assert_eq!(snapshot.tiles_loaded, 1);
        assert_eq!(snapshot.tiles_failed, 1);
        assert_eq!(snapshot.fetches_cancelled, 1);
        assert_eq!(snapshot.completions_discarded, 1);
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let metrics = LoaderMetrics::new();
        let before = metrics.snapshot();
        metrics.tile_loaded();
        assert_eq!(before.tiles_loaded, 0);
        assert_eq!(metrics.snapshot().tiles_loaded, 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = LoaderMetrics::new();
        metrics.tile_loaded();
        let json = serde_json::to_string(&metrics.snapshot()).unwrap();
        assert!(json.contains("\"tiles_loaded\":1"));
    }
}
