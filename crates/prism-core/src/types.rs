//! Core data types flowing through the Prism pipeline.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A fetched image: the originating location name plus raw encoded bytes.
///
/// Produced by the fetch stage, consumed exactly once by the analysis stage.
#[derive(Debug, Clone)]
pub struct ImageItem {
    /// The location the image was fetched from (used as the result name)
    pub name: String,

    /// Raw encoded image bytes, format not yet known
    pub data: Vec<u8>,
}

/// A distinct color and its pixel occurrence count within one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorCount {
    /// Six uppercase hex digits, no leading marker ("FF0000")
    pub hex: String,

    /// Number of pixels with exactly this RGB value
    pub count: u64,
}

/// Final per-image output: name plus colors ranked by frequency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultItem {
    /// The originating location
    pub name: String,

    /// At most N colors, count descending, ties by ascending hex
    pub colors: Vec<ColorCount>,
}

/// Counters updated by the pipeline stages as units succeed or drop.
///
/// Failed units never reach the output channel; these counters are the only
/// place their number is visible outside the log stream. Shared across
/// concurrently running units, hence atomics.
#[derive(Debug, Default)]
pub struct RunStats {
    fetched: AtomicU64,
    fetch_failures: AtomicU64,
    analyzed: AtomicU64,
    decode_failures: AtomicU64,
}

impl RunStats {
    pub(crate) fn record_fetched(&self) {
        self.fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_analyzed(&self) {
        self.analyzed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time view of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            fetched: self.fetched.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            analyzed: self.analyzed.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
        }
    }
}

/// Plain-value copy of [`RunStats`] for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Locations fetched successfully
    pub fetched: u64,

    /// Locations dropped by the fetch stage
    pub fetch_failures: u64,

    /// Items analyzed successfully
    pub analyzed: u64,

    /// Items dropped by the analysis stage
    pub decode_failures: u64,
}
