//! Prism Core: concurrent image color analysis library.
//!
//! Prism ingests a list of image locations, retrieves each image's bytes,
//! and reports the most frequently occurring colors per image.
//!
//! # Architecture
//!
//! A bounded, cancellable, two-stage pipeline with fan-out/fan-in semantics:
//!
//! ```text
//! locations → Fetch (≤ D in flight) → items → Analyze (≤ W in flight) → results
//! ```
//!
//! Each fetch and each analysis runs as its own task, admitted by a counting
//! [`AdmissionGate`] rather than a fixed worker pool. Failed units (network
//! errors, undecodable bytes) are logged and dropped; the caller only ever
//! sees successful results, in completion order.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use prism_core::{Config, HttpFetcher, LocationSource, Pipeline};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> prism_core::Result<()> {
//!     let config = Config::load()?;
//!     let fetcher = Arc::new(HttpFetcher::from_config(&config.fetch, &config.limits)?);
//!     let pipeline = Pipeline::new(config.clone(), fetcher)?;
//!
//!     let cancel = CancellationToken::new();
//!     let locations = LocationSource::from_path("urls.txt")?
//!         .stream(config.pipeline.buffer_size, cancel.clone());
//!     let mut results = pipeline.run(locations, cancel);
//!     while let Some(result) = results.recv().await {
//!         println!("{}: {:?}", result.name, result.colors);
//!     }
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod histogram;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, PipelineError, PipelineResult, PrismError, Result};
pub use histogram::rank_colors;
pub use pipeline::{AdmissionGate, HttpFetcher, ImageFetcher, Pipeline};
pub use sink::{OutputFormat, ResultWriter};
pub use source::LocationSource;
pub use types::{ColorCount, ImageItem, ResultItem, RunStats, StatsSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
