//! Pipeline orchestration: wires the fetch and analysis stages together.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::ConfigError;
use crate::types::{ResultItem, RunStats};

use super::analyze::AnalysisStage;
use super::fetch::{FetchStage, ImageFetcher};
use super::gate::AdmissionGate;

/// The two-stage color analysis pipeline.
///
/// Composes the fetch and analysis stages behind one bounded channel and a
/// single cancellation token; the orchestrator itself buffers nothing beyond
/// the stage channels and transforms no data.
pub struct Pipeline {
    config: Config,
    fetcher: Arc<dyn ImageFetcher>,
    stats: Arc<RunStats>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("fetcher", &"Arc<dyn ImageFetcher>")
            .field("stats", &self.stats)
            .finish()
    }
}

impl Pipeline {
    /// Build a pipeline from validated configuration.
    ///
    /// Out-of-range values (zero concurrency, zero top_n, zero buffers) fail
    /// here, before any channel or task exists, so there is never a
    /// partially started pipeline.
    pub fn new(config: Config, fetcher: Arc<dyn ImageFetcher>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            fetcher,
            stats: Arc::new(RunStats::default()),
        })
    }

    /// Counters shared with the stages; useful for an end-of-run summary.
    pub fn stats(&self) -> Arc<RunStats> {
        self.stats.clone()
    }

    /// Run the pipeline over a stream of locations.
    ///
    /// Results arrive in completion order, not input order. The returned
    /// channel closes once the location stream is exhausted (or `cancel`
    /// fires) and every in-flight unit has settled; that closure is the
    /// only end-of-processing signal.
    ///
    /// Cancelling `cancel` stops further admissions in both stages promptly;
    /// units already running finish or abandon their sends, so the channel
    /// still closes in bounded time even if the caller has stopped reading.
    pub fn run(
        &self,
        locations: mpsc::Receiver<String>,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<ResultItem> {
        let buffer = self.config.pipeline.buffer_size;
        let (items_tx, items_rx) = mpsc::channel(buffer);
        let (results_tx, results_rx) = mpsc::channel(buffer);

        FetchStage::new(
            self.fetcher.clone(),
            AdmissionGate::new(self.config.fetch.concurrency),
            self.stats.clone(),
            cancel.clone(),
        )
        .spawn(locations, items_tx);

        AnalysisStage::new(
            AdmissionGate::new(self.config.analysis.concurrency),
            self.config.analysis.top_n,
            self.config.limits.decode_timeout_ms,
            self.stats.clone(),
            cancel,
        )
        .spawn(items_rx, results_tx);

        results_rx
    }
}
