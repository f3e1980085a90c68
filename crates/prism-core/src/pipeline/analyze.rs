//! Analysis stage: bounded concurrent decode and color ranking.
//!
//! Mirrors the fetch stage's shape: one spawned task per item, admitted by
//! the stage gate so at most W analyses run at once. The decode and pixel
//! scan are CPU-bound and run on the blocking pool under a timeout. Items
//! that fail to decode are logged and dropped.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::histogram::rank_colors;
use crate::types::{ImageItem, ResultItem, RunStats};

use super::gate::AdmissionGate;

pub(crate) struct AnalysisStage {
    gate: AdmissionGate,
    top_n: usize,
    decode_timeout_ms: u64,
    stats: Arc<RunStats>,
    cancel: CancellationToken,
}

impl AnalysisStage {
    pub(crate) fn new(
        gate: AdmissionGate,
        top_n: usize,
        decode_timeout_ms: u64,
        stats: Arc<RunStats>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            gate,
            top_n,
            decode_timeout_ms,
            stats,
            cancel,
        }
    }

    /// Run the stage to completion on its own task; the results sender drops
    /// once every admitted analysis has settled.
    pub(crate) fn spawn(
        self,
        items: mpsc::Receiver<ImageItem>,
        results: mpsc::Sender<ResultItem>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(items, results))
    }

    async fn run(self, mut items: mpsc::Receiver<ImageItem>, results: mpsc::Sender<ResultItem>) {
        let mut in_flight = JoinSet::new();

        loop {
            let item = tokio::select! {
                _ = self.cancel.cancelled() => break,
                next = items.recv() => match next {
                    Some(item) => item,
                    None => break,
                },
            };

            let permit = tokio::select! {
                _ = self.cancel.cancelled() => break,
                permit = self.gate.admit() => match permit {
                    Some(permit) => permit,
                    None => break,
                },
            };

            let top_n = self.top_n;
            let timeout_ms = self.decode_timeout_ms;
            let stats = self.stats.clone();
            let cancel = self.cancel.clone();
            let results = results.clone();
            in_flight.spawn(async move {
                let _permit = permit;
                match analyze_item(item, top_n, timeout_ms).await {
                    Ok(result) => {
                        stats.record_analyzed();
                        tokio::select! {
                            _ = cancel.cancelled() => {}
                            sent = results.send(result) => {
                                if sent.is_err() {
                                    tracing::debug!("Analysis stage output closed, result discarded");
                                }
                            }
                        }
                    }
                    Err(e) => {
                        stats.record_decode_failure();
                        tracing::warn!("{e}");
                    }
                }
            });
        }

        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Analysis task failed: {e}");
            }
        }
    }
}

/// Decode one item and rank its colors on the blocking pool, bounded by the
/// configured timeout.
async fn analyze_item(
    item: ImageItem,
    top_n: usize,
    timeout_ms: u64,
) -> Result<ResultItem, PipelineError> {
    let name = item.name.clone();
    let work = tokio::task::spawn_blocking(move || decode_and_rank(item, top_n));

    match tokio::time::timeout(Duration::from_millis(timeout_ms), work).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(PipelineError::Decode {
            location: name,
            message: format!("task join error: {e}"),
        }),
        Err(_) => Err(PipelineError::Timeout {
            location: name,
            stage: "analyze".to_string(),
            timeout_ms,
        }),
    }
}

/// Synchronous decode + histogram scan (runs in `spawn_blocking`).
///
/// The format is detected from the bytes, never from the location string, so
/// a PNG served from a `.jpg` URL still decodes.
fn decode_and_rank(item: ImageItem, top_n: usize) -> Result<ResultItem, PipelineError> {
    let ImageItem { name, data } = item;

    let reader = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| PipelineError::Decode {
            location: name.clone(),
            message: format!("cannot detect image format: {e}"),
        })?;
    let decoded = reader.decode().map_err(|e| PipelineError::Decode {
        location: name.clone(),
        message: e.to_string(),
    })?;

    let colors = rank_colors(&decoded.to_rgb8(), top_n)?;
    Ok(ResultItem { name, colors })
}
