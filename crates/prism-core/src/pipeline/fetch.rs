//! Fetch stage: bounded concurrent retrieval of image bytes.
//!
//! Each incoming location is fetched in its own spawned task, admitted by
//! the stage's [`AdmissionGate`] so at most D retrievals are in flight at
//! once. Failed locations are logged and dropped; they never appear
//! downstream. Output order follows completion, not input order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::{FetchConfig, LimitsConfig};
use crate::error::PipelineError;
use crate::types::{ImageItem, RunStats};

use super::gate::AdmissionGate;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Retrieval transport: given a location, return the raw bytes or fail.
///
/// The pipeline depends on this abstractly so tests can script fetch
/// behavior without a network.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, PipelineError>;
}

/// HTTP transport backed by a shared `reqwest` client.
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl HttpFetcher {
    /// Build a fetcher with its own client configured from the settings.
    pub fn from_config(fetch: &FetchConfig, limits: &LimitsConfig) -> crate::error::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(fetch.timeout_ms))
            .build()?;
        Ok(Self::new(client, limits))
    }

    /// Wrap an existing client.
    pub fn new(client: reqwest::Client, limits: &LimitsConfig) -> Self {
        Self {
            client,
            max_bytes: limits.max_download_mb * BYTES_PER_MB,
        }
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, PipelineError> {
        let response = self
            .client
            .get(location)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| PipelineError::Fetch {
                location: location.to_string(),
                message: e.to_string(),
            })?;

        // Reject oversized bodies up front when the origin declares a length,
        // and again while streaming in case it lied or omitted one.
        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                return Err(PipelineError::TooLarge {
                    location: location.to_string(),
                    size_mb: length / BYTES_PER_MB,
                    max_mb: self.max_bytes / BYTES_PER_MB,
                });
            }
        }

        let mut data = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| PipelineError::Fetch {
                location: location.to_string(),
                message: e.to_string(),
            })?;
            if (data.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(PipelineError::TooLarge {
                    location: location.to_string(),
                    size_mb: (data.len() + chunk.len()) as u64 / BYTES_PER_MB,
                    max_mb: self.max_bytes / BYTES_PER_MB,
                });
            }
            data.extend_from_slice(&chunk);
        }

        Ok(data)
    }
}

/// The fetch stage itself: drives locations through the transport under the
/// admission gate and emits [`ImageItem`]s.
pub(crate) struct FetchStage {
    fetcher: Arc<dyn ImageFetcher>,
    gate: AdmissionGate,
    stats: Arc<RunStats>,
    cancel: CancellationToken,
}

impl FetchStage {
    pub(crate) fn new(
        fetcher: Arc<dyn ImageFetcher>,
        gate: AdmissionGate,
        stats: Arc<RunStats>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            gate,
            stats,
            cancel,
        }
    }

    /// Run the stage to completion on its own task.
    ///
    /// The items sender is dropped only after every admitted retrieval has
    /// settled, so the downstream channel closes exactly when the stage is
    /// truly done.
    pub(crate) fn spawn(
        self,
        locations: mpsc::Receiver<String>,
        items: mpsc::Sender<ImageItem>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(locations, items))
    }

    async fn run(self, mut locations: mpsc::Receiver<String>, items: mpsc::Sender<ImageItem>) {
        let mut in_flight = JoinSet::new();

        loop {
            let location = tokio::select! {
                _ = self.cancel.cancelled() => break,
                next = locations.recv() => match next {
                    Some(location) => location,
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

            let fetcher = self.fetcher.clone();
            let stats = self.stats.clone();
            let cancel = self.cancel.clone();
            let items = items.clone();
            in_flight.spawn(async move {
                // Held for the whole retrieval; drops on every exit path.
                let _permit = permit;
                match fetcher.fetch(&location).await {
                    Ok(data) => {
                        stats.record_fetched();
                        let item = ImageItem {
                            name: location,
                            data,
                        };
                        tokio::select! {
                            _ = cancel.cancelled() => {}
                            sent = items.send(item) => {
                                if sent.is_err() {
                                    tracing::debug!("Fetch stage output closed, item discarded");
                                }
                            }
                        }
                    }
                    Err(e) => {
                        stats.record_fetch_failure();
                        tracing::warn!("{e}");
                    }
                }
            });
        }

        // Let in-flight retrievals finish (or bail via the token) before the
        // sender drops and closes the stage output.
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Fetch task failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scripted transport: succeeds with one-byte payloads unless the
    /// location is listed as failing; tracks concurrency for gate assertions.
    struct MockFetcher {
        failing: HashSet<String>,
        delay: Option<Duration>,
        calls: AtomicU32,
        in_flight: AtomicU32,
        max_concurrent: AtomicU32,
    }

    impl MockFetcher {
        fn new() -> Self {
            Self {
                failing: HashSet::new(),
                delay: None,
                calls: AtomicU32::new(0),
                in_flight: AtomicU32::new(0),
                max_concurrent: AtomicU32::new(0),
            }
        }

        fn failing_on(mut self, location: &str) -> Self {
            self.failing.insert(location.to_string());
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl ImageFetcher for MockFetcher {
        async fn fetch(&self, location: &str) -> Result<Vec<u8>, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_concurrent.fetch_max(current, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(location) {
                Err(PipelineError::Fetch {
                    location: location.to_string(),
                    message: "connection refused".to_string(),
                })
            } else {
                Ok(vec![0u8])
            }
        }
    }

    async fn run_stage(
        fetcher: Arc<MockFetcher>,
        locations: Vec<&str>,
        concurrency: usize,
        cancel: CancellationToken,
    ) -> (Vec<ImageItem>, Arc<RunStats>) {
        let stats = Arc::new(RunStats::default());
        let (loc_tx, loc_rx) = mpsc::channel(8);
        let (item_tx, mut item_rx) = mpsc::channel(8);

        let stage = FetchStage::new(
            fetcher,
            AdmissionGate::new(concurrency),
            stats.clone(),
            cancel,
        );
        stage.spawn(loc_rx, item_tx);

        for location in locations {
            loc_tx.send(location.to_string()).await.unwrap();
        }
        drop(loc_tx);

        let mut received = Vec::new();
        while let Some(item) = item_rx.recv().await {
            received.push(item);
        }
        (received, stats)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_emits_all_successful_items() {
        let fetcher = Arc::new(MockFetcher::new());
        let (items, stats) = run_stage(
            fetcher,
            vec!["a", "b", "c"],
            2,
            CancellationToken::new(),
        )
        .await;

        let names: HashSet<String> = items.into_iter().map(|i| i.name).collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains("a") && names.contains("b") && names.contains("c"));
        assert_eq!(stats.snapshot().fetched, 3);
        assert_eq!(stats.snapshot().fetch_failures, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_location_is_dropped() {
        let fetcher = Arc::new(MockFetcher::new().failing_on("bad"));
        let (items, stats) = run_stage(
            fetcher,
            vec!["a", "bad", "b"],
            2,
            CancellationToken::new(),
        )
        .await;

        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.name != "bad"));
        assert_eq!(stats.snapshot().fetch_failures, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fetch_respects_admission_gate() {
        let fetcher = Arc::new(MockFetcher::new().with_delay(Duration::from_millis(30)));
        let locations: Vec<String> = (0..12).map(|i| format!("img-{i}")).collect();
        let (items, _) = run_stage(
            fetcher.clone(),
            locations.iter().map(|s| s.as_str()).collect(),
            3,
            CancellationToken::new(),
        )
        .await;

        assert_eq!(items.len(), 12);
        let observed = fetcher.max_concurrent.load(Ordering::SeqCst);
        assert!(observed <= 3, "gate violated: {observed} fetches in flight");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cancellation_stops_admissions_and_closes_output() {
        let fetcher = Arc::new(MockFetcher::new().with_delay(Duration::from_millis(200)));
        let stats = Arc::new(RunStats::default());
        let cancel = CancellationToken::new();
        let (loc_tx, loc_rx) = mpsc::channel(64);
        let (item_tx, mut item_rx) = mpsc::channel(64);

        let stage = FetchStage::new(
            fetcher.clone(),
            AdmissionGate::new(1),
            stats,
            cancel.clone(),
        );
        stage.spawn(loc_rx, item_tx);

        for i in 0..32 {
            loc_tx.send(format!("img-{i}")).await.unwrap();
        }

        // Let the first unit start, then cancel with most locations pending.
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();

        let drained = tokio::time::timeout(Duration::from_secs(1), async {
            let mut count = 0;
            while item_rx.recv().await.is_some() {
                count += 1;
            }
            count
        })
        .await
        .expect("output did not close after cancellation");

        // Only units admitted before the signal may have completed.
        let calls = fetcher.calls.load(Ordering::SeqCst);
        assert!(calls <= 2, "admitted {calls} fetches after cancellation");
        assert!(drained <= calls as usize);
    }
}
