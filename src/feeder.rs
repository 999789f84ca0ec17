//! The fetch, encode and publish pipeline.

use crate::publisher::Publisher;
use anyhow::Context;
use feeder_codecs::{Codec, InputRecord, SchemaRegistry};
use rand::rngs::StdRng;
use rand::SeedableRng;
use record_source::RecordSource;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records returned by the source
    pub fetched: usize,
    /// Records acknowledged by the transport
    pub produced: usize,
    /// Records that failed to encode or to send
    pub failed: usize,
}

/// Outcome of repeat mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepeatSummary {
    pub runs: usize,
    pub failed_runs: usize,
    pub produced: usize,
    pub failed: usize,
}

/// Feeds one topic: fetches records, encodes each with the selected codec
/// and publishes it, one record at a time.
pub struct Feeder {
    source: Box<dyn RecordSource>,
    codec: Box<dyn Codec>,
    registry: Arc<dyn SchemaRegistry>,
    publisher: Arc<dyn Publisher>,
    topic: String,
    query: String,
    rng: StdRng,
}

impl Feeder {
    pub fn new(
        source: Box<dyn RecordSource>,
        codec: Box<dyn Codec>,
        registry: Arc<dyn SchemaRegistry>,
        publisher: Arc<dyn Publisher>,
        topic: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            source,
            codec,
            registry,
            publisher,
            topic: topic.into(),
            query: query.into(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Use a fixed RNG for keys and other random choices.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Register schemas unless they already are or the format has none.
    /// Failures are logged; the records of this run then fail to encode one
    /// by one.
    async fn ensure_registered(&mut self) {
        if !self.codec.format().uses_schema_registry() || self.codec.is_ready() {
            return;
        }
        match self
            .codec
            .register_schemas(self.registry.as_ref(), &self.topic)
            .await
        {
            Ok(()) => debug!(
                "Registered {} schemas for topic '{}'",
                self.codec.format(),
                self.topic
            ),
            Err(e) => warn!(
                "Failed to register {} schemas for topic '{}': {e}",
                self.codec.format(),
                self.topic
            ),
        }
    }

    /// Fetch, encode and publish every record once.
    ///
    /// Per-record encoding and transport failures are logged and counted.
    /// Only a failed fetch or flush fails the run.
    pub async fn run_once(&mut self) -> anyhow::Result<RunSummary> {
        self.ensure_registered().await;

        let records = self
            .source
            .fetch(&self.query)
            .await
            .with_context(|| format!("Failed to fetch records from {}", self.source.describe()))?;

        let mut summary = RunSummary {
            fetched: records.len(),
            ..Default::default()
        };

        for raw in records {
            let input = InputRecord::new(raw);
            let encoded = match self.codec.encode(&input, &self.topic, &mut self.rng) {
                Ok(encoded) => encoded,
                Err(e) => {
                    warn!("Skipping record, {} encoding failed: {e}", self.codec.format());
                    summary.failed += 1;
                    continue;
                }
            };

            match self.publisher.send(&encoded).await {
                Ok(delivery) => {
                    info!(
                        "A new record has been produced to partition {} with offset {}",
                        delivery.partition, delivery.offset
                    );
                    summary.produced += 1;
                }
                Err(e) => {
                    warn!("{e}");
                    summary.failed += 1;
                }
            }
        }

        self.publisher
            .flush()
            .await
            .context("Failed to flush produced records")?;

        info!(
            "Run finished: {} fetched, {} produced, {} failed",
            summary.fetched, summary.produced, summary.failed
        );
        Ok(summary)
    }

    /// Run repeatedly, starting a run every `interval`. A run that takes
    /// longer delays the next one; runs never overlap. Failed runs are
    /// logged and do not stop the loop. `limit` bounds the number of runs.
    pub async fn run_every(&mut self, interval: Duration, limit: Option<usize>) -> RepeatSummary {
        let mut repeat = RepeatSummary::default();

        while limit.is_none_or(|limit| repeat.runs < limit) {
            let start = Instant::now();
            match self.run_once().await {
                Ok(summary) => {
                    repeat.produced += summary.produced;
                    repeat.failed += summary.failed;
                }
                Err(e) => {
                    warn!("Run failed: {e:#}");
                    repeat.failed_runs += 1;
                }
            }
            repeat.runs += 1;

            let elapsed = start.elapsed();
            if elapsed < interval && limit.is_none_or(|limit| repeat.runs < limit) {
                tokio::time::sleep(interval - elapsed).await;
            }
        }
        repeat
    }
}
