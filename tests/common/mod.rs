//! Test doubles for driving the pipeline without Kafka or the network.

#![allow(dead_code)]

use feeder_codecs::EncodedRecord;
use rdkafka::error::KafkaError;
use rdkafka::types::RDKafkaErrorCode;
use record_source::{RecordSource, SourceError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use topic_feeder::{Delivery, Publisher, TransportError};

pub const PARIS: &str = r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[2.347,48.859]},"properties":{"label":"Paris","score":0.97,"city":"Paris","postcode":"75001","context":"75, Paris, Île-de-France","importance":0.67}}"#;

pub const NIMES: &str = r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[4.36,43.83]},"properties":{"label":"Nîmes","score":0.95,"city":"Nîmes","postcode":"30000","context":"30, Gard, Occitanie"}}"#;

/// Records every sent record; can be told to fail specific sends.
#[derive(Default)]
pub struct RecordingPublisher {
    records: Mutex<Vec<EncodedRecord>>,
    fail_on: Vec<usize>,
    attempts: AtomicUsize,
    flushes: AtomicUsize,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the sends with these zero-based attempt numbers.
    pub fn failing_on(attempts: &[usize]) -> Self {
        Self {
            fail_on: attempts.to_vec(),
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<EncodedRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Publisher for RecordingPublisher {
    async fn send(&self, record: &EncodedRecord) -> Result<Delivery, TransportError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.contains(&attempt) {
            return Err(TransportError::Delivery {
                topic: record.topic.clone(),
                source: KafkaError::MessageProduction(RDKafkaErrorCode::MessageTimedOut),
            });
        }
        let mut records = self.records.lock().unwrap();
        records.push(record.clone());
        Ok(Delivery {
            partition: 0,
            offset: records.len() as i64 - 1,
        })
    }

    async fn flush(&self) -> Result<(), TransportError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Returns fixed documents; the first `failures` fetches fail.
pub struct StaticSource {
    documents: Vec<String>,
    failures: usize,
    fetches: AtomicUsize,
}

impl StaticSource {
    pub fn new(documents: &[&str]) -> Self {
        Self {
            documents: documents.iter().map(|d| d.to_string()).collect(),
            failures: 0,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing_first(mut self, failures: usize) -> Self {
        self.failures = failures;
        self
    }
}

#[async_trait::async_trait]
impl RecordSource for StaticSource {
    fn describe(&self) -> String {
        format!("{} static documents", self.documents.len())
    }

    async fn fetch(&self, _query: &str) -> Result<Vec<String>, SourceError> {
        let fetch = self.fetches.fetch_add(1, Ordering::SeqCst);
        if fetch < self.failures {
            return Err(SourceError::Status {
                url: "http://search.invalid".to_string(),
                status: 503,
            });
        }
        Ok(self.documents.clone())
    }
}
