//! Delivery of encoded records to Kafka.

use crate::config::Properties;
use feeder_codecs::EncodedRecord;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::ClientConfig;
use std::time::Duration;
use thiserror::Error;

const QUEUE_TIMEOUT: Duration = Duration::from_secs(30);
const FLUSH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to create Kafka producer: {0}")]
    Client(#[source] KafkaError),

    #[error("Failed to deliver record to topic '{topic}': {source}")]
    Delivery {
        topic: String,
        #[source]
        source: KafkaError,
    },

    #[error("Failed to flush producer: {0}")]
    Flush(#[source] KafkaError),
}

/// Where a record landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub partition: i32,
    pub offset: i64,
}

/// Hands encoded records to a transport.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    /// Send one record and wait for its delivery report.
    async fn send(&self, record: &EncodedRecord) -> Result<Delivery, TransportError>;

    /// Wait for outstanding records to be delivered.
    async fn flush(&self) -> Result<(), TransportError>;
}

/// Publisher backed by an rdkafka [`FutureProducer`].
pub struct KafkaPublisher {
    producer: FutureProducer,
}

impl KafkaPublisher {
    /// Build a producer from client properties, passed through as-is.
    pub fn new(properties: &Properties) -> Result<Self, TransportError> {
        let mut config = ClientConfig::new();
        for (key, value) in properties.iter() {
            config.set(key, value);
        }
        let producer: FutureProducer = config.create().map_err(TransportError::Client)?;
        Ok(Self { producer })
    }
}

#[async_trait::async_trait]
impl Publisher for KafkaPublisher {
    async fn send(&self, record: &EncodedRecord) -> Result<Delivery, TransportError> {
        let future_record = FutureRecord::to(&record.topic)
            .key(&record.key)
            .payload(&record.value);

        let (partition, offset) = self
            .producer
            .send(future_record, QUEUE_TIMEOUT)
            .await
            .map_err(|(source, _)| TransportError::Delivery {
                topic: record.topic.clone(),
                source,
            })?;
        Ok(Delivery { partition, offset })
    }

    async fn flush(&self) -> Result<(), TransportError> {
        self.producer
            .flush(FLUSH_TIMEOUT)
            .map_err(TransportError::Flush)
    }
}
