//! topic-feeder
//!
//! Feeds a Kafka topic with sample records. Each record is fetched from a
//! search API (or generated locally), re-encoded into the selected wire
//! format and published. Some formats are deliberately broken so consumers
//! can be tested against bad input.
//!
//! # CLI Usage
//!
//! ```bash
//! # Addresses matching "Nimes", encoded as Avro
//! topic-feeder --format avro --topic public-french-addresses Nimes
//!
//! # Corrupted JSON Schema payloads every 2 seconds
//! topic-feeder --format invalid-json --every 2s
//!
//! # Offline, with generated records
//! topic-feeder --source synthetic --count 50 --seed 98765 --format xml
//! ```
//!
//! Encoding lives in the `feeder-codecs` crate and record sources in
//! `record-source`; this crate wires them to Kafka.

pub mod config;
pub mod feeder;
pub mod publisher;

pub use config::{FeederArgs, FeederConfig, Properties, SourceKind};
pub use feeder::{Feeder, RepeatSummary, RunSummary};
pub use publisher::{Delivery, KafkaPublisher, Publisher, TransportError};
