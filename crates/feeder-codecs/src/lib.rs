//! Record encoding core for topic-feeder.
//!
//! This crate turns one semi-structured input record (a JSON document) into a
//! framed key/value byte pair for a chosen wire format, ready to be handed to
//! a Kafka producer. Formats backed by a schema registry register their
//! schemas once before the first record is encoded.
//!
//! # Architecture
//!
//! ```text
//!   InputRecord (raw JSON text)
//!          │
//!          ▼
//! ┌─────────────────┐      ┌──────────────────┐
//! │  CodecRegistry  │      │  SchemaProvider  │
//! │                 │      │                  │
//! │ - format name → │      │ - avro/*.json    │
//! │   Box<dyn Codec>│      │ - protobuf/*     │
//! └────────┬────────┘      │ - json-schema/*  │
//!          │               └────────┬─────────┘
//!          ▼                        │
//!   ┌─────────────┐  register  ┌────▼───────────┐
//!   │    Codec    │───────────▶│ SchemaRegistry │
//!   │  (encode)   │◀───ids─────│ (http/memory)  │
//!   └──────┬──────┘            └────────────────┘
//!          │
//!          ▼
//!   EncodedRecord { key, value, topic }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use feeder_codecs::{CodecRegistry, InMemorySchemaRegistry, InputRecord, SchemaProvider};
//! use rand::SeedableRng;
//!
//! let registry = InMemorySchemaRegistry::new();
//! let mut codec = CodecRegistry::new(SchemaProvider::embedded()).select("avro");
//! codec.register_schemas(&registry, "addresses").await?;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(42);
//! let input = InputRecord::new(r#"{"type":"Feature","properties":{"label":"Paris"}}"#);
//! let encoded = codec.encode(&input, "addresses", &mut rng)?;
//! ```

pub mod codec;
pub mod error;
pub mod format;
pub mod framing;
pub mod record;
pub mod registry;
pub mod schema;

// Re-exports for convenience
pub use codec::{Codec, CodecRegistry};
pub use error::{EncodingError, RegistrationError, SchemaError};
pub use format::FormatKind;
pub use record::{EncodedRecord, InputRecord};
pub use registry::{
    HttpSchemaRegistry, InMemorySchemaRegistry, RegisteredSchema, SchemaReference,
    SchemaRegistry,
};
pub use schema::{SchemaDescriptor, SchemaFormat, SchemaProvider};
