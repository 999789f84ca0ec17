//! Schema registry handles.
//!
//! A [`SchemaRegistry`] stores schemas under subjects and hands out the ids
//! that go into the framing header. [`HttpSchemaRegistry`] talks to a
//! Confluent-compatible registry; [`InMemorySchemaRegistry`] keeps everything
//! in process and is what tests use.

mod http;
mod memory;

pub use http::HttpSchemaRegistry;
pub use memory::InMemorySchemaRegistry;

use crate::error::RegistrationError;
use crate::schema::SchemaDescriptor;
use serde::{Deserialize, Serialize};

/// A reference from one schema to a type registered under another subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReference {
    /// Name the referencing schema uses for the type
    pub name: String,
    /// Subject the referenced schema is registered under
    pub subject: String,
    /// Version of the referenced subject
    pub version: u32,
}

impl SchemaReference {
    pub fn new(name: impl Into<String>, subject: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            subject: subject.into(),
            version,
        }
    }
}

/// A schema version as stored by a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredSchema {
    pub subject: String,
    pub id: u32,
    pub version: u32,
    pub schema: String,
}

/// Subject naming under the topic-name strategy.
pub fn key_subject(topic: &str) -> String {
    format!("{topic}-key")
}

/// Subject naming under the topic-name strategy.
pub fn value_subject(topic: &str) -> String {
    format!("{topic}-value")
}

/// Out-of-band schema storage shared between producers and consumers.
#[async_trait::async_trait]
pub trait SchemaRegistry: Send + Sync {
    /// Register `descriptor` under `subject` and return its schema id.
    ///
    /// Registering a body identical to one already stored returns the
    /// existing id. Every reference must already be registered.
    async fn register(
        &self,
        subject: &str,
        descriptor: &SchemaDescriptor,
        references: &[SchemaReference],
    ) -> Result<u32, RegistrationError>;

    /// Latest version registered under `subject`, if any.
    async fn latest(&self, subject: &str) -> Result<Option<RegisteredSchema>, RegistrationError>;

    /// The version of `subject` that holds `descriptor`, if it was registered
    /// there.
    async fn lookup(
        &self,
        subject: &str,
        descriptor: &SchemaDescriptor,
        references: &[SchemaReference],
    ) -> Result<Option<RegisteredSchema>, RegistrationError>;
}
