use super::{Codec, SchemaIds};
use crate::error::{EncodingError, RegistrationError};
use crate::format::FormatKind;
use crate::framing;
use crate::record::{generate_key, EncodedRecord, InputRecord};
use crate::registry::{key_subject, value_subject, SchemaRegistry};
use crate::schema::{json_schema, resources, SchemaDescriptor, SchemaProvider};
use rand::RngCore;
use serde::Serialize;
use serde_json::Value;

/// Value written over `updatedAt` by the invalid-JSON variant. The schema
/// declares the member as an RFC 3339 date-time, which this is not.
pub const INVALID_UPDATED_AT: &str = "2007";

/// A payload paired with the JSON Schema it claims to follow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub schema: Value,
    pub payload: Value,
}

impl Envelope {
    /// Validation issues of the payload against its schema.
    pub fn violations(&self) -> Vec<String> {
        json_schema::validate(&self.schema, &self.payload)
    }
}

/// JSON Schema framed records, and their deliberately invalid variant.
#[derive(Debug, Clone)]
pub struct JsonSchemaCodec {
    provider: SchemaProvider,
    validate: bool,
    corrupt: bool,
    ids: Option<SchemaIds>,
}

impl JsonSchemaCodec {
    pub fn new(provider: SchemaProvider) -> Self {
        Self {
            provider,
            validate: false,
            corrupt: false,
            ids: None,
        }
    }

    /// The invalid-JSON variant: `updatedAt` is overwritten so the payload
    /// no longer matches its schema. Validation is never enforced.
    pub fn corrupting(provider: SchemaProvider) -> Self {
        Self {
            corrupt: true,
            ..Self::new(provider)
        }
    }

    /// Reject payloads that fail validation against their schema.
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }

    fn load(&self) -> Result<(SchemaDescriptor, SchemaDescriptor), crate::error::SchemaError> {
        Ok((
            self.provider.load(resources::JSON_SCHEMA_KEY)?,
            self.provider.load(resources::JSON_SCHEMA_VALUE)?,
        ))
    }

    /// Build the key and value envelopes for one input.
    pub fn envelopes(
        &self,
        input: &InputRecord,
        rng: &mut dyn RngCore,
    ) -> Result<(Envelope, Envelope), EncodingError> {
        let (key_schema, value_schema) = self.load()?;
        let mut payload = input.json()?;

        if self.corrupt {
            let Value::Object(members) = &mut payload else {
                return Err(EncodingError::FieldType {
                    field: "$".to_string(),
                    expected: "a JSON object".to_string(),
                });
            };
            members.insert(
                "updatedAt".to_string(),
                Value::String(INVALID_UPDATED_AT.to_string()),
            );
        }

        let key = Envelope {
            schema: schema_document(&key_schema),
            payload: Value::String(generate_key(rng)),
        };
        let value = Envelope {
            schema: schema_document(&value_schema),
            payload,
        };
        Ok((key, value))
    }
}

fn schema_document(descriptor: &SchemaDescriptor) -> Value {
    descriptor.json().cloned().unwrap_or(Value::Null)
}

fn check(subject: String, envelope: &Envelope) -> Result<(), EncodingError> {
    let issues = envelope.violations();
    if issues.is_empty() {
        Ok(())
    } else {
        Err(EncodingError::Validation {
            subject,
            message: issues.join("; "),
        })
    }
}

#[async_trait::async_trait]
impl Codec for JsonSchemaCodec {
    fn format(&self) -> FormatKind {
        if self.corrupt {
            FormatKind::InvalidJson
        } else {
            FormatKind::JsonSchema
        }
    }

    async fn register_schemas(
        &mut self,
        registry: &dyn SchemaRegistry,
        topic: &str,
    ) -> Result<(), RegistrationError> {
        let (key_schema, value_schema) = self.load()?;
        let key = registry.register(&key_subject(topic), &key_schema, &[]).await?;
        let value = registry
            .register(&value_subject(topic), &value_schema, &[])
            .await?;
        self.ids = Some(SchemaIds { key, value });
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ids.is_some()
    }

    fn encode(
        &self,
        input: &InputRecord,
        destination: &str,
        rng: &mut dyn RngCore,
    ) -> Result<EncodedRecord, EncodingError> {
        let ids = self.ids.ok_or(EncodingError::NotRegistered(self.format()))?;
        let (key, value) = self.envelopes(input, rng)?;

        if self.validate && !self.corrupt {
            check(key_subject(destination), &key)?;
            check(value_subject(destination), &value)?;
        }

        Ok(EncodedRecord::new(
            framing::frame(ids.key, &serde_json::to_vec(&key.payload)?),
            framing::frame(ids.value, &serde_json::to_vec(&value.payload)?),
            destination,
        ))
    }
}
