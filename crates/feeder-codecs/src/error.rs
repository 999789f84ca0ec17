//! Error types for the encoding core.

use crate::format::FormatKind;
use thiserror::Error;

/// Errors raised while loading or parsing a schema resource.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Schema resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Failed to parse schema '{resource}': {message}")]
    Parse { resource: String, message: String },

    #[error("IO error while reading schema '{resource}': {source}")]
    Io {
        resource: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while encoding a single record.
///
/// These are scoped to one record: the caller logs them and moves on to the
/// next input.
#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("Input is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Field '{field}' has an unexpected type, expected {expected}")]
    FieldType { field: String, expected: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Schemas for the {0} codec are not registered")]
    NotRegistered(FormatKind),

    #[error("Avro encoding error: {0}")]
    Avro(String),

    #[error("Protobuf encoding error: {0}")]
    Protobuf(String),

    #[error("XML encoding error: {0}")]
    Xml(String),

    #[error("Payload for '{subject}' fails schema validation: {message}")]
    Validation { subject: String, message: String },
}

/// Errors raised while registering schemas with a schema registry.
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("Schema registry request for subject '{subject}' failed: {message}")]
    Transport { subject: String, message: String },

    #[error("Schema registry rejected subject '{subject}' (status {status}): {message}")]
    Rejected {
        subject: String,
        status: u16,
        message: String,
    },

    #[error("Subject '{subject}' references '{reference}' version {version}, which is not registered")]
    MissingReference {
        subject: String,
        reference: String,
        version: u32,
    },

    #[error("Invalid schema for subject '{subject}': {message}")]
    InvalidSchema { subject: String, message: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
