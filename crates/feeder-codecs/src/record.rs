//! Input and output records of the encoding pipeline.

use crate::error::EncodingError;
use rand::RngCore;
use serde_json::Value;
use uuid::Uuid;

/// One raw input document, as produced by a record source.
///
/// The raw text is kept untouched so that passthrough formats can emit the
/// exact bytes they were given. Codecs that need structure parse it on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord {
    raw: String,
}

impl InputRecord {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The document exactly as it was received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Parse the document as JSON.
    pub fn json(&self) -> Result<Value, EncodingError> {
        Ok(serde_json::from_str(&self.raw)?)
    }
}

impl From<String> for InputRecord {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

/// A framed key/value pair bound for one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRecord {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub topic: String,
}

impl EncodedRecord {
    pub fn new(key: Vec<u8>, value: Vec<u8>, topic: impl Into<String>) -> Self {
        Self {
            key,
            value,
            topic: topic.into(),
        }
    }
}

/// Generate a random UUID v4 record key from the provided RNG.
pub fn generate_key(rng: &mut dyn RngCore) -> String {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);

    // Set version (4) and variant (RFC 4122) bits
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes).to_string()
}

/// Look up a nested member by path, e.g. `["properties", "label"]`.
pub(crate) fn lookup<'a>(document: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(document, |current, segment| current.get(*segment))
}

/// Read a nested scalar member as text.
///
/// Strings are returned verbatim, numbers and booleans in their JSON form.
/// A missing or `null` member is a [`EncodingError::MissingField`]; objects
/// and arrays are rejected since they have no single textual value.
pub(crate) fn text_at(document: &Value, path: &[&str]) -> Result<String, EncodingError> {
    let field = path.join(".");
    match lookup(document, path) {
        None | Some(Value::Null) => Err(EncodingError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(Value::Object(_)) | Some(Value::Array(_)) => Err(EncodingError::FieldType {
            field,
            expected: "a scalar value".to_string(),
        }),
    }
}
