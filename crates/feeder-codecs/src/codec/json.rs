use super::Codec;
use crate::error::EncodingError;
use crate::format::FormatKind;
use crate::record::{generate_key, EncodedRecord, InputRecord};
use rand::RngCore;

/// Passes the input through unchanged, keyed by a fresh UUID.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn format(&self) -> FormatKind {
        FormatKind::Json
    }

    fn encode(
        &self,
        input: &InputRecord,
        destination: &str,
        rng: &mut dyn RngCore,
    ) -> Result<EncodedRecord, EncodingError> {
        let key = generate_key(rng);
        Ok(EncodedRecord::new(
            key.into_bytes(),
            input.raw().as_bytes().to_vec(),
            destination,
        ))
    }
}
