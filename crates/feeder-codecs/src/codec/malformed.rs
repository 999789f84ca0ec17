use super::Codec;
use crate::error::EncodingError;
use crate::format::FormatKind;
use crate::framing::HEADER_LEN;
use crate::record::{generate_key, text_at, EncodedRecord, InputRecord};
use rand::{Rng, RngCore};

/// Highest schema id a malformed header may claim.
const MAX_BOGUS_ID: u8 = 126;

/// Produces payloads that look registry-framed but are not.
///
/// Each of key and value gets a header claiming a random schema id, followed
/// by plain text instead of a serialized datum. Consumers that trust the
/// header will fail to decode.
#[derive(Debug, Clone, Copy, Default)]
pub struct MalformedCodec;

fn bogus_frame(rng: &mut dyn RngCore, body: &str) -> Vec<u8> {
    let mut framed = vec![0u8; HEADER_LEN];
    framed[HEADER_LEN - 1] = rng.random_range(1..=MAX_BOGUS_ID);
    framed.extend_from_slice(body.as_bytes());
    framed
}

impl Codec for MalformedCodec {
    fn format(&self) -> FormatKind {
        FormatKind::Malformed
    }

    fn encode(
        &self,
        input: &InputRecord,
        destination: &str,
        rng: &mut dyn RngCore,
    ) -> Result<EncodedRecord, EncodingError> {
        let document = input.json()?;
        let context = text_at(&document, &["properties", "context"])?;
        let key = format!("{} key", generate_key(rng));

        let key = bogus_frame(rng, &key);
        let value = bogus_frame(rng, &context);
        Ok(EncodedRecord::new(key, value, destination))
    }
}
