use super::Codec;
use crate::error::EncodingError;
use crate::format::FormatKind;
use crate::record::{generate_key, text_at, EncodedRecord, InputRecord};
use rand::RngCore;

/// Emits `properties.label` as plain UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl Codec for TextCodec {
    fn format(&self) -> FormatKind {
        FormatKind::Text
    }

    fn encode(
        &self,
        input: &InputRecord,
        destination: &str,
        rng: &mut dyn RngCore,
    ) -> Result<EncodedRecord, EncodingError> {
        let document = input.json()?;
        let label = text_at(&document, &["properties", "label"])?;
        let key = generate_key(rng);
        Ok(EncodedRecord::new(
            key.into_bytes(),
            label.into_bytes(),
            destination,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const PARIS: &str = r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[2.3,48.8]},"properties":{"label":"Paris"}}"#;

    #[test]
    fn test_label_becomes_value() {
        let mut rng = StdRng::seed_from_u64(3);
        let input = InputRecord::new(PARIS);

        let first = TextCodec.encode(&input, "t", &mut rng).unwrap();
        let second = TextCodec.encode(&input, "t", &mut rng).unwrap();
        assert_eq!(first.value, b"Paris");
        assert!(!first.key.is_empty());
        assert_ne!(first.key, second.key);
    }

    #[test]
    fn test_missing_label() {
        let mut rng = StdRng::seed_from_u64(3);
        let input = InputRecord::new(r#"{"properties":{"name":"x"}}"#);
        assert!(matches!(
            TextCodec.encode(&input, "t", &mut rng),
            Err(EncodingError::MissingField(f)) if f == "properties.label"
        ));
    }

    #[test]
    fn test_not_json() {
        let mut rng = StdRng::seed_from_u64(3);
        let input = InputRecord::new("plain text");
        assert!(matches!(
            TextCodec.encode(&input, "t", &mut rng),
            Err(EncodingError::InvalidJson(_))
        ));
    }
}
