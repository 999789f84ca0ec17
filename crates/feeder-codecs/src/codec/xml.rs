use super::Codec;
use crate::error::EncodingError;
use crate::format::FormatKind;
use crate::record::{generate_key, EncodedRecord, InputRecord};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use rand::RngCore;
use serde_json::Value;

/// Name of the document element.
pub const ROOT_ELEMENT: &str = "ObjectNode";

/// Re-serializes the input document as XML.
///
/// Object members become child elements, array elements repeat the member's
/// element name, `null` becomes an empty element.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

impl Codec for XmlCodec {
    fn format(&self) -> FormatKind {
        FormatKind::Xml
    }

    fn encode(
        &self,
        input: &InputRecord,
        destination: &str,
        rng: &mut dyn RngCore,
    ) -> Result<EncodedRecord, EncodingError> {
        let document = input.json()?;
        let value = to_xml(&document)?;
        let key = generate_key(rng);
        Ok(EncodedRecord::new(key.into_bytes(), value, destination))
    }
}

fn to_xml(document: &Value) -> Result<Vec<u8>, EncodingError> {
    let Value::Object(members) = document else {
        return Err(EncodingError::Xml(
            "document root must be a JSON object".to_string(),
        ));
    };

    let mut writer = Writer::new(Vec::new());
    write(&mut writer, Event::Start(BytesStart::new(ROOT_ELEMENT)))?;
    for (name, value) in members {
        write_member(&mut writer, name, value)?;
    }
    write(&mut writer, Event::End(BytesEnd::new(ROOT_ELEMENT)))?;
    Ok(writer.into_inner())
}

fn write_member(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: &Value,
) -> Result<(), EncodingError> {
    if !is_element_name(name) {
        return Err(EncodingError::Xml(format!(
            "'{name}' cannot be used as an element name"
        )));
    }

    match value {
        Value::Array(elements) => {
            for element in elements {
                write_member(writer, name, element)?;
            }
        }
        Value::Object(members) => {
            write(writer, Event::Start(BytesStart::new(name)))?;
            for (child, child_value) in members {
                write_member(writer, child, child_value)?;
            }
            write(writer, Event::End(BytesEnd::new(name)))?;
        }
        Value::Null => write(writer, Event::Empty(BytesStart::new(name)))?,
        Value::String(text) => write_text(writer, name, text)?,
        Value::Number(n) => write_text(writer, name, &n.to_string())?,
        Value::Bool(b) => write_text(writer, name, &b.to_string())?,
    }
    Ok(())
}

fn write_text(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<(), EncodingError> {
    write(writer, Event::Start(BytesStart::new(name)))?;
    write(writer, Event::Text(BytesText::new(text)))?;
    write(writer, Event::End(BytesEnd::new(name)))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), EncodingError> {
    writer
        .write_event(event)
        .map_err(|e| EncodingError::Xml(e.to_string()))
}

fn is_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn render(document: Value) -> String {
        String::from_utf8(to_xml(&document).unwrap()).unwrap()
    }

    #[test]
    fn test_nested_document() {
        let xml = render(json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [2.3, 48.8]},
            "properties": {"label": "Paris", "score": null}
        }));
        assert!(xml.starts_with("<ObjectNode>"));
        assert!(xml.ends_with("</ObjectNode>"));
        assert!(xml.contains("<type>Feature</type>"));
        assert!(xml.contains("<coordinates>2.3</coordinates><coordinates>48.8</coordinates>"));
        assert!(xml.contains("<label>Paris</label>"));
        assert!(xml.contains("<score/>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let xml = render(json!({"label": "Fish & <Chips>"}));
        assert!(xml.contains("<label>Fish &amp; &lt;Chips&gt;</label>"));
    }

    #[test]
    fn test_non_object_root() {
        assert!(matches!(to_xml(&json!([1, 2])), Err(EncodingError::Xml(_))));
    }

    #[test]
    fn test_invalid_element_name() {
        assert!(matches!(
            to_xml(&json!({"1st place": true})),
            Err(EncodingError::Xml(_))
        ));
    }

    #[test]
    fn test_encode_keys_record() {
        let mut rng = StdRng::seed_from_u64(5);
        let encoded = XmlCodec
            .encode(&InputRecord::new(r#"{"a":1}"#), "t", &mut rng)
            .unwrap();
        assert_eq!(encoded.value, b"<ObjectNode><a>1</a></ObjectNode>");
        assert_eq!(encoded.key.len(), 36);
    }
}
