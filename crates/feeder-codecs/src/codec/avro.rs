use super::{Codec, SchemaIds};
use crate::error::{EncodingError, RegistrationError};
use crate::format::FormatKind;
use crate::framing;
use crate::record::{generate_key, lookup, EncodedRecord, InputRecord};
use crate::registry::{key_subject, value_subject, SchemaReference, SchemaRegistry};
use crate::schema::{resources, SchemaProvider};
use apache_avro::types::Value as AvroValue;
use apache_avro::Schema;
use rand::{Rng, RngCore};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::debug;

/// Literal assigned to `updatedAt`. It does not fit in a long and is
/// saturated to `i64::MAX` on conversion.
pub const OVERSIZED_UPDATED_AT: &str = "99999999999999999999";

/// Avro records framed with registry ids.
///
/// The value schema refers to `feeder.geo.Point`, which is registered under
/// its own subject and referenced from the value subject.
#[derive(Debug, Clone)]
pub struct AvroCodec {
    provider: SchemaProvider,
    ids: Option<SchemaIds>,
}

impl AvroCodec {
    pub fn new(provider: SchemaProvider) -> Self {
        Self {
            provider,
            ids: None,
        }
    }

    /// Key schema, then the value schema with the schemas it refers to.
    /// The value schema is the last of the list.
    fn schemas(&self) -> Result<(Schema, Vec<Schema>), EncodingError> {
        let key = self.provider.load(resources::AVRO_KEY)?;
        let value = self.provider.load(resources::AVRO_VALUE)?;

        let key = key
            .avro_schemata()
            .and_then(|schemata| schemata.last())
            .cloned()
            .ok_or_else(|| EncodingError::Avro("key schema is not Avro".to_string()))?;
        let schemata = value
            .avro_schemata()
            .map(<[Schema]>::to_vec)
            .ok_or_else(|| EncodingError::Avro("value schema is not Avro".to_string()))?;
        Ok((key, schemata))
    }

    /// The input with `geometry` replaced by a Point and `updatedAt` set.
    fn prepare(input: &InputRecord) -> Result<Value, EncodingError> {
        let mut document = input.json()?;
        let coordinates = lookup(&document, &["geometry", "coordinates"])
            .cloned()
            .unwrap_or_else(|| json!([0.0, 0.0]));
        let updated_at: Value = serde_json::from_str(OVERSIZED_UPDATED_AT)?;

        let Value::Object(members) = &mut document else {
            return Err(EncodingError::FieldType {
                field: "$".to_string(),
                expected: "a JSON object".to_string(),
            });
        };
        members.insert(
            "geometry".to_string(),
            json!({"type": "Point", "coordinates": coordinates}),
        );
        members.insert("updatedAt".to_string(), updated_at);
        Ok(document)
    }
}

fn avro_error(error: apache_avro::Error) -> EncodingError {
    EncodingError::Avro(error.to_string())
}

#[async_trait::async_trait]
impl Codec for AvroCodec {
    fn format(&self) -> FormatKind {
        FormatKind::Avro
    }

    async fn register_schemas(
        &mut self,
        registry: &dyn SchemaRegistry,
        topic: &str,
    ) -> Result<(), RegistrationError> {
        let key = self.provider.load(resources::AVRO_KEY)?;
        let point = self.provider.load(resources::AVRO_POINT)?;
        let value = self.provider.load(resources::AVRO_VALUE)?;

        let key_id = registry.register(&key_subject(topic), &key, &[]).await?;

        registry.register(&point.name, &point, &[]).await?;
        let point_version = registry
            .lookup(&point.name, &point, &[])
            .await?
            .map(|registered| registered.version)
            .ok_or_else(|| RegistrationError::MissingReference {
                subject: value_subject(topic),
                reference: point.name.clone(),
                version: 1,
            })?;
        debug!("Point schema '{}' is at version {}", point.name, point_version);

        let reference = SchemaReference::new(&point.name, &point.name, point_version);
        let value_id = registry
            .register(&value_subject(topic), &value, &[reference])
            .await?;

        self.ids = Some(SchemaIds {
            key: key_id,
            value: value_id,
        });
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
        let ids = self.ids.ok_or(EncodingError::NotRegistered(FormatKind::Avro))?;
        let (key_schema, schemata) = self.schemas()?;
        let value_schema = schemata
            .last()
            .ok_or_else(|| EncodingError::Avro("value schema missing".to_string()))?;

        let key_json = json!({"id": generate_key(rng), "sunny": rng.random::<bool>()});
        let key = Converter::new(std::slice::from_ref(&key_schema)).convert(
            &key_schema,
            &key_json,
            "$",
        )?;
        let key = apache_avro::to_avro_datum(&key_schema, key).map_err(avro_error)?;

        let document = Self::prepare(input)?;
        let value = Converter::new(&schemata).convert(value_schema, &document, "$")?;
        let value =
            apache_avro::to_avro_datum_schemata(value_schema, schemata.iter().collect(), value)
                .map_err(avro_error)?;

        Ok(EncodedRecord::new(
            framing::frame(ids.key, &key),
            framing::frame(ids.value, &value),
            destination,
        ))
    }
}

/// Schema-directed conversion of JSON into Avro values.
///
/// Members missing from a record take the field default, or `null` when the
/// field is a nullable union. Unions pick the first variant that converts.
/// Longs that overflow are saturated.
struct Converter<'a> {
    names: HashMap<String, &'a Schema>,
}

impl<'a> Converter<'a> {
    fn new(schemata: &'a [Schema]) -> Self {
        let mut names = HashMap::new();
        for schema in schemata {
            collect_names(schema, &mut names);
        }
        Self { names }
    }

    fn convert(
        &self,
        schema: &Schema,
        value: &Value,
        path: &str,
    ) -> Result<AvroValue, EncodingError> {
        let mismatch = |expected: &str| EncodingError::FieldType {
            field: path.to_string(),
            expected: expected.to_string(),
        };

        match schema {
            Schema::Null => match value {
                Value::Null => Ok(AvroValue::Null),
                _ => Err(mismatch("null")),
            },
            Schema::Boolean => value
                .as_bool()
                .map(AvroValue::Boolean)
                .ok_or_else(|| mismatch("boolean")),
            Schema::Int => value
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(AvroValue::Int)
                .ok_or_else(|| mismatch("int")),
            Schema::Long => saturating_long(value)
                .map(AvroValue::Long)
                .ok_or_else(|| mismatch("long")),
            Schema::TimestampMillis => saturating_long(value)
                .map(AvroValue::TimestampMillis)
                .ok_or_else(|| mismatch("timestamp-millis")),
            Schema::TimestampMicros => saturating_long(value)
                .map(AvroValue::TimestampMicros)
                .ok_or_else(|| mismatch("timestamp-micros")),
            Schema::Float => value
                .as_f64()
                .map(|f| AvroValue::Float(f as f32))
                .ok_or_else(|| mismatch("float")),
            Schema::Double => value
                .as_f64()
                .map(AvroValue::Double)
                .ok_or_else(|| mismatch("double")),
            Schema::String => value
                .as_str()
                .map(|s| AvroValue::String(s.to_string()))
                .ok_or_else(|| mismatch("string")),
            Schema::Bytes => value
                .as_str()
                .map(|s| AvroValue::Bytes(s.as_bytes().to_vec()))
                .ok_or_else(|| mismatch("bytes")),
            Schema::Enum(enum_schema) => {
                let symbol = value.as_str().ok_or_else(|| mismatch("enum symbol"))?;
                let index = enum_schema
                    .symbols
                    .iter()
                    .position(|s| s == symbol)
                    .ok_or_else(|| mismatch("a declared enum symbol"))?;
                Ok(AvroValue::Enum(index as u32, symbol.to_string()))
            }
            Schema::Array(array) => {
                let elements = value.as_array().ok_or_else(|| mismatch("array"))?;
                elements
                    .iter()
                    .enumerate()
                    .map(|(i, element)| {
                        self.convert(&array.items, element, &format!("{path}[{i}]"))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(AvroValue::Array)
            }
            Schema::Map(map) => {
                let members = value.as_object().ok_or_else(|| mismatch("map"))?;
                members
                    .iter()
                    .map(|(k, v)| {
                        self.convert(&map.types, v, &format!("{path}.{k}"))
                            .map(|converted| (k.clone(), converted))
                    })
                    .collect::<Result<HashMap<_, _>, _>>()
                    .map(AvroValue::Map)
            }
            Schema::Union(union) => union
                .variants()
                .iter()
                .enumerate()
                .find_map(|(i, variant)| {
                    self.convert(variant, value, path)
                        .ok()
                        .map(|converted| AvroValue::Union(i as u32, Box::new(converted)))
                })
                .ok_or_else(|| mismatch("one of the union's types")),
            Schema::Record(record) => {
                let members = value.as_object().ok_or_else(|| mismatch("record"))?;
                let mut fields = Vec::with_capacity(record.fields.len());
                for field in &record.fields {
                    let field_path = format!("{path}.{}", field.name);
                    let converted = match (members.get(&field.name), &field.default) {
                        (Some(member), _) => self.convert(&field.schema, member, &field_path)?,
                        (None, Some(default)) => self.convert(&field.schema, default, &field_path)?,
                        (None, None) if is_nullable(&field.schema) => {
                            self.convert(&field.schema, &Value::Null, &field_path)?
                        }
                        (None, None) => {
                            return Err(EncodingError::MissingField(
                                field_path.trim_start_matches("$.").to_string(),
                            ))
                        }
                    };
                    fields.push((field.name.clone(), converted));
                }
                Ok(AvroValue::Record(fields))
            }
            Schema::Ref { name } => {
                let fullname = name.fullname(None);
                let target = self
                    .names
                    .get(&fullname)
                    .ok_or_else(|| EncodingError::Avro(format!("unresolved type '{fullname}'")))?;
                self.convert(target, value, path)
            }
            other => Err(EncodingError::Avro(format!(
                "unsupported Avro type {other:?} at {path}"
            ))),
        }
    }
}

fn collect_names<'a>(schema: &'a Schema, names: &mut HashMap<String, &'a Schema>) {
    match schema {
        Schema::Record(record) => {
            names.insert(record.name.fullname(None), schema);
            for field in &record.fields {
                collect_names(&field.schema, names);
            }
        }
        Schema::Enum(enum_schema) => {
            names.insert(enum_schema.name.fullname(None), schema);
        }
        Schema::Array(array) => collect_names(&array.items, names),
        Schema::Map(map) => collect_names(&map.types, names),
        Schema::Union(union) => {
            for variant in union.variants() {
                collect_names(variant, names);
            }
        }
        _ => {}
    }
}

fn is_nullable(schema: &Schema) -> bool {
    match schema {
        Schema::Union(union) => union.variants().iter().any(|v| matches!(v, Schema::Null)),
        _ => false,
    }
}

fn saturating_long(value: &Value) -> Option<i64> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(n) = n.as_i64() {
        Some(n)
    } else if n.as_u64().is_some() {
        Some(i64::MAX)
    } else {
        // `as` saturates at the bounds of i64
        n.as_f64().map(|f| f as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::registry::InMemorySchemaRegistry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const PARIS: &str = r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[2.347,48.859]},"properties":{"label":"Paris","score":0.97,"city":"Paris","postcode":"75001","importance":0.67,"unknown":"ignored"}}"#;

    async fn registered() -> (AvroCodec, InMemorySchemaRegistry) {
        let registry = InMemorySchemaRegistry::new();
        let mut codec = AvroCodec::new(SchemaProvider::embedded());
        codec.register_schemas(&registry, "t").await.unwrap();
        (codec, registry)
    }

    fn decode_value(codec: &AvroCodec, framed: &[u8]) -> AvroValue {
        let (_, schemata) = codec.schemas().unwrap();
        let (_, mut body) = framing::split_header(framed).unwrap();
        let value_schema = schemata.last().unwrap();
        apache_avro::from_avro_datum_schemata(
            value_schema,
            schemata.iter().collect(),
            &mut body,
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_registration_order() {
        let (codec, registry) = registered().await;
        assert!(codec.is_ready());
        assert_eq!(
            registry.subjects().await,
            vec!["feeder.geo.Point", "t-key", "t-value"]
        );
        assert_eq!(registry.latest("t-key").await.unwrap().unwrap().id, 1);
        assert_eq!(registry.latest("feeder.geo.Point").await.unwrap().unwrap().id, 2);
        assert_eq!(registry.latest("t-value").await.unwrap().unwrap().id, 3);
    }

    #[tokio::test]
    async fn test_registration_is_repeatable() {
        let (mut codec, registry) = registered().await;
        codec.register_schemas(&registry, "t").await.unwrap();
        assert_eq!(registry.latest("t-value").await.unwrap().unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_value_record_fields() {
        let (codec, _) = registered().await;
        let mut rng = StdRng::seed_from_u64(21);
        let encoded = codec.encode(&InputRecord::new(PARIS), "t", &mut rng).unwrap();

        let (value_id, _) = framing::split_header(&encoded.value).unwrap();
        assert_eq!(value_id, 3);

        let AvroValue::Record(fields) = decode_value(&codec, &encoded.value) else {
            panic!("expected a record");
        };
        let names: Vec<&str> = fields.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["type", "geometry", "properties", "updatedAt"]);

        let updated_at = fields.iter().find(|(name, _)| name == "updatedAt").unwrap();
        assert_eq!(updated_at.1, AvroValue::TimestampMillis(i64::MAX));

        let geometry = &fields.iter().find(|(name, _)| name == "geometry").unwrap().1;
        assert_eq!(
            *geometry,
            AvroValue::Record(vec![
                ("type".to_string(), AvroValue::String("Point".to_string())),
                (
                    "coordinates".to_string(),
                    AvroValue::Array(vec![AvroValue::Double(2.347), AvroValue::Double(48.859)])
                ),
            ])
        );
    }

    #[tokio::test]
    async fn test_value_is_deterministic() {
        let (codec, _) = registered().await;
        let input = InputRecord::new(PARIS);
        let a = codec.encode(&input, "t", &mut StdRng::seed_from_u64(1)).unwrap();
        let b = codec.encode(&input, "t", &mut StdRng::seed_from_u64(2)).unwrap();
        assert_eq!(a.value, b.value);
    }

    #[tokio::test]
    async fn test_missing_geometry_gets_origin() {
        let (codec, _) = registered().await;
        let input = InputRecord::new(r#"{"type":"Feature","properties":{"label":"Nowhere"}}"#);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(codec.encode(&input, "t", &mut rng).is_ok());
    }

    #[tokio::test]
    async fn test_missing_required_field() {
        let (codec, _) = registered().await;
        let input = InputRecord::new(r#"{"type":"Feature","properties":{"city":"Paris"}}"#);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            codec.encode(&input, "t", &mut rng),
            Err(EncodingError::MissingField(f)) if f == "properties.label"
        ));
    }

    #[tokio::test]
    async fn test_type_mismatch() {
        let (codec, _) = registered().await;
        let input = InputRecord::new(r#"{"type":"Feature","properties":{"label":12}}"#);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            codec.encode(&input, "t", &mut rng),
            Err(EncodingError::FieldType { field, .. }) if field == "$.properties.label"
        ));
    }

    #[tokio::test]
    async fn test_broken_schema_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("avro")).unwrap();
        for resource in [
            resources::AVRO_KEY,
            resources::AVRO_POINT,
            resources::AVRO_VALUE,
        ] {
            let body = SchemaProvider::embedded().read(resource).unwrap();
            std::fs::write(dir.path().join(resource), body).unwrap();
        }

        let registry = InMemorySchemaRegistry::new();
        let mut codec = AvroCodec::new(SchemaProvider::from_dir(dir.path()));
        codec.register_schemas(&registry, "t").await.unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(codec.encode(&InputRecord::new(PARIS), "t", &mut rng).is_ok());

        std::fs::write(
            dir.path().join(resources::AVRO_VALUE),
            r#"{"type":"record","name":"Address","fields":"oops"}"#,
        )
        .unwrap();
        assert!(matches!(
            codec.encode(&InputRecord::new(PARIS), "t", &mut rng),
            Err(EncodingError::Schema(SchemaError::Parse { .. }))
        ));

        std::fs::remove_file(dir.path().join(resources::AVRO_KEY)).unwrap();
        assert!(matches!(
            codec.encode(&InputRecord::new(PARIS), "t", &mut rng),
            Err(EncodingError::Schema(SchemaError::ResourceNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_point_reference_uses_registered_version() {
        let registry = InMemorySchemaRegistry::new();
        let provider = SchemaProvider::embedded();
        // The point subject already holds a newer, unrelated version
        let point = provider.load(resources::AVRO_POINT).unwrap();
        let key = provider.load(resources::AVRO_KEY).unwrap();
        registry.register(&point.name, &point, &[]).await.unwrap();
        registry.register(&point.name, &key, &[]).await.unwrap();

        let mut codec = AvroCodec::new(provider);
        codec.register_schemas(&registry, "t").await.unwrap();
        assert!(codec.is_ready());
        assert_eq!(registry.latest(&point.name).await.unwrap().unwrap().version, 2);
        assert!(registry.latest("t-value").await.unwrap().is_some());
    }

    #[test]
    fn test_encode_before_registration() {
        let codec = AvroCodec::new(SchemaProvider::embedded());
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            codec.encode(&InputRecord::new(PARIS), "t", &mut rng),
            Err(EncodingError::NotRegistered(FormatKind::Avro))
        ));
    }

    #[test]
    fn test_saturating_long() {
        let oversized: Value = serde_json::from_str(OVERSIZED_UPDATED_AT).unwrap();
        assert_eq!(saturating_long(&oversized), Some(i64::MAX));
        assert_eq!(saturating_long(&json!(u64::MAX)), Some(i64::MAX));
        assert_eq!(saturating_long(&json!(-1e30)), Some(i64::MIN));
        assert_eq!(saturating_long(&json!(42)), Some(42));
        assert_eq!(saturating_long(&json!("42")), None);
    }
}
