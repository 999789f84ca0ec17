use super::{Codec, SchemaIds};
use crate::error::{EncodingError, RegistrationError};
use crate::format::FormatKind;
use crate::framing;
use crate::record::{generate_key, EncodedRecord, InputRecord};
use crate::registry::{key_subject, value_subject, SchemaRegistry};
use crate::schema::protobuf as idl;
use crate::schema::{resources, SchemaDescriptor, SchemaProvider};
use protobuf::reflect::{
    FieldDescriptor, MessageDescriptor, ReflectValueBox, RuntimeFieldType, RuntimeType,
};
use protobuf::MessageDyn;
use rand::RngCore;
use serde_json::{json, Value};

/// Dynamic protobuf messages built from the value IDL.
///
/// JSON members are matched to fields by name or JSON name; members with no
/// matching field are skipped.
#[derive(Debug, Clone)]
pub struct ProtobufCodec {
    provider: SchemaProvider,
    ids: Option<SchemaIds>,
}

impl ProtobufCodec {
    pub fn new(provider: SchemaProvider) -> Self {
        Self {
            provider,
            ids: None,
        }
    }
}

#[async_trait::async_trait]
impl Codec for ProtobufCodec {
    fn format(&self) -> FormatKind {
        FormatKind::Protobuf
    }

    async fn register_schemas(
        &mut self,
        registry: &dyn SchemaRegistry,
        topic: &str,
    ) -> Result<(), RegistrationError> {
        let key = self.provider.load(resources::PROTOBUF_KEY)?;
        let value = self.provider.load(resources::PROTOBUF_VALUE)?;
        let key = registry.register(&key_subject(topic), &key, &[]).await?;
        let value = registry.register(&value_subject(topic), &value, &[]).await?;
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
        let ids = self.ids.ok_or(EncodingError::NotRegistered(FormatKind::Protobuf))?;
        let key_schema = self.provider.load(resources::PROTOBUF_KEY)?;
        let value_schema = self.provider.load(resources::PROTOBUF_VALUE)?;

        let document = input.json()?;
        let key = encode_message(&key_schema, &json!({"id": generate_key(rng)}))?;
        let value = encode_message(&value_schema, &document)?;

        Ok(EncodedRecord::new(
            framing::frame(ids.key, &key),
            framing::frame(ids.value, &value),
            destination,
        ))
    }
}

/// Message-index list followed by the serialized message.
fn encode_message(schema: &SchemaDescriptor, document: &Value) -> Result<Vec<u8>, EncodingError> {
    let (files, main) = schema.file_descriptors().ok_or_else(|| {
        EncodingError::Protobuf(format!("'{}' is not a protobuf schema", schema.resource))
    })?;
    let file = idl::compile(files, main).map_err(EncodingError::Protobuf)?;
    let descriptor = idl::message(&file, &schema.name)
        .ok_or_else(|| EncodingError::Protobuf(format!("message '{}' not found", schema.name)))?;
    let index = file
        .messages()
        .position(|m| m.full_name() == schema.name)
        .unwrap_or_default();

    let message = build_message(&descriptor, document, "$")?;
    let bytes = message
        .write_to_bytes_dyn()
        .map_err(|e| EncodingError::Protobuf(e.to_string()))?;

    let mut out = framing::message_indexes(index);
    out.extend_from_slice(&bytes);
    Ok(out)
}

fn find_field(descriptor: &MessageDescriptor, name: &str) -> Option<FieldDescriptor> {
    descriptor
        .field_by_name(name)
        .or_else(|| descriptor.fields().find(|f| f.json_name() == name))
}

fn build_message(
    descriptor: &MessageDescriptor,
    document: &Value,
    path: &str,
) -> Result<Box<dyn MessageDyn>, EncodingError> {
    let members = document.as_object().ok_or_else(|| EncodingError::FieldType {
        field: path.to_string(),
        expected: format!("an object for message {}", descriptor.full_name()),
    })?;

    let mut message = descriptor.new_instance();
    for (name, member) in members {
        let Some(field) = find_field(descriptor, name) else {
            continue;
        };
        if member.is_null() {
            continue;
        }
        let field_path = format!("{path}.{name}");

        match field.runtime_field_type() {
            RuntimeFieldType::Singular(runtime) => {
                let value = to_reflect(&runtime, member, &field_path)?;
                field.set_singular_field(&mut *message, value);
            }
            RuntimeFieldType::Repeated(runtime) => {
                let elements = member.as_array().ok_or_else(|| EncodingError::FieldType {
                    field: field_path.clone(),
                    expected: "an array".to_string(),
                })?;
                let mut repeated = field.mut_repeated(&mut *message);
                for (i, element) in elements.iter().enumerate() {
                    repeated.push(to_reflect(&runtime, element, &format!("{field_path}[{i}]"))?);
                }
            }
            RuntimeFieldType::Map(key_type, value_type) => {
                let entries = member.as_object().ok_or_else(|| EncodingError::FieldType {
                    field: field_path.clone(),
                    expected: "an object".to_string(),
                })?;
                if !matches!(key_type, RuntimeType::String) {
                    return Err(EncodingError::Protobuf(format!(
                        "{field_path}: only string map keys are supported"
                    )));
                }
                let mut map = field.mut_map(&mut *message);
                for (key, entry) in entries {
                    let value = to_reflect(&value_type, entry, &format!("{field_path}.{key}"))?;
                    map.insert(ReflectValueBox::String(key.clone()), value);
                }
            }
        }
    }
    Ok(message)
}

fn to_reflect(
    runtime: &RuntimeType,
    value: &Value,
    path: &str,
) -> Result<ReflectValueBox, EncodingError> {
    let mismatch = |expected: &str| EncodingError::FieldType {
        field: path.to_string(),
        expected: expected.to_string(),
    };

    match runtime {
        RuntimeType::I32 => value
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(ReflectValueBox::I32)
            .ok_or_else(|| mismatch("int32")),
        RuntimeType::I64 => value
            .as_i64()
            .map(ReflectValueBox::I64)
            .ok_or_else(|| mismatch("int64")),
        RuntimeType::U32 => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(ReflectValueBox::U32)
            .ok_or_else(|| mismatch("uint32")),
        RuntimeType::U64 => value
            .as_u64()
            .map(ReflectValueBox::U64)
            .ok_or_else(|| mismatch("uint64")),
        RuntimeType::F32 => value
            .as_f64()
            .map(|f| ReflectValueBox::F32(f as f32))
            .ok_or_else(|| mismatch("float")),
        RuntimeType::F64 => value
            .as_f64()
            .map(ReflectValueBox::F64)
            .ok_or_else(|| mismatch("double")),
        RuntimeType::Bool => value
            .as_bool()
            .map(ReflectValueBox::Bool)
            .ok_or_else(|| mismatch("bool")),
        RuntimeType::String => value
            .as_str()
            .map(|s| ReflectValueBox::String(s.to_string()))
            .ok_or_else(|| mismatch("string")),
        RuntimeType::VecU8 => value
            .as_str()
            .map(|s| ReflectValueBox::Bytes(s.as_bytes().to_vec()))
            .ok_or_else(|| mismatch("bytes")),
        RuntimeType::Enum(descriptor) => {
            let number = match value {
                Value::String(name) => descriptor.value_by_name(name).map(|v| v.value()),
                Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
                _ => None,
            }
            .ok_or_else(|| mismatch(&format!("a value of enum {}", descriptor.full_name())))?;
            Ok(ReflectValueBox::Enum(descriptor.clone(), number))
        }
        RuntimeType::Message(descriptor) => {
            build_message(descriptor, value, path).map(ReflectValueBox::Message)
        }
    }
}
