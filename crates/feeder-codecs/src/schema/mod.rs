//! Schema resources and their parsing.
//!
//! Schemas are looked up by resource name (e.g. `avro/value-schema.json`).
//! The built-in set is compiled into the binary; a directory on disk can be
//! used instead to try out other schemas without rebuilding. Nothing is
//! cached: every [`SchemaProvider::load`] re-reads and re-parses.

pub mod json_schema;
pub mod protobuf;

use crate::error::SchemaError;
use ::protobuf::descriptor::FileDescriptorProto;
use apache_avro::Schema;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resource names of the schemas shipped with the feeder.
pub mod resources {
    pub const AVRO_KEY: &str = "avro/key-schema.json";
    pub const AVRO_VALUE: &str = "avro/value-schema.json";
    pub const AVRO_POINT: &str = "avro/point-schema.json";
    pub const PROTOBUF_KEY: &str = "protobuf/key-schema.proto";
    pub const PROTOBUF_VALUE: &str = "protobuf/value-schema.proto";
    pub const JSON_SCHEMA_KEY: &str = "json-schema/key-schema.json";
    pub const JSON_SCHEMA_VALUE: &str = "json-schema/value-schema.json";
}

const EMBEDDED: &[(&str, &str)] = &[
    (
        resources::AVRO_KEY,
        include_str!("../../resources/avro/key-schema.json"),
    ),
    (
        resources::AVRO_VALUE,
        include_str!("../../resources/avro/value-schema.json"),
    ),
    (
        resources::AVRO_POINT,
        include_str!("../../resources/avro/point-schema.json"),
    ),
    (
        resources::PROTOBUF_KEY,
        include_str!("../../resources/protobuf/key-schema.proto"),
    ),
    (
        resources::PROTOBUF_VALUE,
        include_str!("../../resources/protobuf/value-schema.proto"),
    ),
    (
        resources::JSON_SCHEMA_KEY,
        include_str!("../../resources/json-schema/key-schema.json"),
    ),
    (
        resources::JSON_SCHEMA_VALUE,
        include_str!("../../resources/json-schema/value-schema.json"),
    ),
];

/// Schema language of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    Avro,
    Protobuf,
    JsonSchema,
}

impl SchemaFormat {
    /// Infer the schema language from a resource name.
    fn of_resource(resource: &str) -> Option<Self> {
        if resource.ends_with(".proto") {
            Some(SchemaFormat::Protobuf)
        } else if resource.starts_with("avro/") || resource.ends_with(".avsc") {
            Some(SchemaFormat::Avro)
        } else if resource.starts_with("json-schema/") {
            Some(SchemaFormat::JsonSchema)
        } else {
            None
        }
    }

    /// The `schemaType` a Confluent-compatible registry expects.
    ///
    /// Avro is the registry default and is sent without a type.
    pub fn registry_type(&self) -> Option<&'static str> {
        match self {
            SchemaFormat::Avro => None,
            SchemaFormat::Protobuf => Some("PROTOBUF"),
            SchemaFormat::JsonSchema => Some("JSON"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ParsedSchema {
    Json(Value),
    Avro {
        document: Value,
        /// Named types the schema depends on, then the schema itself
        schemata: Vec<Schema>,
    },
    Protobuf {
        files: Vec<FileDescriptorProto>,
        main: String,
    },
}

/// A loaded and syntactically valid schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    /// Resource the schema was loaded from
    pub resource: String,
    /// Schema language
    pub format: SchemaFormat,
    /// Qualified name of the main type (e.g. `feeder.geo.Point`)
    pub name: String,
    /// Schema text as registered
    pub body: String,
    parsed: ParsedSchema,
}

impl SchemaDescriptor {
    /// The schema document, for Avro and JSON Schema resources.
    pub fn json(&self) -> Option<&Value> {
        match &self.parsed {
            ParsedSchema::Json(value) => Some(value),
            ParsedSchema::Avro { document, .. } => Some(document),
            ParsedSchema::Protobuf { .. } => None,
        }
    }

    /// Parsed Avro schemas, the schema itself last, preceded by the named
    /// types it refers to.
    pub fn avro_schemata(&self) -> Option<&[Schema]> {
        match &self.parsed {
            ParsedSchema::Avro { schemata, .. } => Some(schemata),
            _ => None,
        }
    }

    /// File descriptors and the name of the main file, for Protobuf resources.
    pub fn file_descriptors(&self) -> Option<(&[FileDescriptorProto], &str)> {
        match &self.parsed {
            ParsedSchema::Protobuf { files, main } => Some((files, main)),
            _ => None,
        }
    }
}

/// Loads schema resources by name.
#[derive(Debug, Clone, Default)]
pub enum SchemaProvider {
    /// Schemas compiled into the binary
    #[default]
    Embedded,
    /// Schemas read from a directory, using the same relative names
    Directory(PathBuf),
}

impl SchemaProvider {
    pub fn embedded() -> Self {
        SchemaProvider::Embedded
    }

    pub fn from_dir(path: impl AsRef<Path>) -> Self {
        SchemaProvider::Directory(path.as_ref().to_path_buf())
    }

    /// Read the raw text of a resource.
    pub fn read(&self, resource: &str) -> Result<String, SchemaError> {
        match self {
            SchemaProvider::Embedded => EMBEDDED
                .iter()
                .find(|(name, _)| *name == resource)
                .map(|(_, content)| content.to_string())
                .ok_or_else(|| SchemaError::ResourceNotFound(resource.to_string())),
            SchemaProvider::Directory(dir) => {
                let path = dir.join(resource);
                std::fs::read_to_string(&path).map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => {
                        SchemaError::ResourceNotFound(path.display().to_string())
                    }
                    _ => SchemaError::Io {
                        resource: resource.to_string(),
                        source: e,
                    },
                })
            }
        }
    }

    /// Read and parse a resource in the schema language implied by its name.
    pub fn load(&self, resource: &str) -> Result<SchemaDescriptor, SchemaError> {
        let format = SchemaFormat::of_resource(resource).ok_or_else(|| SchemaError::Parse {
            resource: resource.to_string(),
            message: "cannot infer the schema language from the resource name".to_string(),
        })?;
        let body = self.read(resource)?;

        let descriptor = match format {
            SchemaFormat::Avro => {
                let document: Value =
                    serde_json::from_str(&body).map_err(|e| SchemaError::Parse {
                        resource: resource.to_string(),
                        message: e.to_string(),
                    })?;
                let schemata = self.parse_avro(resource, &body)?;
                let name = schemata
                    .last()
                    .and_then(Schema::name)
                    .map(|name| name.fullname(None))
                    .unwrap_or_else(|| resource.to_string());
                SchemaDescriptor {
                    resource: resource.to_string(),
                    format,
                    name,
                    body,
                    parsed: ParsedSchema::Avro { document, schemata },
                }
            }
            SchemaFormat::JsonSchema => {
                let document = parse_json_object(resource, &body)?;
                let name = document
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or(resource)
                    .to_string();
                SchemaDescriptor {
                    resource: resource.to_string(),
                    format,
                    name,
                    body,
                    parsed: ParsedSchema::Json(document),
                }
            }
            SchemaFormat::Protobuf => {
                let parsed = self::protobuf::parse_idl(resource, &body)?;
                SchemaDescriptor {
                    resource: resource.to_string(),
                    format,
                    name: parsed.main_message,
                    body,
                    parsed: ParsedSchema::Protobuf {
                        files: parsed.files,
                        main: parsed.main_file,
                    },
                }
            }
        };

        debug!(
            "Loaded {:?} schema '{}' from {}",
            descriptor.format, descriptor.name, descriptor.resource
        );
        Ok(descriptor)
    }

    /// Parse an Avro schema. Named types it does not define are resolved
    /// against the other named Avro resources that parse on their own.
    fn parse_avro(&self, resource: &str, body: &str) -> Result<Vec<Schema>, SchemaError> {
        let standalone = match Schema::parse_str(body) {
            Ok(schema) => return Ok(vec![schema]),
            Err(e) => e,
        };
        let parse_error = |error: apache_avro::Error| SchemaError::Parse {
            resource: resource.to_string(),
            message: error.to_string(),
        };

        let dependencies: Vec<String> = self
            .avro_resources()
            .into_iter()
            .filter(|other| other != resource)
            .filter_map(|other| self.read(&other).ok())
            .filter(|text| Schema::parse_str(text).is_ok_and(|schema| schema.name().is_some()))
            .collect();
        if dependencies.is_empty() {
            return Err(parse_error(standalone));
        }

        let mut inputs: Vec<&str> = dependencies.iter().map(String::as_str).collect();
        inputs.push(body);
        // The standalone error names what is missing or broken in the schema
        Schema::parse_list(&inputs).map_err(|_| parse_error(standalone))
    }

    /// Names of the Avro resources this provider can read.
    fn avro_resources(&self) -> Vec<String> {
        match self {
            SchemaProvider::Embedded => EMBEDDED
                .iter()
                .map(|(name, _)| name.to_string())
                .filter(|name| SchemaFormat::of_resource(name) == Some(SchemaFormat::Avro))
                .collect(),
            SchemaProvider::Directory(dir) => {
                let Ok(entries) = std::fs::read_dir(dir.join("avro")) else {
                    return Vec::new();
                };
                let mut names: Vec<String> = entries
                    .filter_map(Result::ok)
                    .filter(|entry| entry.path().is_file())
                    .filter_map(|entry| entry.file_name().into_string().ok())
                    .map(|file| format!("avro/{file}"))
                    .collect();
                names.sort();
                names
            }
        }
    }
}

fn parse_json_object(resource: &str, body: &str) -> Result<Value, SchemaError> {
    let document: Value = serde_json::from_str(body).map_err(|e| SchemaError::Parse {
        resource: resource.to_string(),
        message: e.to_string(),
    })?;
    if !document.is_object() {
        return Err(SchemaError::Parse {
            resource: resource.to_string(),
            message: "schema document must be a JSON object".to_string(),
        });
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_embedded_avro() {
        let provider = SchemaProvider::embedded();
        let point = provider.load(resources::AVRO_POINT).unwrap();
        assert_eq!(point.format, SchemaFormat::Avro);
        assert_eq!(point.name, "feeder.geo.Point");
        assert!(point.json().is_some());

        let value = provider.load(resources::AVRO_VALUE).unwrap();
        assert_eq!(value.name, "feeder.addresses.Address");
        let schemata = value.avro_schemata().unwrap();
        assert_eq!(
            schemata.last().and_then(Schema::name).map(|n| n.fullname(None)),
            Some("feeder.addresses.Address".to_string())
        );
    }

    #[test]
    fn test_load_embedded_protobuf() {
        let provider = SchemaProvider::embedded();
        let value = provider.load(resources::PROTOBUF_VALUE).unwrap();
        assert_eq!(value.format, SchemaFormat::Protobuf);
        assert_eq!(value.name, "feeder.addresses.Address");
        let (files, main) = value.file_descriptors().unwrap();
        assert_eq!(main, "value-schema.proto");
        assert!(!files.is_empty());
    }

    #[test]
    fn test_load_embedded_json_schema() {
        let provider = SchemaProvider::embedded();
        let value = provider.load(resources::JSON_SCHEMA_VALUE).unwrap();
        assert_eq!(value.format, SchemaFormat::JsonSchema);
        assert_eq!(value.name, "Address");
    }

    #[test]
    fn test_every_embedded_resource_loads() {
        let provider = SchemaProvider::embedded();
        for (resource, _) in EMBEDDED {
            provider.load(resource).unwrap();
        }
    }

    #[test]
    fn test_missing_resource() {
        let provider = SchemaProvider::embedded();
        let err = provider.load("avro/nope.json").unwrap_err();
        assert!(matches!(err, SchemaError::ResourceNotFound(_)));
    }

    #[test]
    fn test_directory_provider() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("avro")).unwrap();
        std::fs::write(dir.path().join("avro/broken.json"), "{ not json").unwrap();
        std::fs::write(
            dir.path().join("avro/untyped.json"),
            r#"{"name": "Thing"}"#,
        )
        .unwrap();

        let provider = SchemaProvider::from_dir(dir.path());
        assert!(matches!(
            provider.load("avro/broken.json"),
            Err(SchemaError::Parse { .. })
        ));
        assert!(matches!(
            provider.load("avro/untyped.json"),
            Err(SchemaError::Parse { .. })
        ));
        assert!(matches!(
            provider.load("avro/key-schema.json"),
            Err(SchemaError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn test_directory_avro_is_parsed_as_avro() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("avro")).unwrap();
        std::fs::write(
            dir.path().join("avro/fields-not-a-list.json"),
            r#"{"type":"record","name":"Broken","fields":"oops"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("avro/key-schema.json"), r#""string""#).unwrap();
        std::fs::write(
            dir.path().join("avro/dangling.json"),
            r#"{"type":"record","name":"Dangling","fields":[{"name":"p","type":"nowhere.Point"}]}"#,
        )
        .unwrap();

        let provider = SchemaProvider::from_dir(dir.path());
        assert!(matches!(
            provider.load("avro/fields-not-a-list.json"),
            Err(SchemaError::Parse { .. })
        ));
        assert!(matches!(
            provider.load("avro/dangling.json"),
            Err(SchemaError::Parse { .. })
        ));

        let primitive = provider.load("avro/key-schema.json").unwrap();
        assert_eq!(primitive.name, "avro/key-schema.json");
        assert_eq!(primitive.avro_schemata().unwrap(), &[Schema::String]);
    }

    #[test]
    fn test_directory_avro_references_resolve_against_siblings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("avro")).unwrap();
        for resource in [resources::AVRO_POINT, resources::AVRO_VALUE] {
            let body = SchemaProvider::embedded().read(resource).unwrap();
            std::fs::write(dir.path().join(resource), body).unwrap();
        }

        let provider = SchemaProvider::from_dir(dir.path());
        let value = provider.load(resources::AVRO_VALUE).unwrap();
        assert_eq!(value.name, "feeder.addresses.Address");
        assert_eq!(value.avro_schemata().unwrap().len(), 2);

        std::fs::remove_file(dir.path().join(resources::AVRO_POINT)).unwrap();
        assert!(matches!(
            provider.load(resources::AVRO_VALUE),
            Err(SchemaError::Parse { .. })
        ));
    }

    #[test]
    fn test_unknown_schema_language() {
        let provider = SchemaProvider::embedded();
        assert!(matches!(
            provider.load("schemas/thing.yaml"),
            Err(SchemaError::Parse { .. })
        ));
    }
}
