//! Wire format selection.

use std::fmt;
use std::str::FromStr;

/// The closed set of wire formats a record can be encoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    Avro,
    Json,
    JsonSchema,
    Protobuf,
    Text,
    Xml,
    Malformed,
    InvalidJson,
}

impl FormatKind {
    /// All formats, in the order they are listed to users.
    pub const ALL: [FormatKind; 8] = [
        FormatKind::Avro,
        FormatKind::Json,
        FormatKind::JsonSchema,
        FormatKind::Protobuf,
        FormatKind::Text,
        FormatKind::Xml,
        FormatKind::Malformed,
        FormatKind::InvalidJson,
    ];

    /// Canonical, kebab-case name of the format.
    pub fn name(&self) -> &'static str {
        match self {
            FormatKind::Avro => "avro",
            FormatKind::Json => "json",
            FormatKind::JsonSchema => "json-schema",
            FormatKind::Protobuf => "protobuf",
            FormatKind::Text => "text",
            FormatKind::Xml => "xml",
            FormatKind::Malformed => "malformed",
            FormatKind::InvalidJson => "invalid-json",
        }
    }

    /// Whether the format needs schemas registered before encoding.
    pub fn uses_schema_registry(&self) -> bool {
        matches!(
            self,
            FormatKind::Avro | FormatKind::JsonSchema | FormatKind::Protobuf | FormatKind::InvalidJson
        )
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Returned when a format name matches none of the known formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFormat(pub String);

impl fmt::Display for UnknownFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown format '{}'", self.0)
    }
}

impl std::error::Error for UnknownFormat {}

impl FromStr for FormatKind {
    type Err = UnknownFormat;

    /// Case-insensitive; `-` and `_` separators are optional, so `jsonSchema`,
    /// `json_schema` and `JSON-SCHEMA` all select [`FormatKind::JsonSchema`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "avro" => Ok(FormatKind::Avro),
            "json" => Ok(FormatKind::Json),
            "jsonschema" => Ok(FormatKind::JsonSchema),
            "protobuf" | "proto" => Ok(FormatKind::Protobuf),
            "text" => Ok(FormatKind::Text),
            "xml" => Ok(FormatKind::Xml),
            "malformed" => Ok(FormatKind::Malformed),
            "invalidjson" => Ok(FormatKind::InvalidJson),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}
