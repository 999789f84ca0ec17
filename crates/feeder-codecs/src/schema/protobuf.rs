//! Protobuf IDL parsing and dynamic descriptor building.

use crate::error::SchemaError;
use protobuf::descriptor::FileDescriptorProto;
use protobuf::reflect::{FileDescriptor, MessageDescriptor};
use protobuf_parse::Parser;
use std::io::Write;
use std::path::Path;

/// Result of parsing a `.proto` resource.
#[derive(Debug, Clone)]
pub(crate) struct ParsedIdl {
    /// The parsed file followed by whatever it imports
    pub files: Vec<FileDescriptorProto>,
    /// Descriptor name of the parsed file
    pub main_file: String,
    /// Fully qualified name of the first message in the file
    pub main_message: String,
}

/// Parse `.proto` text. The file is written to a scratch directory under its
/// own basename so the parser reports it by that name.
pub(crate) fn parse_idl(resource: &str, content: &str) -> Result<ParsedIdl, SchemaError> {
    let parse_error = |message: String| SchemaError::Parse {
        resource: resource.to_string(),
        message,
    };

    let file_name = Path::new(resource)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("schema.proto")
        .to_string();

    let dir = tempfile::tempdir()
        .map_err(|e| parse_error(format!("Failed to create temp dir: {e}")))?;
    let path = dir.path().join(&file_name);
    let mut file = std::fs::File::create(&path)
        .map_err(|e| parse_error(format!("Failed to create temp file: {e}")))?;
    file.write_all(content.as_bytes())
        .map_err(|e| parse_error(format!("Failed to write temp file: {e}")))?;
    drop(file);

    let parsed = Parser::new()
        .pure()
        .include(dir.path())
        .input(&path)
        .parse_and_typecheck()
        .map_err(|e| parse_error(e.to_string()))?;

    let main = parsed
        .file_descriptors
        .iter()
        .find(|fd| fd.name() == file_name)
        .ok_or_else(|| parse_error(format!("parser did not return '{file_name}'")))?;

    let first = main
        .message_type
        .first()
        .ok_or_else(|| parse_error("schema declares no message".to_string()))?;
    let main_message = match main.package() {
        "" => first.name().to_string(),
        package => format!("{package}.{}", first.name()),
    };

    Ok(ParsedIdl {
        main_file: file_name,
        main_message,
        files: parsed.file_descriptors,
    })
}

/// Build a dynamic [`FileDescriptor`] for `main`, building its imports first.
pub(crate) fn compile(
    files: &[FileDescriptorProto],
    main: &str,
) -> Result<FileDescriptor, String> {
    let mut built: Vec<FileDescriptor> = Vec::new();
    let mut pending: Vec<&FileDescriptorProto> = files.iter().collect();

    while !pending.is_empty() {
        let before = pending.len();
        let mut blocked = Vec::new();
        for proto in pending {
            let deps: Vec<FileDescriptor> = proto
                .dependency
                .iter()
                .filter_map(|dep| built.iter().find(|b| b.proto().name() == dep).cloned())
                .collect();
            if deps.len() < proto.dependency.len() {
                blocked.push(proto);
                continue;
            }
            let file = FileDescriptor::new_dynamic(proto.clone(), &deps)
                .map_err(|e| format!("{}: {e}", proto.name()))?;
            built.push(file);
        }
        if blocked.len() == before {
            let names: Vec<&str> = blocked.iter().map(|p| p.name()).collect();
            return Err(format!("unresolved imports in {}", names.join(", ")));
        }
        pending = blocked;
    }

    built
        .into_iter()
        .find(|file| file.proto().name() == main)
        .ok_or_else(|| format!("file '{main}' not found among parsed descriptors"))
}

/// Look up a message by fully qualified name in a built file.
pub(crate) fn message(file: &FileDescriptor, full_name: &str) -> Option<MessageDescriptor> {
    let relative = match file.package() {
        "" => full_name,
        package => full_name
            .strip_prefix(package)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(full_name),
    };
    file.message_by_package_relative_name(relative)
}
