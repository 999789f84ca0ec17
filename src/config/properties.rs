//! Java-style `.properties` files.
//!
//! One `key=value` or `key: value` entry per line. Lines starting with `#`
//! or `!` are comments; blank lines are ignored. A key without a separator
//! maps to an empty value.

use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PropertiesError {
    #[error("Failed to read properties file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Empty key on line {line}")]
    EmptyKey { line: usize },
}

/// Ordered key/value configuration entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, PropertiesError> {
        let content = std::fs::read_to_string(path).map_err(|source| PropertiesError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, PropertiesError> {
        let mut entries = BTreeMap::new();
        for (i, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let (key, value) = match line.find(['=', ':']) {
                Some(at) => (line[..at].trim(), line[at + 1..].trim()),
                None => (line, ""),
            };
            if key.is_empty() {
                return Err(PropertiesError::EmptyKey { line: i + 1 });
            }
            entries.insert(key.to_string(), value.to_string());
        }
        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Set `key` only when it has no value yet.
    pub fn set_default(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .entry(key.to_string())
            .or_insert_with(|| value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let props = Properties::parse(
            "# broker\n\
             bootstrap.servers = broker:9092\n\
             ! comment\n\
             \n\
             security.protocol: SASL_SSL\n\
             sasl.jaas.config=a=b\n\
             enable.idempotence\n",
        )
        .unwrap();
        assert_eq!(props.len(), 4);
        assert_eq!(props.get("bootstrap.servers"), Some("broker:9092"));
        assert_eq!(props.get("security.protocol"), Some("SASL_SSL"));
        assert_eq!(props.get("sasl.jaas.config"), Some("a=b"));
        assert_eq!(props.get("enable.idempotence"), Some(""));
    }

    #[test]
    fn test_empty_key() {
        assert!(matches!(
            Properties::parse("a=1\n=2"),
            Err(PropertiesError::EmptyKey { line: 2 })
        ));
    }

    #[test]
    fn test_set_default_keeps_existing() {
        let mut props = Properties::parse("bootstrap.servers=broker:9092").unwrap();
        props.set_default("bootstrap.servers", "localhost:9092");
        props.set_default("linger.ms", "5");
        assert_eq!(props.get("bootstrap.servers"), Some("broker:9092"));
        assert_eq!(props.get("linger.ms"), Some("5"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Properties::load(&dir.path().join("nope.properties")),
            Err(PropertiesError::Io { .. })
        ));
    }
}
