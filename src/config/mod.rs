//! Command-line arguments and the resolved run configuration.

mod duration;
mod properties;

pub use duration::parse_interval;
pub use properties::{Properties, PropertiesError};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use record_source::DEFAULT_API_URL;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TOPIC: &str = "public-french-addresses";
pub const DEFAULT_BOOTSTRAP_SERVERS: &str = "localhost:9092";
pub const DEFAULT_SCHEMA_REGISTRY_URL: &str = "http://localhost:8081";
pub const DEFAULT_MESSAGE_TIMEOUT_MS: &str = "30000";

/// Registry location; read from the properties but never passed to Kafka.
pub const SCHEMA_REGISTRY_URL_KEY: &str = "schema.registry.url";
/// Reject JSON Schema payloads that fail validation.
pub const FAIL_INVALID_SCHEMA_KEY: &str = "json.fail.invalid.schema";

/// Where input records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Query the HTTP search API
    Api,
    /// Generate records locally
    Synthetic,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "topic-feeder", version)]
#[command(about = "Produce sample records to a Kafka topic in several wire formats")]
pub struct FeederArgs {
    /// Topic to produce records to
    #[arg(long, default_value = DEFAULT_TOPIC)]
    pub topic: String,

    /// avro, json, json-schema, protobuf, text, xml, malformed or invalid-json
    #[arg(long, alias = "type", default_value = "json")]
    pub format: String,

    /// Properties file for the Kafka producer
    #[arg(long)]
    pub properties: Option<PathBuf>,

    /// Produce records every interval (e.g. "1000", "500ms", "5s")
    #[arg(long, value_parser = parse_interval)]
    pub every: Option<Duration>,

    /// Record source
    #[arg(long, value_enum, default_value_t = SourceKind::Api)]
    pub source: SourceKind,

    /// Number of records per run for the synthetic source
    #[arg(long, default_value_t = 10)]
    pub count: usize,

    /// Seed for the synthetic source; random when absent
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory to load schemas from instead of the built-in ones
    #[arg(long)]
    pub schemas_dir: Option<PathBuf>,

    /// Search API URL template, `%s` is replaced by the query
    #[arg(long, env = "FEEDER_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Schema registry URL, used when the properties do not set one
    #[arg(long, env = "FEEDER_SCHEMA_REGISTRY_URL")]
    pub schema_registry_url: Option<String>,

    /// Query passed to the record source
    #[arg(default_value = "kafka")]
    pub query: String,
}

/// Everything a run needs, with defaults applied.
#[derive(Debug, Clone)]
pub struct FeederConfig {
    pub topic: String,
    pub format: String,
    pub query: String,
    pub every: Option<Duration>,
    pub source: SourceKind,
    pub count: usize,
    pub seed: u64,
    pub schemas_dir: Option<PathBuf>,
    pub api_url: String,
    pub schema_registry_url: String,
    pub fail_invalid_schema: bool,
    /// Entries for the Kafka client
    pub kafka: Properties,
}

impl FeederConfig {
    pub fn from_args(args: FeederArgs) -> anyhow::Result<Self> {
        let properties = match &args.properties {
            Some(path) => Properties::load(path)
                .with_context(|| format!("Failed to load producer properties from {path:?}"))?,
            None => Properties::new(),
        };
        Self::resolve(args, properties)
    }

    /// Apply defaults and split registry settings out of the Kafka entries.
    pub fn resolve(args: FeederArgs, mut kafka: Properties) -> anyhow::Result<Self> {
        kafka.set_default("bootstrap.servers", DEFAULT_BOOTSTRAP_SERVERS);
        kafka.set_default("message.timeout.ms", DEFAULT_MESSAGE_TIMEOUT_MS);
        kafka.set_default(
            SCHEMA_REGISTRY_URL_KEY,
            args.schema_registry_url
                .clone()
                .unwrap_or_else(|| DEFAULT_SCHEMA_REGISTRY_URL.to_string()),
        );

        let schema_registry_url = kafka
            .remove(SCHEMA_REGISTRY_URL_KEY)
            .unwrap_or_else(|| DEFAULT_SCHEMA_REGISTRY_URL.to_string());
        let fail_invalid_schema = match kafka.remove(FAIL_INVALID_SCHEMA_KEY) {
            Some(value) => value
                .trim()
                .parse::<bool>()
                .with_context(|| format!("Invalid value for {FAIL_INVALID_SCHEMA_KEY}: {value}"))?,
            None => false,
        };

        Ok(Self {
            topic: args.topic,
            format: args.format,
            query: args.query,
            every: args.every,
            source: args.source,
            count: args.count,
            seed: args.seed.unwrap_or_else(rand::random),
            schemas_dir: args.schemas_dir,
            api_url: args.api_url,
            schema_registry_url,
            fail_invalid_schema,
            kafka,
        })
    }
}
