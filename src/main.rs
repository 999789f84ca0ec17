//! Command-line interface for topic-feeder
//!
//! ```bash
//! topic-feeder --format json-schema --properties producer.properties paris
//! RUST_LOG=debug topic-feeder --format protobuf --every 1000
//! ```

use anyhow::Context;
use clap::Parser;
use feeder_codecs::{CodecRegistry, HttpSchemaRegistry, SchemaProvider};
use record_source::{ApiSource, RecordSource, SyntheticSource};
use std::sync::Arc;
use topic_feeder::{Feeder, FeederArgs, FeederConfig, KafkaPublisher, SourceKind};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = FeederConfig::from_args(FeederArgs::parse())?;

    let source: Box<dyn RecordSource> = match config.source {
        SourceKind::Api => Box::new(ApiSource::new(&config.api_url)),
        SourceKind::Synthetic => {
            Box::new(SyntheticSource::new(config.seed).with_count(config.count))
        }
    };
    info!("Records come from {}", source.describe());
    info!(
        "About to produce records to topic '{}', format is '{}'",
        config.topic, config.format
    );
    let provider = match &config.schemas_dir {
        Some(dir) => SchemaProvider::from_dir(dir),
        None => SchemaProvider::embedded(),
    };
    let codec = CodecRegistry::new(provider)
        .with_json_schema_validation(config.fail_invalid_schema)
        .select(&config.format);
    if codec.format().uses_schema_registry() {
        info!("Schema registry URL is {}", config.schema_registry_url);
    }

    let registry = Arc::new(HttpSchemaRegistry::new(&config.schema_registry_url));
    let publisher =
        Arc::new(KafkaPublisher::new(&config.kafka).context("Failed to set up the Kafka producer")?);

    let mut feeder = Feeder::new(
        source,
        codec,
        registry,
        publisher,
        &config.topic,
        &config.query,
    );

    match config.every {
        Some(interval) => {
            feeder.run_every(interval, None).await;
        }
        None => {
            feeder.run_once().await?;
        }
    }
    Ok(())
}
