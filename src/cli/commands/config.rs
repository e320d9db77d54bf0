//! Config command - show current configuration

use crate::cli::output::colors;
use crate::cli::OutputFormat;
use crate::core::services::Services;
use crate::core::storage::FieldSpec;
use clap::Args;
use serde::Serialize;

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Include declared fields of each index
    #[arg(long, short = 'a')]
    pub all: bool,
}

/// Configuration response
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub index_dir: String,
    pub gate_timeout_ms: u64,
    pub writer_heap_bytes: usize,
    pub indexes: Vec<IndexInfo>,
}

#[derive(Debug, Serialize)]
pub struct IndexInfo {
    pub names: Vec<String>,
    pub analyzer: &'static str,
    pub key_field: String,
    pub result_cap: usize,
    pub write_lock_timeout_ms: u64,
    pub read_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldSpec>>,
}

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = &services.config;

    let response = ConfigResponse {
        index_dir: config.storage.index_dir.to_string_lossy().into_owned(),
        gate_timeout_ms: config.sessions.gate_timeout_ms,
        writer_heap_bytes: config.sessions.writer_heap_bytes,
        indexes: config
            .indexes
            .iter()
            .map(|index| IndexInfo {
                names: index.indexes.clone(),
                analyzer: index.analyzer.name(),
                key_field: index.schema.key_field.clone(),
                result_cap: index.result_cap,
                write_lock_timeout_ms: index.write_lock_timeout_ms,
                read_only: index.read_only,
                fields: args.all.then(|| index.schema.fields.clone()),
            })
            .collect(),
    };

    match format {
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  index_dir: {}", response.index_dir);
            println!("  sessions:");
            println!("    gate_timeout_ms: {}", response.gate_timeout_ms);
            println!("    writer_heap_bytes: {}", response.writer_heap_bytes);
            if response.indexes.is_empty() {
                println!(
                    "  {}",
                    colors::dim("No [[indexes]] declared; every index command will fail")
                );
            }
            for index in &response.indexes {
                println!("  indexes {:?}:", index.names);
                println!("    analyzer: {}", index.analyzer);
                println!("    key_field: {}", index.key_field);
                println!("    result_cap: {}", index.result_cap);
                println!("    write_lock_timeout_ms: {}", index.write_lock_timeout_ms);
                println!("    read_only: {}", index.read_only);
                if let Some(fields) = &index.fields {
                    for field in fields {
                        println!("    field {}: {:?}", field.name, field.kind);
                    }
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
