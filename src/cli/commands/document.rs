//! Document commands - store items, get by key

use crate::cli::output::colors;
use crate::cli::OutputFormat;
use crate::core::services::Services;
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

/// Arguments for store
#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Index name
    pub index: String,

    /// JSON file holding an array of objects (or a single object)
    pub file: PathBuf,
}

/// Arguments for get
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Index name
    pub index: String,

    /// Key value
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct StoreResponse {
    pub index: String,
    pub submitted: usize,
    pub stored: usize,
}

/// Read items from a JSON file. A lone object counts as one item.
pub fn read_items(path: &PathBuf) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {e}", path.display()))?;

    match serde_json::from_str::<Value>(&contents)? {
        Value::Array(items) => Ok(items),
        item @ Value::Object(_) => Ok(vec![item]),
        _ => Err(format!("'{}' must hold a JSON array or object", path.display()).into()),
    }
}

/// Execute store command
pub async fn execute_store(
    args: StoreArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let items = read_items(&args.file)?;
    let submitted = items.len();
    let stored = services.provider.store(items, &args.index).await?;

    let response = StoreResponse {
        index: args.index,
        submitted,
        stored,
    };

    match format {
        OutputFormat::Human => {
            println!(
                "{} {} of {} items in '{}'",
                colors::success("Stored"),
                colors::number(&response.stored.to_string()),
                colors::number(&response.submitted.to_string()),
                colors::index_name(&response.index)
            );
            if response.stored < response.submitted {
                println!(
                    "{}",
                    colors::dim("Skipped items were logged; run with RUST_LOG=shelf=debug for detail")
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

/// Execute get command
pub async fn execute_get(
    args: GetArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = services
        .provider
        .get_document_by_id(&args.index, &args.id)
        .await?;

    match format {
        OutputFormat::Human => match &result.hit {
            Some(item) => println!("{}", serde_json::to_string_pretty(item)?),
            None => println!(
                "No item '{}' in '{}'",
                colors::label(&args.id),
                colors::index_name(&args.index)
            ),
        },
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
