//! Index lifecycle commands - create, delete, swap

use crate::cli::output::colors;
use crate::cli::OutputFormat;
use crate::core::services::Services;
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};

/// Arguments for create-index
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Index name (must be declared in the configuration)
    pub index: String,
}

/// Arguments for delete-index
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Index name
    pub index: String,

    /// Skip confirmation prompt
    #[arg(long, short = 'f')]
    pub force: bool,
}

/// Arguments for swap
#[derive(Args, Debug)]
pub struct SwapArgs {
    /// Rebuilt index that replaces the target
    pub temp: String,

    /// Index being replaced
    pub target: String,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub index: String,
    pub action: &'static str,
    pub ok: bool,
}

/// Execute create-index command
pub async fn execute_create(
    args: CreateArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    services
        .provider
        .create_index_if_not_exists(&args.index)
        .await?;

    let response = IndexResponse {
        index: args.index,
        action: "create",
        ok: true,
    };

    match format {
        OutputFormat::Human => {
            println!(
                "{} index '{}'",
                colors::success("Ready"),
                colors::index_name(&response.index)
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

/// Execute delete-index command
pub async fn execute_delete(
    args: DeleteArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    // Confirmation prompt unless --force
    if !args.force {
        print!(
            "Delete index '{}'? [y/N] ",
            colors::index_name(&args.index)
        );
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("{}", colors::dim("Cancelled."));
            return Ok(());
        }
    }

    services.provider.delete_index(&args.index).await?;

    let response = IndexResponse {
        index: args.index,
        action: "delete",
        ok: true,
    };

    match format {
        OutputFormat::Human => {
            println!(
                "{} index '{}'",
                colors::success("Deleted"),
                colors::index_name(&response.index)
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

/// Execute swap command
pub async fn execute_swap(
    args: SwapArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let swapped = services
        .provider
        .swap_index(&args.temp, &args.target)
        .await?;

    let response = IndexResponse {
        index: args.target,
        action: "swap",
        ok: swapped,
    };

    match format {
        OutputFormat::Human => {
            if swapped {
                println!(
                    "{} '{}' with '{}'",
                    colors::success("Replaced"),
                    colors::index_name(&response.index),
                    colors::index_name(&args.temp)
                );
            } else {
                println!(
                    "{}: '{}' was not swapped (source index missing or unusable)",
                    colors::warning("Skipped"),
                    colors::index_name(&response.index)
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    if swapped {
        Ok(())
    } else {
        Err(format!("Swap of '{}' into '{}' failed", args.temp, response.index).into())
    }
}
