//! Health command - verify the committed state of an index

use crate::cli::output::{colors, format_bytes};
use crate::cli::OutputFormat;
use crate::core::services::Services;
use clap::Args;

/// Arguments for the check-health command
#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Index name
    pub index: String,
}

/// Execute the check-health command
pub async fn execute(
    args: HealthArgs,
    services: &Services,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = services.provider.health_report(&args.index).await?;

    match format {
        OutputFormat::Human => {
            let status = if report.is_consistent {
                colors::success("healthy")
            } else {
                colors::error("unhealthy")
            };
            println!(
                "{}: {}",
                colors::label("Index"),
                colors::index_name(&report.index_name)
            );
            println!("  {}: {}", colors::label("Status"), status);
            println!(
                "  {}: {}",
                colors::label("Documents"),
                colors::number(&report.documents.to_string())
            );
            println!(
                "  {}: {}",
                colors::label("Segments"),
                colors::number(&report.segments.to_string())
            );
            println!(
                "  {}: {}",
                colors::label("Size"),
                colors::number(&format_bytes(report.size_bytes))
            );
            for file in &report.corrupted_files {
                println!("  {}: {}", colors::error("Corrupted"), file);
            }
            for error in &report.errors {
                println!("  {}: {}", colors::warning("Error"), error);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    if report.is_consistent {
        Ok(())
    } else {
        Err(format!("Index '{}' failed its health check", report.index_name).into())
    }
}
