//! CLI adapter for shelf
//!
//! Thin clap front end over [`crate::core::provider::IndexProvider`].
//! Every command runs inside a unit of work, so writes are committed
//! when the command finishes.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

/// Shelf - session-managed document indexes
///
/// Create, fill, query and maintain the indexes declared in the
/// `[[indexes]]` tables of the configuration file.
#[derive(Parser, Debug)]
#[command(name = "shelf")]
#[command(version)]
#[command(about = "Session-managed document indexes over Tantivy", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub format: OutputFormat,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an empty index if it does not exist yet
    #[command(name = "create-index")]
    CreateIndex(commands::index::CreateArgs),

    /// Delete an index and its files
    #[command(name = "delete-index")]
    DeleteIndex(commands::index::DeleteArgs),

    /// Replace an index with a rebuilt one
    Swap(commands::index::SwapArgs),

    /// Store a JSON array of items
    Store(commands::document::StoreArgs),

    /// Fetch one item by key
    Get(commands::document::GetArgs),

    /// Search an index with filters, sorts and paging
    Search(commands::SearchArgs),

    /// Verify the committed state of an index
    #[command(name = "check-health")]
    CheckHealth(commands::HealthArgs),

    /// Show current configuration
    #[command(name = "show-config")]
    ShowConfig(commands::ConfigArgs),

    /// Generate shell completion scripts
    ///
    /// Output completion script to stdout. To install:
    ///
    ///   bash:  shelf completions bash > ~/.local/share/bash-completion/completions/shelf
    ///   zsh:   shelf completions zsh > ~/.zfunc/_shelf
    ///   fish:  shelf completions fish > ~/.config/fish/completions/shelf.fish
    Completions(commands::CompletionsArgs),
}

/// Run the CLI with the provided arguments
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    use crate::core::config::Config;
    use crate::core::scope::ScopeEnd;
    use crate::core::services::Services;
    use crate::core::xdg::XdgDirs;

    // Handle completions command early (doesn't need services)
    if let Commands::Completions(args) = cli.command {
        return commands::completions::execute(args);
    }

    let xdg = XdgDirs::new();
    xdg.ensure_dirs_exist()?;

    let config = Config::load_with_xdg(&xdg)?;
    config.log_config();

    let services = Services::new(config)?;
    let scope = services.provider.begin_unit_of_work(ScopeEnd::Close);

    let result = match cli.command {
        Commands::CreateIndex(args) => {
            commands::index::execute_create(args, &services, cli.format).await
        }
        Commands::DeleteIndex(args) => {
            commands::index::execute_delete(args, &services, cli.format).await
        }
        Commands::Swap(args) => commands::index::execute_swap(args, &services, cli.format).await,
        Commands::Store(args) => {
            commands::document::execute_store(args, &services, cli.format).await
        }
        Commands::Get(args) => commands::document::execute_get(args, &services, cli.format).await,
        Commands::Search(args) => commands::search::execute(args, &services, cli.format).await,
        Commands::CheckHealth(args) => {
            commands::health::execute(args, &services, cli.format).await
        }
        Commands::ShowConfig(args) => commands::config::execute(args, &services, cli.format).await,
        Commands::Completions(_) => unreachable!(), // Handled above
    };

    scope.complete().await;
    result
}
