//! Shelf CLI - command-line interface for shelf indexes
//!
//! # Examples
//!
//! ```bash
//! # Create an index declared in the config file
//! shelf create-index BlogPost
//!
//! # Store items and look one up
//! shelf store BlogPost posts.json
//! shelf get BlogPost 10
//!
//! # Filter, sort and page
//! shelf search BlogPost --must TagIds=11 --sort PublishedDate:desc --page 1 --page-size 5
//!
//! # Replace an index with a rebuilt one
//! shelf swap BlogPost_temp BlogPost
//! ```

use clap::Parser;
use shelf::cli::output::print_error;
use shelf::cli::{run, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "shelf=info".into());

    // Logs go to stderr so stdout stays parseable
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    if let Err(e) = run(cli).await {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}
