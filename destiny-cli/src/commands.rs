use std::path::PathBuf;

use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check an endpoint manifest without running it.
    Validate {
        path: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Run one request through an endpoint manifest and print the rendered response.
    Invoke {
        path: PathBuf,
        #[command(flatten)]
        request: RequestArgs,
        /// Engine configuration, as JSON or YAML.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Where http-log records go: tracing, stdout or none.
        #[arg(long, default_value = "tracing")]
        http_log: String,
        #[command(flatten)]
        mocks: MockArgs,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Create or upgrade the cache table.
    Migrate {
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Print a live cache entry.
    Get {
        key: String,
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
}
