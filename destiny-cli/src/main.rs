use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod cmd;
mod commands;
mod exit_codes;
mod output;
mod utils;

pub use args::*;
use commands::{CacheCommand, Command};

#[derive(Debug, Parser)]
#[command(name = "destiny", version, about = "Destiny endpoint runner")]
struct Cli {
    /// Log filter, e.g. `debug` or `destiny=trace`; overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let exit_code = rt.block_on(run_command(cli.command));
    std::process::exit(exit_code);
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run_command(command: Command) -> i32 {
    match command {
        Command::Validate { path, output } => cmd::validate::validate_cmd(&path, output).await,
        Command::Invoke {
            path,
            request,
            config,
            http_log,
            mocks,
            output,
            store,
        } => {
            cmd::invoke::invoke_cmd(
                &path,
                request,
                config.as_deref(),
                &http_log,
                mocks,
                output,
                store,
            )
            .await
        }
        Command::Migrate { store, output } => cmd::migrate::migrate_cmd(store, output).await,
        Command::Cache { command } => match command {
            CacheCommand::Get { key, store, output } => {
                cmd::cache::cache_get_cmd(&key, store, output).await
            }
        },
    }
}
