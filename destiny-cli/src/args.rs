use clap::Args;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct StoreArgs {
    /// Postgres URL of the cache store; falls back to DESTINY_DATABASE_URL / DATABASE_URL.
    #[arg(long)]
    pub store: Option<String>,
    #[arg(long, default_value_t = 5)]
    pub max_connections: u32,
}

#[derive(Debug, Args, Clone)]
pub struct RequestArgs {
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,
    #[arg(long = "header", value_name = "NAME=VALUE")]
    pub headers: Vec<String>,
    /// RESTful ids, in path order.
    #[arg(long = "id-path", value_name = "ID")]
    pub id_path: Vec<String>,
    #[arg(id = "request_path", long = "path", default_value = "/")]
    pub path: String,
    #[arg(long, default_value = "1.0.0")]
    pub api_version: String,
    #[arg(long)]
    pub remote_ip: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct MockArgs {
    /// Dependency key to pinned mock, as JSON or YAML.
    #[arg(long, requires = "mocks")]
    pub test_config: Option<std::path::PathBuf>,
    /// Static mocks per dependency, as JSON or YAML.
    #[arg(long)]
    pub mocks: Option<std::path::PathBuf>,
}
