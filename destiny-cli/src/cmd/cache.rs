use destiny_store::CacheStore;
use serde::Serialize;
use serde_json::Value;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{OutputArgs, StoreArgs};

use super::config::{connect_store, get_database_url};

#[derive(Serialize)]
struct CacheEntry {
    key: String,
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
}

pub async fn cache_get_cmd(key: &str, store: StoreArgs, output: OutputArgs) -> i32 {
    let Some(database_url) = get_database_url(&store) else {
        print_error(
            output.format,
            output.quiet,
            "missing database url (use --store or set DESTINY_DATABASE_URL / DATABASE_URL)",
        );
        return exit_codes::RUNTIME_ERROR;
    };
    let Some(pg) = connect_store(&database_url, &store, &output).await else {
        return exit_codes::RUNTIME_ERROR;
    };

    let raw = match pg.get(key).await {
        Ok(raw) => raw,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("cache read failed: {e}"));
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let entry = CacheEntry {
        key: key.to_string(),
        found: raw.is_some(),
        // Response entries are JSON; client entries may be plain text.
        value: raw.map(|s| serde_json::from_str(&s).unwrap_or(Value::String(s))),
    };
    match (&entry.value, output.format == OutputFormat::Text && !output.quiet) {
        (None, true) => eprintln!("no live entry for {key}"),
        _ => print_result(output.format, output.quiet, &entry),
    }
    exit_codes::SUCCESS
}
