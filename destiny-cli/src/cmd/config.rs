use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use destiny_core::{parse_document_str, DocumentFormat};
use destiny_exec::{MockCatalog, MockDescriptor, MockSupport, PrefixKeyResolver};
use destiny_store::PostgresCacheStore;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::output::print_error;
use crate::utils::{parse_key_value, redact_url_password};
use crate::{OutputArgs, StoreArgs};

pub fn read_file(path: &Path, output: &OutputArgs) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) => {
            print_error(
                output.format,
                output.quiet,
                &format!("failed to read {}: {e}", path.display()),
            );
            None
        }
    }
}

/// Load a JSON or YAML file into `T`, reporting failures as `what`.
pub fn load_document<T: DeserializeOwned>(path: &Path, what: &str, output: &OutputArgs) -> Option<T> {
    let content = read_file(path, output)?;
    match parse_document_str::<T>(&content, DocumentFormat::Auto) {
        Ok((value, _)) => Some(value),
        Err(e) => {
            print_error(output.format, output.quiet, &format!("invalid {what}: {e}"));
            None
        }
    }
}

pub fn parse_pairs(raw: &[String], output: &OutputArgs) -> Option<Vec<(String, String)>> {
    let mut pairs = Vec::with_capacity(raw.len());
    for item in raw {
        match parse_key_value(item) {
            Ok(pair) => pairs.push(pair),
            Err(e) => {
                print_error(output.format, output.quiet, &e);
                return None;
            }
        }
    }
    Some(pairs)
}

pub fn get_database_url(store: &StoreArgs) -> Option<String> {
    store
        .store
        .clone()
        .or_else(|| std::env::var("DESTINY_DATABASE_URL").ok())
        .or_else(|| std::env::var("DATABASE_URL").ok())
}

pub async fn connect_store(
    database_url: &str,
    store: &StoreArgs,
    output: &OutputArgs,
) -> Option<PostgresCacheStore> {
    match PostgresCacheStore::connect(database_url, store.max_connections).await {
        Ok(pg) => Some(pg),
        Err(e) => {
            print_error(
                output.format,
                output.quiet,
                &format!(
                    "database connection failed to {}: {e}",
                    redact_url_password(database_url)
                ),
            );
            None
        }
    }
}

/// Static mocks for the dependencies a manifest calls.
///
/// ```yaml
/// dependencies:
///   - prefix: https://drivers.example/
///     key: Drivers
///     mocks:
///       happy: { name: lewis }
/// ```
#[derive(Debug, Deserialize)]
pub struct MocksFile {
    #[serde(default)]
    pub dependencies: Vec<MockedDependency>,
}

#[derive(Debug, Deserialize)]
pub struct MockedDependency {
    pub prefix: String,
    pub key: String,
    #[serde(default)]
    pub mocks: BTreeMap<String, Value>,
}

impl MocksFile {
    pub fn into_support(self) -> MockSupport {
        let mut resolver = PrefixKeyResolver::new();
        let mut catalog = MockCatalog::new();
        for dep in self.dependencies {
            resolver = resolver.with(dep.prefix, dep.key.clone());
            for (name, body) in dep.mocks {
                catalog.add_mock(dep.key.clone(), name, MockDescriptor::Static(body));
            }
        }
        MockSupport::new(Arc::new(resolver), catalog)
    }
}
