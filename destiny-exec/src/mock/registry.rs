use std::collections::HashMap;

use async_trait::async_trait;
use destiny_core::MockSelection;
use tokio::sync::RwLock;

/// Maps a dependency target to the key mocks are filed under.
pub trait DependencyKeyResolver: Send + Sync {
    fn resolve(&self, api_version: &str, target: &str) -> Option<String>;
}

/// Resolves the key whose registered prefix is the longest match for the target.
#[derive(Debug, Clone, Default)]
pub struct PrefixKeyResolver {
    entries: Vec<(String, String)>,
}

impl PrefixKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, prefix: impl Into<String>, key: impl Into<String>) -> Self {
        self.entries.push((prefix.into(), key.into()));
        self
    }
}

impl DependencyKeyResolver for PrefixKeyResolver {
    fn resolve(&self, _api_version: &str, target: &str) -> Option<String> {
        self.entries
            .iter()
            .filter(|(prefix, _)| target.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, key)| key.clone())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MockRegistryError {
    #[error("mock registry unavailable: {0}")]
    Unavailable(String),
    #[error("mock registry error: {0}")]
    Other(String),
}

/// Selections found for one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockLookup {
    pub mock: Option<MockSelection>,
    pub interceptor: Option<MockSelection>,
}

/// Dev-time store of which mock or interceptor is switched on per key path.
///
/// Paths look like `<mock version>:<key>` for mocks and `<mock version>:int/<key>`
/// for interceptors, keys lowercased.
#[async_trait]
pub trait MockRegistry: Send + Sync {
    async fn find(&self, paths: &[String]) -> Result<MockLookup, MockRegistryError>;
}

#[derive(Debug, Default)]
pub struct InMemoryMockRegistry {
    selections: RwLock<HashMap<String, MockSelection>>,
}

impl InMemoryMockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, path: impl Into<String>, selection: MockSelection) {
        self.selections.write().await.insert(path.into(), selection);
    }

    pub async fn clear(&self, path: &str) {
        self.selections.write().await.remove(path);
    }
}

pub(crate) fn is_interceptor_path(path: &str) -> bool {
    path.split_once(':').is_some_and(|(_, rest)| rest.starts_with("int/"))
}

#[async_trait]
impl MockRegistry for InMemoryMockRegistry {
    async fn find(&self, paths: &[String]) -> Result<MockLookup, MockRegistryError> {
        let selections = self.selections.read().await;
        let mut lookup = MockLookup::default();
        for path in paths {
            let Some(selection) = selections.get(path) else {
                continue;
            };
            if is_interceptor_path(path) {
                lookup.interceptor = Some(selection.clone());
            } else {
                lookup.mock = Some(selection.clone());
            }
        }
        Ok(lookup)
    }
}
