mod registry;
mod resolve;
mod script;

pub use registry::{
    DependencyKeyResolver, InMemoryMockRegistry, MockLookup, MockRegistry, MockRegistryError,
    PrefixKeyResolver,
};
pub(crate) use resolve::{resolve, Resolved};
pub use script::{InterceptScript, MockDescriptor, MockScript, Rewrite};

use std::collections::HashMap;
use std::sync::Arc;

use destiny_core::TestConfig;

/// How dependency calls of a route may be substituted.
#[derive(Clone, Default)]
pub enum SubstitutionMode {
    #[default]
    Off,
    /// Fixed mocks per dependency key; interceptors are not applied.
    Test(TestConfig),
    /// Mocks and interceptors chosen per call through a registry. Only valid on the `dev` version.
    Dev {
        registry: Arc<dyn MockRegistry>,
        mock_version: String,
    },
}

impl std::fmt::Debug for SubstitutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubstitutionMode::Off => f.write_str("Off"),
            SubstitutionMode::Test(config) => f.debug_tuple("Test").field(config).finish(),
            SubstitutionMode::Dev { mock_version, .. } => f
                .debug_struct("Dev")
                .field("mock_version", mock_version)
                .finish_non_exhaustive(),
        }
    }
}

/// Named mocks and interceptors per dependency key.
#[derive(Clone, Default)]
pub struct MockCatalog {
    mocks: HashMap<String, HashMap<String, MockDescriptor>>,
    interceptors: HashMap<String, HashMap<String, Arc<dyn InterceptScript>>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mock(mut self, key: impl Into<String>, name: impl Into<String>, mock: MockDescriptor) -> Self {
        self.add_mock(key, name, mock);
        self
    }

    pub fn with_interceptor(
        mut self,
        key: impl Into<String>,
        name: impl Into<String>,
        script: Arc<dyn InterceptScript>,
    ) -> Self {
        self.interceptors
            .entry(key.into())
            .or_default()
            .insert(name.into(), script);
        self
    }

    pub fn add_mock(&mut self, key: impl Into<String>, name: impl Into<String>, mock: MockDescriptor) {
        self.mocks.entry(key.into()).or_default().insert(name.into(), mock);
    }

    pub fn has_mocks(&self, key: &str) -> bool {
        self.mocks.get(key).is_some_and(|m| !m.is_empty())
    }

    pub fn has_interceptors(&self, key: &str) -> bool {
        self.interceptors.get(key).is_some_and(|m| !m.is_empty())
    }

    pub fn mock(&self, key: &str, name: &str) -> Option<&MockDescriptor> {
        self.mocks.get(key)?.get(name)
    }

    pub fn interceptor(&self, key: &str, name: &str) -> Option<&Arc<dyn InterceptScript>> {
        self.interceptors.get(key)?.get(name)
    }
}

/// Key resolution plus the catalog, shared by every route of an engine.
#[derive(Clone)]
pub struct MockSupport {
    pub resolver: Arc<dyn DependencyKeyResolver>,
    pub catalog: Arc<MockCatalog>,
}

impl MockSupport {
    pub fn new(resolver: Arc<dyn DependencyKeyResolver>, catalog: MockCatalog) -> Self {
        Self {
            resolver,
            catalog: Arc::new(catalog),
        }
    }
}
