use std::sync::Arc;

use destiny_core::{ClientError, MockSelection};

use super::{InterceptScript, MockDescriptor, MockSupport, SubstitutionMode};
use crate::workflow::Substitution;

pub(crate) const DEV_VERSION: &str = "dev";

/// Mock and interceptor chosen for one call.
#[derive(Default)]
pub(crate) struct Resolved {
    pub mock: Option<(String, MockDescriptor, MockSelection)>,
    pub interceptor: Option<(String, Arc<dyn InterceptScript>, MockSelection)>,
}

impl Resolved {
    pub fn substitution(&self) -> Option<Substitution> {
        if self.mock.is_none() && self.interceptor.is_none() {
            return None;
        }
        Some(Substitution {
            mock: self.mock.as_ref().map(|(_, _, s)| s.clone()),
            interceptor: self.interceptor.as_ref().map(|(_, _, s)| s.clone()),
        })
    }
}

fn no_mock(name: &str) -> ClientError {
    ClientError::server(format!("No mock {name}"))
}

/// Pick the mock and interceptor for `target`, if the route substitutes calls.
pub(crate) async fn resolve(
    mode: &SubstitutionMode,
    support: Option<&MockSupport>,
    api_version: &str,
    target: &str,
) -> Result<Resolved, ClientError> {
    let Some(support) = support else {
        return Ok(Resolved::default());
    };

    match mode {
        SubstitutionMode::Off => Ok(Resolved::default()),
        SubstitutionMode::Test(config) => {
            let Some(key) = support.resolver.resolve(api_version, target) else {
                return Ok(Resolved::default());
            };
            let Some(entry) = config.get(&key) else {
                return Ok(Resolved::default());
            };
            let selection = entry.selection();
            let mock = support
                .catalog
                .mock(&key, &entry.mock)
                .ok_or_else(|| no_mock(&entry.mock))?;
            Ok(Resolved {
                mock: Some((entry.mock.clone(), mock.clone(), selection)),
                interceptor: None,
            })
        }
        SubstitutionMode::Dev {
            registry,
            mock_version,
        } => {
            if api_version != DEV_VERSION {
                tracing::warn!(target: "destiny", "mock lookup requested outside of dev ({api_version})");
                return Err(ClientError::server("server error (2)"));
            }
            let Some(key) = support.resolver.resolve(api_version, target) else {
                return Ok(Resolved::default());
            };
            let lowered = key.to_lowercase();
            let mut paths = Vec::with_capacity(2);
            if support.catalog.has_mocks(&key) {
                paths.push(format!("{mock_version}:{lowered}"));
            }
            if support.catalog.has_interceptors(&key) {
                paths.push(format!("{mock_version}:int/{lowered}"));
            }
            if paths.is_empty() {
                return Ok(Resolved::default());
            }

            let lookup = registry.find(&paths).await.map_err(|e| {
                tracing::warn!(target: "destiny", "{e}");
                ClientError::server("server error (2)")
            })?;

            let mut resolved = Resolved::default();
            if let Some(selection) = lookup.mock {
                if let Some(name) = selection.mock.clone() {
                    let mock = support.catalog.mock(&key, &name).ok_or_else(|| no_mock(&name))?;
                    resolved.mock = Some((name, mock.clone(), selection));
                }
            }
            if let Some(selection) = lookup.interceptor {
                if let Some(name) = selection.mock.clone() {
                    let script = support
                        .catalog
                        .interceptor(&key, &name)
                        .ok_or_else(|| no_mock(&name))?;
                    resolved.interceptor = Some((name, script.clone(), selection));
                }
            }
            Ok(resolved)
        }
    }
}
