use std::collections::BTreeMap;

use thiserror::Error;

use super::{Environment, ParameterName};
use crate::error::ConfigError;

/// Key of the pointer naming the environment used when none is given.
pub const DEFAULT_ENVIRONMENT_KEY: &str = "Default-env";

/// A failure reported by a parameter store backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct StoreError(pub String);

impl From<StoreError> for ConfigError {
    fn from(err: StoreError) -> Self {
        ConfigError::Store(err.0)
    }
}

/// Read-only access to a hierarchical key-value parameter store.
///
/// Lookups are synchronous. Backends that talk to a remote service load a
/// snapshot up front and serve reads from it.
pub trait ParameterStore: Send + Sync {
    /// Reads a parameter by its full path. `Ok(None)` means it does not exist.
    fn get(&self, path: &str) -> Result<Option<String>, StoreError>;
}

/// Builds `/<namespace>/<environment>/<name>`.
pub fn parameter_path(namespace: &str, environment: Environment, name: ParameterName) -> String {
    format!("{}/{}", environment_prefix(namespace, environment), name)
}

/// Builds `/<namespace>/<environment>`.
pub fn environment_prefix(namespace: &str, environment: Environment) -> String {
    format!("/{}/{}", namespace.trim_matches('/'), environment)
}

/// Builds `/<namespace>/Default-env`.
pub fn default_environment_path(namespace: &str) -> String {
    format!("/{}/{}", namespace.trim_matches('/'), DEFAULT_ENVIRONMENT_KEY)
}

/// An in-memory snapshot of a parameter store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryParameterStore {
    values: BTreeMap<String, String>,
}

impl InMemoryParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value under a full path, replacing any previous value.
    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<String>) {
        self.values.insert(path.into(), value.into());
    }

    /// Loads a flat `name -> value` map for one environment.
    ///
    /// Every key must be a recognized parameter name.
    pub fn from_flat_map(
        namespace: &str,
        environment: Environment,
        values: BTreeMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let mut store = Self::new();
        for (key, value) in values {
            let name: ParameterName = key.parse()?;
            store.insert(parameter_path(namespace, environment, name), value);
        }
        Ok(store)
    }

    /// Seeds every recognized parameter for one environment with its seed value.
    pub fn with_seed_values(mut self, namespace: &str, environment: Environment) -> Self {
        for name in ParameterName::ALL {
            self.insert(
                parameter_path(namespace, environment, name),
                name.seed_value(),
            );
        }
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over `(path, value)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

impl ParameterStore for InMemoryParameterStore {
    fn get(&self, path: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(path).cloned())
    }
}

impl FromIterator<(String, String)> for InMemoryParameterStore {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
