use std::collections::{BTreeMap, HashMap};

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::store::{parameter_path, ParameterStore};
use super::{Environment, ParameterName};
use crate::error::ConfigError;

/// A complete set of resolved parameters for one environment.
///
/// Only [`ParameterResolver::resolve_all`] builds one, so every recognized
/// name always has a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentParameterSet {
    environment: Environment,
    values: [String; ParameterName::COUNT],
}

impl EnvironmentParameterSet {
    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn get(&self, name: ParameterName) -> &str {
        &self.values[name.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParameterName, &str)> {
        ParameterName::ALL
            .into_iter()
            .map(move |name| (name, self.get(name)))
    }
}

impl Serialize for EnvironmentParameterSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(ParameterName::COUNT))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name.as_str(), value)?;
        }
        map.end()
    }
}

/// Resolves parameters for a single environment during one synthesis pass.
///
/// A literal default wins over the store. Store reads happen at most once
/// per name; the cache lives exactly as long as the resolver.
pub struct ParameterResolver<'a> {
    namespace: &'a str,
    environment: Environment,
    defaults: &'a BTreeMap<ParameterName, String>,
    store: &'a dyn ParameterStore,
    cache: HashMap<ParameterName, String>,
}

impl<'a> ParameterResolver<'a> {
    pub fn new(
        namespace: &'a str,
        environment: Environment,
        defaults: &'a BTreeMap<ParameterName, String>,
        store: &'a dyn ParameterStore,
    ) -> Self {
        Self {
            namespace,
            environment,
            defaults,
            store,
            cache: HashMap::new(),
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Resolves one parameter, failing if neither a default nor the store has it.
    pub fn resolve(&mut self, name: ParameterName) -> Result<String, ConfigError> {
        if let Some(value) = self.cache.get(&name) {
            return Ok(value.clone());
        }

        let value = match self.defaults.get(&name) {
            Some(value) => value.clone(),
            None => {
                let path = parameter_path(self.namespace, self.environment, name);
                tracing::debug!(%path, "reading parameter from store");
                self.store
                    .get(&path)?
                    .ok_or_else(|| ConfigError::UnresolvedParameter {
                        name: name.to_string(),
                        path,
                    })?
            }
        };

        if value.trim().is_empty() {
            return Err(ConfigError::EmptyParameter {
                name: name.to_string(),
            });
        }

        self.cache.insert(name, value.clone());
        Ok(value)
    }

    /// Resolves every recognized parameter. Any single failure fails the whole set.
    pub fn resolve_all(&mut self) -> Result<EnvironmentParameterSet, ConfigError> {
        let mut resolved = Vec::with_capacity(ParameterName::COUNT);
        for name in ParameterName::ALL {
            resolved.push(self.resolve(name)?);
        }

        Ok(EnvironmentParameterSet {
            environment: self.environment,
            values: std::array::from_fn(|i| std::mem::take(&mut resolved[i])),
        })
    }
}

/// Validates `environment_id` against the allow-list, then resolves one parameter.
pub fn resolve(
    namespace: &str,
    environment_id: &str,
    name: ParameterName,
    defaults: &BTreeMap<ParameterName, String>,
    store: &dyn ParameterStore,
) -> Result<String, ConfigError> {
    let environment = Environment::parse(environment_id)?;
    ParameterResolver::new(namespace, environment, defaults, store).resolve(name)
}

/// Validates `environment_id` against the allow-list, then resolves every parameter.
pub fn resolve_all(
    namespace: &str,
    environment_id: &str,
    defaults: &BTreeMap<ParameterName, String>,
    store: &dyn ParameterStore,
) -> Result<EnvironmentParameterSet, ConfigError> {
    let environment = Environment::parse(environment_id)?;
    ParameterResolver::new(namespace, environment, defaults, store).resolve_all()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::params::store::{InMemoryParameterStore, StoreError};

    const NS: &str = "GoalStackEnvs";

    struct CountingStore {
        inner: InMemoryParameterStore,
        reads: AtomicUsize,
    }

    impl CountingStore {
        fn new(inner: InMemoryParameterStore) -> Self {
            Self {
                inner,
                reads: AtomicUsize::new(0),
            }
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl ParameterStore for CountingStore {
        fn get(&self, path: &str) -> Result<Option<String>, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get(path)
        }
    }

    struct FailingStore;

    impl ParameterStore for FailingStore {
        fn get(&self, _path: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError("access denied".to_string()))
        }
    }

    fn seeded(env: Environment) -> InMemoryParameterStore {
        InMemoryParameterStore::new().with_seed_values(NS, env)
    }

    #[test]
    fn test_resolve_all_returns_every_parameter() {
        let store = seeded(Environment::DevLocal);
        let defaults = BTreeMap::new();
        let set = resolve_all(NS, "Dev-local", &defaults, &store).unwrap();

        assert_eq!(set.environment(), Environment::DevLocal);
        assert_eq!(set.iter().count(), ParameterName::COUNT);
        for name in ParameterName::ALL {
            assert_eq!(set.get(name), name.seed_value());
        }
    }

    #[test]
    fn test_resolve_all_fails_on_single_missing_parameter() {
        let mut store = InMemoryParameterStore::new();
        for name in ParameterName::ALL {
            if name != ParameterName::WebsiteErrorDocument {
                store.insert(
                    parameter_path(NS, Environment::Test, name),
                    name.seed_value(),
                );
            }
        }
        let defaults = BTreeMap::new();

        let err = resolve_all(NS, "Test", &defaults, &store).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnresolvedParameter {
                name: "websiteErrorDocument".to_string(),
                path: "/GoalStackEnvs/Test/websiteErrorDocument".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_environment_fails_closed() {
        let store = seeded(Environment::DevLocal);
        let defaults = BTreeMap::new();

        let err = resolve_all(NS, "staging", &defaults, &store).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownEnvironment { .. }));

        let err = resolve(NS, "", ParameterName::TableName, &defaults, &store).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownEnvironment { .. }));
    }

    #[test]
    fn test_other_environment_values_are_not_used() {
        let store = seeded(Environment::Prod);
        let defaults = BTreeMap::new();

        let err = resolve(NS, "Test", ParameterName::TableName, &defaults, &store).unwrap_err();
        assert!(matches!(err, ConfigError::UnresolvedParameter { .. }));
    }

    #[test]
    fn test_default_takes_precedence_over_store() {
        let store = CountingStore::new(seeded(Environment::DevLocal));
        let mut defaults = BTreeMap::new();
        defaults.insert(ParameterName::TableName, "CDKGoals".to_string());

        let mut resolver = ParameterResolver::new(NS, Environment::DevLocal, &defaults, &store);
        assert_eq!(resolver.resolve(ParameterName::TableName).unwrap(), "CDKGoals");
        assert_eq!(store.reads(), 0);
    }

    #[test]
    fn test_store_is_read_once_per_key() {
        let store = CountingStore::new(seeded(Environment::DevLocal));
        let defaults = BTreeMap::new();
        let mut resolver = ParameterResolver::new(NS, Environment::DevLocal, &defaults, &store);

        let first = resolver.resolve(ParameterName::ApiName).unwrap();
        let second = resolver.resolve(ParameterName::ApiName).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.reads(), 1);

        resolver.resolve_all().unwrap();
        assert_eq!(store.reads(), ParameterName::COUNT);
    }

    #[test]
    fn test_new_resolver_does_not_share_cache() {
        let store = CountingStore::new(seeded(Environment::DevLocal));
        let defaults = BTreeMap::new();

        ParameterResolver::new(NS, Environment::DevLocal, &defaults, &store)
            .resolve(ParameterName::ApiName)
            .unwrap();
        ParameterResolver::new(NS, Environment::DevLocal, &defaults, &store)
            .resolve(ParameterName::ApiName)
            .unwrap();
        assert_eq!(store.reads(), 2);
    }

    #[test]
    fn test_empty_value_is_rejected() {
        let mut store = seeded(Environment::DevLocal);
        store.insert(
            parameter_path(NS, Environment::DevLocal, ParameterName::ApiName),
            "  ",
        );
        let defaults = BTreeMap::new();

        let err = resolve(NS, "Dev-local", ParameterName::ApiName, &defaults, &store).unwrap_err();
        assert_eq!(
            err,
            ConfigError::EmptyParameter {
                name: "apiName".to_string()
            }
        );
    }

    #[test]
    fn test_store_failure_is_a_config_error() {
        let defaults = BTreeMap::new();
        let err = resolve_all(NS, "Prod", &defaults, &FailingStore).unwrap_err();
        assert_eq!(err, ConfigError::Store("access denied".to_string()));
    }

    #[test]
    fn test_parameter_set_serializes_as_flat_map() {
        let store = seeded(Environment::DevLocal);
        let defaults = BTreeMap::new();
        let set = resolve_all(NS, "Dev-local", &defaults, &store).unwrap();

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["tableName"], "Goals");
        assert_eq!(json.as_object().unwrap().len(), ParameterName::COUNT);
    }
}
