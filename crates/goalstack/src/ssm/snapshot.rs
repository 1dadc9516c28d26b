//! Loads parameter store contents into an in-memory snapshot.
//!
//! Synthesis reads parameters synchronously, so every remote read happens
//! here, once, before synthesis starts.

use std::collections::BTreeMap;
use std::path::Path;

use aws_sdk_ssm::Client;
use goalstack_core::params::{
    default_environment_path, environment_prefix, InMemoryParameterStore,
};
use goalstack_core::Environment;

use super::client;
use super::error::{Result, SsmError};

/// Fetches everything stored for `environment`.
pub async fn load_snapshot(
    client: &Client,
    namespace: &str,
    environment: Environment,
) -> Result<InMemoryParameterStore> {
    let prefix = environment_prefix(namespace, environment);
    let values = client::get_parameters_by_path(client, &prefix).await?;
    Ok(values.into_iter().collect())
}

/// Loads a flat `name -> value` JSON file as the snapshot for `environment`.
pub fn load_offline(
    path: &Path,
    namespace: &str,
    environment: Environment,
) -> Result<InMemoryParameterStore> {
    let contents = std::fs::read_to_string(path)?;
    let values = parse_flat_map(&contents)?;
    Ok(InMemoryParameterStore::from_flat_map(
        namespace,
        environment,
        values,
    )?)
}

fn parse_flat_map(contents: &str) -> Result<BTreeMap<String, String>> {
    Ok(serde_json::from_str(contents)?)
}

/// Picks the environment to synthesize.
///
/// An explicit identifier wins. Otherwise the store's default pointer is
/// read. Either way the value is checked against the allow-list.
pub async fn resolve_environment(
    client: &Client,
    namespace: &str,
    explicit: Option<&str>,
) -> Result<Environment> {
    let id = match explicit {
        Some(id) => id.to_string(),
        None => {
            let path = default_environment_path(namespace);
            client::get_parameter(client, &path)
                .await?
                .ok_or(SsmError::MissingDefaultEnvironment { path })?
        }
    };
    Ok(Environment::parse(&id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use goalstack_core::params::ParameterStore;

    #[test]
    fn test_parse_flat_map() {
        let values = parse_flat_map(r#"{ "tableName": "Goals", "apiName": "apiGw" }"#).unwrap();
        assert_eq!(values.get("tableName"), Some(&"Goals".to_string()));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_parse_flat_map_rejects_nested_values() {
        assert!(matches!(
            parse_flat_map(r#"{ "tableName": { "value": "Goals" } }"#),
            Err(SsmError::Json(_))
        ));
    }

    #[test]
    fn test_load_offline_scopes_to_environment() {
        let path = std::env::temp_dir().join(format!(
            "goalstack-offline-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{ "tableName": "Goals" }"#).unwrap();

        let store = load_offline(&path, "GoalStackEnvs", Environment::Test).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(
            store.get("/GoalStackEnvs/Test/tableName").unwrap(),
            Some("Goals".to_string())
        );
    }

    #[test]
    fn test_load_offline_rejects_unknown_names() {
        let path = std::env::temp_dir().join(format!(
            "goalstack-offline-unknown-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{ "tableNmae": "Goals" }"#).unwrap();

        let result = load_offline(&path, "GoalStackEnvs", Environment::Test);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(SsmError::Config(_))));
    }
}
