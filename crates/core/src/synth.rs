//! Composition root (Functional Core).
//!
//! One call, one pass: validate the configuration, resolve every parameter,
//! run the builders in dependency order, and check the finished graph.
//! Either the whole graph comes back or nothing does.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::config::SynthConfig;
use crate::error::Result;
use crate::graph::{LogicalId, ResourceGraph};
use crate::naming;
use crate::params::{Environment, EnvironmentParameterSet, ParameterName, ParameterResolver, ParameterStore};
use crate::stacks::{
    build_assets, build_edge, build_handlers, build_identity, build_pipeline, build_storage,
    validate_routes, AssetSettings, EdgeSettings, IdentitySettings, PipelineDescriptor,
    PipelineInputs, RouteBinding, TableSettings,
};

pub const OUTPUT_TABLE_NAME: &str = "TableName";
pub const OUTPUT_API_URL: &str = "ApiUrl";
pub const OUTPUT_USER_POOL_ID: &str = "UserPoolId";
pub const OUTPUT_USER_POOL_CLIENT_ID: &str = "UserPoolClientId";
pub const OUTPUT_IDENTITY_POOL_ID: &str = "IdentityPoolId";
pub const OUTPUT_WEBSITE_BUCKET_NAME: &str = "WebsiteBucketName";
pub const OUTPUT_CDN_URL: &str = "CdnUrl";

/// The result of one successful synthesis pass.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub project_name: String,
    pub environment: Environment,
    pub params: EnvironmentParameterSet,
    pub graph: ResourceGraph,
    pub routes: Vec<RouteBinding>,
    pub pipeline: PipelineDescriptor,
    /// Named values exported to the operator.
    pub outputs: BTreeMap<String, Value>,
    order: Vec<LogicalId>,
}

impl Synthesis {
    /// A valid build order over every descriptor.
    pub fn build_order(&self) -> &[LogicalId] {
        &self.order
    }

    /// Physical table name, as exported.
    pub fn table_name(&self) -> Option<&str> {
        self.outputs.get(OUTPUT_TABLE_NAME).and_then(Value::as_str)
    }
}

/// Runs one synthesis pass.
///
/// The project name, environment and settings records are validated before
/// the store is touched or a descriptor is built.
pub fn synthesize(config: &SynthConfig, store: &dyn ParameterStore) -> Result<Synthesis> {
    naming::validate_project_name(&config.project_name)?;
    let environment = Environment::parse(&config.environment)?;
    config.validate_settings()?;

    let project = config.project_name.as_str();
    let span = tracing::debug_span!("synthesize", project, %environment);
    let _guard = span.enter();

    let params = ParameterResolver::new(
        &config.namespace,
        environment,
        &config.parameter_defaults,
        store,
    )
    .resolve_all()?;
    tracing::debug!("parameters resolved");

    let mut graph = ResourceGraph::new();

    let storage = build_storage(
        &mut graph,
        project,
        &TableSettings {
            table_name: params.get(ParameterName::TableName).to_string(),
            partition_key: params.get(ParameterName::PartitionKeyName).to_string(),
            sort_key: params.get(ParameterName::SortKeyName).to_string(),
        },
    )?;

    let compute = build_handlers(&mut graph, &storage, project, &config.handlers)?;

    let identity = build_identity(
        &mut graph,
        project,
        &IdentitySettings {
            user_pool_name: params.get(ParameterName::UserPoolName).to_string(),
            user_pool_client_name: params.get(ParameterName::UserPoolClientName).to_string(),
            identity_pool_name: params.get(ParameterName::IdentityPoolName).to_string(),
            allow_unauthenticated: config.allow_unauthenticated_identities,
            password_policy: config.password_policy,
            verification: config.verification.clone(),
        },
    )?;

    let edge = build_edge(
        &mut graph,
        &compute,
        &identity,
        project,
        &EdgeSettings {
            api_name: params.get(ParameterName::ApiName).to_string(),
            authorizer_name: params.get(ParameterName::AuthorizorName).to_string(),
            environment,
        },
    )?;

    let assets = build_assets(
        &mut graph,
        project,
        &AssetSettings {
            environment,
            website_index_document: params.get(ParameterName::WebsiteIndexDocument).to_string(),
            website_error_document: params.get(ParameterName::WebsiteErrorDocument).to_string(),
            deploy_source: params.get(ParameterName::S3WebsiteDeploySource).to_string(),
            cdn_enabled: config.cdn_enabled,
            cdn_index_document: params.get(ParameterName::CdnWebsiteIndexDocument).to_string(),
            cdn_comment: params.get(ParameterName::CdnComment).to_string(),
        },
    )?;

    let pipeline = build_pipeline(
        &mut graph,
        &assets,
        &edge,
        &identity,
        project,
        &PipelineInputs {
            region: config.region.clone(),
            project_suffix: params.get(ParameterName::PipelineProjectName).to_string(),
            description: params
                .get(ParameterName::PipelineProjectDescription)
                .to_string(),
            build_spec: params.get(ParameterName::PipelineProjectBuildSpec).to_string(),
            build_role_name: params.get(ParameterName::CodeBuildRoleName).to_string(),
            pipeline_role_name: params.get(ParameterName::CodePipelineRoleName).to_string(),
            settings: config.pipeline.clone(),
        },
    )?;

    validate_routes(&edge.routes)?;
    pipeline.descriptor.validate()?;
    let order: Vec<LogicalId> = graph.topological_order()?.into_iter().cloned().collect();

    let mut outputs = BTreeMap::new();
    outputs.insert(OUTPUT_TABLE_NAME.to_string(), json!(storage.table_name));
    outputs.insert(OUTPUT_API_URL.to_string(), edge.url.clone());
    outputs.insert(
        OUTPUT_USER_POOL_ID.to_string(),
        json!({ "Ref": identity.user_pool.as_str() }),
    );
    outputs.insert(
        OUTPUT_USER_POOL_CLIENT_ID.to_string(),
        json!({ "Ref": identity.user_pool_client.as_str() }),
    );
    outputs.insert(
        OUTPUT_IDENTITY_POOL_ID.to_string(),
        json!({ "Ref": identity.identity_pool.as_str() }),
    );
    outputs.insert(
        OUTPUT_WEBSITE_BUCKET_NAME.to_string(),
        json!(assets.website_bucket_name),
    );
    if let Some(url) = &assets.cdn_url {
        outputs.insert(OUTPUT_CDN_URL.to_string(), url.clone());
    }

    tracing::info!(
        project,
        %environment,
        descriptors = graph.len(),
        "synthesis complete"
    );

    Ok(Synthesis {
        project_name: config.project_name.clone(),
        environment,
        params,
        graph,
        routes: edge.routes,
        pipeline: pipeline.descriptor,
        outputs,
        order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixtures::config;
    use crate::error::{ConfigError, SynthError};
    use crate::graph::ResourceKind;
    use crate::params::InMemoryParameterStore;

    fn store(environment: Environment) -> InMemoryParameterStore {
        InMemoryParameterStore::new().with_seed_values("GoalStackEnvs", environment)
    }

    #[test]
    fn test_scenario_table_name() {
        let cfg = config("MyCDKGoals", "Test").with_table_name("CDKGoals");
        let synthesis = synthesize(&cfg, &store(Environment::Test)).unwrap();

        assert_eq!(synthesis.table_name(), Some("MyCDKGoals-CDKGoals"));
    }

    #[test]
    fn test_build_order_covers_graph() {
        let synthesis = synthesize(&config("MyCDKGoals", "Test"), &store(Environment::Test)).unwrap();
        assert_eq!(synthesis.build_order().len(), synthesis.graph.len());
    }

    #[test]
    fn test_cdn_toggle_controls_output() {
        let mut cfg = config("MyCDKGoals", "Test");
        cfg.cdn_enabled = false;
        let synthesis = synthesize(&cfg, &store(Environment::Test)).unwrap();

        assert!(!synthesis.outputs.contains_key(OUTPUT_CDN_URL));
        assert_eq!(synthesis.graph.of_kind(ResourceKind::Distribution).count(), 0);
    }

    #[test]
    fn test_unknown_environment_fails_closed() {
        let err = synthesize(&config("MyCDKGoals", "Staging"), &store(Environment::Staging))
            .unwrap_err();
        assert!(matches!(
            err,
            SynthError::Config(ConfigError::UnknownEnvironment { .. })
        ));
    }

    #[test]
    fn test_missing_parameter_aborts() {
        let err = synthesize(&config("MyCDKGoals", "Prod"), &store(Environment::Test)).unwrap_err();
        assert!(matches!(
            err,
            SynthError::Config(ConfigError::UnresolvedParameter { .. })
        ));
    }

    #[test]
    fn test_invalid_table_name_is_a_config_error() {
        let mut bad = store(Environment::Test);
        bad.insert("/GoalStackEnvs/Test/tableName", "goals table");

        let err = synthesize(&config("MyCDKGoals", "Test"), &bad).unwrap_err();
        assert!(matches!(
            err,
            SynthError::Config(ConfigError::InvalidResourceName { .. })
        ));
    }

    #[test]
    fn test_invalid_settings_abort_before_resolution() {
        let mut cfg = config("MyCDKGoals", "Test");
        cfg.handlers.memory_mb = 1;
        let err = synthesize(&cfg, &InMemoryParameterStore::new()).unwrap_err();
        assert!(matches!(
            err,
            SynthError::Config(ConfigError::InvalidSetting { .. })
        ));
    }
}
