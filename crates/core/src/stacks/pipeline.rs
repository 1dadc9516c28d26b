//! Two-stage release pipeline that builds and publishes the website.
//!
//! Stages run in declared order. An action may consume artifacts produced by
//! an earlier stage or by an earlier action of its own stage. A failed stage
//! halts the run and nothing is retried automatically.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};

use super::assets::AssetOutputs;
use super::edge::EdgeOutputs;
use super::identity::IdentityOutputs;
use crate::config::PipelineSettings;
use crate::error::{GraphError, Result};
use crate::graph::policy::actions;
use crate::graph::tokens::{get_att, reference};
use crate::graph::{
    LogicalId, Principal, ResourceArn, ResourceDescriptor, ResourceGraph, ResourceKind, RoleGrant,
};
use crate::naming;

pub const BUILD_ROLE_ID: &str = "CodeBuildRole";
pub const BUILD_POLICY_ID: &str = "CodeBuildRolePolicy";
pub const BUILD_LOGS_POLICY_ID: &str = "CodeBuildLogsPolicy";
pub const BUILD_INVALIDATION_POLICY_ID: &str = "CodeBuildInvalidationPolicy";
pub const BUILD_PROJECT_ID: &str = "AssetsBuildProject";
pub const PIPELINE_ROLE_ID: &str = "CodePipelineRole";
pub const PIPELINE_POLICY_ID: &str = "CodePipelineRolePolicy";
pub const PIPELINE_ID: &str = "AssetsPipeline";

pub const SOURCE_STAGE: &str = "Source";
pub const BUILD_STAGE: &str = "Build";

const CODEBUILD_SERVICE: &str = "codebuild.amazonaws.com";
const CODEPIPELINE_SERVICE: &str = "codepipeline.amazonaws.com";

/// A named unit of data passed between stages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ArtifactName(String);

impl ArtifactName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ActionKind {
    /// Pulls one archive object out of a bucket.
    S3Source { bucket: LogicalId, object_key: String },
    /// Runs a build project.
    Build { project: LogicalId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionDescriptor {
    pub name: String,
    pub kind: ActionKind,
    pub inputs: Vec<ArtifactName>,
    pub outputs: Vec<ArtifactName>,
}

impl ActionDescriptor {
    pub fn new(name: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn input(mut self, artifact: &ArtifactName) -> Self {
        self.inputs.push(artifact.clone());
        self
    }

    pub fn output(mut self, artifact: &ArtifactName) -> Self {
        self.outputs.push(artifact.clone());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageDescriptor {
    pub name: String,
    pub actions: Vec<ActionDescriptor>,
}

impl StageDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    pub fn action(mut self, action: ActionDescriptor) -> Self {
        self.actions.push(action);
        self
    }
}

/// Ordered stages of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineDescriptor {
    pub name: String,
    pub stages: Vec<StageDescriptor>,
}

impl PipelineDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    pub fn stage(mut self, stage: StageDescriptor) -> Self {
        self.stages.push(stage);
        self
    }

    /// Checks the declared order.
    ///
    /// An input must come from an earlier stage or from an action declared
    /// before the consumer in the same stage. Each artifact has exactly one
    /// producer.
    pub fn validate(&self) -> std::result::Result<(), GraphError> {
        let mut stage_names = BTreeSet::new();
        // artifact -> producing action, for stages already passed
        let mut available: BTreeMap<&ArtifactName, &str> = BTreeMap::new();

        for stage in &self.stages {
            if !stage_names.insert(stage.name.as_str()) {
                return Err(GraphError::DuplicateStage(stage.name.clone()));
            }
            if stage.actions.is_empty() {
                return Err(GraphError::EmptyStage(stage.name.clone()));
            }

            let mut action_names = BTreeSet::new();
            let mut produced: BTreeMap<&ArtifactName, &str> = BTreeMap::new();
            for action in &stage.actions {
                if !action_names.insert(action.name.as_str()) {
                    return Err(GraphError::DuplicateAction {
                        stage: stage.name.clone(),
                        action: action.name.clone(),
                    });
                }
                let missing = action
                    .inputs
                    .iter()
                    .find(|i| !available.contains_key(i) && !produced.contains_key(i));
                if let Some(input) = missing {
                    return Err(GraphError::ArtifactNotAvailable {
                        action: action.name.clone(),
                        artifact: input.to_string(),
                    });
                }
                for output in &action.outputs {
                    let first = available.get(output).or_else(|| produced.get(output));
                    if let Some(first) = first {
                        return Err(GraphError::DuplicateArtifact {
                            artifact: output.to_string(),
                            first: first.to_string(),
                            second: action.name.clone(),
                        });
                    }
                    produced.insert(output, action.name.as_str());
                }
            }
            available.extend(produced);
        }

        Ok(())
    }

    /// Stage list in the provider's pipeline shape.
    pub fn stages_value(&self) -> Value {
        let stages: Vec<Value> = self
            .stages
            .iter()
            .map(|stage| {
                let actions: Vec<Value> = run_orders(stage)
                    .into_iter()
                    .zip(&stage.actions)
                    .map(|(run_order, action)| action_value(action, run_order))
                    .collect();
                json!({ "Name": stage.name, "Actions": actions })
            })
            .collect();
        Value::Array(stages)
    }
}

/// Run order per action. Actions fed by a same-stage producer run after it;
/// everything else starts at 1.
fn run_orders(stage: &StageDescriptor) -> Vec<u32> {
    let mut producer_order: BTreeMap<&ArtifactName, u32> = BTreeMap::new();
    let mut orders = Vec::with_capacity(stage.actions.len());
    for action in &stage.actions {
        let order = action
            .inputs
            .iter()
            .filter_map(|input| producer_order.get(input))
            .max()
            .map_or(1, |after| after + 1);
        for output in &action.outputs {
            producer_order.insert(output, order);
        }
        orders.push(order);
    }
    orders
}

fn action_value(action: &ActionDescriptor, run_order: u32) -> Value {
    let (category, provider, configuration) = match &action.kind {
        ActionKind::S3Source { bucket, object_key } => (
            "Source",
            "S3",
            json!({
                "S3Bucket": reference(bucket),
                "S3ObjectKey": object_key,
                "PollForSourceChanges": false,
            }),
        ),
        ActionKind::Build { project } => (
            "Build",
            "CodeBuild",
            json!({ "ProjectName": reference(project) }),
        ),
    };
    let artifacts = |names: &[ArtifactName]| -> Vec<Value> {
        names.iter().map(|n| json!({ "Name": n.as_str() })).collect()
    };

    json!({
        "Name": action.name,
        "ActionTypeId": {
            "Category": category,
            "Owner": "AWS",
            "Provider": provider,
            "Version": "1",
        },
        "Configuration": configuration,
        "InputArtifacts": artifacts(&action.inputs),
        "OutputArtifacts": artifacts(&action.outputs),
        "RunOrder": run_order,
    })
}

/// Names and knobs the pipeline builder takes from the parameter set and config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineInputs {
    pub region: String,
    pub project_suffix: String,
    pub description: String,
    pub build_spec: String,
    pub build_role_name: String,
    pub pipeline_role_name: String,
    pub settings: PipelineSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutputs {
    pub descriptor: PipelineDescriptor,
    pub pipeline: LogicalId,
    pub build_project: LogicalId,
    pub build_role: LogicalId,
    pub pipeline_role: LogicalId,
}

/// Adds the build project, the pipeline, and both execution roles.
pub fn build_pipeline(
    graph: &mut ResourceGraph,
    assets: &AssetOutputs,
    edge: &EdgeOutputs,
    identity: &IdentityOutputs,
    project_name: &str,
    inputs: &PipelineInputs,
) -> Result<PipelineOutputs> {
    let storage_grant = |role: &LogicalId| {
        assets.buckets().into_iter().fold(
            RoleGrant::new(role).actions(actions::BUCKET_READ_WRITE),
            |grant, bucket| {
                grant
                    .resource(ResourceArn::Arn(bucket.clone()))
                    .resource(ResourceArn::ObjectsIn(bucket.clone()))
            },
        )
    };

    let build_role = graph.add(
        ResourceDescriptor::new(BUILD_ROLE_ID, ResourceKind::Role)
            .property(
                "RoleName",
                naming::scoped_name(project_name, &inputs.build_role_name),
            )
            .property(
                "AssumeRolePolicyDocument",
                Principal::Service(CODEBUILD_SERVICE).assume_role_policy(),
            ),
    )?;
    let mut build_policies = Vec::new();
    build_policies.extend(graph.grant(BUILD_POLICY_ID, storage_grant(&build_role))?);
    build_policies.extend(graph.grant(
        BUILD_LOGS_POLICY_ID,
        RoleGrant::new(&build_role)
            .actions(actions::LOG_WRITE)
            .resource(ResourceArn::Any),
    )?);
    if let Some(distribution) = &assets.distribution {
        build_policies.extend(graph.grant(
            BUILD_INVALIDATION_POLICY_ID,
            RoleGrant::new(&build_role)
                .actions(actions::CDN_INVALIDATE)
                .resource(ResourceArn::Distribution(distribution.clone())),
        )?);
    }

    let environment_variables: Vec<Value> = [
        ("API_GATEWAY_REGION", json!(inputs.region)),
        ("API_GATEWAY_URL", edge.url.clone()),
        ("COGNITO_REGION", json!(inputs.region)),
        ("COGNITO_USER_POOL_ID", reference(&identity.user_pool)),
        ("COGNITO_APP_CLIENT_ID", reference(&identity.user_pool_client)),
        ("COGNITO_IDENTITY_POOL_ID", reference(&identity.identity_pool)),
        ("WEBSITE_BUCKET", reference(&assets.website_bucket)),
    ]
    .into_iter()
    .map(|(name, value)| json!({ "Name": name, "Type": "PLAINTEXT", "Value": value }))
    .collect();

    let mut project = ResourceDescriptor::new(BUILD_PROJECT_ID, ResourceKind::BuildProject)
        .property(
            "Name",
            naming::scoped_name(project_name, &inputs.project_suffix),
        )
        .property(
            "Description",
            format!("{} for {}.", inputs.description, project_name),
        )
        .property("ServiceRole", get_att(&build_role, "Arn"))
        .property(
            "Source",
            json!({ "Type": "CODEPIPELINE", "BuildSpec": inputs.build_spec }),
        )
        .property("Artifacts", json!({ "Type": "CODEPIPELINE" }))
        .property(
            "Environment",
            json!({
                "Type": "LINUX_CONTAINER",
                "ComputeType": inputs.settings.compute_type,
                "Image": inputs.settings.build_image,
                "EnvironmentVariables": environment_variables,
            }),
        )
        .property("TimeoutInMinutes", inputs.settings.build_timeout_minutes)
        .property("Tags", json!([{ "Key": "app-name", "Value": project_name }]));
    for policy in &build_policies {
        project = project.depends_on(policy);
    }
    let build_project = graph.add(project)?;

    let pipeline_role = graph.add(
        ResourceDescriptor::new(PIPELINE_ROLE_ID, ResourceKind::Role)
            .property(
                "RoleName",
                naming::scoped_name(project_name, &inputs.pipeline_role_name),
            )
            .property(
                "AssumeRolePolicyDocument",
                Principal::Service(CODEPIPELINE_SERVICE).assume_role_policy(),
            ),
    )?;
    let pipeline_policy = graph.grant(PIPELINE_POLICY_ID, storage_grant(&pipeline_role))?;
    let trigger_policy = graph.grant(
        &format!("{}Trigger", PIPELINE_POLICY_ID),
        RoleGrant::new(&pipeline_role)
            .actions(actions::BUILD_START)
            .resource(ResourceArn::Arn(build_project.clone())),
    )?;

    let source_artifact = ArtifactName::new(format!("{}-SourceArtifact", project_name));
    let build_artifact = ArtifactName::new(format!("{}-BuildArtifact", project_name));
    let descriptor = PipelineDescriptor::new(format!("{}-Assets-Pipeline", project_name))
        .stage(
            StageDescriptor::new(SOURCE_STAGE).action(
                ActionDescriptor::new(
                    "S3Source",
                    ActionKind::S3Source {
                        bucket: assets.source_bucket.clone(),
                        object_key: inputs.settings.source_object_key.clone(),
                    },
                )
                .output(&source_artifact),
            ),
        )
        .stage(
            StageDescriptor::new(BUILD_STAGE).action(
                ActionDescriptor::new(
                    "CodeBuild",
                    ActionKind::Build {
                        project: build_project.clone(),
                    },
                )
                .input(&source_artifact)
                .output(&build_artifact),
            ),
        );
    descriptor.validate()?;

    let mut pipeline = ResourceDescriptor::new(PIPELINE_ID, ResourceKind::Pipeline)
        .property("Name", descriptor.name.as_str())
        .property("RoleArn", get_att(&pipeline_role, "Arn"))
        .property(
            "ArtifactStore",
            json!({ "Type": "S3", "Location": reference(&assets.artifacts_bucket) }),
        )
        .property("RestartExecutionOnUpdate", false)
        .property("Stages", descriptor.stages_value());
    for policy in pipeline_policy.iter().chain(trigger_policy.iter()) {
        pipeline = pipeline.depends_on(policy);
    }
    let pipeline = graph.add(pipeline)?;

    tracing::debug!(pipeline = %descriptor.name, "pipeline descriptors added");

    Ok(PipelineOutputs {
        descriptor,
        pipeline,
        build_project,
        build_role,
        pipeline_role,
    })
}
