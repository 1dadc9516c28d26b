use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::tokens::collect_references;

/// Stable logical name of a descriptor, unique within one graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LogicalId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// The kind of provisioned unit a descriptor stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Table,
    Role,
    Policy,
    Function,
    FunctionPermission,
    UserPool,
    UserPoolClient,
    IdentityPool,
    IdentityPoolRoleAttachment,
    RestApi,
    ApiResource,
    ApiMethod,
    ApiAuthorizer,
    ApiDeployment,
    ApiStage,
    Bucket,
    BucketPolicy,
    BucketDeployment,
    Distribution,
    BuildProject,
    Pipeline,
}

impl ResourceKind {
    /// Provider type name used in the emitted template.
    pub fn type_name(&self) -> &'static str {
        match self {
            ResourceKind::Table => "AWS::DynamoDB::Table",
            ResourceKind::Role => "AWS::IAM::Role",
            ResourceKind::Policy => "AWS::IAM::Policy",
            ResourceKind::Function => "AWS::Lambda::Function",
            ResourceKind::FunctionPermission => "AWS::Lambda::Permission",
            ResourceKind::UserPool => "AWS::Cognito::UserPool",
            ResourceKind::UserPoolClient => "AWS::Cognito::UserPoolClient",
            ResourceKind::IdentityPool => "AWS::Cognito::IdentityPool",
            ResourceKind::IdentityPoolRoleAttachment => "AWS::Cognito::IdentityPoolRoleAttachment",
            ResourceKind::RestApi => "AWS::ApiGateway::RestApi",
            ResourceKind::ApiResource => "AWS::ApiGateway::Resource",
            ResourceKind::ApiMethod => "AWS::ApiGateway::Method",
            ResourceKind::ApiAuthorizer => "AWS::ApiGateway::Authorizer",
            ResourceKind::ApiDeployment => "AWS::ApiGateway::Deployment",
            ResourceKind::ApiStage => "AWS::ApiGateway::Stage",
            ResourceKind::Bucket => "AWS::S3::Bucket",
            ResourceKind::BucketPolicy => "AWS::S3::BucketPolicy",
            ResourceKind::BucketDeployment => "Custom::BucketDeployment",
            ResourceKind::Distribution => "AWS::CloudFront::Distribution",
            ResourceKind::BuildProject => "AWS::CodeBuild::Project",
            ResourceKind::Pipeline => "AWS::CodePipeline::Pipeline",
        }
    }
}

/// What the provider does with the unit when it leaves the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalPolicy {
    Destroy,
    Retain,
}

impl RemovalPolicy {
    pub fn deletion_policy(&self) -> &'static str {
        match self {
            RemovalPolicy::Destroy => "Delete",
            RemovalPolicy::Retain => "Retain",
        }
    }
}

/// A declarative record of one to-be-provisioned unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    pub logical_id: LogicalId,
    pub kind: ResourceKind,
    pub properties: Map<String, Value>,
    pub depends_on: Vec<LogicalId>,
    pub removal_policy: Option<RemovalPolicy>,
}

impl ResourceDescriptor {
    pub fn new(logical_id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            logical_id: LogicalId::new(logical_id),
            kind,
            properties: Map::new(),
            depends_on: Vec::new(),
            removal_policy: None,
        }
    }

    pub fn property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Adds an explicit ordering edge not visible through property tokens.
    pub fn depends_on(mut self, id: &LogicalId) -> Self {
        if !self.depends_on.contains(id) {
            self.depends_on.push(id.clone());
        }
        self
    }

    pub fn removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = Some(policy);
        self
    }

    /// Descriptors referenced from inside the properties.
    pub fn references(&self) -> BTreeSet<LogicalId> {
        let mut refs = BTreeSet::new();
        for value in self.properties.values() {
            collect_references(value, &mut refs);
        }
        refs
    }

    /// Every dependency: explicit edges first, then property references.
    pub fn dependencies(&self) -> Vec<LogicalId> {
        let mut deps = self.depends_on.clone();
        for id in self.references() {
            if !deps.contains(&id) {
                deps.push(id);
            }
        }
        deps
    }
}
