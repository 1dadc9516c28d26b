//! Principals, grants, and policy document rendering.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::{json, Value};

use super::tokens::{get_att, join, pseudo, reference, Pseudo};
use super::LogicalId;

/// Concrete action sets handed out by the builders. None contain wildcards.
pub mod actions {
    pub const TABLE_READ: &[&str] = &[
        "dynamodb:BatchGetItem",
        "dynamodb:ConditionCheckItem",
        "dynamodb:DescribeTable",
        "dynamodb:GetItem",
        "dynamodb:Query",
        "dynamodb:Scan",
    ];

    pub const TABLE_WRITE: &[&str] = &[
        "dynamodb:BatchWriteItem",
        "dynamodb:DeleteItem",
        "dynamodb:PutItem",
        "dynamodb:UpdateItem",
    ];

    pub const BUCKET_READ_WRITE: &[&str] = &[
        "s3:DeleteObject",
        "s3:GetBucketLocation",
        "s3:GetObject",
        "s3:GetObjectVersion",
        "s3:ListBucket",
        "s3:PutObject",
    ];

    pub const OBJECT_READ: &[&str] = &["s3:GetObject"];

    pub const LOG_WRITE: &[&str] = &[
        "logs:CreateLogGroup",
        "logs:CreateLogStream",
        "logs:PutLogEvents",
    ];

    pub const CDN_INVALIDATE: &[&str] = &["cloudfront:CreateInvalidation"];

    pub const BUILD_START: &[&str] = &["codebuild:BatchGetBuilds", "codebuild:StartBuild"];

    pub const API_INVOKE: &[&str] = &["execute-api:Invoke"];

    pub const SMS_PUBLISH: &[&str] = &["sns:Publish"];

    pub const IDENTITY_GUEST: &[&str] = &[
        "cognito-sync:ListDatasets",
        "cognito-sync:ListRecords",
        "mobileanalytics:PutEvents",
    ];

    pub const IDENTITY_MEMBER: &[&str] = &[
        "cognito-identity:GetCredentialsForIdentity",
        "cognito-identity:GetId",
        "cognito-sync:ListDatasets",
        "cognito-sync:ListRecords",
        "cognito-sync:UpdateRecords",
        "mobileanalytics:PutEvents",
    ];
}

/// A single permitted action, e.g. `dynamodb:GetItem`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Action(String);

impl Action {
    pub fn new(action: impl Into<String>) -> Self {
        Self(action.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a grant applies to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceArn {
    /// The descriptor's own ARN.
    Arn(LogicalId),
    /// Every object inside a bucket descriptor.
    ObjectsIn(LogicalId),
    /// Every route of a REST API descriptor.
    ExecuteApi(LogicalId),
    /// A content distribution descriptor.
    Distribution(LogicalId),
    /// Services that cannot scope these actions to a resource.
    Any,
}

impl ResourceArn {
    /// The descriptor this resource points at, if any.
    pub fn target(&self) -> Option<&LogicalId> {
        match self {
            ResourceArn::Arn(id)
            | ResourceArn::ObjectsIn(id)
            | ResourceArn::ExecuteApi(id)
            | ResourceArn::Distribution(id) => Some(id),
            ResourceArn::Any => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            ResourceArn::Arn(id) => get_att(id, "Arn"),
            ResourceArn::ObjectsIn(id) => join([get_att(id, "Arn"), json!("/*")]),
            ResourceArn::ExecuteApi(id) => join([
                json!("arn:"),
                pseudo(Pseudo::Partition),
                json!(":execute-api:"),
                pseudo(Pseudo::Region),
                json!(":"),
                pseudo(Pseudo::AccountId),
                json!(":"),
                reference(id),
                json!("/*"),
            ]),
            ResourceArn::Distribution(id) => join([
                json!("arn:"),
                pseudo(Pseudo::Partition),
                json!(":cloudfront::"),
                pseudo(Pseudo::AccountId),
                json!(":distribution/"),
                reference(id),
            ]),
            ResourceArn::Any => json!("*"),
        }
    }
}

/// Which identity claim a federated trust policy keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FederationClaim {
    Authenticated,
    Unauthenticated,
}

impl FederationClaim {
    pub fn as_str(&self) -> &'static str {
        match self {
            FederationClaim::Authenticated => "authenticated",
            FederationClaim::Unauthenticated => "unauthenticated",
        }
    }
}

/// Who may assume a role.
#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
    /// A provider service, e.g. `lambda.amazonaws.com`.
    Service(&'static str),
    /// Identities federated through an identity pool.
    Federated {
        identity_pool: LogicalId,
        claim: FederationClaim,
    },
}

const IDENTITY_FEDERATION: &str = "cognito-identity.amazonaws.com";

impl Principal {
    /// Renders the trust policy that lets this principal assume a role.
    pub fn assume_role_policy(&self) -> Value {
        let statement = match self {
            Principal::Service(service) => json!({
                "Effect": "Allow",
                "Principal": { "Service": service },
                "Action": "sts:AssumeRole",
            }),
            Principal::Federated {
                identity_pool,
                claim,
            } => json!({
                "Effect": "Allow",
                "Principal": { "Federated": IDENTITY_FEDERATION },
                "Action": "sts:AssumeRoleWithWebIdentity",
                "Condition": {
                    "StringEquals": {
                        "cognito-identity.amazonaws.com:aud": reference(identity_pool),
                    },
                    "ForAnyValue:StringLike": {
                        "cognito-identity.amazonaws.com:amr": claim.as_str(),
                    },
                },
            }),
        };

        json!({ "Version": "2012-10-17", "Statement": [statement] })
    }
}

/// "principal may perform these actions on these resources".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGrant {
    pub principal: LogicalId,
    pub actions: BTreeSet<Action>,
    pub resources: BTreeSet<ResourceArn>,
}

impl RoleGrant {
    pub fn new(principal: &LogicalId) -> Self {
        Self {
            principal: principal.clone(),
            actions: BTreeSet::new(),
            resources: BTreeSet::new(),
        }
    }

    pub fn actions(mut self, actions: &[&str]) -> Self {
        self.actions.extend(actions.iter().map(|a| Action::new(*a)));
        self
    }

    pub fn resource(mut self, resource: ResourceArn) -> Self {
        self.resources.insert(resource);
        self
    }

    /// Every `(resource, action)` pair the grant covers.
    pub fn pairs(&self) -> impl Iterator<Item = (ResourceArn, Action)> + '_ {
        self.resources.iter().flat_map(move |resource| {
            self.actions
                .iter()
                .map(move |action| (resource.clone(), action.clone()))
        })
    }
}

/// Renders a policy document, merging resources that share an action set
/// into one statement.
pub fn policy_document(pairs: &BTreeSet<(ResourceArn, Action)>) -> Value {
    let mut by_resource: BTreeMap<&ResourceArn, BTreeSet<&Action>> = BTreeMap::new();
    for (resource, action) in pairs {
        by_resource.entry(resource).or_default().insert(action);
    }

    let mut by_actions: BTreeMap<BTreeSet<&Action>, Vec<&ResourceArn>> = BTreeMap::new();
    for (resource, actions) in by_resource {
        by_actions.entry(actions).or_default().push(resource);
    }

    let statements: Vec<Value> = by_actions
        .into_iter()
        .map(|(actions, resources)| {
            json!({
                "Effect": "Allow",
                "Action": actions.iter().map(|a| a.as_str()).collect::<Vec<_>>(),
                "Resource": resources.iter().map(|r| r.to_value()).collect::<Vec<_>>(),
            })
        })
        .collect();

    json!({ "Version": "2012-10-17", "Statement": statements })
}
