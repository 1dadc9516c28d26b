//! Durable keyed table and the role that may access it.

use serde_json::json;

use crate::error::Result;
use crate::graph::policy::actions;
use crate::graph::tokens::{join, pseudo, Pseudo};
use crate::graph::{
    LogicalId, Principal, RemovalPolicy, ResourceArn, ResourceDescriptor, ResourceGraph,
    ResourceKind, RoleGrant,
};
use crate::naming;

pub const TABLE_ID: &str = "GoalsTable";
pub const ACCESS_ROLE_ID: &str = "GoalsAccessRole";
pub const ACCESS_POLICY_ID: &str = "GoalsAccessPolicy";

const LAMBDA_SERVICE: &str = "lambda.amazonaws.com";
const BASIC_EXECUTION_POLICY: &str = ":iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

/// Read/write access levels on the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableAccess {
    Read,
    Write,
}

impl TableAccess {
    pub fn actions(&self) -> &'static [&'static str] {
        match self {
            TableAccess::Read => actions::TABLE_READ,
            TableAccess::Write => actions::TABLE_WRITE,
        }
    }
}

/// Table naming and key schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSettings {
    pub table_name: String,
    pub partition_key: String,
    pub sort_key: String,
}

/// What later builders need from the storage builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageOutputs {
    pub table: LogicalId,
    /// Physical table name, handed to handlers through `TABLE_NAME`.
    pub table_name: String,
    pub partition_key: String,
    pub sort_key: String,
    pub access_role: LogicalId,
    pub access_policy: LogicalId,
}

/// Adds the table, its access role, and a read/write grant scoped to the table.
pub fn build_storage(
    graph: &mut ResourceGraph,
    project_name: &str,
    settings: &TableSettings,
) -> Result<StorageOutputs> {
    let table_name = naming::table_name(project_name, &settings.table_name)?;

    let table = graph.add(
        ResourceDescriptor::new(TABLE_ID, ResourceKind::Table)
            .property("TableName", table_name.as_str())
            .property(
                "KeySchema",
                json!([
                    { "AttributeName": settings.partition_key, "KeyType": "HASH" },
                    { "AttributeName": settings.sort_key, "KeyType": "RANGE" },
                ]),
            )
            .property(
                "AttributeDefinitions",
                json!([
                    { "AttributeName": settings.partition_key, "AttributeType": "S" },
                    { "AttributeName": settings.sort_key, "AttributeType": "S" },
                ]),
            )
            .property(
                "ProvisionedThroughput",
                json!({ "ReadCapacityUnits": 1, "WriteCapacityUnits": 1 }),
            )
            .removal_policy(RemovalPolicy::Destroy),
    )?;

    let access_role = graph.add(lambda_execution_role(ACCESS_ROLE_ID))?;

    let grant = RoleGrant::new(&access_role)
        .actions(TableAccess::Read.actions())
        .actions(TableAccess::Write.actions())
        .resource(ResourceArn::Arn(table.clone()));
    let access_policy = graph
        .grant(ACCESS_POLICY_ID, grant)?
        .unwrap_or_else(|| LogicalId::new(ACCESS_POLICY_ID));

    tracing::debug!(%table_name, "storage descriptors added");

    Ok(StorageOutputs {
        table,
        table_name,
        partition_key: settings.partition_key.clone(),
        sort_key: settings.sort_key.clone(),
        access_role,
        access_policy,
    })
}

/// A role the function service may assume, with basic log delivery attached.
pub(crate) fn lambda_execution_role(id: &str) -> ResourceDescriptor {
    ResourceDescriptor::new(id, ResourceKind::Role)
        .property(
            "AssumeRolePolicyDocument",
            Principal::Service(LAMBDA_SERVICE).assume_role_policy(),
        )
        .property(
            "ManagedPolicyArns",
            vec![join([
                json!("arn:"),
                pseudo(Pseudo::Partition),
                json!(BASIC_EXECUTION_POLICY),
            ])],
        )
}
