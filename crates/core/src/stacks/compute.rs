//! One request handler per goal operation, each bound to the table.
//!
//! Every handler runs as its own role holding only the table access its
//! operation needs.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::json;

use super::storage::{lambda_execution_role, StorageOutputs, TableAccess};
use crate::config::HandlerSettings;
use crate::error::Result;
use crate::graph::tokens::get_att;
use crate::graph::{LogicalId, ResourceArn, ResourceDescriptor, ResourceGraph, ResourceKind, RoleGrant};
use crate::naming;

/// Environment variable carrying the physical table name into every handler.
pub const TABLE_NAME_VARIABLE: &str = "TABLE_NAME";

/// The fixed set of goal operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Operation {
    List,
    ListAll,
    Create,
    Get,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::List,
        Operation::ListAll,
        Operation::Create,
        Operation::Get,
        Operation::Update,
        Operation::Delete,
    ];

    /// Handler module name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::ListAll => "listAll",
            Operation::Create => "create",
            Operation::Get => "get",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    fn pascal(&self) -> &'static str {
        match self {
            Operation::List => "List",
            Operation::ListAll => "ListAll",
            Operation::Create => "Create",
            Operation::Get => "Get",
            Operation::Update => "Update",
            Operation::Delete => "Delete",
        }
    }

    pub fn function_id(&self) -> String {
        format!("{}Function", self.pascal())
    }

    pub fn role_id(&self) -> String {
        format!("{}FunctionRole", self.pascal())
    }

    pub fn policy_id(&self) -> String {
        format!("{}FunctionPolicy", self.pascal())
    }

    /// The narrowest table access the handler needs.
    pub fn required_access(&self) -> TableAccess {
        match self {
            Operation::List | Operation::ListAll | Operation::Get => TableAccess::Read,
            Operation::Create | Operation::Update | Operation::Delete => TableAccess::Write,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A handler descriptor and the role it executes as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerBinding {
    pub operation: Operation,
    pub function: LogicalId,
    pub function_name: String,
    pub role: LogicalId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeOutputs {
    handlers: BTreeMap<Operation, HandlerBinding>,
}

impl ComputeOutputs {
    pub fn handler(&self, operation: Operation) -> Option<&HandlerBinding> {
        self.handlers.get(&operation)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HandlerBinding> {
        self.handlers.values()
    }
}

/// Adds one execution role and one function per operation.
///
/// Each role receives the minimal table grant for its operation. Grants the
/// role already holds add nothing.
pub fn build_handlers(
    graph: &mut ResourceGraph,
    storage: &StorageOutputs,
    project_name: &str,
    settings: &HandlerSettings,
) -> Result<ComputeOutputs> {
    let code = settings.code_location()?;
    let mut handlers = BTreeMap::new();

    for operation in Operation::ALL {
        let role = graph.add(lambda_execution_role(&operation.role_id()))?;

        let grant = RoleGrant::new(&role)
            .actions(operation.required_access().actions())
            .resource(ResourceArn::Arn(storage.table.clone()));
        let policy = graph.grant(&operation.policy_id(), grant)?;

        let function_name = naming::scoped_name(project_name, operation.as_str());
        let mut descriptor = ResourceDescriptor::new(operation.function_id(), ResourceKind::Function)
            .property("FunctionName", function_name.as_str())
            .property("Handler", format!("{}.main", operation.as_str()))
            .property("Runtime", settings.runtime.as_str())
            .property("Role", get_att(&role, "Arn"))
            .property("Code", json!({ "S3Bucket": code.bucket, "S3Key": code.key }))
            .property("MemorySize", settings.memory_mb)
            .property("Timeout", settings.timeout_secs)
            .property(
                "Environment",
                json!({ "Variables": { TABLE_NAME_VARIABLE: storage.table_name } }),
            );
        if let Some(policy) = &policy {
            descriptor = descriptor.depends_on(policy);
        }

        let function = graph.add(descriptor)?;
        handlers.insert(
            operation,
            HandlerBinding {
                operation,
                function,
                function_name,
                role,
            },
        );
    }

    tracing::debug!(count = handlers.len(), "handler descriptors added");

    Ok(ComputeOutputs { handlers })
}
