//! Typed resource descriptors and the acyclic graph that holds them.

mod descriptor;
pub mod policy;
mod resource_graph;
pub mod tokens;

pub use descriptor::{LogicalId, RemovalPolicy, ResourceDescriptor, ResourceKind};
pub use policy::{Action, FederationClaim, Principal, ResourceArn, RoleGrant};
pub use resource_graph::ResourceGraph;
