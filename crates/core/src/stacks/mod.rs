//! Descriptor builders, one per concern, run in dependency order by
//! [`crate::synthesize`].

pub mod assets;
pub mod compute;
pub mod edge;
pub mod identity;
pub mod pipeline;
pub mod storage;

pub use assets::{build_assets, AssetOutputs, AssetSettings, BucketPurpose};
pub use compute::{build_handlers, ComputeOutputs, HandlerBinding, Operation};
pub use edge::{
    build_edge, validate_routes, Authorization, EdgeOutputs, EdgeSettings, HttpVerb,
    PreflightResponse, RouteBinding, RouteTarget,
};
pub use identity::{build_identity, IdentityOutputs, IdentitySettings};
pub use pipeline::{
    build_pipeline, ActionDescriptor, ActionKind, ArtifactName, PipelineDescriptor,
    PipelineInputs, PipelineOutputs, StageDescriptor,
};
pub use storage::{build_storage, StorageOutputs, TableAccess, TableSettings};
