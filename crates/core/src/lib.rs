//! Declarative resource-graph assembly for the goals application.
//!
//! Pure and synchronous: configuration in, a validated resource graph out.
//! Parameter store access goes through the [`params::ParameterStore`] trait
//! so callers decide where values come from.

pub mod config;
mod error;
pub mod graph;
pub mod naming;
pub mod params;
pub mod stacks;
mod synth;
mod template;

pub use config::{
    HandlerSettings, PasswordPolicy, PipelineSettings, SynthConfig, VerificationMessage,
};
pub use error::{ConfigError, GraphError, Result, SynthError};
pub use params::{Environment, EnvironmentParameterSet, ParameterName, ParameterStore};
pub use synth::{
    synthesize, Synthesis, OUTPUT_API_URL, OUTPUT_CDN_URL, OUTPUT_IDENTITY_POOL_ID,
    OUTPUT_TABLE_NAME, OUTPUT_USER_POOL_CLIENT_ID, OUTPUT_USER_POOL_ID,
    OUTPUT_WEBSITE_BUCKET_NAME,
};
pub use template::{render_template, FORMAT_VERSION};
