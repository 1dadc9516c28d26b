//! Environment-scoped parameter resolution.

mod environment;
mod names;
mod resolver;
pub mod seed;
mod store;

pub use environment::Environment;
pub use names::ParameterName;
pub use resolver::{resolve, resolve_all, EnvironmentParameterSet, ParameterResolver};
pub use store::{
    default_environment_path, environment_prefix, parameter_path, InMemoryParameterStore,
    ParameterStore, StoreError, DEFAULT_ENVIRONMENT_KEY,
};
