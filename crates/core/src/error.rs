use thiserror::Error;

/// Pre-build validation failures. Any of these aborts synthesis before a
/// single descriptor is constructed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown environment '{environment}' (expected one of: {allowed})")]
    UnknownEnvironment {
        environment: String,
        allowed: String,
    },
    #[error("Project name must not be empty")]
    EmptyProjectName,
    #[error("Project name '{name}' is {length} characters long (maximum is {max})")]
    ProjectNameTooLong {
        name: String,
        length: usize,
        max: usize,
    },
    #[error("Project name '{0}' may only contain ASCII letters, digits and hyphens")]
    InvalidProjectName(String),
    #[error("Parameter '{name}' could not be resolved (looked up {path})")]
    UnresolvedParameter { name: String, path: String },
    #[error("Parameter '{name}' resolved to an empty value")]
    EmptyParameter { name: String },
    #[error("Unknown parameter name: {0}")]
    UnknownParameter(String),
    #[error("Parameter store error: {0}")]
    Store(String),
    #[error("Invalid resource name '{name}': {reason}")]
    InvalidResourceName { name: String, reason: String },
    #[error("Invalid setting '{field}': {reason}")]
    InvalidSetting { field: &'static str, reason: String },
}

/// Graph assembly failures. Reported with the offending descriptor names.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Descriptor '{0}' is already defined")]
    DuplicateLogicalId(String),
    #[error("Descriptor '{descriptor}' depends on '{dependency}', which has not been added")]
    UnknownDependency {
        descriptor: String,
        dependency: String,
    },
    #[error("Grant principal '{0}' has not been added")]
    UnknownPrincipal(String),
    #[error("Grant principal '{0}' is not a role")]
    NotARole(String),
    #[error("Dependency cycle detected involving: {}", .0.join(", "))]
    Cycle(Vec<String>),
    #[error("Resource '{path}' has no OPTIONS preflight responder")]
    MissingPreflight { path: String },
    #[error("Preflight responder on '{path}' violates the CORS contract: {reason}")]
    InvalidPreflight { path: String, reason: String },
    #[error("Route {verb} {path} does not require caller authorization")]
    UnauthorizedRoute { path: String, verb: String },
    #[error("Action '{action}' consumes artifact '{artifact}' before it is produced")]
    ArtifactNotAvailable { action: String, artifact: String },
    #[error("Artifact '{artifact}' is produced by both '{first}' and '{second}'")]
    DuplicateArtifact {
        artifact: String,
        first: String,
        second: String,
    },
    #[error("Pipeline stage '{0}' is declared more than once")]
    DuplicateStage(String),
    #[error("Action '{action}' is declared more than once in stage '{stage}'")]
    DuplicateAction { stage: String, action: String },
    #[error("Pipeline stage '{0}' has no actions")]
    EmptyStage(String),
}

/// Errors that abort a synthesis pass.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SynthError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Result type for synthesis operations.
pub type Result<T> = std::result::Result<T, SynthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_name_too_long_display() {
        let error = ConfigError::ProjectNameTooLong {
            name: "ThirteenChars".to_string(),
            length: 13,
            max: 12,
        };
        assert_eq!(
            error.to_string(),
            "Project name 'ThirteenChars' is 13 characters long (maximum is 12)"
        );
    }

    #[test]
    fn test_unresolved_parameter_display() {
        let error = ConfigError::UnresolvedParameter {
            name: "tableName".to_string(),
            path: "/GoalStackEnvs/Prod/tableName".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Parameter 'tableName' could not be resolved (looked up /GoalStackEnvs/Prod/tableName)"
        );
    }

    #[test]
    fn test_unknown_dependency_display() {
        let error = GraphError::UnknownDependency {
            descriptor: "ListFunction".to_string(),
            dependency: "GoalsAccessRole".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Descriptor 'ListFunction' depends on 'GoalsAccessRole', which has not been added"
        );
    }

    #[test]
    fn test_cycle_display_lists_members() {
        let error = GraphError::Cycle(vec!["A".to_string(), "B".to_string()]);
        assert_eq!(error.to_string(), "Dependency cycle detected involving: A, B");
    }

    #[test]
    fn test_synth_error_is_transparent() {
        let error: SynthError = ConfigError::EmptyProjectName.into();
        assert_eq!(error.to_string(), "Project name must not be empty");
        assert!(matches!(error, SynthError::Config(_)));
    }
}
