//! Synthesis configuration (Functional Core - pure data).
//!
//! Everything a synthesis pass needs is passed in explicitly. Nothing here
//! reads process environment state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::params::ParameterName;

/// Resource limits and code location shared by every request handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerSettings {
    pub memory_mb: u32,
    pub timeout_secs: u32,
    pub runtime: String,
    /// `s3://<bucket>/<key>` of the packaged handler code.
    pub code_uri: String,
}

/// Location of packaged handler code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLocation {
    pub bucket: String,
    pub key: String,
}

impl HandlerSettings {
    pub fn code_location(&self) -> Result<CodeLocation, ConfigError> {
        let invalid = || ConfigError::InvalidSetting {
            field: "handlers.code_uri",
            reason: format!("expected s3://<bucket>/<key>, got '{}'", self.code_uri),
        };
        let rest = self.code_uri.strip_prefix("s3://").ok_or_else(invalid)?;
        let (bucket, key) = rest.split_once('/').ok_or_else(invalid)?;
        if bucket.is_empty() || key.is_empty() {
            return Err(invalid());
        }
        Ok(CodeLocation {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(128..=10_240).contains(&self.memory_mb) {
            return Err(ConfigError::InvalidSetting {
                field: "handlers.memory_mb",
                reason: format!("{} is outside 128..=10240", self.memory_mb),
            });
        }
        if !(1..=900).contains(&self.timeout_secs) {
            return Err(ConfigError::InvalidSetting {
                field: "handlers.timeout_secs",
                reason: format!("{} is outside 1..=900", self.timeout_secs),
            });
        }
        if self.runtime.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                field: "handlers.runtime",
                reason: "must not be empty".to_string(),
            });
        }
        self.code_location().map(|_| ())
    }
}

/// User directory password rules. Every character class is independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    pub min_length: u8,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_digits: bool,
    pub require_symbols: bool,
}

impl PasswordPolicy {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(6..=99).contains(&self.min_length) {
            return Err(ConfigError::InvalidSetting {
                field: "password_policy.min_length",
                reason: format!("{} is outside 6..=99", self.min_length),
            });
        }
        Ok(())
    }
}

/// Placeholder the user directory replaces with the one-time code.
pub const CODE_PLACEHOLDER: &str = "{####}";

/// Email sent to a newly registered user carrying the verification code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationMessage {
    pub email_subject: String,
    /// Must contain the `{####}` code placeholder.
    pub email_body: String,
}

impl Default for VerificationMessage {
    fn default() -> Self {
        Self {
            email_subject: "Verify your email for our goals app".to_string(),
            email_body: "Hello, thanks for signing up to our goals app! Your verification code is {####}".to_string(),
        }
    }
}

impl VerificationMessage {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.email_subject.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                field: "verification.email_subject",
                reason: "must not be empty".to_string(),
            });
        }
        if !self.email_body.contains(CODE_PLACEHOLDER) {
            return Err(ConfigError::InvalidSetting {
                field: "verification.email_body",
                reason: format!("must contain the {} placeholder", CODE_PLACEHOLDER),
            });
        }
        Ok(())
    }
}

/// Build/release pipeline knobs that are not environment parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Archive pulled from the source bucket by the first stage.
    pub source_object_key: String,
    pub build_timeout_minutes: u32,
    pub compute_type: String,
    pub build_image: String,
}

impl PipelineSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.source_object_key.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                field: "pipeline.source_object_key",
                reason: "must not be empty".to_string(),
            });
        }
        if !(5..=480).contains(&self.build_timeout_minutes) {
            return Err(ConfigError::InvalidSetting {
                field: "pipeline.build_timeout_minutes",
                reason: format!("{} is outside 5..=480", self.build_timeout_minutes),
            });
        }
        Ok(())
    }
}

/// Everything one synthesis pass is parameterized by.
///
/// The two toggles have no default on purpose: callers must choose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthConfig {
    pub project_name: String,
    /// Raw environment identifier; validated against the allow-list.
    pub environment: String,
    /// Parameter store namespace (first path segment).
    pub namespace: String,
    pub region: String,
    pub allow_unauthenticated_identities: bool,
    pub cdn_enabled: bool,
    pub handlers: HandlerSettings,
    pub password_policy: PasswordPolicy,
    #[serde(default)]
    pub verification: VerificationMessage,
    pub pipeline: PipelineSettings,
    /// Literal values that take precedence over the parameter store.
    #[serde(default)]
    pub parameter_defaults: BTreeMap<ParameterName, String>,
}

impl SynthConfig {
    /// Declares a literal value for a parameter.
    pub fn with_parameter(mut self, name: ParameterName, value: impl Into<String>) -> Self {
        self.parameter_defaults.insert(name, value.into());
        self
    }

    /// Shorthand for a literal `tableName`.
    pub fn with_table_name(self, table_name: &str) -> Self {
        self.with_parameter(ParameterName::TableName, table_name)
    }

    /// Validates the settings records. Project name and environment are
    /// checked separately by the composition root, before this.
    pub fn validate_settings(&self) -> Result<(), ConfigError> {
        if self.namespace.trim_matches('/').is_empty() {
            return Err(ConfigError::InvalidSetting {
                field: "namespace",
                reason: "must not be empty".to_string(),
            });
        }
        if self.region.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                field: "region",
                reason: "must not be empty".to_string(),
            });
        }
        self.handlers.validate()?;
        self.password_policy.validate()?;
        self.verification.validate()?;
        self.pipeline.validate()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn config(project_name: &str, environment: &str) -> SynthConfig {
        SynthConfig {
            project_name: project_name.to_string(),
            environment: environment.to_string(),
            namespace: "GoalStackEnvs".to_string(),
            region: "us-west-2".to_string(),
            allow_unauthenticated_identities: false,
            cdn_enabled: true,
            handlers: HandlerSettings {
                memory_mb: 256,
                timeout_secs: 10,
                runtime: "nodejs18.x".to_string(),
                code_uri: "s3://goal-handlers/handlers.zip".to_string(),
            },
            password_policy: PasswordPolicy {
                min_length: 8,
                require_lowercase: false,
                require_uppercase: false,
                require_digits: false,
                require_symbols: false,
            },
            verification: VerificationMessage::default(),
            pipeline: PipelineSettings {
                source_object_key: "assets.zip".to_string(),
                build_timeout_minutes: 5,
                compute_type: "BUILD_GENERAL1_SMALL".to_string(),
                build_image: "aws/codebuild/standard:3.0".to_string(),
            },
            parameter_defaults: BTreeMap::new(),
        }
    }
}
