//! Deterministic naming rules.
//!
//! Every name derives only from its inputs, so re-synthesizing with the same
//! inputs yields the same physical names.

use sha2::{Digest, Sha256};

use crate::error::ConfigError;
use crate::params::Environment;

/// Longest project identifier accepted by the composition root.
pub const MAX_PROJECT_NAME_LEN: usize = 12;

const BUCKET_NAME_MIN: usize = 3;
const BUCKET_NAME_MAX: usize = 63;
const BUCKET_HASH_LEN: usize = 8;
const TABLE_NAME_MIN: usize = 3;
const TABLE_NAME_MAX: usize = 255;

/// Checks the project identifier before anything else happens.
pub fn validate_project_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::EmptyProjectName);
    }
    let length = name.chars().count();
    if length > MAX_PROJECT_NAME_LEN {
        return Err(ConfigError::ProjectNameTooLong {
            name: name.to_string(),
            length,
            max: MAX_PROJECT_NAME_LEN,
        });
    }
    let valid = name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-');
    if !valid {
        return Err(ConfigError::InvalidProjectName(name.to_string()));
    }
    Ok(())
}

/// `<project>-<table>`, checked against the provider's table naming rules.
pub fn table_name(project_name: &str, table_name: &str) -> Result<String, ConfigError> {
    let name = format!("{}-{}", project_name, table_name);
    validate_table_name(&name)?;
    Ok(name)
}

/// Table names are 3-255 characters from `[A-Za-z0-9_.-]`.
pub fn validate_table_name(name: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidResourceName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if !(TABLE_NAME_MIN..=TABLE_NAME_MAX).contains(&name.len()) {
        return Err(invalid("table names must be 3-255 characters long"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(invalid(
            "table names may only contain letters, digits, underscores, periods and hyphens",
        ));
    }
    Ok(())
}

/// `<project>-<suffix>`
pub fn scoped_name(project_name: &str, suffix: &str) -> String {
    format!("{}-{}", project_name, suffix)
}

/// Identity pool names only allow word characters.
pub fn identity_pool_name(project_name: &str, pool_name: &str) -> String {
    format!("{}{}", project_name, pool_name)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Globally unique, deterministic bucket name:
/// `<project>-<purpose>-<environment>-<hash8>`, all lowercase.
///
/// The hash covers the untransformed inputs, so projects differing only in
/// case still get distinct names.
pub fn bucket_name(
    project_name: &str,
    purpose: &str,
    environment: Environment,
) -> Result<String, ConfigError> {
    let mut hasher = Sha256::new();
    hasher.update(project_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(purpose.as_bytes());
    hasher.update([0u8]);
    hasher.update(environment.as_str().as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    let name = format!(
        "{}-{}-{}-{}",
        project_name.to_ascii_lowercase(),
        purpose,
        environment.slug(),
        &digest[..BUCKET_HASH_LEN]
    );
    validate_bucket_name(&name)?;
    Ok(name)
}

/// Checks the provider's bucket naming rules.
pub fn validate_bucket_name(name: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidResourceName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if !(BUCKET_NAME_MIN..=BUCKET_NAME_MAX).contains(&name.len()) {
        return Err(invalid("bucket names must be 3-63 characters long"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(
            "bucket names may only contain lowercase letters, digits and hyphens",
        ));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("bucket names must start and end with a letter or digit"));
    }
    Ok(())
}
