use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Every parameter name the stack recognizes.
///
/// A resolved parameter set always carries a value for each of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterName {
    ApiName,
    AuthorizorName,
    CdnComment,
    CdnWebsiteIndexDocument,
    CodeBuildRoleName,
    CodePipelineRoleName,
    IdentityPoolName,
    PartitionKeyName,
    PipelineProjectBuildSpec,
    PipelineProjectDescription,
    PipelineProjectName,
    S3WebsiteDeploySource,
    SortKeyName,
    TableName,
    UserPoolClientName,
    UserPoolName,
    WebsiteErrorDocument,
    WebsiteIndexDocument,
}

impl ParameterName {
    pub const COUNT: usize = 18;

    pub const ALL: [ParameterName; Self::COUNT] = [
        ParameterName::ApiName,
        ParameterName::AuthorizorName,
        ParameterName::CdnComment,
        ParameterName::CdnWebsiteIndexDocument,
        ParameterName::CodeBuildRoleName,
        ParameterName::CodePipelineRoleName,
        ParameterName::IdentityPoolName,
        ParameterName::PartitionKeyName,
        ParameterName::PipelineProjectBuildSpec,
        ParameterName::PipelineProjectDescription,
        ParameterName::PipelineProjectName,
        ParameterName::S3WebsiteDeploySource,
        ParameterName::SortKeyName,
        ParameterName::TableName,
        ParameterName::UserPoolClientName,
        ParameterName::UserPoolName,
        ParameterName::WebsiteErrorDocument,
        ParameterName::WebsiteIndexDocument,
    ];

    /// Returns the key segment used in the parameter store.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterName::ApiName => "apiName",
            ParameterName::AuthorizorName => "authorizorName",
            ParameterName::CdnComment => "cdnComment",
            ParameterName::CdnWebsiteIndexDocument => "cdnWebsiteIndexDocument",
            ParameterName::CodeBuildRoleName => "codeBuildRoleName",
            ParameterName::CodePipelineRoleName => "codePipelineRoleName",
            ParameterName::IdentityPoolName => "identityPoolName",
            ParameterName::PartitionKeyName => "partitionKeyName",
            ParameterName::PipelineProjectBuildSpec => "pipelineProjectBuildSpec",
            ParameterName::PipelineProjectDescription => "pipelineProjectDescription",
            ParameterName::PipelineProjectName => "pipelineProjectName",
            ParameterName::S3WebsiteDeploySource => "s3WebsiteDeploySource",
            ParameterName::SortKeyName => "sortKeyName",
            ParameterName::TableName => "tableName",
            ParameterName::UserPoolClientName => "userPoolClientName",
            ParameterName::UserPoolName => "userPoolName",
            ParameterName::WebsiteErrorDocument => "websiteErrorDocument",
            ParameterName::WebsiteIndexDocument => "websiteIndexDocument",
        }
    }

    /// Value written when seeding a fresh environment.
    pub fn seed_value(&self) -> &'static str {
        match self {
            ParameterName::ApiName => "apiGw",
            ParameterName::AuthorizorName => "apiAuthorizer",
            ParameterName::CdnComment => "CDN",
            ParameterName::CdnWebsiteIndexDocument => "index.html",
            ParameterName::CodeBuildRoleName => "CodeBuildRole",
            ParameterName::CodePipelineRoleName => "CodePipelineRole",
            ParameterName::IdentityPoolName => "Identity",
            ParameterName::PartitionKeyName => "userId",
            ParameterName::PipelineProjectBuildSpec => "buildspec.yml",
            ParameterName::PipelineProjectDescription => "CodeBuild Project",
            ParameterName::PipelineProjectName => "build",
            ParameterName::S3WebsiteDeploySource => "../assets/archive",
            ParameterName::SortKeyName => "goalId",
            ParameterName::TableName => "Goals",
            ParameterName::UserPoolClientName => "UserPoolClient",
            ParameterName::UserPoolName => "UserPool",
            ParameterName::WebsiteErrorDocument => "index.html",
            ParameterName::WebsiteIndexDocument => "index.html",
        }
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl FromStr for ParameterName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownParameter(s.to_string()))
    }
}

impl fmt::Display for ParameterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_in_declaration_order() {
        for (i, name) in ParameterName::ALL.iter().enumerate() {
            assert_eq!(name.index(), i);
        }
    }

    #[test]
    fn test_from_str_round_trips_store_key() {
        for name in ParameterName::ALL {
            assert_eq!(name.as_str().parse::<ParameterName>().unwrap(), name);
        }
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert_eq!(
            "apiResourceName".parse::<ParameterName>().unwrap_err(),
            ConfigError::UnknownParameter("apiResourceName".to_string())
        );
    }

    #[test]
    fn test_serde_matches_store_key() {
        let json = serde_json::to_string(&ParameterName::S3WebsiteDeploySource).unwrap();
        assert_eq!(json, "\"s3WebsiteDeploySource\"");
    }

    #[test]
    fn test_seed_values_match_handler_key_contract() {
        assert_eq!(ParameterName::PartitionKeyName.seed_value(), "userId");
        assert_eq!(ParameterName::SortKeyName.seed_value(), "goalId");
    }
}
