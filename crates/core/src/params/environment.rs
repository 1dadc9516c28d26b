use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The statically known environments a stack may be synthesized for.
///
/// Anything outside this list is rejected; there is no fallback environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Environment {
    #[serde(rename = "Dev-local")]
    DevLocal,
    #[serde(rename = "Dev-integration")]
    DevIntegration,
    #[serde(rename = "Test")]
    Test,
    #[serde(rename = "Stg")]
    Staging,
    #[serde(rename = "Load")]
    Load,
    #[serde(rename = "Prod")]
    Prod,
}

impl Environment {
    pub const ALL: [Environment; 6] = [
        Environment::DevLocal,
        Environment::DevIntegration,
        Environment::Test,
        Environment::Staging,
        Environment::Load,
        Environment::Prod,
    ];

    /// Returns the identifier used in parameter store paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::DevLocal => "Dev-local",
            Environment::DevIntegration => "Dev-integration",
            Environment::Test => "Test",
            Environment::Staging => "Stg",
            Environment::Load => "Load",
            Environment::Prod => "Prod",
        }
    }

    /// Lowercase form, used where the provider only accepts lowercase names
    /// (bucket names, API stage names).
    pub fn slug(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }

    /// Validates an environment identifier against the allow-list.
    ///
    /// Matching ignores ASCII case, nothing else.
    pub fn parse(id: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|env| env.as_str().eq_ignore_ascii_case(id.trim()))
            .ok_or_else(|| ConfigError::UnknownEnvironment {
                environment: id.to_string(),
                allowed: Self::ALL
                    .iter()
                    .map(Environment::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_environments() {
        for env in Environment::ALL {
            assert_eq!(Environment::parse(env.as_str()).unwrap(), env);
        }
    }

    #[test]
    fn test_parse_ignores_case() {
        assert_eq!(
            Environment::parse("dev-local").unwrap(),
            Environment::DevLocal
        );
        assert_eq!(Environment::parse("PROD").unwrap(), Environment::Prod);
    }

    #[test]
    fn test_parse_unknown_fails_closed() {
        let err = Environment::parse("production").unwrap_err();
        match err {
            ConfigError::UnknownEnvironment {
                environment,
                allowed,
            } => {
                assert_eq!(environment, "production");
                assert!(allowed.contains("Prod"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_empty_fails() {
        assert!(Environment::parse("").is_err());
    }

    #[test]
    fn test_slug() {
        assert_eq!(Environment::DevIntegration.slug(), "dev-integration");
        assert_eq!(Environment::Staging.slug(), "stg");
    }

    #[test]
    fn test_serde_uses_identifier() {
        let json = serde_json::to_string(&Environment::DevLocal).unwrap();
        assert_eq!(json, "\"Dev-local\"");
        let env: Environment = serde_json::from_str("\"Stg\"").unwrap();
        assert_eq!(env, Environment::Staging);
    }
}
