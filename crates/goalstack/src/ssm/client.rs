//! AWS SDK client setup and raw parameter store calls (Imperative Shell).

use std::collections::BTreeMap;

use aws_sdk_ssm::types::ParameterType;
use aws_sdk_ssm::Client;

use super::error::{Result, SsmError};

/// Where and as whom to talk to the parameter store.
#[derive(Debug, Clone, clap::Args)]
pub struct AwsArgs {
    /// AWS region.
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Named credentials profile.
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// Custom endpoint URL (for a local emulator).
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,
}

impl AwsArgs {
    /// Returns a display string for the target environment.
    pub fn target_display(&self) -> String {
        match &self.endpoint_url {
            Some(url) => format!("Local parameter store ({})", url),
            None => format!("AWS SSM Parameter Store (region: {})", self.region),
        }
    }
}

/// Creates an SSM client with the given configuration.
pub async fn create_client(args: &AwsArgs) -> Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(args.region.clone()));

    if let Some(profile) = &args.profile {
        loader = loader.profile_name(profile);
    }
    if let Some(endpoint) = &args.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }

    let sdk_config = loader.load().await;
    Client::new(&sdk_config)
}

/// Fetches every parameter under `prefix`, following pagination.
pub async fn get_parameters_by_path(
    client: &Client,
    prefix: &str,
) -> Result<BTreeMap<String, String>> {
    let mut values = BTreeMap::new();
    let mut next_token: Option<String> = None;

    loop {
        let response = client
            .get_parameters_by_path()
            .path(prefix)
            .recursive(true)
            .with_decryption(true)
            .set_next_token(next_token.take())
            .send()
            .await
            .map_err(|e| SsmError::AwsSdk(e.to_string()))?;

        for parameter in response.parameters() {
            if let (Some(name), Some(value)) = (parameter.name(), parameter.value()) {
                values.insert(name.to_string(), value.to_string());
            }
        }

        match response.next_token() {
            Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
            _ => break,
        }
    }

    tracing::debug!(%prefix, count = values.len(), "fetched parameters");
    Ok(values)
}

/// Reads one parameter, returning None if it doesn't exist.
pub async fn get_parameter(client: &Client, name: &str) -> Result<Option<String>> {
    match client
        .get_parameter()
        .name(name)
        .with_decryption(true)
        .send()
        .await
    {
        Ok(response) => Ok(response
            .parameter()
            .and_then(|p| p.value())
            .map(str::to_string)),
        Err(err) => {
            let not_found = err
                .as_service_error()
                .is_some_and(|e| e.is_parameter_not_found());
            if not_found {
                Ok(None)
            } else {
                Err(SsmError::AwsSdk(err.to_string()))
            }
        }
    }
}

/// Writes one plain string parameter.
pub async fn put_parameter(client: &Client, name: &str, value: &str, overwrite: bool) -> Result<()> {
    client
        .put_parameter()
        .name(name)
        .value(value)
        .r#type(ParameterType::String)
        .overwrite(overwrite)
        .send()
        .await
        .map_err(|e| SsmError::AwsSdk(e.to_string()))?;
    Ok(())
}
