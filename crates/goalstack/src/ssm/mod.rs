//! Parameter store commands.

mod client;
mod error;
mod seed;
mod snapshot;

pub use client::{create_client, AwsArgs};
pub use error::{Result, SsmError};
pub use snapshot::{load_offline, load_snapshot, resolve_environment};

use std::collections::BTreeMap;

use dialoguer::Confirm;
use goalstack_core::params::seed::{calculate_seed_plan, desired_parameters, format_seed_plan};
use goalstack_core::params::{default_environment_path, environment_prefix, resolve_all};
use goalstack_core::Environment;

use crate::output::{self, OutputFormat};
use crate::prelude::*;

/// Namespace used when none is given.
pub const DEFAULT_NAMESPACE: &str = "GoalStackEnvs";

/// Parameter store management commands.
#[derive(Debug, clap::Parser)]
pub struct ParamsCommand {
    #[command(subcommand)]
    pub action: ParamsAction,
}

/// Available parameter store actions.
#[derive(Debug, clap::Subcommand)]
pub enum ParamsAction {
    /// Create missing environment parameters with their documented defaults.
    Seed(SeedCommand),

    /// Resolve and print the complete parameter set for an environment.
    Show(ShowCommand),
}

/// Seed environment parameters.
#[derive(Debug, clap::Parser)]
#[command(long_about = "Create missing environment parameters with their documented defaults.

For every selected environment, each recognized parameter is created under
/<namespace>/<environment>/<name> if it does not exist. Existing values are
left alone unless --overwrite is given. The /<namespace>/Default-env pointer
is created when absent and never replaced.

The command shows a plan of changes before applying and asks for confirmation.

Environment variables:
  AWS_ENDPOINT_URL    - Use a local parameter store emulator
  AWS_REGION          - AWS region (defaults to us-east-1)
  AWS_PROFILE         - AWS profile to use for credentials")]
pub struct SeedCommand {
    /// Environments to seed (defaults to all of them).
    #[arg(long = "environment", value_name = "ENV")]
    pub environments: Vec<String>,

    /// Value written to the Default-env pointer when it is missing.
    #[arg(long, default_value = "Dev-local")]
    pub default_environment: String,

    /// Parameter store namespace.
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Replace existing values that differ from the defaults.
    #[arg(long)]
    pub overwrite: bool,

    /// Skip confirmation prompts.
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub aws: AwsArgs,
}

/// Show resolved parameters.
#[derive(Debug, clap::Parser)]
pub struct ShowCommand {
    /// Environment to resolve (defaults to the store's Default-env pointer).
    #[arg(long)]
    pub environment: Option<String>,

    /// Parameter store namespace.
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Output format.
    #[arg(long, default_value = "pretty")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub aws: AwsArgs,
}

/// Main entry point for the params command.
pub async fn run(command: ParamsCommand, global: &crate::Global) -> Result<()> {
    match command.action {
        ParamsAction::Seed(seed_cmd) => run_seed(seed_cmd, global).await,
        ParamsAction::Show(show_cmd) => run_show(show_cmd, global).await,
    }
}

/// Parses the requested environments, defaulting to every known one.
fn selected_environments(ids: &[String]) -> Result<Vec<Environment>> {
    if ids.is_empty() {
        return Ok(Environment::ALL.to_vec());
    }
    let mut environments = Vec::with_capacity(ids.len());
    for id in ids {
        let environment = Environment::parse(id)?;
        if !environments.contains(&environment) {
            environments.push(environment);
        }
    }
    Ok(environments)
}

async fn run_seed(cmd: SeedCommand, global: &crate::Global) -> Result<()> {
    let environments = selected_environments(&cmd.environments)?;
    let default_environment = Environment::parse(&cmd.default_environment)?;

    if !global.is_silent() {
        aeprintln!("{} {}", p_b("Target:"), cmd.aws.target_display());
        aeprintln!("{} /{}", p_b("Namespace:"), cmd.namespace.trim_matches('/'));
        aeprintln!();
    }

    let client = create_client(&cmd.aws).await;

    let mut current = BTreeMap::new();
    for &environment in &environments {
        let prefix = environment_prefix(&cmd.namespace, environment);
        current.extend(client::get_parameters_by_path(&client, &prefix).await?);
    }
    let pointer = default_environment_path(&cmd.namespace);
    if let Some(value) = client::get_parameter(&client, &pointer).await? {
        current.insert(pointer, value);
    }

    let desired = desired_parameters(&cmd.namespace, &environments, default_environment);
    let plan = calculate_seed_plan(&current, &desired, cmd.overwrite);

    if !global.is_silent() {
        aeprintln!("{}", p_c("Seed Plan:"));
        for line in format_seed_plan(&plan) {
            aeprintln!("  {}", plan_line(&line));
        }
        aeprintln!();
    }

    if plan.is_noop() {
        if !global.is_silent() {
            aeprintln!("{}", p_g("Parameters are up to date."));
        }
        return Ok(());
    }

    if !cmd.force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Write {} parameters?", plan.writes().count()))
            .default(true)
            .interact()
            .map_err(|e| SsmError::AwsSdk(e.to_string()))?;

        if !confirmed {
            return Err(SsmError::UserCancelled);
        }
    }

    let written = seed::execute_seed_plan(&client, &plan).await?;

    if !global.is_silent() {
        aeprintln!("{} {} parameters written.", p_g("Success:"), written);
    }

    Ok(())
}

async fn run_show(cmd: ShowCommand, global: &crate::Global) -> Result<()> {
    let client = create_client(&cmd.aws).await;
    let environment =
        resolve_environment(&client, &cmd.namespace, cmd.environment.as_deref()).await?;

    if !global.is_silent() {
        aeprintln!("{} {}", p_b("Target:"), cmd.aws.target_display());
        aeprintln!("{} {}", p_b("Environment:"), environment);
    }

    let store = load_snapshot(&client, &cmd.namespace, environment).await?;
    let params = resolve_all(
        &cmd.namespace,
        environment.as_str(),
        &BTreeMap::new(),
        &store,
    )?;

    println!("{}", output::format_parameters(&params, cmd.format));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selected_environments_default_to_all() {
        assert_eq!(selected_environments(&[]).unwrap(), Environment::ALL.to_vec());
    }

    #[test]
    fn test_selected_environments_dedupe_and_validate() {
        let ids = vec!["Test".to_string(), "test".to_string(), "Prod".to_string()];
        assert_eq!(
            selected_environments(&ids).unwrap(),
            vec![Environment::Test, Environment::Prod]
        );

        let bad = vec!["qa".to_string()];
        assert!(matches!(
            selected_environments(&bad),
            Err(SsmError::Config(_))
        ));
    }
}
