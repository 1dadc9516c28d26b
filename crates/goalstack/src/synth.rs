//! The `synth` command: resolve parameters, assemble the graph, emit a template.

use std::collections::BTreeMap;
use std::path::PathBuf;

use goalstack_core::params::InMemoryParameterStore;
use goalstack_core::{
    render_template, synthesize, Environment, HandlerSettings, PasswordPolicy, PipelineSettings,
    SynthConfig, VerificationMessage,
};
use thiserror::Error;

use crate::output::{self, OutputFormat};
use crate::prelude::*;
use crate::ssm::{self, AwsArgs, SsmError, DEFAULT_NAMESPACE};

#[derive(Error, Debug)]
pub enum SynthCommandError {
    #[error(transparent)]
    Ssm(#[from] SsmError),

    #[error(transparent)]
    Synth(#[from] goalstack_core::SynthError),

    #[error("--parameters needs an explicit --environment")]
    OfflineWithoutEnvironment,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SynthCommandError>;

/// Synthesize the goals application template.
#[derive(Debug, clap::Parser)]
#[command(long_about = "Synthesize the goals application template.

Parameters are read once from /<namespace>/<environment>/ before any resource
is described. When --environment is omitted the /<namespace>/Default-env
pointer decides. With --parameters, values come from a flat JSON file of
name -> value pairs instead and the parameter store is not contacted.

Both --allow-unauthenticated and --cdn are required: there is no default for
whether guests may call the API or whether a CDN fronts the website.")]
pub struct SynthCommand {
    /// Project name prefixed to physical resource names (max 12 characters).
    #[arg(long)]
    pub project: String,

    /// Environment to synthesize (defaults to the store's Default-env pointer).
    #[arg(long)]
    pub environment: Option<String>,

    /// Parameter store namespace.
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Whether guests without an account get API access.
    #[arg(long, action = clap::ArgAction::Set, value_name = "BOOL")]
    pub allow_unauthenticated: bool,

    /// Whether a content distribution fronts the website bucket.
    #[arg(long, action = clap::ArgAction::Set, value_name = "BOOL")]
    pub cdn: bool,

    /// Literal table name, skipping the parameter store for `tableName`.
    #[arg(long)]
    pub table_name: Option<String>,

    /// Read parameters from a flat JSON file instead of the store.
    #[arg(long, value_name = "FILE")]
    pub parameters: Option<PathBuf>,

    #[command(flatten)]
    pub handlers: HandlerArgs,

    #[command(flatten)]
    pub password: PasswordArgs,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Write the output here instead of stdout.
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Output format.
    #[arg(long, default_value = "json")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub aws: AwsArgs,
}

#[derive(Debug, Clone, clap::Args)]
pub struct HandlerArgs {
    /// s3://<bucket>/<key> of the packaged handler code.
    #[arg(long)]
    pub code_uri: String,

    /// Handler memory in MB.
    #[arg(long, default_value_t = 256)]
    pub memory: u32,

    /// Handler timeout in seconds.
    #[arg(long, default_value_t = 10)]
    pub timeout: u32,

    /// Handler runtime.
    #[arg(long, default_value = "nodejs18.x")]
    pub runtime: String,
}

#[derive(Debug, Clone, clap::Args)]
pub struct PasswordArgs {
    /// Minimum password length.
    #[arg(long, default_value_t = 8)]
    pub password_min_length: u8,

    #[arg(long)]
    pub password_require_lowercase: bool,

    #[arg(long)]
    pub password_require_uppercase: bool,

    #[arg(long)]
    pub password_require_digits: bool,

    #[arg(long)]
    pub password_require_symbols: bool,
}

#[derive(Debug, Clone, clap::Args)]
pub struct PipelineArgs {
    /// Archive the pipeline pulls from the source bucket.
    #[arg(long, default_value = "assets.zip")]
    pub source_object_key: String,

    /// Build timeout in minutes.
    #[arg(long, default_value_t = 5)]
    pub build_timeout: u32,

    #[arg(long, default_value = "BUILD_GENERAL1_SMALL")]
    pub build_compute_type: String,

    #[arg(long, default_value = "aws/codebuild/standard:3.0")]
    pub build_image: String,
}

impl SynthCommand {
    /// Builds the synthesis configuration for `environment`.
    pub fn to_config(&self, environment: Environment) -> SynthConfig {
        let mut config = SynthConfig {
            project_name: self.project.clone(),
            environment: environment.to_string(),
            namespace: self.namespace.clone(),
            region: self.aws.region.clone(),
            allow_unauthenticated_identities: self.allow_unauthenticated,
            cdn_enabled: self.cdn,
            handlers: HandlerSettings {
                memory_mb: self.handlers.memory,
                timeout_secs: self.handlers.timeout,
                runtime: self.handlers.runtime.clone(),
                code_uri: self.handlers.code_uri.clone(),
            },
            password_policy: PasswordPolicy {
                min_length: self.password.password_min_length,
                require_lowercase: self.password.password_require_lowercase,
                require_uppercase: self.password.password_require_uppercase,
                require_digits: self.password.password_require_digits,
                require_symbols: self.password.password_require_symbols,
            },
            verification: VerificationMessage::default(),
            pipeline: PipelineSettings {
                source_object_key: self.pipeline.source_object_key.clone(),
                build_timeout_minutes: self.pipeline.build_timeout,
                compute_type: self.pipeline.build_compute_type.clone(),
                build_image: self.pipeline.build_image.clone(),
            },
            parameter_defaults: BTreeMap::new(),
        };
        if let Some(table_name) = &self.table_name {
            config = config.with_table_name(table_name);
        }
        config
    }
}

/// Main entry point for the synth command.
pub async fn run(cmd: SynthCommand, global: &crate::Global) -> Result<()> {
    let (environment, store) = load_parameters(&cmd).await?;

    if !global.is_silent() {
        aeprintln!("{} {}", p_b("Project:"), cmd.project);
        aeprintln!("{} {}", p_b("Environment:"), environment);
    }

    let config = cmd.to_config(environment);
    let synthesis = synthesize(&config, &store)?;

    let rendered = match cmd.format {
        OutputFormat::Json => output::json::format_json(&render_template(&synthesis)),
        OutputFormat::Pretty => output::pretty::format_synthesis(&synthesis),
    };

    match &cmd.out {
        Some(path) => {
            std::fs::write(path, rendered + "\n")?;
            if !global.is_silent() {
                aeprintln!("{} wrote {}", p_g("Success:"), path.display());
            }
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

/// Picks the environment and loads its parameters, from a file or the store.
async fn load_parameters(cmd: &SynthCommand) -> Result<(Environment, InMemoryParameterStore)> {
    if let Some(path) = &cmd.parameters {
        let id = cmd
            .environment
            .as_deref()
            .ok_or(SynthCommandError::OfflineWithoutEnvironment)?;
        let environment = Environment::parse(id).map_err(SsmError::from)?;
        let store = ssm::load_offline(path, &cmd.namespace, environment)?;
        tracing::debug!(path = %path.display(), parameters = store.len(), "offline parameters loaded");
        return Ok((environment, store));
    }

    let client = ssm::create_client(&cmd.aws).await;
    let environment =
        ssm::resolve_environment(&client, &cmd.namespace, cmd.environment.as_deref()).await?;
    let store = ssm::load_snapshot(&client, &cmd.namespace, environment).await?;
    tracing::debug!(parameters = store.len(), "parameter snapshot loaded");
    Ok((environment, store))
}
