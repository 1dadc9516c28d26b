//! Command line entry point for synthesizing the goals application.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod output;
mod prelude;
mod ssm;
mod synth;

/// Synthesize and manage the goals application infrastructure
#[derive(Debug, Parser)]
#[command(name = "goalstack")]
#[command(about = "Synthesize and manage the goals application infrastructure", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: Global,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Silence the command output
    #[clap(long, global = true)]
    pub silent: bool,

    /// Enable verbose output
    #[clap(long, global = true)]
    pub verbose: bool,
}

impl Global {
    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Synthesize the deployment template
    Synth(synth::SynthCommand),

    /// Manage environment parameters
    Params(ssm::ParamsCommand),
}

/// Logs go to stderr so stdout stays clean for the template.
fn init_tracing(global: &Global) {
    let default_filter = if global.is_verbose() {
        "goalstack=debug,goalstack_core=debug"
    } else if global.is_silent() {
        "goalstack=warn,goalstack_core=warn"
    } else {
        "goalstack=info,goalstack_core=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.global);

    match cli.command {
        Commands::Synth(synth_cmd) => {
            synth::run(synth_cmd, &cli.global).await?;
        }
        Commands::Params(params_cmd) => {
            ssm::run(params_cmd, &cli.global).await?;
        }
    }

    Ok(())
}
