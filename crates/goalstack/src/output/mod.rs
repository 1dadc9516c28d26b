//! Output formatting functions.

pub mod json;
pub mod pretty;

use goalstack_core::EnvironmentParameterSet;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON.
    Json,
    /// Human-readable summary.
    #[default]
    Pretty,
}

/// Format a resolved parameter set for output.
pub fn format_parameters(params: &EnvironmentParameterSet, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_json(params),
        OutputFormat::Pretty => pretty::format_parameters(params),
    }
}
