//! Applies a seed plan to the parameter store (Imperative Shell).

use aws_sdk_ssm::Client;
use goalstack_core::params::seed::{SeedChange, SeedPlan};

use super::client;
use super::error::Result;

/// Writes every create/update in `plan`. Returns how many parameters were written.
pub async fn execute_seed_plan(client: &Client, plan: &SeedPlan) -> Result<usize> {
    let mut written = 0;
    for change in &plan.changes {
        match change {
            SeedChange::Create { path, value } => {
                client::put_parameter(client, path, value, false).await?;
            }
            SeedChange::Update { path, desired, .. } => {
                client::put_parameter(client, path, desired, true).await?;
            }
            SeedChange::Unchanged { .. } => continue,
        }
        tracing::debug!(path = %change_path(change), "parameter written");
        written += 1;
    }
    Ok(written)
}

fn change_path(change: &SeedChange) -> &str {
    match change {
        SeedChange::Create { path, .. }
        | SeedChange::Update { path, .. }
        | SeedChange::Unchanged { path, .. } => path,
    }
}
