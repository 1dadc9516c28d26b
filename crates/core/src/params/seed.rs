//! Pure functions for calculating parameter seed plans (Functional Core).

use std::collections::BTreeMap;

use super::store::{default_environment_path, parameter_path};
use super::{Environment, ParameterName};

/// A parameter the seeder wants to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedEntry {
    pub path: String,
    pub value: String,
    /// Whether an existing, different value may be replaced.
    pub overwritable: bool,
}

/// One planned change to the parameter store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedChange {
    /// Parameter is missing and will be created.
    Create { path: String, value: String },
    /// Parameter exists with a different value and will be replaced.
    Update {
        path: String,
        current: String,
        desired: String,
    },
    /// Parameter already exists and is left alone.
    Unchanged { path: String, current: String },
}

/// Planned changes for seeding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedPlan {
    pub changes: Vec<SeedChange>,
}

impl SeedPlan {
    /// Returns true if applying the plan would write nothing.
    pub fn is_noop(&self) -> bool {
        self.writes().next().is_none()
    }

    /// Iterates over the `(path, value)` pairs that must be written.
    pub fn writes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.changes.iter().filter_map(|change| match change {
            SeedChange::Create { path, value } => Some((path.as_str(), value.as_str())),
            SeedChange::Update { path, desired, .. } => Some((path.as_str(), desired.as_str())),
            SeedChange::Unchanged { .. } => None,
        })
    }
}

/// Pure function: every parameter a seeded store should hold.
///
/// The default-environment pointer is only ever created, never replaced.
pub fn desired_parameters(
    namespace: &str,
    environments: &[Environment],
    default_environment: Environment,
) -> Vec<SeedEntry> {
    let mut entries = vec![SeedEntry {
        path: default_environment_path(namespace),
        value: default_environment.to_string(),
        overwritable: false,
    }];

    for &environment in environments {
        entries.extend(ParameterName::ALL.iter().map(|name| SeedEntry {
            path: parameter_path(namespace, environment, *name),
            value: name.seed_value().to_string(),
            overwritable: true,
        }));
    }

    entries
}

/// Pure function: Calculate what changes are needed to reach desired state.
pub fn calculate_seed_plan(
    current: &BTreeMap<String, String>,
    desired: &[SeedEntry],
    overwrite: bool,
) -> SeedPlan {
    let changes = desired
        .iter()
        .map(|entry| match current.get(&entry.path) {
            None => SeedChange::Create {
                path: entry.path.clone(),
                value: entry.value.clone(),
            },
            Some(existing) if overwrite && entry.overwritable && *existing != entry.value => {
                SeedChange::Update {
                    path: entry.path.clone(),
                    current: existing.clone(),
                    desired: entry.value.clone(),
                }
            }
            Some(existing) => SeedChange::Unchanged {
                path: entry.path.clone(),
                current: existing.clone(),
            },
        })
        .collect();

    SeedPlan { changes }
}

/// Pure function: Format a seed plan for display.
pub fn format_seed_plan(plan: &SeedPlan) -> Vec<String> {
    if plan.changes.is_empty() {
        return vec!["= Nothing to seed".to_string()];
    }

    plan.changes
        .iter()
        .map(|change| match change {
            SeedChange::Create { path, value } => format!("+ {} = {}", path, value),
            SeedChange::Update {
                path,
                current,
                desired,
            } => format!("~ {}: {} -> {}", path, current, desired),
            SeedChange::Unchanged { path, current } => format!("= {} = {}", path, current),
        })
        .collect()
}
