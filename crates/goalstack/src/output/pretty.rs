//! Pretty output formatting.

use std::collections::BTreeMap;

use goalstack_core::stacks::{Authorization, RouteTarget};
use goalstack_core::{EnvironmentParameterSet, Synthesis};

fn header(title: &str) -> String {
    format!("{}\n{}", title, "-".repeat(40))
}

/// Format a resolved parameter set for display.
pub fn format_parameters(params: &EnvironmentParameterSet) -> String {
    let mut output = header(&format!("PARAMETERS ({})", params.environment()));
    for (name, value) in params.iter() {
        output.push_str(&format!("\n  {}: {}", name, value));
    }
    output
}

/// Format a synthesis summary for display.
pub fn format_synthesis(synthesis: &Synthesis) -> String {
    let mut sections = vec![format!(
        "{} ({})\n  Resources: {}",
        synthesis.project_name,
        synthesis.environment,
        synthesis.graph.len()
    )];

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for descriptor in synthesis.graph.iter() {
        *counts.entry(descriptor.kind.type_name()).or_default() += 1;
    }
    let mut resources = header("RESOURCES");
    for (type_name, count) in counts {
        resources.push_str(&format!("\n  {:<45} {}", type_name, count));
    }
    sections.push(resources);

    let mut routes = header(&format!("ROUTES ({})", synthesis.routes.len()));
    for route in &synthesis.routes {
        let target = match &route.target {
            RouteTarget::Handler(operation) => operation.as_str().to_string(),
            RouteTarget::Preflight(_) => "preflight".to_string(),
        };
        let auth = match route.authorization {
            Authorization::UserPool { .. } => "user pool",
            Authorization::None => "none",
        };
        routes.push_str(&format!(
            "\n  {:<8} {:<12} -> {:<10} [{}]",
            route.verb, route.path, target, auth
        ));
    }
    sections.push(routes);

    let mut pipeline = header(&format!("PIPELINE {}", synthesis.pipeline.name));
    for stage in &synthesis.pipeline.stages {
        let actions: Vec<&str> = stage.actions.iter().map(|a| a.name.as_str()).collect();
        pipeline.push_str(&format!("\n  {}: {}", stage.name, actions.join(", ")));
    }
    sections.push(pipeline);

    let mut outputs = header("OUTPUTS");
    for (name, value) in &synthesis.outputs {
        let shown = match value.as_str() {
            Some(s) => s.to_string(),
            None => value.to_string(),
        };
        outputs.push_str(&format!("\n  {}: {}", name, shown));
    }
    sections.push(outputs);

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::fixtures;
    use goalstack_core::Environment;

    #[test]
    fn test_format_parameters_lists_every_name() {
        let synthesis = fixtures::synthesis(Environment::Load);
        let output = format_parameters(&synthesis.params);

        assert!(output.starts_with("PARAMETERS (Load)"));
        assert_eq!(
            output.lines().count(),
            2 + goalstack_core::ParameterName::COUNT
        );
    }

    #[test]
    fn test_format_synthesis_sections() {
        let synthesis = fixtures::synthesis(Environment::Test);
        let output = format_synthesis(&synthesis);

        assert!(output.starts_with("MyCDKGoals (Test)"));
        assert!(output.contains("AWS::DynamoDB::Table"));
        assert!(output.contains("/goals/{id}"));
        assert!(output.contains("[user pool]"));
        assert!(output.contains("PIPELINE MyCDKGoals-Assets-Pipeline"));
        assert!(output.contains("TableName:"));
    }
}
