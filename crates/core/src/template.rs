//! Renders a finished synthesis as a provider template.

use serde_json::{json, Map, Value};

use crate::graph::ResourceDescriptor;
use crate::synth::Synthesis;

pub const FORMAT_VERSION: &str = "2010-09-09";

/// Builds the template document. Resources are emitted in build order.
pub fn render_template(synthesis: &Synthesis) -> Value {
    let mut resources = Map::new();
    for id in synthesis.build_order() {
        if let Some(descriptor) = synthesis.graph.get(id) {
            resources.insert(id.to_string(), render_resource(descriptor));
        }
    }

    let outputs: Map<String, Value> = synthesis
        .outputs
        .iter()
        .map(|(name, value)| (name.clone(), json!({ "Value": value })))
        .collect();

    json!({
        "AWSTemplateFormatVersion": FORMAT_VERSION,
        "Description": format!(
            "Goals application for {} ({})",
            synthesis.project_name, synthesis.environment
        ),
        "Resources": resources,
        "Outputs": outputs,
    })
}

fn render_resource(descriptor: &ResourceDescriptor) -> Value {
    let mut resource = Map::new();
    resource.insert("Type".to_string(), json!(descriptor.kind.type_name()));
    if !descriptor.properties.is_empty() {
        resource.insert(
            "Properties".to_string(),
            Value::Object(descriptor.properties.clone()),
        );
    }
    if !descriptor.depends_on.is_empty() {
        let depends_on: Vec<&str> = descriptor.depends_on.iter().map(|d| d.as_str()).collect();
        resource.insert("DependsOn".to_string(), json!(depends_on));
    }
    if let Some(policy) = descriptor.removal_policy {
        resource.insert("DeletionPolicy".to_string(), json!(policy.deletion_policy()));
    }
    Value::Object(resource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixtures::config;
    use crate::params::{Environment, InMemoryParameterStore};
    use crate::synth::synthesize;

    fn template() -> Value {
        let store = InMemoryParameterStore::new().with_seed_values("GoalStackEnvs", Environment::Load);
        let cfg = config("MyCDKGoals", "Load").with_table_name("CDKGoals");
        render_template(&synthesize(&cfg, &store).unwrap())
    }

    #[test]
    fn test_template_header() {
        let template = template();
        assert_eq!(template["AWSTemplateFormatVersion"], FORMAT_VERSION);
        assert_eq!(template["Description"], "Goals application for MyCDKGoals (Load)");
    }

    #[test]
    fn test_table_resource() {
        let template = template();
        let table = &template["Resources"]["GoalsTable"];

        assert_eq!(table["Type"], "AWS::DynamoDB::Table");
        assert_eq!(table["DeletionPolicy"], "Delete");
        assert_eq!(table["Properties"]["TableName"], "MyCDKGoals-CDKGoals");
    }

    #[test]
    fn test_explicit_dependencies_are_rendered() {
        let template = template();
        let depends_on = template["Resources"]["ListFunction"]["DependsOn"]
            .as_array()
            .unwrap();
        assert!(depends_on.contains(&json!("ListFunctionPolicy")));
    }

    #[test]
    fn test_outputs() {
        let template = template();
        assert_eq!(template["Outputs"]["TableName"]["Value"], "MyCDKGoals-CDKGoals");
        assert_eq!(
            template["Outputs"]["UserPoolId"]["Value"],
            json!({ "Ref": "UserPool" })
        );
        assert!(template["Outputs"]["CdnUrl"].is_object());
    }
}
