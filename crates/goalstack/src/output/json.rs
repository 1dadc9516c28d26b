//! JSON output formatting.

/// Format a value as JSON.
pub fn format_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::fixtures;
    use goalstack_core::{render_template, Environment};

    #[test]
    fn test_template_is_compact_json() {
        let synthesis = fixtures::synthesis(Environment::Test);
        let output = format_json(&render_template(&synthesis));

        assert!(!output.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["Resources"]["GoalsTable"]["Type"], "AWS::DynamoDB::Table");
    }

    #[test]
    fn test_parameters_serialize_as_flat_map() {
        let synthesis = fixtures::synthesis(Environment::Test);
        let parsed: serde_json::Value =
            serde_json::from_str(&format_json(&synthesis.params)).unwrap();
        assert_eq!(parsed["tableName"], synthesis.params.get(goalstack_core::ParameterName::TableName));
    }
}
