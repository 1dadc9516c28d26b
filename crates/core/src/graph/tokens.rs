//! Cross-descriptor reference tokens.
//!
//! Properties refer to other descriptors only through `Ref` and
//! `Fn::GetAtt` tokens. The graph scans for them to derive dependency edges,
//! so a reference to a descriptor that has not been added yet is caught at
//! build time.

use std::collections::BTreeSet;

use serde_json::{json, Value};

use super::LogicalId;

/// Provider pseudo parameters. These never create dependency edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pseudo {
    AccountId,
    Partition,
    Region,
    UrlSuffix,
}

impl Pseudo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pseudo::AccountId => "AWS::AccountId",
            Pseudo::Partition => "AWS::Partition",
            Pseudo::Region => "AWS::Region",
            Pseudo::UrlSuffix => "AWS::URLSuffix",
        }
    }
}

const PSEUDO_PREFIX: &str = "AWS::";

/// `{"Ref": id}`
pub fn reference(id: &LogicalId) -> Value {
    json!({ "Ref": id.as_str() })
}

/// `{"Fn::GetAtt": [id, attribute]}`
pub fn get_att(id: &LogicalId, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [id.as_str(), attribute] })
}

/// `{"Ref": "AWS::..."}`
pub fn pseudo(parameter: Pseudo) -> Value {
    json!({ "Ref": parameter.as_str() })
}

/// Concatenates literal and token parts with no delimiter.
pub fn join(parts: impl IntoIterator<Item = Value>) -> Value {
    json!({ "Fn::Join": ["", parts.into_iter().collect::<Vec<_>>()] })
}

/// Collects every descriptor id referenced anywhere inside `value`.
pub fn collect_references(value: &Value, out: &mut BTreeSet<LogicalId>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(target)) = map.get("Ref") {
                    if !target.starts_with(PSEUDO_PREFIX) {
                        out.insert(LogicalId::new(target.as_str()));
                    }
                    return;
                }
                if let Some(Value::Array(args)) = map.get("Fn::GetAtt") {
                    if let Some(Value::String(target)) = args.first() {
                        out.insert(LogicalId::new(target.as_str()));
                    }
                    return;
                }
            }
            for nested in map.values() {
                collect_references(nested, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> LogicalId {
        LogicalId::new(s)
    }

    #[test]
    fn test_reference_shape() {
        assert_eq!(reference(&id("GoalsTable")), json!({ "Ref": "GoalsTable" }));
    }

    #[test]
    fn test_get_att_shape() {
        assert_eq!(
            get_att(&id("GoalsTable"), "Arn"),
            json!({ "Fn::GetAtt": ["GoalsTable", "Arn"] })
        );
    }

    #[test]
    fn test_collect_nested_references() {
        let value = json!({
            "Role": get_att(&id("AccessRole"), "Arn"),
            "Environment": { "Variables": { "TABLE": reference(&id("GoalsTable")) } },
            "Uri": join([json!("arn:"), pseudo(Pseudo::Partition), reference(&id("Api"))]),
        });

        let mut refs = BTreeSet::new();
        collect_references(&value, &mut refs);

        let names: Vec<&str> = refs.iter().map(LogicalId::as_str).collect();
        assert_eq!(names, vec!["AccessRole", "Api", "GoalsTable"]);
    }

    #[test]
    fn test_pseudo_parameters_are_not_references() {
        let mut refs = BTreeSet::new();
        collect_references(&pseudo(Pseudo::Region), &mut refs);
        assert!(refs.is_empty());
    }

    #[test]
    fn test_literal_ref_key_inside_larger_object_is_walked() {
        // An object with more than one key is a plain property bag.
        let value = json!({ "Ref": "NotAToken", "Other": reference(&id("Real")) });
        let mut refs = BTreeSet::new();
        collect_references(&value, &mut refs);
        assert_eq!(refs.into_iter().collect::<Vec<_>>(), vec![id("Real")]);
    }
}
