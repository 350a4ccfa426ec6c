use anyhow::{anyhow, Result};
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

const SNAPSHOT_SCHEMA: &str = include_str!("../contracts/snapshot.v1.json");

pub struct SnapshotSchema {
    schema: JSONSchema,
}

impl SnapshotSchema {
    pub fn new() -> Result<Self> {
        let schema_value: Value = serde_json::from_str(SNAPSHOT_SCHEMA)
            .map_err(|e| anyhow!("Failed to parse snapshot schema: {}", e))?;

        let schema = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema_value)
            .map_err(|e| anyhow!("Failed to compile snapshot schema: {}", e))?;

        Ok(Self { schema })
    }

    /// Schema violations as `message at /pointer` lines; empty when valid.
    pub fn violations(&self, document: &Value) -> Vec<String> {
        match self.schema.validate(document) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|error| {
                    let path = error.instance_path.to_string();
                    if path.is_empty() {
                        error.to_string()
                    } else {
                        format!("{} at {}", error, path)
                    }
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn embedded_schema_compiles() {
        assert!(SnapshotSchema::new().is_ok());
    }

    #[test]
    fn scope_id_pairing_is_enforced() {
        let schema = SnapshotSchema::new().unwrap();
        let doc = json!({
            "assignments": [
                { "id": "a1", "policyId": "p1", "organizationId": "o",
                  "scope": { "type": "organization", "id": "x" } },
                { "id": "a2", "policyId": "p1", "organizationId": "o",
                  "scope": { "type": "team" } }
            ]
        });
        let violations = schema.violations(&doc);
        assert!(violations.len() >= 2, "{violations:?}");
        assert!(violations.iter().any(|v| v.contains("/assignments/0/scope")));
        assert!(violations.iter().any(|v| v.contains("/assignments/1/scope")));
    }

    #[test]
    fn negative_days_are_rejected() {
        let schema = SnapshotSchema::new().unwrap();
        let doc = json!({
            "policies": [{ "id": "p1", "organizationId": "o", "name": "Bad",
                           "selfServiceDays": -1, "approvalDays": 0 }]
        });
        let violations = schema.violations(&doc);
        assert_eq!(violations.len(), 1, "{violations:?}");
        assert!(violations[0].contains("/policies/0/selfServiceDays"));
    }
}
