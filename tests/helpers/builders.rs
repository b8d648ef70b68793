use palisade::abac::loader::compile_rules;
use palisade::abac::types::RuleTree;
use serde_json::{json, Map, Value};

/// Builder for subject attribute documents
pub struct SubjectBuilder {
    attrs: Map<String, Value>,
}

impl SubjectBuilder {
    pub fn new(id: i64) -> Self {
        let mut attrs = Map::new();
        attrs.insert("id".to_string(), json!(id));
        Self { attrs }
    }

    pub fn with_role(self, role: &str) -> Self {
        self.with("role", json!(role))
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.attrs.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.attrs)
    }

    /// The subject wrapped as a `{"sbj": ...}` data source
    pub fn data_source(self) -> Value {
        json!({ "sbj": self.build() })
    }
}

/// Builder for rule trees, one `resource.action` leaf at a time
#[derive(Default)]
pub struct RuleTreeBuilder {
    raw: Map<String, Value>,
}

impl RuleTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, resource: &str, action: &str, rule: Value) -> Self {
        let actions = self
            .raw
            .entry(resource.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(actions) = actions {
            actions.insert(action.to_string(), rule);
        }
        self
    }

    pub fn raw(self) -> Value {
        Value::Object(self.raw)
    }

    pub fn build(self) -> RuleTree {
        compile_rules(&self.raw()).expect("Failed to compile test rule tree")
    }
}

/// A small tree covering every candidate path level for the `task` resource.
pub fn task_rules() -> RuleTreeBuilder {
    RuleTreeBuilder::new()
        .rule(
            "task",
            "data_GET",
            json!({
                "rule": { "sbj.role": "admin" },
                "result": "allow",
                "mask": ["salary"]
            }),
        )
        .rule(
            "task",
            "data_*",
            json!({
                "rule": {
                    "or": [
                        { "obj.owner_id": "sbj.id" },
                        { "obj.public": true }
                    ]
                },
                "result": "allow"
            }),
        )
        .rule(
            "task",
            "*",
            json!({ "rule": { "sbj.role": "auditor" }, "result": "allow" }),
        )
        .rule(
            "*",
            "delete_*",
            json!({ "rule": {}, "result": "deny" }),
        )
}
