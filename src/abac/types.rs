use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::abac::errors::AbacError;
use crate::abac::mask::MaskMode;
use crate::abac::path::{self, Lookup};

/// Attribute namespace a condition key or reference lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// `sbj`: the principal attempting the action
    Subject,
    /// `ctx`: ambient attributes (time, environment, ...)
    Context,
    /// `obj`: the target object, never resolved locally
    Object,
}

impl Namespace {
    pub fn token(self) -> &'static str {
        match self {
            Namespace::Subject => "sbj",
            Namespace::Context => "ctx",
            Namespace::Object => "obj",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "sbj" => Some(Namespace::Subject),
            "ctx" => Some(Namespace::Context),
            "obj" => Some(Namespace::Object),
            _ => None,
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// Reference to an attribute: "sbj.profile.id", "obj.owner"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeRef {
    pub namespace: Namespace,
    /// Path inside the namespace, without the namespace token
    pub path: String,
}

impl AttributeRef {
    pub fn parse(s: &str) -> Option<Self> {
        let (token, rest) = path::split_once_dot(s);
        let namespace = Namespace::from_token(token)?;
        let rest = rest.filter(|r| !r.is_empty())?;
        Some(Self {
            namespace,
            path: rest.to_string(),
        })
    }
}

impl std::fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.namespace, self.path)
    }
}

/// Right-hand side of a comparison, as written in the rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Expected {
    Literal(Value),
    /// Only `sbj.` and `ctx.` strings become references; everything else is literal.
    Attribute(AttributeRef),
}

impl Expected {
    pub fn from_value(value: Value) -> Self {
        if let Value::String(s) = &value {
            if let Some(attr) = AttributeRef::parse(s) {
                if attr.namespace != Namespace::Object {
                    return Expected::Attribute(attr);
                }
            }
        }
        Expected::Literal(value)
    }

    /// A literal `"*"` or null: `eq` against it places no constraint.
    /// Attribute data never counts as a wildcard.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Expected::Literal(v) if v.is_null() || v.as_str() == Some("*"))
    }
}

/// Operator kinds known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Not,
    In,
    Lt,
    Gt,
    And,
    Or,
}

impl Operator {
    pub fn name(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Not => "not",
            Operator::In => "in",
            Operator::Lt => "lt",
            Operator::Gt => "gt",
            Operator::And => "and",
            Operator::Or => "or",
        }
    }

    pub fn combinator(self) -> Option<Combinator> {
        match self {
            Operator::And => Some(Combinator::And),
            Operator::Or => Some(Combinator::Or),
            _ => None,
        }
    }
}

impl FromStr for Operator {
    type Err = AbacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" => Ok(Operator::Eq),
            "not" => Ok(Operator::Not),
            "in" => Ok(Operator::In),
            "lt" => Ok(Operator::Lt),
            "gt" => Ok(Operator::Gt),
            "and" => Ok(Operator::And),
            "or" => Ok(Operator::Or),
            other => Err(AbacError::UnknownOperator(other.to_string())),
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

impl From<Combinator> for Operator {
    fn from(c: Combinator) -> Self {
        match c {
            Combinator::And => Operator::And,
            Combinator::Or => Operator::Or,
        }
    }
}

// ---------- Compiled conditions ----------

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Compare {
        attribute: AttributeRef,
        operator: Operator,
        expected: Expected,
    },
    Compose {
        combinator: Combinator,
        branches: Vec<Condition>,
    },
}

/// Conjunction of clauses, in the order they were written.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Condition {
    pub clauses: Vec<Clause>,
}

impl Condition {
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Allow,
    #[default]
    Deny,
}

impl FromStr for Resolution {
    type Err = AbacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(Resolution::Allow),
            "deny" => Ok(Resolution::Deny),
            other => Err(AbacError::InvalidRule(format!(
                "result must be \"allow\" or \"deny\", got `{other}`"
            ))),
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Allow => f.write_str("allow"),
            Resolution::Deny => f.write_str("deny"),
        }
    }
}

/// A rule-tree leaf.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rule {
    pub condition: Condition,
    /// Missing `result` in the source means deny
    pub result: Resolution,
    /// Field paths to redact from objects returned under this rule
    pub mask: Vec<String>,
}

/// Compiled rule tree: resource -> action (or wildcard) -> rule.
#[derive(Debug, Clone, Default)]
pub struct RuleTree {
    resources: BTreeMap<String, BTreeMap<String, Rule>>,
}

impl RuleTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resource: &str, action: &str, rule: Rule) {
        self.resources
            .entry(resource.to_string())
            .or_default()
            .insert(action.to_string(), rule);
    }

    pub fn get(&self, resource: &str, action: &str) -> Option<&Rule> {
        self.resources.get(resource)?.get(action)
    }

    /// Entries of `other` replace entries with the same resource and action.
    pub fn merge(&mut self, other: RuleTree) {
        for (resource, actions) in other.resources {
            self.resources.entry(resource).or_default().extend(actions);
        }
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn rule_count(&self) -> usize {
        self.resources.values().map(|a| a.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_count() == 0
    }
}

// ---------- Data source ----------

/// The locally resolvable namespaces (`sbj`, `ctx`).
#[derive(Debug, Clone, Default)]
pub struct DataSource {
    subject: Value,
    context: Value,
}

impl DataSource {
    pub fn new(subject: Value, context: Value) -> Self {
        Self { subject, context }
    }

    /// Build from a mapping keyed by namespace token. `sbj` falls back to
    /// `subject` when the mapping has none; `obj` is ignored.
    pub fn from_namespaces(subject: Value, data_source: Value) -> Self {
        let mut namespaces = match data_source {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        let subject = match namespaces.remove(Namespace::Subject.token()) {
            Some(v) if !v.is_null() => v,
            _ => subject,
        };
        let context = namespaces
            .remove(Namespace::Context.token())
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        Self { subject, context }
    }

    pub fn subject(&self) -> &Value {
        &self.subject
    }

    pub fn context(&self) -> &Value {
        &self.context
    }

    /// Resolve a `sbj`/`ctx` reference. Object references are always missing.
    pub fn lookup(&self, attr: &AttributeRef) -> Lookup<'_> {
        match attr.namespace {
            Namespace::Subject => path::resolve(&self.subject, &attr.path),
            Namespace::Context => path::resolve(&self.context, &attr.path),
            Namespace::Object => Lookup::Missing,
        }
    }
}

// ---------- Evaluation results ----------

/// Deferred predicate over object attributes, for the storage layer.
///
/// Serialized shape, stable:
/// `{"operator": "eq"|"not"|"in"|"lt"|"gt"|"and"|"or", "operand": "<field path>", "value": <json>}`.
/// For `and`/`or` the operand is `""` and `value` is a non-empty list of
/// filter expressions: a combinator none of whose branches deferred anything
/// is left out entirely, so an empty `and`/`or` never appears.
/// `operand` is relative to the object (`obj.` stripped).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFilter")]
pub struct FilterExpression {
    pub operator: Operator,
    #[serde(default)]
    pub operand: String,
    pub value: FilterValue,
}

/// `Nested` for `and`/`or`, `Value` for comparisons; picked by the operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Nested(Vec<FilterExpression>),
    Value(Value),
}

#[derive(Deserialize)]
struct RawFilter {
    operator: Operator,
    #[serde(default)]
    operand: String,
    value: Value,
}

impl TryFrom<RawFilter> for FilterExpression {
    type Error = serde_json::Error;

    fn try_from(raw: RawFilter) -> Result<Self, Self::Error> {
        let value = match raw.operator.combinator() {
            Some(_) => FilterValue::Nested(serde_json::from_value(raw.value)?),
            None => FilterValue::Value(raw.value),
        };
        Ok(Self {
            operator: raw.operator,
            operand: raw.operand,
            value,
        })
    }
}

impl FilterExpression {
    pub fn compare(operator: Operator, operand: impl Into<String>, value: Value) -> Self {
        Self {
            operator,
            operand: operand.into(),
            value: FilterValue::Value(value),
        }
    }

    pub fn compose(combinator: Combinator, filters: Vec<FilterExpression>) -> Self {
        Self {
            operator: combinator.into(),
            operand: String::new(),
            value: FilterValue::Nested(filters),
        }
    }

    /// Nested expressions of an `and`/`or` node; empty for comparisons.
    pub fn children(&self) -> &[FilterExpression] {
        match &self.value {
            FilterValue::Nested(children) => children,
            FilterValue::Value(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionOutcome {
    pub filters: Vec<FilterExpression>,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    /// Whether the rule's condition held (not the verdict)
    pub passed: bool,
    pub result: Resolution,
    pub filter: Option<FilterExpression>,
    pub mask: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterExpression>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mask: Vec<String>,
    /// Rule-tree path of the deciding rule; absent for the default resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
}

impl Decision {
    pub fn from_default(default: Resolution) -> Self {
        Self {
            passed: default == Resolution::Allow,
            filter: None,
            mask: Vec::new(),
            matched: None,
        }
    }
}

// ---------- API request/response types ----------

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    /// e.g. "task"
    pub resource: String,
    /// e.g. "data_POST"
    pub action: String,
    #[serde(default)]
    pub subject: Value,
    /// Mapping keyed by `sbj` / `ctx`
    #[serde(default)]
    pub data_source: Value,
    /// Overrides the server's loaded rule tree
    #[serde(default)]
    pub rules: Option<Value>,
    #[serde(default)]
    pub default_resolution: Option<Resolution>,
}

#[derive(Debug, Deserialize)]
pub struct MaskRequest {
    pub object: Value,
    pub mask: Vec<String>,
    #[serde(default)]
    pub mode: Option<MaskMode>,
}
