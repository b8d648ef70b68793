//! Rule conditions: compilation from JSON and evaluation.
//!
//! Condition syntax:
//! - `{"sbj.role": "admin"}`: implicit `eq`
//! - `{"sbj.role": {"in": ["admin", "manager"]}}`: explicit operator
//! - `{"or": [{...}, {...}]}`: combinators take a list of conditions
//! - `{"obj.owner": "sbj.id"}`: object attributes become filter expressions
//!
//! Several keys in one mapping are AND-ed.

use serde_json::Value;

use crate::abac::errors::AbacError;
use crate::abac::operators::{self, ConditionEvaluator, OperatorResult};
use crate::abac::path::Lookup;
use crate::abac::types::{
    AttributeRef, Clause, Condition, ConditionOutcome, DataSource, Expected, FilterExpression,
    Namespace, Operator,
};

// ─── Compilation ────────────────────────────────────────────────────────

/// Compile a JSON condition into its typed form.
pub fn compile_condition(raw: &Value) -> Result<Condition, AbacError> {
    let Value::Object(entries) = raw else {
        return Err(AbacError::InvalidRule(format!(
            "condition must be a mapping, got `{raw}`"
        )));
    };
    let clauses = entries
        .iter()
        .map(|(key, value)| compile_clause(key, value))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Condition { clauses })
}

fn compile_clause(key: &str, raw: &Value) -> Result<Clause, AbacError> {
    if let Value::Array(items) = raw {
        let list_error = || {
            AbacError::InvalidRule(format!(
                "`{key}` is given a list, but only `and`/`or` take a list of conditions"
            ))
        };
        if AttributeRef::parse(key).is_some() {
            return Err(list_error());
        }
        let combinator = key
            .parse::<Operator>()?
            .combinator()
            .ok_or_else(list_error)?;
        let branches = items
            .iter()
            .map(compile_condition)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Clause::Compose {
            combinator,
            branches,
        });
    }

    let attribute = AttributeRef::parse(key).ok_or_else(|| {
        AbacError::InvalidRule(format!(
            "condition key `{key}` must be `and`, `or` or start with sbj., ctx. or obj."
        ))
    })?;
    let (operator, value) = operator_clause(key, raw)?;
    let expected = Expected::from_value(value.clone());
    check_literal(key, operator, &expected)?;
    Ok(Clause::Compare {
        attribute,
        operator,
        expected,
    })
}

/// Unwrap `{op: value}` clauses; nested clauses collapse to the innermost operator.
fn operator_clause<'a>(key: &str, raw: &'a Value) -> Result<(Operator, &'a Value), AbacError> {
    let mut operator = Operator::Eq;
    let mut value = raw;
    while let Value::Object(clause) = value {
        let mut entries = clause.iter();
        let (Some((name, inner)), None) = (entries.next(), entries.next()) else {
            return Err(AbacError::InvalidRule(format!(
                "`{key}`: operator clause must have exactly one key, found {}",
                clause.len()
            )));
        };
        operator = name.parse()?;
        if operator.combinator().is_some() {
            return Err(AbacError::InvalidRule(format!(
                "`{key}`: `{name}` combines conditions and cannot compare a value"
            )));
        }
        value = inner;
    }
    Ok((operator, value))
}

fn check_literal(key: &str, operator: Operator, expected: &Expected) -> Result<(), AbacError> {
    let Expected::Literal(value) = expected else {
        return Ok(());
    };
    match operator {
        Operator::In if !value.is_array() => Err(AbacError::InvalidRule(format!(
            "`{key}`: `in` requires a list, got `{value}`"
        ))),
        Operator::Lt | Operator::Gt if !value.is_number() => Err(AbacError::InvalidRule(format!(
            "`{key}`: `{operator}` requires a number, got `{value}`"
        ))),
        _ => Ok(()),
    }
}

// ─── Reveal ─────────────────────────────────────────────────────────────

/// A comparison with its sides resolved as far as possible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Revealed<'a> {
    /// Both sides come from the rule or the local namespaces.
    Local {
        operand: Lookup<'a>,
        value: Lookup<'a>,
    },
    /// The attribute belongs to the object; `field` is its path without `obj.`.
    Deferred { field: &'a str, value: Lookup<'a> },
}

pub fn reveal<'a>(
    data: &'a DataSource,
    attribute: &'a AttributeRef,
    expected: &'a Expected,
) -> Revealed<'a> {
    // A null read from attribute data is no bound at all.
    let value = match expected {
        Expected::Literal(v) => Lookup::Found(v),
        Expected::Attribute(reference) => match data.lookup(reference) {
            Lookup::Found(v) if v.is_null() => Lookup::Missing,
            found => found,
        },
    };
    match attribute.namespace {
        Namespace::Object => Revealed::Deferred {
            field: &attribute.path,
            value,
        },
        Namespace::Subject | Namespace::Context => Revealed::Local {
            operand: data.lookup(attribute),
            value,
        },
    }
}

// ─── Evaluator ──────────────────────────────────────────────────────────

impl ConditionEvaluator for DataSource {
    fn evaluate_condition(&self, condition: &Condition) -> ConditionOutcome {
        let mut filters = Vec::new();
        let mut passed = true;
        for clause in &condition.clauses {
            let outcome = match clause {
                Clause::Compose {
                    combinator,
                    branches,
                } => operators::combine(*combinator, branches, self),
                Clause::Compare {
                    attribute,
                    operator,
                    expected,
                } => match reveal(self, attribute, expected) {
                    Revealed::Deferred { field, value } => {
                        defer(*operator, field, value, expected.is_wildcard())
                    }
                    Revealed::Local { operand, value } => match expected {
                        Expected::Attribute(_) if *operator == Operator::Eq => OperatorResult {
                            result: operators::eq_exact(value, operand),
                            filter: None,
                        },
                        _ => operators::compare(*operator, value, operand),
                    },
                },
            };
            filters.extend(outcome.filter);
            passed = passed && outcome.result;
        }
        ConditionOutcome { filters, passed }
    }
}

/// Turn an object comparison into a filter expression. `wildcard` is set
/// only for a literal `"*"`/null bound.
fn defer(operator: Operator, field: &str, value: Lookup<'_>, wildcard: bool) -> OperatorResult {
    match value {
        Lookup::Found(_) if wildcard && operator == Operator::Eq => OperatorResult {
            result: true,
            filter: None,
        },
        Lookup::Found(v) => OperatorResult {
            result: true,
            filter: Some(FilterExpression::compare(operator, field, v.clone())),
        },
        Lookup::Missing => {
            tracing::debug!(field, %operator, "object comparison has no resolvable bound");
            OperatorResult {
                result: false,
                filter: None,
            }
        }
    }
}
