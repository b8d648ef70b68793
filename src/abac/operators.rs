//! Operator registry.
//!
//! Comparisons are static functions looked up by [`Operator`]; they take the
//! rule's expected value first and the resolved attribute second. `and` and
//! `or` recurse through a [`ConditionEvaluator`].

use serde_json::Value;

use crate::abac::path::Lookup;
use crate::abac::types::{Combinator, Condition, ConditionOutcome, FilterExpression, Operator};

/// `(value, operand) -> matched`
pub type Comparison = fn(Lookup<'_>, Lookup<'_>) -> bool;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OperatorResult {
    pub result: bool,
    pub filter: Option<FilterExpression>,
}

/// Evaluates a full condition; handed to combinators so they can recurse.
pub trait ConditionEvaluator {
    fn evaluate_condition(&self, condition: &Condition) -> ConditionOutcome;
}

impl Operator {
    /// Comparison function for this operator, `None` for combinators.
    pub fn comparison(self) -> Option<Comparison> {
        match self {
            Operator::Eq => Some(eq),
            Operator::Not => Some(not),
            Operator::In => Some(is_in),
            Operator::Lt => Some(lt),
            Operator::Gt => Some(gt),
            Operator::And | Operator::Or => None,
        }
    }
}

/// Dispatch a comparison operator. Combinators never match here.
pub fn compare(operator: Operator, value: Lookup<'_>, operand: Lookup<'_>) -> OperatorResult {
    let result = operator
        .comparison()
        .map(|cmp| cmp(value, operand))
        .unwrap_or(false);
    OperatorResult {
        result,
        filter: None,
    }
}

/// `"*"` or null as the expected value means no constraint.
pub fn eq(value: Lookup<'_>, operand: Lookup<'_>) -> bool {
    let Lookup::Found(expected) = value else {
        return false;
    };
    if expected.is_null() || expected.as_str() == Some("*") {
        return true;
    }
    match operand {
        Lookup::Found(actual) => values_equal(actual, expected),
        Lookup::Missing => false,
    }
}

/// Plain equality, without the wildcard reading of `eq`. Used when the
/// expected value was read from attribute data.
pub fn eq_exact(value: Lookup<'_>, operand: Lookup<'_>) -> bool {
    match (value, operand) {
        (Lookup::Found(expected), Lookup::Found(actual)) => values_equal(actual, expected),
        _ => false,
    }
}

pub fn not(value: Lookup<'_>, operand: Lookup<'_>) -> bool {
    let Lookup::Found(expected) = value else {
        return false;
    };
    match operand {
        Lookup::Found(actual) => !values_equal(actual, expected),
        Lookup::Missing => true,
    }
}

pub fn is_in(value: Lookup<'_>, operand: Lookup<'_>) -> bool {
    match (value, operand) {
        (Lookup::Found(Value::Array(items)), Lookup::Found(actual)) => {
            items.iter().any(|item| values_equal(actual, item))
        }
        _ => false,
    }
}

pub fn lt(value: Lookup<'_>, operand: Lookup<'_>) -> bool {
    match numbers(value, operand) {
        Some((bound, actual)) => actual < bound,
        None => false,
    }
}

pub fn gt(value: Lookup<'_>, operand: Lookup<'_>) -> bool {
    match numbers(value, operand) {
        Some((bound, actual)) => actual > bound,
        None => false,
    }
}

fn numbers(value: Lookup<'_>, operand: Lookup<'_>) -> Option<(f64, f64)> {
    Some((value.value()?.as_f64()?, operand.value()?.as_f64()?))
}

/// JSON equality where numbers compare by value (`1 == 1.0`).
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x == y
            } else {
                x.as_f64() == y.as_f64()
            }
        }
        _ => a == b,
    }
}

/// Evaluate every branch, collecting filters from all of them even once the
/// verdict is settled. The wrapping filter is omitted when no branch deferred.
pub fn combine(
    combinator: Combinator,
    branches: &[Condition],
    evaluator: &dyn ConditionEvaluator,
) -> OperatorResult {
    let mut filters = Vec::new();
    let mut result = combinator == Combinator::And;
    for branch in branches {
        let outcome = evaluator.evaluate_condition(branch);
        filters.extend(outcome.filters);
        result = match combinator {
            Combinator::And => result && outcome.passed,
            Combinator::Or => result || outcome.passed,
        };
    }
    let filter = (!filters.is_empty()).then(|| FilterExpression::compose(combinator, filters));
    OperatorResult { result, filter }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abac::types::{AttributeRef, Clause, Expected};
    use serde_json::json;

    fn found(v: &Value) -> Lookup<'_> {
        Lookup::Found(v)
    }

    #[test]
    fn test_eq_strings_and_numbers() {
        assert!(!eq(found(&json!("first")), found(&json!("second"))));
        assert!(eq(found(&json!("same")), found(&json!("same"))));
        assert!(!eq(found(&json!(1)), found(&json!(2))));
        assert!(eq(found(&json!(1)), found(&json!(1))));
        assert!(eq(found(&json!(1)), found(&json!(1.0))));
    }

    #[test]
    fn test_eq_no_constraint() {
        for v in [json!("x"), json!(3), json!(null)] {
            assert!(eq(found(&json!("*")), found(&v)));
            assert!(eq(found(&Value::Null), found(&v)));
        }
        assert!(eq(found(&Value::Null), Lookup::Missing));
    }

    #[test]
    fn test_eq_exact_has_no_wildcard() {
        assert!(!eq_exact(found(&json!("*")), found(&json!("x"))));
        assert!(eq_exact(found(&json!("*")), found(&json!("*"))));
        assert!(!eq_exact(Lookup::Missing, found(&json!("x"))));
        assert!(eq_exact(found(&json!(2)), found(&json!(2.0))));
    }

    #[test]
    fn test_eq_missing_never_matches() {
        assert!(!eq(found(&json!("admin")), Lookup::Missing));
        assert!(!eq(Lookup::Missing, found(&json!("admin"))));
        assert!(!eq(Lookup::Missing, Lookup::Missing));
    }

    #[test]
    fn test_not() {
        assert!(not(found(&json!("manager")), found(&json!("admin"))));
        assert!(!not(found(&json!("admin")), found(&json!("admin"))));
        assert!(not(found(&json!("admin")), Lookup::Missing));
        assert!(!not(Lookup::Missing, found(&json!("admin"))));
    }

    #[test]
    fn test_in() {
        assert!(is_in(found(&json!([1, 2, 3])), found(&json!(1))));
        assert!(!is_in(found(&json!([1, 2, 3])), found(&json!(4))));
        assert!(is_in(found(&json!(["a", "b", "c"])), found(&json!("a"))));
        assert!(!is_in(found(&json!(["a", "b", "c"])), found(&json!("d"))));
        assert!(!is_in(found(&json!("abc")), found(&json!("a"))));
        assert!(!is_in(found(&json!([1])), Lookup::Missing));
    }

    #[test]
    fn test_lt_gt() {
        assert!(lt(found(&json!(10)), found(&json!(3))));
        assert!(!lt(found(&json!(3)), found(&json!(10))));
        assert!(gt(found(&json!(3)), found(&json!(10))));
        assert!(!gt(found(&json!(3)), found(&json!(3))));
        assert!(!gt(found(&json!(3)), found(&json!("ten"))));
        assert!(!lt(found(&json!(3)), Lookup::Missing));
    }

    #[test]
    fn test_compare_dispatch() {
        let r = compare(Operator::In, found(&json!(["a"])), found(&json!("a")));
        assert!(r.result);
        assert!(r.filter.is_none());
        assert!(!compare(Operator::And, found(&json!([])), Lookup::Missing).result);
    }

    /// Passes a branch when its first clause compares against `true`, and
    /// emits one filter per branch.
    struct Stub;

    impl ConditionEvaluator for Stub {
        fn evaluate_condition(&self, condition: &Condition) -> ConditionOutcome {
            let passed = matches!(
                condition.clauses.first(),
                Some(Clause::Compare { expected: Expected::Literal(Value::Bool(true)), .. })
            );
            ConditionOutcome {
                filters: vec![FilterExpression::compare(Operator::Eq, "f", json!(passed))],
                passed,
            }
        }
    }

    fn branch(pass: bool) -> Condition {
        Condition {
            clauses: vec![Clause::Compare {
                attribute: AttributeRef::parse("sbj.x").unwrap(),
                operator: Operator::Eq,
                expected: Expected::Literal(json!(pass)),
            }],
        }
    }

    #[test]
    fn test_and_collects_filters_from_every_branch() {
        let r = combine(Combinator::And, &[branch(false), branch(true)], &Stub);
        assert!(!r.result);
        let filter = r.filter.unwrap();
        assert_eq!(filter.operator, Operator::And);
        assert_eq!(filter.operand, "");
        assert_eq!(filter.children().len(), 2);
    }

    #[test]
    fn test_or() {
        let r = combine(Combinator::Or, &[branch(false), branch(true)], &Stub);
        assert!(r.result);
        assert_eq!(r.filter.unwrap().operator, Operator::Or);
        assert!(!combine(Combinator::Or, &[branch(false)], &Stub).result);
    }

    #[test]
    fn test_empty_combinators() {
        let and = combine(Combinator::And, &[], &Stub);
        assert!(and.result);
        assert!(and.filter.is_none());
        assert!(!combine(Combinator::Or, &[], &Stub).result);
    }
}
