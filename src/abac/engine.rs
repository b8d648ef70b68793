use serde_json::Value;

use crate::abac::condition::{self, Revealed};
use crate::abac::locator;
use crate::abac::operators::ConditionEvaluator;
use crate::abac::types::{
    AttributeRef, Combinator, Condition, ConditionOutcome, DataSource, Decision, Expected,
    FilterExpression, Resolution, Rule, RuleOutcome, RuleTree,
};

/// Decides `resource`/`action` requests for one subject against a rule tree.
/// Immutable once built; build one per request or reuse it for a stable subject.
#[derive(Debug, Clone)]
pub struct Resolver<'r> {
    data: DataSource,
    rules: &'r RuleTree,
    default_resolution: Resolution,
}

impl<'r> Resolver<'r> {
    /// `data_source` is keyed by namespace token (`sbj`, `ctx`); its `sbj`
    /// entry wins over `subject` when both are given.
    pub fn new(
        subject: Value,
        data_source: Value,
        rules: &'r RuleTree,
        default_resolution: Resolution,
    ) -> Self {
        Self::with_data(
            DataSource::from_namespaces(subject, data_source),
            rules,
            default_resolution,
        )
    }

    pub fn with_data(data: DataSource, rules: &'r RuleTree, default_resolution: Resolution) -> Self {
        Self {
            data,
            rules,
            default_resolution,
        }
    }

    /// Decide `action` on `resource`. The most specific rule whose condition
    /// holds decides; later candidates are not evaluated.
    pub fn check(&self, resource: &str, action: &str) -> Decision {
        for (path, rule) in locator::find_rules(self.rules, resource, action) {
            let Some(rule) = rule else {
                continue;
            };
            let outcome = self.evaluate_rule(rule);
            if !outcome.passed {
                tracing::trace!(%path, "rule condition not met");
                continue;
            }
            let decision = Decision {
                passed: outcome.result == Resolution::Allow,
                filter: outcome.filter,
                mask: outcome.mask,
                matched: Some(path),
            };
            tracing::debug!(
                resource,
                action,
                matched = decision.matched.as_deref(),
                passed = decision.passed,
                filtered = decision.filter.is_some(),
                "access decision"
            );
            return decision;
        }

        tracing::debug!(
            resource,
            action,
            default = %self.default_resolution,
            "no rule matched, using default resolution"
        );
        Decision::from_default(self.default_resolution)
    }

    /// Evaluate a single rule; filters are gathered under one top-level `and`.
    pub fn evaluate_rule(&self, rule: &Rule) -> RuleOutcome {
        let ConditionOutcome { filters, passed } = self.evaluate_condition(&rule.condition);
        let filter = (!filters.is_empty()).then(|| FilterExpression::compose(Combinator::And, filters));
        RuleOutcome {
            passed,
            result: rule.result,
            filter,
            mask: rule.mask.clone(),
        }
    }

    pub fn reveal<'a>(&'a self, attribute: &'a AttributeRef, expected: &'a Expected) -> Revealed<'a> {
        condition::reveal(&self.data, attribute, expected)
    }
}

impl ConditionEvaluator for Resolver<'_> {
    fn evaluate_condition(&self, condition: &Condition) -> ConditionOutcome {
        self.data.evaluate_condition(condition)
    }
}
