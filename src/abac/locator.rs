use crate::abac::types::{Rule, RuleTree};

pub const WILDCARD: &str = "*";

/// `(resource, action)` keys to consult, most specific first.
///
/// `verb` is the part of the action before its first `_`, so `data_POST`
/// also matches rules stored under `data_*`.
pub fn candidate_keys(resource: &str, action: &str) -> [(String, String); 6] {
    let verb = action.split('_').next().unwrap_or(action);
    let verb_any = format!("{verb}_{WILDCARD}");
    [
        (resource.to_string(), action.to_string()),
        (resource.to_string(), verb_any.clone()),
        (resource.to_string(), WILDCARD.to_string()),
        (WILDCARD.to_string(), action.to_string()),
        (WILDCARD.to_string(), verb_any),
        (WILDCARD.to_string(), WILDCARD.to_string()),
    ]
}

/// The same candidates rendered as `resource.action` paths.
pub fn candidate_paths(resource: &str, action: &str) -> [String; 6] {
    candidate_keys(resource, action).map(|(r, a)| format!("{r}.{a}"))
}

/// Candidate rules in priority order; a `None` rule is a miss. Keys are
/// matched as given, so a resource name may itself contain dots.
pub fn find_rules<'a>(
    tree: &'a RuleTree,
    resource: &str,
    action: &str,
) -> impl Iterator<Item = (String, Option<&'a Rule>)> + 'a {
    candidate_keys(resource, action)
        .into_iter()
        .map(move |(r, a)| (format!("{r}.{a}"), tree.get(&r, &a)))
}
