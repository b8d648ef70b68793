use std::path::Path;

use serde_json::Value;

use crate::abac::condition::compile_condition;
use crate::abac::errors::AbacError;
use crate::abac::types::{Condition, Resolution, Rule, RuleTree};

const RULE_FIELDS: [&str; 3] = ["rule", "result", "mask"];

/// Load a rule tree from a JSON file, or from every `.json` file in a
/// directory (lexical order, later files override earlier entries).
pub fn load_rules(path: &Path) -> Result<RuleTree, AbacError> {
    let (tree, file_count) = if path.is_file() {
        (load_file(path)?, 1)
    } else if path.is_dir() {
        load_dir(path)?
    } else {
        return Err(AbacError::RuleLoad {
            path: path.display().to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "not a file or directory",
            ),
        });
    };

    if tree.is_empty() {
        tracing::warn!(path = %path.display(), "rule tree is empty; every check uses the default resolution");
    }

    tracing::info!(
        files = file_count,
        resources = tree.resource_count(),
        rules = tree.rule_count(),
        "Loaded rule tree"
    );

    Ok(tree)
}

fn load_dir(dir: &Path) -> Result<(RuleTree, usize), AbacError> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(|source| AbacError::RuleLoad {
            path: dir.display().to_string(),
            source,
        })?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();

    let mut tree = RuleTree::new();
    let mut file_count = 0;
    for path in entries {
        if path.extension().map(|ext| ext == "json").unwrap_or(false) && path.is_file() {
            tree.merge(load_file(&path)?);
            file_count += 1;
        } else {
            tracing::warn!(path = %path.display(), "ignoring non-JSON entry in rules directory");
        }
    }
    Ok((tree, file_count))
}

fn load_file(path: &Path) -> Result<RuleTree, AbacError> {
    let contents = std::fs::read_to_string(path).map_err(|source| AbacError::RuleLoad {
        path: path.display().to_string(),
        source,
    })?;
    let raw: Value = serde_json::from_str(&contents)?;
    compile_rules(&raw)
}

/// Compile a JSON rule tree (`resource -> action -> rule`), validating every rule.
pub fn compile_rules(raw: &Value) -> Result<RuleTree, AbacError> {
    let Value::Object(resources) = raw else {
        return Err(AbacError::InvalidRule(
            "rule tree must be a mapping of resources".into(),
        ));
    };

    let mut tree = RuleTree::new();
    for (resource, actions) in resources {
        let Value::Object(actions) = actions else {
            return Err(AbacError::InvalidRule(format!(
                "resource `{resource}` must be a mapping of actions to rules"
            )));
        };
        for (action, raw_rule) in actions {
            let rule = compile_rule(&format!("{resource}.{action}"), raw_rule)?;
            tree.insert(resource, action, rule);
        }
    }
    Ok(tree)
}

/// Compile one `{ rule, result, mask }` leaf; `path` is used in error messages.
pub fn compile_rule(path: &str, raw: &Value) -> Result<Rule, AbacError> {
    let Value::Object(fields) = raw else {
        return Err(AbacError::InvalidRule(format!(
            "`{path}` must be a rule mapping, got `{raw}`"
        )));
    };

    for key in fields.keys() {
        if !RULE_FIELDS.contains(&key.as_str()) {
            tracing::warn!(rule = path, field = %key, "ignoring unknown rule field");
        }
    }

    let condition = match fields.get("rule") {
        None | Some(Value::Null) => Condition::default(),
        Some(c) => compile_condition(c).map_err(|e| match e {
            AbacError::InvalidRule(msg) => AbacError::InvalidRule(format!("`{path}`: {msg}")),
            other => other,
        })?,
    };

    let result = match fields.get("result") {
        None | Some(Value::Null) => Resolution::Deny,
        Some(Value::String(s)) => s.parse()?,
        Some(other) => {
            return Err(AbacError::InvalidRule(format!(
                "`{path}`: result must be \"allow\" or \"deny\", got `{other}`"
            )))
        }
    };

    let mask = match fields.get("mask") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    AbacError::InvalidRule(format!(
                        "`{path}`: mask entries must be field path strings, got `{item}`"
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(AbacError::InvalidRule(format!(
                "`{path}`: mask must be a list of field paths, got `{other}`"
            )))
        }
    };

    Ok(Rule {
        condition,
        result,
        mask,
    })
}
