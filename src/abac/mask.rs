//! Field masking for objects returned under a decision.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::abac::path;

/// How mask entries are matched against an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskMode {
    /// Entries name top-level keys; a dotted entry is a literal key.
    TopLevel,
    /// Entries are dotted paths, descending through mappings and lists.
    #[default]
    Nested,
}

/// Remove every masked field from `value`. Lists are masked element-wise,
/// missing fields are ignored.
pub fn apply_mask(value: &mut Value, mask: &[String], mode: MaskMode) {
    for field in mask {
        match mode {
            MaskMode::TopLevel => remove_key(value, field),
            MaskMode::Nested => remove_path(value, field),
        }
    }
}

fn remove_key(value: &mut Value, key: &str) {
    match value {
        Value::Array(items) => items.iter_mut().for_each(|item| remove_key(item, key)),
        Value::Object(map) => {
            map.shift_remove(key);
        }
        _ => {}
    }
}

fn remove_path(value: &mut Value, field: &str) {
    match value {
        Value::Array(items) => items.iter_mut().for_each(|item| remove_path(item, field)),
        Value::Object(map) => match path::split_once_dot(field) {
            (key, None) => {
                map.shift_remove(key);
            }
            (key, Some(rest)) => {
                if let Some(child) = map.get_mut(key) {
                    remove_path(child, rest);
                }
            }
        },
        _ => {}
    }
}
