//! Dotted attribute-path lookup into namespace mappings.
//!
//! Paths are split on the first `.` only, one segment per level, so
//! `profile.address.city` walks `profile`, then `address.city`, then `city`.
//! A lookup never fails: anything that cannot be followed is [`Lookup::Missing`].

use serde_json::Value;

/// Outcome of resolving an attribute path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Found(&'a Value),
    Missing,
}

impl<'a> Lookup<'a> {
    pub fn value(self) -> Option<&'a Value> {
        match self {
            Lookup::Found(v) => Some(v),
            Lookup::Missing => None,
        }
    }
}

/// Split `path` at its first `.`; the remainder is not split further.
pub fn split_once_dot(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}

/// Resolve `path` against `root`.
pub fn resolve<'a>(root: &'a Value, path: &str) -> Lookup<'a> {
    let (head, rest) = split_once_dot(path);
    let Some(current) = root.as_object().and_then(|map| map.get(head)) else {
        return Lookup::Missing;
    };
    match rest {
        None => Lookup::Found(current),
        Some(rest) => resolve(current, rest),
    }
}
