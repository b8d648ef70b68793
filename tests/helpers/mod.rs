#![allow(dead_code)]

pub mod builders;

pub use builders::{task_rules, RuleTreeBuilder, SubjectBuilder};
