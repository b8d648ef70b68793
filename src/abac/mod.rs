pub mod condition;
pub mod engine;
pub mod errors;
pub mod loader;
pub mod locator;
pub mod mask;
pub mod operators;
pub mod path;
pub mod types;
pub mod web;

use mask::MaskMode;
use types::{Resolution, RuleTree};

/// Loaded decision state shared by the HTTP handlers.
/// Immutable after construction; rule changes require a service reload.
#[derive(Debug, Default)]
pub struct AbacState {
    /// Rule tree used when a request carries none
    pub rules: RuleTree,
    /// Verdict when no candidate rule's condition holds
    pub default_resolution: Resolution,
    pub mask_mode: MaskMode,
}
