//! Palisade - attribute-based access control decision service
//!
//! Resolves `(resource, action)` requests against a JSON rule tree using
//! subject, context and object attributes. Object attributes are not known
//! at decision time and come back as a filter expression for the caller.
//! It exposes all modules for testing purposes.

pub mod abac;
pub mod settings;
pub mod web;
