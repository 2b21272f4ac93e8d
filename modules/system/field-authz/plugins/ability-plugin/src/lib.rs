#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Ability backend for field `AuthZ`.
//!
//! An [`Ability`] is an ordered rule list (`can` / `cannot` an action on a
//! subject, optionally limited to fields and guarded by equality conditions
//! on the resource). Writes are validated one field at a time.

pub mod config;
pub mod domain;
pub mod module;

pub use config::{AbilityPluginConfig, RuleConfig};
pub use domain::{Ability, AbilityAccess, AbilityAdapter, AbilityContext, Rule};
pub use module::{PLUGIN_NAME, register};
