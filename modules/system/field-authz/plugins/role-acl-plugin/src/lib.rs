#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Role-based attribute-list backend for field `AuthZ`.
//!
//! Grants name a resource, an action and attribute patterns (`*`, `!email`,
//! `metadata.field`), optionally guarded by a condition over the flat
//! evaluation context. All grants of the principal's role that match are
//! unioned.

pub mod config;
pub mod domain;
pub mod module;

pub use config::{Condition, GrantConfig, RoleAclPluginConfig, RoleConfig};
pub use domain::Service;
pub use module::{PLUGIN_NAME, register};
