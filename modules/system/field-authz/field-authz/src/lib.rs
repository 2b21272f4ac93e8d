#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Field AuthZ engine
//!
//! Attaches to the lifecycle of ORM queries and decides, per query, whether
//! the principal may perform the action and which attributes flow in and out.
//!
//! - [`FieldAuthorizer`] - Per-entity-type entry point, built from [`FieldAuthzConfig`]
//! - [`AuthorizedQuery`] - Per-query state driven through `before_*` / `after_*` hooks
//! - [`AccessContext`] - Layered request context
//! - [`filter`] - Attribute projection of bodies and results
//!
//! Policy backends live in plugin crates and are resolved through the
//! [`AdapterRegistry`](field_authz_sdk::AdapterRegistry).

pub mod config;
pub mod domain;

pub use config::FieldAuthzConfig;
pub use domain::filter;
pub use domain::{
    AccessContext, AuthorizedQuery, FieldAuthorizer, HookArgs, QueryState, ResolvedContext,
};
