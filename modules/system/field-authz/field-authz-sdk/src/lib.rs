#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Field AuthZ SDK
//!
//! This crate provides the public contract of the `field_authz` module:
//!
//! - [`Principal`], [`Entity`], [`InputItem`], [`Resource`], [`Action`] - Data model
//! - [`AuthorizeOptions`], [`OptionsOverride`] - Resolved configuration and per-query overlays
//! - [`PolicyAdapter`], [`PolicyHandle`] - Protocol every policy backend implements
//! - [`FieldVisibility`], [`Decision`] - Attribute allow/deny sets
//! - [`AdapterRegistry`] - Name-keyed backend factories
//! - [`ResourceStore`] - Side-channel lookup of pre-mutation state
//! - [`AuthorizeError`] - Error taxonomy
//!
//! ## Usage
//!
//! ```ignore
//! use field_authz_sdk::{EvaluationRequest, PolicyAdapter};
//!
//! let handle = adapter.evaluate(&request).await?;
//! if handle.is_granted(&request.action, &request.item) {
//!     let visible = handle.visibility().project(request.item.attributes());
//! }
//! ```

pub mod adapter;
pub mod decision;
pub mod error;
pub mod models;
pub mod options;
pub mod registry;
pub mod store;

pub use adapter::{
    AdapterCapabilities, Blocking, ContextShape, EvaluationRequest, FieldValidation,
    PolicyAdapter, PolicyHandle, SyncPolicyAdapter,
};
pub use decision::{Decision, FieldVisibility, WILDCARD};
pub use error::{AdapterError, AuthorizeError, ConfigError, Denial, DenialKind, StoreError};
pub use models::{Action, Entity, InputItem, ModelDescriptor, Principal, Resource};
pub use options::{AuthorizeOptions, OptionsOverride, SelfMatcher, UserFromResult};
pub use registry::{AdapterFactory, AdapterRegistry};
pub use store::ResourceStore;
