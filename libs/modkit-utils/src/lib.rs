#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! ModKit utilities for plain JSON-shaped objects.
//!
//! - [`object`] - leaf-key enumeration and structural diffing
//! - [`dot_path`] - dot-notation lookup, pick and omit
//! - [`temporal`] - instant normalization for textual timestamps

pub mod dot_path;
pub mod object;
pub mod temporal;

pub use dot_path::{get_path, omit_paths, pick_paths};
pub use object::{PlainObject, deep_keys, diff_fields, structural_diff, values_equal};
