//! Domain layer for the role-based attribute-list plugin.

pub mod client;
pub mod condition;
pub mod service;

pub use service::Service;
