//! Domain layer for the ability plugin.

pub mod ability;
pub mod client;
pub mod service;

pub use ability::{Ability, Rule};
pub use client::AbilityAccess;
pub use service::{AbilityAdapter, AbilityContext};
