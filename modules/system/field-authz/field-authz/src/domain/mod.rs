//! Domain layer for the field `AuthZ` engine.

pub mod authorizer;
pub mod context;
pub mod evaluator;
pub mod filter;
pub mod query;

pub use authorizer::FieldAuthorizer;
pub use context::{AccessContext, ResolvedContext};
pub use query::{AuthorizedQuery, HookArgs, QueryState};
