//! Side-channel access to the pre-mutation state of targeted rows.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StoreError;

/// Fetches the rows a pending write will touch, as they are now.
///
/// Supplied per hook invocation by the persistence layer. Used when a query
/// asks for its resource to be loaded from the store instead of passed in.
///
/// ```ignore
/// struct Rows(Vec<Map<String, Value>>);
///
/// #[async_trait]
/// impl ResourceStore for Rows {
///     async fn fetch_current(&self) -> Result<Vec<Map<String, Value>>, StoreError> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Current state of the rows matched by the pending query.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the lookup fails.
    async fn fetch_current(&self) -> Result<Vec<Map<String, Value>>, StoreError>;
}
