use async_trait::async_trait;

use crate::Result;

/// Hexagonal port for the homework review API.
///
/// Implemented over HTTP in `hwb-practicum`; tests use in-memory fakes.
#[async_trait]
pub trait HomeworkApi: Send + Sync {
    /// Fetch statuses changed since `from_date` (epoch seconds; `None` means now).
    ///
    /// Returns the decoded JSON body verbatim. Implementations must not retry.
    async fn fetch_statuses(&self, from_date: Option<i64>) -> Result<serde_json::Value>;
}
