//! Remote API contract
//!
//! The core never talks to the network directly; it goes through
//! `KdsApi`. Each method is a single attempt: retries are layered on top
//! by callers (see `retry::RetryPolicy`).

use crate::order::{KdsOrder, NewOrderRequest, OrderPatch};
use crate::performance::PerformanceSnapshot;
use crate::types::{BusinessId, DateRange, OrderRecordId};
use async_trait::async_trait;

/// Boxed transport cause
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Transport-agnostic remote failure
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request never produced a response
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// Server answered with a non-success status
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected shape
    #[error("malformed response: {0}")]
    Decode(String),

    /// Service temporarily unavailable
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl ApiError {
    #[inline]
    pub fn transport(source: impl Into<BoxError>) -> Self {
        Self::Transport(source.into())
    }

    /// Whether the same request may succeed on a later attempt
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Unavailable(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Decode(_) => false,
        }
    }
}

/// Operations the remote order service provides
///
/// Maps one-to-one onto `POST /orders`, `PATCH /orders/{id}`,
/// `GET /orders?businessId=` and `GET /performance`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KdsApi: Send + Sync {
    /// Persist a new order; returns it with server-assigned id and timestamps
    async fn create_order(&self, request: &NewOrderRequest) -> Result<KdsOrder, ApiError>;

    /// Update mutable fields; returns the full updated order
    async fn update_order(&self, id: &OrderRecordId, patch: &OrderPatch)
        -> Result<KdsOrder, ApiError>;

    /// All current orders of a business
    async fn list_orders(&self, business_id: &BusinessId) -> Result<Vec<KdsOrder>, ApiError>;

    /// Aggregate performance for a date range
    async fn fetch_performance(
        &self,
        business_id: &BusinessId,
        range: &DateRange,
    ) -> Result<PerformanceSnapshot, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ApiError::Unavailable("down".into()).is_transient());
        assert!(ApiError::Status { status: 503, body: String::new() }.is_transient());
        assert!(ApiError::Status { status: 429, body: String::new() }.is_transient());
        assert!(!ApiError::Status { status: 409, body: String::new() }.is_transient());
        assert!(!ApiError::Decode("bad".into()).is_transient());
        assert!(ApiError::transport("reset by peer").is_transient());
    }
}
