//! Error types for the KDS core
//!
//! Three families, matching how callers recover:
//! - Validation failures, raised locally before any network call
//! - Remote failures, wrapping the transport cause
//! - Missing orders in the local cache

use crate::api::ApiError;
use crate::state_machine::OrderStatus;
use crate::types::OrderRecordId;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Main KDS error type
#[derive(Debug, thiserror::Error)]
pub enum KdsError {
    /// Input rejected before reaching the network
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Remote API call failed; local state is unchanged
    #[error("remote {operation} failed: {source}")]
    Remote {
        /// Which remote operation failed
        operation: RemoteOperation,
        /// The transport-level cause
        #[source]
        source: ApiError,
    },

    /// Update targeted an order absent from the local cache
    #[error("order not found: {0}")]
    NotFound(OrderRecordId),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl KdsError {
    #[inline]
    pub fn remote(operation: RemoteOperation, source: ApiError) -> Self {
        Self::Remote { operation, source }
    }

    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether repeating the same call could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Remote { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

/// Remote operations the core delegates to the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOperation {
    CreateOrder,
    UpdateOrder,
    ListOrders,
    FetchPerformance,
}

impl std::fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RemoteOperation::CreateOrder => "create order",
            RemoteOperation::UpdateOrder => "update order",
            RemoteOperation::ListOrders => "list orders",
            RemoteOperation::FetchPerformance => "fetch performance",
        };
        f.write_str(name)
    }
}

/// Local validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Order has no items
    #[error("order must contain at least one item")]
    EmptyItems,

    /// Item quantity below one
    #[error("invalid quantity {quantity} for item '{item}'")]
    InvalidQuantity { item: String, quantity: u32 },

    /// Required field missing or blank
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Priority outside 1..=4
    #[error("invalid priority {0}, expected 1-4")]
    InvalidPriority(u8),

    /// Status name outside the five known statuses
    #[error("unknown status '{0}'")]
    UnknownStatus(String),

    /// Status change not in the legal graph
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Preparation end before preparation start
    #[error("prep end {end} precedes prep start {start}")]
    TimestampOrder {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Write-once timestamp already recorded
    #[error("{0} is already set")]
    TimestampAlreadySet(&'static str),

    /// Prep end written while the order is still open
    #[error("prepEndTime can only be set on a ready, served or cancelled order, not {0}")]
    PrepWindowOpen(OrderStatus),

    /// Prep end written with no prep start on record
    #[error("prepEndTime requires prepStartTime")]
    PrepNotStarted,

    /// Range end before range start
    #[error("invalid date range: {end} precedes {start}")]
    InvalidDateRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Patch carries no changes
    #[error("update carries no changes")]
    EmptyPatch,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Result alias for core operations
pub type KdsResult<T> = Result<T, KdsError>;
