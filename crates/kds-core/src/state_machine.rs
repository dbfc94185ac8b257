use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kitchen status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Served,
    Cancelled,
}

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Served,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Served => "served",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// No further transitions leave a terminal status.
    pub fn is_terminal(self) -> bool {
        allowed_transitions(self).is_empty()
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownStatus(s.trim().to_string()))
    }
}

/// Validates a status transition.
///
/// Pure: no timestamps are touched here, see `order::plan_transition`
/// for the side effects a legal transition implies.
pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), ValidationError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(ValidationError::InvalidTransition { from, to })
    }
}

pub fn allowed_transitions(from: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::*;
    match from {
        Pending => &[Preparing, Cancelled],
        Preparing => &[Ready, Cancelled],
        Ready => &[Served, Cancelled],
        Served => &[],
        Cancelled => &[],
    }
}

fn allowed(from: OrderStatus, to: OrderStatus) -> bool {
    allowed_transitions(from).contains(&to)
}
