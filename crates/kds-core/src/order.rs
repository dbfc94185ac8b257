//! KDS orders and their mutations
//!
//! Defines:
//! - `KdsOrder`, the persisted kitchen order
//! - `OrderDraft` / `NewOrderRequest` for creation
//! - `OrderPatch` for field-level updates
//! - `plan_transition` / `plan_update`, the pure timing side effects of a
//!   status change, kept apart from `state_machine::validate_transition`

use crate::error::ValidationError;
use crate::item::OrderItem;
use crate::state_machine::{validate_transition, OrderStatus};
use crate::types::{BusinessId, OrderRecordId, OrderToken, Priority, Station};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A kitchen order as persisted by the remote API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdsOrder {
    /// Server-assigned identifier
    pub id: OrderRecordId,
    /// Client-generated business-visible token
    pub order_id: OrderToken,
    pub business_id: BusinessId,
    pub station: Station,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KdsOrder {
    /// Materialize a creation request the way the API persists it
    #[must_use]
    pub fn from_request(id: OrderRecordId, request: NewOrderRequest, at: DateTime<Utc>) -> Self {
        Self {
            id,
            order_id: request.order_id,
            business_id: request.business_id,
            station: request.station,
            items: request.items,
            priority: request.priority,
            status: OrderStatus::Pending,
            assigned_to: request.assigned_to,
            target_time: request.target_time,
            prep_start_time: None,
            prep_end_time: None,
            created_at: at,
            updated_at: at,
        }
    }

    /// Check an order received from the API
    ///
    /// # Errors
    /// - `EmptyItems` when there are no items
    /// - any item-level validation failure
    /// - `TimestampOrder` when prep ends before it starts
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.items.is_empty() {
            return Err(ValidationError::EmptyItems);
        }
        for item in &self.items {
            item.validate()?;
        }
        if let (Some(start), Some(end)) = (self.prep_start_time, self.prep_end_time) {
            if end < start {
                return Err(ValidationError::TimestampOrder { start, end });
            }
        }
        Ok(())
    }

    /// Total number of portions across all items
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(OrderItem::quantity).sum()
    }

    /// Whether the target time has passed while the order is still open
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal()
            && self.status != OrderStatus::Ready
            && self.target_time.is_some_and(|target| now > target)
    }

    /// Apply an already-validated patch
    ///
    /// Unset patch fields leave the order untouched; `created_at` never
    /// changes, `updated_at` always does.
    pub fn apply(&mut self, patch: &OrderPatch, at: DateTime<Utc>) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(assignee) = &patch.assigned_to {
            self.assigned_to = Some(assignee.clone());
        }
        if let Some(start) = patch.prep_start_time {
            self.prep_start_time = Some(start);
        }
        if let Some(end) = patch.prep_end_time {
            self.prep_end_time = Some(end);
        }
        self.updated_at = at;
    }
}

/// Client-side input for a new order
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub station: Station,
    pub items: Vec<OrderItem>,
    pub priority: Priority,
    pub target_time: Option<DateTime<Utc>>,
    pub assigned_to: Option<String>,
    /// Pre-generated token; a fresh one is minted when absent
    pub order_id: Option<OrderToken>,
}

impl OrderDraft {
    #[must_use]
    pub fn new(station: Station, items: Vec<OrderItem>) -> Self {
        Self {
            station,
            items,
            priority: Priority::default(),
            target_time: None,
            assigned_to: None,
            order_id: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_target_time(mut self, target: DateTime<Utc>) -> Self {
        self.target_time = Some(target);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assigned_to = Some(assignee.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_order_id(mut self, token: OrderToken) -> Self {
        self.order_id = Some(token);
        self
    }

    /// Validate and turn into the wire request for `business_id`
    ///
    /// # Errors
    /// - `EmptyItems` when there are no items
    /// - any item-level validation failure
    pub fn into_request(self, business_id: BusinessId) -> Result<NewOrderRequest, ValidationError> {
        if self.items.is_empty() {
            return Err(ValidationError::EmptyItems);
        }
        for item in &self.items {
            item.validate()?;
        }
        if self.station.as_str().trim().is_empty() {
            return Err(ValidationError::MissingField("station"));
        }

        Ok(NewOrderRequest {
            order_id: self.order_id.unwrap_or_default(),
            business_id,
            station: self.station,
            items: self.items,
            priority: self.priority,
            target_time: self.target_time,
            assigned_to: self.assigned_to,
        })
    }
}

/// Body of `POST /orders`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRequest {
    pub order_id: OrderToken,
    pub business_id: BusinessId,
    pub station: Station,
    pub items: Vec<OrderItem>,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

/// Body of `PATCH /orders/{id}`; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_end_time: Option<DateTime<Utc>>,
}

impl OrderPatch {
    #[inline]
    #[must_use]
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn assign(assignee: impl Into<String>) -> Self {
        Self {
            assigned_to: Some(assignee.into()),
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assigned_to = Some(assignee.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_prep_start(mut self, at: DateTime<Utc>) -> Self {
        self.prep_start_time = Some(at);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_prep_end(mut self, at: DateTime<Utc>) -> Self {
        self.prep_end_time = Some(at);
        self
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.assigned_to.is_none()
            && self.prep_start_time.is_none()
            && self.prep_end_time.is_none()
    }
}

/// Timestamps a legal transition must record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub set_prep_start: Option<DateTime<Utc>>,
    pub set_prep_end: Option<DateTime<Utc>>,
}

/// Validate `order.status -> to` and compute its timing side effects
///
/// Entering `preparing` opens the prep window; entering `ready`, `served`
/// or `cancelled` closes it. Neither timestamp is ever overwritten.
pub fn plan_transition(
    order: &KdsOrder,
    to: OrderStatus,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, ValidationError> {
    validate_transition(order.status, to)?;

    let set_prep_start = match to {
        OrderStatus::Preparing if order.prep_start_time.is_none() => Some(now),
        _ => None,
    };
    let set_prep_end = if closes_prep_window(to) && order.prep_end_time.is_none() {
        Some(now)
    } else {
        None
    };

    Ok(TransitionPlan {
        from: order.status,
        to,
        set_prep_start,
        set_prep_end,
    })
}

/// Resolve a caller patch into the patch actually sent to the API
///
/// Runs the status change through the validator, fills in the implied
/// timestamps and drops no-op timestamp writes. Rejects overwrites, an end
/// before the start, and an explicit end on an order that never started or
/// stays open. Nothing here touches the order itself.
pub fn plan_update(
    order: &KdsOrder,
    patch: &OrderPatch,
    now: DateTime<Utc>,
) -> Result<OrderPatch, ValidationError> {
    if patch.is_empty() {
        return Err(ValidationError::EmptyPatch);
    }

    let mut resolved = patch.clone();

    if let Some(to) = patch.status {
        let plan = plan_transition(order, to, now)?;
        resolved.prep_start_time = resolved.prep_start_time.or(plan.set_prep_start);
        resolved.prep_end_time = resolved.prep_end_time.or(plan.set_prep_end);
    }

    resolved.prep_start_time =
        write_once("prepStartTime", order.prep_start_time, resolved.prep_start_time)?;
    resolved.prep_end_time = write_once("prepEndTime", order.prep_end_time, resolved.prep_end_time)?;

    let start = order.prep_start_time.or(resolved.prep_start_time);

    // A caller-supplied end only closes a window that was opened.
    if patch.prep_end_time.is_some() && resolved.prep_end_time.is_some() {
        let status = patch.status.unwrap_or(order.status);
        if !closes_prep_window(status) {
            return Err(ValidationError::PrepWindowOpen(status));
        }
        if start.is_none() {
            return Err(ValidationError::PrepNotStarted);
        }
    }

    let end = order.prep_end_time.or(resolved.prep_end_time);
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(ValidationError::TimestampOrder { start, end });
        }
    }

    Ok(resolved)
}

fn closes_prep_window(status: OrderStatus) -> bool {
    matches!(
        status,
        OrderStatus::Ready | OrderStatus::Served | OrderStatus::Cancelled
    )
}

fn write_once(
    field: &'static str,
    current: Option<DateTime<Utc>>,
    requested: Option<DateTime<Utc>>,
) -> Result<Option<DateTime<Utc>>, ValidationError> {
    match (current, requested) {
        (Some(current), Some(requested)) if current == requested => Ok(None),
        (Some(_), Some(_)) => Err(ValidationError::TimestampAlreadySet(field)),
        (_, requested) => Ok(requested),
    }
}
