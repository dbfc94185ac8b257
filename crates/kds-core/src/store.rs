//! Order Store
//!
//! In-memory set of orders for one business, reconciled with the remote
//! API. Every mutation is API-first: the local set only changes after
//! the remote call succeeded, and always by replacing whole entries under
//! a short write lock, so readers never see a torn order. The lock is
//! never held across an `.await`.
//!
//! Concurrent updates to the same order are not serialized here; the last
//! write to reach the API wins.

use crate::api::{ApiError, KdsApi};
use crate::error::{KdsError, KdsResult, RemoteOperation};
use crate::filter::{self, OrderFilter, StatusCounts};
use crate::history::{TransitionJournal, TransitionRecord};
use crate::order::{plan_update, KdsOrder, OrderDraft, OrderPatch};
use crate::performance::{PerformanceReport, PerformanceReporter};
use crate::state_machine::{allowed_transitions, OrderStatus};
use crate::types::{BusinessId, DateRange, OrderRecordId, Station};
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
struct StoreState {
    orders: Vec<KdsOrder>,
    performance: Option<PerformanceReport>,
}

impl StoreState {
    /// Replace the entry with the same id, or append
    fn upsert(&mut self, order: KdsOrder) {
        match self.orders.iter_mut().find(|o| o.id == order.id) {
            Some(existing) => *existing = order,
            None => self.orders.push(order),
        }
    }
}

/// Single source of truth for the orders of one business
pub struct OrderStore {
    business_id: BusinessId,
    api: Arc<dyn KdsApi>,
    reporter: PerformanceReporter,
    state: RwLock<StoreState>,
    journal: TransitionJournal,
}

impl std::fmt::Debug for OrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStore")
            .field("business_id", &self.business_id)
            .field("orders", &self.state.read().orders.len())
            .finish_non_exhaustive()
    }
}

impl OrderStore {
    /// Create an empty store bound to `business_id`
    #[must_use]
    pub fn new(business_id: BusinessId, api: Arc<dyn KdsApi>) -> Self {
        Self {
            business_id,
            reporter: PerformanceReporter::new(Arc::clone(&api)),
            api,
            state: RwLock::new(StoreState::default()),
            journal: TransitionJournal::default(),
        }
    }

    #[inline]
    pub fn business_id(&self) -> &BusinessId {
        &self.business_id
    }

    /// Validate a draft, persist it, and cache the persisted order
    ///
    /// # Errors
    /// - `Validation` for an empty item list or invalid items (no API call)
    /// - `Remote` if the API rejects or fails the request, or answers with
    ///   an order that is foreign or invalid
    pub async fn create_order(&self, draft: OrderDraft) -> KdsResult<KdsOrder> {
        let request = draft.into_request(self.business_id.clone()).map_err(|e| {
            tracing::warn!(business_id = %self.business_id, error = %e, "order draft rejected");
            e
        })?;

        let created = self
            .api
            .create_order(&request)
            .await
            .map_err(|e| self.remote_failure(RemoteOperation::CreateOrder, e))?;

        self.check_persisted(RemoteOperation::CreateOrder, &created)?;
        self.state.write().upsert(created.clone());
        tracing::info!(
            order_id = %created.id,
            token = %created.order_id,
            station = %created.station,
            items = created.items.len(),
            "order created"
        );
        Ok(created)
    }

    /// Apply a field-level update to a cached order
    ///
    /// Status changes go through the transition validator and pick up their
    /// implied prep timestamps before anything is sent. The order returned
    /// by the API replaces the cached one.
    ///
    /// # Errors
    /// - `NotFound` if `id` is not in the local set
    /// - `Validation` for illegal transitions or timestamp overwrites
    /// - `Remote` if the API call fails; the cached order is unchanged
    pub async fn update_order(&self, id: &OrderRecordId, patch: OrderPatch) -> KdsResult<KdsOrder> {
        let current = self.get(id).ok_or_else(|| {
            tracing::warn!(order_id = %id, "update for unknown order");
            KdsError::NotFound(id.clone())
        })?;

        let resolved = plan_update(&current, &patch, Utc::now()).map_err(|e| {
            tracing::warn!(
                order_id = %id,
                status = %current.status,
                error = %e,
                "update rejected"
            );
            e
        })?;

        let updated = self
            .api
            .update_order(id, &resolved)
            .await
            .map_err(|e| self.remote_failure(RemoteOperation::UpdateOrder, e))?;
        self.check_persisted(RemoteOperation::UpdateOrder, &updated)?;

        self.state.write().upsert(updated.clone());

        if updated.status != current.status {
            self.journal.record(TransitionRecord {
                order: updated.id.clone(),
                from: current.status,
                to: updated.status,
                at: updated.updated_at,
            });
        }

        tracing::info!(
            order_id = %updated.id,
            station = %updated.station,
            status = %updated.status,
            "order updated"
        );
        Ok(updated)
    }

    /// Shorthand for a status-only update
    pub async fn transition(&self, id: &OrderRecordId, to: OrderStatus) -> KdsResult<KdsOrder> {
        self.update_order(id, OrderPatch::status(to)).await
    }

    /// Shorthand for an assignment-only update
    pub async fn assign(&self, id: &OrderRecordId, assignee: impl Into<String>) -> KdsResult<KdsOrder> {
        self.update_order(id, OrderPatch::assign(assignee)).await
    }

    /// Re-fetch orders and the performance snapshot for `range`
    ///
    /// Both requests must succeed; the local state is then swapped in one
    /// step. On any failure the previous state is kept.
    pub async fn refresh_all(&self, range: DateRange) -> KdsResult<()> {
        let (orders, report) = tokio::join!(
            self.api.list_orders(&self.business_id),
            self.reporter.fetch_range(&self.business_id, range),
        );
        let orders = orders.map_err(|e| self.remote_failure(RemoteOperation::ListOrders, e))?;
        let report = report?;

        let orders = self.keep_usable(orders);
        let count = orders.len();
        *self.state.write() = StoreState {
            orders,
            performance: Some(report),
        };
        tracing::info!(business_id = %self.business_id, orders = count, "store refreshed");
        Ok(())
    }

    /// Re-fetch the orders only, keeping the last performance report
    ///
    /// On failure the previous orders are kept.
    pub async fn refresh_orders(&self) -> KdsResult<()> {
        let orders = self
            .api
            .list_orders(&self.business_id)
            .await
            .map_err(|e| self.remote_failure(RemoteOperation::ListOrders, e))?;

        let orders = self.keep_usable(orders);
        let count = orders.len();
        self.state.write().orders = orders;
        tracing::info!(business_id = %self.business_id, orders = count, "orders refreshed");
        Ok(())
    }

    /// Current local snapshot; never triggers a fetch
    #[must_use]
    pub fn list_orders(&self) -> Vec<KdsOrder> {
        self.state.read().orders.clone()
    }

    #[must_use]
    pub fn get(&self, id: &OrderRecordId) -> Option<KdsOrder> {
        self.state.read().orders.iter().find(|o| &o.id == id).cloned()
    }

    /// Statuses the order may move to next
    pub fn next_statuses(&self, id: &OrderRecordId) -> KdsResult<&'static [OrderStatus]> {
        let state = self.state.read();
        state
            .orders
            .iter()
            .find(|o| &o.id == id)
            .map(|o| allowed_transitions(o.status))
            .ok_or_else(|| KdsError::NotFound(id.clone()))
    }

    #[must_use]
    pub fn counts_by_status(&self) -> StatusCounts {
        filter::counts_by_status(&self.state.read().orders)
    }

    #[must_use]
    pub fn stations_in_use(&self) -> Vec<Station> {
        filter::stations_in_use(&self.state.read().orders)
    }

    /// Owned copies of the orders matching `by`, in store order
    #[must_use]
    pub fn filtered(&self, by: &OrderFilter) -> Vec<KdsOrder> {
        let state = self.state.read();
        filter::filter(&state.orders, by).into_iter().cloned().collect()
    }

    /// Performance report from the last successful refresh
    #[must_use]
    pub fn performance(&self) -> Option<PerformanceReport> {
        self.state.read().performance.clone()
    }

    pub fn reporter(&self) -> &PerformanceReporter {
        &self.reporter
    }

    pub fn journal(&self) -> &TransitionJournal {
        &self.journal
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().orders.is_empty()
    }

    /// Reject an order the API returned for another business or in a broken shape
    fn check_persisted(&self, operation: RemoteOperation, order: &KdsOrder) -> KdsResult<()> {
        if order.business_id != self.business_id {
            return Err(self.remote_failure(
                operation,
                ApiError::Decode(format!(
                    "order {} belongs to business {}",
                    order.id, order.business_id
                )),
            ));
        }
        order.validate().map_err(|e| {
            let reason = format!("order {} is invalid: {e}", order.id);
            self.remote_failure(operation, ApiError::Decode(reason))
        })
    }

    fn keep_usable(&self, orders: Vec<KdsOrder>) -> Vec<KdsOrder> {
        let fetched = orders.len();
        let (own, foreign): (Vec<KdsOrder>, Vec<KdsOrder>) = orders
            .into_iter()
            .partition(|o| o.business_id == self.business_id);
        if !foreign.is_empty() {
            tracing::warn!(
                business_id = %self.business_id,
                dropped = foreign.len(),
                "ignoring orders of other businesses"
            );
        }

        let usable: Vec<KdsOrder> = own
            .into_iter()
            .filter(|o| match o.validate() {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(order_id = %o.id, error = %e, "ignoring invalid order");
                    false
                }
            })
            .collect();
        tracing::debug!(fetched, kept = usable.len(), "orders screened");
        usable
    }

    fn remote_failure(&self, operation: RemoteOperation, error: ApiError) -> KdsError {
        tracing::warn!(
            business_id = %self.business_id,
            %operation,
            error = %error,
            "remote operation failed"
        );
        KdsError::remote(operation, error)
    }
}
