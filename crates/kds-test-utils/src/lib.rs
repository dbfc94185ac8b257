//! Testing utilities for the KDS workspace
//!
//! Shared fixtures plus `InMemoryKdsApi`, an in-process stand-in for the
//! remote order service.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use kds_core::timing::summarize;
use kds_core::{
    ApiError, BusinessId, DateRange, KdsApi, KdsOrder, NewOrderRequest, OrderDraft, OrderItem,
    OrderPatch, OrderRecordId, OrderStatus, PerformanceSnapshot, Priority, Station,
};
use parking_lot::Mutex;

/// Calls received per endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub create: usize,
    pub update: usize,
    pub list: usize,
    pub performance: usize,
}

#[derive(Debug, Default)]
struct FakeState {
    orders: Vec<KdsOrder>,
    next_id: u64,
    fail_next: usize,
    performance_down: bool,
    calls: CallCounts,
    clock: Option<DateTime<Utc>>,
}

impl FakeState {
    fn now(&self) -> DateTime<Utc> {
        self.clock.unwrap_or_else(Utc::now)
    }

    fn take_failure(&mut self) -> Result<(), ApiError> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(ApiError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

/// In-memory fake of the remote KDS API
///
/// Assigns ids `ord-1`, `ord-2`, ..., stamps `createdAt`/`updatedAt` from
/// its clock (wall clock unless pinned), applies patches as given and
/// computes performance with `timing::summarize`.
#[derive(Debug, Default)]
pub struct InMemoryKdsApi {
    state: Mutex<FakeState>,
}

impl InMemoryKdsApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the server clock
    #[must_use]
    pub fn with_clock(self, at: DateTime<Utc>) -> Self {
        self.state.lock().clock = Some(at);
        self
    }

    pub fn set_clock(&self, at: DateTime<Utc>) {
        self.state.lock().clock = Some(at);
    }

    /// Move a pinned clock forward; pins it at now + `by` otherwise
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock();
        let now = state.now();
        state.clock = Some(now + by);
    }

    /// Fail the next `n` calls with a transient `Unavailable` error
    pub fn fail_next(&self, n: usize) {
        self.state.lock().fail_next = n;
    }

    /// Make `fetch_performance` fail until cleared; other endpoints keep working
    pub fn set_performance_outage(&self, down: bool) {
        self.state.lock().performance_down = down;
    }

    #[must_use]
    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls
    }

    /// Server-side copy of every order, all businesses
    #[must_use]
    pub fn orders(&self) -> Vec<KdsOrder> {
        self.state.lock().orders.clone()
    }

    /// Insert an order directly, bypassing the create endpoint
    pub fn seed(&self, order: KdsOrder) {
        self.state.lock().orders.push(order);
    }
}

#[async_trait]
impl KdsApi for InMemoryKdsApi {
    async fn create_order(&self, request: &NewOrderRequest) -> Result<KdsOrder, ApiError> {
        let mut state = self.state.lock();
        state.calls.create += 1;
        state.take_failure()?;

        state.next_id += 1;
        let id = OrderRecordId::new(format!("ord-{}", state.next_id));
        let order = KdsOrder::from_request(id, request.clone(), state.now());
        state.orders.push(order.clone());
        Ok(order)
    }

    async fn update_order(
        &self,
        id: &OrderRecordId,
        patch: &OrderPatch,
    ) -> Result<KdsOrder, ApiError> {
        let mut state = self.state.lock();
        state.calls.update += 1;
        state.take_failure()?;

        let now = state.now();
        let order = state
            .orders
            .iter_mut()
            .find(|o| &o.id == id)
            .ok_or_else(|| ApiError::Status {
                status: 404,
                body: format!("order {id} not found"),
            })?;
        order.apply(patch, now);
        Ok(order.clone())
    }

    async fn list_orders(&self, business_id: &BusinessId) -> Result<Vec<KdsOrder>, ApiError> {
        let mut state = self.state.lock();
        state.calls.list += 1;
        state.take_failure()?;

        Ok(state
            .orders
            .iter()
            .filter(|o| &o.business_id == business_id)
            .cloned()
            .collect())
    }

    async fn fetch_performance(
        &self,
        business_id: &BusinessId,
        range: &DateRange,
    ) -> Result<PerformanceSnapshot, ApiError> {
        let mut state = self.state.lock();
        state.calls.performance += 1;
        state.take_failure()?;
        if state.performance_down {
            return Err(ApiError::Unavailable("performance service down".to_string()));
        }

        let orders: Vec<KdsOrder> = state
            .orders
            .iter()
            .filter(|o| &o.business_id == business_id)
            .cloned()
            .collect();
        Ok(summarize(&orders, range))
    }
}

// Fixtures

/// Fixed reference instant, 2024-05-01 12:00 UTC
#[must_use]
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

#[must_use]
pub fn business() -> BusinessId {
    BusinessId::new("bistro-42").unwrap()
}

#[must_use]
pub fn item(name: &str, quantity: u32) -> OrderItem {
    let menu_id = format!("m-{}", name.to_lowercase().replace(' ', "-"));
    OrderItem::new(menu_id, name, quantity).unwrap()
}

/// Grill order for two burgers at priority 2
#[must_use]
pub fn burger_draft() -> OrderDraft {
    OrderDraft::new(
        Station::Grill,
        vec![OrderItem::new("m1", "Burger", 2).unwrap()],
    )
    .with_priority(Priority::NORMAL)
}

#[must_use]
pub fn draft_for(station: Station) -> OrderDraft {
    OrderDraft::new(station, vec![item("Special", 1)])
}

/// Persisted order in `status`, created at `created_at`
#[must_use]
pub fn order_with_status(
    id: &str,
    station: Station,
    status: OrderStatus,
    created_at: DateTime<Utc>,
) -> KdsOrder {
    let request = draft_for(station).into_request(business()).unwrap();
    let mut order = KdsOrder::from_request(OrderRecordId::new(id), request, created_at);
    order.status = status;
    if status != OrderStatus::Pending {
        order.prep_start_time = Some(created_at);
    }
    if matches!(
        status,
        OrderStatus::Ready | OrderStatus::Served | OrderStatus::Cancelled
    ) {
        order.prep_end_time = Some(created_at + Duration::minutes(10));
    }
    order
}
