//! KDS Core - Kitchen Display System order lifecycle engine
//!
//! Tracks kitchen orders from creation to completion:
//! - Enforces the legal status graph (`state_machine`)
//! - Records prep timestamps exactly once (`order::plan_transition`)
//! - Derives prep durations, completion rate and throughput (`timing`)
//! - Keeps a per-business order cache reconciled with the remote API (`store`)
//! - Projects station lists, status counts and filtered views (`filter`)
//! - Formats remote performance snapshots (`performance`)
//!
//! # Example
//!
//! ```rust,ignore
//! use kds_core::prelude::*;
//!
//! # async fn example(api: std::sync::Arc<dyn KdsApi>) -> KdsResult<()> {
//! let store = OrderStore::new(BusinessId::new("bistro-42")?, api);
//!
//! let draft = OrderDraft::new(Station::Grill, vec![OrderItem::new("m1", "Burger", 2)?])
//!     .with_priority(Priority::NORMAL);
//! let order = store.create_order(draft).await?;
//!
//! store.transition(&order.id, OrderStatus::Preparing).await?;
//! println!("{:?}", store.counts_by_status());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod api;
pub mod config;
pub mod error;
pub mod filter;
pub mod history;
pub mod item;
pub mod order;
pub mod performance;
pub mod retry;
pub mod state_machine;
pub mod store;
pub mod timing;
pub mod types;

// Re-exports for convenience
pub use api::{ApiError, KdsApi};
pub use config::{ApiConfig, KdsConfig};
pub use error::{ConfigError, KdsError, KdsResult, RemoteOperation, ValidationError};
pub use filter::{counts_by_status, stations_in_use, OrderFilter, StatusCounts};
pub use history::{TransitionJournal, TransitionRecord};
pub use item::OrderItem;
pub use order::{
    plan_transition, plan_update, KdsOrder, NewOrderRequest, OrderDraft, OrderPatch,
    TransitionPlan,
};
pub use performance::{
    PerformanceReport, PerformanceReporter, PerformanceSnapshot, StationPerformance,
};
pub use retry::RetryPolicy;
pub use state_machine::{allowed_transitions, validate_transition, OrderStatus};
pub use store::OrderStore;
pub use timing::{completion_rate, orders_per_hour, prep_duration, prep_duration_at, PrepDuration};
pub use types::{BusinessId, DateRange, OrderRecordId, OrderToken, Priority, Station};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with KDS Core
    pub use crate::{
        BusinessId, KdsApi, KdsError, KdsOrder, KdsResult, OrderDraft, OrderFilter, OrderItem,
        OrderPatch, OrderRecordId, OrderStatus, OrderStore, Priority, Station,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
