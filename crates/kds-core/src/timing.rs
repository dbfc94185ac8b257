//! Timing and throughput metrics
//!
//! Internally everything stays in full-precision minutes (`f64`);
//! flooring to whole minutes happens only at display time so that
//! aggregates over many orders do not accumulate rounding error.

use crate::filter::stations_in_use;
use crate::order::KdsOrder;
use crate::performance::{PerformanceSnapshot, StationPerformance};
use crate::state_machine::OrderStatus;
use crate::types::DateRange;
use chrono::{DateTime, Utc};

/// Elapsed preparation time of one order
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrepDuration {
    /// Preparation has not begun
    NotStarted,
    /// Still being prepared; grows with the clock
    Running { minutes: f64 },
    /// Window closed; frozen value
    Finished { minutes: f64 },
}

impl PrepDuration {
    /// Full-precision minutes, `None` when not started
    #[must_use]
    pub fn exact_minutes(&self) -> Option<f64> {
        match *self {
            PrepDuration::NotStarted => None,
            PrepDuration::Running { minutes } | PrepDuration::Finished { minutes } => Some(minutes),
        }
    }

    /// Whole minutes for display
    #[must_use]
    pub fn display_minutes(&self) -> Option<u64> {
        self.exact_minutes().map(floor_for_display)
    }

    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, PrepDuration::Running { .. })
    }
}

/// Prep duration measured against the current clock
#[must_use]
pub fn prep_duration(order: &KdsOrder) -> PrepDuration {
    prep_duration_at(order, Utc::now())
}

/// Prep duration measured against `now`
#[must_use]
pub fn prep_duration_at(order: &KdsOrder, now: DateTime<Utc>) -> PrepDuration {
    let Some(start) = order.prep_start_time else {
        return PrepDuration::NotStarted;
    };
    match order.prep_end_time {
        Some(end) => PrepDuration::Finished {
            minutes: minutes_between(start, end),
        },
        None => PrepDuration::Running {
            minutes: minutes_between(start, now),
        },
    }
}

/// Served orders over all orders; 0 for an empty slice
#[must_use]
pub fn completion_rate(orders: &[KdsOrder]) -> f64 {
    if orders.is_empty() {
        return 0.0;
    }
    let served = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Served)
        .count();
    served as f64 / orders.len() as f64
}

/// Orders created inside `range` per hour; `None` for a zero-length range
#[must_use]
pub fn orders_per_hour(orders: &[KdsOrder], range: &DateRange) -> Option<f64> {
    let hours = range.hours();
    if hours <= 0.0 {
        return None;
    }
    let created = orders.iter().filter(|o| range.contains(o.created_at)).count();
    Some(created as f64 / hours)
}

/// Mean prep minutes over orders with a closed prep window
///
/// Cancelled orders are excluded: closing their window does not mean the
/// food was completed.
#[must_use]
pub fn average_prep_minutes<'a>(orders: impl IntoIterator<Item = &'a KdsOrder>) -> Option<f64> {
    let (sum, count) = orders
        .into_iter()
        .filter(|o| o.status != OrderStatus::Cancelled)
        .filter_map(|o| match (o.prep_start_time, o.prep_end_time) {
            (Some(start), Some(end)) => Some(minutes_between(start, end)),
            _ => None,
        })
        .fold((0.0, 0usize), |(sum, count), minutes| (sum + minutes, count + 1));

    (count > 0).then(|| sum / count as f64)
}

/// Local performance snapshot over orders created inside `range`
///
/// Mirrors what the remote `/performance` endpoint reports, so local and
/// remote figures follow the same conventions.
#[must_use]
pub fn summarize(orders: &[KdsOrder], range: &DateRange) -> PerformanceSnapshot {
    let in_range: Vec<&KdsOrder> = orders
        .iter()
        .filter(|o| range.contains(o.created_at))
        .collect();

    let completed_orders = in_range
        .iter()
        .filter(|o| o.status == OrderStatus::Served)
        .count() as u64;

    let station_performance = stations_in_use(in_range.iter().copied())
        .into_iter()
        .map(|station| {
            let at_station: Vec<&KdsOrder> = in_range
                .iter()
                .copied()
                .filter(|o| o.station == station)
                .collect();
            StationPerformance {
                orders_count: at_station.len() as u64,
                average_prep_time_minutes: average_prep_minutes(at_station).unwrap_or(0.0),
                station,
            }
        })
        .collect();

    let hours = range.hours();
    PerformanceSnapshot {
        total_orders: in_range.len() as u64,
        completed_orders,
        average_prep_time_minutes: average_prep_minutes(in_range.iter().copied()).unwrap_or(0.0),
        orders_per_hour: if hours > 0.0 {
            in_range.len() as f64 / hours
        } else {
            0.0
        },
        station_performance,
    }
}

/// Floor a full-precision figure for display; negatives and NaN clamp to 0
#[must_use]
pub fn floor_for_display(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.floor() as u64
    } else {
        0
    }
}

fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let millis = (end - start).num_milliseconds().max(0);
    millis as f64 / 60_000.0
}
