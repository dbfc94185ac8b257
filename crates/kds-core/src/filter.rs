//! Read-side projections over a set of orders
//!
//! Nothing here mutates; every function takes borrowed orders and returns a view.

use crate::error::ValidationError;
use crate::order::KdsOrder;
use crate::state_machine::OrderStatus;
use crate::types::Station;
use serde::ser::SerializeMap;
use serde::Serialize;

/// Keyword that matches every value of a filter dimension
pub const ALL: &str = "all";

/// Distinct stations present, in first-seen order
#[must_use]
pub fn stations_in_use<'a>(orders: impl IntoIterator<Item = &'a KdsOrder>) -> Vec<Station> {
    let mut stations: Vec<Station> = Vec::new();
    for order in orders {
        if !stations.contains(&order.station) {
            stations.push(order.station.clone());
        }
    }
    stations
}

/// Per-status counts; always carries all five statuses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    counts: [usize; 5],
}

impl StatusCounts {
    #[must_use]
    pub fn get(&self, status: OrderStatus) -> usize {
        self.counts[slot(status)]
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// `(status, count)` pairs in lifecycle order
    pub fn iter(&self) -> impl Iterator<Item = (OrderStatus, usize)> + '_ {
        OrderStatus::ALL.into_iter().map(|status| (status, self.get(status)))
    }
}

impl Serialize for StatusCounts {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(OrderStatus::ALL.len()))?;
        for (status, count) in self.iter() {
            map.serialize_entry(status.as_str(), &count)?;
        }
        map.end()
    }
}

fn slot(status: OrderStatus) -> usize {
    match status {
        OrderStatus::Pending => 0,
        OrderStatus::Preparing => 1,
        OrderStatus::Ready => 2,
        OrderStatus::Served => 3,
        OrderStatus::Cancelled => 4,
    }
}

#[must_use]
pub fn counts_by_status(orders: &[KdsOrder]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for order in orders {
        counts.counts[slot(order.status)] += 1;
    }
    counts
}

/// Station/status predicate; `None` on a dimension matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub station: Option<Station>,
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_station(mut self, station: Station) -> Self {
        self.station = Some(station);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Build from presentation selections, where `"all"` or blank means no
    /// constraint
    pub fn from_selection(station: Option<&str>, status: Option<&str>) -> Result<Self, ValidationError> {
        let station = match station.map(str::trim) {
            None | Some("") => None,
            Some(s) if s.eq_ignore_ascii_case(ALL) => None,
            Some(s) => Some(s.parse::<Station>()?),
        };
        let status = match status.map(str::trim) {
            None | Some("") => None,
            Some(s) if s.eq_ignore_ascii_case(ALL) => None,
            Some(s) => Some(s.parse::<OrderStatus>()?),
        };
        Ok(Self { station, status })
    }

    #[must_use]
    pub fn matches(&self, order: &KdsOrder) -> bool {
        self.station.as_ref().map_or(true, |s| *s == order.station)
            && self.status.map_or(true, |s| s == order.status)
    }
}

/// Orders matching both dimensions, order of appearance preserved
#[must_use]
pub fn filter<'a>(orders: &'a [KdsOrder], filter: &OrderFilter) -> Vec<&'a KdsOrder> {
    orders.iter().filter(|o| filter.matches(o)).collect()
}
