//! Performance reporting
//!
//! Raw aggregates come from the remote API. The reporter only normalizes
//! them (merging duplicate station rows, scrubbing non-finite values) and
//! derives display figures with the same rounding policy as `timing`.

use crate::api::KdsApi;
use crate::error::{KdsError, RemoteOperation};
use crate::timing::floor_for_display;
use crate::types::{BusinessId, DateRange, Station};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Aggregate statistics for a date range, as returned by the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSnapshot {
    pub total_orders: u64,
    pub completed_orders: u64,
    #[serde(default)]
    pub average_prep_time_minutes: f64,
    #[serde(default)]
    pub orders_per_hour: f64,
    #[serde(default)]
    pub station_performance: Vec<StationPerformance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationPerformance {
    pub station: Station,
    pub orders_count: u64,
    #[serde(default)]
    pub average_prep_time_minutes: f64,
}

/// Normalized snapshot plus derived display figures
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub range: DateRange,
    pub snapshot: PerformanceSnapshot,
    /// completed / total, 0 when there were no orders
    pub completion_rate: f64,
    /// Floored percentage for display
    pub completion_percent: u64,
    /// Floored minutes for display
    pub average_prep_display_minutes: u64,
}

impl PerformanceReport {
    /// Normalize a raw snapshot and derive its ratios
    #[must_use]
    pub fn from_snapshot(range: DateRange, raw: PerformanceSnapshot) -> Self {
        let snapshot = normalize(raw);
        let completion_rate = if snapshot.total_orders == 0 {
            0.0
        } else {
            (snapshot.completed_orders.min(snapshot.total_orders)) as f64
                / snapshot.total_orders as f64
        };

        Self {
            range,
            completion_percent: floor_for_display(completion_rate * 100.0),
            average_prep_display_minutes: floor_for_display(snapshot.average_prep_time_minutes),
            completion_rate,
            snapshot,
        }
    }

    /// Per-station rows with floored minutes, for display
    pub fn station_rows(&self) -> impl Iterator<Item = (&Station, u64, u64)> + '_ {
        self.snapshot.station_performance.iter().map(|row| {
            (
                &row.station,
                row.orders_count,
                floor_for_display(row.average_prep_time_minutes),
            )
        })
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        0.0
    }
}

/// Scrub non-finite numbers and merge duplicate station rows
///
/// Duplicates are merged with an order-count weighted average, keeping the
/// first-seen position.
fn normalize(raw: PerformanceSnapshot) -> PerformanceSnapshot {
    let mut merged: Vec<StationPerformance> = Vec::with_capacity(raw.station_performance.len());

    for row in raw.station_performance {
        let avg = finite_or_zero(row.average_prep_time_minutes);
        match merged.iter_mut().find(|m| m.station == row.station) {
            Some(existing) => {
                let total = existing.orders_count + row.orders_count;
                if total > 0 {
                    existing.average_prep_time_minutes = (existing.average_prep_time_minutes
                        * existing.orders_count as f64
                        + avg * row.orders_count as f64)
                        / total as f64;
                }
                existing.orders_count = total;
            }
            None => merged.push(StationPerformance {
                station: row.station,
                orders_count: row.orders_count,
                average_prep_time_minutes: avg,
            }),
        }
    }

    let empty = raw.total_orders == 0;
    PerformanceSnapshot {
        total_orders: raw.total_orders,
        completed_orders: raw.completed_orders.min(raw.total_orders),
        average_prep_time_minutes: if empty {
            0.0
        } else {
            finite_or_zero(raw.average_prep_time_minutes)
        },
        orders_per_hour: if empty {
            0.0
        } else {
            finite_or_zero(raw.orders_per_hour)
        },
        station_performance: merged,
    }
}

/// Fetches and formats performance snapshots
#[derive(Clone)]
pub struct PerformanceReporter {
    api: Arc<dyn KdsApi>,
}

impl std::fmt::Debug for PerformanceReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceReporter").finish_non_exhaustive()
    }
}

impl PerformanceReporter {
    #[inline]
    #[must_use]
    pub fn new(api: Arc<dyn KdsApi>) -> Self {
        Self { api }
    }

    /// Fetch a report for `[start, end)`
    ///
    /// # Errors
    /// - `Validation` if `end` precedes `start` (no request is made)
    /// - `Remote` if the API call fails; the same range can be retried
    pub async fn fetch_performance(
        &self,
        business_id: &BusinessId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PerformanceReport, KdsError> {
        let range = DateRange::new(start, end)?;
        self.fetch_range(business_id, range).await
    }

    pub async fn fetch_range(
        &self,
        business_id: &BusinessId,
        range: DateRange,
    ) -> Result<PerformanceReport, KdsError> {
        let raw = self
            .api
            .fetch_performance(business_id, &range)
            .await
            .map_err(|e| {
                tracing::warn!(business_id = %business_id, error = %e, "performance fetch failed");
                KdsError::remote(RemoteOperation::FetchPerformance, e)
            })?;

        let report = PerformanceReport::from_snapshot(range, raw);
        tracing::debug!(
            business_id = %business_id,
            total = report.snapshot.total_orders,
            completion_percent = report.completion_percent,
            "performance report ready"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, MockKdsApi};
    use chrono::{Duration, TimeZone};

    fn range() -> DateRange {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        DateRange::new(start, start + Duration::days(1)).unwrap()
    }

    fn row(station: Station, count: u64, avg: f64) -> StationPerformance {
        StationPerformance {
            station,
            orders_count: count,
            average_prep_time_minutes: avg,
        }
    }

    #[test]
    fn zero_orders_report_zero_ratios() {
        let raw = PerformanceSnapshot {
            average_prep_time_minutes: f64::NAN,
            orders_per_hour: f64::INFINITY,
            ..PerformanceSnapshot::default()
        };
        let report = PerformanceReport::from_snapshot(range(), raw);
        assert_eq!(report.completion_rate, 0.0);
        assert_eq!(report.completion_percent, 0);
        assert_eq!(report.snapshot.average_prep_time_minutes, 0.0);
        assert_eq!(report.snapshot.orders_per_hour, 0.0);
    }

    #[test]
    fn percentages_are_floored() {
        let raw = PerformanceSnapshot {
            total_orders: 3,
            completed_orders: 2,
            average_prep_time_minutes: 9.99,
            orders_per_hour: 1.5,
            station_performance: Vec::new(),
        };
        let report = PerformanceReport::from_snapshot(range(), raw);
        assert_eq!(report.completion_percent, 66);
        assert_eq!(report.average_prep_display_minutes, 9);
    }

    #[test]
    fn duplicate_station_rows_are_merged() {
        let raw = PerformanceSnapshot {
            total_orders: 4,
            completed_orders: 4,
            average_prep_time_minutes: 8.0,
            orders_per_hour: 1.0,
            station_performance: vec![
                row(Station::Grill, 1, 4.0),
                row(Station::Pizza, 1, 10.0),
                row(Station::Grill, 3, 8.0),
            ],
        };
        let report = PerformanceReport::from_snapshot(range(), raw);
        let rows = &report.snapshot.station_performance;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].station, Station::Grill);
        assert_eq!(rows[0].orders_count, 4);
        assert!((rows[0].average_prep_time_minutes - 7.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn inverted_range_never_reaches_api() {
        let mut api = MockKdsApi::new();
        api.expect_fetch_performance().never();
        let reporter = PerformanceReporter::new(Arc::new(api));

        let r = range();
        let result = reporter
            .fetch_performance(&BusinessId::new("biz").unwrap(), r.end, r.start)
            .await;
        assert!(matches!(result, Err(KdsError::Validation(_))));
    }

    #[tokio::test]
    async fn remote_failure_is_reported() {
        let mut api = MockKdsApi::new();
        api.expect_fetch_performance()
            .times(1)
            .returning(|_, _| Err(ApiError::Unavailable("down".to_string())));
        let reporter = PerformanceReporter::new(Arc::new(api));

        let r = range();
        let err = reporter
            .fetch_performance(&BusinessId::new("biz").unwrap(), r.start, r.end)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            KdsError::Remote {
                operation: RemoteOperation::FetchPerformance,
                ..
            }
        ));
        assert!(err.is_retryable());
    }
}
