//! Dashboard metrics aggregator
//!
//! Counters are derived state, mutated through named operations and re-read
//! from storage on every call. Each mutation produces exactly one activity
//! item describing the new value. The pairing lives inside `record_change`,
//! so call sites cannot forget it, and the activity append runs even when the
//! metrics save fails (the two writes are independent best-effort operations,
//! not a transaction).

use std::sync::Arc;

use crate::services::activity::ActivityLog;
use crate::storage::PersistenceAdapter;
use crate::types::{DashboardMetrics, Metric};
use crate::util;

const COLLECTION: &str = "dashboard_metrics";

/// A named mutation to one counter.
#[derive(Debug, Clone, Copy)]
pub enum MetricChange {
    /// Add a (possibly negative) delta.
    Add(f64),
    /// Overwrite with a value.
    Set(f64),
}

pub struct MetricsService {
    adapter: Arc<PersistenceAdapter>,
    activity: Arc<ActivityLog>,
}

impl MetricsService {
    pub fn new(adapter: Arc<PersistenceAdapter>, activity: Arc<ActivityLog>) -> Self {
        Self { adapter, activity }
    }

    /// Current metrics, defaulting all counters to zero when absent.
    pub async fn get(&self, owner: &str) -> DashboardMetrics {
        self.adapter
            .get(COLLECTION, owner)
            .await
            .unwrap_or_default()
    }

    pub async fn increment(&self, owner: &str, metric: Metric) -> DashboardMetrics {
        self.record_change(owner, metric, MetricChange::Add(1.0)).await
    }

    pub async fn decrement(&self, owner: &str, metric: Metric) -> DashboardMetrics {
        self.record_change(owner, metric, MetricChange::Add(-1.0)).await
    }

    pub async fn set_value(&self, owner: &str, metric: Metric, value: f64) -> DashboardMetrics {
        self.record_change(owner, metric, MetricChange::Set(value)).await
    }

    /// Apply one mutation: read-default, apply, stamp, persist best-effort,
    /// then append the describing activity item unconditionally.
    pub async fn record_change(
        &self,
        owner: &str,
        metric: Metric,
        change: MetricChange,
    ) -> DashboardMetrics {
        let mut metrics = self.get(owner).await;
        apply_change(&mut metrics, metric, change);
        metrics.last_updated = util::now();

        let saved = self.adapter.save(COLLECTION, &metrics, owner).await;
        if !saved {
            log::warn!(
                "Metrics save failed for owner {}; activity record still written",
                owner
            );
        }

        let message = describe_change(&metrics, metric, change);
        self.activity
            .record(metric.activity_type(), message, owner)
            .await;

        metrics
    }
}

fn apply_change(metrics: &mut DashboardMetrics, metric: Metric, change: MetricChange) {
    match metric {
        Metric::BrandScore => {
            metrics.brand_score = match change {
                MetricChange::Add(delta) => metrics.brand_score + delta,
                MetricChange::Set(value) => value,
            };
        }
        _ => {
            let counter = int_counter_mut(metrics, metric);
            *counter = match change {
                MetricChange::Add(delta) => *counter + delta.round() as i64,
                MetricChange::Set(value) => value.round() as i64,
            };
        }
    }
}

fn int_counter_mut(metrics: &mut DashboardMetrics, metric: Metric) -> &mut i64 {
    match metric {
        Metric::StoriesAnalyzed => &mut metrics.stories_analyzed,
        Metric::BrandTestsActive => &mut metrics.brand_tests_active,
        Metric::ContentItems => &mut metrics.content_items,
        Metric::BrandScore => unreachable!("brand score is float-valued"),
    }
}

fn describe_change(metrics: &DashboardMetrics, metric: Metric, change: MetricChange) -> String {
    let value = match metric {
        Metric::BrandScore => format!("{:.0}%", metrics.brand_score),
        Metric::StoriesAnalyzed => metrics.stories_analyzed.to_string(),
        Metric::BrandTestsActive => metrics.brand_tests_active.to_string(),
        Metric::ContentItems => metrics.content_items.to_string(),
    };

    let verb = match change {
        MetricChange::Add(delta) if delta > 0.0 => "increased to",
        MetricChange::Add(delta) if delta < 0.0 => "decreased to",
        MetricChange::Add(_) => "unchanged at",
        MetricChange::Set(_) => "set to",
    };

    format!("{} {} {}", metric.display_name(), verb, value)
}
