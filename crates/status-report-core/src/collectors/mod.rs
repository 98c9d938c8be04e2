// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-service metric collectors.
//!
//! Every collector is a fixed table of [`MetricSpec`] rows run through
//! [`collect_metrics`]. What differs between services is the namespace, the
//! dimensions, how multiple datapoints are reduced and what a failed query
//! does to the rest of the table.

pub mod agent;
pub mod cdn;
pub mod compute;
pub mod database;
pub mod firewall;
pub mod load_balancer;
pub mod logs;
pub mod relational;
pub mod storage;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::backend::{Datapoint, Dimension, MetricsBackend, Statistic, StatisticsQuery};
use crate::error::CollectError;
use crate::metrics::{Conversion, MetricSet};
use crate::window::TimeWindow;

/// One row of a collector table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSpec {
    /// Key stored in the [`MetricSet`].
    pub key: &'static str,
    /// CloudWatch metric name.
    pub name: &'static str,
    pub statistic: Statistic,
    pub unit: Option<&'static str>,
    pub conversion: Conversion,
}

impl MetricSpec {
    pub const fn new(key: &'static str, name: &'static str, statistic: Statistic) -> Self {
        Self {
            key,
            name,
            statistic,
            unit: None,
            conversion: Conversion::None,
        }
    }

    pub const fn unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }

    pub const fn convert(mut self, conversion: Conversion) -> Self {
        self.conversion = conversion;
        self
    }
}

/// How several datapoints in the window collapse into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// The datapoint with the latest timestamp.
    Latest,
    /// Sums add up, averages are averaged, maxima take the largest.
    AcrossWindow,
}

/// What a failed query does to the rest of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Fail the whole collector.
    Abort,
    /// Log and leave the metric out of the set.
    SkipMetric,
    /// Log and record the metric as zero.
    RecordZero,
}

/// Where and over which range a table is queried.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTarget {
    pub namespace: &'static str,
    pub dimensions: Vec<Dimension>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub period: i32,
    pub reduction: Reduction,
}

impl QueryTarget {
    /// Target covering the cycle window at its regular period, latest datapoint wins.
    pub fn for_window(
        namespace: &'static str,
        dimensions: Vec<Dimension>,
        window: &TimeWindow,
    ) -> Self {
        Self {
            namespace,
            dimensions,
            start: window.start_utc(),
            end: window.end_utc(),
            period: window.period_secs(),
            reduction: Reduction::Latest,
        }
    }

    pub fn reduce_with(mut self, reduction: Reduction) -> Self {
        self.reduction = reduction;
        self
    }

    fn statistics_query(&self, spec: &MetricSpec) -> StatisticsQuery {
        StatisticsQuery {
            namespace: self.namespace,
            metric_name: spec.name,
            dimensions: self.dimensions.clone(),
            start: self.start,
            end: self.end,
            period: self.period,
            statistic: spec.statistic,
            unit: spec.unit,
        }
    }
}

/// Queries one metric and returns its converted value, 0.0 when there is no data.
pub async fn query_metric(
    backend: &dyn MetricsBackend,
    target: &QueryTarget,
    spec: &MetricSpec,
) -> Result<f64, CollectError> {
    let value = query_datapoints(backend, target, spec).await?;
    if value.is_none() {
        debug!(
            "No datapoints for {}/{} ({}), defaulting to 0",
            target.namespace,
            spec.name,
            spec.statistic.as_str()
        );
    }
    Ok(value.unwrap_or_default())
}

/// Like [`query_metric`] but keeps "no datapoints" apart from a published zero.
pub async fn query_datapoints(
    backend: &dyn MetricsBackend,
    target: &QueryTarget,
    spec: &MetricSpec,
) -> Result<Option<f64>, CollectError> {
    let query = target.statistics_query(spec);
    let datapoints =
        backend
            .get_metric_statistics(&query)
            .await
            .map_err(|source| CollectError::Query {
                metric: spec.name.to_string(),
                statistic: spec.statistic.as_str(),
                period: target.period,
                source,
            })?;

    let raw = reduce(&datapoints, spec.statistic, target.reduction);
    Ok(raw.map(|value| spec.conversion.apply(value)))
}

/// Runs every row of `specs` against `target`, inserting the results into `set`.
pub async fn collect_metrics(
    backend: &dyn MetricsBackend,
    target: &QueryTarget,
    specs: &[MetricSpec],
    policy: FailurePolicy,
    set: &mut MetricSet,
) -> Result<(), CollectError> {
    for spec in specs {
        match query_metric(backend, target, spec).await {
            Ok(value) => set.insert(spec.key, value),
            Err(e) => match policy {
                FailurePolicy::Abort => return Err(e),
                FailurePolicy::SkipMetric => {
                    warn!("Skipping {}: {e}", spec.key);
                }
                FailurePolicy::RecordZero => {
                    warn!("Recording 0 for {}: {e}", spec.key);
                    set.insert(spec.key, 0.0);
                }
            },
        }
    }
    Ok(())
}

fn reduce(datapoints: &[Datapoint], statistic: Statistic, reduction: Reduction) -> Option<f64> {
    match reduction {
        Reduction::Latest => datapoints
            .iter()
            .max_by_key(|d| d.timestamp)
            .and_then(|d| statistic.pick(d)),
        Reduction::AcrossWindow => {
            let values: Vec<f64> = datapoints.iter().filter_map(|d| statistic.pick(d)).collect();
            if values.is_empty() {
                return None;
            }
            let total: f64 = values.iter().sum();
            match statistic {
                Statistic::Sum => Some(total),
                Statistic::Average => Some(total / values.len() as f64),
                Statistic::Maximum => values.into_iter().reduce(f64::max),
            }
        }
    }
}
