// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Remote capabilities the pipeline depends on.
//!
//! Collectors and the resolver only ever see these traits. The AWS SDK backed
//! implementations live in [`aws`] behind the `aws` feature.

#[cfg(feature = "aws")]
pub mod aws;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::FirewallScope;
use crate::error::BackendError;

/// Statistic requested from CloudWatch for a single metric query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    Average,
    Maximum,
    Sum,
}

impl Statistic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::Average => "Average",
            Statistic::Maximum => "Maximum",
            Statistic::Sum => "Sum",
        }
    }

    /// Value of this statistic carried by a datapoint, if CloudWatch returned it.
    pub fn pick(&self, datapoint: &Datapoint) -> Option<f64> {
        match self {
            Statistic::Average => datapoint.average,
            Statistic::Maximum => datapoint.maximum,
            Statistic::Sum => datapoint.sum,
        }
    }
}

/// A name/value qualifier scoping a metric to one resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Dimension filter for `ListMetrics`; a missing value matches any value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionFilter {
    pub name: String,
    pub value: Option<String>,
}

impl DimensionFilter {
    pub fn equals(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Datapoint {
    pub timestamp: DateTime<Utc>,
    pub average: Option<f64>,
    pub sum: Option<f64>,
    pub maximum: Option<f64>,
}

/// One `GetMetricStatistics` call.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsQuery {
    pub namespace: &'static str,
    pub metric_name: &'static str,
    pub dimensions: Vec<Dimension>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Granularity in seconds.
    pub period: i32,
    pub statistic: Statistic,
    pub unit: Option<&'static str>,
}

impl StatisticsQuery {
    pub fn dimension(&self, name: &str) -> Option<&str> {
        self.dimensions
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListMetricsFilter {
    pub namespace: &'static str,
    pub metric_name: Option<&'static str>,
    pub dimensions: Vec<DimensionFilter>,
}

/// A published metric series, identified by its dimension tuple.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetricSeries {
    pub dimensions: Vec<Dimension>,
}

impl MetricSeries {
    pub fn new(dimensions: Vec<Dimension>) -> Self {
        Self { dimensions }
    }

    pub fn dimension(&self, name: &str) -> Option<&str> {
        self.dimensions
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }
}

/// DynamoDB capacity model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingMode {
    Provisioned,
    OnDemand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDescription {
    pub billing_mode: BillingMode,
    /// Approximate, refreshed by DynamoDB roughly every six hours.
    pub item_count: u64,
}

/// A filtered search over one log group, bounds in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub log_group: String,
    pub filter_pattern: &'static str,
    pub start_millis: i64,
    pub end_millis: i64,
}

#[async_trait]
pub trait MetricsBackend: Send + Sync {
    /// Returns every datapoint CloudWatch has for the query; an empty vector is not an error.
    async fn get_metric_statistics(
        &self,
        query: &StatisticsQuery,
    ) -> Result<Vec<Datapoint>, BackendError>;

    /// Lists published series matching the filter, across all result pages.
    async fn list_metrics(
        &self,
        filter: &ListMetricsFilter,
    ) -> Result<Vec<MetricSeries>, BackendError>;
}

#[async_trait]
pub trait TableDescriber: Send + Sync {
    async fn describe_table(&self, table_name: &str) -> Result<TableDescription, BackendError>;
}

#[async_trait]
pub trait LogSearch: Send + Sync {
    /// Counts matching events across all result pages.
    async fn count_events(&self, query: &LogQuery) -> Result<u64, BackendError>;
}

#[async_trait]
pub trait FirewallDirectory: Send + Sync {
    /// ARNs of the application load balancers associated with the web ACL.
    ///
    /// The web ACL is always looked up; CloudFront scoped ACLs have no load
    /// balancer associations and yield an empty list.
    async fn associated_load_balancers(
        &self,
        web_acl_name: &str,
        web_acl_id: &str,
        scope: FirewallScope,
    ) -> Result<Vec<String>, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_statistic_picks_matching_value() {
        let datapoint = Datapoint {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
            average: Some(12.5),
            sum: Some(40.0),
            maximum: None,
        };
        assert_eq!(Statistic::Average.pick(&datapoint), Some(12.5));
        assert_eq!(Statistic::Sum.pick(&datapoint), Some(40.0));
        assert_eq!(Statistic::Maximum.pick(&datapoint), None);
    }

    #[test]
    fn test_series_dimension_lookup() {
        let series = MetricSeries::new(vec![
            Dimension::new("InstanceId", "i-1"),
            Dimension::new("device", "nvme0n1p1"),
        ]);
        assert_eq!(series.dimension("device"), Some("nvme0n1p1"));
        assert_eq!(series.dimension("fstype"), None);
    }
}
