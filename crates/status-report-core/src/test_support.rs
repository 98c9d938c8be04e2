// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory capabilities for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::backend::{
    BillingMode, Datapoint, Dimension, FirewallDirectory, ListMetricsFilter, LogQuery, LogSearch,
    MetricSeries, MetricsBackend, StatisticsQuery, TableDescriber, TableDescription,
};
use crate::config::FirewallScope;
use crate::coordinator::Clients;
use crate::delivery::Delivery;
use crate::error::{BackendError, DeliveryError};
use crate::window::TimeWindow;

/// Instant every test window ends at.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
}

/// A datapoint on the test day carrying `value` for every statistic.
pub fn datapoint(hour: u32, value: f64) -> Datapoint {
    Datapoint {
        timestamp: Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap(),
        average: Some(value),
        sum: Some(value),
        maximum: Some(value),
    }
}

pub fn routine_window(hours: u32) -> TimeWindow {
    TimeWindow::for_cycle(now(), Tz::UTC, hours, 23).unwrap()
}

pub fn daily_window() -> TimeWindow {
    TimeWindow::for_cycle(now(), Tz::UTC, 1, 10).unwrap()
}

struct PointRule {
    metric: &'static str,
    dimension: Option<Dimension>,
    response: Result<Vec<Datapoint>, String>,
}

impl PointRule {
    fn matches(&self, query: &StatisticsQuery) -> bool {
        query.metric_name == self.metric
            && self
                .dimension
                .as_ref()
                .map_or(true, |d| query.dimension(&d.name) == Some(d.value.as_str()))
    }
}

/// Metrics backend answering from canned rules; unmatched queries return no data.
#[derive(Default)]
pub struct FakeMetrics {
    rules: Vec<PointRule>,
    series: HashMap<&'static str, Vec<MetricSeries>>,
    fail_list: bool,
    queries: Mutex<Vec<StatisticsQuery>>,
    list_calls: Mutex<usize>,
}

impl FakeMetrics {
    pub fn with_points(mut self, metric: &'static str, points: Vec<Datapoint>) -> Self {
        self.rules.push(PointRule {
            metric,
            dimension: None,
            response: Ok(points),
        });
        self
    }

    /// Points returned only when the query carries `dimension`.
    pub fn with_dimension_points(
        mut self,
        metric: &'static str,
        dimension: Dimension,
        points: Vec<Datapoint>,
    ) -> Self {
        self.rules.push(PointRule {
            metric,
            dimension: Some(dimension),
            response: Ok(points),
        });
        self
    }

    pub fn failing_metric(mut self, metric: &'static str) -> Self {
        self.rules.push(PointRule {
            metric,
            dimension: None,
            response: Err(format!("{metric} unavailable")),
        });
        self
    }

    pub fn failing_dimension(mut self, metric: &'static str, dimension: Dimension) -> Self {
        self.rules.push(PointRule {
            metric,
            dimension: Some(dimension),
            response: Err(format!("{metric} unavailable")),
        });
        self
    }

    pub fn with_series(mut self, namespace: &'static str, series: Vec<MetricSeries>) -> Self {
        self.series.entry(namespace).or_default().extend(series);
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn queries(&self) -> Vec<StatisticsQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn queried(&self, metric: &str) -> bool {
        self.queries().iter().any(|q| q.metric_name == metric)
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }
}

#[async_trait]
impl MetricsBackend for FakeMetrics {
    async fn get_metric_statistics(
        &self,
        query: &StatisticsQuery,
    ) -> Result<Vec<Datapoint>, BackendError> {
        self.queries.lock().unwrap().push(query.clone());
        match self.rules.iter().find(|r| r.matches(query)) {
            Some(rule) => rule
                .response
                .clone()
                .map_err(|e| BackendError::new("GetMetricStatistics", e)),
            None => Ok(Vec::new()),
        }
    }

    async fn list_metrics(
        &self,
        filter: &ListMetricsFilter,
    ) -> Result<Vec<MetricSeries>, BackendError> {
        *self.list_calls.lock().unwrap() += 1;
        if self.fail_list {
            return Err(BackendError::new("ListMetrics", "access denied"));
        }
        Ok(self.series.get(filter.namespace).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeTables {
    tables: HashMap<String, TableDescription>,
}

impl FakeTables {
    pub fn with_table(mut self, name: &str, billing_mode: BillingMode, item_count: u64) -> Self {
        self.tables.insert(
            name.to_string(),
            TableDescription {
                billing_mode,
                item_count,
            },
        );
        self
    }
}

#[async_trait]
impl TableDescriber for FakeTables {
    async fn describe_table(&self, table_name: &str) -> Result<TableDescription, BackendError> {
        self.tables.get(table_name).copied().ok_or_else(|| {
            BackendError::new(
                "DescribeTable",
                format!("Requested resource not found: Table: {table_name} not found"),
            )
        })
    }
}

#[derive(Default)]
pub struct FakeLogs {
    counts: HashMap<(String, &'static str), Result<u64, String>>,
}

impl FakeLogs {
    pub fn with_count(mut self, group: &str, pattern: &'static str, count: u64) -> Self {
        self.counts.insert((group.to_string(), pattern), Ok(count));
        self
    }

    pub fn failing(mut self, group: &str, pattern: &'static str) -> Self {
        self.counts
            .insert((group.to_string(), pattern), Err("throttled".to_string()));
        self
    }
}

#[async_trait]
impl LogSearch for FakeLogs {
    async fn count_events(&self, query: &LogQuery) -> Result<u64, BackendError> {
        match self
            .counts
            .get(&(query.log_group.clone(), query.filter_pattern))
        {
            Some(Ok(count)) => Ok(*count),
            Some(Err(e)) => Err(BackendError::new("FilterLogEvents", e.clone())),
            None => Ok(0),
        }
    }
}

#[derive(Default)]
pub struct FakeFirewall {
    arns: Vec<String>,
    fail: bool,
    calls: Mutex<Vec<FirewallScope>>,
}

impl FakeFirewall {
    pub fn with_arns(arns: Vec<String>) -> Self {
        Self {
            arns,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<FirewallScope> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FirewallDirectory for FakeFirewall {
    async fn associated_load_balancers(
        &self,
        _web_acl_name: &str,
        _web_acl_id: &str,
        scope: FirewallScope,
    ) -> Result<Vec<String>, BackendError> {
        self.calls.lock().unwrap().push(scope);
        if self.fail {
            return Err(BackendError::new("GetWebACL", "WAFNonexistentItemException"));
        }
        match scope {
            FirewallScope::Cloudfront => Ok(Vec::new()),
            FirewallScope::Regional => Ok(self.arns.clone()),
        }
    }
}

/// Delivery that records every message it is handed.
#[derive(Default)]
pub struct FakeDelivery {
    sent: Mutex<Vec<String>>,
    fail: bool,
}

impl FakeDelivery {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Delivery for FakeDelivery {
    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Status {
                status: 400,
                body: "Bad Request: chat not found".to_string(),
            });
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Same fakes in both regions.
pub fn clients(
    metrics: FakeMetrics,
    tables: FakeTables,
    logs: FakeLogs,
    firewall: FakeFirewall,
) -> Clients {
    let metrics = Arc::new(metrics);
    let firewall = Arc::new(firewall);
    Clients {
        metrics: metrics.clone(),
        global_metrics: metrics,
        tables: Arc::new(tables),
        logs: Arc::new(logs),
        firewall: firewall.clone(),
        global_firewall: firewall,
    }
}
