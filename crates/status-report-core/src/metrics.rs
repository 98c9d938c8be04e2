// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Normalized metric results and the per-cycle aggregate.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::warn;

use crate::backend::BillingMode;

pub const BYTES_PER_MEGABYTE: f64 = 1_048_576.0;
pub const BYTES_PER_GIGABYTE: f64 = 1_073_741_824.0;
pub const MILLIS_PER_SECOND: f64 = 1_000.0;

/// Unit normalization applied to a raw CloudWatch value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    None,
    BytesToMegabytes,
    BytesToGigabytes,
    SecondsToMilliseconds,
}

impl Conversion {
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            Conversion::None => value,
            Conversion::BytesToMegabytes => value / BYTES_PER_MEGABYTE,
            Conversion::BytesToGigabytes => value / BYTES_PER_GIGABYTE,
            Conversion::SecondsToMilliseconds => value * MILLIS_PER_SECOND,
        }
    }
}

/// Metric name to already-converted value for one collector invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSet(BTreeMap<String, f64>);

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    /// Value for `key`, zero when absent.
    pub fn value(&self, key: &str) -> f64 {
        self.get(key).unwrap_or_default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for MetricSet {
    fn from_iter<T: IntoIterator<Item = (K, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// DynamoDB table result; the billing mode decides which metrics are present.
#[derive(Debug, Clone, PartialEq)]
pub struct TableMetrics {
    pub billing_mode: BillingMode,
    pub metrics: MetricSet,
}

/// Structured log level searched for in a log group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
}

impl LogLevel {
    pub const ALL: [LogLevel; 3] = [LogLevel::Error, LogLevel::Warn, LogLevel::Info];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
        }
    }

    pub fn filter_pattern(&self) -> &'static str {
        match self {
            LogLevel::Error => r#"{ $.level = "error" }"#,
            LogLevel::Warn => r#"{ $.level = "warn" }"#,
            LogLevel::Info => r#"{ $.level = "info" }"#,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogCounts {
    pub error: u64,
    pub warn: u64,
    pub info: u64,
}

impl LogCounts {
    pub fn set(&mut self, level: LogLevel, count: u64) {
        match level {
            LogLevel::Error => self.error = count,
            LogLevel::Warn => self.warn = count,
            LogLevel::Info => self.info = count,
        }
    }

    pub fn get(&self, level: LogLevel) -> u64 {
        match level {
            LogLevel::Error => self.error,
            LogLevel::Warn => self.warn,
            LogLevel::Info => self.info,
        }
    }
}

/// The fixed set of monitored services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceKey {
    Compute,
    Agent,
    Storage,
    LoadBalancer,
    Cdn,
    Database,
    Relational,
    Firewall,
    Logs,
}

impl ServiceKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKey::Compute => "compute",
            ServiceKey::Agent => "agent",
            ServiceKey::Storage => "storage",
            ServiceKey::LoadBalancer => "load-balancer",
            ServiceKey::Cdn => "cdn",
            ServiceKey::Database => "database",
            ServiceKey::Relational => "relational",
            ServiceKey::Firewall => "firewall",
            ServiceKey::Logs => "logs",
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one service contributed to the report.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceMetrics {
    Single(MetricSet),
    /// Keyed by table name.
    Tables(BTreeMap<String, TableMetrics>),
    /// Keyed by log group name.
    LogGroups(BTreeMap<String, LogCounts>),
}

/// Service key to collected metrics, built fresh each cycle.
///
/// Every slot is written at most once; services whose collector failed are
/// simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedReport {
    services: HashMap<ServiceKey, ServiceMetrics>,
}

impl AggregatedReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a service result. A second write to the same slot is dropped.
    pub fn insert(&mut self, key: ServiceKey, metrics: ServiceMetrics) -> bool {
        if self.services.contains_key(&key) {
            warn!("Ignoring duplicate result for service {key}");
            return false;
        }
        self.services.insert(key, metrics);
        true
    }

    pub fn get(&self, key: ServiceKey) -> Option<&ServiceMetrics> {
        self.services.get(&key)
    }

    pub fn contains(&self, key: ServiceKey) -> bool {
        self.services.contains_key(&key)
    }

    pub fn metric_set(&self, key: ServiceKey) -> Option<&MetricSet> {
        match self.services.get(&key) {
            Some(ServiceMetrics::Single(set)) => Some(set),
            _ => None,
        }
    }

    pub fn tables(&self) -> Option<&BTreeMap<String, TableMetrics>> {
        match self.services.get(&ServiceKey::Database) {
            Some(ServiceMetrics::Tables(tables)) => Some(tables),
            _ => None,
        }
    }

    pub fn log_groups(&self) -> Option<&BTreeMap<String, LogCounts>> {
        match self.services.get(&ServiceKey::Logs) {
            Some(ServiceMetrics::LogGroups(groups)) => Some(groups),
            _ => None,
        }
    }

    pub fn keys(&self) -> Vec<ServiceKey> {
        let mut keys: Vec<ServiceKey> = self.services.keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(Conversion::BytesToMegabytes.apply(1_048_576.0), 1.0);
        assert_eq!(Conversion::BytesToGigabytes.apply(2_147_483_648.0), 2.0);
        assert_eq!(Conversion::SecondsToMilliseconds.apply(0.25), 250.0);
        assert_eq!(Conversion::None.apply(42.5), 42.5);
    }

    #[test]
    fn test_metric_set_defaults_missing_to_zero() {
        let set: MetricSet = [("CPUUtilization_Average", 12.5)].into_iter().collect();
        assert_eq!(set.value("CPUUtilization_Average"), 12.5);
        assert_eq!(set.value("NetworkIn"), 0.0);
        assert_eq!(set.get("NetworkIn"), None);
    }

    #[test]
    fn test_report_slots_are_written_once() {
        let mut report = AggregatedReport::new();
        let first: MetricSet = [("RequestCount", 1.0)].into_iter().collect();
        let second: MetricSet = [("RequestCount", 2.0)].into_iter().collect();

        assert!(report.insert(ServiceKey::LoadBalancer, ServiceMetrics::Single(first)));
        assert!(!report.insert(ServiceKey::LoadBalancer, ServiceMetrics::Single(second)));
        assert_eq!(
            report
                .metric_set(ServiceKey::LoadBalancer)
                .map(|s| s.value("RequestCount")),
            Some(1.0)
        );
    }

    #[test]
    fn test_typed_accessors() {
        let mut report = AggregatedReport::new();
        let mut groups = BTreeMap::new();
        groups.insert(
            "/app/api".to_string(),
            LogCounts {
                error: 1,
                warn: 2,
                info: 3,
            },
        );
        report.insert(ServiceKey::Logs, ServiceMetrics::LogGroups(groups));

        assert!(report.metric_set(ServiceKey::Logs).is_none());
        assert!(report.tables().is_none());
        assert_eq!(report.log_groups().map(|g| g.len()), Some(1));
        assert_eq!(report.keys(), vec![ServiceKey::Logs]);
    }

    #[test]
    fn test_log_counts_by_level() {
        let mut counts = LogCounts::default();
        counts.set(LogLevel::Warn, 7);
        assert_eq!(counts.get(LogLevel::Warn), 7);
        assert_eq!(counts.get(LogLevel::Error), 0);
        assert_eq!(LogLevel::Error.filter_pattern(), r#"{ $.level = "error" }"#);
    }
}
