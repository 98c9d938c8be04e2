// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! RDS / Aurora metrics for an instance, a cluster, or both.
//!
//! A failed query only drops that metric, so the report can still show the
//! rest of the database.

use crate::backend::{Dimension, MetricsBackend, Statistic};
use crate::collectors::{collect_metrics, FailurePolicy, MetricSpec, QueryTarget};
use crate::config::RelationalSpec;
use crate::error::CollectError;
use crate::metrics::{Conversion, MetricSet};
use crate::window::TimeWindow;

pub const NAMESPACE: &str = "AWS/RDS";

pub const INSTANCE_METRICS: [MetricSpec; 6] = [
    MetricSpec::new(
        "Instance_CPUUtilization_Average",
        "CPUUtilization",
        Statistic::Average,
    ),
    MetricSpec::new(
        "Instance_CPUUtilization_Maximum",
        "CPUUtilization",
        Statistic::Maximum,
    ),
    MetricSpec::new("Instance_FreeableMemory", "FreeableMemory", Statistic::Average)
        .convert(Conversion::BytesToGigabytes),
    MetricSpec::new(
        "Instance_DatabaseConnections",
        "DatabaseConnections",
        Statistic::Maximum,
    ),
    MetricSpec::new("Instance_ReadLatency", "ReadLatency", Statistic::Average)
        .convert(Conversion::SecondsToMilliseconds),
    MetricSpec::new("Instance_WriteLatency", "WriteLatency", Statistic::Average)
        .convert(Conversion::SecondsToMilliseconds),
];

pub const CLUSTER_METRICS: [MetricSpec; 3] = [
    MetricSpec::new("Cluster_VolumeBytesUsed", "VolumeBytesUsed", Statistic::Average)
        .convert(Conversion::BytesToGigabytes),
    MetricSpec::new("Cluster_VolumeReadIOPs", "VolumeReadIOPs", Statistic::Average),
    MetricSpec::new("Cluster_VolumeWriteIOPs", "VolumeWriteIOPs", Statistic::Average),
];

pub async fn collect(
    backend: &dyn MetricsBackend,
    spec: &RelationalSpec,
    window: &TimeWindow,
) -> Result<MetricSet, CollectError> {
    let mut set = MetricSet::new();

    if let Some(instance_id) = spec.instance_id() {
        let target = QueryTarget::for_window(
            NAMESPACE,
            vec![Dimension::new("DBInstanceIdentifier", instance_id)],
            window,
        );
        collect_metrics(
            backend,
            &target,
            &INSTANCE_METRICS,
            FailurePolicy::SkipMetric,
            &mut set,
        )
        .await?;
    }

    if let Some(cluster_id) = spec.cluster_id() {
        let target = QueryTarget::for_window(
            NAMESPACE,
            vec![Dimension::new("DBClusterIdentifier", cluster_id)],
            window,
        );
        collect_metrics(
            backend,
            &target,
            &CLUSTER_METRICS,
            FailurePolicy::SkipMetric,
            &mut set,
        )
        .await?;
    }

    Ok(set)
}
