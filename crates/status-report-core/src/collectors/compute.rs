// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! EC2 instance metrics. Disk throughput is deliberately not collected.

use crate::backend::{Dimension, MetricsBackend, Statistic};
use crate::collectors::{collect_metrics, FailurePolicy, MetricSpec, QueryTarget};
use crate::error::CollectError;
use crate::metrics::{Conversion, MetricSet};
use crate::window::TimeWindow;

pub const NAMESPACE: &str = "AWS/EC2";

pub const METRICS: [MetricSpec; 5] = [
    MetricSpec::new("CPUUtilization_Average", "CPUUtilization", Statistic::Average),
    MetricSpec::new("CPUUtilization_Maximum", "CPUUtilization", Statistic::Maximum),
    MetricSpec::new("StatusCheckFailed", "StatusCheckFailed", Statistic::Sum),
    MetricSpec::new("NetworkIn", "NetworkIn", Statistic::Sum)
        .unit("Bytes")
        .convert(Conversion::BytesToMegabytes),
    MetricSpec::new("NetworkOut", "NetworkOut", Statistic::Sum)
        .unit("Bytes")
        .convert(Conversion::BytesToMegabytes),
];

pub async fn collect(
    backend: &dyn MetricsBackend,
    instance_id: &str,
    window: &TimeWindow,
) -> Result<MetricSet, CollectError> {
    let target =
        QueryTarget::for_window(NAMESPACE, vec![Dimension::new("InstanceId", instance_id)], window);
    let mut set = MetricSet::new();
    collect_metrics(backend, &target, &METRICS, FailurePolicy::Abort, &mut set).await?;
    Ok(set)
}
