// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! OS metrics reported by the CloudWatch agent: memory and root disk usage.

use crate::backend::{Dimension, MetricsBackend, Statistic};
use crate::collectors::{collect_metrics, query_metric, FailurePolicy, MetricSpec, QueryTarget};
use crate::error::CollectError;
use crate::metrics::MetricSet;
use crate::resolver::{self, AGENT_NAMESPACE, DISK_METRIC, ROOT_PATH};
use crate::window::TimeWindow;

pub const MEMORY_METRICS: [MetricSpec; 2] = [
    MetricSpec::new("mem_used_percent_Average", "mem_used_percent", Statistic::Average),
    MetricSpec::new("mem_used_percent_Maximum", "mem_used_percent", Statistic::Maximum),
];

pub const DISK: MetricSpec = MetricSpec::new(DISK_METRIC, DISK_METRIC, Statistic::Average);

pub async fn collect(
    backend: &dyn MetricsBackend,
    instance_id: &str,
    window: &TimeWindow,
) -> Result<MetricSet, CollectError> {
    let mut set = MetricSet::new();

    let memory = QueryTarget::for_window(
        AGENT_NAMESPACE,
        vec![Dimension::new("InstanceId", instance_id)],
        window,
    );
    collect_metrics(backend, &memory, &MEMORY_METRICS, FailurePolicy::Abort, &mut set).await?;

    let disk = resolver::resolve_disk_device(backend, instance_id, ROOT_PATH).await?;
    let target = QueryTarget::for_window(
        AGENT_NAMESPACE,
        vec![
            Dimension::new("InstanceId", instance_id),
            Dimension::new("path", ROOT_PATH),
            Dimension::new("device", disk.device),
            Dimension::new("fstype", disk.fstype),
        ],
        window,
    );
    set.insert(DISK.key, query_metric(backend, &target, &DISK).await?);

    Ok(set)
}
