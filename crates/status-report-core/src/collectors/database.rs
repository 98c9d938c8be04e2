// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! DynamoDB table metrics.
//!
//! The table is described first: the billing mode decides whether request
//! count and latency mean anything, and the item count comes from the
//! description rather than from CloudWatch.

use tracing::debug;

use crate::backend::{BillingMode, Dimension, MetricsBackend, Statistic, TableDescriber};
use crate::collectors::{collect_metrics, FailurePolicy, MetricSpec, QueryTarget};
use crate::error::CollectError;
use crate::metrics::{MetricSet, TableMetrics};
use crate::window::TimeWindow;

pub const NAMESPACE: &str = "AWS/DynamoDB";
pub const ITEM_COUNT: &str = "ItemCount";

pub const METRICS: [MetricSpec; 6] = [
    MetricSpec::new("ReadThrottleEvents", "ReadThrottleEvents", Statistic::Sum),
    MetricSpec::new("WriteThrottleEvents", "WriteThrottleEvents", Statistic::Sum),
    MetricSpec::new("SystemErrors", "SystemErrors", Statistic::Sum),
    MetricSpec::new("UserErrors", "UserErrors", Statistic::Sum),
    MetricSpec::new(
        "ConsumedReadCapacityUnits",
        "ConsumedReadCapacityUnits",
        Statistic::Sum,
    ),
    MetricSpec::new(
        "ConsumedWriteCapacityUnits",
        "ConsumedWriteCapacityUnits",
        Statistic::Sum,
    ),
];

/// Only meaningful for provisioned tables; reported in milliseconds already.
pub const PROVISIONED_METRICS: [MetricSpec; 2] = [
    MetricSpec::new("RequestCount", "RequestCount", Statistic::Sum),
    MetricSpec::new(
        "SuccessfulRequestLatency",
        "SuccessfulRequestLatency",
        Statistic::Average,
    ),
];

pub async fn collect(
    backend: &dyn MetricsBackend,
    tables: &dyn TableDescriber,
    table_name: &str,
    window: &TimeWindow,
) -> Result<TableMetrics, CollectError> {
    let description = tables.describe_table(table_name).await?;
    debug!(
        "Table {table_name} uses {:?} billing with {} items",
        description.billing_mode, description.item_count
    );

    let target = QueryTarget::for_window(
        NAMESPACE,
        vec![Dimension::new("TableName", table_name)],
        window,
    );
    let mut set = MetricSet::new();
    set.insert(ITEM_COUNT, description.item_count as f64);
    collect_metrics(backend, &target, &METRICS, FailurePolicy::Abort, &mut set).await?;
    if description.billing_mode == BillingMode::Provisioned {
        collect_metrics(
            backend,
            &target,
            &PROVISIONED_METRICS,
            FailurePolicy::Abort,
            &mut set,
        )
        .await?;
    }

    Ok(TableMetrics {
        billing_mode: description.billing_mode,
        metrics: set,
    })
}
