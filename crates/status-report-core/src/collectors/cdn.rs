// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! CloudFront distribution metrics. Published in `us-east-1` only, so the
//! backend handed in here must be the global-region one.

use crate::backend::{Dimension, MetricsBackend, Statistic};
use crate::collectors::{collect_metrics, FailurePolicy, MetricSpec, QueryTarget, Reduction};
use crate::error::CollectError;
use crate::metrics::{Conversion, MetricSet};
use crate::window::TimeWindow;

pub const NAMESPACE: &str = "AWS/CloudFront";

pub const METRICS: [MetricSpec; 5] = [
    MetricSpec::new("Requests", "Requests", Statistic::Sum),
    MetricSpec::new("4xxErrorRate", "4xxErrorRate", Statistic::Average),
    MetricSpec::new("5xxErrorRate", "5xxErrorRate", Statistic::Average),
    MetricSpec::new("BytesUploaded", "BytesUploaded", Statistic::Sum)
        .convert(Conversion::BytesToMegabytes),
    MetricSpec::new("BytesDownloaded", "BytesDownloaded", Statistic::Sum)
        .convert(Conversion::BytesToMegabytes),
];

pub async fn collect(
    backend: &dyn MetricsBackend,
    distribution_id: &str,
    window: &TimeWindow,
) -> Result<MetricSet, CollectError> {
    let target = QueryTarget::for_window(
        NAMESPACE,
        vec![
            Dimension::new("DistributionId", distribution_id),
            Dimension::new("Region", "Global"),
        ],
        window,
    )
    .reduce_with(Reduction::AcrossWindow);

    let mut set = MetricSet::new();
    collect_metrics(backend, &target, &METRICS, FailurePolicy::Abort, &mut set).await?;
    Ok(set)
}
