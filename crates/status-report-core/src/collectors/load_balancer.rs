// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::backend::{Dimension, MetricsBackend, Statistic};
use crate::collectors::{collect_metrics, FailurePolicy, MetricSpec, QueryTarget};
use crate::error::CollectError;
use crate::metrics::MetricSet;
use crate::resolver::{self, LOAD_BALANCER_DIMENSION, LOAD_BALANCER_NAMESPACE};
use crate::window::TimeWindow;

pub const METRICS: [MetricSpec; 9] = [
    MetricSpec::new("RequestCount", "RequestCount", Statistic::Sum),
    MetricSpec::new("TargetResponseTime", "TargetResponseTime", Statistic::Average),
    MetricSpec::new(
        "HTTPCode_Target_2XX_Count",
        "HTTPCode_Target_2XX_Count",
        Statistic::Sum,
    ),
    MetricSpec::new(
        "HTTPCode_Target_4XX_Count",
        "HTTPCode_Target_4XX_Count",
        Statistic::Sum,
    ),
    MetricSpec::new(
        "HTTPCode_Target_5XX_Count",
        "HTTPCode_Target_5XX_Count",
        Statistic::Sum,
    ),
    MetricSpec::new("HTTPCode_ELB_4XX_Count", "HTTPCode_ELB_4XX_Count", Statistic::Sum),
    MetricSpec::new("HTTPCode_ELB_5XX_Count", "HTTPCode_ELB_5XX_Count", Statistic::Sum),
    MetricSpec::new("HealthyHostCount", "HealthyHostCount", Statistic::Average),
    MetricSpec::new("UnHealthyHostCount", "UnHealthyHostCount", Statistic::Average),
];

/// Resolves the configured name, then queries the load balancer table.
pub async fn collect(
    backend: &dyn MetricsBackend,
    name: &str,
    window: &TimeWindow,
) -> Result<MetricSet, CollectError> {
    let load_balancer = resolver::resolve_load_balancer(backend, name).await?;
    let target = QueryTarget::for_window(
        LOAD_BALANCER_NAMESPACE,
        vec![Dimension::new(LOAD_BALANCER_DIMENSION, load_balancer)],
        window,
    );
    let mut set = MetricSet::new();
    collect_metrics(backend, &target, &METRICS, FailurePolicy::Abort, &mut set).await?;
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MetricSeries;
    use crate::test_support::{datapoint, routine_window, FakeMetrics};

    #[tokio::test]
    async fn test_queries_resolved_dimension() {
        let backend = FakeMetrics::default()
            .with_series(
                LOAD_BALANCER_NAMESPACE,
                vec![MetricSeries::new(vec![Dimension::new(
                    LOAD_BALANCER_DIMENSION,
                    "app/web/50dc6c495c0c9188",
                )])],
            )
            .with_points("RequestCount", vec![datapoint(9, 120.0), datapoint(8, 80.0)])
            .with_points("TargetResponseTime", vec![datapoint(9, 0.045)]);

        let set = collect(&backend, "web", &routine_window(2)).await.unwrap();
        assert_eq!(set.get("RequestCount"), Some(120.0));
        assert_eq!(set.get("TargetResponseTime"), Some(0.045));
        assert_eq!(set.get("UnHealthyHostCount"), Some(0.0));
        assert_eq!(set.len(), METRICS.len());
        assert!(backend
            .queries()
            .iter()
            .all(|q| q.dimension(LOAD_BALANCER_DIMENSION) == Some("app/web/50dc6c495c0c9188")));
    }

    #[tokio::test]
    async fn test_unresolvable_name_fails_without_querying() {
        let backend = FakeMetrics::default();
        let err = collect(&backend, "web", &routine_window(2))
            .await
            .unwrap_err();
        assert!(matches!(err, CollectError::Resolve(_)));
        assert!(backend.queries().is_empty());
    }
}
