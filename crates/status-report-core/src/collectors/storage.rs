// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! S3 bucket metrics.
//!
//! Size and object count are only published once a day, so they are queried
//! at a daily period over a window widened by one day. Request metrics exist
//! only for buckets with a request metrics filter and use the regular period.

use chrono::Duration;
use tracing::{debug, warn};

use crate::backend::{Dimension, MetricsBackend, Statistic};
use crate::collectors::{
    collect_metrics, query_datapoints, query_metric, FailurePolicy, MetricSpec, QueryTarget,
    Reduction,
};
use crate::error::CollectError;
use crate::metrics::{Conversion, MetricSet};
use crate::window::{TimeWindow, DAILY_PERIOD_SECS};

pub const NAMESPACE: &str = "AWS/S3";

/// Storage classes tried in order for `BucketSizeBytes`; the first one with data wins.
pub const STORAGE_TYPES: [&str; 14] = [
    "StandardStorage",
    "StandardIAStorage",
    "StandardIASizeOverhead",
    "ReducedRedundancyStorage",
    "GlacierStorage",
    "DeepArchiveStorage",
    "GlacierInstantRetrievalSizeOverhead",
    "GlacierFlexibleRetrievalSizeOverhead",
    "GlacierDeepArchiveSizeOverhead",
    "IntelligentTieringFAStorage",
    "IntelligentTieringIAStorage",
    "IntelligentTieringAAStorage",
    "IntelligentTieringAIAStorage",
    "IntelligentTieringDAAStorage",
];

pub const BUCKET_SIZE: MetricSpec =
    MetricSpec::new("BucketSizeMB", "BucketSizeBytes", Statistic::Average)
        .convert(Conversion::BytesToMegabytes);

pub const OBJECT_COUNT: MetricSpec =
    MetricSpec::new("NumberOfObjects", "NumberOfObjects", Statistic::Average);

pub const REQUEST_METRICS: [MetricSpec; 5] = [
    MetricSpec::new("AllRequests", "AllRequests", Statistic::Sum),
    MetricSpec::new("4xxErrors", "4xxErrors", Statistic::Sum),
    MetricSpec::new("5xxErrors", "5xxErrors", Statistic::Sum),
    MetricSpec::new("BytesUploaded", "BytesUploaded", Statistic::Sum)
        .convert(Conversion::BytesToMegabytes),
    MetricSpec::new("BytesDownloaded", "BytesDownloaded", Statistic::Sum)
        .convert(Conversion::BytesToMegabytes),
];

pub async fn collect(
    backend: &dyn MetricsBackend,
    bucket_name: &str,
    request_metrics_filter_id: Option<&str>,
    window: &TimeWindow,
) -> Result<MetricSet, CollectError> {
    let mut set = MetricSet::new();

    set.insert(
        BUCKET_SIZE.key,
        bucket_size(backend, bucket_name, window).await,
    );

    let objects = daily_target(
        vec![
            Dimension::new("BucketName", bucket_name),
            Dimension::new("StorageType", "AllStorageTypes"),
        ],
        window,
    );
    set.insert(
        OBJECT_COUNT.key,
        query_metric(backend, &objects, &OBJECT_COUNT).await?,
    );

    if let Some(filter_id) = request_metrics_filter_id.filter(|id| !id.is_empty()) {
        let requests = QueryTarget::for_window(
            NAMESPACE,
            vec![
                Dimension::new("BucketName", bucket_name),
                Dimension::new("FilterId", filter_id),
            ],
            window,
        );
        collect_metrics(
            backend,
            &requests,
            &REQUEST_METRICS,
            FailurePolicy::RecordZero,
            &mut set,
        )
        .await?;
    }

    Ok(set)
}

async fn bucket_size(backend: &dyn MetricsBackend, bucket_name: &str, window: &TimeWindow) -> f64 {
    for storage_type in STORAGE_TYPES {
        let target = daily_target(
            vec![
                Dimension::new("BucketName", bucket_name),
                Dimension::new("StorageType", storage_type),
            ],
            window,
        );
        match query_datapoints(backend, &target, &BUCKET_SIZE).await {
            Ok(Some(value)) => {
                debug!("Bucket {bucket_name} size found under {storage_type}");
                return value;
            }
            Ok(None) => {}
            Err(e) => warn!("Bucket size for {storage_type} unavailable: {e}"),
        }
    }
    debug!("No bucket size published for {bucket_name}");
    0.0
}

fn daily_target(dimensions: Vec<Dimension>, window: &TimeWindow) -> QueryTarget {
    QueryTarget {
        namespace: NAMESPACE,
        dimensions,
        start: window.start_utc() - Duration::days(1),
        end: window.end_utc(),
        period: DAILY_PERIOD_SECS,
        reduction: Reduction::Latest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{daily_window, datapoint, FakeMetrics};
    use tracing_test::traced_test;

    #[tokio::test]
    async fn test_size_uses_first_storage_class_with_data() {
        let backend = FakeMetrics::default()
            .with_dimension_points(
                "BucketSizeBytes",
                Dimension::new("StorageType", "GlacierStorage"),
                vec![datapoint(0, 10_485_760.0)],
            )
            .with_points("NumberOfObjects", vec![datapoint(0, 1234.0)]);

        let window = daily_window();
        let set = collect(&backend, "assets", None, &window).await.unwrap();
        assert_eq!(set.get("BucketSizeMB"), Some(10.0));
        assert_eq!(set.get("NumberOfObjects"), Some(1234.0));
        assert!(!set.contains("AllRequests"));

        let queries = backend.queries();
        let size_queries: Vec<_> = queries
            .iter()
            .filter(|q| q.metric_name == "BucketSizeBytes")
            .collect();
        // StandardStorage through ReducedRedundancyStorage, then GlacierStorage
        assert_eq!(size_queries.len(), 5);
        assert!(size_queries
            .iter()
            .all(|q| q.period == DAILY_PERIOD_SECS
                && q.start == window.start_utc() - Duration::days(1)));
    }

    #[tokio::test]
    async fn test_published_zero_stops_the_class_search() {
        let backend = FakeMetrics::default()
            .with_dimension_points(
                "BucketSizeBytes",
                Dimension::new("StorageType", "StandardStorage"),
                vec![datapoint(0, 0.0)],
            )
            .with_dimension_points(
                "BucketSizeBytes",
                Dimension::new("StorageType", "StandardIAStorage"),
                vec![datapoint(0, 5_242_880.0)],
            );

        let set = collect(&backend, "assets", None, &daily_window())
            .await
            .unwrap();
        assert_eq!(set.get("BucketSizeMB"), Some(0.0));
        assert_eq!(
            backend
                .queries()
                .iter()
                .filter(|q| q.metric_name == "BucketSizeBytes")
                .count(),
            1
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn test_size_query_error_moves_to_next_class() {
        let backend = FakeMetrics::default()
            .failing_dimension(
                "BucketSizeBytes",
                Dimension::new("StorageType", "StandardStorage"),
            )
            .with_dimension_points(
                "BucketSizeBytes",
                Dimension::new("StorageType", "StandardIAStorage"),
                vec![datapoint(0, 1_048_576.0)],
            );

        let set = collect(&backend, "assets", None, &daily_window())
            .await
            .unwrap();
        assert_eq!(set.get("BucketSizeMB"), Some(1.0));
        assert!(logs_contain("Bucket size for StandardStorage unavailable"));
    }

    #[tokio::test]
    async fn test_no_size_anywhere_is_zero() {
        let backend = FakeMetrics::default();
        let set = collect(&backend, "assets", None, &daily_window())
            .await
            .unwrap();
        assert_eq!(set.get("BucketSizeMB"), Some(0.0));
        assert_eq!(
            backend
                .queries()
                .iter()
                .filter(|q| q.metric_name == "BucketSizeBytes")
                .count(),
            STORAGE_TYPES.len()
        );
    }

    #[tokio::test]
    async fn test_request_metrics_with_filter() {
        let backend = FakeMetrics::default()
            .with_points("AllRequests", vec![datapoint(9, 300.0)])
            .with_points("BytesDownloaded", vec![datapoint(9, 3_145_728.0)])
            .failing_metric("5xxErrors");

        let window = daily_window();
        let set = collect(&backend, "assets", Some("EntireBucket"), &window)
            .await
            .unwrap();
        assert_eq!(set.get("AllRequests"), Some(300.0));
        assert_eq!(set.get("BytesDownloaded"), Some(3.0));
        assert_eq!(set.get("5xxErrors"), Some(0.0));

        let requests = backend
            .queries()
            .into_iter()
            .find(|q| q.metric_name == "AllRequests")
            .unwrap();
        assert_eq!(requests.dimension("FilterId"), Some("EntireBucket"));
        assert_eq!(requests.period, window.period_secs());
    }
}
