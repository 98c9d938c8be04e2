// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! WAFv2 web ACL request counts.
//!
//! A CloudFront scoped ACL is dimensioned by its name. A regional ACL is
//! dimensioned by the load balancer it protects, which has to be resolved
//! first; failing to resolve it fails the collector.

use tracing::warn;

use crate::backend::{Dimension, FirewallDirectory, MetricsBackend, Statistic};
use crate::collectors::{collect_metrics, FailurePolicy, MetricSpec, QueryTarget};
use crate::config::{FirewallScope, FirewallSpec};
use crate::error::{CollectError, ResolveError};
use crate::metrics::MetricSet;
use crate::resolver;
use crate::window::TimeWindow;

pub const NAMESPACE: &str = "AWS/WAFV2";

pub const METRICS: [MetricSpec; 2] = [
    MetricSpec::new("AllowedRequests", "AllowedRequests", Statistic::Sum),
    MetricSpec::new("BlockedRequests", "BlockedRequests", Statistic::Sum),
];

/// `backend` and `directory` must match the ACL scope: global region for
/// CloudFront, default region otherwise.
pub async fn collect(
    backend: &dyn MetricsBackend,
    directory: &dyn FirewallDirectory,
    spec: &FirewallSpec,
    window: &TimeWindow,
) -> Result<MetricSet, CollectError> {
    let protected = resolver::resolve_protected_load_balancer(
        directory,
        &spec.web_acl_name,
        &spec.web_acl_id,
        spec.scope,
    )
    .await;

    let dimensions = match (spec.scope, protected) {
        (FirewallScope::Regional, Ok(Some(arn))) => vec![
            Dimension::new("Resource", arn),
            Dimension::new("ResourceType", "ALB"),
        ],
        (FirewallScope::Regional, Ok(None)) => {
            return Err(ResolveError::NotFound {
                kind: "associated load balancer",
                name: spec.web_acl_name.clone(),
            }
            .into())
        }
        (FirewallScope::Regional, Err(e)) => return Err(e.into()),
        (FirewallScope::Cloudfront, result) => {
            if let Err(e) = result {
                warn!(
                    "Could not look up web ACL {}, continuing with CloudFront dimensions: {e}",
                    spec.web_acl_name
                );
            }
            vec![Dimension::new("WebACL", spec.web_acl_name.as_str())]
        }
    };

    let target = QueryTarget::for_window(NAMESPACE, dimensions, window);
    let mut set = MetricSet::new();
    collect_metrics(
        backend,
        &target,
        &METRICS,
        FailurePolicy::SkipMetric,
        &mut set,
    )
    .await?;
    Ok(set)
}
