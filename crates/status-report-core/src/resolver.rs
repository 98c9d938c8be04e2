// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Maps configured identifiers to the dimension values CloudWatch expects.

use tracing::{debug, warn};

use crate::backend::{DimensionFilter, FirewallDirectory, ListMetricsFilter, MetricsBackend};
use crate::config::FirewallScope;
use crate::error::ResolveError;

pub const LOAD_BALANCER_NAMESPACE: &str = "AWS/ApplicationELB";
pub const LOAD_BALANCER_DIMENSION: &str = "LoadBalancer";
const LOAD_BALANCER_PREFIX: &str = "app/";
const LOAD_BALANCER_SERIES_METRIC: &str = "RequestCount";

pub const AGENT_NAMESPACE: &str = "CWAgent";
pub const DISK_METRIC: &str = "disk_used_percent";
pub const ROOT_PATH: &str = "/";

/// Returns the `LoadBalancer` dimension value (`app/<name>/<id>`) for a configured name.
///
/// A name that already has the `app/` prefix is used as is. Otherwise the
/// published `RequestCount` series are searched: an exact name segment match
/// wins, then substring matches. More than one distinct candidate is an error
/// rather than a guess.
pub async fn resolve_load_balancer(
    backend: &dyn MetricsBackend,
    name: &str,
) -> Result<String, ResolveError> {
    if name.starts_with(LOAD_BALANCER_PREFIX) {
        return Ok(name.to_string());
    }

    let series = backend
        .list_metrics(&ListMetricsFilter {
            namespace: LOAD_BALANCER_NAMESPACE,
            metric_name: Some(LOAD_BALANCER_SERIES_METRIC),
            dimensions: Vec::new(),
        })
        .await?;

    let mut candidates: Vec<String> = Vec::new();
    for value in series
        .iter()
        .filter_map(|s| s.dimension(LOAD_BALANCER_DIMENSION))
    {
        if value.contains(name) && !candidates.iter().any(|c| c == value) {
            candidates.push(value.to_string());
        }
    }

    let exact: Vec<String> = candidates
        .iter()
        .filter(|c| c.split('/').nth(1) == Some(name))
        .cloned()
        .collect();
    let matches = if exact.is_empty() { candidates } else { exact };

    pick_single("load balancer", name, matches)
}

/// ARN of the load balancer a regional web ACL protects.
///
/// CloudFront scoped ACLs do not need one and resolve to `None`.
pub async fn resolve_protected_load_balancer(
    directory: &dyn FirewallDirectory,
    web_acl_name: &str,
    web_acl_id: &str,
    scope: FirewallScope,
) -> Result<Option<String>, ResolveError> {
    let arns = directory
        .associated_load_balancers(web_acl_name, web_acl_id, scope)
        .await?;

    match scope {
        FirewallScope::Cloudfront => Ok(None),
        FirewallScope::Regional => {
            pick_single("associated load balancer", web_acl_name, arns).map(Some)
        }
    }
}

/// `device`/`fstype` dimension pair published by the CloudWatch agent for a mount.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskDevice {
    pub device: String,
    pub fstype: String,
}

/// Finds the disk series the agent publishes for `path` on an instance.
///
/// Falls back to empty values when none is published, which makes the disk
/// query return no data instead of failing the collector.
pub async fn resolve_disk_device(
    backend: &dyn MetricsBackend,
    instance_id: &str,
    path: &str,
) -> Result<DiskDevice, ResolveError> {
    let series = backend
        .list_metrics(&ListMetricsFilter {
            namespace: AGENT_NAMESPACE,
            metric_name: Some(DISK_METRIC),
            dimensions: vec![
                DimensionFilter::equals("InstanceId", instance_id),
                DimensionFilter::equals("path", path),
            ],
        })
        .await?;

    let found = series
        .iter()
        .filter(|s| s.dimension("InstanceId") == Some(instance_id))
        .find_map(|s| match (s.dimension("device"), s.dimension("fstype")) {
            (Some(device), Some(fstype)) if !device.is_empty() && !fstype.is_empty() => {
                Some(DiskDevice {
                    device: device.to_string(),
                    fstype: fstype.to_string(),
                })
            }
            _ => None,
        });

    match found {
        Some(disk) => {
            debug!(
                "Resolved disk for {instance_id} at {path}: device={} fstype={}",
                disk.device, disk.fstype
            );
            Ok(disk)
        }
        None => {
            warn!("No disk series published for {instance_id} at {path}");
            Ok(DiskDevice::default())
        }
    }
}

fn pick_single(
    kind: &'static str,
    name: &str,
    mut candidates: Vec<String>,
) -> Result<String, ResolveError> {
    match candidates.len() {
        0 => Err(ResolveError::NotFound {
            kind,
            name: name.to_string(),
        }),
        1 => Ok(candidates.remove(0)),
        _ => Err(ResolveError::Ambiguous {
            kind,
            name: name.to_string(),
            candidates,
        }),
    }
}
