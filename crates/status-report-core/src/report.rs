// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Renders an [`AggregatedReport`] into the Telegram Markdown message.
//!
//! Sections follow a fixed order and are only emitted when the service is
//! enabled and its collector produced a result. Identifiers coming from the
//! configuration are escaped; the fixed labels are not.

use std::fmt::{self, Write};

use tracing::warn;

use crate::backend::BillingMode;
use crate::config::ServicesSpec;
use crate::metrics::{AggregatedReport, LogCounts, MetricSet, ServiceKey, TableMetrics};
use crate::window::TimeWindow;

pub const ROUTINE_SEPARATOR: &str = "- - - - - - - - - - - - - - -";
pub const DAILY_SEPARATOR: &str = "= = = = = = = = = = = = = = =";
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Telegram rejects longer messages.
pub const MAX_MESSAGE_CHARS: usize = 4096;

const LAMBDA_LOG_GROUP_MARKER: &str = "/aws/lambda/";

/// Escapes the two characters Telegram Markdown treats as formatting.
pub fn escape_markdown(text: &str) -> String {
    text.replace('_', "\\_").replace('*', "\\*")
}

/// The rendered report; [`build_message`] is the usual entry point.
pub struct Message<'a> {
    pub services: &'a ServicesSpec,
    pub window: &'a TimeWindow,
    pub report: &'a AggregatedReport,
}

impl fmt::Display for Message<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render(f, self.services, self.window, self.report)
    }
}

pub fn build_message(
    services: &ServicesSpec,
    window: &TimeWindow,
    report: &AggregatedReport,
) -> String {
    let text = Message {
        services,
        window,
        report,
    }
    .to_string();

    let chars = text.chars().count();
    if chars > MAX_MESSAGE_CHARS {
        warn!(
            "Report is {chars} characters, above the {MAX_MESSAGE_CHARS} Telegram accepts; sending as is"
        );
    }
    text
}

fn render(
    out: &mut impl Write,
    services: &ServicesSpec,
    window: &TimeWindow,
    report: &AggregatedReport,
) -> fmt::Result {
    let separator = if window.is_daily_report() {
        DAILY_SEPARATOR
    } else {
        ROUTINE_SEPARATOR
    };

    write!(out, "\n{separator}\n\n")?;
    write!(out, "{}\n\n", window.end().format(TIMESTAMP_FORMAT))?;

    render_instance(out, services, report)?;

    if services.storage.enabled && window.is_daily_report() {
        if let Some(metrics) = report.metric_set(ServiceKey::Storage) {
            render_storage(out, &services.storage.bucket_name, metrics)?;
        }
    }
    if services.load_balancer.enabled {
        if let Some(metrics) = report.metric_set(ServiceKey::LoadBalancer) {
            render_load_balancer(out, &services.load_balancer.alb_name, metrics)?;
        }
    }
    if services.cdn.enabled {
        if let Some(metrics) = report.metric_set(ServiceKey::Cdn) {
            render_cdn(out, &services.cdn.distribution_id, metrics)?;
        }
    }
    if services.database.enabled {
        if let Some(tables) = report.tables() {
            for name in &services.database.table_names {
                if let Some(table) = tables.get(name) {
                    render_table(out, name, table)?;
                }
            }
        }
    }
    if services.relational.enabled {
        if let Some(metrics) = report.metric_set(ServiceKey::Relational) {
            render_relational(out, services, metrics)?;
        }
    }
    if services.firewall.enabled {
        if let Some(metrics) = report.metric_set(ServiceKey::Firewall) {
            writeln!(out, "*WAF* {}", escape_markdown(&services.firewall.web_acl_name))?;
            writeln!(out, "Allowed Requests: {:.0}", metrics.value("AllowedRequests"))?;
            writeln!(out, "Blocked Requests: {:.0}", metrics.value("BlockedRequests"))?;
            writeln!(out)?;
        }
    }
    if services.logs.enabled {
        if let Some(groups) = report.log_groups() {
            let present: Vec<(&str, &LogCounts)> = services
                .logs
                .log_group_names
                .iter()
                .filter_map(|name| groups.get(name).map(|counts| (name.as_str(), counts)))
                .collect();
            let (lambda, application): (Vec<_>, Vec<_>) = present
                .into_iter()
                .partition(|(name, _)| name.contains(LAMBDA_LOG_GROUP_MARKER));
            render_log_groups(out, "*APPLICATION*", &application)?;
            render_log_groups(out, "*LAMBDA*", &lambda)?;
        }
    }

    writeln!(out, "{separator}")
}

/// EC2 block followed by the agent lines, under one header.
fn render_instance(
    out: &mut impl Write,
    services: &ServicesSpec,
    report: &AggregatedReport,
) -> fmt::Result {
    let compute = services
        .compute
        .enabled
        .then(|| report.metric_set(ServiceKey::Compute))
        .flatten();
    let agent = services
        .agent
        .enabled
        .then(|| report.metric_set(ServiceKey::Agent))
        .flatten();

    if let Some(metrics) = compute {
        writeln!(out, "*EC2*: {}", escape_markdown(&services.compute.instance_id))?;
        writeln!(
            out,
            "CPU: {:.2}% (avg), {:.2}% (max)",
            metrics.value("CPUUtilization_Average"),
            metrics.value("CPUUtilization_Maximum")
        )?;
        writeln!(
            out,
            "Status Checks Failed: {:.0}",
            metrics.value("StatusCheckFailed")
        )?;
        writeln!(out, "Network In: {:.2} MB", metrics.value("NetworkIn"))?;
        writeln!(out, "Network Out: {:.2} MB", metrics.value("NetworkOut"))?;
    }

    if let Some(metrics) = agent {
        if compute.is_none() {
            writeln!(
                out,
                "*CloudWatch Agent*: {}",
                escape_markdown(&services.agent.instance_id)
            )?;
        }
        writeln!(
            out,
            "Memory: {:.2}% (avg), {:.2}% (max)",
            metrics.value("mem_used_percent_Average"),
            metrics.value("mem_used_percent_Maximum")
        )?;
        writeln!(out, "Disk: {:.2}%", metrics.value("disk_used_percent"))?;
    }

    if compute.is_some() || agent.is_some() {
        writeln!(out)?;
    }
    Ok(())
}

fn render_storage(out: &mut impl Write, bucket_name: &str, metrics: &MetricSet) -> fmt::Result {
    writeln!(out, "*S3* {}", escape_markdown(bucket_name))?;
    writeln!(out, "Size: {:.2} MB", metrics.value("BucketSizeMB"))?;
    writeln!(out, "Objects: {:.0}", metrics.value("NumberOfObjects"))?;
    if metrics.contains("AllRequests") {
        writeln!(
            out,
            "Requests: {:.0} (4xx: {:.0}, 5xx: {:.0})",
            metrics.value("AllRequests"),
            metrics.value("4xxErrors"),
            metrics.value("5xxErrors")
        )?;
        writeln!(out, "Uploaded: {:.2} MB", metrics.value("BytesUploaded"))?;
        writeln!(out, "Downloaded: {:.2} MB", metrics.value("BytesDownloaded"))?;
    }
    writeln!(out)
}

fn render_load_balancer(out: &mut impl Write, name: &str, metrics: &MetricSet) -> fmt::Result {
    writeln!(out, "*ALB* {}", escape_markdown(name))?;
    writeln!(out, "Requests: {:.0}", metrics.value("RequestCount"))?;
    writeln!(
        out,
        "Response Time: {:.3} s",
        metrics.value("TargetResponseTime")
    )?;
    writeln!(
        out,
        "2xx: {:.0}, 4xx: {:.0}, 5xx: {:.0}",
        metrics.value("HTTPCode_Target_2XX_Count"),
        metrics.value("HTTPCode_Target_4XX_Count"),
        metrics.value("HTTPCode_Target_5XX_Count")
    )?;
    writeln!(
        out,
        "Healthy: {:.0}, Unhealthy: {:.0}",
        metrics.value("HealthyHostCount"),
        metrics.value("UnHealthyHostCount")
    )?;
    let elb_errors =
        metrics.value("HTTPCode_ELB_4XX_Count") + metrics.value("HTTPCode_ELB_5XX_Count");
    writeln!(out, "ALB Errors: {elb_errors:.0}")?;
    writeln!(out)
}

fn render_cdn(out: &mut impl Write, distribution_id: &str, metrics: &MetricSet) -> fmt::Result {
    writeln!(out, "*CloudFront* {}", escape_markdown(distribution_id))?;
    writeln!(out, "Requests: {:.0}", metrics.value("Requests"))?;
    writeln!(out, "4xx Error Rate: {:.2}%", metrics.value("4xxErrorRate"))?;
    writeln!(out, "5xx Error Rate: {:.2}%", metrics.value("5xxErrorRate"))?;
    writeln!(out, "Uploaded: {:.2} MB", metrics.value("BytesUploaded"))?;
    writeln!(out, "Downloaded: {:.2} MB", metrics.value("BytesDownloaded"))?;
    writeln!(out)
}

fn render_table(out: &mut impl Write, name: &str, table: &TableMetrics) -> fmt::Result {
    let metrics = &table.metrics;
    writeln!(out, "*DynamoDB* {}", escape_markdown(name))?;
    match table.billing_mode {
        BillingMode::Provisioned => {
            writeln!(out, "Total Requests: {:.0}", metrics.value("RequestCount"))?;
            writeln!(
                out,
                "Latency: {:.2} ms",
                metrics.value("SuccessfulRequestLatency")
            )?;
        }
        BillingMode::OnDemand => {
            writeln!(out, "Total Requests: N/A (On-Demand)")?;
            writeln!(out, "Latency: N/A")?;
        }
    }
    writeln!(out, "Items: {:.0}", metrics.value("ItemCount"))?;
    writeln!(out, "Read Throttles: {:.0}", metrics.value("ReadThrottleEvents"))?;
    writeln!(
        out,
        "Write Throttles: {:.0}",
        metrics.value("WriteThrottleEvents")
    )?;
    writeln!(
        out,
        "Read Capacity: {:.0} units",
        metrics.value("ConsumedReadCapacityUnits")
    )?;
    writeln!(
        out,
        "Write Capacity: {:.0} units",
        metrics.value("ConsumedWriteCapacityUnits")
    )?;
    let errors = metrics.value("UserErrors") + metrics.value("SystemErrors");
    writeln!(out, "DB Errors: {errors:.0}")?;
    writeln!(out)
}

fn render_relational(
    out: &mut impl Write,
    services: &ServicesSpec,
    metrics: &MetricSet,
) -> fmt::Result {
    let spec = &services.relational;
    match (spec.cluster_id(), spec.instance_id()) {
        (Some(cluster), Some(instance)) => writeln!(
            out,
            "*RDS* {} / {}",
            escape_markdown(cluster),
            escape_markdown(instance)
        )?,
        (Some(cluster), None) => writeln!(out, "*RDS Cluster* {}", escape_markdown(cluster))?,
        (None, Some(instance)) => writeln!(out, "*RDS Instance* {}", escape_markdown(instance))?,
        (None, None) => writeln!(out, "*RDS*")?,
    }

    if spec.instance_id().is_some() {
        if let Some(cpu) = metrics.get("Instance_CPUUtilization_Average") {
            write!(out, "CPU: {cpu:.2}% (avg)")?;
            if let Some(max) = metrics.get("Instance_CPUUtilization_Maximum") {
                write!(out, ", {max:.2}% (max)")?;
            }
            writeln!(out)?;
        }
        if let Some(memory) = metrics.get("Instance_FreeableMemory") {
            writeln!(out, "Free Memory: {memory:.2} GB")?;
        }
        if let Some(connections) = metrics.get("Instance_DatabaseConnections") {
            writeln!(out, "Connections: {connections:.0}")?;
        }
        if let Some(latency) = metrics.get("Instance_ReadLatency") {
            writeln!(out, "Read Latency: {latency:.2} ms")?;
        }
        if let Some(latency) = metrics.get("Instance_WriteLatency") {
            writeln!(out, "Write Latency: {latency:.2} ms")?;
        }
    }

    if spec.cluster_id().is_some() {
        if let Some(volume) = metrics.get("Cluster_VolumeBytesUsed") {
            writeln!(out, "Volume Size: {volume:.2} GB")?;
        }
        if let Some(iops) = metrics.get("Cluster_VolumeReadIOPs") {
            writeln!(out, "Read IOPS: {iops:.0}")?;
        }
        if let Some(iops) = metrics.get("Cluster_VolumeWriteIOPs") {
            writeln!(out, "Write IOPS: {iops:.0}")?;
        }
    }

    writeln!(out)
}

fn render_log_groups(out: &mut impl Write, title: &str, groups: &[(&str, &LogCounts)]) -> fmt::Result {
    if groups.is_empty() {
        return Ok(());
    }
    writeln!(out, "{title}")?;
    for (name, counts) in groups {
        writeln!(out, "{}:", escape_markdown(name))?;
        writeln!(out, "INFO: {}", counts.info)?;
        writeln!(out, "WARN: {}", counts.warn)?;
        writeln!(out, "ERROR: {}", counts.error)?;
        writeln!(out)?;
    }
    Ok(())
}
