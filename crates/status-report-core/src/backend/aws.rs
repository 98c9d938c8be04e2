// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! AWS SDK backed capabilities.

use async_trait::async_trait;
use std::sync::Arc;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_cloudwatch::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudwatch::types as cw;
use aws_sdk_wafv2::types::{ResourceType, Scope};
use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;

use crate::backend::{
    BillingMode, Datapoint, Dimension, FirewallDirectory, ListMetricsFilter, LogQuery, LogSearch,
    MetricSeries, MetricsBackend, Statistic, StatisticsQuery, TableDescriber, TableDescription,
};
use crate::config::FirewallScope;
use crate::coordinator::Clients;
use crate::error::BackendError;

/// CloudFront metrics and CloudFront scoped web ACLs live here.
pub const GLOBAL_REGION: &str = "us-east-1";

fn backend_error<E>(operation: &'static str, err: E) -> BackendError
where
    E: std::error::Error,
{
    BackendError::new(
        operation,
        aws_sdk_cloudwatch::error::DisplayErrorContext(err).to_string(),
    )
}

fn to_aws_time(time: DateTime<Utc>) -> AwsDateTime {
    AwsDateTime::from_millis(time.timestamp_millis())
}

fn from_aws_time(time: &AwsDateTime) -> DateTime<Utc> {
    Utc.timestamp_opt(time.secs(), time.subsec_nanos())
        .single()
        .unwrap_or_default()
}

pub struct CloudWatchBackend {
    client: aws_sdk_cloudwatch::Client,
}

impl CloudWatchBackend {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_cloudwatch::Client::new(config),
        }
    }
}

#[async_trait]
impl MetricsBackend for CloudWatchBackend {
    async fn get_metric_statistics(
        &self,
        query: &StatisticsQuery,
    ) -> Result<Vec<Datapoint>, BackendError> {
        let statistic = match query.statistic {
            Statistic::Average => cw::Statistic::Average,
            Statistic::Maximum => cw::Statistic::Maximum,
            Statistic::Sum => cw::Statistic::Sum,
        };
        let mut request = self
            .client
            .get_metric_statistics()
            .namespace(query.namespace)
            .metric_name(query.metric_name)
            .start_time(to_aws_time(query.start))
            .end_time(to_aws_time(query.end))
            .period(query.period)
            .statistics(statistic);
        for dimension in &query.dimensions {
            request = request.dimensions(
                cw::Dimension::builder()
                    .name(&dimension.name)
                    .value(&dimension.value)
                    .build(),
            );
        }
        if let Some(unit) = query.unit {
            request = request.unit(cw::StandardUnit::from(unit));
        }

        let output = request
            .send()
            .await
            .map_err(|e| backend_error("GetMetricStatistics", e))?;

        Ok(output
            .datapoints()
            .iter()
            .map(|d| Datapoint {
                timestamp: d.timestamp().map(from_aws_time).unwrap_or_default(),
                average: d.average(),
                sum: d.sum(),
                maximum: d.maximum(),
            })
            .collect())
    }

    async fn list_metrics(
        &self,
        filter: &ListMetricsFilter,
    ) -> Result<Vec<MetricSeries>, BackendError> {
        let mut request = self.client.list_metrics().namespace(filter.namespace);
        if let Some(metric_name) = filter.metric_name {
            request = request.metric_name(metric_name);
        }
        for dimension in &filter.dimensions {
            let mut builder = cw::DimensionFilter::builder().name(&dimension.name);
            if let Some(value) = &dimension.value {
                builder = builder.value(value);
            }
            request = request.dimensions(builder.build());
        }

        let mut series = Vec::new();
        let mut pages = request.into_paginator().send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| backend_error("ListMetrics", e))?;
            for metric in page.metrics() {
                series.push(MetricSeries::new(
                    metric
                        .dimensions()
                        .iter()
                        .filter_map(|d| Some(Dimension::new(d.name()?, d.value()?)))
                        .collect(),
                ));
            }
        }
        debug!(
            "ListMetrics {} returned {} series",
            filter.namespace,
            series.len()
        );
        Ok(series)
    }
}

pub struct DynamoDbTables {
    client: aws_sdk_dynamodb::Client,
}

impl DynamoDbTables {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_dynamodb::Client::new(config),
        }
    }
}

#[async_trait]
impl TableDescriber for DynamoDbTables {
    async fn describe_table(&self, table_name: &str) -> Result<TableDescription, BackendError> {
        let output = self
            .client
            .describe_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(|e| backend_error("DescribeTable", e))?;
        let table = output.table().ok_or_else(|| {
            BackendError::new("DescribeTable", format!("no description for {table_name}"))
        })?;

        // tables created before on-demand existed carry no billing summary
        let billing_mode = match table
            .billing_mode_summary()
            .and_then(|summary| summary.billing_mode())
        {
            Some(aws_sdk_dynamodb::types::BillingMode::PayPerRequest) => BillingMode::OnDemand,
            _ => BillingMode::Provisioned,
        };

        Ok(TableDescription {
            billing_mode,
            item_count: table.item_count().unwrap_or_default().max(0) as u64,
        })
    }
}

pub struct CloudWatchLogs {
    client: aws_sdk_cloudwatchlogs::Client,
}

impl CloudWatchLogs {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_cloudwatchlogs::Client::new(config),
        }
    }
}

#[async_trait]
impl LogSearch for CloudWatchLogs {
    async fn count_events(&self, query: &LogQuery) -> Result<u64, BackendError> {
        let mut pages = self
            .client
            .filter_log_events()
            .log_group_name(&query.log_group)
            .filter_pattern(query.filter_pattern)
            .start_time(query.start_millis)
            .end_time(query.end_millis)
            .into_paginator()
            .send();

        let mut count = 0u64;
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| backend_error("FilterLogEvents", e))?;
            count += page.events().len() as u64;
        }
        Ok(count)
    }
}

pub struct WafDirectory {
    client: aws_sdk_wafv2::Client,
}

impl WafDirectory {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_wafv2::Client::new(config),
        }
    }
}

#[async_trait]
impl FirewallDirectory for WafDirectory {
    async fn associated_load_balancers(
        &self,
        web_acl_name: &str,
        web_acl_id: &str,
        scope: FirewallScope,
    ) -> Result<Vec<String>, BackendError> {
        let aws_scope = match scope {
            FirewallScope::Cloudfront => Scope::Cloudfront,
            FirewallScope::Regional => Scope::Regional,
        };
        let output = self
            .client
            .get_web_acl()
            .name(web_acl_name)
            .id(web_acl_id)
            .scope(aws_scope)
            .send()
            .await
            .map_err(|e| backend_error("GetWebACL", e))?;

        if scope == FirewallScope::Cloudfront {
            return Ok(Vec::new());
        }

        let arn = output
            .web_acl()
            .map(|acl| acl.arn().to_string())
            .ok_or_else(|| BackendError::new("GetWebACL", format!("no web ACL {web_acl_name}")))?;

        let resources = self
            .client
            .list_resources_for_web_acl()
            .web_acl_arn(arn)
            .resource_type(ResourceType::ApplicationLoadBalancer)
            .send()
            .await
            .map_err(|e| backend_error("ListResourcesForWebACL", e))?;
        Ok(resources.resource_arns().to_vec())
    }
}

/// Builds SDK clients from the default credential chain, pinning the global
/// ones to `us-east-1`.
pub async fn load_clients() -> Clients {
    let regional = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let global = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(GLOBAL_REGION))
        .load()
        .await;
    debug!(
        "Using region {} for regional services",
        regional
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "unset".to_string())
    );
    clients(&regional, &global)
}

pub fn clients(regional: &SdkConfig, global: &SdkConfig) -> Clients {
    Clients {
        metrics: Arc::new(CloudWatchBackend::new(regional)),
        global_metrics: Arc::new(CloudWatchBackend::new(global)),
        tables: Arc::new(DynamoDbTables::new(regional)),
        logs: Arc::new(CloudWatchLogs::new(regional)),
        firewall: Arc::new(WafDirectory::new(regional)),
        global_firewall: Arc::new(WafDirectory::new(global)),
    }
}
