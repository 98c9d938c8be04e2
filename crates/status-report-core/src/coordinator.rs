// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Fans out to the enabled collectors and folds their results into an
//! [`AggregatedReport`].
//!
//! Every collector runs as an independent job: one per single-resource
//! service, one per DynamoDB table and one per log group. Jobs run with a
//! bounded concurrency and a failed job is logged and left out of the report
//! without affecting the others.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::backend::{FirewallDirectory, LogSearch, MetricsBackend, TableDescriber};
use crate::collectors::{
    agent, cdn, compute, database, firewall, load_balancer, logs, relational, storage,
};
use crate::config::{FirewallScope, ServicesSpec};
use crate::error::{CollectError, CycleError};
use crate::metrics::{
    AggregatedReport, LogCounts, MetricSet, ServiceKey, ServiceMetrics, TableMetrics,
};
use crate::window::TimeWindow;

/// Remote capabilities shared by all collectors of a cycle.
///
/// CloudFront metrics and CloudFront scoped web ACLs only exist in
/// `us-east-1`, so those go through the `global_*` clients.
#[derive(Clone)]
pub struct Clients {
    pub metrics: Arc<dyn MetricsBackend>,
    pub global_metrics: Arc<dyn MetricsBackend>,
    pub tables: Arc<dyn TableDescriber>,
    pub logs: Arc<dyn LogSearch>,
    pub firewall: Arc<dyn FirewallDirectory>,
    pub global_firewall: Arc<dyn FirewallDirectory>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Job {
    Compute,
    Agent,
    Storage,
    LoadBalancer,
    Cdn,
    Table(String),
    Relational,
    Firewall,
    LogGroup(String),
}

impl Job {
    fn service(&self) -> ServiceKey {
        match self {
            Job::Compute => ServiceKey::Compute,
            Job::Agent => ServiceKey::Agent,
            Job::Storage => ServiceKey::Storage,
            Job::LoadBalancer => ServiceKey::LoadBalancer,
            Job::Cdn => ServiceKey::Cdn,
            Job::Table(_) => ServiceKey::Database,
            Job::Relational => ServiceKey::Relational,
            Job::Firewall => ServiceKey::Firewall,
            Job::LogGroup(_) => ServiceKey::Logs,
        }
    }

    fn resource<'a>(&'a self, services: &'a ServicesSpec) -> &'a str {
        match self {
            Job::Compute => services.compute.instance_id.as_str(),
            Job::Agent => services.agent.instance_id.as_str(),
            Job::Storage => services.storage.bucket_name.as_str(),
            Job::LoadBalancer => services.load_balancer.alb_name.as_str(),
            Job::Cdn => services.cdn.distribution_id.as_str(),
            Job::Table(name) | Job::LogGroup(name) => name.as_str(),
            Job::Relational => services
                .relational
                .cluster_id()
                .or(services.relational.instance_id())
                .unwrap_or_default(),
            Job::Firewall => services.firewall.web_acl_name.as_str(),
        }
    }
}

enum JobOutput {
    Single(ServiceKey, MetricSet),
    Table(String, TableMetrics),
    LogGroup(String, LogCounts),
}

pub struct Coordinator<'a> {
    clients: &'a Clients,
    services: &'a ServicesSpec,
    window: &'a TimeWindow,
    max_concurrent: usize,
}

impl<'a> Coordinator<'a> {
    pub fn new(
        clients: &'a Clients,
        services: &'a ServicesSpec,
        window: &'a TimeWindow,
        max_concurrent: usize,
    ) -> Self {
        Self {
            clients,
            services,
            window,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Runs every enabled collector and returns whatever succeeded.
    ///
    /// Cancellation drops all in-flight collectors and returns
    /// [`CycleError::Cancelled`]; no partial report is produced.
    pub async fn collect(
        &self,
        cancel: &CancellationToken,
    ) -> Result<AggregatedReport, CycleError> {
        let jobs = self.jobs();
        let total = jobs.len();
        info!(
            "Running {total} collectors ({} report)",
            if self.window.is_daily_report() {
                "daily"
            } else {
                "routine"
            }
        );

        let outputs = stream::iter(jobs)
            .map(|job| self.run(job))
            .buffer_unordered(self.max_concurrent)
            .collect::<Vec<_>>();

        let outputs = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!("Cycle cancelled, dropping in-flight collectors");
                return Err(CycleError::Cancelled);
            }
            outputs = outputs => outputs,
        };

        let succeeded = outputs.iter().filter(|o| o.is_some()).count();
        info!("{succeeded} of {total} collectors succeeded");
        Ok(merge(outputs.into_iter().flatten()))
    }

    fn jobs(&self) -> Vec<Job> {
        let services = self.services;
        let mut jobs = Vec::new();

        if services.compute.enabled {
            jobs.push(Job::Compute);
        }
        if services.agent.enabled {
            jobs.push(Job::Agent);
        }
        if services.storage.enabled {
            if self.window.is_daily_report() {
                jobs.push(Job::Storage);
            } else {
                debug!("Skipping S3, bucket metrics are only collected for the daily report");
            }
        }
        if services.load_balancer.enabled {
            jobs.push(Job::LoadBalancer);
        }
        if services.cdn.enabled {
            jobs.push(Job::Cdn);
        }
        if services.database.enabled {
            jobs.extend(services.database.table_names.iter().cloned().map(Job::Table));
        }
        if services.relational.enabled {
            jobs.push(Job::Relational);
        }
        if services.firewall.enabled {
            jobs.push(Job::Firewall);
        }
        if services.logs.enabled {
            jobs.extend(services.logs.log_group_names.iter().cloned().map(Job::LogGroup));
        }

        jobs
    }

    async fn run(&self, job: Job) -> Option<JobOutput> {
        let span = info_span!(
            "collector",
            service = %job.service(),
            resource = job.resource(self.services)
        );
        async move {
            match self.dispatch(&job).await {
                Ok(output) => {
                    debug!("Collector finished");
                    Some(output)
                }
                Err(e) => {
                    error!("Collector failed: {e}");
                    None
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, job: &Job) -> Result<JobOutput, CollectError> {
        let clients = self.clients;
        let services = self.services;
        let window = self.window;

        let output = match job {
            Job::Compute => JobOutput::Single(
                ServiceKey::Compute,
                compute::collect(clients.metrics.as_ref(), &services.compute.instance_id, window)
                    .await?,
            ),
            Job::Agent => JobOutput::Single(
                ServiceKey::Agent,
                agent::collect(clients.metrics.as_ref(), &services.agent.instance_id, window)
                    .await?,
            ),
            Job::Storage => JobOutput::Single(
                ServiceKey::Storage,
                storage::collect(
                    clients.metrics.as_ref(),
                    &services.storage.bucket_name,
                    services.storage.request_metrics_filter_id.as_deref(),
                    window,
                )
                .await?,
            ),
            Job::LoadBalancer => JobOutput::Single(
                ServiceKey::LoadBalancer,
                load_balancer::collect(
                    clients.metrics.as_ref(),
                    &services.load_balancer.alb_name,
                    window,
                )
                .await?,
            ),
            Job::Cdn => JobOutput::Single(
                ServiceKey::Cdn,
                cdn::collect(
                    clients.global_metrics.as_ref(),
                    &services.cdn.distribution_id,
                    window,
                )
                .await?,
            ),
            Job::Table(name) => JobOutput::Table(
                name.clone(),
                database::collect(
                    clients.metrics.as_ref(),
                    clients.tables.as_ref(),
                    name,
                    window,
                )
                .await?,
            ),
            Job::Relational => JobOutput::Single(
                ServiceKey::Relational,
                relational::collect(clients.metrics.as_ref(), &services.relational, window).await?,
            ),
            Job::Firewall => {
                let (metrics, directory) = match services.firewall.scope {
                    FirewallScope::Cloudfront => (&clients.global_metrics, &clients.global_firewall),
                    FirewallScope::Regional => (&clients.metrics, &clients.firewall),
                };
                JobOutput::Single(
                    ServiceKey::Firewall,
                    firewall::collect(
                        metrics.as_ref(),
                        directory.as_ref(),
                        &services.firewall,
                        window,
                    )
                    .await?,
                )
            }
            Job::LogGroup(name) => JobOutput::LogGroup(
                name.clone(),
                logs::collect(clients.logs.as_ref(), name, window).await,
            ),
        };
        Ok(output)
    }
}

fn merge(outputs: impl Iterator<Item = JobOutput>) -> AggregatedReport {
    let mut report = AggregatedReport::new();
    let mut tables = BTreeMap::new();
    let mut groups = BTreeMap::new();

    for output in outputs {
        match output {
            JobOutput::Single(key, set) => {
                report.insert(key, ServiceMetrics::Single(set));
            }
            JobOutput::Table(name, metrics) => {
                tables.insert(name, metrics);
            }
            JobOutput::LogGroup(name, counts) => {
                groups.insert(name, counts);
            }
        }
    }

    if !tables.is_empty() {
        report.insert(ServiceKey::Database, ServiceMetrics::Tables(tables));
    }
    if !groups.is_empty() {
        report.insert(ServiceKey::Logs, ServiceMetrics::LogGroups(groups));
    }
    report
}
