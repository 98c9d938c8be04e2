// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One end-to-end run: window, collection, assembly, delivery.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::ReportConfig;
use crate::coordinator::{Clients, Coordinator};
use crate::delivery::Delivery;
use crate::error::CycleError;
use crate::report;
use crate::window::TimeWindow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Outside the daily hour with routine reports disabled.
    Skipped,
    Delivered {
        text: String,
        is_daily_report: bool,
        services_reported: usize,
    },
}

/// Runs a single cycle evaluated at `now`.
///
/// Collector failures only shrink the report; the cycle itself fails on a bad
/// window configuration, on cancellation and when delivery fails.
pub async fn run_cycle(
    config: &ReportConfig,
    clients: &Clients,
    delivery: &dyn Delivery,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> Result<CycleOutcome, CycleError> {
    let monitoring = &config.global.monitoring;
    let Some(window) = TimeWindow::from_config(now, monitoring)? else {
        info!("Skipping cycle: outside the daily report hour and routine reports are disabled");
        return Ok(CycleOutcome::Skipped);
    };

    info!(
        "Collecting metrics from {} to {}",
        window.start().to_rfc3339(),
        window.end().to_rfc3339()
    );

    let report = Coordinator::new(
        clients,
        &config.services,
        &window,
        monitoring.max_concurrent_collectors(),
    )
    .collect(cancel)
    .await?;

    let text = report::build_message(&config.services, &window, &report);

    if cancel.is_cancelled() {
        return Err(CycleError::Cancelled);
    }
    if let Err(e) = delivery.send(&text).await {
        error!("Failed to send report: {e}");
        return Err(e.into());
    }

    info!("Report sent with {} services", report.len());
    Ok(CycleOutcome::Delivered {
        text,
        is_daily_report: window.is_daily_report(),
        services_reported: report.len(),
    })
}
