// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::process::ExitCode;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use status_report_core::{
    backend::aws,
    delivery::TelegramDelivery,
    logger::{self, Formatter},
    run_cycle, CycleOutcome, ReportConfig,
};

fn init_logging(level: &str) {
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(logger::env_filter(level))
        .with_ansi(false)
        .event_format(Formatter)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install log subscriber: {e}");
    }
}

#[tokio::main]
pub async fn main() -> ExitCode {
    let config = match ReportConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_logging("info");
            error!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(config.log_level());
    debug!("Logging subsystem enabled");

    let delivery =
        match TelegramDelivery::new(&config.global.telegram, config.global.https_proxy.as_deref())
        {
            Ok(delivery) => delivery,
            Err(e) => {
                error!("Error creating Telegram client: {e}");
                return ExitCode::FAILURE;
            }
        };
    let clients = aws::load_clients().await;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, abandoning the cycle");
            signal_token.cancel();
        }
    });

    match run_cycle(&config, &clients, &delivery, Utc::now(), &cancel).await {
        Ok(CycleOutcome::Skipped) => ExitCode::SUCCESS,
        Ok(CycleOutcome::Delivered {
            is_daily_report, ..
        }) => {
            debug!("Cycle finished, daily report: {is_daily_report}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Status report cycle failed: {e}");
            ExitCode::FAILURE
        }
    }
}
