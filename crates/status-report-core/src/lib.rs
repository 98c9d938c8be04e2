// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # Status Report Core
//!
//! Samples CloudWatch metrics for a configurable set of AWS services and turns
//! them into a single Markdown status report.
//!
//! ## Pipeline
//!
//! One invocation runs one cycle:
//! 1. [`window`] decides the sampling window (or skips the cycle)
//! 2. [`coordinator`] fans out to the per-service [`collectors`], resolving
//!    dimensions through [`resolver`] where the configured identifier is not
//!    the one CloudWatch wants
//! 3. [`report`] renders whatever was collected
//! 4. [`delivery`] ships the text
//!
//! [`cycle`] ties the stages together. All remote calls go through the
//! capability traits in [`backend`], so the pipeline runs against fakes in
//! tests and against the AWS SDK (feature `aws`) in production.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod backend;
pub mod collectors;
pub mod config;
pub mod coordinator;
pub mod cycle;
pub mod delivery;
pub mod error;
pub mod logger;
pub mod metrics;
pub mod report;
pub mod resolver;
pub mod window;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::ReportConfig;
pub use coordinator::{Clients, Coordinator};
pub use cycle::{run_cycle, CycleOutcome};
pub use error::{CollectError, ConfigError, CycleError, DeliveryError, ResolveError};
pub use metrics::{AggregatedReport, ServiceKey, ServiceMetrics};
pub use window::TimeWindow;
