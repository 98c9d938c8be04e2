// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors raised while loading or validating the report configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// A remote call (CloudWatch, DynamoDB, Logs, WAF) failed
#[derive(Debug, thiserror::Error)]
#[error("{operation} failed: {message}")]
pub struct BackendError {
    pub operation: &'static str,
    pub message: String,
}

impl BackendError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// Errors raised while mapping a configured identifier to a metric dimension
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("No {kind} found matching '{name}'")]
    NotFound { kind: &'static str, name: String },

    #[error("'{name}' matches {} {kind}s: {}", .candidates.len(), .candidates.join(", "))]
    Ambiguous {
        kind: &'static str,
        name: String,
        candidates: Vec<String>,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// A collector could not produce its metric set
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("Failed to resolve dimension: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Failed to get {metric} ({statistic}, period {period}s): {source}")]
    Query {
        metric: String,
        statistic: &'static str,
        period: i32,
        #[source]
        source: BackendError,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// The report could not be handed to the messaging transport
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    /// Carries no URL, the endpoint path embeds the bot token.
    #[error("Failed to send message: {0}")]
    Transport(reqwest::Error),

    #[error("Telegram API returned non-200 status: {status}")]
    Status { status: u16, body: String },
}

/// Errors that end a cycle without a report being delivered
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    /// Raised before collection starts, e.g. an unknown timezone.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("Cycle cancelled before the report was sent")]
    Cancelled,
}
