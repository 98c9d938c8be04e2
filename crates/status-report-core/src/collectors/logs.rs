// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Structured log level counts for one log group.

use tracing::warn;

use crate::backend::{LogQuery, LogSearch};
use crate::metrics::{LogCounts, LogLevel};
use crate::window::TimeWindow;

/// Counts error, warn and info events in the window. A failed search counts as zero.
pub async fn collect(logs: &dyn LogSearch, log_group: &str, window: &TimeWindow) -> LogCounts {
    let mut counts = LogCounts::default();
    for level in LogLevel::ALL {
        let query = LogQuery {
            log_group: log_group.to_string(),
            filter_pattern: level.filter_pattern(),
            start_millis: window.start_utc().timestamp_millis(),
            end_millis: window.end_utc().timestamp_millis(),
        };
        match logs.count_events(&query).await {
            Ok(count) => counts.set(level, count),
            Err(e) => warn!(
                "Counting {} events in {log_group} failed, reporting 0: {e}",
                level.as_str()
            ),
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{routine_window, FakeLogs};
    use tracing_test::traced_test;

    #[tokio::test]
    async fn test_counts_per_level() {
        let logs = FakeLogs::default()
            .with_count("/app/api", LogLevel::Error.filter_pattern(), 2)
            .with_count("/app/api", LogLevel::Warn.filter_pattern(), 5)
            .with_count("/app/api", LogLevel::Info.filter_pattern(), 1200);

        let counts = collect(&logs, "/app/api", &routine_window(1)).await;
        assert_eq!(
            counts,
            LogCounts {
                error: 2,
                warn: 5,
                info: 1200,
            }
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failed_search_counts_as_zero() {
        let logs = FakeLogs::default()
            .failing("/app/api", LogLevel::Warn.filter_pattern())
            .with_count("/app/api", LogLevel::Error.filter_pattern(), 4);

        let counts = collect(&logs, "/app/api", &routine_window(1)).await;
        assert_eq!(counts.warn, 0);
        assert_eq!(counts.error, 4);
        assert!(logs_contain("Counting warn events in /app/api failed"));
    }
}
