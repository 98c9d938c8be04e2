// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Sampling window selection.
//!
//! A cycle either samples the last `defaultPeriod` hours (routine report), the
//! last 24 hours when the local hour matches `dailyReportHour` (daily report),
//! or nothing at all when routine reports are disabled outside the daily hour.

use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;

use crate::config::MonitoringConfig;
use crate::error::ConfigError;

pub const DAILY_LOOKBACK_HOURS: i64 = 24;
pub const HOURLY_PERIOD_SECS: i32 = 3_600;
pub const DAILY_PERIOD_SECS: i32 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    is_daily_report: bool,
}

impl TimeWindow {
    /// Computes the window for a cycle evaluated at `now`.
    ///
    /// Returns `None` when the cycle should be skipped. The daily check wins
    /// over a zero lookback.
    pub fn for_cycle(
        now: DateTime<Utc>,
        zone: Tz,
        default_period_hours: u32,
        daily_report_hour: u32,
    ) -> Option<Self> {
        let end = now.with_timezone(&zone);
        let is_daily_report = end.hour() == daily_report_hour;

        let lookback_hours = if is_daily_report {
            DAILY_LOOKBACK_HOURS
        } else if default_period_hours > 0 {
            i64::from(default_period_hours)
        } else {
            return None;
        };

        Some(Self {
            start: end - Duration::hours(lookback_hours),
            end,
            is_daily_report,
        })
    }

    pub fn from_config(
        now: DateTime<Utc>,
        monitoring: &MonitoringConfig,
    ) -> Result<Option<Self>, ConfigError> {
        let zone = monitoring.timezone()?;
        Ok(Self::for_cycle(
            now,
            zone,
            monitoring.default_period,
            monitoring.daily_report_hour,
        ))
    }

    pub fn start(&self) -> DateTime<Tz> {
        self.start
    }

    pub fn end(&self) -> DateTime<Tz> {
        self.end
    }

    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.with_timezone(&Utc)
    }

    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end.with_timezone(&Utc)
    }

    pub fn is_daily_report(&self) -> bool {
        self.is_daily_report
    }

    pub fn zone(&self) -> Tz {
        self.end.timezone()
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    /// Query granularity: hourly below a day of span, daily otherwise.
    pub fn period_secs(&self) -> i32 {
        if self.span() < Duration::hours(DAILY_LOOKBACK_HOURS) {
            HOURLY_PERIOD_SECS
        } else {
            DAILY_PERIOD_SECS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 30, 0).unwrap()
    }

    #[test]
    fn test_routine_window_uses_lookback() {
        let window = TimeWindow::for_cycle(utc(10), Tz::UTC, 3, 9).unwrap();
        assert!(!window.is_daily_report());
        assert_eq!(window.end_utc(), utc(10));
        assert_eq!(window.span(), Duration::hours(3));
        assert!(window.start() < window.end());
        assert_eq!(window.period_secs(), HOURLY_PERIOD_SECS);
    }

    #[test]
    fn test_daily_hour_uses_24h_lookback() {
        let window = TimeWindow::for_cycle(utc(9), Tz::UTC, 1, 9).unwrap();
        assert!(window.is_daily_report());
        assert_eq!(window.span(), Duration::hours(24));
        assert_eq!(window.period_secs(), DAILY_PERIOD_SECS);
    }

    #[test]
    fn test_daily_hour_wins_over_zero_lookback() {
        let window = TimeWindow::for_cycle(utc(9), Tz::UTC, 0, 9).unwrap();
        assert!(window.is_daily_report());
        assert_eq!(window.start_utc(), utc(9) - Duration::hours(24));
    }

    #[test]
    fn test_zero_lookback_outside_daily_hour_skips() {
        assert_eq!(TimeWindow::for_cycle(utc(10), Tz::UTC, 0, 9), None);
    }

    #[test]
    fn test_daily_hour_is_local() {
        // 07:30 UTC is 09:30 in Madrid during summer time
        let window = TimeWindow::for_cycle(utc(7), chrono_tz::Europe::Madrid, 0, 9).unwrap();
        assert!(window.is_daily_report());
        assert_eq!(window.end().hour(), 9);
        assert_eq!(window.zone(), chrono_tz::Europe::Madrid);
        assert_eq!(window.end_utc(), utc(7));
    }

    #[test]
    fn test_window_invariants_for_all_lookbacks() {
        for lookback in 1..=48 {
            let window = TimeWindow::for_cycle(utc(12), Tz::UTC, lookback, 3).unwrap();
            assert!(window.start() < window.end());
            assert_eq!(window.end_utc(), utc(12));
            let expected = if lookback < 24 {
                HOURLY_PERIOD_SECS
            } else {
                DAILY_PERIOD_SECS
            };
            assert_eq!(window.period_secs(), expected);
        }
    }
}
