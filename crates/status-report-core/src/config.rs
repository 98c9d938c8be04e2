// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Report configuration.
//!
//! The configuration file (JSON, or YAML when the extension says so) describes
//! which services are monitored and how the report is delivered:
//!
//! ```json
//! {
//!   "global": {
//!     "telegram": { "botToken": "123:abc", "chatId": "-10042" },
//!     "monitoring": { "timezone": "Europe/Madrid", "defaultPeriod": 1, "dailyReportHour": 9 }
//!   },
//!   "services": {
//!     "ec2": { "enabled": true, "instanceId": "i-0abc" },
//!     "waf": { "enabled": true, "webACLId": "1234", "webACLName": "edge", "scope": "CLOUDFRONT" }
//!   }
//! }
//! ```
//!
//! A handful of values can be overridden from the environment so secrets do not
//! need to live in the file: `STATUS_REPORT_BOT_TOKEN`, `STATUS_REPORT_CHAT_ID`,
//! `STATUS_REPORT_TIMEZONE`, `STATUS_REPORT_LOG_LEVEL` and `STATUS_REPORT_HTTPS_PROXY`
//! (falling back to `HTTPS_PROXY`).

use std::env;
use std::ffi::OsStr;
use std::path::Path;

use chrono_tz::Tz;
use figment::{
    providers::{Format, Json, Yaml},
    Figment,
};
use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

pub const CONFIG_PATH_ENV: &str = "STATUS_REPORT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_MAX_CONCURRENT_COLLECTORS: usize = 4;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportConfig {
    pub global: GlobalConfig,
    #[serde(default)]
    pub services: ServicesSpec,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    pub telegram: TelegramConfig,
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub https_proxy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
    /// Overrides `https://api.telegram.org`.
    #[serde(default)]
    pub api_base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringConfig {
    #[serde(default)]
    pub timezone: String,
    /// Lookback for routine reports in hours, 0 disables them.
    #[serde(default)]
    pub default_period: u32,
    /// Local hour (0-23) at which the daily report is produced.
    #[serde(default)]
    pub daily_report_hour: u32,
    #[serde(default)]
    pub max_concurrent_collectors: Option<usize>,
}

impl MonitoringConfig {
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone.parse::<Tz>().map_err(|e| {
            ConfigError::Invalid(format!("invalid timezone '{}': {}", self.timezone, e))
        })
    }

    pub fn max_concurrent_collectors(&self) -> usize {
        self.max_concurrent_collectors
            .unwrap_or(DEFAULT_MAX_CONCURRENT_COLLECTORS)
    }
}

/// Per-service enablement and identifiers.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ServicesSpec {
    #[serde(rename = "ec2")]
    pub compute: ComputeSpec,
    #[serde(rename = "s3")]
    pub storage: StorageSpec,
    #[serde(rename = "alb")]
    pub load_balancer: LoadBalancerSpec,
    #[serde(rename = "cloudfront")]
    pub cdn: CdnSpec,
    #[serde(rename = "cloudwatchAgent")]
    pub agent: AgentSpec,
    #[serde(rename = "cloudwatchLogs")]
    pub logs: LogsSpec,
    #[serde(rename = "waf")]
    pub firewall: FirewallSpec,
    #[serde(rename = "dynamodb")]
    pub database: DatabaseSpec,
    #[serde(rename = "rds")]
    pub relational: RelationalSpec,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComputeSpec {
    pub enabled: bool,
    pub instance_id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageSpec {
    pub enabled: bool,
    pub bucket_name: String,
    /// Id of the bucket's request metrics filter; request metrics are only
    /// published for buckets that have one.
    pub request_metrics_filter_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoadBalancerSpec {
    pub enabled: bool,
    /// Either the short name or the full `app/<name>/<id>` dimension value.
    pub alb_name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CdnSpec {
    pub enabled: bool,
    pub distribution_id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentSpec {
    pub enabled: bool,
    pub instance_id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogsSpec {
    pub enabled: bool,
    pub log_group_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct FirewallSpec {
    pub enabled: bool,
    #[serde(rename = "webACLId")]
    pub web_acl_id: String,
    #[serde(rename = "webACLName")]
    pub web_acl_name: String,
    pub scope: FirewallScope,
}

/// What a web ACL protects: a CloudFront distribution or a regional load balancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirewallScope {
    #[default]
    Regional,
    Cloudfront,
}

impl FirewallScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            FirewallScope::Regional => "REGIONAL",
            FirewallScope::Cloudfront => "CLOUDFRONT",
        }
    }
}

impl<'de> Deserialize<'de> for FirewallScope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        match value.as_str() {
            "" | "REGIONAL" => Ok(FirewallScope::Regional),
            "CLOUDFRONT" => Ok(FirewallScope::Cloudfront),
            other => Err(serde::de::Error::custom(format!(
                "WAF scope must be either 'REGIONAL', 'CLOUDFRONT' or empty (default to REGIONAL), got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DatabaseSpec {
    pub enabled: bool,
    pub table_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RelationalSpec {
    pub enabled: bool,
    pub cluster_id: String,
    pub db_instance_identifier: String,
}

impl RelationalSpec {
    pub fn cluster_id(&self) -> Option<&str> {
        Some(self.cluster_id.as_str()).filter(|id| !id.is_empty())
    }

    pub fn instance_id(&self) -> Option<&str> {
        Some(self.db_instance_identifier.as_str()).filter(|id| !id.is_empty())
    }
}

impl ReportConfig {
    /// Loads the file named by `STATUS_REPORT_CONFIG` (default `config.json`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(Path::new(&path))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let figment = match path.extension().and_then(OsStr::to_str) {
            Some("yaml") | Some("yml") => Figment::new().merge(Yaml::file(path)),
            _ => Figment::new().merge(Json::file(path)),
        };

        let mut config: ReportConfig = figment
            .extract()
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(token) = env::var("STATUS_REPORT_BOT_TOKEN") {
            self.global.telegram.bot_token = token;
        }
        if let Ok(chat_id) = env::var("STATUS_REPORT_CHAT_ID") {
            self.global.telegram.chat_id = chat_id;
        }
        if let Ok(timezone) = env::var("STATUS_REPORT_TIMEZONE") {
            self.global.monitoring.timezone = timezone;
        }
        if let Ok(level) = env::var("STATUS_REPORT_LOG_LEVEL") {
            self.global.log_level = Some(level.to_lowercase());
        }
        if let Ok(proxy) =
            env::var("STATUS_REPORT_HTTPS_PROXY").or_else(|_| env::var("HTTPS_PROXY"))
        {
            self.global.https_proxy = Some(proxy);
        }
    }

    pub fn log_level(&self) -> &str {
        self.global.log_level.as_deref().unwrap_or("info")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let global = &self.global;
        if global.telegram.bot_token.is_empty() {
            return invalid("telegram botToken is required");
        }
        if global.telegram.chat_id.is_empty() {
            return invalid("telegram chatId is required");
        }
        if global.monitoring.timezone.is_empty() {
            return invalid("monitoring timezone is required");
        }
        global.monitoring.timezone()?;
        if global.monitoring.daily_report_hour > 23 {
            return invalid("dailyReportHour must be between 0 and 23");
        }
        if global.monitoring.max_concurrent_collectors == Some(0) {
            return invalid("maxConcurrentCollectors must be greater than 0");
        }
        if !VALID_LOG_LEVELS.contains(&self.log_level()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level()
            )));
        }

        let services = &self.services;
        if services.compute.enabled && services.compute.instance_id.is_empty() {
            return invalid("EC2 is enabled but instanceId is empty");
        }
        if services.storage.enabled && services.storage.bucket_name.is_empty() {
            return invalid("S3 is enabled but bucketName is empty");
        }
        if services.load_balancer.enabled && services.load_balancer.alb_name.is_empty() {
            return invalid("ALB is enabled but albName is empty");
        }
        if services.cdn.enabled && services.cdn.distribution_id.is_empty() {
            return invalid("CloudFront is enabled but distributionId is empty");
        }
        if services.agent.enabled && services.agent.instance_id.is_empty() {
            return invalid("CloudWatch Agent is enabled but instanceId is empty");
        }
        if services.logs.enabled && services.logs.log_group_names.is_empty() {
            return invalid("CloudWatch Logs is enabled but logGroupNames array is empty");
        }
        if services.firewall.enabled {
            if services.firewall.web_acl_id.is_empty() {
                return invalid("WAF is enabled but webACLId is empty");
            }
            if services.firewall.web_acl_name.is_empty() {
                return invalid("WAF is enabled but webACLName is empty");
            }
        }
        if services.database.enabled && services.database.table_names.is_empty() {
            return invalid("DynamoDB is enabled but tableNames array is empty");
        }
        if services.relational.enabled
            && services.relational.cluster_id().is_none()
            && services.relational.instance_id().is_none()
        {
            return invalid(
                "RDS is enabled but both clusterId and dbInstanceIdentifier are empty - at least one is required",
            );
        }

        Ok(())
    }
}

fn invalid(message: &str) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid(message.to_string()))
}
