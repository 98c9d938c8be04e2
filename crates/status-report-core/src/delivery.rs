// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Hands the rendered report to the messaging transport.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error};

use crate::config::TelegramConfig;
use crate::error::DeliveryError;

pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const SEND_TIMEOUT: Duration = Duration::from_secs(40);
const PARSE_MODE: &str = "Markdown";

#[async_trait]
pub trait Delivery: Send + Sync {
    /// Sends `text` once; failures are not retried.
    async fn send(&self, text: &str) -> Result<(), DeliveryError>;
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// Telegram Bot API `sendMessage`.
pub struct TelegramDelivery {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramDelivery {
    pub fn new(config: &TelegramConfig, https_proxy: Option<&str>) -> Result<Self, DeliveryError> {
        let base_url = config
            .api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_TELEGRAM_API_URL)
            .trim_end_matches('/');
        Ok(Self {
            client: build_client(https_proxy, SEND_TIMEOUT)?,
            endpoint: format!("{base_url}/bot{}/sendMessage", config.bot_token),
            chat_id: config.chat_id.clone(),
        })
    }
}

#[async_trait]
impl Delivery for TelegramDelivery {
    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: PARSE_MODE,
        };

        let time = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.without_url()))?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!("Telegram rejected the report with status {status}: {body}");
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(
            "Report delivered to chat {} in {} ms",
            self.chat_id,
            time.elapsed().as_millis()
        );
        Ok(())
    }
}

/// Builds the HTTP client, routing through `proxy_url` when one is configured.
pub fn build_client(
    proxy_url: Option<&str>,
    timeout: Duration,
) -> Result<reqwest::Client, DeliveryError> {
    let mut builder = reqwest::Client::builder().use_rustls_tls().timeout(timeout);
    if let Some(proxy) = proxy_url.filter(|p| !p.is_empty()) {
        let proxy = reqwest::Proxy::https(proxy)
            .map_err(|e| DeliveryError::Client(format!("invalid proxy '{proxy}': {e}")))?;
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| DeliveryError::Client(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn config(base_url: String) -> TelegramConfig {
        TelegramConfig {
            bot_token: "123:abc".to_string(),
            chat_id: "-100200".to_string(),
            api_base_url: Some(base_url),
        }
    }

    #[tokio::test]
    async fn test_send_posts_markdown_message() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/bot123:abc/sendMessage")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "chat_id": "-100200",
                "text": "*EC2*: i-1",
                "parse_mode": "Markdown",
            })))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let delivery = TelegramDelivery::new(&config(server.url()), None).unwrap();
        delivery.send("*EC2*: i-1").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_200_is_an_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/bot123:abc/sendMessage")
            .with_status(400)
            .with_body(r#"{"ok":false,"description":"Bad Request: can't parse entities"}"#)
            .expect(1)
            .create_async()
            .await;

        let delivery = TelegramDelivery::new(&config(server.url()), None).unwrap();
        let err = delivery.send("broken *markdown").await.unwrap_err();
        match err {
            DeliveryError::Status { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("can't parse entities"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // single attempt, no retry
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_transport_error_does_not_reveal_bot_token() {
        let delivery = TelegramDelivery::new(
            &TelegramConfig {
                bot_token: "SECRET-TOKEN".to_string(),
                chat_id: "-100200".to_string(),
                api_base_url: Some("http://127.0.0.1:9".to_string()),
            },
            None,
        )
        .unwrap();

        let err = delivery.send("*EC2*: i-1").await.unwrap_err();
        assert!(matches!(err, DeliveryError::Transport(_)));
        assert!(!err.to_string().contains("SECRET-TOKEN"));
        assert!(!format!("{err:?}").contains("SECRET-TOKEN"));
    }

    #[test]
    fn test_endpoint_defaults_to_public_api() {
        let delivery = TelegramDelivery::new(
            &TelegramConfig {
                bot_token: "123:abc".to_string(),
                chat_id: "1".to_string(),
                api_base_url: None,
            },
            None,
        )
        .unwrap();
        assert_eq!(
            delivery.endpoint,
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let result = build_client(Some("::not a url::"), SEND_TIMEOUT);
        assert!(matches!(result, Err(DeliveryError::Client(_))));
    }
}
