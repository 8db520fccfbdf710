use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::http::HeaderMap;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::Mac;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{
    header_str, hmac_sha256, EventKind, IncomingEvent, IncomingMessage, ReplyAdapter,
    ReplyContext, WebhookSource,
};
use crate::config::LineConfig;

const SIGNATURE_HEADER: &str = "x-line-signature";

/// LINE Messaging API: replies are bound to the event's reply token.
pub struct LinePlatform {
    client: reqwest::Client,
    config: LineConfig,
}

#[derive(Debug, Deserialize)]
struct WebhookBody {
    #[serde(default)]
    events: Vec<LineEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineEvent {
    #[serde(rename = "type")]
    event_type: String,
    reply_token: Option<String>,
    source: Option<LineSource>,
    timestamp: Option<i64>,
    message: Option<LineMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineSource {
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LineMessage {
    #[serde(rename = "type")]
    message_type: String,
    text: Option<String>,
}

impl LinePlatform {
    pub fn new(config: LineConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn reply(&self, ctx: &ReplyContext, message: Value) -> Result<()> {
        let reply_token = ctx
            .reply_token
            .as_deref()
            .context("LINE reply requires a reply token")?;
        let url = format!(
            "{}/v2/bot/message/reply",
            self.config.api_base.trim_end_matches('/')
        );

        debug!("Sending LINE reply: {}", message["type"]);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.channel_access_token)
            .json(&json!({
                "replyToken": reply_token,
                "messages": [message],
            }))
            .send()
            .await
            .context("Failed to send reply to LINE")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("LINE API error ({}): {}", status, error_body);
        }
        Ok(())
    }
}

#[async_trait]
impl ReplyAdapter for LinePlatform {
    async fn send_text(&self, ctx: &ReplyContext, text: &str) -> Result<()> {
        self.reply(ctx, json!({ "type": "text", "text": text })).await
    }

    async fn send_image(&self, ctx: &ReplyContext, url: &str) -> Result<()> {
        self.reply(
            ctx,
            json!({
                "type": "image",
                "originalContentUrl": url,
                "previewImageUrl": url,
            }),
        )
        .await
    }
}

impl WebhookSource for LinePlatform {
    /// `X-Line-Signature` is the base64 HMAC-SHA256 of the body under the channel secret.
    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> bool {
        let Some(signature) = header_str(headers, SIGNATURE_HEADER) else {
            return false;
        };
        let Ok(expected) = base64::engine::general_purpose::STANDARD.decode(signature) else {
            return false;
        };
        hmac_sha256(&self.config.channel_secret, body)
            .is_some_and(|mac| mac.verify_slice(&expected).is_ok())
    }

    fn parse_events(&self, body: &[u8]) -> Result<Vec<IncomingEvent>> {
        let body: WebhookBody =
            serde_json::from_slice(body).context("Failed to parse LINE webhook body")?;

        Ok(body
            .events
            .into_iter()
            .map(|event| {
                let context = ReplyContext {
                    reply_token: event.reply_token,
                    user_id: event.source.and_then(|s| s.user_id),
                };
                let kind = match (event.event_type.as_str(), event.message) {
                    ("follow", _) => EventKind::Follow,
                    ("join", _) => EventKind::Join,
                    ("message", Some(message)) if message.message_type == "text" => {
                        let received_at = event
                            .timestamp
                            .and_then(DateTime::<Utc>::from_timestamp_millis)
                            .unwrap_or_else(Utc::now);
                        EventKind::Text(IncomingMessage {
                            text: message.text.unwrap_or_default(),
                            received_at,
                        })
                    }
                    _ => EventKind::Other,
                };
                IncomingEvent { context, kind }
            })
            .collect())
    }
}
