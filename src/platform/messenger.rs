use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use hmac::Mac;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{
    header_str, hmac_sha256, EventKind, IncomingEvent, IncomingMessage, ReplyAdapter,
    ReplyContext, WebhookSource,
};
use crate::config::MessengerConfig;

const SIGNATURE_HEADER: &str = "x-hub-signature-256";
const GET_STARTED: &str = "GET_STARTED";

/// Facebook Messenger Send API: replies are pushed to the sender's page-scoped ID.
pub struct MessengerPlatform {
    client: reqwest::Client,
    config: MessengerConfig,
}

#[derive(Debug, Deserialize)]
struct WebhookBody {
    object: String,
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    messaging: Vec<Messaging>,
}

#[derive(Debug, Deserialize)]
struct Messaging {
    sender: Sender,
    timestamp: Option<i64>,
    message: Option<Message>,
    postback: Option<Postback>,
}

#[derive(Debug, Deserialize)]
struct Sender {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Message {
    text: Option<String>,
    #[serde(default)]
    is_echo: bool,
}

#[derive(Debug, Deserialize)]
struct Postback {
    payload: Option<String>,
}

impl MessengerPlatform {
    pub fn new(config: MessengerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn push(&self, ctx: &ReplyContext, message: Value) -> Result<()> {
        let recipient = ctx
            .user_id
            .as_deref()
            .context("Messenger send requires a recipient ID")?;
        let url = format!("{}/me/messages", self.config.api_base.trim_end_matches('/'));

        debug!("Sending Messenger message to {}", recipient);

        let response = self
            .client
            .post(&url)
            .query(&[("access_token", self.config.access_token.as_str())])
            .json(&json!({
                "recipient": { "id": recipient },
                "message": message,
            }))
            .send()
            .await
            .context("Failed to send message to Messenger")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Messenger API error ({}): {}", status, error_body);
        }
        Ok(())
    }
}

#[async_trait]
impl ReplyAdapter for MessengerPlatform {
    async fn send_text(&self, ctx: &ReplyContext, text: &str) -> Result<()> {
        self.push(ctx, json!({ "text": text })).await
    }

    async fn send_image(&self, ctx: &ReplyContext, url: &str) -> Result<()> {
        self.push(
            ctx,
            json!({
                "attachment": {
                    "type": "image",
                    "payload": { "url": url, "is_reusable": true }
                }
            }),
        )
        .await
    }
}

impl WebhookSource for MessengerPlatform {
    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> bool {
        let Some(expected) = header_str(headers, SIGNATURE_HEADER)
            .and_then(|v| v.strip_prefix("sha256="))
            .and_then(|v| hex::decode(v).ok())
        else {
            return false;
        };
        hmac_sha256(&self.config.app_secret, body)
            .is_some_and(|mac| mac.verify_slice(&expected).is_ok())
    }

    fn parse_events(&self, body: &[u8]) -> Result<Vec<IncomingEvent>> {
        let body: WebhookBody =
            serde_json::from_slice(body).context("Failed to parse Messenger webhook body")?;
        if body.object != "page" {
            warn!("Ignoring Messenger webhook for object '{}'", body.object);
            return Ok(Vec::new());
        }

        Ok(body
            .entry
            .into_iter()
            .flat_map(|entry| entry.messaging)
            .map(|messaging| {
                let context = ReplyContext {
                    reply_token: None,
                    user_id: Some(messaging.sender.id),
                };
                let kind = match (messaging.message, messaging.postback) {
                    (Some(Message { text: Some(text), is_echo: false }), _) => {
                        let received_at = messaging
                            .timestamp
                            .and_then(DateTime::<Utc>::from_timestamp_millis)
                            .unwrap_or_else(Utc::now);
                        EventKind::Text(IncomingMessage { text, received_at })
                    }
                    (None, Some(postback)) if postback.payload.as_deref() == Some(GET_STARTED) => {
                        EventKind::Follow
                    }
                    _ => EventKind::Other,
                };
                IncomingEvent { context, kind }
            })
            .collect())
    }

    /// Subscription check: echo `hub.challenge` when the verify token matches.
    fn handshake(&self, query: &HashMap<String, String>) -> Option<String> {
        let mode = query.get("hub.mode")?;
        let token = query.get("hub.verify_token")?;
        if mode == "subscribe"
            && !self.config.verify_token.is_empty()
            && *token == self.config.verify_token
        {
            query.get("hub.challenge").cloned()
        } else {
            None
        }
    }
}
