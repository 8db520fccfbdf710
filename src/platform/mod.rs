pub mod line;
pub mod messenger;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::{ChatPlatform, Config};

/// Where a reply goes: LINE answers with the event's reply token, Messenger
/// pushes to the sender ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyContext {
    pub reply_token: Option<String>,
    pub user_id: Option<String>,
}

/// A text message received from any platform
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub text: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum EventKind {
    /// The user added the bot as a friend.
    Follow,
    /// The bot was added to a group or room.
    Join,
    Text(IncomingMessage),
    Other,
}

#[derive(Debug, Clone)]
pub struct IncomingEvent {
    pub context: ReplyContext,
    pub kind: EventKind,
}

/// Sends replies back to the platform the message came from.
#[async_trait]
pub trait ReplyAdapter: Send + Sync {
    async fn send_text(&self, ctx: &ReplyContext, text: &str) -> Result<()>;
    async fn send_image(&self, ctx: &ReplyContext, url: &str) -> Result<()>;
}

/// Inbound side of a platform: signature checks and payload parsing.
pub trait WebhookSource: Send + Sync {
    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> bool;

    fn parse_events(&self, body: &[u8]) -> Result<Vec<IncomingEvent>>;

    /// Answer for a `GET` subscription handshake, if the platform uses one.
    fn handshake(&self, _query: &std::collections::HashMap<String, String>) -> Option<String> {
        None
    }
}

/// Both halves of the configured platform.
#[derive(Clone)]
pub struct Platform {
    pub kind: ChatPlatform,
    pub replier: Arc<dyn ReplyAdapter>,
    pub webhook: Arc<dyn WebhookSource>,
}

impl Platform {
    /// Select the platform once for the lifetime of the process.
    pub fn from_config(config: &Config) -> Self {
        match config.platform.kind {
            ChatPlatform::Line => {
                let line = Arc::new(line::LinePlatform::new(config.line.clone()));
                Self {
                    kind: ChatPlatform::Line,
                    replier: line.clone(),
                    webhook: line,
                }
            }
            ChatPlatform::Messenger => {
                let messenger =
                    Arc::new(messenger::MessengerPlatform::new(config.messenger.clone()));
                Self {
                    kind: ChatPlatform::Messenger,
                    replier: messenger.clone(),
                    webhook: messenger,
                }
            }
        }
    }
}

pub(crate) fn hmac_sha256(secret: &str, body: &[u8]) -> Option<Hmac<Sha256>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(mac)
}

pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
