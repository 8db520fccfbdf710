use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;
use crate::platform::WebhookSource;

/// Shared state for the webhook handlers
pub struct AppState {
    pub webhook: Arc<dyn WebhookSource>,
    pub dispatcher: Dispatcher,
}

pub fn router(state: Arc<AppState>, webhook_path: &str) -> Router {
    Router::new()
        .route(webhook_path, post(receive_events).get(handshake))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve until the process is stopped.
pub async fn serve(listener: tokio::net::TcpListener, app: Router) -> Result<()> {
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!("Listening on {}", addr);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// Verify, parse, and hand each event to its own task. The platform gets
/// its 200 before any upstream work starts.
async fn receive_events(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if !state.webhook.verify(&headers, &body) {
        warn!("Rejected webhook with invalid signature");
        return StatusCode::UNAUTHORIZED;
    }

    let events = match state.webhook.parse_events(&body) {
        Ok(events) => events,
        Err(e) => {
            warn!("Malformed webhook body: {:#}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    debug!("Received {} event(s)", events.len());
    for event in events {
        let dispatcher = state.dispatcher.clone();
        tokio::spawn(async move {
            dispatcher.dispatch(event).await;
        });
    }
    StatusCode::OK
}

async fn handshake(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    match state.webhook.handshake(&query) {
        Some(challenge) => {
            info!("Webhook subscription verified");
            (StatusCode::OK, challenge).into_response()
        }
        None => {
            warn!("Webhook verification failed");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MessengerConfig, SourcesConfig};
    use crate::dispatcher::Reply;
    use crate::fetcher::Fetcher;
    use crate::image_cache::ImageCache;
    use crate::platform::messenger::MessengerPlatform;
    use crate::platform::{
        EventKind, IncomingEvent, IncomingMessage, ReplyAdapter, ReplyContext,
    };
    use crate::store::Store;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingReplier {
        sent: Mutex<Vec<Reply>>,
    }

    #[async_trait]
    impl ReplyAdapter for RecordingReplier {
        async fn send_text(&self, _ctx: &ReplyContext, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push(Reply::Text(text.to_string()));
            Ok(())
        }

        async fn send_image(&self, _ctx: &ReplyContext, url: &str) -> Result<()> {
            self.sent.lock().unwrap().push(Reply::Image(url.to_string()));
            Ok(())
        }
    }

    /// Accepts requests carrying `x-test-signature: ok`; each body line is one text message.
    struct PlainTextSource;

    impl WebhookSource for PlainTextSource {
        fn verify(&self, headers: &HeaderMap, _body: &[u8]) -> bool {
            headers
                .get("x-test-signature")
                .is_some_and(|v| v.as_bytes() == b"ok")
        }

        fn parse_events(&self, body: &[u8]) -> Result<Vec<IncomingEvent>> {
            let text = std::str::from_utf8(body).context("body is not UTF-8")?;
            Ok(text
                .lines()
                .map(|line| IncomingEvent {
                    context: ReplyContext::default(),
                    kind: EventKind::Text(IncomingMessage {
                        text: line.to_string(),
                        received_at: Utc::now(),
                    }),
                })
                .collect())
        }
    }

    async fn start(webhook: Arc<dyn WebhookSource>) -> (String, Arc<RecordingReplier>, Store) {
        let store = Store::open_in_memory().unwrap();
        let fetcher = Fetcher::new(SourcesConfig::default());
        let images = ImageCache::new(store.clone(), fetcher.clone(), None);
        let replier = Arc::new(RecordingReplier::default());
        let state = Arc::new(AppState {
            webhook,
            dispatcher: Dispatcher::new(fetcher, images, store.clone(), replier.clone()),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(serve(listener, router(state, "/webhook")));
        (base, replier, store)
    }

    #[tokio::test]
    async fn test_health() {
        let (base, _, _) = start(Arc::new(PlainTextSource)).await;
        let response = reqwest::get(format!("{}/health", base)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "OK");
    }

    #[tokio::test]
    async fn test_bad_signature_is_rejected() {
        let (base, replier, store) = start(Arc::new(PlainTextSource)).await;
        let response = reqwest::Client::new()
            .post(format!("{}/webhook", base))
            .header("x-test-signature", "forged")
            .body("help")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
        assert!(replier.sent.lock().unwrap().is_empty());
        assert!(store.logged_messages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_events_are_dispatched() {
        let (base, replier, store) = start(Arc::new(PlainTextSource)).await;
        let response = reqwest::Client::new()
            .post(format!("{}/webhook", base))
            .header("x-test-signature", "ok")
            .body("help\n隨便說說")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        for _ in 0..100 {
            if store.logged_messages().await.unwrap().len() == 2
                && !replier.sent.lock().unwrap().is_empty()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let mut logged = store.logged_messages().await.unwrap();
        logged.sort();
        assert_eq!(logged, vec!["help", "隨便說說"]);
        assert_eq!(
            *replier.sent.lock().unwrap(),
            vec![Reply::Text(crate::messages::HELP.to_string())]
        );
    }

    #[tokio::test]
    async fn test_messenger_handshake() {
        let messenger = MessengerPlatform::new(MessengerConfig {
            verify_token: "verify-me".to_string(),
            ..MessengerConfig::default()
        });
        let (base, _, _) = start(Arc::new(messenger)).await;
        let client = reqwest::Client::new();

        let ok = client
            .get(format!("{}/webhook", base))
            .query(&[
                ("hub.mode", "subscribe"),
                ("hub.verify_token", "verify-me"),
                ("hub.challenge", "42"),
            ])
            .send()
            .await
            .unwrap();
        assert_eq!(ok.status(), reqwest::StatusCode::OK);
        assert_eq!(ok.text().await.unwrap(), "42");

        let denied = client
            .get(format!("{}/webhook", base))
            .query(&[("hub.mode", "subscribe"), ("hub.verify_token", "nope")])
            .send()
            .await
            .unwrap();
        assert_eq!(denied.status(), reqwest::StatusCode::FORBIDDEN);
    }
}
