//! OpenAI Realtime WebSocket connector.
//!
//! # API Reference
//!
//! - Endpoint: `wss://api.openai.com/v1/realtime?model=<model>`
//! - Protocol: WebSocket with JSON events
//! - Audio: G.711 u-law, 8kHz, mono, base64 encoded
//!
//! Each [`OpenAIRealtimeConnector::connect`] opens a brand new socket and
//! hands it to the relay as a [`Link`]: a reader task forwards text frames,
//! and a writer task serializes queued [`ClientEvent`]s.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};

use super::config::{OPENAI_REALTIME_URL, realtime_url};
use super::messages::ClientEvent;
use crate::core::realtime::base::{BackendConnector, RealtimeConfig, RealtimeError, RealtimeResult};
use crate::core::relay::{LINK_CHANNEL_CAPACITY, Link, LinkSender, spawn_json_writer};

/// Opens one OpenAI Realtime connection per call.
#[derive(Debug, Clone)]
pub struct OpenAIRealtimeConnector {
    base_url: String,
    config: RealtimeConfig,
}

impl OpenAIRealtimeConnector {
    pub fn new(config: RealtimeConfig) -> RealtimeResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }
        Ok(Self {
            base_url: OPENAI_REALTIME_URL.to_string(),
            config,
        })
    }

    /// Point the connector at a different endpoint.
    pub fn with_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_ws_url(&self) -> String {
        realtime_url(&self.base_url, &self.config.model)
    }

    fn build_request(&self) -> RealtimeResult<http::Request<()>> {
        let url = self.build_ws_url();
        let parsed =
            url::Url::parse(&url).map_err(|e| RealtimeError::InvalidConfiguration(e.to_string()))?;
        let host = match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(RealtimeError::InvalidConfiguration(format!(
                    "no host in {url}"
                )));
            }
        };

        http::Request::builder()
            .uri(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("OpenAI-Beta", "realtime=v1")
            .header(
                "Sec-WebSocket-Key",
                tungstenite::handshake::client::generate_key(),
            )
            .header("Sec-WebSocket-Version", "13")
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Host", host)
            .body(())
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))
    }
}

#[async_trait]
impl BackendConnector for OpenAIRealtimeConnector {
    async fn connect(&self) -> RealtimeResult<Link<ClientEvent>> {
        let request = self.build_request()?;

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| match e {
                tungstenite::Error::Http(response) if response.status().as_u16() == 401 => {
                    RealtimeError::AuthenticationFailed("backend rejected the API key".to_string())
                }
                other => RealtimeError::ConnectionFailed(other.to_string()),
            })?;

        info!("Connected to OpenAI Realtime API");

        let (ws_sink, mut ws_stream) = ws_stream.split();
        let (incoming_tx, incoming_rx) = mpsc::channel::<String>(LINK_CHANNEL_CAPACITY);
        let (outgoing_tx, outgoing_rx) = mpsc::channel(LINK_CHANNEL_CAPACITY);

        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if incoming_tx.send(text.to_string()).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        info!(?frame, "WebSocket closed by server");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Backend WebSocket error: {}", e);
                        break;
                    }
                }
            }
            debug!("Backend reader finished");
        });

        let writer = spawn_json_writer(
            ws_sink,
            outgoing_rx,
            |json| Message::Text(json.into()),
            "backend",
        );

        Ok(Link::new(
            incoming_rx,
            LinkSender::new(outgoing_tx),
            vec![reader, writer],
        ))
    }

    fn session(&self) -> &RealtimeConfig {
        &self.config
    }
}
