//! Live event listener
//!
//! Connects to the server's events WebSocket, subscribes to the requested
//! topics and forwards every [`EventFrame`] into an mpsc channel. The
//! connection is supervised: on any disconnect the listener reconnects
//! with exponential backoff and re-subscribes, so a consumer only ever
//! sees a single stream of frames.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::MaybeTlsStream;
use tokio_util::sync::CancellationToken;

use shared::message::{EventFrame, SubscribeFrame, Topic};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// First reconnect delay
const INITIAL_RECONNECT_DELAY_SECS: u64 = 1;
/// Max reconnect delay
const MAX_RECONNECT_DELAY_SECS: u64 = 60;
/// WebSocket keepalive ping interval
const WS_PING_INTERVAL_SECS: u64 = 30;
/// Buffered frames before the listener blocks on a slow consumer
const EVENT_CHANNEL_CAPACITY: usize = 256;

type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// How a WebSocket session ended
enum SessionEnd {
    /// Connection lost, reconnect after backoff
    Reconnect,
    /// Shutdown requested or consumer gone, stop the listener
    Shutdown,
}

/// Supervised subscription to the server's event stream
pub struct LiveEvents {
    url: String,
    topics: Vec<Topic>,
    shutdown: CancellationToken,
}

impl LiveEvents {
    /// Build a listener from the client config; requires a token since the
    /// events endpoint authenticates the WebSocket handshake.
    pub fn new(
        config: &ClientConfig,
        topics: Vec<Topic>,
        shutdown: CancellationToken,
    ) -> ClientResult<Self> {
        let token = config.token.as_deref().ok_or(ClientError::Unauthorized)?;

        // Convert http:// URL to ws://
        let base = config
            .base_url
            .trim_end_matches('/')
            .replace("https://", "wss://")
            .replace("http://", "ws://");
        let url = format!("{base}/api/events/ws?token={token}");

        Ok(Self {
            url,
            topics,
            shutdown,
        })
    }

    /// Spawn the listener; the returned channel yields frames until
    /// shutdown. Dropping the receiver stops the listener.
    pub fn start(self) -> mpsc::Receiver<EventFrame> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(self.run(tx));
        rx
    }

    /// Main run loop: connect, handle the session, reconnect on failure
    async fn run(self, events: mpsc::Sender<EventFrame>) {
        tracing::info!("Live event listener started");
        let mut reconnect_delay = Duration::from_secs(INITIAL_RECONNECT_DELAY_SECS);

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            match tokio_tungstenite::connect_async(&self.url).await {
                Ok((ws, _response)) => {
                    reconnect_delay = Duration::from_secs(INITIAL_RECONNECT_DELAY_SECS);
                    if let SessionEnd::Shutdown = self.session(ws, &events).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        delay_secs = reconnect_delay.as_secs(),
                        "Events connection failed, retrying: {e}"
                    );
                }
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(reconnect_delay) => {},
            }
            reconnect_delay =
                (reconnect_delay * 2).min(Duration::from_secs(MAX_RECONNECT_DELAY_SECS));
        }

        tracing::info!("Live event listener stopped");
    }

    /// Run a single WebSocket session until disconnect or shutdown
    async fn session(&self, ws: WsStream, events: &mpsc::Sender<EventFrame>) -> SessionEnd {
        let (mut sink, mut stream) = ws.split();

        // Re-subscribe on every connect; the server keeps no memory of
        // topic selections across connections
        let subscribe = SubscribeFrame::subscribe(self.topics.clone());
        let frame = match serde_json::to_string(&subscribe) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize subscribe frame: {e}");
                return SessionEnd::Shutdown;
            }
        };
        if sink.send(Message::Text(frame.into())).await.is_err() {
            tracing::warn!("Subscribe send failed, reconnecting");
            return SessionEnd::Reconnect;
        }
        tracing::info!(topics = self.topics.len(), "Events connected and subscribed");

        let mut ping_interval = tokio::time::interval(Duration::from_secs(WS_PING_INTERVAL_SECS));
        ping_interval.tick().await; // skip immediate tick

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    let _ = sink.close().await;
                    return SessionEnd::Shutdown;
                }

                // Keepalive ping
                _ = ping_interval.tick() => {
                    if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                        tracing::warn!("Events ping failed, reconnecting");
                        return SessionEnd::Reconnect;
                    }
                }

                incoming = stream.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            let frame = match EventFrame::from_json(text.as_str()) {
                                Ok(frame) => frame,
                                Err(e) => {
                                    tracing::warn!("Unparseable event frame: {e}");
                                    continue;
                                }
                            };
                            if events.send(frame).await.is_err() {
                                // Consumer dropped the receiver
                                let _ = sink.close().await;
                                return SessionEnd::Shutdown;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = sink.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Events connection closed by server");
                            return SessionEnd::Reconnect;
                        }
                        Some(Err(e)) => {
                            tracing::warn!("Events connection error: {e}");
                            return SessionEnd::Reconnect;
                        }
                        None => return SessionEnd::Reconnect,
                        _ => {} // Binary and Pong frames carry nothing for us
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_requires_a_token() {
        let config = ClientConfig::new("http://localhost:8080");
        let result = LiveEvents::new(&config, vec![Topic::Orders], CancellationToken::new());
        assert!(matches!(result, Err(ClientError::Unauthorized)));
    }

    #[test]
    fn url_uses_websocket_scheme_and_token() {
        let config = ClientConfig::new("https://pos.example.com/").with_token("tok-123");
        let live =
            LiveEvents::new(&config, vec![Topic::Orders], CancellationToken::new()).unwrap();
        assert_eq!(live.url, "wss://pos.example.com/api/events/ws?token=tok-123");
    }
}
