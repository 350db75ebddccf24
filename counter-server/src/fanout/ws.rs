//! Live events WebSocket endpoint
//!
//! GET /api/events/ws?token=<JWT>
//! Auth: the JWT rides a query parameter because browser WebSocket clients
//! cannot set an Authorization header; it is verified before the upgrade.
//!
//! Protocol:
//! - server → client: [`EventFrame`] JSON text
//! - client → server: [`SubscribeFrame`] JSON text, acknowledged with a
//!   `subscription_ack` frame; subscribing to `notifications` also replays
//!   the recent-notification buffer

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use shared::message::{EventFrame, SubscribeAction, SubscribeFrame, Topic};
use shared::models::{Notification, NotificationKind, Priority};
use tokio::time::Duration;
use uuid::Uuid;

use crate::auth::JwtError;
use crate::core::ServerState;
use crate::utils::AppError;

#[derive(Deserialize)]
pub struct WsAuthQuery {
    token: String,
}

/// GET /api/events/ws?token=<JWT>
pub async fn handle_events_ws(
    State(state): State<ServerState>,
    Query(query): Query<WsAuthQuery>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let claims = state.jwt.validate_token(&query.token).map_err(|e| {
        tracing::debug!("events WS token rejected: {e}");
        match e {
            JwtError::ExpiredToken => AppError::TokenExpired,
            _ => AppError::InvalidToken,
        }
    })?;

    Ok(ws.on_upgrade(move |socket| events_session(socket, state, claims)))
}

async fn events_session(socket: WebSocket, state: ServerState, claims: crate::auth::Claims) {
    let staff = claims.sub.clone();
    let (connection_id, mut events) = state.hub.register(claims);
    let (mut sink, mut stream) = socket.split();

    tracing::info!(connection = %connection_id, staff = %staff, "events WS connected");

    let mut ping_interval = tokio::time::interval(Duration::from_secs(30));
    ping_interval.tick().await; // skip immediate

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }

            _ = ping_interval.tick() => {
                if sink.send(Message::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }

            frame = events.recv() => {
                let Some(frame) = frame else { break };
                if send_frame(&mut sink, &frame).await.is_err() {
                    break;
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if handle_subscribe_frame(&state, connection_id, &text, &mut sink)
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if sink.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    state.hub.unregister(connection_id);
    tracing::info!(connection = %connection_id, "events WS disconnected");
}

/// Apply one client frame; `Err` means the socket is gone
async fn handle_subscribe_frame<S>(
    state: &ServerState,
    connection_id: Uuid,
    text: &str,
    sink: &mut S,
) -> Result<(), ()>
where
    S: futures::Sink<Message, Error = axum::Error> + Unpin,
{
    let frame: SubscribeFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(connection = %connection_id, error = %e, "unparseable subscribe frame");
            return send_frame(sink, &rejection(format!("invalid subscription frame: {e}"))).await;
        }
    };

    let result = match frame.action {
        SubscribeAction::Subscribe => state.hub.subscribe(connection_id, &frame.topics),
        SubscribeAction::Unsubscribe => state.hub.unsubscribe(connection_id, &frame.topics),
    };
    if let Err(e) = result {
        return send_frame(sink, &rejection(e.to_string())).await;
    }

    send_frame(sink, &EventFrame::subscription_ack(frame.action, &frame.topics)).await?;

    // Subscribing to notifications replays the recent buffer on demand
    if frame.action == SubscribeAction::Subscribe && frame.topics.contains(&Topic::Notifications) {
        let recent = state.hub.recent_notifications();
        send_frame(sink, &EventFrame::recent_notifications(&recent)).await?;
    }
    Ok(())
}

/// Connection-scoped rejection notice; never enters the recent buffer
fn rejection(message: impl Into<String>) -> EventFrame {
    EventFrame::notification(&Notification::new(
        NotificationKind::System,
        "Subscription rejected",
        message,
        Priority::High,
    ))
}

async fn send_frame<S>(sink: &mut S, frame: &EventFrame) -> Result<(), ()>
where
    S: futures::Sink<Message, Error = axum::Error> + Unpin,
{
    let json = frame.to_json().map_err(|_| ())?;
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}
