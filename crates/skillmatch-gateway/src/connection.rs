use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tokio::sync::broadcast;
use tracing::{info, trace, warn};
use uuid::Uuid;

use skillmatch_types::api::Claims;
use skillmatch_types::events::{Change, GatewayCommand, GatewayEvent, Subscription};

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// A client that has not identified within this window is closed.
const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle a single WebSocket connection: Identify handshake, Ready, then
/// forward subscribed change events until either side goes away.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher, jwt_secret: String) {
    let (mut sender, mut receiver) = socket.split();

    let user_id = match wait_for_identify(&mut receiver, &jwt_secret).await {
        Some(id) => id,
        None => {
            warn!("WebSocket client failed to identify, closing");
            return;
        }
    };

    info!("{} connected to change feed", user_id);

    let ready = GatewayEvent::Ready { user_id };
    if sender
        .send(Message::Text(serde_json::to_string(&ready).unwrap().into()))
        .await
        .is_err()
    {
        return;
    }

    // Per-connection watched set, replaced wholesale by Subscribe commands
    // (shared between the send and recv tasks).
    let subscriptions: Arc<RwLock<Vec<Subscription>>> = Arc::new(RwLock::new(Vec::new()));
    let recv_subscriptions = subscriptions.clone();

    let mut broadcast_rx = dispatcher.subscribe();

    // Shared flag for heartbeat
    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward matching change events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let first = match result {
                        Ok(change) => change,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Change feed receiver lagged by {} events", n);
                            continue;
                        }
                        Err(_) => break,
                    };

                    // Coalesce whatever already queued up: duplicate
                    // (table, op) pairs collapse into one notification,
                    // since consumers refetch rather than apply deltas.
                    let mut pending = vec![first];
                    while let Ok(next) = broadcast_rx.try_recv() {
                        if !pending.contains(&next) {
                            pending.push(next);
                        }
                    }

                    let watched: Vec<Change> = {
                        let subs = subscriptions.read().expect("subscription lock poisoned");
                        pending
                            .into_iter()
                            .filter(|c| subs.iter().any(|s| s.matches(*c)))
                            .collect()
                    };

                    for change in watched {
                        let text = serde_json::to_string(&GatewayEvent::Change(change)).unwrap();
                        if sender.send(Message::Text(text.into())).await.is_err() {
                            return;
                        }
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::SeqCst) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("{} missed two heartbeats, dropping", user_id);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Client -> server commands
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    let cmd: GatewayCommand = match serde_json::from_str(&text) {
                        Ok(cmd) => cmd,
                        Err(e) => {
                            trace!("ignoring malformed gateway command: {}", e);
                            continue;
                        }
                    };
                    match cmd {
                        GatewayCommand::Subscribe { subscriptions: list } => {
                            trace!("{} watching {} tables", user_id, list.len());
                            *recv_subscriptions
                                .write()
                                .expect("subscription lock poisoned") = list;
                        }
                        // Already authenticated at the handshake
                        GatewayCommand::Identify { .. } => {}
                    }
                }
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::SeqCst);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Subscription lifetime equals socket lifetime: whichever task ends
    // first tears the other down.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("{} disconnected from change feed", user_id);
}

/// Step 1 of the handshake: wait for an Identify command carrying a JWT.
async fn wait_for_identify(
    receiver: &mut SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<Uuid> {
    let token = tokio::time::timeout(IDENTIFY_TIMEOUT, async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(GatewayCommand::Identify { token }) = serde_json::from_str(&text) {
                    return Some(token);
                }
            }
        }
        None
    })
    .await
    .ok()
    .flatten()?;

    let data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;

    Some(data.claims.sub)
}
