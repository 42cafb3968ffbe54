//! WebSocket gateway of the live table
//!
//! Each connection gets a hub registration plus two tasks: a writer that
//! drains the client's outbound queue onto the socket, and a reader that
//! turns incoming frames into table commands. Whichever ends first tears
//! down the other.

use super::{errors::ApiError, handlers::AppState, middleware::RequestId};
use crate::{
    errors::RouletteError,
    table::{ClientCommand, ClientConnection, RoundManager, TableEvent},
};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    Extension,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::{debug, info, warn};

/// WebSocket handler
/// GET /ws
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let table = state
        .table
        .clone()
        .ok_or_else(|| ApiError::not_found(request_id.0, format!("no table in {} mode", state.mode)))?;

    Ok(ws.on_upgrade(move |socket| handle_connection(socket, table)))
}

async fn handle_connection(socket: WebSocket, table: Arc<RoundManager>) {
    let client_id = generate_client_id();
    let ClientConnection {
        mut outbound,
        mut closed,
        ..
    } = match table.hub().register(client_id.clone()).await {
        Ok(connection) => connection,
        Err(e) => {
            warn!("Refusing connection: {}", e);
            return;
        }
    };

    info!("🔌 WebSocket client {} connected", client_id);

    let snapshot = table.snapshot().await;
    let welcome = TableEvent::Welcome {
        client: client_id.clone(),
        round: snapshot.round,
        phase: snapshot.phase,
    };
    if let Err(e) = table.hub().send_to(&client_id, &welcome).await {
        warn!("Failed to greet {}: {}", client_id, e);
    }

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                frame = outbound.recv() => match frame {
                    Some(frame) => {
                        if sender.send(Message::Text(frame.to_string())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                _ = &mut closed => break,
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    let reader_table = table.clone();
    let reader_id = client_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => handle_command(&reader_table, &reader_id, &text).await,
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    table.hub().unregister(&client_id).await;
    info!("🔌 WebSocket client {} disconnected", client_id);
}

async fn handle_command(table: &RoundManager, client: &str, text: &str) {
    match ClientCommand::parse(text) {
        Ok(ClientCommand::PlaceBets { bets }) => {
            for bet in bets {
                if let Err(e) = table.submit_wager(client, bet).await {
                    debug!("Rejected bet from {}: {}", client, e);
                    table.reject(client, rejection_message(e)).await;
                }
            }
        }
        Ok(ClientCommand::Spin { .. }) => {
            if let Err(e) = table.trigger_resolve().await {
                table.reject(client, e.to_string()).await;
            }
        }
        Err(message) => {
            debug!("Invalid command from {}: {}", client, message);
            table.reject(client, message).await;
        }
    }
}

fn rejection_message(err: RouletteError) -> String {
    match err {
        RouletteError::Bet(e) => e.to_string(),
        RouletteError::Round(e) => e.to_string(),
        other => other.to_string(),
    }
}

/// Generate unique client ID
fn generate_client_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("ws_{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{BetError, RoundError};

    #[test]
    fn test_client_ids_are_unique() {
        let a = generate_client_id();
        let b = generate_client_id();
        assert_ne!(a, b);
        assert!(a.starts_with("ws_"));
    }

    #[test]
    fn test_rejection_message_is_unprefixed() {
        assert_eq!(
            rejection_message(BetError::InvalidCombination.into()),
            "invalid bet combination"
        );
        assert_eq!(
            rejection_message(RoundError::WindowClosed { round: 2 }.into()),
            "bet window is closed for round 2"
        );
    }
}
