use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::state::AppState;
use duel_shared::models::events::{ClientMessage, GameEvent};
use duel_shared::repositories::connection_repository::ConnectionSender;

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub player_id: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(websocket_handler))
}

async fn websocket_handler(
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let connection_id = Uuid::new_v4().to_string();
    let player_id = match params.player_id.filter(|id| !id.is_empty()) {
        Some(player_id) => player_id,
        None => {
            debug!("No player_id in query parameters, using connection_id as player_id");
            format!("player_{}", connection_id)
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, player_id, connection_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, player_id: String, connection_id: String) {
    info!(
        "WebSocket connection established: {} for player {}",
        connection_id, player_id
    );

    let (mut sink, mut stream) = socket.split();
    let (sender, mut outbound) = mpsc::unbounded_channel::<String>();

    state
        .session_service
        .notifications()
        .store_connection(&player_id, &connection_id, sender.clone())
        .await;

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    handle_client_message(&state, &player_id, &connection_id, text.as_str(), &sender).await;
                }
                Some(Ok(Message::Binary(_))) => {
                    reply(&sender, &GameEvent::error("UNSUPPORTED", "Binary frames are not supported"));
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket error on connection {}: {}", connection_id, e);
                    break;
                }
            },
            _ = &mut writer => break,
        }
    }

    state
        .session_service
        .handle_disconnect(&connection_id, &player_id)
        .await;
    writer.abort();
    info!("WebSocket connection closed: {}", connection_id);
}

async fn handle_client_message(
    state: &AppState,
    player_id: &str,
    connection_id: &str,
    text: &str,
    sender: &ConnectionSender,
) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            debug!("Rejected frame from {}: {}", connection_id, e);
            reply(sender, &GameEvent::error("INVALID_MESSAGE", e.to_string()));
            return;
        }
    };

    let session = &state.session_service;
    let outcome = match message {
        ClientMessage::JoinQueue => session.join_queue(player_id, connection_id).await.map(|_| ()),
        ClientMessage::LeaveQueue => {
            session.leave_queue(player_id).await;
            Ok(())
        }
        ClientMessage::JoinGameRoom { game_id } => session
            .join_game_room(&game_id, player_id)
            .await
            .map(|view| reply(sender, &GameEvent::GameState(Box::new(view)))),
        ClientMessage::SubmitTurn { game_id, message } => session
            .submit_turn(&game_id, player_id, &message)
            .await
            .map(|_| ()),
    };

    if let Err(e) = outcome {
        error!("Request from player {} failed: {}", player_id, e);
        reply(sender, &GameEvent::error(e.code(), e.to_string()));
    }
}

/// Answers on this socket directly, whichever connection the player's
/// notifications currently go to.
fn reply(sender: &ConnectionSender, event: &GameEvent) {
    match serde_json::to_string(event) {
        Ok(frame) => {
            if sender.send(frame).is_err() {
                debug!("Dropped reply to a closed connection");
            }
        }
        Err(e) => error!("Failed to serialize event: {}", e),
    }
}
