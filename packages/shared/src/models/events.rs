use serde::{Deserialize, Serialize};

use crate::models::game::{GameEndReason, GamePhase, GameSummary, GameView};

/// Server → client notifications, serialized as `{"type": "...", ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GameEvent {
    QueueJoined {
        position: usize,
    },
    QueueLeft,
    GameFound {
        game: GameSummary,
    },
    TurnSubmitted {
        user_id: String,
        message_count: u32,
    },
    TransitionPhase {
        is_transitioning: bool,
        countdown: u32,
        new_phase: GamePhase,
    },
    GameComplete {
        winner_id: Option<String>,
        end_reason: Option<GameEndReason>,
    },
    GameState(Box<GameView>),
    Error {
        code: String,
        message: String,
    },
}

impl GameEvent {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        GameEvent::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Client → server requests arriving over a WebSocket. Anything that does
/// not parse into one of these is rejected before it reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    JoinQueue,
    LeaveQueue,
    JoinGameRoom { game_id: String },
    SubmitTurn { game_id: String, message: String },
}
