use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::game::GamePhase;

/// One player message and the AI reply it produced. Numbered from 1 within
/// its `(game_id, player_id, phase)` and never modified after it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub id: String,
    pub game_id: String,
    pub player_id: String,
    pub phase: GamePhase,
    pub turn_number: u32,
    pub player_message: String,
    pub ai_response: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(
        game_id: &str,
        player_id: &str,
        phase: GamePhase,
        turn_number: u32,
        player_message: &str,
        ai_response: &str,
    ) -> Self {
        Turn {
            id: Uuid::new_v4().to_string(),
            game_id: game_id.to_string(),
            player_id: player_id.to_string(),
            phase,
            turn_number,
            player_message: player_message.to_string(),
            ai_response: ai_response.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Sort key shared by every ledger backend: `5:alice#DEFENSE#0001`.
    pub fn ledger_key(&self) -> String {
        format!(
            "{}{:04}",
            ledger_prefix(&self.player_id, self.phase),
            self.turn_number
        )
    }
}

/// Player ids are opaque, so the id is length-prefixed to keep one player's
/// keys from ever being a prefix match for another's.
pub fn ledger_prefix(player_id: &str, phase: GamePhase) -> String {
    format!("{}:{}#{}#", player_id.len(), player_id, phase)
}
