use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::scenario::GeneratedScenario;
use crate::models::turn::Turn;

pub const DEFAULT_MAX_TURNS_PER_PHASE: u32 = 5;
pub const DEFAULT_MAX_CHARS_PER_MESSAGE: usize = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    InProgress,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Defense,
    Attack,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Defense => "DEFENSE",
            GamePhase::Attack => "ATTACK",
        }
    }
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameEndReason {
    SecretRevealed,
    Draw,
}

/// Per-game limits, copied onto every new game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSettings {
    pub max_turns_per_phase: u32,
    pub max_chars_per_message: usize,
}

impl Default for GameSettings {
    fn default() -> Self {
        GameSettings {
            max_turns_per_phase: DEFAULT_MAX_TURNS_PER_PHASE,
            max_chars_per_message: DEFAULT_MAX_CHARS_PER_MESSAGE,
        }
    }
}

/// A duel between two players.
///
/// Each player's AI guards its own secret: `player_one_secret` belongs to the
/// persona player one trains during DEFENSE and player two attacks during
/// ATTACK, and the other way round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub player_one_id: String,
    pub player_two_id: String,
    pub template_id: String,
    pub generated_character: String,
    pub player_one_secret: String,
    pub player_two_secret: String,
    pub status: GameStatus,
    pub phase: GamePhase,
    pub max_turns_per_phase: u32,
    pub max_chars_per_message: usize,
    pub player_one_defense_summary: Option<String>,
    pub player_two_defense_summary: Option<String>,
    pub winner_id: Option<String>,
    pub end_reason: Option<GameEndReason>,
    pub transition_ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Game {
    pub fn new(
        player_one_id: &str,
        player_two_id: &str,
        scenario: &GeneratedScenario,
        settings: &GameSettings,
    ) -> Self {
        let now = Utc::now();
        Game {
            id: Uuid::new_v4().to_string(),
            player_one_id: player_one_id.to_string(),
            player_two_id: player_two_id.to_string(),
            template_id: scenario.template_id.clone(),
            generated_character: scenario.character.clone(),
            player_one_secret: scenario.player_one_secret.clone(),
            player_two_secret: scenario.player_two_secret.clone(),
            status: GameStatus::InProgress,
            phase: GamePhase::Defense,
            max_turns_per_phase: settings.max_turns_per_phase,
            max_chars_per_message: settings.max_chars_per_message,
            player_one_defense_summary: None,
            player_two_defense_summary: None,
            winner_id: None,
            end_reason: None,
            transition_ends_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_player(&self, player_id: &str) -> bool {
        self.player_one_id == player_id || self.player_two_id == player_id
    }

    pub fn opponent_of(&self, player_id: &str) -> Option<&str> {
        if self.player_one_id == player_id {
            Some(&self.player_two_id)
        } else if self.player_two_id == player_id {
            Some(&self.player_one_id)
        } else {
            None
        }
    }

    /// The secret held by `player_id`'s own AI.
    pub fn secret_of(&self, player_id: &str) -> Option<&str> {
        if self.player_one_id == player_id {
            Some(&self.player_one_secret)
        } else if self.player_two_id == player_id {
            Some(&self.player_two_secret)
        } else {
            None
        }
    }

    pub fn defense_summary_of(&self, player_id: &str) -> Option<&str> {
        if self.player_one_id == player_id {
            self.player_one_defense_summary.as_deref()
        } else if self.player_two_id == player_id {
            self.player_two_defense_summary.as_deref()
        } else {
            None
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == GameStatus::Finished
    }

    /// Whole seconds left in the DEFENSE→ATTACK transition window, rounded up.
    /// `None` once the window has elapsed or when no transition is running.
    pub fn transition_countdown(&self, now: DateTime<Utc>) -> Option<u32> {
        let ends_at = self.transition_ends_at?;
        let remaining_ms = (ends_at - now).num_milliseconds();
        if remaining_ms <= 0 {
            return None;
        }
        Some(((remaining_ms + 999) / 1000) as u32)
    }
}

/// The part of a game any participant may see. Neither secret nor either
/// training summary is carried here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub id: String,
    pub player_one_id: String,
    pub player_two_id: String,
    pub template_id: String,
    pub generated_character: String,
    pub status: GameStatus,
    pub phase: GamePhase,
    pub max_turns_per_phase: u32,
    pub max_chars_per_message: usize,
    pub winner_id: Option<String>,
    pub end_reason: Option<GameEndReason>,
    pub transition_ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Game> for GameSummary {
    fn from(game: &Game) -> Self {
        GameSummary {
            id: game.id.clone(),
            player_one_id: game.player_one_id.clone(),
            player_two_id: game.player_two_id.clone(),
            template_id: game.template_id.clone(),
            generated_character: game.generated_character.clone(),
            status: game.status,
            phase: game.phase,
            max_turns_per_phase: game.max_turns_per_phase,
            max_chars_per_message: game.max_chars_per_message,
            winner_id: game.winner_id.clone(),
            end_reason: game.end_reason,
            transition_ends_at: game.transition_ends_at,
            created_at: game.created_at,
            updated_at: game.updated_at,
        }
    }
}

/// A game with every recorded turn, ordered by creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDetails {
    pub game: GameSummary,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionData {
    pub is_transitioning: bool,
    pub countdown: u32,
    pub new_phase: GamePhase,
}

/// What a reconnecting player needs to resume: the public game, their own
/// secret and training summary, both turn counts in the current phase, and
/// their own conversation so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub game: GameSummary,
    pub my_secret: String,
    pub my_defense_summary: Option<String>,
    pub phase: GamePhase,
    pub my_message_count: u32,
    pub opponent_message_count: u32,
    pub turns: Vec<Turn>,
    pub is_game_complete: bool,
    pub transition: Option<TransitionData>,
}
