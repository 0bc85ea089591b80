use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A player waiting in the matchmaking queue, together with the connection
/// that should hear about the match.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MatchmakingEntry {
    pub player_id: String,
    pub connection_id: String,
    pub enqueued_at: DateTime<Utc>,
}

impl MatchmakingEntry {
    pub fn new(player_id: &str, connection_id: &str) -> Self {
        MatchmakingEntry {
            player_id: player_id.to_string(),
            connection_id: connection_id.to_string(),
            enqueued_at: Utc::now(),
        }
    }
}

/// Two players taken off the queue. `player_one` joined first.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Match {
    pub player_one: MatchmakingEntry,
    pub player_two: MatchmakingEntry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueOutcome {
    Matched(Match),
    Queued { position: usize },
}
