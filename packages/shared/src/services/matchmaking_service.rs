use std::collections::VecDeque;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::models::matchmaking::{Match, MatchmakingEntry, QueueOutcome};
use crate::services::errors::matchmaking_service_errors::MatchmakingServiceError;

/// First-come, first-paired matchmaking queue.
///
/// Every mutation runs under one mutex, so two concurrent joins cannot both
/// see a single waiting player, and nobody is handed out in two matches.
/// State is process-local and is lost on restart.
#[derive(Default)]
pub struct MatchmakingService {
    queue: Mutex<VecDeque<MatchmakingEntry>>,
}

impl MatchmakingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_player(
        &self,
        player_id: &str,
        connection_id: &str,
    ) -> Result<QueueOutcome, MatchmakingServiceError> {
        if player_id.is_empty() {
            return Err(MatchmakingServiceError::ValidationError(
                "Player ID cannot be empty".to_string(),
            ));
        }
        if connection_id.is_empty() {
            return Err(MatchmakingServiceError::ValidationError(
                "Connection ID cannot be empty".to_string(),
            ));
        }

        let mut queue = self.queue.lock().await;

        if queue.iter().any(|entry| entry.player_id == player_id) {
            return Err(MatchmakingServiceError::AlreadyQueued(
                player_id.to_string(),
            ));
        }

        queue.push_back(MatchmakingEntry::new(player_id, connection_id));
        debug!("Player {} joined queue, size now {}", player_id, queue.len());

        if queue.len() >= 2 {
            if let (Some(player_one), Some(player_two)) = (queue.pop_front(), queue.pop_front()) {
                info!(
                    "Matched {} with {}",
                    player_one.player_id, player_two.player_id
                );
                return Ok(QueueOutcome::Matched(Match {
                    player_one,
                    player_two,
                }));
            }
        }

        Ok(QueueOutcome::Queued {
            position: queue.len(),
        })
    }

    /// Drops a waiting player. Returns whether they were queued.
    pub async fn remove_player(&self, player_id: &str) -> bool {
        let mut queue = self.queue.lock().await;
        let before = queue.len();
        queue.retain(|entry| entry.player_id != player_id);
        let removed = queue.len() != before;
        if removed {
            info!("Player {} left the queue", player_id);
        }
        removed
    }

    /// Puts a match back at the head of the queue, keeping its order. Used
    /// when the game for a fresh match could not be created.
    pub async fn requeue_front(&self, matched: Match) {
        let mut queue = self.queue.lock().await;
        info!(
            "Re-queueing {} and {} after failed game creation",
            matched.player_one.player_id, matched.player_two.player_id
        );
        queue.push_front(matched.player_two);
        queue.push_front(matched.player_one);
    }

    pub async fn queue_size(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// 1-based position of a waiting player.
    pub async fn position_of(&self, player_id: &str) -> Option<usize> {
        self.queue
            .lock()
            .await
            .iter()
            .position(|entry| entry.player_id == player_id)
            .map(|index| index + 1)
    }
}
