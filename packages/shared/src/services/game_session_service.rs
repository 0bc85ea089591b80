use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

use crate::models::events::GameEvent;
use crate::models::game::{Game, GameDetails, GamePhase, GameSummary, GameView};
use crate::models::matchmaking::QueueOutcome;
use crate::services::errors::game_session_service_errors::GameSessionServiceError;
use crate::services::game_engine::{GameEngine, TurnSubmission};
use crate::services::matchmaking_service::MatchmakingService;
use crate::services::notification_service::NotificationService;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum QueueJoinResult {
    Matched { game: GameSummary },
    Queued { position: usize },
}

/// Drives a player's session: queueing, playing turns and rejoining, with
/// the matching events pushed to everyone involved.
#[derive(Clone)]
pub struct GameSessionService {
    matchmaking: Arc<MatchmakingService>,
    engine: Arc<GameEngine>,
    notifications: NotificationService,
}

impl GameSessionService {
    pub fn new(
        matchmaking: Arc<MatchmakingService>,
        engine: Arc<GameEngine>,
        notifications: NotificationService,
    ) -> Self {
        GameSessionService {
            matchmaking,
            engine,
            notifications,
        }
    }

    pub fn notifications(&self) -> &NotificationService {
        &self.notifications
    }

    pub async fn join_queue(
        &self,
        player_id: &str,
        connection_id: &str,
    ) -> Result<QueueJoinResult, GameSessionServiceError> {
        match self.matchmaking.add_player(player_id, connection_id).await? {
            QueueOutcome::Queued { position } => {
                self.notifications
                    .notify_players(&[player_id], &GameEvent::QueueJoined { position })
                    .await;
                Ok(QueueJoinResult::Queued { position })
            }
            QueueOutcome::Matched(matched) => {
                let created = self
                    .engine
                    .create_game_from_match(&matched.player_one.player_id, &matched.player_two.player_id)
                    .await;

                let game = match created {
                    Ok(game) => game,
                    Err(e) => {
                        error!(
                            "Failed to create game for {} and {}: {}",
                            matched.player_one.player_id, matched.player_two.player_id, e
                        );
                        self.matchmaking.requeue_front(matched).await;
                        return Err(e.into());
                    }
                };

                let game = GameSummary::from(&game);
                self.notifications
                    .notify_players(
                        &[game.player_one_id.as_str(), game.player_two_id.as_str()],
                        &GameEvent::GameFound { game: game.clone() },
                    )
                    .await;
                Ok(QueueJoinResult::Matched { game })
            }
        }
    }

    pub async fn leave_queue(&self, player_id: &str) -> bool {
        let removed = self.matchmaking.remove_player(player_id).await;
        if removed {
            self.notifications
                .notify_players(&[player_id], &GameEvent::QueueLeft)
                .await;
        }
        removed
    }

    pub async fn submit_turn(
        &self,
        game_id: &str,
        player_id: &str,
        message: &str,
    ) -> Result<TurnSubmission, GameSessionServiceError> {
        let submission = self
            .engine
            .submit_turn_with_outcome(game_id, player_id, message)
            .await?;
        let game = &submission.game;

        self.notifications
            .notify_players(
                &[game.player_one_id.as_str(), game.player_two_id.as_str()],
                &GameEvent::TurnSubmitted {
                    user_id: player_id.to_string(),
                    message_count: submission.turn.turn_number,
                },
            )
            .await;

        self.announce_progress(game, submission.entered_attack, submission.finished)
            .await;
        Ok(submission)
    }

    /// Tells both players about a phase change or the end of the game.
    async fn announce_progress(&self, game: &Game, entered_attack: bool, finished: bool) {
        let players = [game.player_one_id.as_str(), game.player_two_id.as_str()];

        if entered_attack {
            info!("Announcing ATTACK phase for game {}", game.id);
            self.notifications
                .notify_players(
                    &players,
                    &GameEvent::TransitionPhase {
                        is_transitioning: true,
                        countdown: game.transition_countdown(Utc::now()).unwrap_or(0),
                        new_phase: GamePhase::Attack,
                    },
                )
                .await;
        }

        if finished {
            self.notifications
                .notify_players(
                    &players,
                    &GameEvent::GameComplete {
                        winner_id: game.winner_id.clone(),
                        end_reason: game.end_reason,
                    },
                )
                .await;
        }
    }

    /// Rejoining re-runs the game's checks; any progress they make is
    /// announced like a turn's would be.
    pub async fn join_game_room(
        &self,
        game_id: &str,
        player_id: &str,
    ) -> Result<GameView, GameSessionServiceError> {
        info!("Player {} joined room for game {}", player_id, game_id);
        let entry = self.engine.enter_game_room(game_id, player_id).await?;
        self.announce_progress(&entry.game, entry.entered_attack, entry.finished)
            .await;
        Ok(entry.view)
    }

    pub async fn get_game(&self, game_id: &str) -> Result<GameDetails, GameSessionServiceError> {
        Ok(self.engine.get_game(game_id).await?)
    }

    /// Cleans up after a closed connection. The player is only taken off the
    /// queue when the closed connection was still their current one.
    pub async fn handle_disconnect(&self, connection_id: &str, player_id: &str) {
        let owner = self.notifications.remove_connection_by_id(connection_id).await;
        if owner.as_deref() == Some(player_id) {
            self.matchmaking.remove_player(player_id).await;
        }
    }
}
