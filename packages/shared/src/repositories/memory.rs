//! Process-local repositories, used by the development server and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::game::{Game, GamePhase};
use crate::models::turn::Turn;
use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use crate::repositories::errors::turn_repository_errors::TurnRepositoryError;
use crate::repositories::game_repository::GameRepository;
use crate::repositories::turn_repository::TurnRepository;

#[derive(Default)]
pub struct InMemoryGameRepository {
    games: RwLock<HashMap<String, Game>>,
}

impl InMemoryGameRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    async fn create_game(&self, game: &Game) -> Result<(), GameRepositoryError> {
        let mut games = self.games.write().await;
        if games.contains_key(&game.id) {
            return Err(GameRepositoryError::AlreadyExists);
        }
        games.insert(game.id.clone(), game.clone());
        Ok(())
    }

    async fn get_game(&self, game_id: &str) -> Result<Option<Game>, GameRepositoryError> {
        Ok(self.games.read().await.get(game_id).cloned())
    }

    async fn update_game(&self, game: &Game) -> Result<(), GameRepositoryError> {
        let mut games = self.games.write().await;
        match games.get_mut(&game.id) {
            Some(stored) => {
                *stored = game.clone();
                Ok(())
            }
            None => Err(GameRepositoryError::NotFound),
        }
    }
}

#[derive(Default)]
pub struct InMemoryTurnRepository {
    turns: RwLock<Vec<Turn>>,
}

impl InMemoryTurnRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn same_slot(turn: &Turn, game_id: &str, player_id: &str, phase: GamePhase) -> bool {
    turn.game_id == game_id && turn.player_id == player_id && turn.phase == phase
}

#[async_trait]
impl TurnRepository for InMemoryTurnRepository {
    async fn create_turn(&self, turn: &Turn) -> Result<(), TurnRepositoryError> {
        let mut turns = self.turns.write().await;
        let duplicate = turns.iter().any(|existing| {
            same_slot(existing, &turn.game_id, &turn.player_id, turn.phase)
                && existing.turn_number == turn.turn_number
        });
        if duplicate {
            return Err(TurnRepositoryError::AlreadyExists);
        }
        turns.push(turn.clone());
        Ok(())
    }

    async fn count_turns(
        &self,
        game_id: &str,
        player_id: &str,
        phase: GamePhase,
    ) -> Result<u32, TurnRepositoryError> {
        let turns = self.turns.read().await;
        let count = turns
            .iter()
            .filter(|turn| same_slot(turn, game_id, player_id, phase))
            .count();
        Ok(count as u32)
    }

    async fn find_turns(
        &self,
        game_id: &str,
        player_id: &str,
        phase: GamePhase,
    ) -> Result<Vec<Turn>, TurnRepositoryError> {
        let turns = self.turns.read().await;
        let mut matching: Vec<Turn> = turns
            .iter()
            .filter(|turn| same_slot(turn, game_id, player_id, phase))
            .cloned()
            .collect();
        matching.sort_by_key(|turn| turn.turn_number);
        Ok(matching)
    }

    async fn find_game_turns(&self, game_id: &str) -> Result<Vec<Turn>, TurnRepositoryError> {
        let turns = self.turns.read().await;
        let mut matching: Vec<Turn> = turns
            .iter()
            .filter(|turn| turn.game_id == game_id)
            .cloned()
            .collect();
        matching.sort_by_key(|turn| turn.created_at);
        Ok(matching)
    }
}
