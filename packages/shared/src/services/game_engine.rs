use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use crate::models::game::{
    Game, GameDetails, GameEndReason, GamePhase, GameSettings, GameStatus, GameSummary, GameView,
    TransitionData,
};
use crate::models::turn::Turn;
use crate::repositories::game_repository::GameRepository;
use crate::repositories::turn_repository::TurnRepository;
use crate::services::errors::game_engine_errors::GameEngineError;
use crate::services::oracle::prompts::persona_prompt;
use crate::services::oracle::Oracle;
use crate::services::scenario_service::ScenarioService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub settings: GameSettings,
    /// How long clients show the DEFENSE→ATTACK countdown.
    pub transition_countdown: Duration,
    /// Append the defender's training summary to the persona prompt during ATTACK.
    pub include_defense_summary: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            settings: GameSettings::default(),
            transition_countdown: Duration::from_secs(5),
            include_defense_summary: false,
        }
    }
}

/// A stored turn together with the game as it stood once the post-turn
/// checks had run.
#[derive(Debug, Clone)]
pub struct TurnSubmission {
    pub turn: Turn,
    pub game: Game,
    /// This turn completed DEFENSE for both players.
    pub entered_attack: bool,
    /// This turn finished the game.
    pub finished: bool,
}

/// A rejoin view plus what re-running the checks changed on the way.
#[derive(Debug, Clone)]
pub struct RoomEntry {
    pub view: GameView,
    pub game: Game,
    pub entered_attack: bool,
    pub finished: bool,
}

type LockRegistry = DashMap<String, Arc<Mutex<()>>>;

/// Holds one game's lock. On release the registry entry is dropped unless
/// another caller is already waiting on it.
struct GameLock<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    game_id: String,
    locks: &'a LockRegistry,
}

impl Drop for GameLock<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.game_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// The phase/turn state machine.
///
/// Every mutation of a game runs under that game's own lock, so concurrent
/// submissions for one game are serialized while different games proceed
/// independently. Public methods take the lock; the `*_locked` helpers
/// assume it is held.
pub struct GameEngine {
    game_repository: Arc<dyn GameRepository>,
    turn_repository: Arc<dyn TurnRepository>,
    scenario_service: ScenarioService,
    oracle: Arc<dyn Oracle>,
    config: EngineConfig,
    locks: LockRegistry,
}

impl GameEngine {
    pub fn new(
        game_repository: Arc<dyn GameRepository>,
        turn_repository: Arc<dyn TurnRepository>,
        scenario_service: ScenarioService,
        oracle: Arc<dyn Oracle>,
        config: EngineConfig,
    ) -> Self {
        Self {
            game_repository,
            turn_repository,
            scenario_service,
            oracle,
            config,
            locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn lock_game(&self, game_id: &str) -> GameLock<'_> {
        let lock = self.locks.entry(game_id.to_string()).or_default().clone();
        GameLock {
            guard: Some(lock.lock_owned().await),
            game_id: game_id.to_string(),
            locks: &self.locks,
        }
    }

    async fn load_game(&self, game_id: &str) -> Result<Game, GameEngineError> {
        self.game_repository
            .get_game(game_id)
            .await?
            .ok_or_else(|| GameEngineError::GameNotFound(game_id.to_string()))
    }

    async fn save_game(&self, mut game: Game) -> Result<Game, GameEngineError> {
        game.updated_at = Utc::now();
        self.game_repository.update_game(&game).await?;
        Ok(game)
    }

    pub async fn create_game_from_match(
        &self,
        player_one_id: &str,
        player_two_id: &str,
    ) -> Result<Game, GameEngineError> {
        let scenario = self.scenario_service.generate_scenario().await?;
        let game = Game::new(player_one_id, player_two_id, &scenario, &self.config.settings);
        self.game_repository.create_game(&game).await?;

        info!(
            "Created game {} for {} vs {} from template {}",
            game.id, player_one_id, player_two_id, game.template_id
        );
        Ok(game)
    }

    /// Checks that `player_id` may send `message` in `game` right now. Does
    /// not look at turn counts.
    pub fn validate_turn(game: &Game, player_id: &str, message: &str) -> Result<(), GameEngineError> {
        if game.status != GameStatus::InProgress {
            return Err(GameEngineError::InvalidState(game.id.clone()));
        }

        let length = message.trim().chars().count();
        if length > game.max_chars_per_message {
            return Err(GameEngineError::MessageTooLong {
                limit: game.max_chars_per_message,
                actual: length,
            });
        }

        if !game.is_player(player_id) {
            return Err(GameEngineError::PlayerNotInGame(player_id.to_string()));
        }

        Ok(())
    }

    pub async fn get_turn_count(
        &self,
        game_id: &str,
        player_id: &str,
        phase: GamePhase,
    ) -> Result<u32, GameEngineError> {
        Ok(self
            .turn_repository
            .count_turns(game_id, player_id, phase)
            .await?)
    }

    pub async fn get_turns(
        &self,
        game_id: &str,
        player_id: &str,
        phase: GamePhase,
    ) -> Result<Vec<Turn>, GameEngineError> {
        Ok(self
            .turn_repository
            .find_turns(game_id, player_id, phase)
            .await?)
    }

    pub async fn submit_turn(
        &self,
        game_id: &str,
        player_id: &str,
        message: &str,
    ) -> Result<Turn, GameEngineError> {
        self.submit_turn_with_outcome(game_id, player_id, message)
            .await
            .map(|submission| submission.turn)
    }

    /// Records one turn: validate, enforce the phase limit, ask the addressed
    /// AI for a reply, store the turn, then advance the phase or finish the
    /// game if this turn completed it.
    pub async fn submit_turn_with_outcome(
        &self,
        game_id: &str,
        player_id: &str,
        message: &str,
    ) -> Result<TurnSubmission, GameEngineError> {
        let _guard = self.lock_game(game_id).await;

        let game = self.load_game(game_id).await?;
        Self::validate_turn(&game, player_id, message)?;

        let phase = game.phase;
        let count = self.get_turn_count(game_id, player_id, phase).await?;
        if count >= game.max_turns_per_phase {
            debug!(
                "Player {} hit the {} turn limit in game {}",
                player_id, phase, game_id
            );
            return Err(GameEngineError::TurnLimitReached {
                limit: game.max_turns_per_phase,
            });
        }

        let prompt = self.persona_prompt_for(&game, player_id)?;
        let history = self.get_turns(game_id, player_id, phase).await?;
        let reply = self
            .oracle
            .generate_reply(&prompt, &history, message)
            .await
            .map_err(|e| {
                error!("Reply generation failed in game {}: {}", game_id, e);
                GameEngineError::from(e)
            })?;

        let turn = Turn::new(game_id, player_id, phase, count + 1, message, &reply);
        self.turn_repository.create_turn(&turn).await?;
        info!(
            "Player {} played {} turn {} in game {}",
            player_id, phase, turn.turn_number, game_id
        );

        let after = match self.run_checks_locked(game.clone()).await {
            Ok(after) => after,
            Err(e) => {
                warn!("Post-turn checks failed for game {}: {}", game_id, e);
                game.clone()
            }
        };

        Ok(TurnSubmission {
            entered_attack: game.phase == GamePhase::Defense && after.phase == GamePhase::Attack,
            finished: !game.is_finished() && after.is_finished(),
            turn,
            game: after,
        })
    }

    /// DEFENSE talks to the player's own AI; ATTACK to the opponent's.
    fn persona_prompt_for(&self, game: &Game, player_id: &str) -> Result<String, GameEngineError> {
        let owner = match game.phase {
            GamePhase::Defense => player_id,
            GamePhase::Attack => game
                .opponent_of(player_id)
                .ok_or_else(|| GameEngineError::PlayerNotInGame(player_id.to_string()))?,
        };
        let secret = game
            .secret_of(owner)
            .ok_or_else(|| GameEngineError::PlayerNotInGame(owner.to_string()))?;

        let training = if game.phase == GamePhase::Attack && self.config.include_defense_summary {
            game.defense_summary_of(owner)
        } else {
            None
        };

        Ok(persona_prompt(&game.generated_character, secret, training))
    }

    async fn run_checks_locked(&self, game: Game) -> Result<Game, GameEngineError> {
        let game = self.phase_transition_locked(game).await?;
        let (game, _) = self.game_end_locked(game).await?;
        Ok(game)
    }

    pub async fn check_phase_transition(&self, game_id: &str) -> Result<Game, GameEngineError> {
        let _guard = self.lock_game(game_id).await;
        let game = self.load_game(game_id).await?;
        self.phase_transition_locked(game).await
    }

    async fn phase_transition_locked(&self, game: Game) -> Result<Game, GameEngineError> {
        if game.phase != GamePhase::Defense || game.is_finished() {
            return Ok(game);
        }

        let p1 = self
            .get_turn_count(&game.id, &game.player_one_id, GamePhase::Defense)
            .await?;
        let p2 = self
            .get_turn_count(&game.id, &game.player_two_id, GamePhase::Defense)
            .await?;

        if p1 >= game.max_turns_per_phase && p2 >= game.max_turns_per_phase {
            self.transition_locked(game).await
        } else {
            Ok(game)
        }
    }

    pub async fn transition_to_attack(&self, game_id: &str) -> Result<Game, GameEngineError> {
        let _guard = self.lock_game(game_id).await;
        let game = self.load_game(game_id).await?;
        self.transition_locked(game).await
    }

    async fn transition_locked(&self, mut game: Game) -> Result<Game, GameEngineError> {
        if game.phase == GamePhase::Attack {
            return Ok(game);
        }

        let p1_summary = self.summarize_defense(&game.id, &game.player_one_id).await?;
        let p2_summary = self.summarize_defense(&game.id, &game.player_two_id).await?;

        let countdown = chrono::Duration::from_std(self.config.transition_countdown)
            .unwrap_or_else(|_| chrono::Duration::seconds(5));

        game.phase = GamePhase::Attack;
        game.player_one_defense_summary = Some(p1_summary);
        game.player_two_defense_summary = Some(p2_summary);
        game.transition_ends_at = Some(Utc::now() + countdown);

        let game = self.save_game(game).await?;
        info!("Game {} moved to ATTACK", game.id);
        Ok(game)
    }

    async fn summarize_defense(&self, game_id: &str, player_id: &str) -> Result<String, GameEngineError> {
        let turns = self.get_turns(game_id, player_id, GamePhase::Defense).await?;
        self.oracle.summarize(&turns).await.map_err(|e| {
            error!(
                "Summarizing defense of {} in game {} failed: {}",
                player_id, game_id, e
            );
            GameEngineError::from(e)
        })
    }

    pub async fn end_transition(&self, game_id: &str) -> Result<Game, GameEngineError> {
        let _guard = self.lock_game(game_id).await;
        let game = self.load_game(game_id).await?;
        self.end_transition_locked(game).await
    }

    async fn end_transition_locked(&self, mut game: Game) -> Result<Game, GameEngineError> {
        if game.transition_ends_at.is_none() {
            return Ok(game);
        }
        game.transition_ends_at = None;
        debug!("Transition window closed for game {}", game.id);
        self.save_game(game).await
    }

    /// Whether the game is over, finishing it first if both players have
    /// used up their ATTACK turns.
    pub async fn check_game_end(&self, game_id: &str) -> Result<bool, GameEngineError> {
        let _guard = self.lock_game(game_id).await;
        let game = self.load_game(game_id).await?;
        let (_, finished) = self.game_end_locked(game).await?;
        Ok(finished)
    }

    async fn game_end_locked(&self, game: Game) -> Result<(Game, bool), GameEngineError> {
        if game.is_finished() {
            return Ok((game, true));
        }
        if game.phase != GamePhase::Attack {
            return Ok((game, false));
        }

        let p1 = self
            .get_turn_count(&game.id, &game.player_one_id, GamePhase::Attack)
            .await?;
        let p2 = self
            .get_turn_count(&game.id, &game.player_two_id, GamePhase::Attack)
            .await?;

        if p1 >= game.max_turns_per_phase && p2 >= game.max_turns_per_phase {
            let game = self.winner_locked(game).await?;
            Ok((game, true))
        } else {
            Ok((game, false))
        }
    }

    /// Judges both ATTACK transcripts and finishes the game. A finished game
    /// is returned unchanged without consulting the judge.
    pub async fn determine_winner(&self, game_id: &str) -> Result<Game, GameEngineError> {
        let _guard = self.lock_game(game_id).await;
        let game = self.load_game(game_id).await?;
        self.winner_locked(game).await
    }

    async fn winner_locked(&self, mut game: Game) -> Result<Game, GameEngineError> {
        if game.is_finished() {
            return Ok(game);
        }

        let p1_attack = self
            .get_turns(&game.id, &game.player_one_id, GamePhase::Attack)
            .await?;
        let p2_attack = self
            .get_turns(&game.id, &game.player_two_id, GamePhase::Attack)
            .await?;

        let p1_succeeded = self
            .oracle
            .judge_secret_revealed(&game.player_two_secret, &p1_attack)
            .await?;
        let p2_succeeded = self
            .oracle
            .judge_secret_revealed(&game.player_one_secret, &p2_attack)
            .await?;

        let (winner_id, end_reason) = match (p1_succeeded, p2_succeeded) {
            (true, false) => (Some(game.player_one_id.clone()), GameEndReason::SecretRevealed),
            (false, true) => (Some(game.player_two_id.clone()), GameEndReason::SecretRevealed),
            (true, true) | (false, false) => (None, GameEndReason::Draw),
        };

        game.status = GameStatus::Finished;
        game.winner_id = winner_id;
        game.end_reason = Some(end_reason);
        game.transition_ends_at = None;

        let game = self.save_game(game).await?;
        info!(
            "Game {} finished: winner {:?}, reason {:?}",
            game.id, game.winner_id, end_reason
        );
        Ok(game)
    }

    pub async fn find_game(&self, game_id: &str) -> Result<Game, GameEngineError> {
        self.load_game(game_id).await
    }

    pub async fn get_game(&self, game_id: &str) -> Result<GameDetails, GameEngineError> {
        let game = self.load_game(game_id).await?;
        let turns = self.turn_repository.find_game_turns(game_id).await?;
        Ok(GameDetails {
            game: GameSummary::from(&game),
            turns,
        })
    }

    /// Everything a returning player needs to pick the game up again.
    pub async fn get_game_view(&self, game_id: &str, player_id: &str) -> Result<GameView, GameEngineError> {
        self.enter_game_room(game_id, player_id)
            .await
            .map(|entry| entry.view)
    }

    /// Builds the rejoin view after re-running the phase and end checks, so
    /// a game whose last check failed gets another chance to advance. The
    /// returned flags say whether that happened here.
    pub async fn enter_game_room(&self, game_id: &str, player_id: &str) -> Result<RoomEntry, GameEngineError> {
        let _guard = self.lock_game(game_id).await;

        let before = self.load_game(game_id).await?;
        if !before.is_player(player_id) {
            return Err(GameEngineError::NotAPlayer(player_id.to_string()));
        }

        let game = match self.run_checks_locked(before.clone()).await {
            Ok(game) => game,
            Err(e) => {
                warn!("Checks on rejoin failed for game {}: {}", game_id, e);
                before.clone()
            }
        };
        let entered_attack = before.phase == GamePhase::Defense && game.phase == GamePhase::Attack;
        let finished = !before.is_finished() && game.is_finished();

        let countdown = game.transition_countdown(Utc::now());
        let game = if countdown.is_none() {
            self.end_transition_locked(game).await?
        } else {
            game
        };

        let phase = game.phase;
        let opponent_id = game.opponent_of(player_id).unwrap_or_default().to_string();
        let turns = self.get_turns(game_id, player_id, phase).await?;
        let opponent_message_count = self.get_turn_count(game_id, &opponent_id, phase).await?;

        let view = GameView {
            game: GameSummary::from(&game),
            my_secret: game.secret_of(player_id).unwrap_or_default().to_string(),
            my_defense_summary: game.defense_summary_of(player_id).map(str::to_string),
            phase,
            my_message_count: turns.len() as u32,
            opponent_message_count,
            turns,
            is_game_complete: game.is_finished(),
            transition: countdown.map(|countdown| TransitionData {
                is_transitioning: true,
                countdown,
                new_phase: GamePhase::Attack,
            }),
        };

        Ok(RoomEntry {
            view,
            game,
            entered_attack,
            finished,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scenario::GeneratedScenario;
    use crate::repositories::errors::game_repository_errors::GameRepositoryError;
    use crate::repositories::game_repository::MockGameRepository;
    use crate::repositories::memory::{InMemoryGameRepository, InMemoryTurnRepository};
    use crate::repositories::scenario_repository::InMemoryScenarioRepository;
    use crate::repositories::turn_repository::MockTurnRepository;
    use crate::services::errors::oracle_errors::OracleError;
    use crate::services::oracle::MockOracle;
    use mockall::Sequence;
    use rstest::rstest;

    /// Replies echo the message; the judge calls a secret revealed when the
    /// attacker ever typed "leak".
    fn scripted_oracle() -> MockOracle {
        let mut oracle = MockOracle::new();
        oracle
            .expect_generate_reply()
            .returning(|_, _, message| Ok(format!("AI heard: {}", message)));
        oracle
            .expect_summarize()
            .returning(|turns| Ok(format!("Trained over {} turns.", turns.len())));
        oracle
            .expect_judge_secret_revealed()
            .returning(|_, transcript| Ok(transcript.iter().any(|t| t.player_message.contains("leak"))));
        oracle
    }

    fn small_config() -> EngineConfig {
        EngineConfig {
            settings: GameSettings {
                max_turns_per_phase: 2,
                max_chars_per_message: 250,
            },
            ..EngineConfig::default()
        }
    }

    fn engine_with(oracle: MockOracle, turns: Arc<dyn TurnRepository>, config: EngineConfig) -> GameEngine {
        GameEngine::new(
            Arc::new(InMemoryGameRepository::new()),
            turns,
            ScenarioService::new(Arc::new(InMemoryScenarioRepository::with_default_catalog())),
            Arc::new(oracle),
            config,
        )
    }

    fn engine(oracle: MockOracle, config: EngineConfig) -> GameEngine {
        engine_with(oracle, Arc::new(InMemoryTurnRepository::new()), config)
    }

    async fn play(engine: &GameEngine, game_id: &str, player_id: &str, turns: u32, message: &str) {
        for _ in 0..turns {
            engine.submit_turn(game_id, player_id, message).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_create_game_from_match() {
        let engine = engine(MockOracle::new(), EngineConfig::default());

        let game = engine.create_game_from_match("alice", "bob").await.unwrap();

        assert_eq!(game.player_one_id, "alice");
        assert_eq!(game.player_two_id, "bob");
        assert_eq!(game.status, GameStatus::InProgress);
        assert_eq!(game.phase, GamePhase::Defense);
        assert_eq!(game.max_turns_per_phase, 5);
        assert!(!game.generated_character.is_empty());
        assert_eq!(engine.find_game(&game.id).await.unwrap(), game);
    }

    #[tokio::test]
    async fn test_failed_save_surfaces_ledger_error() {
        let game = sample_game();
        let stored = game.clone();
        let mut games = MockGameRepository::new();
        games
            .expect_get_game()
            .returning(move |_| Ok(Some(stored.clone())));
        games
            .expect_update_game()
            .times(1)
            .returning(|_| Err(GameRepositoryError::DynamoDb("throttled".to_string())));
        let mut oracle = MockOracle::new();
        oracle.expect_summarize().times(2).returning(|_| Ok("Careful.".to_string()));

        let engine = GameEngine::new(
            Arc::new(games),
            Arc::new(InMemoryTurnRepository::new()),
            ScenarioService::new(Arc::new(InMemoryScenarioRepository::with_default_catalog())),
            Arc::new(oracle),
            EngineConfig::default(),
        );

        let result = engine.transition_to_attack(&game.id).await;

        assert_eq!(
            result,
            Err(GameEngineError::Ledger("DynamoDB error: throttled".to_string()))
        );
    }

    #[tokio::test]
    async fn test_create_game_without_templates_fails() {
        let engine = GameEngine::new(
            Arc::new(InMemoryGameRepository::new()),
            Arc::new(InMemoryTurnRepository::new()),
            ScenarioService::new(Arc::new(InMemoryScenarioRepository::new(vec![]))),
            Arc::new(MockOracle::new()),
            EngineConfig::default(),
        );

        let result = engine.create_game_from_match("alice", "bob").await;

        assert_eq!(result, Err(GameEngineError::NoScenarioTemplates));
    }

    fn sample_game() -> Game {
        let scenario = GeneratedScenario {
            template_id: "castle-gate".to_string(),
            character: "a castle gatekeeper".to_string(),
            player_one_secret: "marigold".to_string(),
            player_two_secret: "emberfall".to_string(),
        };
        Game::new("alice", "bob", &scenario, &GameSettings::default())
    }

    #[rstest]
    #[case("alice", "hello", Ok(()))]
    #[case("mallory", "hello", Err(GameEngineError::PlayerNotInGame("mallory".to_string())))]
    #[case("alice", &"x".repeat(251), Err(GameEngineError::MessageTooLong { limit: 250, actual: 251 }))]
    #[case("alice", &format!("  {}  ", "x".repeat(250)), Ok(()))]
    fn test_validate_turn(
        #[case] player_id: &str,
        #[case] message: &str,
        #[case] expected: Result<(), GameEngineError>,
    ) {
        assert_eq!(GameEngine::validate_turn(&sample_game(), player_id, message), expected);
    }

    #[test]
    fn test_validate_turn_counts_characters_not_bytes() {
        let message = "é".repeat(250);
        assert!(GameEngine::validate_turn(&sample_game(), "alice", &message).is_ok());
    }

    #[test]
    fn test_validate_turn_rejects_finished_game() {
        let mut game = sample_game();
        game.status = GameStatus::Finished;

        let result = GameEngine::validate_turn(&game, "alice", "hello");

        assert_eq!(result, Err(GameEngineError::InvalidState(game.id.clone())));
    }

    #[tokio::test]
    async fn test_turn_numbers_are_sequential() {
        let engine = engine(scripted_oracle(), EngineConfig::default());
        let game = engine.create_game_from_match("alice", "bob").await.unwrap();

        play(&engine, &game.id, "alice", 3, "stay quiet").await;

        let turns = engine.get_turns(&game.id, "alice", GamePhase::Defense).await.unwrap();
        let numbers: Vec<u32> = turns.iter().map(|t| t.turn_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(turns[0].ai_response, "AI heard: stay quiet");
        assert_eq!(engine.get_turn_count(&game.id, "bob", GamePhase::Defense).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_turn_limit_reached() {
        let engine = engine(scripted_oracle(), small_config());
        let game = engine.create_game_from_match("alice", "bob").await.unwrap();
        play(&engine, &game.id, "alice", 2, "stay quiet").await;

        let result = engine.submit_turn(&game.id, "alice", "one more").await;

        assert_eq!(result, Err(GameEngineError::TurnLimitReached { limit: 2 }));
        assert_eq!(engine.get_turn_count(&game.id, "alice", GamePhase::Defense).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_validation_runs_before_limit_check() {
        let mut turns = MockTurnRepository::new();
        turns.expect_count_turns().never();
        turns.expect_create_turn().never();
        let engine = engine_with(MockOracle::new(), Arc::new(turns), EngineConfig::default());
        let game = engine.create_game_from_match("alice", "bob").await.unwrap();

        let result = engine.submit_turn(&game.id, "alice", &"x".repeat(251)).await;

        assert_eq!(
            result,
            Err(GameEngineError::MessageTooLong { limit: 250, actual: 251 })
        );
    }

    #[tokio::test]
    async fn test_unknown_game() {
        let engine = engine(MockOracle::new(), EngineConfig::default());

        let result = engine.submit_turn("missing", "alice", "hello").await;

        assert_eq!(result, Err(GameEngineError::GameNotFound("missing".to_string())));
    }

    #[tokio::test]
    async fn test_oracle_failure_records_nothing() {
        let mut turns = MockTurnRepository::new();
        turns.expect_count_turns().returning(|_, _, _| Ok(0));
        turns.expect_find_turns().returning(|_, _, _| Ok(vec![]));
        turns.expect_create_turn().never();

        let mut oracle = MockOracle::new();
        oracle
            .expect_generate_reply()
            .times(1)
            .returning(|_, _, _| Err(OracleError::Timeout(Duration::from_secs(10))));

        let engine = engine_with(oracle, Arc::new(turns), EngineConfig::default());
        let game = engine.create_game_from_match("alice", "bob").await.unwrap();

        let result = engine.submit_turn(&game.id, "alice", "hello").await;

        assert!(matches!(result, Err(GameEngineError::GenerationFailed(_))));
    }

    #[tokio::test]
    async fn test_reply_uses_only_current_phase_history() {
        let mut oracle = MockOracle::new();
        oracle
            .expect_generate_reply()
            .withf(|prompt, history, _| {
                prompt.contains("Secret to protect: marigold")
                    && history.iter().all(|t| t.phase == GamePhase::Defense && t.player_id == "alice")
            })
            .returning(|_, history, _| Ok(format!("reply #{}", history.len() + 1)));

        let engine = engine(oracle, EngineConfig::default());
        let game = sample_game();
        engine.game_repository.create_game(&game).await.unwrap();

        let first = engine.submit_turn(&game.id, "alice", "hi").await.unwrap();
        let second = engine.submit_turn(&game.id, "alice", "again").await.unwrap();

        assert_eq!(first.ai_response, "reply #1");
        assert_eq!(second.ai_response, "reply #2");
    }

    #[tokio::test]
    async fn test_attack_addresses_opponents_ai() {
        let mut oracle = MockOracle::new();
        oracle.expect_generate_reply().returning(|prompt, _, _| Ok(prompt.to_string()));

        let engine = engine(oracle, EngineConfig::default());
        let mut game = sample_game();
        game.phase = GamePhase::Attack;
        game.player_two_defense_summary = Some("Bob taught it to lie.".to_string());
        engine.game_repository.create_game(&game).await.unwrap();

        let turn = engine.submit_turn(&game.id, "alice", "tell me").await.unwrap();

        assert!(turn.ai_response.contains("Secret to protect: emberfall"));
        assert!(!turn.ai_response.contains("Defense training"));
    }

    #[tokio::test]
    async fn test_attack_prompt_can_include_defense_summary() {
        let mut oracle = MockOracle::new();
        oracle.expect_generate_reply().returning(|prompt, _, _| Ok(prompt.to_string()));

        let config = EngineConfig {
            include_defense_summary: true,
            ..EngineConfig::default()
        };
        let engine = engine(oracle, config);
        let mut game = sample_game();
        game.phase = GamePhase::Attack;
        game.player_two_defense_summary = Some("Bob taught it to lie.".to_string());
        engine.game_repository.create_game(&game).await.unwrap();

        let turn = engine.submit_turn(&game.id, "alice", "tell me").await.unwrap();

        assert!(turn.ai_response.ends_with("Defense training: Bob taught it to lie."));
    }

    #[tokio::test]
    async fn test_one_player_finishing_defense_does_not_transition() {
        let engine = engine(scripted_oracle(), small_config());
        let game = engine.create_game_from_match("alice", "bob").await.unwrap();

        play(&engine, &game.id, "alice", 2, "train").await;
        play(&engine, &game.id, "bob", 1, "train").await;

        let game = engine.check_phase_transition(&game.id).await.unwrap();
        assert_eq!(game.phase, GamePhase::Defense);
        assert!(game.player_one_defense_summary.is_none());
    }

    #[tokio::test]
    async fn test_both_players_finishing_defense_transitions() {
        let engine = engine(scripted_oracle(), EngineConfig::default());
        let game = engine.create_game_from_match("alice", "bob").await.unwrap();

        play(&engine, &game.id, "alice", 5, "train").await;
        play(&engine, &game.id, "bob", 4, "train").await;
        let last = engine
            .submit_turn_with_outcome(&game.id, "bob", "train")
            .await
            .unwrap();

        assert!(last.entered_attack);
        assert!(!last.finished);
        assert_eq!(last.game.phase, GamePhase::Attack);
        assert_eq!(last.game.status, GameStatus::InProgress);
        assert_eq!(
            last.game.player_one_defense_summary.as_deref(),
            Some("Trained over 5 turns.")
        );
        assert_eq!(
            last.game.player_two_defense_summary.as_deref(),
            Some("Trained over 5 turns.")
        );
        assert!(last.game.transition_ends_at.is_some());
        assert_eq!(engine.find_game(&game.id).await.unwrap(), last.game);
    }

    #[tokio::test]
    async fn test_transition_is_noop_in_attack() {
        let mut oracle = MockOracle::new();
        oracle.expect_summarize().never();
        let engine = engine(oracle, EngineConfig::default());
        let mut game = sample_game();
        game.phase = GamePhase::Attack;
        engine.game_repository.create_game(&game).await.unwrap();

        let after = engine.transition_to_attack(&game.id).await.unwrap();

        assert_eq!(after, game);
    }

    #[tokio::test]
    async fn test_failed_summary_leaves_game_in_defense_until_rejoin() {
        let mut oracle = MockOracle::new();
        let mut sequence = Sequence::new();
        oracle.expect_generate_reply().returning(|_, _, _| Ok("ok".to_string()));
        oracle
            .expect_summarize()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Err(OracleError::Api { status: 500, body: "down".to_string() }));
        oracle
            .expect_summarize()
            .times(2)
            .in_sequence(&mut sequence)
            .returning(|_| Ok("Careful AI.".to_string()));

        let engine = engine(oracle, small_config());
        let game = engine.create_game_from_match("alice", "bob").await.unwrap();
        play(&engine, &game.id, "alice", 2, "train").await;
        play(&engine, &game.id, "bob", 1, "train").await;

        let last = engine.submit_turn_with_outcome(&game.id, "bob", "train").await.unwrap();
        assert_eq!(last.turn.turn_number, 2);
        assert!(!last.entered_attack);
        assert_eq!(engine.find_game(&game.id).await.unwrap().phase, GamePhase::Defense);

        let retry = engine.submit_turn(&game.id, "bob", "train").await;
        assert_eq!(retry.unwrap_err(), GameEngineError::TurnLimitReached { limit: 2 });

        let entry = engine.enter_game_room(&game.id, "alice").await.unwrap();
        assert!(entry.entered_attack);
        assert!(!entry.finished);
        assert_eq!(entry.game.phase, GamePhase::Attack);
        assert_eq!(entry.view.phase, GamePhase::Attack);
        assert_eq!(entry.view.my_message_count, 0);
        assert!(entry.view.transition.is_some());

        let again = engine.enter_game_room(&game.id, "bob").await.unwrap();
        assert!(!again.entered_attack);
    }

    #[rstest]
    #[case("leak it", "hello", Some("alice"), GameEndReason::SecretRevealed)]
    #[case("hello", "leak it", Some("bob"), GameEndReason::SecretRevealed)]
    #[case("leak it", "leak it", None, GameEndReason::Draw)]
    #[case("hello", "hello", None, GameEndReason::Draw)]
    #[tokio::test]
    async fn test_winner_resolution(
        #[case] alice_attack: &str,
        #[case] bob_attack: &str,
        #[case] winner: Option<&str>,
        #[case] reason: GameEndReason,
    ) {
        let engine = engine(scripted_oracle(), small_config());
        let game = engine.create_game_from_match("alice", "bob").await.unwrap();
        play(&engine, &game.id, "alice", 2, "train").await;
        play(&engine, &game.id, "bob", 2, "train").await;

        play(&engine, &game.id, "alice", 2, alice_attack).await;
        play(&engine, &game.id, "bob", 1, bob_attack).await;
        let last = engine
            .submit_turn_with_outcome(&game.id, "bob", bob_attack)
            .await
            .unwrap();

        assert!(last.finished);
        assert_eq!(last.game.status, GameStatus::Finished);
        assert_eq!(last.game.winner_id.as_deref(), winner);
        assert_eq!(last.game.end_reason, Some(reason));
        assert!(engine.check_game_end(&game.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_judge_checks_each_transcript_against_opponents_secret() {
        let mut oracle = MockOracle::new();
        oracle
            .expect_judge_secret_revealed()
            .withf(|secret, transcript| secret == "emberfall" && transcript.is_empty())
            .times(1)
            .returning(|_, _| Ok(true));
        oracle
            .expect_judge_secret_revealed()
            .withf(|secret, _| secret == "marigold")
            .times(1)
            .returning(|_, _| Ok(false));

        let engine = engine(oracle, EngineConfig::default());
        let mut game = sample_game();
        game.phase = GamePhase::Attack;
        engine.game_repository.create_game(&game).await.unwrap();

        let finished = engine.determine_winner(&game.id).await.unwrap();

        assert_eq!(finished.winner_id.as_deref(), Some("alice"));
        assert_eq!(finished.end_reason, Some(GameEndReason::SecretRevealed));
    }

    #[tokio::test]
    async fn test_determine_winner_is_idempotent() {
        let mut oracle = MockOracle::new();
        oracle
            .expect_judge_secret_revealed()
            .times(2)
            .returning(|_, _| Ok(false));

        let engine = engine(oracle, EngineConfig::default());
        let mut game = sample_game();
        game.phase = GamePhase::Attack;
        engine.game_repository.create_game(&game).await.unwrap();

        let first = engine.determine_winner(&game.id).await.unwrap();
        let second = engine.determine_winner(&game.id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second.end_reason, Some(GameEndReason::Draw));
        assert!(second.winner_id.is_none());
    }

    #[tokio::test]
    async fn test_failed_judgement_leaves_game_in_progress() {
        let mut oracle = MockOracle::new();
        oracle
            .expect_judge_secret_revealed()
            .returning(|_, _| Err(OracleError::InvalidResponse("empty".to_string())));

        let engine = engine(oracle, EngineConfig::default());
        let mut game = sample_game();
        game.phase = GamePhase::Attack;
        engine.game_repository.create_game(&game).await.unwrap();

        let result = engine.determine_winner(&game.id).await;

        assert!(matches!(result, Err(GameEngineError::GenerationFailed(_))));
        assert_eq!(engine.find_game(&game.id).await.unwrap().status, GameStatus::InProgress);
    }

    #[tokio::test]
    async fn test_finished_game_rejects_turns() {
        let engine = engine(MockOracle::new(), EngineConfig::default());
        let mut game = sample_game();
        game.status = GameStatus::Finished;
        engine.game_repository.create_game(&game).await.unwrap();

        let result = engine.submit_turn(&game.id, "alice", "hello").await;

        assert_eq!(result, Err(GameEngineError::InvalidState(game.id.clone())));
    }

    #[tokio::test]
    async fn test_concurrent_submissions_respect_limit() {
        let engine = Arc::new(engine(scripted_oracle(), EngineConfig::default()));
        let game = engine.create_game_from_match("alice", "bob").await.unwrap();

        let handles: Vec<_> = (0..12)
            .map(|i| {
                let engine = Arc::clone(&engine);
                let game_id = game.id.clone();
                tokio::spawn(async move { engine.submit_turn(&game_id, "alice", &format!("msg {}", i)).await })
            })
            .collect();

        let mut accepted = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(GameEngineError::TurnLimitReached { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error: {}", other),
            }
        }

        assert_eq!(accepted, 5);
        assert_eq!(rejected, 7);
        let numbers: Vec<u32> = engine
            .get_turns(&game.id, "alice", GamePhase::Defense)
            .await
            .unwrap()
            .iter()
            .map(|t| t.turn_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert!(engine.locks.is_empty());
    }

    #[tokio::test]
    async fn test_finished_games_leave_no_locks_behind() {
        let engine = engine(scripted_oracle(), small_config());

        for _ in 0..3 {
            let game = engine.create_game_from_match("alice", "bob").await.unwrap();
            for phase_message in ["train", "leak"] {
                play(&engine, &game.id, "alice", 2, phase_message).await;
                play(&engine, &game.id, "bob", 2, phase_message).await;
            }
            assert!(engine.find_game(&game.id).await.unwrap().is_finished());
            engine.get_game_view(&game.id, "alice").await.unwrap();
        }

        assert!(engine.locks.is_empty());
    }

    #[tokio::test]
    async fn test_waiting_caller_keeps_the_lock_registered() {
        let engine = engine(MockOracle::new(), EngineConfig::default());

        let held = engine.lock_game("g1").await;
        let waiter = engine.locks.get("g1").map(|lock| Arc::clone(lock.value()));
        drop(held);
        assert_eq!(engine.locks.len(), 1);

        drop(waiter);
        drop(engine.lock_game("g1").await);
        assert!(engine.locks.is_empty());
    }

    #[tokio::test]
    async fn test_game_view_for_player() {
        let engine = engine(scripted_oracle(), EngineConfig::default());
        let game = engine.create_game_from_match("alice", "bob").await.unwrap();
        play(&engine, &game.id, "alice", 2, "train").await;
        play(&engine, &game.id, "bob", 3, "train").await;

        let view = engine.get_game_view(&game.id, "alice").await.unwrap();

        assert_eq!(view.phase, GamePhase::Defense);
        assert_eq!(view.my_message_count, 2);
        assert_eq!(view.opponent_message_count, 3);
        assert_eq!(view.turns.len(), 2);
        assert!(view.turns.iter().all(|t| t.player_id == "alice"));
        assert!(!view.is_game_complete);
        assert!(view.transition.is_none());
        assert_eq!(Some(view.my_secret.as_str()), game.secret_of("alice"));
    }

    #[tokio::test]
    async fn test_game_view_hides_opponents_secret() {
        let engine = engine(scripted_oracle(), small_config());
        let game = engine.create_game_from_match("alice", "bob").await.unwrap();
        play(&engine, &game.id, "alice", 2, "train").await;
        play(&engine, &game.id, "bob", 2, "guard").await;
        let stored = engine.find_game(&game.id).await.unwrap();
        let bob_secret = stored.player_two_secret.clone();
        assert_ne!(stored.player_one_secret, bob_secret);

        let view = engine.get_game_view(&game.id, "alice").await.unwrap();
        let json = serde_json::to_string(&view).unwrap();

        assert_eq!(view.my_secret, stored.player_one_secret);
        assert_eq!(view.my_defense_summary, stored.player_one_defense_summary);
        assert!(!json.contains(&format!("\"{}\"", bob_secret)));
        assert!(!json.contains("playerTwoSecret") && !json.contains("player_two_secret"));
        assert!(!json.contains("playerTwoDefenseSummary") && !json.contains("player_two_defense_summary"));
    }

    #[tokio::test]
    async fn test_game_view_rejects_spectators() {
        let engine = engine(MockOracle::new(), EngineConfig::default());
        let game = engine.create_game_from_match("alice", "bob").await.unwrap();

        let result = engine.get_game_view(&game.id, "mallory").await;

        assert!(matches!(result, Err(GameEngineError::NotAPlayer(id)) if id == "mallory"));
    }

    #[tokio::test]
    async fn test_expired_transition_is_cleared_on_view() {
        let engine = engine(MockOracle::new(), EngineConfig::default());
        let mut game = sample_game();
        game.phase = GamePhase::Attack;
        game.transition_ends_at = Some(Utc::now() - chrono::Duration::seconds(1));
        engine.game_repository.create_game(&game).await.unwrap();

        let view = engine.get_game_view(&game.id, "bob").await.unwrap();

        assert!(view.transition.is_none());
        assert!(view.game.transition_ends_at.is_none());
        assert!(engine.find_game(&game.id).await.unwrap().transition_ends_at.is_none());
    }

    #[tokio::test]
    async fn test_end_transition_clears_window() {
        let engine = engine(MockOracle::new(), EngineConfig::default());
        let mut game = sample_game();
        game.phase = GamePhase::Attack;
        game.transition_ends_at = Some(Utc::now() + chrono::Duration::seconds(5));
        engine.game_repository.create_game(&game).await.unwrap();

        let after = engine.end_transition(&game.id).await.unwrap();

        assert!(after.transition_ends_at.is_none());
        assert_eq!(after.phase, GamePhase::Attack);
    }

    #[tokio::test]
    async fn test_get_game_includes_all_turns() {
        let engine = engine(scripted_oracle(), EngineConfig::default());
        let game = engine.create_game_from_match("alice", "bob").await.unwrap();
        play(&engine, &game.id, "alice", 1, "first").await;
        play(&engine, &game.id, "bob", 1, "second").await;

        let details = engine.get_game(&game.id).await.unwrap();

        assert_eq!(details.game.id, game.id);
        let messages: Vec<&str> = details.turns.iter().map(|t| t.player_message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }
}
