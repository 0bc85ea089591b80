use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

use duel_shared::repositories::connection_repository::InMemoryConnectionRepository;
use duel_shared::repositories::game_repository::GameRepository;
use duel_shared::repositories::scenario_repository::InMemoryScenarioRepository;
use duel_shared::repositories::turn_repository::TurnRepository;
use duel_shared::services::game_engine::{EngineConfig, GameEngine};
use duel_shared::services::game_session_service::GameSessionService;
use duel_shared::services::matchmaking_service::MatchmakingService;
use duel_shared::services::notification_service::NotificationService;
use duel_shared::services::oracle::Oracle;
use duel_shared::services::scenario_service::ScenarioService;

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use state::AppState;

/// Wires the services around the given ledger and oracle. Matchmaking and
/// connections are always process-local.
pub fn build_state(
    game_repository: Arc<dyn GameRepository>,
    turn_repository: Arc<dyn TurnRepository>,
    oracle: Arc<dyn Oracle>,
    engine_config: EngineConfig,
) -> AppState {
    let scenario_service = ScenarioService::new(Arc::new(InMemoryScenarioRepository::with_default_catalog()));
    let engine = GameEngine::new(
        game_repository,
        turn_repository,
        scenario_service,
        oracle,
        engine_config,
    );
    let notifications = NotificationService::new(Arc::new(InMemoryConnectionRepository::new()));

    AppState {
        session_service: Arc::new(GameSessionService::new(
            Arc::new(MatchmakingService::new()),
            Arc::new(engine),
            notifications,
        )),
    }
}

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .merge(routes::queue::routes())
        .merge(routes::game::routes())
        .merge(routes::websocket::routes())
        .layer(cors)
        .with_state(state)
}
