use std::sync::Arc;

use duel_shared::services::game_session_service::GameSessionService;

#[derive(Clone)]
pub struct AppState {
    pub session_service: Arc<GameSessionService>,
}
