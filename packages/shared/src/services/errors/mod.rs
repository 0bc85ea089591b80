pub mod game_engine_errors;
pub mod game_session_service_errors;
pub mod matchmaking_service_errors;
pub mod oracle_errors;
