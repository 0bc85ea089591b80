pub mod connection_repository_errors;
pub mod game_repository_errors;
pub mod scenario_repository_errors;
pub mod turn_repository_errors;
