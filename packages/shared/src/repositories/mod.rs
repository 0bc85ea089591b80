pub mod connection_repository;
pub mod errors;
pub mod game_repository;
pub mod memory;
pub mod scenario_repository;
pub mod turn_repository;
