pub mod events;
pub mod game;
pub mod matchmaking;
pub mod scenario;
pub mod turn;
