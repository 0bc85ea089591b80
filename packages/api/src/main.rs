use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use duel_api::config::{AppConfig, StorageBackend};
use duel_shared::repositories::game_repository::{DynamoDbGameRepository, GameRepository};
use duel_shared::repositories::memory::{InMemoryGameRepository, InMemoryTurnRepository};
use duel_shared::repositories::turn_repository::{DynamoDbTurnRepository, TurnRepository};
use duel_shared::services::oracle::{OpenAiOracle, RetryingOracle};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    let (game_repository, turn_repository) = match &config.storage {
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            let games: Arc<dyn GameRepository> = Arc::new(InMemoryGameRepository::new());
            let turns: Arc<dyn TurnRepository> = Arc::new(InMemoryTurnRepository::new());
            (games, turns)
        }
        StorageBackend::DynamoDb {
            games_table,
            turns_table,
        } => {
            info!("Using DynamoDB tables {} and {}", games_table, turns_table);
            let aws_config = aws_config::load_from_env().await;
            let client = aws_sdk_dynamodb::Client::new(&aws_config);
            let games: Arc<dyn GameRepository> =
                Arc::new(DynamoDbGameRepository::new(client.clone(), games_table));
            let turns: Arc<dyn TurnRepository> =
                Arc::new(DynamoDbTurnRepository::new(client, turns_table));
            (games, turns)
        }
    };

    let oracle = RetryingOracle::new(OpenAiOracle::new(config.openai.clone()), config.retry);
    let state = duel_api::build_state(game_repository, turn_repository, Arc::new(oracle), config.engine);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Listening on {}", config.bind_address);
    axum::serve(listener, duel_api::app(state)).await?;

    Ok(())
}
