use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

use crate::repositories::errors::connection_repository_errors::ConnectionRepositoryError;

/// Outbound half of a live client connection. Each message is one JSON text
/// frame.
pub type ConnectionSender = mpsc::UnboundedSender<String>;

#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// Registers `connection_id` as the player's current connection,
    /// replacing any earlier one.
    async fn store_connection(&self, player_id: &str, connection_id: &str, sender: ConnectionSender);

    /// Forgets a connection. Returns the player it belonged to, if the
    /// connection was still that player's current one.
    async fn remove_connection_by_id(&self, connection_id: &str) -> Option<String>;

    async fn get_connection_id(&self, player_id: &str) -> Option<String>;

    async fn send_message(
        &self,
        connection_id: &str,
        message: &str,
    ) -> Result<(), ConnectionRepositoryError>;
}

#[derive(Default)]
struct Registry {
    connections: HashMap<String, (String, ConnectionSender)>,
    players: HashMap<String, String>,
}

#[derive(Default)]
pub struct InMemoryConnectionRepository {
    registry: RwLock<Registry>,
}

impl InMemoryConnectionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRepository for InMemoryConnectionRepository {
    async fn store_connection(&self, player_id: &str, connection_id: &str, sender: ConnectionSender) {
        let mut registry = self.registry.write().await;
        if let Some(previous) = registry
            .players
            .insert(player_id.to_string(), connection_id.to_string())
        {
            debug!(
                "Player {} replaced connection {} with {}",
                player_id, previous, connection_id
            );
            registry.connections.remove(&previous);
        }
        registry
            .connections
            .insert(connection_id.to_string(), (player_id.to_string(), sender));
        info!("Stored connection {} for player: {}", connection_id, player_id);
    }

    async fn remove_connection_by_id(&self, connection_id: &str) -> Option<String> {
        let mut registry = self.registry.write().await;
        let (player_id, _) = registry.connections.remove(connection_id)?;
        if registry.players.get(&player_id).map(String::as_str) == Some(connection_id) {
            registry.players.remove(&player_id);
        }
        info!("Removed connection {} for player: {}", connection_id, player_id);
        Some(player_id)
    }

    async fn get_connection_id(&self, player_id: &str) -> Option<String> {
        self.registry.read().await.players.get(player_id).cloned()
    }

    async fn send_message(
        &self,
        connection_id: &str,
        message: &str,
    ) -> Result<(), ConnectionRepositoryError> {
        let registry = self.registry.read().await;
        let (_, sender) = registry.connections.get(connection_id).ok_or_else(|| {
            ConnectionRepositoryError::ConnectionNotFound(connection_id.to_string())
        })?;
        sender
            .send(message.to_string())
            .map_err(|e| ConnectionRepositoryError::SendFailed(e.to_string()))
    }
}
