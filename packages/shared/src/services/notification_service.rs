use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::models::events::GameEvent;
use crate::repositories::connection_repository::{ConnectionRepository, ConnectionSender};
use crate::repositories::errors::connection_repository_errors::ConnectionRepositoryError;

/// Pushes [`GameEvent`]s to whichever connection a player currently holds.
#[derive(Clone)]
pub struct NotificationService {
    repository: Arc<dyn ConnectionRepository>,
}

impl NotificationService {
    pub fn new(repository: Arc<dyn ConnectionRepository>) -> Self {
        Self { repository }
    }

    pub async fn store_connection(&self, player_id: &str, connection_id: &str, sender: ConnectionSender) {
        info!("Storing WebSocket connection for player: {}", player_id);
        self.repository
            .store_connection(player_id, connection_id, sender)
            .await
    }

    pub async fn remove_connection_by_id(&self, connection_id: &str) -> Option<String> {
        info!("Removing WebSocket connection by ID: {}", connection_id);
        self.repository.remove_connection_by_id(connection_id).await
    }

    pub async fn get_connection_id(&self, player_id: &str) -> Option<String> {
        self.repository.get_connection_id(player_id).await
    }

    /// Sends `event` to the player if they are connected. A player without a
    /// connection is skipped, not an error.
    pub async fn send_notification(
        &self,
        player_id: &str,
        event: &GameEvent,
    ) -> Result<(), ConnectionRepositoryError> {
        let Some(connection_id) = self.get_connection_id(player_id).await else {
            info!(
                "Player {} is not connected, skipping notification",
                player_id
            );
            return Ok(());
        };

        let payload = serde_json::to_string(event)
            .map_err(|e| ConnectionRepositoryError::SendFailed(e.to_string()))?;
        debug!("Sending notification to player {}: {}", player_id, payload);
        self.repository.send_message(&connection_id, &payload).await
    }

    /// Best-effort fan-out. Delivery failures are logged per player.
    pub async fn notify_players(&self, player_ids: &[&str], event: &GameEvent) {
        for player_id in player_ids {
            if let Err(e) = self.send_notification(player_id, event).await {
                warn!("Failed to notify player {}: {}", player_id, e);
            }
        }
    }
}
