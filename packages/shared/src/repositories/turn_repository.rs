use std::collections::HashMap;

use crate::models::game::GamePhase;
use crate::models::turn::{ledger_prefix, Turn};
use crate::repositories::errors::turn_repository_errors::TurnRepositoryError;
use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, Select};
use aws_sdk_dynamodb::Client;

#[cfg(test)]
use mockall::automock;

/// Append-only record of every turn played.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TurnRepository: Send + Sync {
    /// Stores a turn. Fails with `AlreadyExists` if the same
    /// `(game_id, player_id, phase, turn_number)` was stored before.
    async fn create_turn(&self, turn: &Turn) -> Result<(), TurnRepositoryError>;

    async fn count_turns(
        &self,
        game_id: &str,
        player_id: &str,
        phase: GamePhase,
    ) -> Result<u32, TurnRepositoryError>;

    /// Turns for one player and phase, ordered by turn number.
    async fn find_turns(
        &self,
        game_id: &str,
        player_id: &str,
        phase: GamePhase,
    ) -> Result<Vec<Turn>, TurnRepositoryError>;

    /// Every turn of a game, ordered by creation time.
    async fn find_game_turns(&self, game_id: &str) -> Result<Vec<Turn>, TurnRepositoryError>;
}

/// Turns live in one table keyed by `gameId` (partition) and `turnKey`
/// (sort, `5:alice#DEFENSE#0001`), so a prefix query returns a player's phase
/// history already in turn order.
pub struct DynamoDbTurnRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbTurnRepository {
    pub fn new(client: Client, table_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
        }
    }

    async fn query_items(
        &self,
        game_id: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<HashMap<String, AttributeValue>>, TurnRepositoryError> {
        let mut items = Vec::new();
        let mut start_key = None;

        loop {
            let mut request = self
                .client
                .query()
                .table_name(&self.table_name)
                .expression_attribute_values(":game_id", AttributeValue::S(game_id.to_string()))
                .consistent_read(true)
                .set_exclusive_start_key(start_key);

            request = match prefix {
                Some(prefix) => request
                    .key_condition_expression(
                        "gameId = :game_id AND begins_with(turnKey, :prefix)",
                    )
                    .expression_attribute_values(":prefix", AttributeValue::S(prefix.to_string())),
                None => request.key_condition_expression("gameId = :game_id"),
            };

            let output = request
                .send()
                .await
                .map_err(|e| TurnRepositoryError::DynamoDb(e.into_service_error().to_string()))?;

            items.extend(output.items.unwrap_or_default());

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(items)
    }
}

fn turns_from_items(
    items: Vec<HashMap<String, AttributeValue>>,
) -> Result<Vec<Turn>, TurnRepositoryError> {
    items
        .into_iter()
        .map(|item| {
            serde_dynamo::from_item(item)
                .map_err(|e| TurnRepositoryError::Serialization(e.to_string()))
        })
        .collect()
}

#[async_trait]
impl TurnRepository for DynamoDbTurnRepository {
    async fn create_turn(&self, turn: &Turn) -> Result<(), TurnRepositoryError> {
        let mut item: HashMap<String, AttributeValue> = serde_dynamo::to_item(turn)
            .map_err(|e| TurnRepositoryError::Serialization(e.to_string()))?;
        item.insert("turnKey".to_string(), AttributeValue::S(turn.ledger_key()));

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(turnKey)")
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_conditional_check_failed_exception() {
                    TurnRepositoryError::AlreadyExists
                } else {
                    TurnRepositoryError::DynamoDb(service_error.to_string())
                }
            })?;

        Ok(())
    }

    async fn count_turns(
        &self,
        game_id: &str,
        player_id: &str,
        phase: GamePhase,
    ) -> Result<u32, TurnRepositoryError> {
        let prefix = ledger_prefix(player_id, phase);
        let mut total: u32 = 0;
        let mut start_key = None;

        loop {
            let output = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("gameId = :game_id AND begins_with(turnKey, :prefix)")
                .expression_attribute_values(":game_id", AttributeValue::S(game_id.to_string()))
                .expression_attribute_values(":prefix", AttributeValue::S(prefix.clone()))
                .select(Select::Count)
                .consistent_read(true)
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| TurnRepositoryError::DynamoDb(e.into_service_error().to_string()))?;

            total += output.count.max(0) as u32;

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(total)
    }

    async fn find_turns(
        &self,
        game_id: &str,
        player_id: &str,
        phase: GamePhase,
    ) -> Result<Vec<Turn>, TurnRepositoryError> {
        let prefix = ledger_prefix(player_id, phase);
        let items = self.query_items(game_id, Some(&prefix)).await?;
        let mut turns = turns_from_items(items)?;
        turns.sort_by_key(|turn| turn.turn_number);
        Ok(turns)
    }

    async fn find_game_turns(&self, game_id: &str) -> Result<Vec<Turn>, TurnRepositoryError> {
        let items = self.query_items(game_id, None).await?;
        let mut turns = turns_from_items(items)?;
        turns.sort_by_key(|turn| turn.created_at);
        Ok(turns)
    }
}
