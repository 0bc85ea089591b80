use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use duel_api::{app, build_state};
use duel_shared::models::game::GameSettings;
use duel_shared::models::turn::Turn;
use duel_shared::repositories::memory::{InMemoryGameRepository, InMemoryTurnRepository};
use duel_shared::services::errors::oracle_errors::OracleError;
use duel_shared::services::game_engine::EngineConfig;
use duel_shared::services::oracle::Oracle;

/// Deterministic stand-in for the language model. Judges a secret revealed
/// when the attacker wrote "leak".
pub struct ScriptedOracle {
    pub available: bool,
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn generate_reply(&self, _: &str, history: &[Turn], message: &str) -> Result<String, OracleError> {
        if !self.available {
            return Err(OracleError::Api {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(format!("[{}] {}", history.len() + 1, message))
    }

    async fn summarize(&self, turns: &[Turn]) -> Result<String, OracleError> {
        Ok(format!("{} training turns", turns.len()))
    }

    async fn judge_secret_revealed(&self, _: &str, transcript: &[Turn]) -> Result<bool, OracleError> {
        Ok(transcript.iter().any(|t| t.player_message.contains("leak")))
    }
}

pub fn test_app(oracle_available: bool, max_turns_per_phase: u32) -> Router {
    let state = build_state(
        Arc::new(InMemoryGameRepository::new()),
        Arc::new(InMemoryTurnRepository::new()),
        Arc::new(ScriptedOracle {
            available: oracle_available,
        }),
        EngineConfig {
            settings: GameSettings {
                max_turns_per_phase,
                ..GameSettings::default()
            },
            ..EngineConfig::default()
        },
    );
    app(state)
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Router failed to respond");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Response body was not JSON")
    };
    (status, value)
}

/// Queues two players and returns the id of the game they were matched into.
pub async fn start_game(app: &Router, first: &str, second: &str) -> String {
    let (status, _) = send(app, "POST", "/queue/join", Some(serde_json::json!({ "playerId": first }))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(app, "POST", "/queue/join", Some(serde_json::json!({ "playerId": second }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "matched");
    body["game"]["id"].as_str().expect("game id").to_string()
}
