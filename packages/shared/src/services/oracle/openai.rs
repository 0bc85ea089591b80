use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::models::turn::Turn;
use crate::services::errors::oracle_errors::OracleError;
use crate::services::oracle::prompts::{
    format_transcript, judge_prompt, parse_verdict, SUMMARY_INSTRUCTIONS,
};
use crate::services::oracle::Oracle;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

impl OpenAiConfig {
    pub fn new(api_key: &str) -> Self {
        OpenAiConfig {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn new(role: &str, content: &str) -> Self {
        ChatMessage {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Oracle backed by an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct OpenAiOracle {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiOracle {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, OracleError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            temperature,
            max_tokens,
        };

        debug!(
            "Sending chat completion with {} messages to {}",
            request.messages.len(),
            self.config.api_url
        );

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        if !status.is_success() {
            error!("Chat completion failed with status {}: {}", status, body);
            return Err(OracleError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| OracleError::InvalidResponse("response had no choices".to_string()))
    }
}

fn conversation(persona_prompt: &str, history: &[Turn], message: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(ChatMessage::new("system", persona_prompt));
    for turn in history {
        messages.push(ChatMessage::new("user", &turn.player_message));
        messages.push(ChatMessage::new("assistant", &turn.ai_response));
    }
    messages.push(ChatMessage::new("user", message));
    messages
}

#[async_trait]
impl Oracle for OpenAiOracle {
    async fn generate_reply(
        &self,
        persona_prompt: &str,
        history: &[Turn],
        message: &str,
    ) -> Result<String, OracleError> {
        self.complete(conversation(persona_prompt, history, message), 0.7, 150)
            .await
    }

    async fn summarize(&self, turns: &[Turn]) -> Result<String, OracleError> {
        let messages = vec![
            ChatMessage::new("system", SUMMARY_INSTRUCTIONS),
            ChatMessage::new("user", &format_transcript(turns, "Player")),
        ];
        self.complete(messages, 0.5, 150).await
    }

    async fn judge_secret_revealed(
        &self,
        secret: &str,
        transcript: &[Turn],
    ) -> Result<bool, OracleError> {
        let messages = vec![ChatMessage::new("system", &judge_prompt(secret, transcript))];
        let answer = self.complete(messages, 0.1, 5).await?;
        debug!("Judge verdict: {}", answer.trim());
        Ok(parse_verdict(&answer))
    }
}
