//! Text generation and judgement behind the AI personas.
//!
//! The engine talks to an [`Oracle`] and never to a model provider directly.
//! [`OpenAiOracle`] speaks the chat-completions protocol; [`RetryingOracle`]
//! wraps any oracle with per-call timeouts and bounded retries.

pub mod openai;
pub mod prompts;
pub mod retry;

use async_trait::async_trait;

use crate::models::turn::Turn;
use crate::services::errors::oracle_errors::OracleError;

pub use openai::{OpenAiConfig, OpenAiOracle};
pub use retry::{RetryPolicy, RetryingOracle};

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Replies in character. Holds no conversation state between calls, so
    /// `history` must carry every earlier turn of the current phase.
    async fn generate_reply(
        &self,
        persona_prompt: &str,
        history: &[Turn],
        message: &str,
    ) -> Result<String, OracleError>;

    /// Condenses a training transcript into a short synopsis.
    async fn summarize(&self, turns: &[Turn]) -> Result<String, OracleError>;

    /// Whether `transcript` gives away `secret`. Approximate by nature.
    async fn judge_secret_revealed(
        &self,
        secret: &str,
        transcript: &[Turn],
    ) -> Result<bool, OracleError>;
}
