use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::models::turn::Turn;
use crate::services::errors::oracle_errors::OracleError;
use crate::services::oracle::Oracle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub call_timeout: Duration,
    /// Delay before the second attempt; doubles after every further failure.
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            call_timeout: Duration::from_secs(10),
            base_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn backoff_for(&self, failed_attempts: u32) -> Duration {
        self.base_backoff
            .saturating_mul(2u32.saturating_pow(failed_attempts.saturating_sub(1)))
    }
}

/// Adds a timeout to every call of the wrapped oracle and retries
/// retryable failures with exponential backoff.
pub struct RetryingOracle<O> {
    inner: O,
    policy: RetryPolicy,
}

impl<O: Oracle> RetryingOracle<O> {
    pub fn new(inner: O, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, OracleError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OracleError>>,
    {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = match tokio::time::timeout(self.policy.call_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(OracleError::Timeout(self.policy.call_timeout)),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    let delay = self.policy.backoff_for(attempt);
                    warn!(
                        "Oracle {} attempt {}/{} failed: {}. Retrying in {}ms",
                        operation,
                        attempt,
                        attempts,
                        err,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    warn!(
                        "Oracle {} failed after {} attempt(s): {}",
                        operation, attempt, err
                    );
                    return Err(err);
                }
            }
        }
    }
}

#[async_trait]
impl<O: Oracle> Oracle for RetryingOracle<O> {
    async fn generate_reply(
        &self,
        persona_prompt: &str,
        history: &[Turn],
        message: &str,
    ) -> Result<String, OracleError> {
        self.run("reply", || {
            self.inner.generate_reply(persona_prompt, history, message)
        })
        .await
    }

    async fn summarize(&self, turns: &[Turn]) -> Result<String, OracleError> {
        self.run("summary", || self.inner.summarize(turns)).await
    }

    async fn judge_secret_revealed(
        &self,
        secret: &str,
        transcript: &[Turn],
    ) -> Result<bool, OracleError> {
        self.run("judgement", || {
            self.inner.judge_secret_revealed(secret, transcript)
        })
        .await
    }
}
