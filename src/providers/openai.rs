use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::time::sleep;

use super::{
    base::{Provider, ProviderError, ToolOffer, Usage},
    configs::OpenAiProviderConfig,
    types::message::Message,
    utils::{check_openai_context_length_error, messages_to_openai_spec, openai_response_to_message, tools_to_openai_spec},
};

/// Chat-completions client for OpenAI and API-compatible backends.
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Usage {
        let Some(usage) = data.get("usage") else {
            return Usage::default();
        };

        let input_tokens = usage
            .get("prompt_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let output_tokens = usage
            .get("completion_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let total_tokens = usage
            .get("total_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32)
            .or_else(|| match (input_tokens, output_tokens) {
                (Some(input), Some(output)) => Some(input + output),
                _ => None,
            });

        Usage::new(input_tokens, output_tokens, total_tokens)
    }

    fn build_payload(&self, messages: &[Message], offer: ToolOffer<'_>) -> Result<Value, ProviderError> {
        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_to_openai_spec(messages),
        });
        let map = payload
            .as_object_mut()
            .ok_or_else(|| ProviderError::InvalidRequest("payload is not an object".to_string()))?;

        if let ToolOffer::Auto(tools) = offer {
            if !tools.is_empty() {
                map.insert("tools".to_string(), json!(tools_to_openai_spec(tools)?));
                map.insert("tool_choice".to_string(), json!("auto"));
            }
        }
        if let Some(temp) = self.config.temperature {
            map.insert("temperature".to_string(), json!(temp));
        }
        if let Some(tokens) = self.config.max_tokens {
            map.insert("max_tokens".to_string(), json!(tokens));
        }
        Ok(payload)
    }

    async fn post(&self, payload: &Value) -> Result<Value, ProviderError> {
        let url = self.config.completions_url();
        let max_attempts = self.config.retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            let failure = match self
                .client
                .post(&url)
                .bearer_auth(&self.config.api_key)
                .json(payload)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    let body = response.text().await?;
                    return serde_json::from_str(&body).map_err(|e| {
                        ProviderError::MalformedResponse(format!("response is not JSON: {}", e))
                    });
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    if let Some(err) = serde_json::from_str::<Value>(&body)
                        .ok()
                        .and_then(|v| v.get("error").and_then(check_openai_context_length_error))
                    {
                        return Err(err);
                    }
                    let retryable = is_retryable_status(status);
                    (ProviderError::Api { status, body }, retryable)
                }
                Err(err) => {
                    let retryable = err.is_timeout() || err.is_connect();
                    (ProviderError::Request(err), retryable)
                }
            };

            match failure {
                (err, true) if attempt + 1 < max_attempts => {
                    let delay = retry_delay(attempt, self.config.retry_delay_ms);
                    tracing::warn!(attempt = attempt + 1, ?delay, error = %err, "retrying completion request");
                    sleep(delay).await;
                    attempt += 1;
                }
                (err, _) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        offer: ToolOffer<'_>,
    ) -> Result<(Message, Usage), ProviderError> {
        let payload = self.build_payload(messages, offer)?;
        tracing::debug!(
            model = %self.config.model,
            messages = messages.len(),
            tools = offer.tools().len(),
            "requesting completion"
        );

        let response = self.post(&payload).await?;

        if let Some(error) = response.get("error") {
            if let Some(err) = check_openai_context_length_error(error) {
                return Err(err);
            }
            return Err(ProviderError::MalformedResponse(format!("OpenAI API error: {}", error)));
        }

        let message = openai_response_to_message(&response)?;
        let usage = Self::get_usage(&response);
        tracing::debug!(?usage, tool_calls = message.tool_calls.len(), "completion received");

        Ok((message, usage))
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_delay(attempt: u32, base_ms: u64) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor).min(30_000))
}
