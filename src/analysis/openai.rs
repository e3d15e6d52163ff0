//! OpenAI-compatible chat completions provider.
//!
//! Works with any server exposing `POST {endpoint}/chat/completions`
//! (OpenAI, LM Studio, Ollama's `/v1`, vLLM). The reply is constrained with
//! a `json_schema` response format.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::provider::LlmProvider;
use super::task::ChatPrompt;
use crate::config::LlmSettings;
use crate::error::{Error, Result};

/// Chat completions client.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// Build a client from resolved settings.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the HTTP client can't be constructed.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs()))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint().trim_end_matches('/').to_string(),
            model: settings.model(),
            api_key: settings.api_key(),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchema<'a>,
}

#[derive(Debug, Serialize)]
struct JsonSchema<'a> {
    name: &'static str,
    strict: bool,
    schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &ChatPrompt) -> Result<String> {
        let url = format!("{}/chat/completions", self.endpoint);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: 0.2,
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchema {
                    name: "task_suggestion",
                    strict: true,
                    schema: &prompt.schema,
                },
            },
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        tracing::debug!(%url, model = %self.model, "sending chat completion");
        let response = builder
            .send()
            .await
            .map_err(|e| Error::Analysis(format!("LLM request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Analysis(format!("LLM API error ({status}): {body}")));
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Analysis(format!("Failed to parse LLM response: {e}")))?;

        data.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Analysis("LLM returned no content".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings_trims_endpoint() {
        let settings = LlmSettings {
            endpoint: Some("http://localhost:1234/v1/".into()),
            model: Some("local-model".into()),
            api_key: None,
            timeout_secs: Some(5),
        };
        let provider = OpenAiCompatibleProvider::from_settings(&settings).unwrap();
        assert_eq!(provider.endpoint, "http://localhost:1234/v1");
        assert_eq!(provider.model(), "local-model");
    }

    #[test]
    fn test_request_shape() {
        let schema = serde_json::json!({"type": "object"});
        let req = ChatRequest {
            model: "m",
            messages: [
                ChatMessage { role: "system", content: "s" },
                ChatMessage { role: "user", content: "u" },
            ],
            temperature: 0.2,
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchema { name: "task_suggestion", strict: true, schema: &schema },
            },
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["response_format"]["type"], "json_schema");
        assert_eq!(json["response_format"]["json_schema"]["schema"]["type"], "object");
        assert_eq!(json["messages"][1]["role"], "user");
    }
}
