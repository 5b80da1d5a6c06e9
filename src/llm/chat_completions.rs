//! OpenAI Chat Completions API client.
//!
//! Sends a non-streaming request to `/v1/chat/completions` and returns the
//! text of the first choice.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatMessage, LlmSettings, authorize, check_status};
use crate::error::{ChatError, Result};

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for the OpenAI Chat Completions API.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.model)
            .finish_non_exhaustive()
    }
}

impl ChatCompletionsClient {
    /// Create a client that reuses an existing HTTP connection pool.
    #[must_use]
    pub fn with_http(http: reqwest::Client, settings: LlmSettings) -> Self {
        Self { http, settings }
    }

    /// Run a completion and return the assistant text.
    pub async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        let url = self.settings.provider.build_chat_url(&self.settings.base_url);
        let body = CompletionRequest {
            model: &self.settings.model,
            messages,
            temperature,
        };

        debug!(
            name: "llm.completion.request",
            url = %url,
            messages = messages.len(),
            temperature,
            "Sending completion request"
        );

        let rb = authorize(self.http.post(&url).json(&body), &self.settings);
        let resp = check_status(rb.send().await?).await?;
        let parsed: CompletionResponse = resp.json().await?;

        parse_choice(parsed)
    }
}

fn parse_choice(resp: CompletionResponse) -> Result<String> {
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(ChatError::EmptyCompletion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MessageRole, Provider};

    #[test]
    fn test_request_shape() {
        let messages = [
            ChatMessage {
                role: MessageRole::System,
                content: "be brief".into(),
            },
            ChatMessage {
                role: MessageRole::User,
                content: "hi".into(),
            },
        ];
        let body = CompletionRequest {
            model: "gpt-4o",
            messages: &messages,
            temperature: 0.5,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_parse_first_choice() {
        let resp: CompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"<p>Hi</p>"}}]}"#,
        )
        .unwrap();
        assert_eq!(parse_choice(resp).unwrap(), "<p>Hi</p>");
    }

    #[test]
    fn test_parse_empty_choices() {
        let resp: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(parse_choice(resp), Err(ChatError::EmptyCompletion)));

        let resp: CompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(matches!(parse_choice(resp), Err(ChatError::EmptyCompletion)));
    }

    #[test]
    fn test_debug_hides_key() {
        let client = ChatCompletionsClient::with_http(reqwest::Client::new(), LlmSettings {
            base_url: "https://api.openai.com".into(),
            api_key: Some("sk-secret".into()),
            model: "gpt-4o".into(),
            embedding_model: "text-embedding-3-large".into(),
            provider: Provider::OpenAI,
        });
        assert!(!format!("{client:?}").contains("sk-secret"));
    }
}
