//! Reply generation over a chat-completion endpoint

use async_trait::async_trait;

use crate::services::LanguageModelService;
use crate::{Error, Result};

#[derive(serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(serde::Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(serde::Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Produces replies from a chat-completion API with a fixed system instruction
pub struct ChatClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    system_prompt: String,
}

impl ChatClient {
    /// Create a new chat client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(
        url: String,
        api_key: String,
        model: String,
        system_prompt: String,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("language model API key required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            url,
            api_key,
            model,
            system_prompt,
        })
    }
}

#[async_trait]
impl LanguageModelService for ChatClient {
    async fn complete(&self, user_text: &str) -> Result<String> {
        tracing::debug!(chars = user_text.len(), "requesting completion");

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_text,
                },
            ],
        };

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "completion request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "completion API error");
            return Err(Error::Llm(format!("completion error {status}: {body}")));
        }

        let result: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse completion response");
            e
        })?;

        let reply = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if reply.trim().is_empty() {
            return Err(Error::Llm("empty reply from model".to_string()));
        }

        tracing::info!(chars = reply.len(), "completion received");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_api_key() {
        let result = ChatClient::new(
            "https://example.invalid/chat".to_string(),
            String::new(),
            "gpt-4o-mini".to_string(),
            "prompt".to_string(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn request_serializes_system_then_user() {
        let request = ChatRequest {
            model: "m",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "hi",
                },
            ],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn first_candidate_is_selected() {
        let body = r#"{"choices":[
            {"message":{"content":"first"}},
            {"message":{"content":"second"}}
        ]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap();
        assert_eq!(reply, "first");
    }

    #[test]
    fn missing_content_parses_to_none() {
        let body = r#"{"choices":[{"message":{}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}
