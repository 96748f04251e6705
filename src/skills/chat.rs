//! Chat Completion Skill
//!
//! Anthropic messages API client behind the [`ChatCompletionApi`] seam.
//! Initialization checks for an API key and flips the `chat` capability;
//! without a key the skill stays not-ready and the activities that need it
//! are simply never selected.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{capability, ChatCompletionApi, SkillError, SkillRegistry};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// A finished completion.
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub content: String,
    pub model: String,
    pub finish_reason: String,
}

/// Chat skill backed by the Anthropic messages API.
#[derive(Clone)]
pub struct ChatSkill {
    client: Client,
    api_key: Option<String>,
    model: String,
    registry: SkillRegistry,
    initialized: Arc<AtomicBool>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: usize,
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
    model: String,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    r#type: String,
    text: Option<String>,
}

impl ChatSkill {
    pub fn new(api_key: Option<&str>, model: Option<&str>, registry: SkillRegistry) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: api_key.map(|s| s.to_string()),
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            registry,
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Declare the capability and flip it ready when an API key is present.
    pub async fn initialize(&self) -> bool {
        self.registry.register(capability::CHAT).await;

        if self.api_key.is_none() {
            error!("No Anthropic API key found; chat capability stays down");
            return false;
        }

        self.initialized.store(true, Ordering::Relaxed);
        self.registry.set_ready(capability::CHAT, true).await;
        info!("Chat skill initialized (model={})", self.model);
        true
    }
}

#[async_trait]
impl ChatCompletionApi for ChatSkill {
    async fn chat_completion(
        &self,
        prompt: &str,
        system_prompt: &str,
        max_tokens: usize,
    ) -> Result<ChatCompletion, SkillError> {
        if !self.initialized.load(Ordering::Relaxed) {
            return Err(SkillError::NotInitialized(capability::CHAT.to_string()));
        }
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| SkillError::MissingApiKey("ANTHROPIC_API_KEY".to_string()))?;

        let request = MessageRequest {
            model: self.model.clone(),
            max_tokens,
            system: system_prompt.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        debug!(
            "Calling chat API: model={}, prompt_len={}",
            self.model,
            prompt.len()
        );

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(SkillError::Api {
                service: "anthropic".to_string(),
                status,
                message,
            });
        }

        let result: MessageResponse = response.json().await?;

        let content = result
            .content
            .into_iter()
            .filter_map(|b| if b.r#type == "text" { b.text } else { None })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(ChatCompletion {
            content,
            model: result.model,
            finish_reason: result.stop_reason.unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_without_key_stays_down() {
        let registry = SkillRegistry::new();
        let skill = ChatSkill::new(None, None, registry.clone());

        assert!(!skill.initialize().await);
        assert!(!registry.is_ready(capability::CHAT).await);

        let err = skill.chat_completion("hi", "", 100).await.unwrap_err();
        assert!(matches!(err, SkillError::NotInitialized(_)));
    }

    #[tokio::test]
    async fn test_initialize_with_key_flips_capability() {
        let registry = SkillRegistry::new();
        let skill = ChatSkill::new(Some("sk-test"), Some("claude-3-5-haiku-20241022"), registry.clone());

        assert!(skill.initialize().await);
        assert!(registry.is_ready(capability::CHAT).await);
    }

    #[test]
    fn test_response_parsing_shape() {
        let raw = r#"{
            "content": [{"type": "text", "text": "a thought"}],
            "model": "claude-sonnet-4-20250514",
            "stop_reason": "end_turn"
        }"#;
        let parsed: MessageResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.content.len(), 1);
        assert_eq!(parsed.stop_reason.as_deref(), Some("end_turn"));
    }
}
