//! Reply provider boundary for the language-model collaborator.
//!
//! The coordinator never sees a provider error: failures are translated to a
//! localized apology string at this boundary.

use crate::types::{Language, Message};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use verbo_config::ModelConfig;

/// Number of recent messages forwarded as conversation history.
const HISTORY_WINDOW: usize = 12;

/// Default chat completions endpoint base.
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Fixed instruction defining the assistant's behavior.
const SYSTEM_PROMPT: &str = "\
You are an evangelical Christian spiritual assistant who answers based \
exclusively on the Bible. Your goal is to help users find spiritual \
guidance, understand Bible passages, and receive emotional support through \
Christian teachings.

When answering:
1. Cite relevant Bible verses that support your answer
2. Keep a welcoming, empathetic, and inspiring tone
3. Always emphasize that \"God is love\"
4. Use simple, accessible language
5. Never invent verses or false information
6. Avoid controversial or divisive doctrines
7. Make no claims about the future, predictions, or prophecies
8. Redirect any racist or prejudiced content toward teachings of love, \
equality, and respect";

/// Errors returned by reply providers.
#[derive(Debug, Error)]
pub enum ReplyError {
    /// API key env var is unset.
    #[error("api key not configured (env var: {0})")]
    MissingApiKey(String),
    /// Transport failure.
    #[error("http error: {0}")]
    Http(String),
    /// Non-success status from the provider.
    #[error("provider returned status {0}")]
    Status(u16),
    /// Response decoded but carried no reply text.
    #[error("provider response had no content")]
    EmptyResponse,
}

/// Language-model collaborator: user text plus a short history in, assistant
/// text out. May fail; callers degrade to the localized apology.
#[async_trait]
pub trait ReplyProvider: Send + Sync {
    async fn generate_reply(
        &self,
        user_text: &str,
        recent_history: &[Message],
        language: Language,
    ) -> Result<String, ReplyError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiReplyProvider {
    client: Client,
    config: ModelConfig,
    api_base: String,
}

impl OpenAiReplyProvider {
    /// Create a provider from model config.
    pub fn new(config: ModelConfig) -> Self {
        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        Self {
            client: Client::new(),
            config,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn api_key(&self) -> Result<String, ReplyError> {
        std::env::var(&self.config.api_key_env)
            .map_err(|_| ReplyError::MissingApiKey(self.config.api_key_env.clone()))
    }

    fn build_messages(
        &self,
        user_text: &str,
        recent_history: &[Message],
        language: Language,
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(recent_history.len().min(HISTORY_WINDOW) + 2);
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: format!("{SYSTEM_PROMPT} {}", language_directive(language)),
        });
        let start = recent_history.len().saturating_sub(HISTORY_WINDOW);
        for message in &recent_history[start..] {
            messages.push(ChatMessage {
                role: message.sender.as_str().to_string(),
                content: message.text.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: user_text.to_string(),
        });
        messages
    }
}

#[async_trait]
impl ReplyProvider for OpenAiReplyProvider {
    async fn generate_reply(
        &self,
        user_text: &str,
        recent_history: &[Message],
        language: Language,
    ) -> Result<String, ReplyError> {
        let api_key = self.api_key()?;
        let request = ChatRequest {
            model: self.config.name.clone(),
            messages: self.build_messages(user_text, recent_history, language),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        debug!(
            "requesting reply (model={}, history_len={})",
            request.model,
            request.messages.len()
        );

        let url = format!("{}/chat/completions", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| ReplyError::Http(err.to_string()))?;
        if !response.status().is_success() {
            return Err(ReplyError::Status(response.status().as_u16()));
        }
        let body: ChatResponse = response
            .json()
            .await
            .map_err(|err| ReplyError::Http(err.to_string()))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(ReplyError::EmptyResponse);
        }
        Ok(content)
    }
}

/// Instruction pinning the reply language to the interface language.
fn language_directive(language: Language) -> &'static str {
    match language {
        Language::Pt => "Responda em português brasileiro.",
        Language::En => "Answer in English.",
        Language::Es => "Responda en español.",
    }
}

/// Fixed apology shown when the collaborator fails or times out.
pub fn apology_text(language: Language) -> &'static str {
    match language {
        Language::Pt => {
            "Estou em oração neste momento. Por favor, tente novamente em alguns instantes."
        }
        Language::En => "I am in prayer at this moment. Please try again in a few moments.",
        Language::Es => "Estoy en oración en este momento. Por favor, inténtalo de nuevo en unos instantes.",
    }
}

/// Boundary helper: ask the provider, degrade to the apology on any error.
pub async fn reply_or_apology(
    provider: &dyn ReplyProvider,
    user_text: &str,
    recent_history: &[Message],
    language: Language,
) -> String {
    match provider
        .generate_reply(user_text, recent_history, language)
        .await
    {
        Ok(reply) => reply,
        Err(err) => {
            warn!("reply provider failed, substituting apology: {err}");
            apology_text(language).to_string()
        }
    }
}
