use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::poll::RetryPolicy;
use crate::config::AppConfig;
use crate::lang::Language;

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionContent,
}

#[derive(Debug, Deserialize)]
struct CompletionContent {
    content: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("rate limited by provider")]
    RateLimited,
    #[error("provider returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider returned no reply")]
    EmptyReply,
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// One chat-completion round trip.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ChatError>;
}

pub struct OpenRouterBackend {
    client: Client,
    api_key: String,
}

impl OpenRouterBackend {
    pub fn new(api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl ChatBackend for OpenRouterBackend {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let body = serde_json::json!({
            "model": model,
            "messages": messages,
        });

        let resp = self
            .client
            .post(OPENROUTER_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", "http://localhost:3000")
            .header("X-Title", "Ziya Digital Twin")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ChatError::RateLimited);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChatError::Status { status, body });
        }

        let completion: CompletionResponse = resp.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(ChatError::EmptyReply)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("still rate limited after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },
    #[error(transparent)]
    Chat(#[from] ChatError),
}

impl GenerationError {
    /// Short message shown to the user in place of a reply.
    pub fn user_message(&self, lang: Language) -> String {
        let (busy, timeout, failed) = match lang {
            Language::Turkish => (
                "❌ Şu anda çok yoğunum, lütfen biraz sonra tekrar dene.",
                "❌ Zaman aşımı: yapay zeka servisi yanıt vermedi.",
                "❌ Bir hata oluştu, lütfen tekrar dene.",
            ),
            Language::English => (
                "❌ I'm a bit overloaded right now, please try again shortly.",
                "❌ Timeout: the AI service did not respond.",
                "❌ Something went wrong, please try again.",
            ),
            Language::German => (
                "❌ Ich bin gerade überlastet, bitte versuche es gleich noch einmal.",
                "❌ Zeitüberschreitung: Der KI-Dienst hat nicht geantwortet.",
                "❌ Etwas ist schiefgelaufen, bitte versuche es erneut.",
            ),
        };
        match self {
            Self::RateLimitExhausted { .. } | Self::Chat(ChatError::RateLimited) => busy.to_string(),
            Self::Chat(ChatError::Timeout) => timeout.to_string(),
            Self::Chat(ChatError::Status { status, .. }) => format!("{} (HTTP {})", failed, status.as_u16()),
            Self::Chat(_) => failed.to_string(),
        }
    }
}

/// Builds the persona prompt and asks the chat backend for a reply.
pub struct ResponseGenerator {
    backend: Box<dyn ChatBackend>,
    model: String,
    retry: RetryPolicy,
}

impl ResponseGenerator {
    pub fn new(backend: Box<dyn ChatBackend>, model: &str, retry: RetryPolicy) -> Self {
        Self {
            backend,
            model: model.to_string(),
            retry,
        }
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let backend = OpenRouterBackend::new(&config.openrouter_api_key, config.llm_timeout)?;
        Ok(Self::new(
            Box::new(backend),
            &config.openrouter_model,
            RetryPolicy::new(config.llm_max_retries, Duration::from_secs(1)),
        ))
    }

    /// Ask the model to answer `message` in `lang`. Retries only on 429.
    pub async fn generate(
        &self,
        message: &str,
        lang: Language,
        history: Option<&str>,
    ) -> Result<String, GenerationError> {
        let messages = vec![
            ChatMessage::system(system_prompt(lang, history)),
            ChatMessage::user(message),
        ];

        let mut retry = 0;
        loop {
            match self.backend.complete(&self.model, &messages).await {
                Ok(reply) => return Ok(reply),
                Err(ChatError::RateLimited) if retry < self.retry.max_retries => {
                    retry += 1;
                    let delay = self.retry.delay_for(retry);
                    tracing::warn!(
                        "Rate limited by provider, retry {}/{} in {:?}",
                        retry,
                        self.retry.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(ChatError::RateLimited) => {
                    return Err(GenerationError::RateLimitExhausted {
                        attempts: retry + 1,
                    })
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Like [`generate`](Self::generate), collapsing failures into a user-facing string.
    pub async fn reply(&self, message: &str, lang: Language, history: Option<&str>) -> String {
        match self.generate(message, lang, history).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Response generation failed: {}", e);
                e.user_message(lang)
            }
        }
    }
}

/// Persona instructions for the digital twin, pinned to `lang`.
pub fn system_prompt(lang: Language, history: Option<&str>) -> String {
    let mut prompt = format!(
        "You are Ziya, a digital twin born in Turkey. Be respectful of Turkish culture and values. \
         Your answers combine scientific accuracy, psychological support and a friendly tone. \
         Focus on the user's question, keep the context, and answer briefly and clearly. \
         Stay in the user's language. In mixed-language messages treat the first language as \
         dominant and answer only in it. \
         Reply language: {}. Do not suggest switching languages. \
         Never produce harmful or unethical content. Encourage the user and ask a related question.",
        lang.display_name()
    );

    if let Some(history) = history.filter(|h| !h.trim().is_empty()) {
        prompt.push_str("\n\nPrevious conversation with this user:\n");
        prompt.push_str(history);
    }

    prompt
}
