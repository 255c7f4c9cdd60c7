use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "gpt-oss:20b";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SummarizeError {
    #[error("service de modèle injoignable : {0}")]
    Request(String),
    #[error("le service de modèle a répondu HTTP {status} : {body}")]
    Status { status: u16, body: String },
    #[error("réponse du modèle illisible : {0}")]
    MalformedResponse(String),
    #[error("le modèle a renvoyé une réponse vide")]
    EmptyResponse,
}

/// Chat-style text generation: one system instruction, one user prompt.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn chat(&self, system: &str, prompt: &str) -> Result<String, SummarizeError>;

    /// Succeeds when the service answers at all.
    async fn health_check(&self) -> Result<(), SummarizeError>;

    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct OllamaSettings {
    pub base_url: String,
    pub model: String,
    pub connect_timeout: Duration,
    /// Local models can take minutes on long articles.
    pub request_timeout: Duration,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MODEL_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatResponseMessage>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Client for a local Ollama server (`/api/chat`, non-streaming).
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(settings: OllamaSettings) -> Result<Self, SummarizeError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| SummarizeError::Request(format!("impossible de créer le client HTTP : {err}")))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model,
        })
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn chat(&self, system: &str, prompt: &str) -> Result<String, SummarizeError> {
        let url = format!("{}/api/chat", self.base_url);
        let payload = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
        };

        let resp = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| SummarizeError::Request(err.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|err| SummarizeError::Request(err.to_string()))?;
        if !status.is_success() {
            return Err(SummarizeError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|err| SummarizeError::MalformedResponse(err.to_string()))?;
        if let Some(error) = parsed.error {
            return Err(SummarizeError::MalformedResponse(error));
        }
        let content = parsed
            .message
            .map(|m| m.content)
            .ok_or_else(|| SummarizeError::MalformedResponse("message absent".to_string()))?;

        let content = content.trim();
        if content.is_empty() {
            return Err(SummarizeError::EmptyResponse);
        }
        Ok(content.to_string())
    }

    async fn health_check(&self) -> Result<(), SummarizeError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| SummarizeError::Request(err.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(SummarizeError::Status {
                status: resp.status().as_u16(),
                body: String::new(),
            })
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
