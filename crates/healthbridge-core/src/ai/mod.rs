//! AI collaborator seam.
//!
//! All substantive reasoning (insights, clinic search, triage conversation, plan
//! synthesis) is delegated here. Controllers depend only on the traits so the
//! remote client, the offline mock, and test doubles are interchangeable.

mod gemini;
mod mock;
mod retry;

pub use gemini::{GeminiChatSession, GeminiClient};
pub use mock::MockAi;
pub use retry::RetryPolicy;

use crate::config::HealthBridgeConfig;
use crate::error::AiResult;
use crate::model::GroundingSource;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Tool the model may use to ground its answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Grounding {
    WebSearch,
    Maps { latitude: f64, longitude: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub grounding: Option<Grounding>,
    /// When set, the reply must be JSON matching this schema.
    pub response_schema: Option<serde_json::Value>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            grounding: None,
            response_schema: None,
        }
    }

    pub fn grounded(mut self, grounding: Grounding) -> Self {
        self.grounding = Some(grounding);
        self
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateResponse {
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatReply {
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

/// One-shot text generation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> AiResult<GenerateResponse>;
}

/// A stateful conversation. The remote side (or the implementation) keeps history.
#[async_trait]
pub trait ChatSession: Send + Sync {
    async fn send(&self, text: &str) -> AiResult<ChatReply>;
}

/// Factory for conversations. `preamble` is the system instruction for the session.
pub trait ChatCapability: Send + Sync {
    fn open_session(&self, preamble: &str) -> AiResult<Arc<dyn ChatSession>>;
}

/// Both capabilities behind one handle, as handed to the screens.
#[derive(Clone)]
pub struct AiServices {
    pub text: Arc<dyn TextGenerator>,
    pub chat: Arc<dyn ChatCapability>,
}

impl AiServices {
    pub fn new(text: Arc<dyn TextGenerator>, chat: Arc<dyn ChatCapability>) -> Self {
        Self { text, chat }
    }

    /// Remote client when `llm_mode = "gemini"` and a key is available; the offline
    /// mock otherwise.
    pub fn from_config(cfg: &HealthBridgeConfig) -> Self {
        if cfg.uses_remote_ai() {
            match cfg.resolve_api_key() {
                Some(key) => {
                    info!(base = %cfg.api_base_url, "using remote AI service");
                    let client = Arc::new(GeminiClient::new(
                        key,
                        &cfg.api_base_url,
                        cfg.triage_model.clone(),
                        cfg.request_timeout(),
                    ));
                    return Self::new(client.clone(), client);
                }
                None => warn!("llm_mode is gemini but no API key is set; falling back to mock"),
            }
        }
        let mock = Arc::new(MockAi::new());
        Self::new(mock.clone(), mock)
    }
}
