//! Offline collaborator (`llm_mode = "mock"`): canned, deterministic answers so the
//! app is usable without network access or an API key.

use super::{ChatCapability, ChatReply, ChatSession, GenerateRequest, GenerateResponse, Grounding, TextGenerator};
use crate::error::AiResult;
use crate::model::GroundingSource;
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const MOCK_DISCLAIMER: &str = "I am an AI assistant, not a doctor.";

#[derive(Debug, Default)]
pub struct MockAi;

impl MockAi {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextGenerator for MockAi {
    async fn generate(&self, request: GenerateRequest) -> AiResult<GenerateResponse> {
        if request.response_schema.is_some() {
            let plan = json!({
                "workout": ["20-minute brisk walk", "Bodyweight squats, 3 sets of 12"],
                "nutrition": ["Morogo with pap for lunch", "Biltong as a protein snack"],
                "advice": "Start small and stay consistent."
            });
            return Ok(GenerateResponse {
                text: plan.to_string(),
                sources: Vec::new(),
            });
        }
        match request.grounding {
            Some(Grounding::Maps { latitude, longitude }) => Ok(GenerateResponse {
                text: format!("Clinics near {:.3}, {:.3} (offline sample).", latitude, longitude),
                sources: vec![
                    GroundingSource {
                        title: "Community Health Centre (sample)".into(),
                        uri: format!("https://maps.google.com/?q={},{}", latitude, longitude),
                    },
                    GroundingSource {
                        title: "Local Pharmacy (sample)".into(),
                        uri: format!("https://maps.google.com/?q=pharmacy+near+{},{}", latitude, longitude),
                    },
                ],
            }),
            Some(Grounding::WebSearch) => Ok(GenerateResponse {
                text: "Offline mode: no live health alerts. Keep vaccinations up to date and check \
                       the Department of Health for provincial notices."
                    .into(),
                sources: vec![GroundingSource {
                    title: "National Department of Health".into(),
                    uri: "https://www.health.gov.za".into(),
                }],
            }),
            None => Ok(GenerateResponse {
                text: format!("(offline) {}", request.prompt),
                sources: Vec::new(),
            }),
        }
    }
}

impl ChatCapability for MockAi {
    fn open_session(&self, _preamble: &str) -> AiResult<Arc<dyn ChatSession>> {
        Ok(Arc::new(MockChatSession::default()))
    }
}

#[derive(Debug, Default)]
struct MockChatSession {
    turns: AtomicUsize,
}

#[async_trait]
impl ChatSession for MockChatSession {
    async fn send(&self, text: &str) -> AiResult<ChatReply> {
        let n = self.turns.fetch_add(1, Ordering::SeqCst) + 1;
        let lower = text.to_lowercase();
        let advice = if ["chest pain", "can't breathe", "unconscious", "bleeding"]
            .iter()
            .any(|k| lower.contains(k))
        {
            "These symptoms can be serious. Call 112 or go to your nearest emergency unit now."
        } else if n == 1 {
            "Thanks for sharing. How long have you had these symptoms, and do you have a fever?"
        } else {
            "Rest, stay hydrated, and book a clinic visit if things do not improve within 48 hours."
        };
        Ok(ChatReply {
            text: format!("{} {}", advice, MOCK_DISCLAIMER),
            sources: Vec::new(),
        })
    }
}
