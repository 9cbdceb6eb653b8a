//! Gemini REST client (generateContent).
//!
//! Covers plain prompts, web/maps-grounded prompts, structured JSON output, and
//! multi-turn chat. API key goes in the `x-goog-api-key` header, never the URL,
//! so it stays out of request logs.

use super::{ChatCapability, ChatReply, ChatSession, GenerateRequest, GenerateResponse, Grounding, TextGenerator};
use crate::error::{AiError, AiResult};
use crate::model::GroundingSource;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

const WEB_SOURCE_TITLE: &str = "Health Source";
const MAPS_SOURCE_TITLE: &str = "Location";

// generateContent request/response, camelCase on the wire
#[derive(Debug, Clone, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
struct Part {
    text: String,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part { text: text.to_string() }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<ChunkRef>,
    maps: Option<ChunkRef>,
}

#[derive(Debug, Deserialize)]
struct ChunkRef {
    title: Option<String>,
    uri: Option<String>,
}

fn build_request(
    contents: Vec<Content>,
    system: Option<&str>,
    grounding: Option<Grounding>,
    schema: Option<&serde_json::Value>,
) -> GenerateContentRequest {
    let (tools, tool_config) = match grounding {
        None => (Vec::new(), None),
        Some(Grounding::WebSearch) => (vec![json!({ "googleSearch": {} })], None),
        Some(Grounding::Maps { latitude, longitude }) => (
            vec![json!({ "googleMaps": {} })],
            Some(json!({
                "retrievalConfig": {
                    "latLng": { "latitude": latitude, "longitude": longitude }
                }
            })),
        ),
    };
    let generation_config = schema.map(|s| {
        json!({
            "responseMimeType": "application/json",
            "responseSchema": s,
        })
    });
    GenerateContentRequest {
        contents,
        system_instruction: system.map(|s| Content::text(None, s)),
        tools,
        tool_config,
        generation_config,
    }
}

/// Text of the first candidate plus any grounding chunks that carry a URI.
fn parse_response(body: &str) -> AiResult<GenerateResponse> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| AiError::Parse(e.to_string()))?;
    let Some(candidate) = parsed.candidates.into_iter().next() else {
        return Err(AiError::EmptyResponse);
    };
    let text = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    let sources = candidate
        .grounding_metadata
        .map(|m| {
            m.grounding_chunks
                .into_iter()
                .filter_map(|chunk| {
                    let (r, fallback) = match (chunk.web, chunk.maps) {
                        (Some(w), _) => (w, WEB_SOURCE_TITLE),
                        (None, Some(m)) => (m, MAPS_SOURCE_TITLE),
                        (None, None) => return None,
                    };
                    let uri = r.uri.filter(|u| !u.trim().is_empty())?;
                    let title = r
                        .title
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| fallback.to_string());
                    Some(GroundingSource { title, uri })
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(GenerateResponse { text, sources })
}

/// HTTP client for the Gemini API. Cheap to clone.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    chat_model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: &str, chat_model: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: api_key.trim().to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            chat_model,
            client,
        }
    }

    async fn post(&self, model: &str, body: &GenerateContentRequest) -> AiResult<GenerateResponse> {
        if self.api_key.is_empty() {
            return Err(AiError::MissingApiKey);
        }
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        debug!(model, tools = body.tools.len(), "generateContent");
        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(AiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        parse_response(&text)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> AiResult<GenerateResponse> {
        let body = build_request(
            vec![Content::text(Some("user"), &request.prompt)],
            None,
            request.grounding,
            request.response_schema.as_ref(),
        );
        self.post(&request.model, &body).await
    }
}

impl ChatCapability for GeminiClient {
    fn open_session(&self, preamble: &str) -> AiResult<Arc<dyn ChatSession>> {
        Ok(Arc::new(GeminiChatSession {
            client: self.clone(),
            system: preamble.to_string(),
            history: Mutex::new(Vec::new()),
        }))
    }
}

/// Multi-turn conversation. History is replayed on each send; a turn is recorded
/// only once the model has answered it. Holding the history lock across the call
/// serializes concurrent sends on one session.
pub struct GeminiChatSession {
    client: GeminiClient,
    system: String,
    history: Mutex<Vec<Content>>,
}

#[async_trait]
impl ChatSession for GeminiChatSession {
    async fn send(&self, text: &str) -> AiResult<ChatReply> {
        let mut history = self.history.lock().await;
        let mut contents = history.clone();
        contents.push(Content::text(Some("user"), text));
        let body = build_request(contents, Some(&self.system), Some(Grounding::WebSearch), None);
        let reply = self.client.post(&self.client.chat_model, &body).await?;
        history.push(Content::text(Some("user"), text));
        history.push(Content::text(Some("model"), &reply.text));
        Ok(ChatReply {
            text: reply.text,
            sources: reply.sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_grounding_sets_tool_and_location() {
        let req = build_request(
            vec![Content::text(Some("user"), "clinics near me")],
            None,
            Some(Grounding::Maps { latitude: -26.2, longitude: 28.0 }),
            None,
        );
        let v = serde_json::to_value(&req).unwrap();
        assert!(v["tools"][0].get("googleMaps").is_some());
        assert_eq!(v["toolConfig"]["retrievalConfig"]["latLng"]["latitude"], -26.2);
        assert!(v.get("systemInstruction").is_none());
        assert!(v.get("generationConfig").is_none());
    }

    #[test]
    fn schema_sets_json_mime_type() {
        let schema = json!({ "type": "OBJECT" });
        let req = build_request(vec![], Some("be brief"), None, Some(&schema));
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(v["systemInstruction"]["parts"][0]["text"], "be brief");
        assert!(v.get("tools").is_none());
    }

    #[test]
    fn parses_text_and_filters_sources_without_uri() {
        let body = r#"{
            "candidates": [{
                "content": { "parts": [{ "text": "Measles " }, { "text": "alert." }] },
                "groundingMetadata": { "groundingChunks": [
                    { "web": { "title": "NICD", "uri": "https://nicd.ac.za" } },
                    { "web": { "uri": "https://health.gov.za" } },
                    { "web": { "title": "No link" } },
                    { "maps": { "uri": "https://maps.example/c1" } }
                ]}
            }]
        }"#;
        let out = parse_response(body).unwrap();
        assert_eq!(out.text, "Measles alert.");
        assert_eq!(out.sources.len(), 3);
        assert_eq!(out.sources[1].title, WEB_SOURCE_TITLE);
        assert_eq!(out.sources[2].title, MAPS_SOURCE_TITLE);
    }

    #[test]
    fn no_candidates_is_empty_response() {
        assert!(matches!(parse_response(r#"{"candidates":[]}"#), Err(AiError::EmptyResponse)));
        assert!(matches!(parse_response("<html>"), Err(AiError::Parse(_))));
    }

    #[tokio::test]
    async fn blank_key_short_circuits() {
        let client = GeminiClient::new("  ".into(), "http://127.0.0.1:9", "m".into(), Duration::from_secs(1));
        let out = client.generate(GenerateRequest::new("m", "hi")).await;
        assert!(matches!(out, Err(AiError::MissingApiKey)));
    }
}
