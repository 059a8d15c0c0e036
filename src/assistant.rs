//! Single-shot farming assistant backed by a hosted generative-language model.
//!
//! Only the newest user message is forwarded; earlier turns stay on the caller's side.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::config::UpstreamPolicy;
use crate::fetch_error::{FetchError, Operation};
use crate::upstream::{endpoint, UpstreamClient};

pub const FALLBACK_REPLY: &str = "I'm sorry, I couldn't generate a response.";

const SYSTEM_INSTRUCTION: &str = "You are a farming assistant specializing in weather-related advice.
Provide helpful, concise advice related to farming and weather conditions.

If asked about specific weather data, provide general guidance based on typical patterns.
Focus on practical advice for farmers regarding crop management, irrigation, pest control, and weather preparation.

Keep responses concise, practical, and focused on farming applications.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("conversation has no messages")]
    EmptyConversation,
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Builds the prompt sent upstream: fixed instruction, then the user's query.
pub fn build_prompt(query: &str) -> String {
    format!("{SYSTEM_INSTRUCTION}\n\nUser query: {query}")
}

#[derive(Clone)]
pub struct AssistantClient {
    client: UpstreamClient,
    base_url: String,
    model: String,
    api_key: String,
}

impl AssistantClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        policy: UpstreamPolicy,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            client: UpstreamClient::new(policy)?,
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    #[instrument(skip(self, messages), fields(model = %self.model, message_count = messages.len()))]
    pub async fn reply(&self, messages: &[ChatMessage]) -> Result<String, AssistantError> {
        let latest = messages.last().ok_or(AssistantError::EmptyConversation)?;
        let prompt = build_prompt(&latest.content);
        let request = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: &prompt }],
            }],
        };

        let url = endpoint(
            &self.base_url,
            &format!("/v1beta/models/{}:generateContent", self.model),
        );
        let response: GenerateResponse = self
            .client
            .post_json(
                Operation::Assistant,
                &url,
                &[("key", self.api_key.as_str())],
                &request,
            )
            .await?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .ok_or_else(|| FetchError::schema(Operation::Assistant, "no candidate text part"))?
            .text
            .unwrap_or_default();

        if text.trim().is_empty() {
            warn!("Assistant returned empty text, using fallback reply");
            return Ok(FALLBACK_REPLY.to_string());
        }

        info!("Assistant replied with {} characters", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_ends_with_user_query() {
        let prompt = build_prompt("When should I irrigate wheat?");
        assert!(prompt.starts_with("You are a farming assistant"));
        assert!(prompt.ends_with("User query: When should I irrigate wheat?"));
    }

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: "hello" }],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
    }
}
