//! Request and response bodies of the `generateContent` endpoint

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Either inline binary data or text
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            inline_data: None,
            text: Some(text.into()),
        }
    }

    pub fn inline(mime_type: impl Into<String>, data: String) -> Self {
        Self {
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data,
            }),
            text: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64 payload
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, all parts joined
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Reason the service refused to answer on safety grounds, if it did
    pub fn safety_block(&self) -> Option<String> {
        let prompt_block = self
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.clone());

        let candidate_block = self
            .candidates
            .first()
            .and_then(|candidate| candidate.finish_reason.clone());

        prompt_block
            .into_iter()
            .chain(candidate_block)
            .find(|reason| is_safety_reason(reason))
    }
}

/// Safety refusals are reported as `SAFETY`, `IMAGE_SAFETY` and similar.
/// Case-sensitive: field names such as `safety_settings` are not refusals.
pub fn is_safety_reason(reason: &str) -> bool {
    reason.contains("SAFETY")
}
