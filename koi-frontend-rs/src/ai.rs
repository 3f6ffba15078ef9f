//! Gemini-backed koi features: photo grading and terminology lookup.
//!
//! The API key is absent by default; callers get `MissingApiKey` rather than
//! a network error so the UI can show the feature as unavailable.

use base64::Engine as _;
use koi_utils::grading::GradingResult;
use serde::{Deserialize, Serialize};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GEMINI_MODEL: &str = "gemini-3-flash-preview";

const GRADING_PROMPT: &str = "Analyze this Nishikigoi (Koi fish) based on three professional criteria: Body Shape (体型), Pattern (模様), and Quality (質). Return the scores (out of 100) and a brief summary in Traditional Chinese. Be realistic and critical like a professional judge.";

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,
    #[error("ai transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("ai request failed with status {0}")]
    Status(u16),
    #[error("malformed ai response: {0}")]
    Malformed(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

fn text_part(text: &str) -> Part {
    Part {
        text: Some(text.to_string()),
        inline_data: None,
    }
}

/// The response schema the grading call constrains the model with. Keys match
/// the camelCase serde names on [`GradingResult`].
fn grading_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "bodyShape": { "type": "NUMBER" },
            "pattern": { "type": "NUMBER" },
            "quality": { "type": "NUMBER" },
            "summary": { "type": "STRING" },
        },
        "required": ["bodyShape", "pattern", "quality", "summary"],
    })
}

fn grading_request(image_base64: &str) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![
                Part {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: "image/jpeg".to_string(),
                        data: image_base64.to_string(),
                    }),
                },
                text_part(GRADING_PROMPT),
            ],
        }],
        generation_config: Some(GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: grading_schema(),
        }),
    }
}

fn term_request(term: &str) -> GenerateRequest {
    let prompt = format!(
        "Explain the Nishikigoi terminology \"{term}\" to a beginner. Keep it professional, concise, and in Traditional Chinese."
    );
    GenerateRequest {
        contents: vec![Content {
            parts: vec![text_part(&prompt)],
        }],
        generation_config: None,
    }
}

fn first_text(response: GenerateResponse) -> Result<String, AiError> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().find_map(|p| p.text))
        .ok_or_else(|| AiError::Malformed("response carried no text part".to_string()))
}

pub struct GeminiClient {
    api_key: String,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: String) -> GeminiClient {
        GeminiClient {
            api_key,
            http: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Result<GeminiClient, AiError> {
        match std::env::var("GEMINI_API_KEY") {
            Ok(key) if !key.is_empty() => Ok(GeminiClient::new(key)),
            _ => Err(AiError::MissingApiKey),
        }
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, AiError> {
        let url = format!(
            "{GEMINI_BASE_URL}/{GEMINI_MODEL}:generateContent?key={}",
            self.api_key
        );
        let response = self.http.post(&url).json(request).send().await?;
        if !response.status().is_success() {
            return Err(AiError::Status(response.status().as_u16()));
        }
        first_text(response.json().await?)
    }

    /// Grade a koi photo. `image_bytes` is the raw JPEG; encoding happens
    /// here so callers hand over what the file picker gave them.
    pub async fn grade_photo(&self, image_bytes: &[u8]) -> Result<GradingResult, AiError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image_bytes);
        let text = self.generate(&grading_request(&encoded)).await?;
        serde_json::from_str(&text).map_err(|err| AiError::Malformed(err.to_string()))
    }

    /// Explain a koi term in Traditional Chinese.
    pub async fn explain_term(&self, term: &str) -> Result<String, AiError> {
        self.generate(&term_request(term)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grading_request_carries_image_and_schema() {
        let body = serde_json::to_value(grading_request("aGVsbG8=")).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "aGVsbG8=");
        assert!(parts[1]["text"].as_str().unwrap().contains("Nishikigoi"));
        let config = &body["generationConfig"];
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(config["responseSchema"]["required"][0], "bodyShape");
    }

    #[test]
    fn term_request_is_text_only() {
        let body = serde_json::to_value(term_request("墨")).unwrap();
        let text = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.contains("\"墨\""));
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn first_text_pulls_the_model_output() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"bodyShape\":82,\"pattern\":74,\"quality\":88,\"summary\":\"骨架紮實\"}"}]}}]}"#,
        )
        .unwrap();
        let text = first_text(response).unwrap();
        let graded: GradingResult = serde_json::from_str(&text).unwrap();
        assert_eq!(graded.quality, 88.0);
    }

    #[test]
    fn empty_candidates_are_malformed() {
        let response: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(matches!(first_text(response), Err(AiError::Malformed(_))));
    }
}
