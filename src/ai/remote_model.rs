// src/ai/remote_model.rs
use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use log::info;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::connector::VisionTriage;
use super::report::{parse_report, TriageReport};
use crate::capture::CapturedImage;
use crate::error::TriageError;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
const ENDPOINT_VAR: &str = "DERMASCOPE_ENDPOINT";

const SYSTEM_INSTRUCTION: &str = "\
You are a dermatology triage assistant reviewing a single clinical photo. \
Respond in English with a JSON object and nothing else, using exactly these \
fields: \"diagnosis\" (string, the primary suspected condition, or a clear \
statement that the image is insufficient or not clinical), \
\"differentialDiagnosis\" (array of strings, alternative conditions, may be \
empty), \"reasoning\" (string, markdown, the visual findings and the logic \
behind the assessment), \"recommendations\" (array of strings, suggested next \
actions), \"urgency\" (one of \"low\", \"medium\", \"high\", \"critical\"). \
You are not providing medical care; always recommend professional follow-up \
where appropriate.";

const ANALYSIS_PROMPT: &str =
    "Analyze this clinical photo and return your triage assessment as JSON.";

/// Client for a hosted multimodal model speaking the generateContent protocol.
pub struct RemoteModel {
    endpoint: String,
    model_name: String,
    api_key: String,
    client: Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }

    fn image(mime_type: &str, data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data,
            }),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Endpoint base URL, overridable through DERMASCOPE_ENDPOINT.
pub fn endpoint_from_env() -> String {
    std::env::var(ENDPOINT_VAR).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string())
}

impl RemoteModel {
    /// Build a client from the environment: endpoint from DERMASCOPE_ENDPOINT
    /// (falling back to the public API) and credential from GEMINI_API_KEY.
    pub fn new(model_name: &str) -> Result<Self> {
        let api_key = std::env::var(API_KEY_VAR)
            .map_err(|_| anyhow!("{} is not set; export your API key first", API_KEY_VAR))?;
        Self::with_credentials(endpoint_from_env(), model_name, api_key)
    }

    pub fn with_credentials(
        endpoint: impl Into<String>,
        model_name: &str,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let endpoint = endpoint.into();
        info!("Initializing vision model: {} at {}", model_name, endpoint);

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            endpoint,
            model_name: model_name.to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn request_body(&self, image: &CapturedImage) -> GenerateRequest {
        let encoded = general_purpose::STANDARD.encode(&image.bytes);
        GenerateRequest {
            system_instruction: Content {
                parts: vec![Part::text(SYSTEM_INSTRUCTION)],
            },
            contents: vec![Content {
                parts: vec![
                    Part::image(&image.mime_type, encoded),
                    Part::text(ANALYSIS_PROMPT),
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        }
    }

    fn request_report(&self, image: &CapturedImage) -> Result<TriageReport> {
        let request = self.request_body(image);
        let url = format!(
            "{}/models/{}:generateContent",
            self.endpoint, self.model_name
        );

        info!(
            "Sending {} image ({} bytes) to {} for triage",
            image.mime_type,
            image.bytes.len(),
            self.model_name
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!("request timed out; the endpoint did not reply in time")
                } else {
                    anyhow!("endpoint unreachable: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!("endpoint returned {}: {}", status, error_text));
        }

        let body: GenerateResponse = response
            .json()
            .map_err(|e| anyhow!("unreadable endpoint reply: {}", e))?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| anyhow!("endpoint reply carried no candidate text"))?;

        parse_report(&text)
    }
}

impl VisionTriage for RemoteModel {
    fn analyze(&self, image: &CapturedImage) -> Result<TriageReport, TriageError> {
        self.request_report(image).map_err(TriageError::analysis)
    }
}
