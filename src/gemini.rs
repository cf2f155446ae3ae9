use crate::config::Config;
use crate::errors::ScribeError;
use crate::profile::GeneratedProfile;
use crate::prompt::GenerationRequest;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

/// A generative model that answers a [`GenerationRequest`] with raw JSON text.
#[async_trait]
pub trait ProfileModel: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self, ScribeError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ScribeError::Initialization(
                    "Failed to initialize AI. Please ensure the API key is set correctly.".to_string(),
                )
            })?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.trim().to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        let model_path = if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

pub fn request_body(request: &GenerationRequest) -> Value {
    json!({
        "contents": [
            { "role": "user", "parts": [{ "text": request.prompt }] }
        ],
        "systemInstruction": {
            "parts": [{ "text": request.system_instruction }]
        },
        "generationConfig": {
            "responseMimeType": request.response_mime_type,
            "responseSchema": request.response_schema,
        }
    })
}

/// Concatenates the text parts of the first candidate.
pub fn extract_text(response: &Value) -> Result<String> {
    let parts = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("Model response contained no candidates"))?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        return Err(anyhow!("Model response contained no text"));
    }
    Ok(text)
}

#[async_trait]
impl ProfileModel for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let endpoint = self.endpoint();
        info!("Requesting profile HTML from {}", self.model);

        let response = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(request))
            .send()
            .await
            .context("Failed to reach the model API")?;

        let status = response.status();
        let response_text = response.text().await?;
        debug!("Model responded with status {}", status);

        if !status.is_success() {
            return Err(anyhow!("API call failed with status {}: {}", status, response_text));
        }

        let response_json: Value = serde_json::from_str(&response_text)
            .context("Model API returned a non-JSON envelope")?;
        extract_text(&response_json)
    }
}

/// Parses the model's answer into the six-field profile.
pub fn parse_generated(text: &str) -> Result<GeneratedProfile> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    let profile: GeneratedProfile = serde_json::from_str(body.trim())
        .context("Model output was not a JSON object with all six profile fields")?;
    Ok(profile)
}
