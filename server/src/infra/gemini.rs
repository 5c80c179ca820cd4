//! Step generator backed by the Google Generative Language API
//!
//! The tutoring logic only depends on the [`StepGenerator`] trait; this
//! module provides the Gemini implementation plus the JSON-extraction
//! helper for model output that arrives wrapped in markdown fences.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Opaque producer of project plans, steps and tutoring answers.
///
/// Structured calls must yield parseable JSON; text calls return prose.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StepGenerator: Send + Sync {
    /// Generate a JSON document from the prompt
    async fn generate_structured(&self, prompt: &str) -> Result<Value>;

    /// Generate free-form text from the prompt
    async fn generate_text(&self, prompt: &str) -> Result<String>;
}

/// Gemini API client
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            base_url,
            client: Client::new(),
        }
    }

    async fn generate(&self, prompt: &str, config: GenerationConfig) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: config,
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "Calling step generator");
        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Step generator returned an error");
            return Err(Error::StepGeneration(format!(
                "Generator API error ({status}): {body}"
            )));
        }

        let response: GenerateResponse = response.json().await?;
        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| Error::StepGeneration("Empty generator response".to_string()))?;

        Ok(text)
    }
}

#[async_trait]
impl StepGenerator for GeminiClient {
    async fn generate_structured(&self, prompt: &str) -> Result<Value> {
        let text = self
            .generate(
                prompt,
                GenerationConfig {
                    temperature: 0.2,
                    response_mime_type: Some("application/json".to_string()),
                },
            )
            .await?;
        extract_json_from_response(&text)
    }

    async fn generate_text(&self, prompt: &str) -> Result<String> {
        self.generate(
            prompt,
            GenerationConfig {
                temperature: 0.7,
                response_mime_type: None,
            },
        )
        .await
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

/// Extract a JSON document from model output.
///
/// Tries a direct parse first, then JSON inside markdown code fences, then
/// the outermost brace-delimited blob.
pub fn extract_json_from_response(text: &str) -> Result<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }

    let fence = Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("static pattern");
    for capture in fence.captures_iter(text) {
        if let Ok(value) = serde_json::from_str::<Value>(capture[1].trim()) {
            return Ok(value);
        }
    }

    let blob = Regex::new(r"\{[\s\S]*\}").expect("static pattern");
    if let Some(found) = blob.find(text) {
        if let Ok(value) = serde_json::from_str::<Value>(found.as_str()) {
            return Ok(value);
        }
    }

    Err(Error::StepGeneration(format!(
        "Could not extract valid JSON from generator response: {text}"
    )))
}
