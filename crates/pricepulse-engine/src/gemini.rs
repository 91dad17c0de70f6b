use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Map, Value};

use crate::config::EngineConfig;
use crate::provider::{
    ContentPart, ContentProvider, ContentRequest, ContentResponse, GroundingSource,
};

/// Google Gemini `generateContent` transport.
pub struct GeminiProvider {
    api_base: String,
    api_key: String,
    timeout: Duration,
    http: HttpClient,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, config: &EngineConfig) -> Self {
        Self {
            api_base: config.api_base.trim().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: config.request_timeout,
            http: HttpClient::new(),
        }
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn build_payload(request: &ContentRequest) -> Value {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => json!({ "text": text }),
                ContentPart::InlineData { mime_type, data } => json!({
                    "inlineData": {
                        "mimeType": mime_type,
                        "data": data,
                    }
                }),
            })
            .collect::<Vec<Value>>();

        let mut payload = Map::new();
        payload.insert(
            "contents".to_string(),
            json!([{ "role": "user", "parts": parts }]),
        );
        if request.web_search {
            payload.insert("tools".to_string(), json!([{ "google_search": {} }]));
        }
        Value::Object(payload)
    }

    /// Reads the first candidate's text and grounding citations.
    fn parse_response(payload: &Value) -> ContentResponse {
        let mut warnings = Vec::new();
        if let Some(reason) = payload
            .get("promptFeedback")
            .and_then(|feedback| feedback.get("blockReason"))
            .and_then(Value::as_str)
        {
            warnings.push(format!("Gemini blocked the prompt ({reason})."));
        }

        let Some(candidate) = payload
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|rows| rows.first())
        else {
            return ContentResponse {
                warnings,
                ..ContentResponse::default()
            };
        };

        if let Some(reason) = candidate.get("finishReason").and_then(Value::as_str) {
            if reason != "STOP" {
                warnings.push(format!("Gemini finished with reason {reason}."));
            }
        }

        let text = candidate
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter(|part| !part.get("thought").and_then(Value::as_bool).unwrap_or(false))
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect::<String>()
            })
            .unwrap_or_default();

        let grounding = candidate
            .get("groundingMetadata")
            .or_else(|| candidate.get("grounding_metadata"))
            .and_then(|meta| meta.get("groundingChunks").or_else(|| meta.get("grounding_chunks")))
            .and_then(Value::as_array)
            .map(|chunks| {
                chunks
                    .iter()
                    .map(|chunk| {
                        let web = chunk.get("web");
                        GroundingSource {
                            uri: web
                                .and_then(|web| web.get("uri"))
                                .and_then(Value::as_str)
                                .map(str::to_string),
                            title: web
                                .and_then(|web| web.get("title"))
                                .and_then(Value::as_str)
                                .map(str::to_string),
                        }
                    })
                    .collect::<Vec<GroundingSource>>()
            })
            .unwrap_or_default();

        ContentResponse {
            text: text.trim().to_string(),
            grounding,
            warnings,
        }
    }
}

impl ContentProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, request: &ContentRequest) -> Result<ContentResponse> {
        let endpoint = self.endpoint_for_model(&request.model);
        let payload = Self::build_payload(request);
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .with_context(|| format!("Gemini request failed ({})", request.model))?;
        let response_payload = response_json_or_error("Gemini", response)?;
        Ok(Self::parse_response(&response_payload))
    }
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
