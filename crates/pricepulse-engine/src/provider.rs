use std::collections::BTreeMap;

use anyhow::Result;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    /// Base64 payload sent inline with the prompt.
    InlineData { mime_type: String, data: String },
}

#[derive(Debug, Clone)]
pub struct ContentRequest {
    pub model: String,
    pub parts: Vec<ContentPart>,
    /// Ask the service to ground the answer with web search.
    pub web_search: bool,
    pub metadata: Map<String, Value>,
}

impl ContentRequest {
    pub fn text(model: &str, prompt: impl Into<String>) -> Self {
        Self {
            model: model.to_string(),
            parts: vec![ContentPart::Text(prompt.into())],
            web_search: true,
            metadata: Map::new(),
        }
    }

    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::InlineData { .. } => None,
            })
            .collect::<Vec<&str>>()
            .join("\n")
    }

    pub fn inline_data(&self) -> Option<(&str, &str)> {
        self.parts.iter().find_map(|part| match part {
            ContentPart::InlineData { mime_type, data } => Some((mime_type.as_str(), data.as_str())),
            ContentPart::Text(_) => None,
        })
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

/// One citation from search grounding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundingSource {
    pub uri: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentResponse {
    pub text: String,
    pub grounding: Vec<GroundingSource>,
    pub warnings: Vec<String>,
}

pub trait ContentProvider: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, request: &ContentRequest) -> Result<ContentResponse>;
}

#[derive(Default)]
pub struct ContentProviderRegistry {
    providers: BTreeMap<String, Box<dyn ContentProvider>>,
}

impl ContentProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: ContentProvider + 'static>(&mut self, provider: P) {
        self.providers
            .insert(provider.name().to_string(), Box::new(provider));
    }

    pub fn get(&self, name: &str) -> Option<&dyn ContentProvider> {
        self.providers.get(name).map(|provider| provider.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }
}
