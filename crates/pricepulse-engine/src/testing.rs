use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use pricepulse_contracts::events::EventWriter;

use crate::config::EngineConfig;
use crate::pipeline::PricePipeline;
use crate::provider::{
    ContentProvider, ContentProviderRegistry, ContentRequest, ContentResponse, GroundingSource,
};

/// Queue of canned replies shared between a test and its provider.
#[derive(Default)]
pub(crate) struct Script {
    replies: Mutex<VecDeque<Result<ContentResponse>>>,
    requests: Mutex<Vec<ContentRequest>>,
}

impl Script {
    pub fn push_text(&self, text: &str) {
        self.push(Ok(ContentResponse {
            text: text.to_string(),
            ..ContentResponse::default()
        }));
    }

    pub fn push_grounded(&self, text: &str, uris: &[Option<&str>]) {
        self.push(Ok(ContentResponse {
            text: text.to_string(),
            grounding: uris
                .iter()
                .map(|uri| GroundingSource {
                    uri: uri.map(str::to_string),
                    title: None,
                })
                .collect(),
            warnings: Vec::new(),
        }));
    }

    pub fn push_error(&self, message: &str) {
        self.push(Err(anyhow!(message.to_string())));
    }

    fn push(&self, reply: Result<ContentResponse>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn requests(&self) -> Vec<ContentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Stands in for the hosted Gemini transport.
struct ScriptedProvider {
    script: Arc<Script>,
}

impl ContentProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, request: &ContentRequest) -> Result<ContentResponse> {
        self.script.requests.lock().unwrap().push(request.clone());
        self.script
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("script exhausted")))
    }
}

pub(crate) fn scripted_pipeline(
    config: &EngineConfig,
    events: EventWriter,
) -> (PricePipeline, Arc<Script>) {
    let script = Arc::new(Script::default());
    let mut providers = ContentProviderRegistry::new();
    providers.register(ScriptedProvider {
        script: Arc::clone(&script),
    });
    let pipeline = PricePipeline::with_providers(config, providers, events)
        .expect("scripted pipeline builds");
    (pipeline, script)
}

pub(crate) fn quiet_pipeline() -> (PricePipeline, Arc<Script>) {
    scripted_pipeline(&EngineConfig::default(), EventWriter::discard("test"))
}
