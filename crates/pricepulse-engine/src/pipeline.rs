use pricepulse_contracts::errors::PipelineError;
use pricepulse_contracts::events::{EventPayload, EventWriter};
use pricepulse_contracts::models::{Capability, ModelSelector, ModelSpec};
use serde_json::{json, Value};

use crate::config::{EngineConfig, Market, API_KEY_VARS};
use crate::dryrun::DryrunProvider;
use crate::gemini::GeminiProvider;
use crate::provider::{ContentProvider, ContentProviderRegistry, ContentRequest, ContentResponse};

/// Models resolved once per session, one per stage capability.
#[derive(Debug, Clone)]
pub struct StageModels {
    pub identify: ModelSpec,
    pub identify_image: ModelSpec,
    pub valuation: ModelSpec,
}

impl StageModels {
    pub fn for_capability(&self, capability: Capability) -> &ModelSpec {
        match capability {
            Capability::Identify => &self.identify,
            Capability::IdentifyImage => &self.identify_image,
            Capability::Valuation => &self.valuation,
        }
    }
}

/// Shared plumbing for the identity and valuation stages: model selection,
/// provider dispatch, and event logging.
pub struct PricePipeline {
    providers: ContentProviderRegistry,
    models: StageModels,
    market: Market,
    events: EventWriter,
}

impl PricePipeline {
    pub fn new(config: &EngineConfig, events: EventWriter) -> Result<Self, PipelineError> {
        Self::with_providers(config, default_provider_registry(config), events)
    }

    pub fn with_providers(
        config: &EngineConfig,
        providers: ContentProviderRegistry,
        events: EventWriter,
    ) -> Result<Self, PipelineError> {
        let selector = ModelSelector::default();
        let select = |requested: Option<&str>, capability: Capability| {
            let selection = selector
                .select(requested, capability)
                .map_err(PipelineError::UpstreamService)?;
            if providers.get(&selection.model.provider).is_none() {
                return Err(missing_provider_error(&selection.model.provider));
            }
            events.record(
                "model_selected",
                event_payload(json!({
                    "capability": capability.as_str(),
                    "model": selection.model.name,
                    "provider": selection.model.provider,
                    "fallback_reason": selection.fallback_reason,
                })),
            );
            Ok(selection.model)
        };

        let models = StageModels {
            identify: select(config.identity_model.as_deref(), Capability::Identify)?,
            identify_image: select(config.image_model.as_deref(), Capability::IdentifyImage)?,
            valuation: select(config.valuation_model.as_deref(), Capability::Valuation)?,
        };

        Ok(Self {
            providers,
            models,
            market: config.market.clone(),
            events,
        })
    }

    pub fn models(&self) -> &StageModels {
        &self.models
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn events(&self) -> &EventWriter {
        &self.events
    }

    pub(crate) fn model_name(&self, capability: Capability) -> &str {
        &self.models.for_capability(capability).name
    }

    /// Sends one request to the provider serving `capability`. Transport
    /// failures become `UpstreamService` errors; nothing is retried.
    pub(crate) fn call(
        &self,
        capability: Capability,
        request: &ContentRequest,
    ) -> Result<ContentResponse, PipelineError> {
        let spec = self.models.for_capability(capability);
        let provider: &dyn ContentProvider = self
            .providers
            .get(&spec.provider)
            .ok_or_else(|| missing_provider_error(&spec.provider))?;
        let response = provider
            .generate(request)
            .map_err(|err| PipelineError::upstream(&err))?;
        for warning in &response.warnings {
            self.events.record(
                "provider_warning",
                event_payload(json!({
                    "provider": provider.name(),
                    "model": request.model,
                    "warning": warning,
                })),
            );
        }
        Ok(response)
    }
}

fn default_provider_registry(config: &EngineConfig) -> ContentProviderRegistry {
    let mut providers = ContentProviderRegistry::new();
    providers.register(DryrunProvider);
    if let Some(api_key) = config.api_key.as_deref() {
        providers.register(GeminiProvider::new(api_key, config));
    }
    providers
}

fn missing_provider_error(provider: &str) -> PipelineError {
    if provider == "gemini" {
        return PipelineError::MissingCredential(API_KEY_VARS.join(" or "));
    }
    PipelineError::UpstreamService(format!("no provider registered for '{provider}'"))
}

pub(crate) fn event_payload(value: Value) -> EventPayload {
    match value {
        Value::Object(map) => map,
        _ => EventPayload::new(),
    }
}
