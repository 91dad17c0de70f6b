use super::registry::{Capability, ModelRegistry, ModelSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    pub requested: Option<String>,
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelSelector {
    pub registry: ModelRegistry,
}

impl ModelSelector {
    pub fn new(registry: Option<ModelRegistry>) -> Self {
        Self {
            registry: registry.unwrap_or_default(),
        }
    }

    /// Picks the requested model when it serves `capability`, otherwise the
    /// capability default with the reason recorded.
    pub fn select(
        &self,
        requested: Option<&str>,
        capability: Capability,
    ) -> Result<ModelSelection, String> {
        let requested = requested.map(str::trim).filter(|value| !value.is_empty());
        if let Some(name) = requested {
            if let Some(model) = self.registry.ensure(name, capability) {
                return Ok(ModelSelection {
                    model,
                    requested: Some(name.to_string()),
                    fallback_reason: None,
                });
            }
        }

        let Some(model) = self.registry.by_capability(capability).into_iter().next() else {
            return Err(format!("No models available for capability '{capability}'."));
        };
        let fallback_reason = requested.map(|name| {
            format!("Requested model '{name}' unavailable for capability '{capability}'.")
        });
        Ok(ModelSelection {
            model,
            requested: requested.map(str::to_string),
            fallback_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::ModelSelector;
    use crate::models::{Capability, ModelRegistry, ModelSpec};

    #[test]
    fn requested_model_wins_when_capable() {
        let selection = ModelSelector::default()
            .select(Some("gemini-2.5-pro"), Capability::Identify)
            .unwrap();
        assert_eq!(selection.model.name, "gemini-2.5-pro");
        assert_eq!(selection.fallback_reason, None);
    }

    #[test]
    fn falls_back_when_requested_model_lacks_capability() {
        let selection = ModelSelector::default()
            .select(Some("gemini-2.5-flash"), Capability::Valuation)
            .unwrap();
        assert_eq!(selection.model.name, "gemini-2.5-pro");
        assert_eq!(selection.requested.as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(
            selection.fallback_reason.as_deref(),
            Some("Requested model 'gemini-2.5-flash' unavailable for capability 'valuation'.")
        );
    }

    #[test]
    fn no_request_uses_default_silently() {
        let selection = ModelSelector::default()
            .select(None, Capability::IdentifyImage)
            .unwrap();
        assert_eq!(selection.model.name, "gemini-2.5-flash-image");
        assert_eq!(selection.requested, None);
        assert_eq!(selection.fallback_reason, None);
    }

    #[test]
    fn errors_when_no_model_has_capability() {
        let mut models = IndexMap::new();
        models.insert(
            "text-only".to_string(),
            ModelSpec {
                name: "text-only".to_string(),
                provider: "dryrun".to_string(),
                capabilities: vec![Capability::Identify],
            },
        );
        let err = ModelSelector::new(Some(ModelRegistry::new(Some(models))))
            .select(None, Capability::Valuation)
            .unwrap_err();
        assert_eq!(err, "No models available for capability 'valuation'.");
    }
}
