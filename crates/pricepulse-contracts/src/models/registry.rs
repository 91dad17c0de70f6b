use std::fmt;

use indexmap::IndexMap;

pub const DRYRUN_MODEL: &str = "dryrun-1";

/// What a pipeline stage needs from a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Identify a product from a URL or a text description.
    Identify,
    /// Identify a product from an inline photo.
    IdentifyImage,
    /// Search-grounded price analysis.
    Valuation,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identify => "identify",
            Self::IdentifyImage => "identify_image",
            Self::Valuation => "valuation",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub provider: String,
    pub capabilities: Vec<Capability>,
}

impl ModelSpec {
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Known models in preference order; the first model supporting a
/// capability is that capability's default.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl ModelRegistry {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(default_models),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name.trim())
    }

    pub fn list(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.values()
    }

    pub fn by_capability(&self, capability: Capability) -> Vec<ModelSpec> {
        self.models
            .values()
            .filter(|model| model.supports(capability))
            .cloned()
            .collect()
    }

    pub fn ensure(&self, name: &str, capability: Capability) -> Option<ModelSpec> {
        self.get(name)
            .filter(|model| model.supports(capability))
            .cloned()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

fn default_models() -> IndexMap<String, ModelSpec> {
    let mut map = IndexMap::new();

    let mut insert = |name: &str, provider: &str, capabilities: &[Capability]| {
        map.insert(
            name.to_string(),
            ModelSpec {
                name: name.to_string(),
                provider: provider.to_string(),
                capabilities: capabilities.to_vec(),
            },
        );
    };

    insert("gemini-2.5-flash", "gemini", &[Capability::Identify]);
    insert(
        "gemini-2.5-flash-image",
        "gemini",
        &[Capability::IdentifyImage],
    );
    insert(
        "gemini-2.5-pro",
        "gemini",
        &[Capability::Valuation, Capability::Identify],
    );
    insert(
        DRYRUN_MODEL,
        "dryrun",
        &[
            Capability::Identify,
            Capability::IdentifyImage,
            Capability::Valuation,
        ],
    );

    map
}

#[cfg(test)]
mod tests {
    use super::{Capability, ModelRegistry, DRYRUN_MODEL};

    #[test]
    fn defaults_follow_registry_order() {
        let registry = ModelRegistry::default();
        let first = |capability| {
            registry
                .by_capability(capability)
                .first()
                .map(|model| model.name.clone())
        };
        assert_eq!(first(Capability::Identify).as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(
            first(Capability::IdentifyImage).as_deref(),
            Some("gemini-2.5-flash-image")
        );
        assert_eq!(first(Capability::Valuation).as_deref(), Some("gemini-2.5-pro"));
    }

    #[test]
    fn ensure_checks_capability() {
        let registry = ModelRegistry::default();
        assert!(registry
            .ensure("gemini-2.5-pro", Capability::Identify)
            .is_some());
        assert!(registry
            .ensure("gemini-2.5-flash", Capability::Valuation)
            .is_none());
        assert!(registry.ensure("unknown", Capability::Identify).is_none());
    }

    #[test]
    fn dryrun_serves_every_stage() {
        let registry = ModelRegistry::default();
        let spec = registry.get(DRYRUN_MODEL).unwrap();
        assert_eq!(spec.provider, "dryrun");
        assert!(spec.supports(Capability::Identify));
        assert!(spec.supports(Capability::IdentifyImage));
        assert!(spec.supports(Capability::Valuation));
    }
}
