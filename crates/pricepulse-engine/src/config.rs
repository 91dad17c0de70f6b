use std::env;
use std::time::Duration;

use pricepulse_contracts::errors::PipelineError;
use pricepulse_contracts::models::DRYRUN_MODEL;

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY", "API_KEY"];

const DEFAULT_REQUEST_TIMEOUT_S: f64 = 90.0;

/// Market the valuation prompt searches in. Prices are reported in
/// `currency` as-is; nothing is converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Market {
    pub region: String,
    pub currency: String,
}

impl Default for Market {
    fn default() -> Self {
        Self {
            region: "Brazil".to_string(),
            currency: "BRL".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub request_timeout: Duration,
    pub identity_model: Option<String>,
    pub image_model: Option<String>,
    pub valuation_model: Option<String>,
    pub market: Market,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            request_timeout: Duration::from_secs_f64(DEFAULT_REQUEST_TIMEOUT_S),
            identity_model: None,
            image_model: None,
            valuation_model: None,
            market: Market::default(),
        }
    }
}

impl EngineConfig {
    /// Startup validation: reads the process environment once and fails
    /// when no API key is present.
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let api_key = API_KEY_VARS
            .iter()
            .find_map(|key| value(*key))
            .ok_or_else(|| PipelineError::MissingCredential(API_KEY_VARS.join(" or ")))?;
        let defaults = Self::default();
        let market = Market {
            region: value("PRICEPULSE_REGION").unwrap_or(defaults.market.region),
            currency: value("PRICEPULSE_CURRENCY")
                .map(|raw| raw.to_ascii_uppercase())
                .unwrap_or(defaults.market.currency),
        };
        let timeout_s = value("PRICEPULSE_REQUEST_TIMEOUT")
            .and_then(|raw| raw.parse::<f64>().ok())
            .filter(|secs| secs.is_finite())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_S)
            .clamp(15.0, 300.0);

        Ok(Self {
            api_key: Some(api_key),
            api_base: value("GEMINI_API_BASE")
                .map(|raw| raw.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            request_timeout: Duration::from_secs_f64(timeout_s),
            identity_model: value("PRICEPULSE_IDENTITY_MODEL"),
            image_model: value("PRICEPULSE_IMAGE_MODEL"),
            valuation_model: value("PRICEPULSE_VALUATION_MODEL"),
            market,
        })
    }

    /// Offline configuration routing every stage to the dry-run provider.
    pub fn dryrun() -> Self {
        Self {
            identity_model: Some(DRYRUN_MODEL.to_string()),
            image_model: Some(DRYRUN_MODEL.to_string()),
            valuation_model: Some(DRYRUN_MODEL.to_string()),
            ..Self::default()
        }
    }
}
