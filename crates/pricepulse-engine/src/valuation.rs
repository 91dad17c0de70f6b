use pricepulse_contracts::errors::PipelineError;
use pricepulse_contracts::extract::{excerpt, extract_json_object};
use pricepulse_contracts::models::Capability;
use pricepulse_contracts::products::{Coupon, DealStatus, PricePoint, Valuation};
use serde_json::{json, Map, Value};

use crate::config::Market;
use crate::pipeline::{event_payload, PricePipeline};
use crate::provider::{ContentRequest, GroundingSource};
use crate::{META_PRODUCT_NAME, META_STAGE};

pub const EXPECTED_HISTORY_POINTS: usize = 6;

/// Prompt for the search-grounded price analysis. History and coupons are
/// requested as synthetic-but-plausible data, not sourced data.
pub fn valuation_prompt(product_name: &str, market: &Market) -> String {
    let currency = market.currency.as_str();
    let region = market.region.as_str();
    format!(
        "For the product \"{product_name}\":\n\n\
         1. Use Google Search to find the **best current price** in online stores in {region} (in {currency}). Base your answer strictly on the search results.\n\
         2. Generate a realistic price history for the last 6 months in which the current price fits coherently.\n\
         3. Create one or two plausible discount coupons.\n\
         4. Based on the generated history and the current price, rate the offer as 'GOOD', 'AVERAGE' or 'POOR'.\n\
         5. Give a short justification for the rating.\n\n\
         Reply ONLY with a single JSON object with the following keys:\n\
         - \"price\": number (the best current price found, in {currency})\n\
         - \"storeName\": string (the name of the store with the best price)\n\
         - \"priceHistory\": array of 6 objects with \"month\" (string) and \"price\" (number)\n\
         - \"coupons\": array of objects with \"code\" (string) and \"description\" (string)\n\
         - \"dealStatus\": string ('GOOD', 'AVERAGE' or 'POOR')\n\
         - \"dealReasoning\": string (justification of the rating)"
    )
}

pub fn build_valuation_request(product_name: &str, market: &Market, model: &str) -> ContentRequest {
    let mut request = ContentRequest::text(model, valuation_prompt(product_name, market));
    request
        .metadata
        .insert(META_STAGE.to_string(), json!("valuation"));
    request
        .metadata
        .insert(META_PRODUCT_NAME.to_string(), json!(product_name));
    request
}

/// First grounding citation exposing a web URI, taken as-is.
pub fn first_grounding_uri(sources: &[GroundingSource]) -> Option<String> {
    sources
        .iter()
        .filter_map(|source| source.uri.as_deref())
        .map(str::trim)
        .find(|uri| !uri.is_empty())
        .map(str::to_string)
}

/// Reads a price written as a JSON number or as text such as `"R$ 1.899,90"`
/// or `"1899.90"`.
pub fn parse_price(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(raw) => raw.as_f64(),
        Value::String(raw) => parse_price_text(raw),
        _ => None,
    }?;
    (parsed.is_finite() && parsed >= 0.0).then_some(parsed)
}

fn parse_price_text(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|ch| ch.is_ascii_digit() || matches!(ch, '.' | ',' | '-'))
        .collect();
    let last_comma = cleaned.rfind(',');
    let last_dot = cleaned.rfind('.');
    let normalized = match (last_comma, last_dot) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(comma), None) => {
            let decimals = cleaned.len() - comma - 1;
            if cleaned.matches(',').count() == 1 && decimals <= 2 {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (None, Some(_)) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        (None, Some(dot)) if cleaned.len() - dot - 1 == 3 => cleaned.replace('.', ""),
        _ => cleaned,
    };
    normalized.parse::<f64>().ok()
}

fn string_field(object: &Map<String, Value>, key: &str) -> String {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

fn history_from_payload(value: Option<&Value>) -> Vec<PricePoint> {
    value
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(|row| {
                    let month = row.get("month").and_then(Value::as_str)?.trim();
                    let price = parse_price(row.get("price")?)?;
                    (!month.is_empty()).then(|| PricePoint {
                        month: month.to_string(),
                        price,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn coupons_from_payload(value: Option<&Value>) -> Vec<Coupon> {
    value
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(|row| {
                    let code = row.get("code").and_then(Value::as_str)?.trim();
                    if code.is_empty() {
                        return None;
                    }
                    Some(Coupon {
                        code: code.to_string(),
                        description: row
                            .get("description")
                            .and_then(Value::as_str)
                            .map(str::trim)
                            .unwrap_or_default()
                            .to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Coerces the model's JSON into a valuation. Only a missing or unusable
/// price is fatal; other gaps are defaulted and reported as warnings.
pub fn valuation_from_payload(
    payload: &Map<String, Value>,
    store_url: String,
) -> Result<(Valuation, Vec<String>), PipelineError> {
    let price = payload
        .get("price")
        .and_then(parse_price)
        .ok_or(PipelineError::UnparseableAnalysisJson)?;
    let mut warnings = Vec::new();

    let price_history = history_from_payload(payload.get("priceHistory"));
    if price_history.len() != EXPECTED_HISTORY_POINTS {
        warnings.push(format!(
            "Expected {EXPECTED_HISTORY_POINTS} price history points, got {}.",
            price_history.len()
        ));
    }

    let raw_status = string_field(payload, "dealStatus");
    let deal_status = DealStatus::parse(&raw_status).unwrap_or_else(|| {
        warnings.push(format!(
            "Unrecognized deal status '{raw_status}'; using AVERAGE."
        ));
        DealStatus::Average
    });

    let valuation = Valuation {
        price,
        store_name: string_field(payload, "storeName"),
        store_url,
        price_history,
        coupons: coupons_from_payload(payload.get("coupons")),
        deal_status,
        deal_reasoning: string_field(payload, "dealReasoning"),
    };
    Ok((valuation, warnings))
}

impl PricePipeline {
    /// Search-grounded price analysis for an identified product.
    pub fn analyze_valuation(&self, product_name: &str) -> Result<Valuation, PipelineError> {
        let request = build_valuation_request(
            product_name,
            self.market(),
            self.model_name(Capability::Valuation),
        );
        self.events().record(
            "valuation_request",
            event_payload(json!({
                "product": product_name,
                "model": request.model,
                "currency": self.market().currency,
            })),
        );

        let response = self.call(Capability::Valuation, &request)?;
        let store_url = first_grounding_uri(&response.grounding).unwrap_or_default();
        if store_url.is_empty() {
            self.events().record(
                "valuation_degraded",
                event_payload(json!({
                    "product": product_name,
                    "reason": "No source URL found in grounding metadata; the store link will be missing.",
                })),
            );
        }

        let text = response.text.trim();
        if text.is_empty() {
            return Err(PipelineError::EmptyAnalysisResponse);
        }
        let Some(payload) = extract_json_object(text) else {
            self.events().record(
                "valuation_unparseable",
                event_payload(json!({ "reply_excerpt": excerpt(text, 240) })),
            );
            return Err(PipelineError::UnparseableAnalysisJson);
        };

        let (valuation, warnings) = valuation_from_payload(&payload, store_url)?;
        for warning in warnings {
            self.events().record(
                "valuation_warning",
                event_payload(json!({ "product": product_name, "warning": warning })),
            );
        }
        Ok(valuation)
    }
}
