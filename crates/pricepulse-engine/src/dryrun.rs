use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use anyhow::{bail, Result};
use chrono::Datelike;
use serde_json::{json, Value};

use crate::provider::{ContentProvider, ContentRequest, ContentResponse, GroundingSource};
use crate::{META_INPUT_KIND, META_PRODUCT_NAME, META_STAGE, META_SUBJECT};

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Offline provider answering both stages with deterministic, plausible
/// replies derived from the request metadata. The replies are wrapped in
/// prose and fences like real model output.
pub struct DryrunProvider;

impl ContentProvider for DryrunProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate(&self, request: &ContentRequest) -> Result<ContentResponse> {
        match request.metadata_str(META_STAGE) {
            Some("identity") => Ok(dryrun_identity(request)),
            Some("valuation") => Ok(dryrun_valuation(request)),
            other => bail!("dryrun provider cannot answer stage {other:?}"),
        }
    }
}

fn dryrun_identity(request: &ContentRequest) -> ContentResponse {
    let subject = request.metadata_str(META_SUBJECT).unwrap_or_default().trim();
    let name = match request.metadata_str(META_INPUT_KIND) {
        Some("URL") => name_from_url(subject),
        Some("IMAGE") => {
            let mime = request
                .inline_data()
                .map(|(mime, _)| mime)
                .unwrap_or("image");
            format!("Photographed product ({mime})")
        }
        _ => subject.to_string(),
    };
    let brand = name.split_whitespace().next().unwrap_or_default().to_string();
    let identity = json!({
        "name": name,
        "brand": brand,
        "imageUrl": "",
    });
    ContentResponse {
        text: format!("Dry run identification:\n```json\n{identity}\n```"),
        grounding: Vec::new(),
        warnings: Vec::new(),
    }
}

fn dryrun_valuation(request: &ContentRequest) -> ContentResponse {
    let product = request
        .metadata_str(META_PRODUCT_NAME)
        .unwrap_or("product")
        .trim();
    let seed = stable_seed(product);
    let price = round_cents(50.0 + (seed % 450_000) as f64 / 100.0);
    let factors: [f64; 6] = match seed % 3 {
        0 => [1.18, 1.12, 1.15, 1.08, 1.04, 1.0],
        1 => [0.97, 1.03, 0.99, 1.02, 0.98, 1.0],
        _ => [0.86, 0.9, 0.88, 0.92, 0.95, 1.0],
    };
    let months = trailing_month_labels(chrono::Utc::now().month0() as usize, factors.len());
    let history = months
        .iter()
        .zip(factors)
        .map(|(month, factor)| json!({ "month": month, "price": round_cents(price * factor) }))
        .collect::<Vec<Value>>();

    let min = factors.iter().copied().fold(f64::MAX, f64::min) * price;
    let avg = factors.iter().sum::<f64>() / factors.len() as f64 * price;
    let (status, reasoning) = if price <= min * 1.01 {
        ("GOOD", "Current price is the lowest of the last six months.")
    } else if price > avg * 1.03 {
        ("POOR", "Current price is above the six-month average.")
    } else {
        ("AVERAGE", "Current price is close to the six-month average.")
    };
    let initials = product
        .split_whitespace()
        .filter_map(|word| word.chars().find(|ch| ch.is_ascii_alphanumeric()))
        .map(|ch| ch.to_ascii_uppercase())
        .collect::<String>();

    let body = json!({
        "price": price,
        "storeName": "Dry Run Store",
        "priceHistory": history,
        "coupons": [{
            "code": format!("{initials}10"),
            "description": "10% off at checkout (dry run)",
        }],
        "dealStatus": status,
        "dealReasoning": reasoning,
    });
    let query = product.split_whitespace().collect::<Vec<&str>>().join("+");
    ContentResponse {
        text: format!("Based on the search results:\n{body}"),
        grounding: vec![GroundingSource {
            uri: Some(format!("https://dryrun.pricepulse.invalid/search?q={query}")),
            title: Some("dry run".to_string()),
        }],
        warnings: Vec::new(),
    }
}

fn name_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let without_scheme = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);
    let mut segments = without_scheme.split('/').filter(|part| !part.is_empty());
    let host = segments.next().unwrap_or_default();
    let slug = segments.last().unwrap_or(host);
    slug.split(['-', '_', '+', '.'])
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<String>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Labels for the `count` months ending with `current_month0` (0 = January).
fn trailing_month_labels(current_month0: usize, count: usize) -> Vec<String> {
    (0..count)
        .rev()
        .map(|back| MONTH_ABBREVIATIONS[(current_month0 + 12 * count - back) % 12].to_string())
        .collect()
}

fn stable_seed(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.to_ascii_lowercase().hash(&mut hasher);
    hasher.finish()
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use pricepulse_contracts::extract::extract_json_object;
    use serde_json::{json, Value};

    use super::{name_from_url, trailing_month_labels, DryrunProvider};
    use crate::provider::{ContentProvider, ContentRequest};
    use crate::{META_INPUT_KIND, META_PRODUCT_NAME, META_STAGE, META_SUBJECT};

    fn request(pairs: &[(&str, &str)]) -> ContentRequest {
        let mut request = ContentRequest::text("dryrun-1", "prompt");
        for (key, value) in pairs {
            request
                .metadata
                .insert(key.to_string(), Value::String(value.to_string()));
        }
        request
    }

    #[test]
    fn url_slug_becomes_product_name() {
        assert_eq!(
            name_from_url("https://www.loja.example/p/fone-sony-wh1000xm5?ref=home"),
            "Fone Sony Wh1000xm5"
        );
        assert_eq!(name_from_url("https://shop.example"), "Shop Example");
    }

    #[test]
    fn month_labels_wrap_around_new_year() {
        assert_eq!(
            trailing_month_labels(1, 6),
            vec!["Sep", "Oct", "Nov", "Dec", "Jan", "Feb"]
        );
        assert_eq!(trailing_month_labels(11, 2), vec!["Nov", "Dec"]);
    }

    #[test]
    fn identity_reply_is_extractable() -> anyhow::Result<()> {
        let response = DryrunProvider.generate(&request(&[
            (META_STAGE, "identity"),
            (META_INPUT_KIND, "TEXT"),
            (META_SUBJECT, "Sony WH-1000XM5"),
        ]))?;
        let object = extract_json_object(&response.text).unwrap();
        assert_eq!(object["name"], json!("Sony WH-1000XM5"));
        assert_eq!(object["brand"], json!("Sony"));
        Ok(())
    }

    #[test]
    fn valuation_reply_is_deterministic_with_six_points() -> anyhow::Result<()> {
        let req = request(&[(META_STAGE, "valuation"), (META_PRODUCT_NAME, "Kindle 16GB")]);
        let first = DryrunProvider.generate(&req)?;
        let second = DryrunProvider.generate(&req)?;
        assert_eq!(first.text, second.text);

        let object = extract_json_object(&first.text).unwrap();
        assert_eq!(object["priceHistory"].as_array().map(Vec::len), Some(6));
        assert_eq!(object["coupons"][0]["code"], json!("K110"));
        let last = object["priceHistory"][5]["price"].as_f64().unwrap();
        assert_eq!(Some(last), object["price"].as_f64());
        assert!(first.grounding[0]
            .uri
            .as_deref()
            .unwrap_or_default()
            .ends_with("q=Kindle+16GB"));
        Ok(())
    }

    #[test]
    fn unknown_stage_is_an_error() {
        assert!(DryrunProvider.generate(&request(&[])).is_err());
    }
}
