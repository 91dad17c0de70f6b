use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical product identity returned by identity resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub name: String,
    pub brand: String,
    /// Empty when no image was found.
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub month: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DealStatus {
    Good,
    Average,
    Poor,
}

impl DealStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GOOD" => Some(Self::Good),
            "AVERAGE" => Some(Self::Average),
            "POOR" => Some(Self::Poor),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Good => "GOOD",
            Self::Average => "AVERAGE",
            Self::Poor => "POOR",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Good => "Great deal",
            Self::Average => "Average price",
            Self::Poor => "Poor deal",
        }
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price analysis for one product.
///
/// `price_history` and `coupons` are synthesized by the model to be plausible;
/// they are not sourced data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Valuation {
    pub price: f64,
    pub store_name: String,
    /// First web citation from search grounding, or empty.
    pub store_url: String,
    pub price_history: Vec<PricePoint>,
    pub coupons: Vec<Coupon>,
    pub deal_status: DealStatus,
    pub deal_reasoning: String,
}

/// A tracked product as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub price: f64,
    pub store_name: String,
    pub store_url: String,
    pub image_url: String,
    pub price_history: Vec<PricePoint>,
    pub coupons: Vec<Coupon>,
    pub deal_status: DealStatus,
    pub deal_reasoning: String,
    pub notifications: bool,
}

impl Product {
    /// Joins both pipeline results into a new record with notifications on.
    pub fn assemble(id: impl Into<String>, identity: Identity, valuation: Valuation) -> Self {
        Self {
            id: id.into(),
            name: identity.name,
            brand: identity.brand,
            image_url: identity.image_url,
            price: valuation.price,
            store_name: valuation.store_name,
            store_url: valuation.store_url,
            price_history: valuation.price_history,
            coupons: valuation.coupons,
            deal_status: valuation.deal_status,
            deal_reasoning: valuation.deal_reasoning,
            notifications: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_valuation() -> Valuation {
        Valuation {
            price: 1899.9,
            store_name: "Loja Exemplo".to_string(),
            store_url: "https://loja.example/sony".to_string(),
            price_history: vec![PricePoint {
                month: "Jan".to_string(),
                price: 2199.0,
            }],
            coupons: vec![Coupon {
                code: "FONE10".to_string(),
                description: "10% off".to_string(),
            }],
            deal_status: DealStatus::Good,
            deal_reasoning: "Lowest in six months.".to_string(),
        }
    }

    #[test]
    fn assemble_copies_both_halves_and_enables_notifications() {
        let identity = Identity {
            name: "Sony WH-1000XM5".to_string(),
            brand: "Sony".to_string(),
            image_url: String::new(),
        };
        let product = Product::assemble("1700000000000", identity, sample_valuation());
        assert_eq!(product.id, "1700000000000");
        assert_eq!(product.name, "Sony WH-1000XM5");
        assert_eq!(product.brand, "Sony");
        assert_eq!(product.price, 1899.9);
        assert_eq!(product.store_url, "https://loja.example/sony");
        assert!(product.notifications);
    }

    #[test]
    fn product_serializes_with_camel_case_fields() {
        let product = Product::assemble("1", Identity::default(), sample_valuation());
        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(value["dealStatus"], json!("GOOD"));
        assert_eq!(value["storeName"], json!("Loja Exemplo"));
        assert_eq!(value["priceHistory"][0]["month"], json!("Jan"));
        assert_eq!(value["imageUrl"], json!(""));
        assert_eq!(value["notifications"], json!(true));
    }

    #[test]
    fn deal_status_parsing_and_labels() {
        assert_eq!(DealStatus::parse(" good "), Some(DealStatus::Good));
        assert_eq!(DealStatus::parse("Average"), Some(DealStatus::Average));
        assert_eq!(DealStatus::parse("POOR"), Some(DealStatus::Poor));
        assert_eq!(DealStatus::parse("EXCELLENT"), None);
        assert_eq!(DealStatus::Poor.label(), "Poor deal");
    }
}
