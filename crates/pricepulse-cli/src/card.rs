use std::fmt::Write as _;

use pricepulse_contracts::products::{PricePoint, Product};

const BAR_WIDTH: usize = 24;

/// Formats a price for display. BRL follows pt-BR conventions
/// (`R$ 1.899,90`); other currencies use `CODE 1,899.90`.
pub fn format_price(price: f64, currency: &str) -> String {
    let cents = (price * 100.0).round().max(0.0) as u64;
    let whole = cents / 100;
    let fraction = cents % 100;
    if currency.eq_ignore_ascii_case("BRL") {
        format!("R$ {},{fraction:02}", group_thousands(whole, '.'))
    } else {
        format!(
            "{} {}.{fraction:02}",
            currency.to_ascii_uppercase(),
            group_thousands(whole, ',')
        )
    }
}

fn group_thousands(value: u64, separator: char) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

fn history_chart(history: &[PricePoint], currency: &str) -> Vec<String> {
    let max = history
        .iter()
        .map(|point| point.price)
        .fold(0.0_f64, f64::max);
    let label_width = history
        .iter()
        .map(|point| point.month.chars().count())
        .max()
        .unwrap_or(0);
    history
        .iter()
        .map(|point| {
            let filled = if max > 0.0 {
                ((point.price / max) * BAR_WIDTH as f64).round() as usize
            } else {
                0
            };
            format!(
                "  {:<label_width$} {:<BAR_WIDTH$} {}",
                point.month,
                "█".repeat(filled.min(BAR_WIDTH)),
                format_price(point.price, currency)
            )
        })
        .collect()
}

pub fn render_card(product: &Product, currency: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}] {}", product.id, product.name);
    if !product.brand.is_empty() {
        let _ = writeln!(out, "  Brand: {}", product.brand);
    }
    let _ = writeln!(out, "  Price: {}", format_price(product.price, currency));
    match (product.store_name.is_empty(), product.store_url.is_empty()) {
        (false, false) => {
            let _ = writeln!(out, "  Store: {} <{}>", product.store_name, product.store_url);
        }
        (false, true) => {
            let _ = writeln!(out, "  Store: {}", product.store_name);
        }
        (true, false) => {
            let _ = writeln!(out, "  Store: <{}>", product.store_url);
        }
        (true, true) => {}
    }
    let _ = writeln!(out, "  {}", product.deal_status.label());
    if !product.deal_reasoning.is_empty() {
        let _ = writeln!(out, "  {}", product.deal_reasoning);
    }
    if !product.price_history.is_empty() {
        let _ = writeln!(out, "  Price history:");
        for line in history_chart(&product.price_history, currency) {
            let _ = writeln!(out, "{line}");
        }
    }
    if product.coupons.is_empty() {
        let _ = writeln!(out, "  Coupons: none found");
    } else {
        let _ = writeln!(out, "  Coupons:");
        for coupon in &product.coupons {
            if coupon.description.is_empty() {
                let _ = writeln!(out, "    {}", coupon.code);
            } else {
                let _ = writeln!(out, "    {}  {}", coupon.code, coupon.description);
            }
        }
    }
    let _ = writeln!(
        out,
        "  Notifications: {}",
        if product.notifications { "on" } else { "off" }
    );
    if !product.image_url.is_empty() {
        let _ = writeln!(out, "  Image: {}", product.image_url);
    }
    out
}

/// One line per product for listings.
pub fn summary_line(product: &Product, currency: &str) -> String {
    format!(
        "[{}] {} | {} | {}{}",
        product.id,
        product.name,
        format_price(product.price, currency),
        product.deal_status.as_str(),
        if product.notifications { "" } else { " | muted" }
    )
}

#[cfg(test)]
mod tests {
    use pricepulse_contracts::products::{Coupon, DealStatus, PricePoint, Product};

    use super::{format_price, render_card, summary_line, BAR_WIDTH};

    fn product() -> Product {
        let prices = [2299.0, 2199.0, 2249.0, 2099.0, 1999.0, 1899.9];
        Product {
            id: "1700000000000".to_string(),
            name: "Sony WH-1000XM5".to_string(),
            brand: "Sony".to_string(),
            price: 1899.9,
            store_name: "Loja Exemplo".to_string(),
            store_url: "https://loja.example/sony".to_string(),
            image_url: String::new(),
            price_history: ["Jan", "Feb", "Mar", "Apr", "May", "Jun"]
                .iter()
                .zip(prices)
                .map(|(month, price)| PricePoint {
                    month: month.to_string(),
                    price,
                })
                .collect(),
            coupons: vec![Coupon {
                code: "FONE10".to_string(),
                description: "10% off".to_string(),
            }],
            deal_status: DealStatus::Good,
            deal_reasoning: "Lowest price in six months.".to_string(),
            notifications: true,
        }
    }

    #[test]
    fn brl_uses_brazilian_separators() {
        assert_eq!(format_price(1899.9, "BRL"), "R$ 1.899,90");
        assert_eq!(format_price(1_234_567.5, "brl"), "R$ 1.234.567,50");
        assert_eq!(format_price(5.0, "BRL"), "R$ 5,00");
        assert_eq!(format_price(999.999, "BRL"), "R$ 1.000,00");
    }

    #[test]
    fn other_currencies_use_code_prefix() {
        assert_eq!(format_price(1899.9, "usd"), "USD 1,899.90");
        assert_eq!(format_price(0.5, "EUR"), "EUR 0.50");
    }

    #[test]
    fn card_shows_deal_chart_and_coupons() {
        let card = render_card(&product(), "BRL");
        assert!(card.starts_with("[1700000000000] Sony WH-1000XM5\n"));
        assert!(card.contains("  Price: R$ 1.899,90\n"));
        assert!(card.contains("Store: Loja Exemplo <https://loja.example/sony>"));
        assert!(card.contains("Great deal"));
        assert!(card.contains("    FONE10  10% off\n"));
        assert!(card.contains("Notifications: on"));
        assert!(!card.contains("Image:"));

        let jan = card.lines().find(|line| line.trim_start().starts_with("Jan")).unwrap();
        assert_eq!(jan.matches('█').count(), BAR_WIDTH);
        let chart_rows = card.lines().filter(|line| line.contains('█')).count();
        assert_eq!(chart_rows, 6);
    }

    #[test]
    fn card_without_coupons_says_so() {
        let mut item = product();
        item.coupons.clear();
        let card = render_card(&item, "BRL");
        assert!(card.contains("  Coupons: none found\n"));
        assert!(!card.contains("  Coupons:\n"));
    }

    #[test]
    fn muted_products_are_marked_in_listing() {
        let mut item = product();
        assert_eq!(
            summary_line(&item, "BRL"),
            "[1700000000000] Sony WH-1000XM5 | R$ 1.899,90 | GOOD"
        );
        item.notifications = false;
        assert!(summary_line(&item, "BRL").ends_with(" | muted"));
    }
}
