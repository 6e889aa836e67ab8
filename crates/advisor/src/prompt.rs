use spi_core::domain::report::ListedPrice;
use spi_core::SuggestionRequest;

/// Builds the pricing-assistant prompt for one product.
///
/// Every platform is listed, known prices first-class and gaps as `Missing`,
/// followed by the marker-line answer format the reply parser understands.
pub fn render_prompt(request: &SuggestionRequest) -> String {
    let spec = &request.spec;
    let mut prompt = format!(
        "You are a pricing assistant for a laptop reseller.\n\n\
         A vendor wants to list the following product:\n\
         Brand: {}\n\
         RAM: {}\n\
         Storage: {}\n\
         Processor: {}\n\n\
         Current prices of the same product on each platform:\n",
        spec.brand, spec.ram, spec.storage, spec.processor_series
    );

    for (platform, listed) in &request.listed_prices {
        let price = match listed {
            ListedPrice::Listed { price: Some(price), .. } => format!("₹{price}"),
            ListedPrice::Listed { price: None, .. } | ListedPrice::Missing => "Missing".to_string(),
        };
        prompt.push_str(&format!("{}: {price}\n", platform.display_name()));
    }

    let missing = request.missing_platforms();
    if missing.is_empty() {
        prompt.push_str(
            "\nThe product is listed on every platform.\n\
             Review whether each listed price is competitive.\n",
        );
    } else {
        let names: Vec<&str> = missing.iter().map(|platform| platform.display_name()).collect();
        prompt.push_str(&format!(
            "\nMissing platforms: {}\nSuggest a selling price for each missing platform.\n",
            names.join(", ")
        ));
    }

    prompt.push_str(
        "\nConsider brand tier, platform pricing patterns and the prices above.\n\
         Derive your own numbers; do not reuse the sample amounts below.\n\
         Answer in exactly this format, one block per platform:\n\n\
         📌 Flipkart → ₹57,000\n\
         Reason: <why this amount>\n\n\
         📌 Croma → ₹59,000\n\
         Reason: <why this amount>\n\n\
         Do not skip the Reason line.\n",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;

    use spi_core::domain::report::ListedPrice;
    use spi_core::{Platform, ProductSpec, SuggestionRequest};

    use super::render_prompt;

    fn request(listed: &[(Platform, ListedPrice)]) -> SuggestionRequest {
        let spec = ProductSpec::new("Dell", "16GB", "512GB", "i5").expect("valid spec");
        let mut listed_prices: BTreeMap<Platform, ListedPrice> =
            Platform::ALL.into_iter().map(|platform| (platform, ListedPrice::Missing)).collect();
        listed_prices.extend(listed.iter().cloned());
        SuggestionRequest::new(spec, listed_prices)
    }

    #[test]
    fn prompt_lists_prices_gaps_and_answer_format() {
        let prompt = render_prompt(&request(&[(
            Platform::Reliance,
            ListedPrice::Listed {
                product_name: "Dell Inspiron".to_string(),
                price: Some(Decimal::new(55_990, 0)),
            },
        )]));

        assert!(prompt.contains("Brand: Dell"));
        assert!(prompt.contains("Processor: i5"));
        assert!(prompt.contains("Reliance: ₹55990"));
        assert!(prompt.contains("Croma: Missing"));
        assert!(prompt.contains("Missing platforms: Pai, Croma, Flipkart"));
        assert!(prompt.contains("📌 Flipkart → ₹57,000"));
        assert!(prompt.contains("Reason:"));
    }

    #[test]
    fn fully_listed_product_asks_for_review() {
        let listed: Vec<(Platform, ListedPrice)> = Platform::ALL
            .into_iter()
            .map(|platform| {
                (
                    platform,
                    ListedPrice::Listed {
                        product_name: "Dell".to_string(),
                        price: Some(Decimal::new(50_000, 0)),
                    },
                )
            })
            .collect();

        let prompt = render_prompt(&request(&listed));

        assert!(prompt.contains("listed on every platform"));
        assert!(!prompt.contains("Missing platforms"));
    }

    #[test]
    fn product_and_price_sections_are_one_line_per_item() {
        let prompt = render_prompt(&request(&[]));
        let lines: Vec<&str> = prompt.lines().collect();

        assert_eq!(
            &lines[2..7],
            &[
                "A vendor wants to list the following product:",
                "Brand: Dell",
                "RAM: 16GB",
                "Storage: 512GB",
                "Processor: i5",
            ]
        );
        assert_eq!(
            &lines[8..13],
            &[
                "Current prices of the same product on each platform:",
                "Reliance: Missing",
                "Pai: Missing",
                "Croma: Missing",
                "Flipkart: Missing",
            ]
        );
        assert_eq!(lines[14], "Missing platforms: Reliance, Pai, Croma, Flipkart");
    }
}
