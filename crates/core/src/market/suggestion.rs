use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::platform::Platform;
use crate::domain::product::ProductSpec;
use crate::domain::report::{ListedPrice, QueryWarning, WarningKind};
use crate::errors::ExternalServiceError;

const ENTRY_MARKER: &str = "📌";
const PRICE_ARROW: char = '→';
const STRATEGY_KEYWORDS: &[&str] = &["logic", "strategy", "how", "pricing"];

/// What the text generator is told about a product and its price gaps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionRequest {
    pub spec: ProductSpec,
    pub listed_prices: BTreeMap<Platform, ListedPrice>,
}

impl SuggestionRequest {
    pub fn new(spec: ProductSpec, listed_prices: BTreeMap<Platform, ListedPrice>) -> Self {
        Self { spec, listed_prices }
    }

    pub fn missing_platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|platform| self.listed_prices.get(platform).map_or(true, ListedPrice::is_missing))
            .collect()
    }

    /// Platforms with a known price, in canonical order.
    pub fn known_prices(&self) -> Vec<(Platform, Decimal)> {
        self.listed_prices
            .iter()
            .filter_map(|(platform, listed)| match listed {
                ListedPrice::Listed { price: Some(price), .. } => Some((*platform, *price)),
                _ => None,
            })
            .collect()
    }
}

/// Produces free-form pricing rationale. The text is opaque to the engine.
#[async_trait]
pub trait SuggestionTextGenerator: Send + Sync {
    async fn generate(&self, request: &SuggestionRequest) -> Result<String, ExternalServiceError>;
}

/// Generator used when no language model is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnconfiguredGenerator;

#[async_trait]
impl SuggestionTextGenerator for UnconfiguredGenerator {
    async fn generate(&self, _request: &SuggestionRequest) -> Result<String, ExternalServiceError> {
        Err(ExternalServiceError::NotConfigured { service: "suggestion generator" })
    }
}

/// One `📌 <platform> → ₹<price>` entry recovered from generated text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedListing {
    pub platform: String,
    pub price: String,
    /// Leading numeric part of `price`, when there is one.
    pub amount: Option<Decimal>,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSuggestion {
    pub entries: Vec<SuggestedListing>,
    pub strategy_notes: String,
}

/// Best-effort extraction of marker lines. Never fails; anything it does not
/// recognise is left out of the result.
pub fn parse_suggestion_reply(text: &str) -> ParsedSuggestion {
    let lines: Vec<&str> = text.trim().lines().map(str::trim).collect();
    let mut parsed = ParsedSuggestion::default();
    let mut strategy_lines = Vec::new();

    let mut index = 0;
    while index < lines.len() {
        let line = lines[index];
        index += 1;

        if let Some(marker_body) = line.strip_prefix(ENTRY_MARKER) {
            let Some((platform, price)) = marker_body.split_once(PRICE_ARROW) else {
                continue;
            };

            let mut reason_lines = Vec::new();
            while index < lines.len() && !lines[index].starts_with(ENTRY_MARKER) {
                if !lines[index].is_empty() {
                    reason_lines.push(strip_reason_label(lines[index]));
                }
                index += 1;
            }

            let price = price.split(PRICE_ARROW).next().unwrap_or_default().replace('₹', "");
            let price = price.trim().to_string();
            parsed.entries.push(SuggestedListing {
                platform: platform.trim().to_string(),
                amount: leading_amount(&price),
                price,
                reason: reason_lines.join(" "),
            });
        } else if parsed.entries.is_empty() && mentions_strategy(line) {
            strategy_lines.push(line);
        }
    }

    parsed.strategy_notes = strategy_lines.join("\n");
    parsed
}

fn strip_reason_label(line: &str) -> &str {
    match line.get(..7) {
        Some(label) if label.eq_ignore_ascii_case("reason:") => line[7..].trim_start(),
        _ => line,
    }
}

fn mentions_strategy(line: &str) -> bool {
    let lowered = line.to_lowercase();
    STRATEGY_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

fn leading_amount(price: &str) -> Option<Decimal> {
    let digits: String = price
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .filter(|c| *c != ',')
        .collect();
    Decimal::from_str(digits.trim_end_matches('.')).ok()
}

/// Generated rationale plus whatever structure could be recovered from it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionAdvice {
    pub text: String,
    pub structured: Vec<SuggestedListing>,
    pub strategy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<QueryWarning>,
}

/// Calls the generator under a deadline. A failed or slow generator yields
/// empty text and a warning instead of an error.
#[derive(Clone)]
pub struct SuggestionAdvisor {
    generator: Arc<dyn SuggestionTextGenerator>,
    timeout: Duration,
}

impl SuggestionAdvisor {
    pub fn new(generator: Arc<dyn SuggestionTextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    pub async fn advise(&self, request: &SuggestionRequest) -> SuggestionAdvice {
        let outcome = match tokio::time::timeout(self.timeout, self.generator.generate(request)).await
        {
            Ok(result) => result,
            Err(_) => Err(ExternalServiceError::Timeout {
                service: "suggestion generator",
                timeout_secs: self.timeout.as_secs(),
            }),
        };

        match outcome {
            Ok(text) => {
                let parsed = parse_suggestion_reply(&text);
                info!(
                    event_name = "market.suggestion.generated",
                    brand = %request.spec.brand,
                    entries = parsed.entries.len(),
                    "suggestion text generated"
                );
                SuggestionAdvice {
                    text,
                    structured: parsed.entries,
                    strategy: parsed.strategy_notes,
                    warning: None,
                }
            }
            Err(error) => {
                warn!(
                    event_name = "market.suggestion.unavailable",
                    brand = %request.spec.brand,
                    error = %error,
                    "suggestion generator failed; returning empty text"
                );
                SuggestionAdvice {
                    warning: Some(QueryWarning {
                        kind: WarningKind::SuggestionUnavailable,
                        platform: None,
                        message: error.to_string(),
                    }),
                    ..SuggestionAdvice::default()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::{
        parse_suggestion_reply, SuggestionAdvisor, SuggestionRequest, SuggestionTextGenerator,
        UnconfiguredGenerator,
    };
    use crate::domain::platform::Platform;
    use crate::domain::product::ProductSpec;
    use crate::domain::report::{ListedPrice, WarningKind};
    use crate::errors::ExternalServiceError;

    const REPLY: &str = "\
Pricing logic: start from the Reliance listing and adjust per platform.
Some filler that is not a note.

📌 Flipkart → ₹57,499
Reason: Flipkart buyers compare aggressively,
so stay under the Reliance price.

📌 Croma → ₹59,000 (approx)
Premium storefront.
📌 Broken marker without arrow
📌 Pai → not sure
";

    fn request() -> SuggestionRequest {
        let spec = ProductSpec::new("Dell", "16GB", "512GB", "i5").expect("valid spec");
        let mut listed = BTreeMap::new();
        listed.insert(
            Platform::Reliance,
            ListedPrice::Listed {
                product_name: "Dell Inspiron 15".to_string(),
                price: Some(Decimal::new(58_000, 0)),
            },
        );
        listed.insert(Platform::Croma, ListedPrice::Missing);
        SuggestionRequest::new(spec, listed)
    }

    #[test]
    fn marker_lines_become_entries_with_reasons() {
        let parsed = parse_suggestion_reply(REPLY);

        assert_eq!(parsed.entries.len(), 3);
        let flipkart = &parsed.entries[0];
        assert_eq!(flipkart.platform, "Flipkart");
        assert_eq!(flipkart.price, "57,499");
        assert_eq!(flipkart.amount, Some(Decimal::new(57_499, 0)));
        assert_eq!(
            flipkart.reason,
            "Flipkart buyers compare aggressively, so stay under the Reliance price."
        );

        let croma = &parsed.entries[1];
        assert_eq!(croma.price, "59,000 (approx)");
        assert_eq!(croma.amount, Some(Decimal::new(59_000, 0)));
        assert_eq!(croma.reason, "Premium storefront.");
    }

    #[test]
    fn unparseable_price_keeps_text_without_amount() {
        let parsed = parse_suggestion_reply(REPLY);
        let pai = &parsed.entries[2];
        assert_eq!(pai.platform, "Pai");
        assert_eq!(pai.price, "not sure");
        assert_eq!(pai.amount, None);
        assert!(pai.reason.is_empty());
    }

    #[test]
    fn strategy_notes_come_from_preamble_keywords() {
        let parsed = parse_suggestion_reply(REPLY);
        assert_eq!(
            parsed.strategy_notes,
            "Pricing logic: start from the Reliance listing and adjust per platform."
        );
    }

    #[test]
    fn garbage_yields_empty_structure() {
        let parsed = parse_suggestion_reply("⚠️ model error\n\n📌\n→ ₹10");
        assert!(parsed.entries.is_empty());
        assert!(parse_suggestion_reply("").entries.is_empty());
    }

    #[test]
    fn request_lists_known_and_missing_platforms() {
        let request = request();
        assert_eq!(request.known_prices(), vec![(Platform::Reliance, Decimal::new(58_000, 0))]);
        assert_eq!(
            request.missing_platforms(),
            vec![Platform::Pai, Platform::Croma, Platform::Flipkart]
        );
    }

    struct CannedGenerator(&'static str);

    #[async_trait]
    impl SuggestionTextGenerator for CannedGenerator {
        async fn generate(&self, _: &SuggestionRequest) -> Result<String, ExternalServiceError> {
            Ok(self.0.to_string())
        }
    }

    struct HangingGenerator;

    #[async_trait]
    impl SuggestionTextGenerator for HangingGenerator {
        async fn generate(&self, _: &SuggestionRequest) -> Result<String, ExternalServiceError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn advisor_parses_generated_text() {
        let advisor = SuggestionAdvisor::new(Arc::new(CannedGenerator(REPLY)), Duration::from_secs(1));
        let advice = advisor.advise(&request()).await;

        assert_eq!(advice.text, REPLY);
        assert_eq!(advice.structured.len(), 3);
        assert!(advice.warning.is_none());
    }

    #[tokio::test]
    async fn advisor_degrades_to_empty_text_on_timeout() {
        let advisor = SuggestionAdvisor::new(Arc::new(HangingGenerator), Duration::from_millis(20));
        let advice = advisor.advise(&request()).await;

        assert!(advice.text.is_empty());
        assert!(advice.structured.is_empty());
        let warning = advice.warning.expect("timeout is reported");
        assert_eq!(warning.kind, WarningKind::SuggestionUnavailable);
    }

    #[tokio::test]
    async fn unconfigured_generator_is_a_warning() {
        let advisor = SuggestionAdvisor::new(Arc::new(UnconfiguredGenerator), Duration::from_secs(1));
        let advice = advisor.advise(&request()).await;
        assert_eq!(
            advice.warning.map(|warning| warning.message),
            Some("suggestion generator is not configured".to_string())
        );
    }
}
