use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::product::ProductSpec;
use crate::domain::report::ExistenceCheck;
use crate::errors::ExternalServiceError;

/// Attributes the oracle looks for, plus the free-text query it sends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistenceQuery {
    pub query_text: String,
    pub brand: String,
    pub ram: String,
    pub storage: String,
    pub processor: String,
}

impl From<&ProductSpec> for ExistenceQuery {
    fn from(spec: &ProductSpec) -> Self {
        Self {
            query_text: spec.search_query(),
            brand: spec.brand.clone(),
            ram: spec.ram.clone(),
            storage: spec.storage.clone(),
            processor: spec.processor_series.clone(),
        }
    }
}

/// One organic web search result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

/// Confirms whether a product plausibly exists on the open market.
#[async_trait]
pub trait ExistenceOracle: Send + Sync {
    async fn check_exists(&self, query: &ExistenceQuery) -> Result<bool, ExternalServiceError>;
}

/// Oracle used when web search is switched off; every check is "unknown".
#[derive(Clone, Copy, Debug, Default)]
pub struct UnconfiguredOracle;

#[async_trait]
impl ExistenceOracle for UnconfiguredOracle {
    async fn check_exists(&self, _query: &ExistenceQuery) -> Result<bool, ExternalServiceError> {
        Err(ExternalServiceError::NotConfigured { service: "web search" })
    }
}

/// Keeps ASCII letters, digits and spaces, then lowercases and trims.
pub fn normalize_search_text(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

/// True when a hit's title and snippet mention every non-empty target attribute.
pub fn hit_mentions_product(query: &ExistenceQuery, hit: &SearchHit) -> bool {
    let text = normalize_search_text(&format!("{} {}", hit.title, hit.snippet));

    let brand = normalize_search_text(&query.brand);
    let ram = normalize_search_text(&query.ram).replace("gb", "");
    let storage = normalize_search_text(&query.storage).replace("gb", "").replace("tb", "");
    let processor = normalize_search_text(&query.processor);

    let needles = [brand.trim(), ram.trim(), storage.trim(), processor.trim()];
    needles.iter().all(|needle| needle.is_empty() || text.contains(needle))
}

pub fn hits_confirm_product(query: &ExistenceQuery, hits: &[SearchHit]) -> bool {
    hits.iter().any(|hit| hit_mentions_product(query, hit))
}

/// Runs the oracle under a deadline. Failures and timeouts degrade to
/// [`ExistenceCheck::Unavailable`], which callers treat as "not confirmed".
pub async fn check_existence(
    oracle: &dyn ExistenceOracle,
    query: &ExistenceQuery,
    timeout: Duration,
) -> ExistenceCheck {
    let outcome = match tokio::time::timeout(timeout, oracle.check_exists(query)).await {
        Ok(result) => result,
        Err(_) => Err(ExternalServiceError::Timeout {
            service: "web search",
            timeout_secs: timeout.as_secs(),
        }),
    };

    match outcome {
        Ok(true) => {
            info!(
                event_name = "market.existence.confirmed",
                query = %query.query_text,
                "web search confirmed product exists"
            );
            ExistenceCheck::Confirmed
        }
        Ok(false) => ExistenceCheck::NotFound,
        Err(error) => {
            warn!(
                event_name = "market.existence.unavailable",
                query = %query.query_text,
                error = %error,
                "existence check failed; treating product as unconfirmed"
            );
            ExistenceCheck::Unavailable { reason: error.to_string() }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{
        check_existence, hit_mentions_product, hits_confirm_product, normalize_search_text,
        ExistenceOracle, ExistenceQuery, SearchHit, UnconfiguredOracle,
    };
    use crate::domain::product::ProductSpec;
    use crate::domain::report::ExistenceCheck;
    use crate::errors::ExternalServiceError;

    fn query() -> ExistenceQuery {
        let spec = ProductSpec::new("Dell", "16GB", "512GB", "i5").expect("valid spec");
        ExistenceQuery::from(&spec)
    }

    fn hit(title: &str, snippet: &str) -> SearchHit {
        SearchHit { title: title.to_string(), snippet: snippet.to_string() }
    }

    #[test]
    fn query_text_describes_the_laptop() {
        assert_eq!(query().query_text, "Dell 16GB 512GB i5 laptop");
    }

    #[test]
    fn normalization_strips_punctuation() {
        assert_eq!(normalize_search_text(" Dell Inspiron-15 (i5), 16GB! "), "dell inspiron15 i5 16gb");
    }

    #[test]
    fn hit_needs_every_attribute() {
        let query = query();
        assert!(hit_mentions_product(
            &query,
            &hit("Dell Inspiron 15 i5 laptop", "16 GB RAM, 512 GB SSD, free shipping")
        ));
        assert!(!hit_mentions_product(&query, &hit("Dell Inspiron 15 i7", "16 GB RAM, 512 GB SSD")));
        assert!(!hit_mentions_product(&query, &hit("HP Pavilion i5", "16 GB RAM, 512 GB SSD")));
    }

    #[test]
    fn any_single_hit_is_enough() {
        let hits = vec![hit("Unrelated", "nothing here"), hit("DELL i5 16GB 512GB", "")];
        assert!(hits_confirm_product(&query(), &hits));
        assert!(!hits_confirm_product(&query(), &[]));
    }

    struct SlowOracle;

    #[async_trait]
    impl ExistenceOracle for SlowOracle {
        async fn check_exists(&self, _: &ExistenceQuery) -> Result<bool, ExternalServiceError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(true)
        }
    }

    struct FixedOracle(bool);

    #[async_trait]
    impl ExistenceOracle for FixedOracle {
        async fn check_exists(&self, _: &ExistenceQuery) -> Result<bool, ExternalServiceError> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn timeout_degrades_to_unavailable() {
        let check = check_existence(&SlowOracle, &query(), Duration::from_millis(20)).await;
        assert!(matches!(check, ExistenceCheck::Unavailable { .. }));
        assert!(!check.confirmed());
    }

    #[tokio::test]
    async fn unconfigured_oracle_is_unavailable_not_an_error() {
        let check = check_existence(&UnconfiguredOracle, &query(), Duration::from_secs(1)).await;
        assert_eq!(
            check,
            ExistenceCheck::Unavailable { reason: "web search is not configured".to_string() }
        );
    }

    #[tokio::test]
    async fn oracle_answer_is_reported_verbatim() {
        let yes = check_existence(&FixedOracle(true), &query(), Duration::from_secs(1)).await;
        let no = check_existence(&FixedOracle(false), &query(), Duration::from_secs(1)).await;
        assert_eq!(yes, ExistenceCheck::Confirmed);
        assert_eq!(no, ExistenceCheck::NotFound);
    }
}
