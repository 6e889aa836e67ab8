pub mod catalog;
pub mod existence;
pub mod filters;
pub mod matcher;
pub mod pricing;
pub mod suggestion;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use crate::domain::matching::{ExactMatchSet, PlatformFailure, SimilarProductSet};
use crate::domain::platform::Platform;
use crate::domain::product::ProductSpec;
use crate::domain::report::{
    ExistenceCheck, ListedPrice, PriceQueryReport, QueryWarning, WarningKind,
};

use self::{
    catalog::CatalogAccessor,
    existence::{check_existence, ExistenceOracle, ExistenceQuery},
    matcher::Matcher,
    pricing::{PricingEngine, PricingInput, TieredPricingEngine},
};

pub const DEFAULT_EXISTENCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Answers price queries against a catalog, a pricing engine and an
/// existence oracle. Holds no per-request state and is safe to share.
pub struct PriceQueryRuntime<P = TieredPricingEngine> {
    catalog: Arc<dyn CatalogAccessor>,
    pricing: P,
    oracle: Arc<dyn ExistenceOracle>,
    existence_timeout: Duration,
}

impl<P: PricingEngine> PriceQueryRuntime<P> {
    pub fn new(
        catalog: Arc<dyn CatalogAccessor>,
        pricing: P,
        oracle: Arc<dyn ExistenceOracle>,
        existence_timeout: Duration,
    ) -> Self {
        Self { catalog, pricing, oracle, existence_timeout }
    }

    pub fn catalog(&self) -> &dyn CatalogAccessor {
        self.catalog.as_ref()
    }

    pub fn pricing(&self) -> &P {
        &self.pricing
    }

    pub async fn find_exact_matches(&self, spec: &ProductSpec) -> ExactMatchSet {
        Matcher::new(self.catalog()).find_exact_matches(spec).await
    }

    pub async fn find_cross_brand_similar(&self, spec: &ProductSpec) -> SimilarProductSet {
        Matcher::new(self.catalog()).find_cross_brand_similar(spec).await
    }

    /// Runs both catalog passes, asks the oracle only when no platform has an
    /// exact match, then prices every missing platform.
    pub async fn query(&self, spec: &ProductSpec) -> PriceQueryReport {
        let (exact, similar) =
            futures::join!(self.find_exact_matches(spec), self.find_cross_brand_similar(spec));

        let found_in_catalog = exact.found_any();
        let existence = if found_in_catalog {
            ExistenceCheck::NotRequired
        } else {
            check_existence(self.oracle.as_ref(), &ExistenceQuery::from(spec), self.existence_timeout)
                .await
        };
        let existence_confirmed = found_in_catalog || existence.confirmed();

        let suggestions = self.pricing.suggest_prices(&PricingInput {
            spec,
            matches: &exact.matches,
            averages: &exact.averages,
            existence_confirmed,
        });

        let listed_prices: BTreeMap<Platform, ListedPrice> = Platform::ALL
            .into_iter()
            .map(|platform| {
                let listed =
                    exact.matches.get(&platform).map_or(ListedPrice::Missing, ListedPrice::from_match);
                (platform, listed)
            })
            .collect();

        let warnings = collect_warnings(&exact.failures, &similar.failures, &existence);
        let overall_invalid = !found_in_catalog && !existence.confirmed();

        info!(
            event_name = "market.query.completed",
            brand = %spec.brand,
            found_in_catalog,
            missing_platforms = exact.missing_platforms().len(),
            overall_invalid,
            warnings = warnings.len(),
            "price query completed"
        );

        PriceQueryReport {
            spec: spec.clone(),
            missing_platforms: exact.missing_platforms(),
            exact_matches: exact.matches,
            cross_brand_similar: similar.products,
            platform_averages: exact.averages,
            listed_prices,
            suggestions,
            found_in_catalog,
            existence,
            overall_invalid,
            warnings,
            generated_at: Utc::now(),
        }
    }
}

fn collect_warnings(
    exact_failures: &[PlatformFailure],
    similar_failures: &[PlatformFailure],
    existence: &ExistenceCheck,
) -> Vec<QueryWarning> {
    let mut seen = BTreeSet::new();
    let mut warnings: Vec<QueryWarning> = exact_failures
        .iter()
        .chain(similar_failures)
        .filter(|failure| seen.insert(failure.platform))
        .map(|failure| QueryWarning {
            kind: WarningKind::CatalogUnavailable,
            platform: Some(failure.platform),
            message: failure.reason.clone(),
        })
        .collect();

    if let ExistenceCheck::Unavailable { reason } = existence {
        warnings.push(QueryWarning {
            kind: WarningKind::ExistenceCheckFailed,
            platform: None,
            message: reason.clone(),
        });
    }
    warnings
}
