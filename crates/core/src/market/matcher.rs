use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::warn;

use crate::domain::matching::{ExactMatchSet, PlatformFailure, PlatformMatch, SimilarProductSet};
use crate::domain::platform::Platform;
use crate::domain::product::{CatalogRecord, ProductSpec};
use crate::market::catalog::{CatalogAccessor, CatalogFilter};
use crate::normalize::{fields_match, normalize_text, FieldKind};

/// Finds exact and cross-brand matches for a spec across every platform.
///
/// Platforms are read concurrently. A platform whose catalog read fails is
/// reported as not available and recorded in `failures`; it never fails the
/// whole pass.
pub struct Matcher<'a> {
    catalog: &'a dyn CatalogAccessor,
}

impl<'a> Matcher<'a> {
    pub fn new(catalog: &'a dyn CatalogAccessor) -> Self {
        Self { catalog }
    }

    pub async fn find_exact_matches(&self, spec: &ProductSpec) -> ExactMatchSet {
        let filter = CatalogFilter::exact_match(spec);
        let reads = Platform::ALL.map(|platform| {
            let filter = &filter;
            async move { (platform, self.catalog.find(platform, filter).await) }
        });

        let mut set = ExactMatchSet::default();
        for (platform, outcome) in join_all(reads).await {
            match outcome {
                Ok(records) => {
                    if let Some(average) = average_price(&records) {
                        set.averages.insert(platform, average);
                    }
                    set.matches.insert(platform, PlatformMatch::from_records(records));
                }
                Err(error) => {
                    warn!(
                        event_name = "market.matcher.platform_unavailable",
                        platform = %platform,
                        pass = "exact",
                        error = %error,
                        "catalog read failed; treating platform as not available"
                    );
                    set.matches.insert(platform, PlatformMatch::NotAvailable);
                    set.failures.push(PlatformFailure { platform, reason: error.to_string() });
                }
            }
        }
        set
    }

    pub async fn find_cross_brand_similar(&self, spec: &ProductSpec) -> SimilarProductSet {
        let reads = Platform::ALL
            .map(|platform| async move { (platform, self.catalog.list_all(platform).await) });

        let mut set = SimilarProductSet::default();
        for (platform, outcome) in join_all(reads).await {
            match outcome {
                Ok(records) => {
                    let similar: Vec<CatalogRecord> = records
                        .into_iter()
                        .filter(|record| is_cross_brand_similar(spec, record))
                        .collect();
                    if !similar.is_empty() {
                        set.products.insert(platform, similar);
                    }
                }
                Err(error) => {
                    warn!(
                        event_name = "market.matcher.platform_unavailable",
                        platform = %platform,
                        pass = "cross_brand",
                        error = %error,
                        "catalog scan failed; skipping platform for similar products"
                    );
                    set.failures.push(PlatformFailure { platform, reason: error.to_string() });
                }
            }
        }
        set
    }
}

/// Same RAM, storage and processor series as `spec`, sold under another brand.
/// Listings with a blank brand are left out: an unknown brand is not a different one.
pub fn is_cross_brand_similar(spec: &ProductSpec, record: &CatalogRecord) -> bool {
    let record_brand = normalize_text(&record.brand);
    !record_brand.is_empty()
        && record_brand != normalize_text(&spec.brand)
        && fields_match(FieldKind::Compact, &spec.ram, &record.ram)
        && fields_match(FieldKind::Compact, &spec.storage, &record.storage)
        && fields_match(FieldKind::Processor, &spec.processor_series, &record.processor_series)
}

/// Mean of the listed prices, skipping records without one.
pub fn average_price(records: &[CatalogRecord]) -> Option<Decimal> {
    let prices: Vec<Decimal> = records.iter().filter_map(|record| record.price).collect();
    if prices.is_empty() {
        return None;
    }
    Some(prices.iter().copied().sum::<Decimal>() / Decimal::from(prices.len()))
}
