use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::matching::PlatformMatch;
use crate::domain::platform::Platform;
use crate::domain::pricing::PriceSuggestion;
use crate::domain::product::{CatalogRecord, ProductSpec};

/// Outcome of asking the open web whether a configuration exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExistenceCheck {
    /// The catalog already had an exact match, so nothing was asked.
    NotRequired,
    Confirmed,
    NotFound,
    /// The oracle failed, timed out or is not configured; treated as not found.
    Unavailable { reason: String },
}

impl ExistenceCheck {
    pub fn confirmed(&self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

/// Price of the first exact match on a platform, as handed to the suggestion generator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ListedPrice {
    Listed { product_name: String, price: Option<Decimal> },
    Missing,
}

impl ListedPrice {
    pub fn from_match(platform_match: &PlatformMatch) -> Self {
        match platform_match.records().first() {
            Some(record) => {
                Self::Listed { product_name: record.product_name.clone(), price: record.price }
            }
            None => Self::Missing,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    CatalogUnavailable,
    ExistenceCheckFailed,
    SuggestionUnavailable,
}

/// Non-fatal problem encountered while answering a query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWarning {
    pub kind: WarningKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    pub message: String,
}

/// Everything the price query endpoint returns for one spec.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQueryReport {
    pub spec: ProductSpec,
    pub exact_matches: BTreeMap<Platform, PlatformMatch>,
    pub cross_brand_similar: BTreeMap<Platform, Vec<CatalogRecord>>,
    pub platform_averages: BTreeMap<Platform, Decimal>,
    pub listed_prices: BTreeMap<Platform, ListedPrice>,
    pub missing_platforms: Vec<Platform>,
    pub suggestions: BTreeMap<Platform, PriceSuggestion>,
    pub found_in_catalog: bool,
    pub existence: ExistenceCheck,
    /// Advisory: nothing in any catalog and the web could not confirm the product.
    pub overall_invalid: bool,
    pub warnings: Vec<QueryWarning>,
    pub generated_at: DateTime<Utc>,
}
