use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::platform::Platform;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrandTier {
    Premium,
    Mid,
    Budget,
}

impl BrandTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Premium => "premium",
            Self::Mid => "mid",
            Self::Budget => "budget",
        }
    }
}

/// Audit trail behind one suggested price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub reference_platforms: Vec<Platform>,
    pub average_reference_price: Decimal,
    pub brand_tier: BrandTier,
    pub brand_factor: Decimal,
    pub platform_factor: Decimal,
    pub combined_factor: Decimal,
    pub suggested_price: Decimal,
    pub strategy: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SuggestedPrice {
    Priced(PriceBreakdown),
    /// No other platform had an average price to reference.
    NoData,
}

impl SuggestedPrice {
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            Self::Priced(breakdown) => Some(breakdown.suggested_price),
            Self::NoData => None,
        }
    }

    pub fn breakdown(&self) -> Option<&PriceBreakdown> {
        match self {
            Self::Priced(breakdown) => Some(breakdown),
            Self::NoData => None,
        }
    }
}

/// Suggested listing price for a platform that has no exact match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSuggestion {
    pub platform: Platform,
    pub price: SuggestedPrice,
    pub existence_confirmed: bool,
}
