use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::matching::PlatformMatch;
use crate::domain::platform::Platform;
use crate::domain::pricing::{BrandTier, PriceBreakdown, PriceSuggestion, SuggestedPrice};
use crate::domain::product::ProductSpec;
use crate::errors::DomainError;
use crate::normalize::normalize_text;

/// Suggested prices are rounded half-to-even at two decimal places.
pub const PRICE_DECIMAL_PLACES: u32 = 2;

pub fn round_price(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(PRICE_DECIMAL_PLACES, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(PRICE_DECIMAL_PLACES);
    rounded
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandFactors {
    pub premium: Decimal,
    pub mid: Decimal,
    pub budget: Decimal,
}

impl BrandFactors {
    pub fn for_tier(&self, tier: BrandTier) -> Decimal {
        match tier {
            BrandTier::Premium => self.premium,
            BrandTier::Mid => self.mid,
            BrandTier::Budget => self.budget,
        }
    }
}

/// Static brand-tier and platform multipliers. Built once at startup and only
/// read afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTables {
    pub premium_brands: BTreeSet<String>,
    pub budget_brands: BTreeSet<String>,
    pub mid_brands: BTreeSet<String>,
    pub brand_factors: BrandFactors,
    pub platform_factors: BTreeMap<Platform, Decimal>,
}

impl Default for PricingTables {
    fn default() -> Self {
        let brands =
            |names: &[&str]| -> BTreeSet<String> { names.iter().map(|n| n.to_string()).collect() };
        Self {
            premium_brands: brands(&["apple"]),
            budget_brands: brands(&["avita", "infinix", "jiocloud"]),
            mid_brands: brands(&["acer", "asus", "dell", "hp", "len"]),
            brand_factors: BrandFactors {
                premium: Decimal::new(105, 2),
                mid: Decimal::new(100, 2),
                budget: Decimal::new(95, 2),
            },
            platform_factors: BTreeMap::from([
                (Platform::Reliance, Decimal::new(100, 2)),
                (Platform::Pai, Decimal::new(97, 2)),
                (Platform::Croma, Decimal::new(103, 2)),
                (Platform::Flipkart, Decimal::new(95, 2)),
            ]),
        }
    }
}

impl PricingTables {
    /// Brands outside every list are mid tier.
    pub fn brand_tier(&self, brand: &str) -> BrandTier {
        let brand = normalize_text(brand);
        if self.premium_brands.contains(&brand) {
            BrandTier::Premium
        } else if self.budget_brands.contains(&brand) {
            BrandTier::Budget
        } else {
            BrandTier::Mid
        }
    }

    pub fn platform_factor(&self, platform: Platform) -> Decimal {
        self.platform_factors.get(&platform).copied().unwrap_or(Decimal::ONE)
    }

    /// Lowercases tier entries so lookups line up with normalized brands.
    pub fn normalized(mut self) -> Self {
        let lower = |set: BTreeSet<String>| -> BTreeSet<String> {
            set.into_iter().map(|brand| normalize_text(&brand)).filter(|b| !b.is_empty()).collect()
        };
        self.premium_brands = lower(self.premium_brands);
        self.budget_brands = lower(self.budget_brands);
        self.mid_brands = lower(self.mid_brands);
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let tiers = [
            ("premium", &self.premium_brands),
            ("budget", &self.budget_brands),
            ("mid", &self.mid_brands),
        ];
        for (index, (name, brands)) in tiers.iter().enumerate() {
            for (other_name, other) in tiers.iter().skip(index + 1) {
                if let Some(shared) = brands.intersection(other).next() {
                    return Err(DomainError::InvariantViolation(format!(
                        "brand `{shared}` is listed in both {name} and {other_name} tiers"
                    )));
                }
            }
        }

        let brand_factors = [
            ("premium", self.brand_factors.premium),
            ("mid", self.brand_factors.mid),
            ("budget", self.brand_factors.budget),
        ];
        for (name, factor) in brand_factors {
            if factor <= Decimal::ZERO {
                return Err(DomainError::InvariantViolation(format!(
                    "{name} brand factor must be positive, got {factor}"
                )));
            }
        }
        for (platform, factor) in &self.platform_factors {
            if *factor <= Decimal::ZERO {
                return Err(DomainError::InvariantViolation(format!(
                    "platform factor for {platform} must be positive, got {factor}"
                )));
            }
        }
        Ok(())
    }
}

/// What the pricing engine needs from the matching pass.
#[derive(Clone, Copy, Debug)]
pub struct PricingInput<'a> {
    pub spec: &'a ProductSpec,
    pub matches: &'a BTreeMap<Platform, PlatformMatch>,
    pub averages: &'a BTreeMap<Platform, Decimal>,
    pub existence_confirmed: bool,
}

pub trait PricingEngine: Send + Sync {
    /// One suggestion per missing platform, keyed by platform.
    fn suggest_prices(&self, input: &PricingInput<'_>) -> BTreeMap<Platform, PriceSuggestion>;
}

/// Reference price × brand factor × platform factor.
#[derive(Clone, Debug, Default)]
pub struct TieredPricingEngine {
    tables: PricingTables,
}

impl TieredPricingEngine {
    pub fn new(tables: PricingTables) -> Self {
        Self { tables: tables.normalized() }
    }

    pub fn tables(&self) -> &PricingTables {
        &self.tables
    }

    fn price_platform(
        &self,
        platform: Platform,
        tier: BrandTier,
        averages: &BTreeMap<Platform, Decimal>,
    ) -> SuggestedPrice {
        // Never reference the platform being priced, even if a stale average for it is around.
        let reference: Vec<(Platform, Decimal)> = averages
            .iter()
            .filter(|(candidate, _)| **candidate != platform)
            .map(|(candidate, average)| (*candidate, *average))
            .collect();
        if reference.is_empty() {
            return SuggestedPrice::NoData;
        }

        let reference_platforms: Vec<Platform> = reference.iter().map(|(p, _)| *p).collect();
        let average_reference_price = reference.iter().map(|(_, average)| *average).sum::<Decimal>()
            / Decimal::from(reference.len());
        let brand_factor = self.tables.brand_factors.for_tier(tier);
        let platform_factor = self.tables.platform_factor(platform);
        let combined_factor = brand_factor * platform_factor;
        let suggested_price = round_price(average_reference_price * combined_factor);

        let names: Vec<&str> = reference_platforms.iter().map(Platform::as_str).collect();
        let strategy = format!(
            "Average price from platforms [{}] × brand factor ({brand_factor}) × platform factor ({platform_factor})",
            names.join(", ")
        );

        SuggestedPrice::Priced(PriceBreakdown {
            reference_platforms,
            average_reference_price,
            brand_tier: tier,
            brand_factor,
            platform_factor,
            combined_factor,
            suggested_price,
            strategy,
        })
    }
}

impl PricingEngine for TieredPricingEngine {
    fn suggest_prices(&self, input: &PricingInput<'_>) -> BTreeMap<Platform, PriceSuggestion> {
        let tier = self.tables.brand_tier(&input.spec.brand);

        Platform::ALL
            .into_iter()
            .filter(|platform| input.matches.get(platform).map_or(true, PlatformMatch::is_missing))
            .map(|platform| {
                let suggestion = PriceSuggestion {
                    platform,
                    price: self.price_platform(platform, tier, input.averages),
                    existence_confirmed: input.existence_confirmed,
                };
                (platform, suggestion)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;

    use super::{round_price, PricingEngine, PricingInput, PricingTables, TieredPricingEngine};
    use crate::domain::matching::PlatformMatch;
    use crate::domain::platform::Platform;
    use crate::domain::pricing::{BrandTier, SuggestedPrice};
    use crate::domain::product::{CatalogRecord, ProductSpec};

    fn spec(brand: &str) -> ProductSpec {
        ProductSpec::new(brand, "16gb", "512gb", "i5").expect("valid spec")
    }

    fn available(platform: Platform) -> PlatformMatch {
        PlatformMatch::Available(vec![CatalogRecord {
            platform,
            product_name: "listing".to_string(),
            brand: "dell".to_string(),
            ram: "16gb".to_string(),
            storage: "512gb".to_string(),
            processor_type: "i5".to_string(),
            processor_series: String::new(),
            price: Some(Decimal::new(55_000, 0)),
            mrp: None,
        }])
    }

    fn all_missing_except(present: &[Platform]) -> BTreeMap<Platform, PlatformMatch> {
        Platform::ALL
            .into_iter()
            .map(|platform| {
                let entry = if present.contains(&platform) {
                    available(platform)
                } else {
                    PlatformMatch::NotAvailable
                };
                (platform, entry)
            })
            .collect()
    }

    #[test]
    fn premium_brand_on_discount_platform_matches_worked_example() {
        let engine = TieredPricingEngine::default();
        let spec = spec("Apple");
        let matches = all_missing_except(&[Platform::Reliance]);
        let averages = BTreeMap::from([(Platform::Reliance, Decimal::new(50_000, 0))]);

        let suggestions = engine.suggest_prices(&PricingInput {
            spec: &spec,
            matches: &matches,
            averages: &averages,
            existence_confirmed: true,
        });

        let flipkart = suggestions[&Platform::Flipkart].price.breakdown().expect("priced");
        assert_eq!(flipkart.brand_tier, BrandTier::Premium);
        assert_eq!(flipkart.combined_factor, Decimal::new(105, 2) * Decimal::new(95, 2));
        assert_eq!(flipkart.suggested_price.to_string(), "49875.00");
        assert!(!suggestions.contains_key(&Platform::Reliance));
    }

    #[test]
    fn no_reference_average_yields_explicit_no_data() {
        let engine = TieredPricingEngine::default();
        let spec = spec("dell");
        let matches = all_missing_except(&[]);
        let averages = BTreeMap::new();

        let suggestions = engine.suggest_prices(&PricingInput {
            spec: &spec,
            matches: &matches,
            averages: &averages,
            existence_confirmed: false,
        });

        assert_eq!(suggestions.len(), 4);
        for suggestion in suggestions.values() {
            assert_eq!(suggestion.price, SuggestedPrice::NoData);
            assert_eq!(suggestion.price.amount(), None);
            assert!(!suggestion.existence_confirmed);
        }
    }

    #[test]
    fn missing_platform_never_references_its_own_stale_average() {
        let engine = TieredPricingEngine::default();
        let spec = spec("dell");
        let matches = all_missing_except(&[Platform::Reliance]);
        let averages = BTreeMap::from([
            (Platform::Reliance, Decimal::new(40_000, 0)),
            (Platform::Croma, Decimal::new(90_000, 0)),
        ]);

        let suggestions = engine.suggest_prices(&PricingInput {
            spec: &spec,
            matches: &matches,
            averages: &averages,
            existence_confirmed: true,
        });

        let croma = suggestions[&Platform::Croma].price.breakdown().expect("priced");
        assert_eq!(croma.reference_platforms, vec![Platform::Reliance]);
        assert_eq!(croma.average_reference_price, Decimal::new(40_000, 0));

        let pai = suggestions[&Platform::Pai].price.breakdown().expect("priced");
        assert_eq!(pai.reference_platforms, vec![Platform::Reliance, Platform::Croma]);
        assert_eq!(pai.average_reference_price, Decimal::new(65_000, 0));
    }

    #[test]
    fn unlisted_brand_defaults_to_mid_tier() {
        let tables = PricingTables::default();
        assert_eq!(tables.brand_tier("Framework"), BrandTier::Mid);
        assert_eq!(tables.brand_factors.for_tier(BrandTier::Mid), Decimal::ONE);
        assert_eq!(tables.brand_tier(" INFINIX "), BrandTier::Budget);
    }

    #[test]
    fn overridden_platform_factor_prices_end_to_end_example() {
        let mut tables = PricingTables::default();
        tables.platform_factors.insert(Platform::Pai, Decimal::new(110, 2));
        let engine = TieredPricingEngine::new(tables);
        let spec = spec("dell");
        let matches = all_missing_except(&[Platform::Reliance]);
        let averages = BTreeMap::from([(Platform::Reliance, Decimal::new(55_000, 0))]);

        let suggestions = engine.suggest_prices(&PricingInput {
            spec: &spec,
            matches: &matches,
            averages: &averages,
            existence_confirmed: true,
        });

        let pai = suggestions[&Platform::Pai].price.breakdown().expect("priced");
        assert_eq!(pai.suggested_price.to_string(), "60500.00");
        assert_eq!(pai.reference_platforms, vec![Platform::Reliance]);
        assert!(pai.strategy.contains("[reliance]"));
    }

    #[test]
    fn unknown_platform_factor_defaults_to_one() {
        let mut tables = PricingTables::default();
        tables.platform_factors.remove(&Platform::Croma);
        assert_eq!(tables.platform_factor(Platform::Croma), Decimal::ONE);
    }

    #[test]
    fn rounding_is_half_to_even() {
        assert_eq!(round_price(Decimal::new(100_005, 3)).to_string(), "100.00");
        assert_eq!(round_price(Decimal::new(100_015, 3)).to_string(), "100.02");
        assert_eq!(round_price(Decimal::new(100_0051, 4)).to_string(), "100.01");
        assert_eq!(round_price(Decimal::new(60_500, 0)).to_string(), "60500.00");
    }

    #[test]
    fn overlapping_tiers_fail_validation() {
        let mut tables = PricingTables::default();
        tables.budget_brands.insert("dell".to_string());
        let error = tables.validate().expect_err("dell cannot be both mid and budget");
        assert!(error.to_string().contains("dell"));
        assert!(PricingTables::default().validate().is_ok());
    }

    #[test]
    fn non_positive_factor_fails_validation() {
        let mut tables = PricingTables::default();
        tables.platform_factors.insert(Platform::Flipkart, Decimal::ZERO);
        assert!(tables.validate().is_err());
    }
}
