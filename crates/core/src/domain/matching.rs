use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::platform::Platform;
use crate::domain::product::CatalogRecord;

/// Exact-match outcome for a single platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "records", rename_all = "snake_case")]
pub enum PlatformMatch {
    Available(Vec<CatalogRecord>),
    NotAvailable,
}

impl PlatformMatch {
    pub fn from_records(records: Vec<CatalogRecord>) -> Self {
        if records.is_empty() {
            Self::NotAvailable
        } else {
            Self::Available(records)
        }
    }

    /// A platform is missing when it has no usable exact match, whichever way
    /// the absence was recorded.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Available(records) => records.is_empty(),
            Self::NotAvailable => true,
        }
    }

    pub fn records(&self) -> &[CatalogRecord] {
        match self {
            Self::Available(records) => records,
            Self::NotAvailable => &[],
        }
    }
}

/// Catalog read that could not be completed for one platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformFailure {
    pub platform: Platform,
    pub reason: String,
}

/// Result of the exact-match pass across every platform.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactMatchSet {
    pub matches: BTreeMap<Platform, PlatformMatch>,
    /// Mean listed price over the exact matches that carry a price.
    pub averages: BTreeMap<Platform, Decimal>,
    pub failures: Vec<PlatformFailure>,
}

impl ExactMatchSet {
    pub fn found_any(&self) -> bool {
        self.matches.values().any(|platform_match| !platform_match.is_missing())
    }

    pub fn missing_platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|platform| self.matches.get(platform).map_or(true, PlatformMatch::is_missing))
            .collect()
    }
}

/// Same-spec listings from other brands, grouped by platform. Platforms without
/// any such listing are left out.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarProductSet {
    pub products: BTreeMap<Platform, Vec<CatalogRecord>>,
    pub failures: Vec<PlatformFailure>,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{ExactMatchSet, PlatformMatch};
    use crate::domain::platform::Platform;

    #[test]
    fn empty_available_list_counts_as_missing() {
        assert!(PlatformMatch::Available(Vec::new()).is_missing());
        assert!(PlatformMatch::NotAvailable.is_missing());
        assert_eq!(PlatformMatch::from_records(Vec::new()), PlatformMatch::NotAvailable);
    }

    #[test]
    fn platforms_absent_from_the_map_are_missing() {
        let set = ExactMatchSet {
            matches: BTreeMap::from([(Platform::Pai, PlatformMatch::NotAvailable)]),
            ..ExactMatchSet::default()
        };

        assert!(!set.found_any());
        assert_eq!(set.missing_platforms(), Platform::ALL.to_vec());
    }
}
