use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::platform::Platform;
use crate::domain::product::CatalogRecord;
use crate::errors::CatalogError;
use crate::market::catalog::{CatalogAccessor, CatalogFilter};

/// Optional narrowing applied before the filter values are collected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub ram: Option<String>,
    #[serde(default)]
    pub storage: Option<String>,
}

impl FilterSelection {
    fn to_catalog_filter(&self) -> CatalogFilter {
        CatalogFilter {
            brand: non_blank(&self.brand),
            ram: non_blank(&self.ram),
            storage: non_blank(&self.storage),
            processor: None,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}

/// Distinct values available for each UI filter, sorted ascending.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub brands: Vec<String>,
    pub rams: Vec<String>,
    pub storages: Vec<String>,
    pub processor_types: Vec<String>,
    pub processor_series: Vec<String>,
}

impl FilterOptions {
    pub fn from_records(records: &[CatalogRecord]) -> Self {
        let collect = |field: fn(&CatalogRecord) -> &str| -> Vec<String> {
            records
                .iter()
                .map(|record| field(record).trim())
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };

        Self {
            brands: collect(|record| record.brand.as_str()),
            rams: collect(|record| record.ram.as_str()),
            storages: collect(|record| record.storage.as_str()),
            processor_types: collect(|record| record.processor_type.as_str()),
            processor_series: collect(|record| record.processor_series.as_str()),
        }
    }
}

/// Enumerates filter values from one platform's catalog. A catalog that cannot
/// be read is an error here: there is nothing to degrade to.
pub async fn enumerate_filters(
    catalog: &dyn CatalogAccessor,
    platform: Platform,
    selection: &FilterSelection,
) -> Result<FilterOptions, CatalogError> {
    let records = catalog.find(platform, &selection.to_catalog_filter()).await?;
    Ok(FilterOptions::from_records(&records))
}
