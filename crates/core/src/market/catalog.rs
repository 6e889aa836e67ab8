use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::platform::Platform;
use crate::domain::product::{CatalogRecord, ProductSpec};
use crate::errors::CatalogError;
use crate::normalize::{fields_match, normalize_text, FieldKind};

/// How the requested processor is compared against a listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessorPredicate {
    /// Only `processor_series` is consulted (Apple lists chips there).
    SeriesOnly(String),
    /// Either `processor_type` or `processor_series` may carry the chip name.
    TypeOrSeries(String),
}

impl ProcessorPredicate {
    pub fn for_spec(spec: &ProductSpec) -> Self {
        if normalize_text(&spec.brand) == "apple" {
            Self::SeriesOnly(spec.processor_series.clone())
        } else {
            Self::TypeOrSeries(spec.processor_series.clone())
        }
    }

    pub fn matches(&self, record: &CatalogRecord) -> bool {
        match self {
            Self::SeriesOnly(wanted) => {
                fields_match(FieldKind::Processor, wanted, &record.processor_series)
            }
            Self::TypeOrSeries(wanted) => {
                fields_match(FieldKind::Processor, wanted, &record.processor_type)
                    || fields_match(FieldKind::Processor, wanted, &record.processor_series)
            }
        }
    }
}

/// Conjunction of optional field constraints. The default filter selects the
/// whole platform catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    pub brand: Option<String>,
    pub ram: Option<String>,
    pub storage: Option<String>,
    pub processor: Option<ProcessorPredicate>,
}

impl CatalogFilter {
    pub fn exact_match(spec: &ProductSpec) -> Self {
        Self {
            brand: Some(spec.brand.clone()),
            ram: Some(spec.ram.clone()),
            storage: Some(spec.storage.clone()),
            processor: Some(ProcessorPredicate::for_spec(spec)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.brand.is_none()
            && self.ram.is_none()
            && self.storage.is_none()
            && self.processor.is_none()
    }

    pub fn matches(&self, record: &CatalogRecord) -> bool {
        let brand_ok =
            self.brand.as_deref().map_or(true, |b| fields_match(FieldKind::Text, b, &record.brand));
        let ram_ok =
            self.ram.as_deref().map_or(true, |r| fields_match(FieldKind::Compact, r, &record.ram));
        let storage_ok = self
            .storage
            .as_deref()
            .map_or(true, |s| fields_match(FieldKind::Compact, s, &record.storage));
        let processor_ok = self.processor.as_ref().map_or(true, |p| p.matches(record));

        brand_ok && ram_ok && storage_ok && processor_ok
    }
}

/// Read-only access to the per-platform product collections.
#[async_trait]
pub trait CatalogAccessor: Send + Sync {
    /// Records of `platform` accepted by `filter`, in catalog order.
    async fn find(
        &self,
        platform: Platform,
        filter: &CatalogFilter,
    ) -> Result<Vec<CatalogRecord>, CatalogError>;

    async fn list_all(&self, platform: Platform) -> Result<Vec<CatalogRecord>, CatalogError> {
        self.find(platform, &CatalogFilter::default()).await
    }
}

/// Catalog held in memory, used for tests and offline evaluation.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCatalog {
    records: BTreeMap<Platform, Vec<CatalogRecord>>,
}

impl InMemoryCatalog {
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        let mut catalog = Self::default();
        for record in records {
            catalog.insert(record);
        }
        catalog
    }

    pub fn insert(&mut self, record: CatalogRecord) {
        self.records.entry(record.platform).or_default().push(record);
    }

    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CatalogAccessor for InMemoryCatalog {
    async fn find(
        &self,
        platform: Platform,
        filter: &CatalogFilter,
    ) -> Result<Vec<CatalogRecord>, CatalogError> {
        Ok(self
            .records
            .get(&platform)
            .map(|records| records.iter().filter(|record| filter.matches(record)).cloned().collect())
            .unwrap_or_default())
    }
}
