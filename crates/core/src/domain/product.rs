use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::platform::Platform;
use crate::errors::DomainError;

/// Laptop configuration a reseller wants to price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSpec {
    pub brand: String,
    pub ram: String,
    pub storage: String,
    pub processor_series: String,
}

impl ProductSpec {
    /// Builds a spec from raw request fields, trimming each one.
    ///
    /// Every field is required; blank input is rejected instead of defaulted.
    pub fn new(
        brand: impl Into<String>,
        ram: impl Into<String>,
        storage: impl Into<String>,
        processor_series: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let spec = Self {
            brand: brand.into().trim().to_string(),
            ram: ram.into().trim().to_string(),
            storage: storage.into().trim().to_string(),
            processor_series: processor_series.into().trim().to_string(),
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let fields = [
            ("brand", &self.brand),
            ("ram", &self.ram),
            ("storage", &self.storage),
            ("processor_series", &self.processor_series),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(DomainError::MissingField(field));
            }
        }
        Ok(())
    }

    /// Free-text query used when asking the open web whether this configuration exists.
    pub fn search_query(&self) -> String {
        format!("{} {} {} {} laptop", self.brand, self.ram, self.storage, self.processor_series)
    }
}

/// One listing as stored in a platform catalog. Never mutated after it is read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub platform: Platform,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub ram: String,
    #[serde(default)]
    pub storage: String,
    #[serde(default)]
    pub processor_type: String,
    #[serde(default)]
    pub processor_series: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub mrp: Option<Decimal>,
}
