//! Catalog import from JSON exports.
//!
//! Accepts an array of listings keyed either in snake_case or with the
//! storefront export headers (`"Product Name"`, `"Processor Series"`, ...).
//! Prices may be numbers or strings such as `"₹55,990"`.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use spi_core::domain::platform::Platform;
use spi_core::domain::product::CatalogRecord;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("import file is not a JSON array of listings: {0}")]
    Json(#[from] serde_json::Error),
    #[error("listing #{index} has an invalid {field}: `{value}`")]
    InvalidPrice { index: usize, field: &'static str, value: String },
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ImportedListing {
    #[serde(default, alias = "Product Name", deserialize_with = "lenient_text")]
    pub product_name: String,
    #[serde(default, alias = "Brand", deserialize_with = "lenient_text")]
    pub brand: String,
    #[serde(default, alias = "RAM", deserialize_with = "lenient_text")]
    pub ram: String,
    #[serde(default, alias = "Storage", deserialize_with = "lenient_text")]
    pub storage: String,
    #[serde(default, alias = "Processor Type", deserialize_with = "lenient_text")]
    pub processor_type: String,
    #[serde(default, alias = "Processor Series", deserialize_with = "lenient_text")]
    pub processor_series: String,
    #[serde(default, alias = "Price")]
    pub price: Value,
    #[serde(default, alias = "MRP")]
    pub mrp: Value,
}

impl ImportedListing {
    pub fn into_record(self, platform: Platform, index: usize) -> Result<CatalogRecord, ImportError> {
        Ok(CatalogRecord {
            platform,
            price: price_from_value(&self.price, index, "price")?,
            mrp: price_from_value(&self.mrp, index, "mrp")?,
            product_name: self.product_name,
            brand: self.brand,
            ram: self.ram,
            storage: self.storage,
            processor_type: self.processor_type,
            processor_series: self.processor_series,
        })
    }
}

/// Parses a JSON export into catalog records for `platform`.
pub fn parse_listings(platform: Platform, json: &str) -> Result<Vec<CatalogRecord>, ImportError> {
    let listings: Vec<ImportedListing> = serde_json::from_str(json)?;
    listings
        .into_iter()
        .enumerate()
        .map(|(index, listing)| listing.into_record(platform, index))
        .collect()
}

/// Text fields occasionally arrive as numbers (`"RAM": 16`).
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(text) => text,
        other => other.to_string(),
    })
}

fn price_from_value(
    value: &Value,
    index: usize,
    field: &'static str,
) -> Result<Option<Decimal>, ImportError> {
    let invalid = || ImportError::InvalidPrice { index, field, value: value.to_string() };
    match value {
        Value::Null => Ok(None),
        Value::Number(number) => Decimal::from_str(&number.to_string()).map(Some).map_err(|_| invalid()),
        Value::String(text) => {
            let cleaned: String =
                text.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
            if cleaned.is_empty() {
                return Ok(None);
            }
            Decimal::from_str(&cleaned).map(Some).map_err(|_| invalid())
        }
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use spi_core::domain::platform::Platform;

    use super::{parse_listings, ImportError};

    #[test]
    fn storefront_headers_are_accepted() {
        let json = r#"[
            {
                "Product Name": "Dell Inspiron 3530",
                "Brand": "Dell",
                "RAM": "16GB",
                "Storage": "512GB",
                "Processor Type": "Intel Core i5",
                "Processor Series": "13th Gen",
                "Price": 55990,
                "MRP": "₹68,990"
            }
        ]"#;

        let records = parse_listings(Platform::Reliance, json).expect("parse");

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.platform, Platform::Reliance);
        assert_eq!(record.product_name, "Dell Inspiron 3530");
        assert_eq!(record.processor_type, "Intel Core i5");
        assert_eq!(record.price, Some(Decimal::new(55_990, 0)));
        assert_eq!(record.mrp, Some(Decimal::new(68_990, 0)));
    }

    #[test]
    fn snake_case_keys_and_missing_fields_are_accepted() {
        let json = r#"[{"brand": "HP", "ram": 8, "price": "not listed"}, {}]"#;

        let records = parse_listings(Platform::Croma, json).expect("parse");

        assert_eq!(records[0].brand, "HP");
        assert_eq!(records[0].ram, "8");
        assert_eq!(records[0].price, None);
        assert_eq!(records[1].brand, "");
    }

    #[test]
    fn malformed_prices_name_the_listing() {
        let error = parse_listings(Platform::Pai, r#"[{"Brand": "HP"}, {"Price": "1.2.3"}]"#)
            .expect_err("price should be rejected");
        assert!(matches!(error, ImportError::InvalidPrice { index: 1, field: "price", .. }));

        assert!(matches!(
            parse_listings(Platform::Pai, r#"{"Brand": "HP"}"#),
            Err(ImportError::Json(_))
        ));
    }
}
