use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};
use tracing::{debug, warn};

use spi_core::domain::platform::Platform;
use spi_core::domain::product::CatalogRecord;
use spi_core::errors::CatalogError;
use spi_core::market::catalog::{CatalogAccessor, CatalogFilter};

use super::RepositoryError;
use crate::DbPool;

const SELECT_LISTINGS: &str = r#"
    SELECT
        platform,
        product_name,
        brand,
        ram,
        storage,
        processor_type,
        processor_series,
        price,
        mrp
    FROM catalog_listing
    WHERE platform = ?1
    ORDER BY id
"#;

/// SQLite-backed platform catalogs, one logical collection per platform.
///
/// SQL only selects the platform. Every field comparison goes through
/// [`CatalogFilter::matches`] so results agree with the in-memory catalog,
/// whatever whitespace or casing the scraped rows carry.
#[derive(Clone)]
pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn fetch(
        &self,
        platform: Platform,
        filter: &CatalogFilter,
    ) -> Result<Vec<CatalogRecord>, RepositoryError> {
        let rows = sqlx::query(SELECT_LISTINGS).bind(platform.as_str()).fetch_all(&self.pool).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let record = record_from_row(row)?;
            if filter.matches(&record) {
                records.push(record);
            }
        }

        debug!(
            event_name = "db.catalog.fetched",
            platform = %platform,
            scanned = rows.len(),
            matched = records.len(),
            "catalog rows fetched"
        );
        Ok(records)
    }

    /// Inserts listings in one transaction and returns how many were written.
    pub async fn insert_many(
        &self,
        records: &[CatalogRecord],
        source: &str,
    ) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for record in records {
            let result = sqlx::query(
                r#"
                INSERT INTO catalog_listing
                    (platform, product_name, brand, ram, storage, processor_type,
                     processor_series, price, mrp, source)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.platform.as_str())
            .bind(&record.product_name)
            .bind(&record.brand)
            .bind(&record.ram)
            .bind(&record.storage)
            .bind(&record.processor_type)
            .bind(&record.processor_series)
            .bind(record.price.map(|price| price.to_string()))
            .bind(record.mrp.map(|mrp| mrp.to_string()))
            .bind(source)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }

    /// Removes every listing of a platform, returning the number deleted.
    pub async fn clear_platform(&self, platform: Platform) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM catalog_listing WHERE platform = ?")
            .bind(platform.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Listing count per platform; platforms without rows report zero.
    pub async fn count_by_platform(&self) -> Result<BTreeMap<Platform, i64>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT platform, COUNT(1) AS listings FROM catalog_listing GROUP BY platform",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts: BTreeMap<Platform, i64> =
            Platform::ALL.into_iter().map(|platform| (platform, 0)).collect();
        for row in rows {
            let name: String = row.try_get("platform")?;
            let platform = parse_platform(&name)?;
            counts.insert(platform, row.try_get("listings")?);
        }
        Ok(counts)
    }
}

#[async_trait]
impl CatalogAccessor for SqlCatalogRepository {
    async fn find(
        &self,
        platform: Platform,
        filter: &CatalogFilter,
    ) -> Result<Vec<CatalogRecord>, CatalogError> {
        self.fetch(platform, filter).await.map_err(|error| CatalogError::new(platform, error.to_string()))
    }
}

fn record_from_row(row: &SqliteRow) -> Result<CatalogRecord, RepositoryError> {
    let platform: String = row.try_get("platform")?;
    let price: Option<String> = row.try_get("price")?;
    let mrp: Option<String> = row.try_get("mrp")?;

    let platform = parse_platform(&platform)?;
    Ok(CatalogRecord {
        price: parse_price(platform, "price", price.as_deref()),
        mrp: parse_price(platform, "mrp", mrp.as_deref()),
        platform,
        product_name: row.try_get("product_name")?,
        brand: row.try_get("brand")?,
        ram: row.try_get("ram")?,
        storage: row.try_get("storage")?,
        processor_type: row.try_get("processor_type")?,
        processor_series: row.try_get("processor_series")?,
    })
}

fn parse_platform(value: &str) -> Result<Platform, RepositoryError> {
    Platform::parse(value)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown platform `{value}` in catalog_listing")))
}

/// Unreadable amounts are logged and read as absent.
fn parse_price(platform: Platform, field: &str, value: Option<&str>) -> Option<Decimal> {
    let raw = value.map(str::trim).filter(|value| !value.is_empty())?;
    match Decimal::from_str(raw) {
        Ok(amount) => Some(amount),
        Err(error) => {
            warn!(
                event_name = "db.catalog.price_unreadable",
                platform = %platform,
                field,
                raw,
                error = %error,
                "ignoring unreadable catalog price"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use spi_core::domain::platform::Platform;
    use spi_core::domain::product::{CatalogRecord, ProductSpec};
    use spi_core::market::catalog::{CatalogAccessor, CatalogFilter, InMemoryCatalog};

    use super::SqlCatalogRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlCatalogRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlCatalogRepository::new(pool)
    }

    fn listing(
        platform: Platform,
        brand: &str,
        ram: &str,
        processor_type: &str,
        processor_series: &str,
        price: Option<i64>,
    ) -> CatalogRecord {
        CatalogRecord {
            platform,
            product_name: format!("{brand} {processor_series}"),
            brand: brand.to_string(),
            ram: ram.to_string(),
            storage: "512GB".to_string(),
            processor_type: processor_type.to_string(),
            processor_series: processor_series.to_string(),
            price: price.map(|value| Decimal::new(value, 0)),
            mrp: None,
        }
    }

    #[tokio::test]
    async fn exact_match_spans_spacing_case_and_processor_aliases() {
        let repo = setup().await;
        repo.insert_many(
            &[
                listing(Platform::Reliance, "DELL", "16 GB", "Intel Core i5", "13th Gen", Some(55_000)),
                listing(Platform::Reliance, "Dell", "16GB", "Intel", "i7", Some(65_000)),
                listing(Platform::Reliance, "Dell Latitude", "16GB", "", "i5", Some(70_000)),
                listing(Platform::Pai, "Dell", "16GB", "", "i5", Some(56_000)),
            ],
            "test",
        )
        .await
        .expect("insert");

        let spec = ProductSpec::new("dell", "16gb", "512gb", "i5").expect("valid spec");
        let found = repo
            .find(Platform::Reliance, &CatalogFilter::exact_match(&spec))
            .await
            .expect("find");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].brand, "DELL");
        assert_eq!(found[0].price, Some(Decimal::new(55_000, 0)));
    }

    #[tokio::test]
    async fn list_all_preserves_insertion_order_and_missing_prices() {
        let repo = setup().await;
        repo.insert_many(
            &[
                listing(Platform::Croma, "HP", "8GB", "i3", "i3", None),
                listing(Platform::Croma, "Asus", "8GB", "i5", "i5", Some(41_990)),
            ],
            "test",
        )
        .await
        .expect("insert");

        let all = repo.list_all(Platform::Croma).await.expect("list");
        let brands: Vec<&str> = all.iter().map(|record| record.brand.as_str()).collect();

        assert_eq!(brands, vec!["HP", "Asus"]);
        assert_eq!(all[0].price, None);
        assert!(repo.list_all(Platform::Flipkart).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn decimal_prices_round_trip_through_text_columns() {
        let repo = setup().await;
        let mut record = listing(Platform::Pai, "Acer", "8GB", "", "i5", None);
        record.price = Some(Decimal::new(4_599_950, 2));
        record.mrp = Some(Decimal::new(52_000, 0));
        repo.insert_many(&[record], "test").await.expect("insert");

        let stored = repo.list_all(Platform::Pai).await.expect("list");
        assert_eq!(stored[0].price, Some(Decimal::new(4_599_950, 2)));
        assert_eq!(stored[0].mrp, Some(Decimal::new(52_000, 0)));
    }

    #[tokio::test]
    async fn counts_and_clears_per_platform() {
        let repo = setup().await;
        repo.insert_many(
            &[
                listing(Platform::Flipkart, "HP", "8GB", "", "i3", None),
                listing(Platform::Flipkart, "HP", "8GB", "", "i5", None),
                listing(Platform::Reliance, "HP", "8GB", "", "i5", None),
            ],
            "test",
        )
        .await
        .expect("insert");

        let counts = repo.count_by_platform().await.expect("count");
        assert_eq!(counts[&Platform::Flipkart], 2);
        assert_eq!(counts[&Platform::Pai], 0);

        assert_eq!(repo.clear_platform(Platform::Flipkart).await.expect("clear"), 2);
        let counts = repo.count_by_platform().await.expect("count");
        assert_eq!(counts[&Platform::Flipkart], 0);
        assert_eq!(counts[&Platform::Reliance], 1);
    }

    #[tokio::test]
    async fn unreadable_price_is_read_as_absent() {
        let repo = setup().await;
        sqlx::query(
            "INSERT INTO catalog_listing (platform, brand, price, mrp) VALUES ('croma', 'HP', 'n/a', '49990')",
        )
        .execute(&repo.pool)
        .await
        .expect("raw insert");
        repo.insert_many(&[listing(Platform::Croma, "Asus", "8GB", "", "i5", Some(41_990))], "test")
            .await
            .expect("insert");

        let all = repo.list_all(Platform::Croma).await.expect("platform stays readable");

        assert_eq!(all.len(), 2);
        assert_eq!(all[0].price, None);
        assert_eq!(all[0].mrp, Some(Decimal::new(49_990, 0)));
        assert_eq!(all[1].price, Some(Decimal::new(41_990, 0)));
    }

    #[tokio::test]
    async fn exact_match_agrees_with_in_memory_catalog_on_irregular_whitespace() {
        let repo = setup().await;
        let records = vec![
            listing(Platform::Reliance, "Dell\u{a0}", "16GB", "", "i5", Some(55_000)),
            listing(Platform::Reliance, "Dell", "16\tGB", "", "i5", Some(57_000)),
            listing(Platform::Reliance, "\tDELL", "16 GB", "Intel Core i5", "", Some(56_000)),
            listing(Platform::Reliance, "Dell", "8GB", "", "i5", Some(40_000)),
        ];
        repo.insert_many(&records, "test").await.expect("insert");
        let memory = InMemoryCatalog::new(records);

        let spec = ProductSpec::new("Dell", "16GB", "512GB", "i5").expect("valid spec");
        let filter = CatalogFilter::exact_match(&spec);
        let from_sql = repo.find(Platform::Reliance, &filter).await.expect("sql find");
        let from_memory = memory.find(Platform::Reliance, &filter).await.expect("memory find");

        assert_eq!(from_sql.len(), 3);
        assert_eq!(from_sql, from_memory);
    }
}
