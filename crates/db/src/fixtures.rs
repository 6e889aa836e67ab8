use sqlx::Executor;

use spi_core::domain::platform::Platform;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Expected demo listings per platform, in canonical platform order.
const DEMO_LISTINGS_PER_PLATFORM: &[(Platform, i64)] =
    &[(Platform::Reliance, 5), (Platform::Pai, 3), (Platform::Croma, 3), (Platform::Flipkart, 3)];

/// Demo catalog used by `spi seed` and the end-to-end tests.
///
/// The Dell 16GB/512GB/i5 configuration is listed on Reliance and Pai only,
/// so a query for it exercises exact matches, cross-brand HP matches and
/// suggestions for Croma and Flipkart.
pub struct DemoCatalogDataset;

impl DemoCatalogDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_catalog.sql");

    /// Loads (or reloads) the demo rows. Imported listings are untouched.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let listings_seeded = DEMO_LISTINGS_PER_PLATFORM.iter().map(|(_, count)| *count).sum();
        Ok(SeedResult {
            listings_seeded,
            platforms: DEMO_LISTINGS_PER_PLATFORM.iter().map(|(platform, _)| *platform).collect(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for (platform, expected) in DEMO_LISTINGS_PER_PLATFORM {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(1) FROM catalog_listing WHERE source = 'demo' AND platform = ?1",
            )
            .bind(platform.as_str())
            .fetch_one(pool)
            .await?;
            checks.push((platform.as_str(), count == *expected));
        }

        let unpriced: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM catalog_listing WHERE source = 'demo' AND price IS NULL",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("prices-present", unpriced == 0));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Clone, Debug)]
pub struct SeedResult {
    pub listings_seeded: i64,
    pub platforms: Vec<Platform>,
}

#[derive(Clone, Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
