pub mod connection;
pub mod fixtures;
pub mod import;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_from_config, connect_with_settings, ping, DbPool};
pub use fixtures::{DemoCatalogDataset, SeedResult, VerificationResult};
pub use import::{parse_listings, ImportError, ImportedListing};
pub use repositories::{RepositoryError, SqlCatalogRepository};
