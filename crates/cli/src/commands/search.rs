use std::sync::Arc;

use spi_advisor::oracle_from_config;
use spi_core::{Platform, PriceQueryRuntime, ProductSpec, TieredPricingEngine};
use spi_db::SqlCatalogRepository;

use crate::commands::{with_database, CommandFailure, CommandResult};

pub struct SearchArgs {
    pub brand: String,
    pub ram: String,
    pub storage: String,
    pub processor: String,
}

/// Runs a price query against the local catalog and prints the full report.
pub fn run(args: SearchArgs) -> CommandResult {
    let spec = match ProductSpec::new(args.brand, args.ram, args.storage, args.processor) {
        Ok(spec) => spec,
        Err(error) => return CommandFailure::invalid_input(error.to_string()).into_result("search"),
    };

    with_database("search", move |config, pool| async move {
        let oracle = oracle_from_config(&config.search)
            .map_err(|error| CommandFailure::new("integration", format!("{error:#}"), 9))?;
        let runtime = PriceQueryRuntime::new(
            Arc::new(SqlCatalogRepository::new(pool)),
            TieredPricingEngine::new(config.pricing.clone()),
            oracle,
            config.search.timeout(),
        );

        let report = runtime.query(&spec).await;
        let message = format!(
            "{} listed on {} of {} platforms; {} suggestion(s)",
            spec.search_query(),
            Platform::ALL.len() - report.missing_platforms.len(),
            Platform::ALL.len(),
            report.suggestions.len()
        );
        let data = serde_json::to_value(&report)
            .map_err(|error| CommandFailure::new("serialization", error.to_string(), 10))?;
        Ok(CommandResult::success_with_data("search", message, Some(data)))
    })
}
