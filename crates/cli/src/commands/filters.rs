use spi_core::{enumerate_filters, FilterSelection};
use spi_db::SqlCatalogRepository;

use crate::commands::{with_database, CommandFailure, CommandResult};

pub fn run(selection: FilterSelection) -> CommandResult {
    with_database("filters", move |config, pool| async move {
        let platform = config.catalog.filter_platform;
        let repository = SqlCatalogRepository::new(pool);
        let options = enumerate_filters(&repository, platform, &selection)
            .await
            .map_err(|error| CommandFailure::new("catalog_unavailable", error.to_string(), 8))?;

        let data = serde_json::to_value(&options)
            .map_err(|error| CommandFailure::new("serialization", error.to_string(), 10))?;
        Ok(CommandResult::success_with_data(
            "filters",
            format!("{} brand(s) on {platform}", options.brands.len()),
            Some(data),
        ))
    })
}
