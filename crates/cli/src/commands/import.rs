use std::fs;
use std::path::Path;

use spi_core::Platform;
use spi_db::{parse_listings, SqlCatalogRepository};

use crate::commands::{with_database, CommandFailure, CommandResult};

/// Imports a JSON export into one platform's catalog. With `replace`, the
/// platform's existing listings are removed first.
pub fn run(platform: &str, file: &Path, replace: bool) -> CommandResult {
    let Some(platform) = Platform::parse(platform) else {
        return CommandFailure::invalid_input(format!(
            "unknown platform `{platform}` (expected reliance|pai|croma|flipkart)"
        ))
        .into_result("import");
    };

    let raw = match fs::read_to_string(file) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(
                "import",
                "import_file",
                format!("could not read `{}`: {error}", file.display()),
                7,
            );
        }
    };
    let records = match parse_listings(platform, &raw) {
        Ok(records) => records,
        Err(error) => return CommandResult::failure("import", "import_file", error.to_string(), 7),
    };

    with_database("import", move |_config, pool| async move {
        let repository = SqlCatalogRepository::new(pool);
        let removed = if replace {
            repository
                .clear_platform(platform)
                .await
                .map_err(|error| CommandFailure::new("import_write", error.to_string(), 8))?
        } else {
            0
        };
        let written = repository
            .insert_many(&records, "import")
            .await
            .map_err(|error| CommandFailure::new("import_write", error.to_string(), 8))?;

        Ok(CommandResult::success(
            "import",
            format!("imported {written} listings into {platform} (removed {removed})"),
        ))
    })
}
