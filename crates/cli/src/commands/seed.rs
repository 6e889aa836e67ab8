use spi_db::DemoCatalogDataset;

use crate::commands::{with_database, CommandFailure, CommandResult};

pub fn run() -> CommandResult {
    with_database("seed", |_config, pool| async move {
        let seeded = DemoCatalogDataset::load(&pool)
            .await
            .map_err(|error| CommandFailure::new("seed_execution", error.to_string(), 6))?;

        let verification = DemoCatalogDataset::verify(&pool)
            .await
            .map_err(|error| CommandFailure::new("seed_verification", error.to_string(), 7))?;
        if !verification.all_present {
            let failed: Vec<&str> = verification
                .checks
                .iter()
                .filter_map(|(check, passed)| (!passed).then_some(*check))
                .collect();
            return Err(CommandFailure::new("seed_verification", verification_message(&failed), 7));
        }

        let platforms: Vec<&str> = seeded.platforms.iter().map(|platform| platform.as_str()).collect();
        Ok(CommandResult::success(
            "seed",
            format!(
                "demo catalog loaded: {} listings across {}",
                seeded.listings_seeded,
                platforms.join(", ")
            ),
        ))
    })
}

fn verification_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "some demo listings failed to load".to_string()
    } else {
        format!("demo catalog verification failed for checks: {}", failed_checks.join(", "))
    }
}
