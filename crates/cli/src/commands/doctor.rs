use serde::Serialize;
use spi_core::config::{AppConfig, LoadOptions};
use spi_db::{connect_from_config, migrations, ping, SqlCatalogRepository};

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn new(name: &'static str, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name, status, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Exits non-zero when any check failed. Skipped checks do not count.
pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = u8::from(report.overall_status == CheckStatus::Fail);

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Pass,
                "configuration loaded and validated",
            ));
            checks.extend(check_catalog(&config));
            checks.push(check_collaborator(
                "web_search",
                config.search.enabled,
                "existence checks will report `unavailable`",
            ));
            checks.push(check_collaborator(
                "suggestion_generator",
                config.llm.enabled,
                "suggestion requests will return empty text with a warning",
            ));
        }
        Err(error) => {
            checks.push(DoctorCheck::new("config_validation", CheckStatus::Fail, error.to_string()));
            for name in ["database_connectivity", "catalog_contents"] {
                checks.push(DoctorCheck::new(
                    name,
                    CheckStatus::Skipped,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Collaborators are validated by the config contract; disabled ones are
/// reported as skipped with the degraded behaviour spelled out.
fn check_collaborator(name: &'static str, enabled: bool, degraded: &str) -> DoctorCheck {
    if enabled {
        DoctorCheck::new(name, CheckStatus::Pass, "enabled with an api key")
    } else {
        DoctorCheck::new(name, CheckStatus::Skipped, format!("disabled; {degraded}"))
    }
}

fn check_catalog(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![DoctorCheck::new(
                "database_connectivity",
                CheckStatus::Fail,
                format!("failed to initialize async runtime: {error}"),
            )];
        }
    };

    runtime.block_on(async {
        let pool = match connect_from_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck::new(
                        "database_connectivity",
                        CheckStatus::Fail,
                        format!("failed to connect to database: {error}"),
                    ),
                    DoctorCheck::new(
                        "catalog_contents",
                        CheckStatus::Skipped,
                        "skipped because the database is unreachable",
                    ),
                ];
            }
        };

        let mut checks = Vec::new();
        match ping(&pool).await {
            Ok(()) => checks.push(DoctorCheck::new(
                "database_connectivity",
                CheckStatus::Pass,
                format!("connected using `{}`", config.database.url),
            )),
            Err(error) => checks.push(DoctorCheck::new(
                "database_connectivity",
                CheckStatus::Fail,
                format!("database query failed: {error}"),
            )),
        }

        checks.push(catalog_contents(&pool).await);
        pool.close().await;
        checks
    })
}

async fn catalog_contents(pool: &spi_db::DbPool) -> DoctorCheck {
    if let Err(error) = migrations::run_pending(pool).await {
        return DoctorCheck::new(
            "catalog_contents",
            CheckStatus::Fail,
            format!("migrations could not be applied: {error}"),
        );
    }

    match SqlCatalogRepository::new(pool.clone()).count_by_platform().await {
        Ok(counts) => {
            let empty: Vec<&str> = counts
                .iter()
                .filter(|(_, count)| **count == 0)
                .map(|(platform, _)| platform.as_str())
                .collect();
            let summary: Vec<String> =
                counts.iter().map(|(platform, count)| format!("{platform}={count}")).collect();
            if empty.is_empty() {
                DoctorCheck::new("catalog_contents", CheckStatus::Pass, summary.join(", "))
            } else {
                DoctorCheck::new(
                    "catalog_contents",
                    CheckStatus::Skipped,
                    format!("{} (no listings for {})", summary.join(", "), empty.join(", ")),
                )
            }
        }
        Err(error) => DoctorCheck::new("catalog_contents", CheckStatus::Fail, error.to_string()),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
