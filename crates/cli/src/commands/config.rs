use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use spi_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let path = resolve_config_path(None);
    let doc = load_config_file_doc(path.as_deref());
    let sources = FieldSources { doc: doc.as_ref(), path: path.as_deref() };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        lines.push(render_line(&field.key, &field.value, sources.resolve(&field.key, field.env_keys)));
    }
    lines.join("\n")
}

struct Field {
    key: String,
    value: String,
    env_keys: &'static [&'static str],
}

fn field(key: impl Into<String>, value: impl ToString, env_keys: &'static [&'static str]) -> Field {
    Field { key: key.into(), value: value.to_string(), env_keys }
}

fn effective_fields(config: &AppConfig) -> Vec<Field> {
    let pricing = &config.pricing;
    let mut fields = vec![
        field("database.url", &config.database.url, &["SPI_DATABASE_URL"]),
        field(
            "database.max_connections",
            config.database.max_connections,
            &["SPI_DATABASE_MAX_CONNECTIONS"],
        ),
        field("database.timeout_secs", config.database.timeout_secs, &["SPI_DATABASE_TIMEOUT_SECS"]),
        field(
            "catalog.filter_platform",
            config.catalog.filter_platform,
            &["SPI_CATALOG_FILTER_PLATFORM"],
        ),
        field("pricing.premium_brands", join(&pricing.premium_brands), &[]),
        field("pricing.mid_brands", join(&pricing.mid_brands), &[]),
        field("pricing.budget_brands", join(&pricing.budget_brands), &[]),
        field(
            "pricing.premium_factor",
            pricing.brand_factors.premium,
            &["SPI_PRICING_PREMIUM_FACTOR"],
        ),
        field("pricing.mid_factor", pricing.brand_factors.mid, &["SPI_PRICING_MID_FACTOR"]),
        field("pricing.budget_factor", pricing.brand_factors.budget, &["SPI_PRICING_BUDGET_FACTOR"]),
    ];

    for (platform, factor) in &pricing.platform_factors {
        fields.push(field(format!("pricing.platform_factors.{platform}"), factor, &[]));
    }

    fields.extend([
        field("search.enabled", config.search.enabled, &["SPI_SEARCH_ENABLED"]),
        field(
            "search.api_key",
            redact(config.search.api_key.as_ref()),
            &["SPI_SEARCH_API_KEY", "SERPAPI_KEY"],
        ),
        field("search.base_url", &config.search.base_url, &["SPI_SEARCH_BASE_URL"]),
        field("search.num_results", config.search.num_results, &["SPI_SEARCH_NUM_RESULTS"]),
        field("search.timeout_secs", config.search.timeout_secs, &["SPI_SEARCH_TIMEOUT_SECS"]),
        field("llm.enabled", config.llm.enabled, &["SPI_LLM_ENABLED"]),
        field(
            "llm.api_key",
            redact(config.llm.api_key.as_ref()),
            &["SPI_LLM_API_KEY", "GOOGLE_API_KEY"],
        ),
        field("llm.base_url", &config.llm.base_url, &["SPI_LLM_BASE_URL"]),
        field("llm.model", &config.llm.model, &["SPI_LLM_MODEL"]),
        field("llm.timeout_secs", config.llm.timeout_secs, &["SPI_LLM_TIMEOUT_SECS"]),
        field("server.bind_address", &config.server.bind_address, &["SPI_SERVER_BIND_ADDRESS"]),
        field("server.port", config.server.port, &["SPI_SERVER_PORT"]),
        field(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs,
            &["SPI_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        field("logging.level", &config.logging.level, &["SPI_LOGGING_LEVEL", "SPI_LOG_LEVEL"]),
        field(
            "logging.format",
            format!("{:?}", config.logging.format).to_lowercase(),
            &["SPI_LOGGING_FORMAT", "SPI_LOG_FORMAT"],
        ),
    ]);

    fields
}

struct FieldSources<'a> {
    doc: Option<&'a Value>,
    path: Option<&'a Path>,
}

impl FieldSources<'_> {
    fn resolve(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn join(values: &BTreeSet<String>) -> String {
    values.iter().cloned().collect::<Vec<_>>().join(",")
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Shows only the last four characters of a key.
fn redact(secret: Option<&SecretString>) -> String {
    let Some(secret) = secret else {
        return "<unset>".to_string();
    };
    let exposed = secret.expose_secret().trim();
    let chars: Vec<char> = exposed.chars().collect();
    if chars.len() <= 8 {
        return "<redacted>".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("***{tail}")
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use spi_core::config::AppConfig;

    use super::{contains_path, effective_fields, redact};

    #[test]
    fn secrets_are_never_rendered_in_full() {
        assert_eq!(redact(None), "<unset>");
        assert_eq!(redact(Some(&SecretString::from("short".to_string()))), "<redacted>");
        assert_eq!(
            redact(Some(&SecretString::from("serp-1234567890abcd".to_string()))),
            "***abcd"
        );
    }

    #[test]
    fn every_platform_factor_is_listed() {
        let fields = effective_fields(&AppConfig::default());
        let keys: Vec<&str> = fields.iter().map(|field| field.key.as_str()).collect();

        assert!(keys.contains(&"pricing.platform_factors.flipkart"));
        assert!(keys.contains(&"search.api_key"));
        let flipkart = fields
            .iter()
            .find(|field| field.key == "pricing.platform_factors.flipkart")
            .map(|field| field.value.as_str());
        assert_eq!(flipkart, Some("0.95"));
    }

    #[test]
    fn nested_keys_are_found_in_toml_documents() {
        let doc: toml::Value = "[pricing.platform_factors]\npai = 0.9\n".parse().expect("toml");
        assert!(contains_path(&doc, "pricing.platform_factors.pai"));
        assert!(!contains_path(&doc, "pricing.platform_factors.croma"));
    }
}
