use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::platform::Platform;
use crate::market::pricing::PricingTables;

pub const DEFAULT_CONFIG_FILE: &str = "spi.toml";
pub const NESTED_CONFIG_FILE: &str = "config/spi.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub catalog: CatalogConfig,
    pub pricing: PricingTables,
    pub search: SearchConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    /// Platform whose catalog feeds the filter dropdowns.
    pub filter_platform: Platform,
}

#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub enabled: bool,
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub num_results: u32,
    pub timeout_secs: u64,
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub enabled: bool,
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub filter_platform: Option<Platform>,
    pub search_enabled: Option<bool>,
    pub llm_enabled: Option<bool>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://spi.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            catalog: CatalogConfig { filter_platform: Platform::Reliance },
            pricing: PricingTables::default(),
            search: SearchConfig {
                enabled: false,
                api_key: None,
                base_url: "https://serpapi.com/search.json".to_string(),
                num_results: 5,
                timeout_secs: 10,
            },
            llm: LlmConfig {
                enabled: false,
                api_key: None,
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                model: "gemini-1.5-pro-latest".to_string(),
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.pricing = config.pricing.normalized();
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(catalog) = patch.catalog {
            if let Some(filter_platform) = catalog.filter_platform {
                self.catalog.filter_platform = parse_platform("catalog.filter_platform", &filter_platform)?;
            }
        }

        if let Some(pricing) = patch.pricing {
            if let Some(brands) = pricing.premium_brands {
                self.pricing.premium_brands = brands;
            }
            if let Some(brands) = pricing.budget_brands {
                self.pricing.budget_brands = brands;
            }
            if let Some(brands) = pricing.mid_brands {
                self.pricing.mid_brands = brands;
            }
            if let Some(value) = pricing.premium_factor {
                self.pricing.brand_factors.premium = decimal_factor("pricing.premium_factor", value)?;
            }
            if let Some(value) = pricing.mid_factor {
                self.pricing.brand_factors.mid = decimal_factor("pricing.mid_factor", value)?;
            }
            if let Some(value) = pricing.budget_factor {
                self.pricing.brand_factors.budget = decimal_factor("pricing.budget_factor", value)?;
            }
            for (name, value) in pricing.platform_factors.unwrap_or_default() {
                let key = format!("pricing.platform_factors.{name}");
                let platform = parse_platform(&key, &name)?;
                self.pricing.platform_factors.insert(platform, decimal_factor(&key, value)?);
            }
        }

        if let Some(search) = patch.search {
            if let Some(enabled) = search.enabled {
                self.search.enabled = enabled;
            }
            if let Some(search_api_key_value) = search.api_key {
                self.search.api_key = Some(secret_value(search_api_key_value));
            }
            if let Some(base_url) = search.base_url {
                self.search.base_url = base_url;
            }
            if let Some(num_results) = search.num_results {
                self.search.num_results = num_results;
            }
            if let Some(timeout_secs) = search.timeout_secs {
                self.search.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(enabled) = llm.enabled {
                self.llm.enabled = enabled;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SPI_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SPI_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("SPI_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SPI_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SPI_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SPI_CATALOG_FILTER_PLATFORM") {
            self.catalog.filter_platform = Platform::parse(&value).ok_or_else(|| {
                ConfigError::InvalidEnvOverride {
                    key: "SPI_CATALOG_FILTER_PLATFORM".to_string(),
                    value: value.clone(),
                }
            })?;
        }

        if let Some(value) = read_env("SPI_PRICING_PREMIUM_FACTOR") {
            self.pricing.brand_factors.premium =
                parse_decimal("SPI_PRICING_PREMIUM_FACTOR", &value)?;
        }
        if let Some(value) = read_env("SPI_PRICING_MID_FACTOR") {
            self.pricing.brand_factors.mid = parse_decimal("SPI_PRICING_MID_FACTOR", &value)?;
        }
        if let Some(value) = read_env("SPI_PRICING_BUDGET_FACTOR") {
            self.pricing.brand_factors.budget = parse_decimal("SPI_PRICING_BUDGET_FACTOR", &value)?;
        }

        if let Some(value) = read_env("SPI_SEARCH_ENABLED") {
            self.search.enabled = parse_bool("SPI_SEARCH_ENABLED", &value)?;
        }
        if let Some(value) = read_env("SPI_SEARCH_API_KEY").or_else(|| read_env("SERPAPI_KEY")) {
            self.search.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SPI_SEARCH_BASE_URL") {
            self.search.base_url = value;
        }
        if let Some(value) = read_env("SPI_SEARCH_NUM_RESULTS") {
            self.search.num_results = parse_u32("SPI_SEARCH_NUM_RESULTS", &value)?;
        }
        if let Some(value) = read_env("SPI_SEARCH_TIMEOUT_SECS") {
            self.search.timeout_secs = parse_u64("SPI_SEARCH_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SPI_LLM_ENABLED") {
            self.llm.enabled = parse_bool("SPI_LLM_ENABLED", &value)?;
        }
        if let Some(value) = read_env("SPI_LLM_API_KEY").or_else(|| read_env("GOOGLE_API_KEY")) {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SPI_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("SPI_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("SPI_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("SPI_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SPI_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SPI_SERVER_PORT") {
            self.server.port = parse_u16("SPI_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("SPI_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("SPI_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("SPI_LOGGING_LEVEL").or_else(|| read_env("SPI_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("SPI_LOGGING_FORMAT").or_else(|| read_env("SPI_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(filter_platform) = overrides.filter_platform {
            self.catalog.filter_platform = filter_platform;
        }
        if let Some(enabled) = overrides.search_enabled {
            self.search.enabled = enabled;
        }
        if let Some(enabled) = overrides.llm_enabled {
            self.llm.enabled = enabled;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_pricing(&self.pricing)?;
        validate_search(&self.search)?;
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// The config file that `AppConfig::load` would read, if any.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_pricing(pricing: &PricingTables) -> Result<(), ConfigError> {
    pricing.validate().map_err(|error| ConfigError::Validation(format!("pricing: {error}")))
}

fn validate_search(search: &SearchConfig) -> Result<(), ConfigError> {
    if search.timeout_secs == 0 || search.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "search.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    if search.num_results == 0 || search.num_results > 100 {
        return Err(ConfigError::Validation(
            "search.num_results must be in range 1..=100".to_string(),
        ));
    }

    validate_http_url("search.base_url", &search.base_url)?;

    if search.enabled && secret_missing(search.api_key.as_ref()) {
        return Err(ConfigError::Validation(
            "search.api_key is required when search.enabled is true (SPI_SEARCH_API_KEY or SERPAPI_KEY)"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    validate_http_url("llm.base_url", &llm.base_url)?;

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if llm.enabled && secret_missing(llm.api_key.as_ref()) {
        return Err(ConfigError::Validation(
            "llm.api_key is required when llm.enabled is true (SPI_LLM_API_KEY or GOOGLE_API_KEY)"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_http_url(key: &str, url: &str) -> Result<(), ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("{key} must start with http:// or https://")))
    }
}

fn secret_missing(secret: Option<&SecretString>) -> bool {
    secret.map(|value| value.expose_secret().trim().is_empty()).unwrap_or(true)
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value.trim()).map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// TOML floats go through their shortest decimal rendering, so `0.97` stays `0.97`.
fn decimal_factor(key: &str, value: f64) -> Result<Decimal, ConfigError> {
    Decimal::from_str(&value.to_string())
        .map_err(|_| ConfigError::Validation(format!("{key} is not a valid factor: {value}")))
}

fn parse_platform(key: &str, value: &str) -> Result<Platform, ConfigError> {
    Platform::parse(value).ok_or_else(|| {
        ConfigError::Validation(format!(
            "{key}: unknown platform `{value}` (expected reliance|pai|croma|flipkart)"
        ))
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    catalog: Option<CatalogPatch>,
    pricing: Option<PricingPatch>,
    search: Option<SearchPatch>,
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    filter_platform: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    premium_brands: Option<BTreeSet<String>>,
    budget_brands: Option<BTreeSet<String>>,
    mid_brands: Option<BTreeSet<String>>,
    premium_factor: Option<f64>,
    mid_factor: Option<f64>,
    budget_factor: Option<f64>,
    platform_factors: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchPatch {
    enabled: Option<bool>,
    api_key: Option<String>,
    base_url: Option<String>,
    num_results: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    enabled: Option<bool>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
