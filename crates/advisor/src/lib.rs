//! Outbound collaborators of the price engine.
//!
//! - `search`: web-search existence oracle backed by SerpApi
//! - `llm` / `generator`: pricing rationale from a hosted language model
//!
//! Neither collaborator decides a price. The engine's numbers come from the
//! pricing tables; these adapters only confirm existence and add prose.

pub mod generator;
pub mod llm;
pub mod prompt;
pub mod search;

use std::sync::Arc;

use spi_core::config::{LlmConfig, SearchConfig};
use spi_core::{
    ExistenceOracle, SuggestionTextGenerator, UnconfiguredGenerator, UnconfiguredOracle,
};

pub use generator::LlmSuggestionGenerator;
pub use llm::{GeminiClient, LlmClient};
pub use search::SerpApiOracle;

/// Web search oracle when search is enabled, otherwise one that always
/// reports "not configured".
pub fn oracle_from_config(config: &SearchConfig) -> anyhow::Result<Arc<dyn ExistenceOracle>> {
    if !config.enabled {
        return Ok(Arc::new(UnconfiguredOracle));
    }
    Ok(Arc::new(SerpApiOracle::from_config(config)?))
}

pub fn generator_from_config(
    config: &LlmConfig,
) -> anyhow::Result<Arc<dyn SuggestionTextGenerator>> {
    if !config.enabled {
        return Ok(Arc::new(UnconfiguredGenerator));
    }
    Ok(Arc::new(LlmSuggestionGenerator::new(GeminiClient::from_config(config)?)))
}
