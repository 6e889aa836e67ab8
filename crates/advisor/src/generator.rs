use async_trait::async_trait;
use tracing::debug;

use spi_core::{ExternalServiceError, SuggestionRequest, SuggestionTextGenerator};

use crate::llm::LlmClient;
use crate::prompt::render_prompt;

const SERVICE: &str = "suggestion generator";

/// Suggestion text generator that prompts a language model.
pub struct LlmSuggestionGenerator<C> {
    client: C,
}

impl<C: LlmClient> LlmSuggestionGenerator<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: LlmClient> SuggestionTextGenerator for LlmSuggestionGenerator<C> {
    async fn generate(&self, request: &SuggestionRequest) -> Result<String, ExternalServiceError> {
        let prompt = render_prompt(request);
        debug!(
            event_name = "advisor.suggestion.prompted",
            missing = request.missing_platforms().len(),
            prompt_chars = prompt.chars().count(),
            "prompting language model"
        );

        self.client
            .complete(&prompt)
            .await
            .map_err(|error| ExternalServiceError::Request { service: SERVICE, message: format!("{error:#}") })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use anyhow::{bail, Result};
    use async_trait::async_trait;

    use spi_core::domain::report::ListedPrice;
    use spi_core::{
        ExternalServiceError, Platform, ProductSpec, SuggestionAdvisor, SuggestionRequest,
        SuggestionTextGenerator,
    };

    use super::LlmSuggestionGenerator;
    use crate::llm::LlmClient;

    struct ScriptedClient {
        reply: Option<&'static str>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().expect("prompt log").push(prompt.to_string());
            match self.reply {
                Some(reply) => Ok(reply.to_string()),
                None => bail!("quota exceeded"),
            }
        }
    }

    fn request() -> SuggestionRequest {
        let spec = ProductSpec::new("HP", "8GB", "512GB", "i5").expect("valid spec");
        let listed: BTreeMap<Platform, ListedPrice> =
            Platform::ALL.into_iter().map(|platform| (platform, ListedPrice::Missing)).collect();
        SuggestionRequest::new(spec, listed)
    }

    #[tokio::test]
    async fn reply_text_is_passed_through_and_parsed_by_the_advisor() {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let generator = LlmSuggestionGenerator::new(ScriptedClient {
            reply: Some("📌 Croma → ₹48,500\nReason: wider store presence"),
            prompts: prompts.clone(),
        });
        let advisor = SuggestionAdvisor::new(Arc::new(generator), Duration::from_secs(1));

        let advice = advisor.advise(&request()).await;

        assert!(advice.warning.is_none());
        assert_eq!(advice.structured.len(), 1);
        assert_eq!(advice.structured[0].platform, "Croma");
        assert_eq!(advice.structured[0].reason, "wider store presence");
        let prompts = prompts.lock().expect("prompt log");
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Brand: HP"));
    }

    #[tokio::test]
    async fn client_failures_become_request_errors() {
        let generator = LlmSuggestionGenerator::new(ScriptedClient {
            reply: None,
            prompts: Arc::new(Mutex::new(Vec::new())),
        });

        let error = generator.generate(&request()).await.expect_err("should fail");

        assert_eq!(
            error,
            ExternalServiceError::Request {
                service: "suggestion generator",
                message: "quota exceeded".to_string(),
            }
        );
    }
}
