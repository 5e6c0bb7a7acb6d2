//! Mock provider implementation for testing.

use super::{FinishReason, GenerationParams, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;

/// Mock text provider for testing. Echoes the tail of the prompt back,
/// or fails on every call when constructed with [`MockTextProvider::failing`].
pub struct MockTextProvider {
    enabled: bool,
    fail: bool,
}

impl MockTextProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            fail: false,
        }
    }

    /// A provider whose every generate call errors, for exercising the
    /// degraded-answer path.
    pub fn failing() -> Self {
        Self {
            enabled: true,
            fail: true,
        }
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotConfigured(
                "Mock text provider not enabled".to_string(),
            ));
        }
        if self.fail {
            return Err(ProviderError::ApiError("injected failure".to_string()));
        }

        // Simulate some processing
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        // The prompt ends with the current question; echo that part back.
        let tail: String = prompt
            .lines()
            .rev()
            .find(|l| !l.is_empty())
            .unwrap_or("")
            .to_string();

        Ok(ProviderResponse {
            text: Some(format!("Mock response for: {}", tail)),
            input_tokens: prompt.len() as i32 / 4,
            output_tokens: 10,
            finish_reason: FinishReason::Complete,
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.enabled {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(
                "Mock text provider not enabled".to_string(),
            ))
        }
    }
}
