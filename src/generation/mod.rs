//! The text-generation boundary.
//!
//! The engine treats text generation as an opaque, possibly-failing function:
//! one prompt in, one completion out. Provider concerns (HTTP, authentication,
//! vendor response formats, routing) live behind [`TextGenerator`]
//! implementations supplied by the embedding application.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationResult;

/// Options for a single generation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Ask the provider for its deliberate/reasoning mode when it has one.
    pub use_reasoning_mode: bool,
}

impl GenerationOptions {
    /// Options with reasoning mode enabled.
    pub fn reasoning() -> Self {
        Self {
            use_reasoning_mode: true,
        }
    }
}

/// The sole boundary dependency: turns a prompt into natural-language text.
///
/// One-shot request/response; no streaming semantics are required by the
/// engine. Implementations decide retries and timeouts internally - by the
/// time a [`crate::error::GenerationError`] reaches the engine it is final
/// and aborts the enclosing operation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the given prompt.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> GenerationResult<String>;
}

/// Shared handle to a generator implementation.
pub type SharedGenerator = Arc<dyn TextGenerator>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;

    #[test]
    fn test_generation_options_default() {
        let options = GenerationOptions::default();
        assert!(!options.use_reasoning_mode);
    }

    #[test]
    fn test_generation_options_reasoning() {
        let options = GenerationOptions::reasoning();
        assert!(options.use_reasoning_mode);
    }

    #[test]
    fn test_generation_options_round_trip() {
        let options = GenerationOptions::reasoning();
        let json = serde_json::to_string(&options).unwrap();
        let back: GenerationOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(options, back);
    }

    #[tokio::test]
    async fn test_mock_generator() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .returning(|_, _| Ok("mocked completion".to_string()));

        let result = mock
            .generate("prompt", &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(result, "mocked completion");
    }

    #[tokio::test]
    async fn test_mock_generator_failure() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().returning(|_, _| {
            Err(GenerationError::Unavailable {
                message: "down".to_string(),
            })
        });

        let result = mock.generate("prompt", &GenerationOptions::default()).await;
        assert!(result.is_err());
    }
}
