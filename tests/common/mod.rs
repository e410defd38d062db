//! Shared test doubles for the text-generation boundary.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use reasoning_engine::{GenerationError, GenerationOptions, GenerationResult, TextGenerator};

/// Install a test subscriber once so traced output shows up under
/// `--nocapture`. Safe to call from every test; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Pops canned results in call order; errors once the script runs out.
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<GenerationResult<String>>>,
}

impl ScriptedGenerator {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|response| Ok(response.to_string()))
                    .collect(),
            ),
        }
    }

    pub fn with_results(results: Vec<GenerationResult<String>>) -> Self {
        Self {
            responses: Mutex::new(results.into_iter().collect()),
        }
    }

    /// Queue another response after construction (e.g. once generated ids
    /// are known).
    pub fn push(&self, response: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(response.to_string()));
    }

    pub fn failing(message: &str, count: usize) -> Self {
        Self::with_results(
            (0..count)
                .map(|_| {
                    Err(GenerationError::Unavailable {
                        message: message.to_string(),
                    })
                })
                .collect(),
        )
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        _prompt: &str,
        _options: &GenerationOptions,
    ) -> GenerationResult<String> {
        let mut responses = self.responses.lock().unwrap();
        responses
            .pop_front()
            .unwrap_or_else(|| {
                Err(GenerationError::Unavailable {
                    message: "script exhausted".to_string(),
                })
            })
    }
}

/// Routes on prompt content: the first route whose needles are all contained
/// in the prompt wins; otherwise the default response is returned. Needed
/// where call order is not deterministic (concurrent consensus passes) or
/// where the same kind of call repeats per tree node.
pub struct RoutedGenerator {
    routes: Vec<(Vec<String>, String)>,
    default: String,
}

impl RoutedGenerator {
    pub fn new(default: &str) -> Self {
        Self {
            routes: Vec::new(),
            default: default.to_string(),
        }
    }

    pub fn route(mut self, needles: &[&str], response: &str) -> Self {
        self.routes.push((
            needles.iter().map(|needle| needle.to_string()).collect(),
            response.to_string(),
        ));
        self
    }
}

#[async_trait]
impl TextGenerator for RoutedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> GenerationResult<String> {
        for (needles, response) in &self.routes {
            if needles.iter().all(|needle| prompt.contains(needle)) {
                return Ok(response.clone());
            }
        }
        Ok(self.default.clone())
    }
}
