//! Explicit cross-request accumulation of reasoning chains.
//!
//! Engine capabilities are request-scoped and keep no state between calls.
//! Callers who want history across requests opt in by appending finished
//! chains here. The structure is append-only; a caller sharing one instance
//! across tasks must serialize writes (single-writer discipline).

use serde::{Deserialize, Serialize};

use super::chain::ThoughtChain;

/// Append-only session history of completed thought chains.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionHistory {
    chains: Vec<ThoughtChain>,
}

impl SessionHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed chain.
    pub fn record(&mut self, chain: ThoughtChain) {
        self.chains.push(chain);
    }

    /// All recorded chains, oldest first.
    pub fn chains(&self) -> &[ThoughtChain] {
        &self.chains
    }

    /// The most recently recorded chain.
    pub fn latest(&self) -> Option<&ThoughtChain> {
        self.chains.last()
    }

    /// Number of recorded chains.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Whether any chains have been recorded.
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
