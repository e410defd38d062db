//! Core infrastructure shared by all reasoning capabilities.
//!
//! This module provides the [`EngineCore`] struct that centralizes the one
//! dependency every capability needs: the text-generation boundary. The
//! struct is composed into each capability to avoid duplicating the field
//! and its accessor.

use crate::generation::{SharedGenerator, TextGenerator};

/// Core infrastructure shared by all reasoning capabilities.
///
/// Holds the generator handle used for LLM-powered operations. Cloning is
/// cheap (one `Arc` bump), which is what lets self-consistency passes run on
/// spawned tasks.
#[derive(Clone)]
pub struct EngineCore {
    /// Text-generation boundary.
    generator: SharedGenerator,
}

impl EngineCore {
    /// Create a new core with the given generator.
    pub fn new(generator: SharedGenerator) -> Self {
        Self { generator }
    }

    /// Get a reference to the generator.
    #[inline]
    pub fn generator(&self) -> &dyn TextGenerator {
        self.generator.as_ref()
    }
}
