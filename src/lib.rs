//! # Reasoning Engine
//!
//! A structured reasoning engine that orchestrates calls to a pluggable
//! text-generation service for auditable, typed reasoning.
//!
//! ## Features
//!
//! - **Chain of Thought**: one reasoning pass decomposed into classified
//!   thoughts with derived assumptions, a conclusion, and a confidence score
//! - **Self-Consistency**: multiple independent passes reconciled by
//!   conclusion-cluster consensus with a confidence boost
//! - **Decision Trees**: bounded-depth trees of weighted options, navigated
//!   under pluggable selection strategies with stored explanations
//! - **Assumption Tracking**: dependency-aware assumption records with
//!   validation, impact assessment, and contradiction detection
//! - **Structured Response Parsing**: a lenient line-marker grammar that
//!   never errors - malformed output degrades to defaults
//!
//! ## Architecture
//!
//! ```text
//! Caller → ChainOfThought / DecisionPlanner / AssumptionTracker
//!                    ↓
//!          Structured Response Parser
//!                    ↓
//!          TextGenerator (external)
//! ```
//!
//! The consensus engine composes multiple chain-of-thought passes; every
//! other flow is one caller-owned structure per request.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use reasoning_engine::{ChainOfThought, EngineConfig, ThinkParams};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::from_env()?;
//!     let generator = Arc::new(MyProvider::new()?);
//!     let chain_of_thought = ChainOfThought::new(generator, &config);
//!
//!     let chain = chain_of_thought
//!         .think_through(ThinkParams::new("Choose a caching strategy").with_num_paths(3))
//!         .await?;
//!     println!("{} ({:.2})", chain.conclusion, chain.confidence);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Configuration management for the engine.
pub mod config;
/// Error types and result aliases for the engine.
pub mod error;
/// The text-generation boundary trait and options.
pub mod generation;
/// Lenient line-marker response parsing.
pub mod parser;
/// Prompt templates for every generation call.
pub mod prompts;
/// Reasoning capability implementations (chains, trees, assumptions).
pub mod reasoning;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult, GenerationError, GenerationResult};
pub use generation::{GenerationOptions, SharedGenerator, TextGenerator};
pub use reasoning::{
    Alternative, Assumption, AssumptionCategory, AssumptionStatus, AssumptionTracker, ChainOfThought,
    Contradiction, DecisionNode, DecisionOption, DecisionPlanner, DecisionTree, ImpactAssessment,
    ImpactScope, ImpactSeverity, NavigationStrategy, NodeId, OptionSelector, RecordParams,
    RiskLevel, SessionHistory, ThinkParams, Thought, ThoughtChain, ThoughtType, TreeParams,
    ValidationPlan, ValidationReport, ValidationResult,
};
