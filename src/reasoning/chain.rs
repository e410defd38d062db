//! Chain-of-thought reasoning - one problem decomposed into typed steps.
//!
//! This module provides the thought-chain builder:
//! - a single generation pass split into classified [`Thought`]s
//! - per-step structured assumption extraction
//! - conclusion selection and an aggregate confidence score
//! - optional self-consistency across several independent passes
//!   (see the consensus module)

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::{build_with_consensus, truncate, AssumptionCategory, EngineCore};
use crate::config::{ConsensusConfig, EngineConfig};
use crate::error::{EngineError, EngineResult};
use crate::generation::{GenerationOptions, SharedGenerator};
use crate::parser::{parse_confidence, parse_records, Grammar};
use crate::prompts::{ASSUMPTION_EXTRACTION_PROMPT, REASONING_TRIGGER};

const ASSUMPTION_GRAMMAR: Grammar = Grammar {
    primary: "ASSUMPTION",
    fields: &["CONTEXT", "CONFIDENCE", "CATEGORY"],
};

/// Terms signalling high certainty in a reasoning step.
const HIGH_CONFIDENCE_TERMS: &[&str] = &[
    "definitely",
    "certainly",
    "clearly",
    "obviously",
    "undoubtedly",
    "always",
];

/// Hedging terms signalling low certainty.
const LOW_CONFIDENCE_TERMS: &[&str] = &[
    "might",
    "perhaps",
    "possibly",
    "unclear",
    "uncertain",
    "unsure",
];

/// Terms signalling moderate certainty.
const MEDIUM_CONFIDENCE_TERMS: &[&str] = &["likely", "probably", "should", "typically", "generally"];

// ============================================================================
// Data Model
// ============================================================================

/// Classification of one unit of reasoning output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThoughtType {
    /// A statement about the problem as given.
    Observation,
    /// Something taken to be true without proof.
    Assumption,
    /// A derivation step.
    Reasoning,
    /// An open question raised while reasoning.
    Question,
    /// A concluding statement.
    Conclusion,
    /// A risk or concern.
    Warning,
    /// An alternative approach considered.
    Alternative,
}

impl ThoughtType {
    /// Get the type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ThoughtType::Observation => "observation",
            ThoughtType::Assumption => "assumption",
            ThoughtType::Reasoning => "reasoning",
            ThoughtType::Question => "question",
            ThoughtType::Conclusion => "conclusion",
            ThoughtType::Warning => "warning",
            ThoughtType::Alternative => "alternative",
        }
    }
}

impl std::fmt::Display for ThoughtType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One classified unit of reasoning output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thought {
    /// Unique thought ID.
    pub id: String,
    /// The paragraph content.
    pub content: String,
    /// Classified type.
    #[serde(rename = "type")]
    pub thought_type: ThoughtType,
    /// Lexical confidence for this step (0.0-1.0).
    pub confidence: f64,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// The immediately preceding thought, `None` for the first. The chain of
    /// parents never cycles: thoughts are linked in generation order.
    pub parent_id: Option<String>,
}

/// An alternative approach surfaced during reasoning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alternative {
    /// What the alternative is.
    pub description: String,
    /// Likelihood it would work (0.0-1.0).
    pub probability: f64,
    /// Points in favor.
    pub pros: Vec<String>,
    /// Points against.
    pub cons: Vec<String>,
}

/// A structured assumption extracted from a reasoning step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assumption {
    /// Unique assumption ID.
    pub id: String,
    /// The assumed statement.
    pub statement: String,
    /// What the assumption applies to.
    pub context: String,
    /// Confidence that the assumption holds (0.0-1.0).
    pub confidence: f64,
    /// Domain category.
    pub category: AssumptionCategory,
}

/// The result of one full reasoning pass.
///
/// Created atomically after the pass completes and immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThoughtChain {
    /// Unique chain ID.
    pub id: String,
    /// The problem that was reasoned about.
    pub problem: String,
    /// Classified thoughts in generation order.
    pub thoughts: Vec<Thought>,
    /// The selected conclusion.
    pub conclusion: String,
    /// Aggregate confidence (0.1-1.0).
    pub confidence: f64,
    /// Alternatives surfaced while reasoning.
    pub alternatives: Vec<Alternative>,
    /// Assumptions extracted from assumption/reasoning steps.
    pub assumptions: Vec<Assumption>,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Parameters
// ============================================================================

/// Input parameters for a reasoning request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkParams {
    /// The problem to reason about.
    pub problem: String,
    /// Optional background context prefixed to the prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Constraints rendered as a bulleted list in the prompt.
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Run several independent passes and reconcile them by consensus.
    #[serde(default)]
    pub use_self_consistency: bool,
    /// Number of consensus passes; defaults to the configured count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_paths: Option<usize>,
}

impl ThinkParams {
    /// Create new params for a problem.
    pub fn new(problem: impl Into<String>) -> Self {
        Self {
            problem: problem.into(),
            context: None,
            constraints: Vec::new(),
            use_self_consistency: false,
            num_paths: None,
        }
    }

    /// Set the background context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add a constraint.
    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    /// Enable self-consistency with the configured default path count.
    pub fn with_self_consistency(mut self) -> Self {
        self.use_self_consistency = true;
        self
    }

    /// Enable self-consistency with an explicit path count.
    pub fn with_num_paths(mut self, num_paths: usize) -> Self {
        self.use_self_consistency = true;
        self.num_paths = Some(num_paths);
        self
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Chain-of-thought reasoning handler.
#[derive(Clone)]
pub struct ChainOfThought {
    /// Core infrastructure (generator handle).
    core: EngineCore,
    /// Self-consistency limits.
    consensus: ConsensusConfig,
}

impl ChainOfThought {
    /// Create a new chain-of-thought handler.
    pub fn new(generator: SharedGenerator, config: &EngineConfig) -> Self {
        Self {
            core: EngineCore::new(generator),
            consensus: config.consensus.clone(),
        }
    }

    /// Reason through a problem, returning a complete chain or the first
    /// generation error. With self-consistency enabled, the requested number
    /// of passes run independently and the most consistent chain is
    /// returned; the operation fails only if every pass fails.
    pub async fn think_through(&self, params: ThinkParams) -> EngineResult<ThoughtChain> {
        let start = Instant::now();
        self.validate_params(&params)?;

        let chain = if params.use_self_consistency {
            let num_paths = params.num_paths.unwrap_or(self.consensus.default_paths);
            build_with_consensus(self, &params, num_paths).await?
        } else {
            self.build_chain(&params.problem, params.context.as_deref(), &params.constraints)
                .await?
        };

        info!(
            chain_id = %chain.id,
            thoughts = chain.thoughts.len(),
            assumptions = chain.assumptions.len(),
            confidence = chain.confidence,
            latency_ms = start.elapsed().as_millis() as u64,
            "Reasoning completed"
        );

        Ok(chain)
    }

    /// Run one reasoning pass. Used directly and by the consensus engine.
    pub(crate) async fn build_chain(
        &self,
        problem: &str,
        context: Option<&str>,
        constraints: &[String],
    ) -> EngineResult<ThoughtChain> {
        let prompt = build_prompt(problem, context, constraints);
        debug!(problem = %truncate(problem, 80), "Running reasoning pass");

        let response = self
            .core
            .generator()
            .generate(&prompt, &GenerationOptions::reasoning())
            .await?;

        let thoughts = classify_response(&response);

        let mut assumptions = Vec::new();
        for thought in &thoughts {
            if matches!(
                thought.thought_type,
                ThoughtType::Assumption | ThoughtType::Reasoning
            ) {
                assumptions.extend(self.extract_assumptions(&thought.content).await?);
            }
        }

        let conclusion = select_conclusion(&thoughts);
        let confidence = chain_confidence(&thoughts, &assumptions);
        let alternatives = collect_alternatives(&thoughts);

        Ok(ThoughtChain {
            id: Uuid::new_v4().to_string(),
            problem: problem.to_string(),
            thoughts,
            conclusion,
            confidence,
            alternatives,
            assumptions,
            timestamp: Utc::now(),
        })
    }

    /// Extract structured assumptions from one reasoning step.
    async fn extract_assumptions(&self, content: &str) -> EngineResult<Vec<Assumption>> {
        let prompt = format!("{}{}", ASSUMPTION_EXTRACTION_PROMPT, content);
        let response = self
            .core
            .generator()
            .generate(&prompt, &GenerationOptions::default())
            .await?;
        Ok(parse_assumptions(&response, content))
    }

    fn validate_params(&self, params: &ThinkParams) -> EngineResult<()> {
        if params.problem.trim().is_empty() {
            return Err(EngineError::Validation {
                field: "problem".to_string(),
                reason: "Problem cannot be empty".to_string(),
            });
        }

        if params.use_self_consistency {
            let num_paths = params.num_paths.unwrap_or(self.consensus.default_paths);
            if num_paths < 2 {
                return Err(EngineError::Validation {
                    field: "num_paths".to_string(),
                    reason: "Self-consistency requires at least 2 paths".to_string(),
                });
            }
            if num_paths > self.consensus.max_paths {
                return Err(EngineError::Validation {
                    field: "num_paths".to_string(),
                    reason: format!("At most {} paths allowed", self.consensus.max_paths),
                });
            }
        }

        Ok(())
    }

    /// Concurrency bound for consensus passes.
    pub(crate) fn max_concurrency(&self) -> usize {
        self.consensus.max_concurrency
    }
}

// ============================================================================
// Pure Helpers
// ============================================================================

fn build_prompt(problem: &str, context: Option<&str>, constraints: &[String]) -> String {
    let mut prompt = String::new();

    if let Some(context) = context {
        prompt.push_str(&format!("Context: {}\n\n", context));
    }

    prompt.push_str(&format!("Problem: {}\n", problem));

    if !constraints.is_empty() {
        prompt.push_str("\nConstraints:\n");
        for constraint in constraints {
            prompt.push_str(&format!("- {}\n", constraint));
        }
    }

    prompt.push('\n');
    prompt.push_str(REASONING_TRIGGER);
    prompt
}

/// Split a response into blank-line-separated paragraphs and classify each
/// into a sequentially linked thought.
pub(crate) fn classify_response(response: &str) -> Vec<Thought> {
    let mut thoughts: Vec<Thought> = Vec::new();

    for paragraph in response.split("\n\n") {
        let content = paragraph.trim();
        if content.is_empty() {
            continue;
        }

        let index = thoughts.len();
        let thought_type = classify_paragraph(index, content);
        let confidence = lexical_confidence(content);
        let parent_id = thoughts.last().map(|previous: &Thought| previous.id.clone());

        thoughts.push(Thought {
            id: Uuid::new_v4().to_string(),
            content: content.to_string(),
            thought_type,
            confidence,
            timestamp: Utc::now(),
            parent_id,
        });
    }

    thoughts
}

/// Ordered keyword classification. The first paragraph is always an
/// observation; later checks run in fixed precedence.
pub(crate) fn classify_paragraph(index: usize, text: &str) -> ThoughtType {
    let lower = text.to_lowercase();

    if index == 0 || lower.contains("observ") {
        ThoughtType::Observation
    } else if lower.contains('?') || lower.contains("question") {
        ThoughtType::Question
    } else if lower.contains("assum") {
        ThoughtType::Assumption
    } else if lower.contains("alternative") || lower.contains("another") {
        ThoughtType::Alternative
    } else if lower.contains("risk") || lower.contains("warning") || lower.contains("concern") {
        ThoughtType::Warning
    } else if lower.contains("conclusion") || lower.contains("therefore") || lower.contains("final")
    {
        ThoughtType::Conclusion
    } else {
        ThoughtType::Reasoning
    }
}

/// Per-step confidence from lexical certainty markers.
pub(crate) fn lexical_confidence(text: &str) -> f64 {
    let lower = text.to_lowercase();

    if HIGH_CONFIDENCE_TERMS.iter().any(|term| lower.contains(term)) {
        0.85
    } else if LOW_CONFIDENCE_TERMS.iter().any(|term| lower.contains(term)) {
        0.4
    } else if MEDIUM_CONFIDENCE_TERMS
        .iter()
        .any(|term| lower.contains(term))
    {
        0.65
    } else {
        0.5
    }
}

/// Last conclusion thought, else last reasoning thought, else the last
/// thought overall; empty for an empty chain.
pub(crate) fn select_conclusion(thoughts: &[Thought]) -> String {
    thoughts
        .iter()
        .rev()
        .find(|thought| thought.thought_type == ThoughtType::Conclusion)
        .or_else(|| {
            thoughts
                .iter()
                .rev()
                .find(|thought| thought.thought_type == ThoughtType::Reasoning)
        })
        .or_else(|| thoughts.last())
        .map(|thought| thought.content.clone())
        .unwrap_or_default()
}

/// Aggregate chain confidence: mean step confidence, penalized by the
/// fraction of weak assumptions (confidence < 0.7), with a 0.1 bonus when
/// the chain holds both a reasoning step and a conclusion. Clamped to
/// [0.1, 1.0].
pub(crate) fn chain_confidence(thoughts: &[Thought], assumptions: &[Assumption]) -> f64 {
    if thoughts.is_empty() {
        return 0.1;
    }

    let mean: f64 =
        thoughts.iter().map(|thought| thought.confidence).sum::<f64>() / thoughts.len() as f64;

    let penalty = if assumptions.is_empty() {
        0.0
    } else {
        let weak = assumptions
            .iter()
            .filter(|assumption| assumption.confidence < 0.7)
            .count();
        (weak as f64 / assumptions.len() as f64) * 0.2
    };

    let has_reasoning = thoughts
        .iter()
        .any(|thought| thought.thought_type == ThoughtType::Reasoning);
    let has_conclusion = thoughts
        .iter()
        .any(|thought| thought.thought_type == ThoughtType::Conclusion);
    let bonus = if has_reasoning && has_conclusion {
        0.1
    } else {
        0.0
    };

    (mean - penalty + bonus).clamp(0.1, 1.0)
}

fn collect_alternatives(thoughts: &[Thought]) -> Vec<Alternative> {
    thoughts
        .iter()
        .filter(|thought| thought.thought_type == ThoughtType::Alternative)
        .map(|thought| Alternative {
            description: thought.content.clone(),
            probability: thought.confidence,
            pros: Vec::new(),
            cons: Vec::new(),
        })
        .collect()
}

fn parse_assumptions(response: &str, fallback_context: &str) -> Vec<Assumption> {
    parse_records(response, &ASSUMPTION_GRAMMAR)
        .into_iter()
        .filter(|record| !record.primary.eq_ignore_ascii_case("none"))
        .map(|record| Assumption {
            id: Uuid::new_v4().to_string(),
            statement: record.primary.clone(),
            context: record
                .first_field("CONTEXT")
                .map(str::to_string)
                .unwrap_or_else(|| fallback_context.to_string()),
            confidence: parse_confidence(record.first_field("CONFIDENCE").unwrap_or("")),
            category: AssumptionCategory::from_response(
                record.first_field("CATEGORY").unwrap_or(""),
            ),
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
