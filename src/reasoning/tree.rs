//! Decision-tree construction and navigation.
//!
//! This module builds a bounded-depth tree of decisions with weighted
//! options and walks it under a selection strategy, producing an auditable
//! path with stored explanations.
//!
//! Nodes live in an arena owned by [`DecisionTree`] and reference each other
//! by index, so parent back-references cost nothing and ownership never
//! cycles.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::{truncate, EngineCore};
use crate::config::{EngineConfig, TreeConfig};
use crate::error::{EngineError, EngineResult};
use crate::generation::{GenerationOptions, SharedGenerator};
use crate::parser::{match_keyword, parse_probability, parse_records, Grammar};
use crate::prompts::{
    FOLLOW_UP_QUESTION_PROMPT, OPTION_GENERATION_PROMPT, OPTION_SELECTION_PROMPT,
    SELECTION_EXPLANATION_PROMPT,
};

const OPTION_GRAMMAR: Grammar = Grammar {
    primary: "OPTION",
    fields: &["PROS", "CONS", "PROBABILITY", "RISK"],
};

// ============================================================================
// Data Model
// ============================================================================

/// Risk classification for a decision option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Routine, easily reversed.
    Low,
    /// Needs attention but manageable.
    Medium,
    /// Significant downside if it goes wrong.
    High,
    /// Potentially unrecoverable.
    Critical,
}

impl RiskLevel {
    /// Ordinal used for scoring: low=1 .. critical=4.
    pub fn ordinal(&self) -> u8 {
        match self {
            RiskLevel::Low => 1,
            RiskLevel::Medium => 2,
            RiskLevel::High => 3,
            RiskLevel::Critical => 4,
        }
    }

    /// Coerce a response field, most severe keyword first; anything
    /// unrecognized is low.
    pub fn from_response(value: &str) -> Self {
        match match_keyword(value, &["critical", "high", "medium"]) {
            Some("critical") => RiskLevel::Critical,
            Some("high") => RiskLevel::High,
            Some("medium") => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }

    /// Get the level name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Index of a node within its [`DecisionTree`] arena.
pub type NodeId = usize;

/// A weighted option at a decision node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionOption {
    /// Unique option ID.
    pub id: String,
    /// Short description of the option.
    pub description: String,
    /// Points in favor.
    pub pros: Vec<String>,
    /// Points against.
    pub cons: Vec<String>,
    /// Likelihood the option succeeds (0.0-1.0).
    pub probability: f64,
    /// Risk classification.
    pub risk: RiskLevel,
    /// Child decision reached by taking this option, if any.
    pub child: Option<NodeId>,
}

/// One step in a sequential decision process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionNode {
    /// Arena index of this node.
    pub id: NodeId,
    /// The question decided at this node.
    pub question: String,
    /// Accumulated path context (option descriptions joined by " → ").
    pub context: String,
    /// Distance from the root (root = 0).
    pub depth: usize,
    /// Generated options; set once, mutated only to attach children.
    pub options: Vec<DecisionOption>,
    /// Index into `options` recorded during navigation.
    pub selected_option: Option<usize>,
    /// Explanation stored for the recorded selection.
    pub reasoning: Option<String>,
    /// Parent node index, `None` for the root.
    pub parent: Option<NodeId>,
}

/// Arena of decision nodes; the root is always index 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<DecisionNode>,
}

impl DecisionTree {
    fn new(question: &str, context: &str) -> Self {
        Self {
            nodes: vec![DecisionNode {
                id: 0,
                question: question.to_string(),
                context: context.to_string(),
                depth: 0,
                options: Vec::new(),
                selected_option: None,
                reasoning: None,
                parent: None,
            }],
        }
    }

    /// The root node.
    pub fn root(&self) -> &DecisionNode {
        &self.nodes[0]
    }

    /// Look up a node by arena index.
    pub fn node(&self, id: NodeId) -> Option<&DecisionNode> {
        self.nodes.get(id)
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> &[DecisionNode] {
        &self.nodes
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree is empty (never true for a built tree).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push_child(&mut self, parent: NodeId, question: &str, context: &str) -> NodeId {
        let id = self.nodes.len();
        let depth = self.nodes[parent].depth + 1;
        self.nodes.push(DecisionNode {
            id,
            question: question.to_string(),
            context: context.to_string(),
            depth,
            options: Vec::new(),
            selected_option: None,
            reasoning: None,
            parent: Some(parent),
        });
        id
    }
}

// ============================================================================
// Navigation Strategies
// ============================================================================

/// Caller-injected selection for [`NavigationStrategy::Interactive`].
#[async_trait]
pub trait OptionSelector: Send + Sync {
    /// Pick an option index at the given node. Out-of-range answers are
    /// clamped to the last option.
    async fn select(&self, node: &DecisionNode) -> usize;
}

/// How the navigator picks an option at each node.
#[derive(Clone)]
pub enum NavigationStrategy {
    /// Highest success probability.
    HighestProbability,
    /// Lowest risk ordinal.
    LowestRisk,
    /// Highest `probability * (1 - ordinal/4)`.
    Balanced,
    /// Delegate the choice to the generation service.
    AiRecommended,
    /// Delegate the choice to the caller.
    Interactive(Arc<dyn OptionSelector>),
}

impl NavigationStrategy {
    /// Get the strategy name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationStrategy::HighestProbability => "highest_probability",
            NavigationStrategy::LowestRisk => "lowest_risk",
            NavigationStrategy::Balanced => "balanced",
            NavigationStrategy::AiRecommended => "ai_recommended",
            NavigationStrategy::Interactive(_) => "interactive",
        }
    }
}

impl std::fmt::Debug for NavigationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for NavigationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// Input parameters for building a decision tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeParams {
    /// The root decision question.
    pub problem: String,
    /// Optional starting context for the path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Maximum node depth (root = 0); bounds generation fan-out.
    pub max_depth: usize,
}

impl TreeParams {
    /// Create new params for a decision problem.
    pub fn new(problem: impl Into<String>, max_depth: usize) -> Self {
        Self {
            problem: problem.into(),
            context: None,
            max_depth,
        }
    }

    /// Set the starting context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

// ============================================================================
// Planner
// ============================================================================

/// Decision-tree building and navigation handler.
#[derive(Clone)]
pub struct DecisionPlanner {
    /// Core infrastructure (generator handle).
    core: EngineCore,
    /// Depth/branching limits.
    limits: TreeConfig,
}

impl DecisionPlanner {
    /// Create a new decision planner.
    pub fn new(generator: SharedGenerator, config: &EngineConfig) -> Self {
        Self {
            core: EngineCore::new(generator),
            limits: config.tree.clone(),
        }
    }

    /// Build a bounded-depth decision tree rooted at the given problem.
    ///
    /// Each node gets one option-generation call; each option below
    /// `max_depth - 1` gets one follow-up call that either terminates the
    /// branch or opens a child decision. Any generation failure aborts the
    /// whole build.
    pub async fn build_decision_tree(&self, params: TreeParams) -> EngineResult<DecisionTree> {
        let start = Instant::now();
        self.validate_params(&params)?;

        let root_context = params.context.clone().unwrap_or_default();
        let mut tree = DecisionTree::new(&params.problem, &root_context);

        // Pre-order expansion over an explicit work stack; sibling branches
        // are independent but each follow-up depends on its own option, so
        // branches expand sequentially.
        let mut pending: Vec<NodeId> = vec![0];
        while let Some(node_id) = pending.pop() {
            let depth = tree.nodes[node_id].depth;
            if depth >= params.max_depth {
                continue;
            }

            let options = self
                .generate_options(&tree.nodes[node_id].question, &tree.nodes[node_id].context)
                .await?;
            tree.nodes[node_id].options = options;

            if depth + 1 >= params.max_depth {
                continue;
            }

            for index in 0..tree.nodes[node_id].options.len() {
                let question = tree.nodes[node_id].question.clone();
                let description = tree.nodes[node_id].options[index].description.clone();
                let context = tree.nodes[node_id].context.clone();

                let follow_up = self.follow_up_question(&question, &description, &context).await?;
                let Some(follow_up) = follow_up else {
                    continue;
                };

                let child_context = if context.is_empty() {
                    description.clone()
                } else {
                    format!("{} → {}", context, description)
                };
                let child_id = tree.push_child(node_id, &follow_up, &child_context);
                tree.nodes[node_id].options[index].child = Some(child_id);
                pending.push(child_id);
            }
        }

        info!(
            nodes = tree.len(),
            max_depth = params.max_depth,
            latency_ms = start.elapsed().as_millis() as u64,
            "Decision tree built"
        );

        Ok(tree)
    }

    /// Walk the tree from the root, selecting one option per node under the
    /// given strategy and storing an explanation on each visited node.
    ///
    /// Stops at the first node with no options, or at a selected option
    /// with no child; neither is an error. The returned path never exceeds
    /// the build's `max_depth` in length.
    pub async fn navigate(
        &self,
        tree: &mut DecisionTree,
        strategy: &NavigationStrategy,
    ) -> EngineResult<Vec<NodeId>> {
        let mut current: NodeId = 0;
        let mut path = vec![current];

        loop {
            if tree.nodes[current].options.is_empty() {
                debug!(node = current, "Leaf reached (no options)");
                break;
            }

            let selected = self.select_option(&tree.nodes[current], strategy).await?;
            let explanation = self
                .explain_selection(&tree.nodes[current], selected, strategy)
                .await?;

            let node = &mut tree.nodes[current];
            node.selected_option = Some(selected);
            node.reasoning = Some(explanation);

            match node.options[selected].child {
                Some(child) => {
                    path.push(child);
                    current = child;
                }
                None => break,
            }
        }

        info!(strategy = %strategy, steps = path.len(), "Navigation completed");
        Ok(path)
    }

    // ========================================================================
    // Private Helper Methods
    // ========================================================================

    fn validate_params(&self, params: &TreeParams) -> EngineResult<()> {
        if params.problem.trim().is_empty() {
            return Err(EngineError::Validation {
                field: "problem".to_string(),
                reason: "Problem cannot be empty".to_string(),
            });
        }
        if params.max_depth == 0 || params.max_depth > self.limits.max_depth {
            return Err(EngineError::Validation {
                field: "max_depth".to_string(),
                reason: format!("max_depth must be between 1 and {}", self.limits.max_depth),
            });
        }
        Ok(())
    }

    async fn generate_options(
        &self,
        question: &str,
        context: &str,
    ) -> EngineResult<Vec<DecisionOption>> {
        let mut prompt = format!("{}{}\n", OPTION_GENERATION_PROMPT, question);
        if !context.is_empty() {
            prompt.push_str(&format!("Path so far: {}\n", context));
        }

        debug!(question = %truncate(question, 80), "Generating options");
        let response = self
            .core
            .generator()
            .generate(&prompt, &GenerationOptions::default())
            .await?;

        let mut options: Vec<DecisionOption> = parse_records(&response, &OPTION_GRAMMAR)
            .into_iter()
            .map(|record| DecisionOption {
                id: Uuid::new_v4().to_string(),
                description: record.primary.clone(),
                pros: record.list_field("PROS"),
                cons: record.list_field("CONS"),
                probability: parse_probability(record.first_field("PROBABILITY").unwrap_or("")),
                risk: RiskLevel::from_response(record.first_field("RISK").unwrap_or("")),
                child: None,
            })
            .collect();
        options.truncate(self.limits.max_branching);
        Ok(options)
    }

    /// Ask for the next question on a branch; `None` ends the branch.
    async fn follow_up_question(
        &self,
        question: &str,
        option: &str,
        context: &str,
    ) -> EngineResult<Option<String>> {
        let mut prompt = format!(
            "{}Decision: {}\nOption taken: {}\n",
            FOLLOW_UP_QUESTION_PROMPT, question, option
        );
        if !context.is_empty() {
            prompt.push_str(&format!("Path so far: {}\n", context));
        }

        let response = self
            .core
            .generator()
            .generate(&prompt, &GenerationOptions::default())
            .await?;

        let answer = response.trim();
        let lower = answer.to_lowercase();
        if answer.is_empty() || lower.contains("final") || lower.contains("none") {
            return Ok(None);
        }
        Ok(Some(answer.to_string()))
    }

    async fn select_option(
        &self,
        node: &DecisionNode,
        strategy: &NavigationStrategy,
    ) -> EngineResult<usize> {
        match strategy {
            NavigationStrategy::HighestProbability
            | NavigationStrategy::LowestRisk
            | NavigationStrategy::Balanced => Ok(choose_index(&node.options, strategy).unwrap_or(0)),
            NavigationStrategy::AiRecommended => self.recommend_option(node).await,
            NavigationStrategy::Interactive(selector) => {
                let last = node.options.len().saturating_sub(1);
                Ok(selector.select(node).await.min(last))
            }
        }
    }

    async fn recommend_option(&self, node: &DecisionNode) -> EngineResult<usize> {
        let mut prompt = format!("{}Decision: {}\nOptions:\n", OPTION_SELECTION_PROMPT, node.question);
        for (index, option) in node.options.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", index + 1, option.description));
        }

        let response = self
            .core
            .generator()
            .generate(&prompt, &GenerationOptions::default())
            .await?;

        Ok(match_option_by_description(&response, &node.options).unwrap_or(0))
    }

    async fn explain_selection(
        &self,
        node: &DecisionNode,
        selected: usize,
        strategy: &NavigationStrategy,
    ) -> EngineResult<String> {
        let prompt = format!(
            "{}\nStrategy: {}\nDecision: {}\nSelected option: {}",
            SELECTION_EXPLANATION_PROMPT,
            strategy,
            node.question,
            node.options[selected].description
        );

        let response = self
            .core
            .generator()
            .generate(&prompt, &GenerationOptions::default())
            .await?;
        Ok(response.trim().to_string())
    }
}

// ============================================================================
// Pure Selection Helpers
// ============================================================================

/// Index of the option chosen by a non-delegating strategy.
pub(crate) fn choose_index(
    options: &[DecisionOption],
    strategy: &NavigationStrategy,
) -> Option<usize> {
    match strategy {
        NavigationStrategy::HighestProbability => {
            index_of_max(options, |option| option.probability)
        }
        NavigationStrategy::LowestRisk => {
            index_of_max(options, |option| -(option.risk.ordinal() as f64))
        }
        NavigationStrategy::Balanced => index_of_max(options, balanced_score),
        _ => None,
    }
}

/// The balanced score discounts probability by risk:
/// `probability * (1 - ordinal/4)`, so a critical-risk option scores zero
/// regardless of its probability.
pub(crate) fn balanced_score(option: &DecisionOption) -> f64 {
    option.probability * (1.0 - option.risk.ordinal() as f64 / 4.0)
}

fn index_of_max(options: &[DecisionOption], score: impl Fn(&DecisionOption) -> f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, option) in options.iter().enumerate() {
        let value = score(option);
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((index, value)),
        }
    }
    best.map(|(index, _)| index)
}

fn match_option_by_description(response: &str, options: &[DecisionOption]) -> Option<usize> {
    let answer = response.trim().to_lowercase();
    if answer.is_empty() {
        return None;
    }
    options.iter().position(|option| {
        let description = option.description.to_lowercase();
        answer.contains(&description) || description.contains(&answer)
    })
}

// ============================================================================
// Tests
// ============================================================================
