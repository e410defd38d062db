//! Assumption recording, validation, and dependency analysis.
//!
//! This module tracks assumptions as nodes in a dependency graph:
//! - append-only recording with dependency-id validation
//! - LLM-backed validation against evidence, singly or in bulk
//! - impact assessment (scope x severity) for an assumption being false
//! - breadth-first dependency-chain resolution with a visited-set guard
//! - contradiction detection across the full set
//! - a four-bucket validation plan ordered by impact
//!
//! The tracker is request-scoped: one instance per reasoning task, owned by
//! the caller.

use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::EngineCore;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::generation::{GenerationOptions, SharedGenerator};
use crate::parser::{match_keyword, parse_confidence, parse_records, Grammar};
use crate::prompts::{CONTRADICTION_PROMPT, IMPACT_PROMPT, VALIDATION_PROMPT};

const VALIDATION_GRAMMAR: Grammar = Grammar {
    primary: "VALID",
    fields: &["CONFIDENCE", "EVIDENCE", "IMPLICATIONS"],
};

const IMPACT_GRAMMAR: Grammar = Grammar {
    primary: "SCOPE",
    fields: &["SEVERITY", "AFFECTED", "MITIGATION"],
};

const CONTRADICTION_GRAMMAR: Grammar = Grammar {
    primary: "CONTRADICTION",
    fields: &["CONFLICT", "RESOLUTION"],
};

// ============================================================================
// Data Model
// ============================================================================

/// Domain category of an assumption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssumptionCategory {
    /// Implementation or architecture detail.
    #[default]
    Technical,
    /// Business rule or process.
    Business,
    /// End-user behavior or expectation.
    User,
    /// Latency, throughput, or capacity.
    Performance,
    /// Access control, secrets, attack surface.
    Security,
    /// Data shape, quality, or volume.
    Data,
}

impl AssumptionCategory {
    /// Coerce a response field; anything unrecognized is technical.
    pub fn from_response(value: &str) -> Self {
        match match_keyword(
            value,
            &["security", "performance", "business", "user", "data"],
        ) {
            Some("security") => AssumptionCategory::Security,
            Some("performance") => AssumptionCategory::Performance,
            Some("business") => AssumptionCategory::Business,
            Some("user") => AssumptionCategory::User,
            Some("data") => AssumptionCategory::Data,
            _ => AssumptionCategory::Technical,
        }
    }

    /// Get the category name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            AssumptionCategory::Technical => "technical",
            AssumptionCategory::Business => "business",
            AssumptionCategory::User => "user",
            AssumptionCategory::Performance => "performance",
            AssumptionCategory::Security => "security",
            AssumptionCategory::Data => "data",
        }
    }
}

impl std::fmt::Display for AssumptionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Verification state of a tracked assumption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssumptionStatus {
    /// Not yet validated.
    #[default]
    Unverified,
    /// Validation confirmed it.
    Verified,
    /// Validation was inconclusive but leaning positive.
    Partial,
    /// Validation refuted it.
    Invalidated,
    /// Flagged by contradiction detection; needs a human look.
    NeedsReview,
}

impl AssumptionStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            AssumptionStatus::Unverified => "unverified",
            AssumptionStatus::Verified => "verified",
            AssumptionStatus::Partial => "partial",
            AssumptionStatus::Invalidated => "invalidated",
            AssumptionStatus::NeedsReview => "needs_review",
        }
    }
}

impl std::fmt::Display for AssumptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Blast radius of an assumption being false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactScope {
    /// Contained to one call site or function.
    #[default]
    Local,
    /// Contained to one module or service.
    Module,
    /// Spreads across the system.
    System,
    /// Threatens the viability of the design.
    Critical,
}

impl ImpactScope {
    /// Coerce a response field; anything unrecognized is local.
    pub fn from_response(value: &str) -> Self {
        match match_keyword(value, &["critical", "system", "module"]) {
            Some("critical") => ImpactScope::Critical,
            Some("system") => ImpactScope::System,
            Some("module") => ImpactScope::Module,
            _ => ImpactScope::Local,
        }
    }
}

/// Severity of an assumption being false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactSeverity {
    /// Minor inconvenience.
    Low,
    /// Noticeable but recoverable.
    #[default]
    Medium,
    /// Major rework or outage.
    High,
    /// Unrecoverable or safety-relevant.
    Critical,
}

impl ImpactSeverity {
    /// Coerce a response field, most severe keyword first; anything
    /// unrecognized is medium.
    pub fn from_response(value: &str) -> Self {
        match match_keyword(value, &["critical", "high", "low"]) {
            Some("critical") => ImpactSeverity::Critical,
            Some("high") => ImpactSeverity::High,
            Some("low") => ImpactSeverity::Low,
            _ => ImpactSeverity::Medium,
        }
    }
}

/// Consequence classification for an assumption being false.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactAssessment {
    /// Blast radius.
    pub scope: ImpactScope,
    /// Severity.
    pub severity: ImpactSeverity,
    /// Components that would be affected.
    pub affected_components: Vec<String>,
    /// Suggested mitigation, if the model offered one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mitigation: Option<String>,
}

/// An assumption tracked in the dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedAssumption {
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
    /// Verification state.
    pub status: AssumptionStatus,
    /// Accumulated supporting/refuting evidence.
    pub evidence: Vec<String>,
    /// IDs of previously recorded assumptions this one depends on.
    pub dependencies: Vec<String>,
    /// Impact assessment, once computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<ImpactAssessment>,
}

/// Outcome of validating one assumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// The validated assumption.
    pub assumption_id: String,
    /// Whether the assumption was confirmed.
    pub is_valid: bool,
    /// Confidence in the verdict (0.0-1.0).
    pub confidence: f64,
    /// Evidence offered for the verdict.
    pub evidence: Vec<String>,
    /// What follows if the verdict is wrong.
    pub implications: String,
    /// When the validation ran.
    pub timestamp: DateTime<Utc>,
}

/// Aggregate outcome of validating every unverified assumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Assumptions validated in this run.
    pub total: usize,
    /// Now verified.
    pub verified: usize,
    /// Now partial.
    pub partial: usize,
    /// Now invalidated.
    pub invalidated: usize,
    /// Individual results in record order.
    pub results: Vec<ValidationResult>,
}

/// A detected conflict between two assumptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contradiction {
    /// First conflicting assumption.
    pub first: String,
    /// Second conflicting assumption.
    pub second: String,
    /// Why they conflict.
    pub conflict: String,
    /// Suggested resolution.
    pub resolution: String,
}

/// Validation priorities partitioned over the current assumption set.
///
/// Buckets are disjoint and exhaustive: each assumption lands in the first
/// bucket whose rule matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationPlan {
    /// Critical-severity impact.
    pub priority1: Vec<String>,
    /// High-severity impact.
    pub priority2: Vec<String>,
    /// Depended on by another assumption.
    pub priority3: Vec<String>,
    /// Everything else.
    pub priority4: Vec<String>,
}

// ============================================================================
// Parameters
// ============================================================================

/// Input parameters for recording an assumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordParams {
    /// The assumed statement.
    pub statement: String,
    /// What the assumption applies to.
    pub context: String,
    /// Initial confidence; defaults to 0.5.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Domain category; defaults to technical.
    #[serde(default)]
    pub category: AssumptionCategory,
    /// IDs of previously recorded assumptions this one depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

fn default_confidence() -> f64 {
    0.5
}

impl RecordParams {
    /// Create new params with statement and context.
    pub fn new(statement: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            context: context.into(),
            confidence: default_confidence(),
            category: AssumptionCategory::default(),
            dependencies: Vec::new(),
        }
    }

    /// Set the initial confidence (clamped to [0.0, 1.0]).
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: AssumptionCategory) -> Self {
        self.category = category;
        self
    }

    /// Add a dependency on a previously recorded assumption.
    pub fn with_dependency(mut self, id: impl Into<String>) -> Self {
        self.dependencies.push(id.into());
        self
    }
}

// ============================================================================
// Tracker
// ============================================================================

/// Assumption dependency tracker.
pub struct AssumptionTracker {
    /// Core infrastructure (generator handle).
    core: EngineCore,
    /// Append-only assumption store, in record order.
    assumptions: Vec<TrackedAssumption>,
}

impl AssumptionTracker {
    /// Create a new empty tracker.
    pub fn new(generator: SharedGenerator, _config: &EngineConfig) -> Self {
        Self {
            core: EngineCore::new(generator),
            assumptions: Vec::new(),
        }
    }

    /// Record a new assumption.
    ///
    /// Dependencies must name already-recorded assumptions; with the store
    /// being append-only this keeps the dependency graph acyclic by
    /// construction. Unknown or self-referencing ids are rejected.
    pub fn record_assumption(&mut self, params: RecordParams) -> EngineResult<TrackedAssumption> {
        if params.statement.trim().is_empty() {
            return Err(EngineError::Validation {
                field: "statement".to_string(),
                reason: "Statement cannot be empty".to_string(),
            });
        }

        let id = Uuid::new_v4().to_string();
        for dependency in &params.dependencies {
            if !self.assumptions.iter().any(|a| a.id == *dependency) {
                return Err(EngineError::UnknownDependency {
                    assumption_id: id,
                    dependency_id: dependency.clone(),
                });
            }
        }

        let assumption = TrackedAssumption {
            id,
            statement: params.statement,
            context: params.context,
            confidence: params.confidence.clamp(0.0, 1.0),
            category: params.category,
            status: AssumptionStatus::Unverified,
            evidence: Vec::new(),
            dependencies: params.dependencies,
            impact: None,
        };

        debug!(
            assumption_id = %assumption.id,
            category = %assumption.category,
            dependencies = assumption.dependencies.len(),
            "Assumption recorded"
        );

        self.assumptions.push(assumption.clone());
        Ok(assumption)
    }

    /// All tracked assumptions in record order.
    pub fn assumptions(&self) -> &[TrackedAssumption] {
        &self.assumptions
    }

    /// Look up one assumption by id.
    pub fn get(&self, id: &str) -> Option<&TrackedAssumption> {
        self.assumptions.iter().find(|a| a.id == id)
    }

    /// Validate one assumption against its evidence.
    ///
    /// Updates the stored status (`Verified` if confirmed, else `Partial`
    /// when verdict confidence exceeds 0.3, else `Invalidated`) and appends
    /// the returned evidence.
    pub async fn validate_assumption(
        &mut self,
        assumption_id: &str,
        extra_evidence: Option<&str>,
    ) -> EngineResult<ValidationResult> {
        let index = self.index_of(assumption_id)?;

        let mut prompt = format!(
            "{}{}\nContext: {}\n",
            VALIDATION_PROMPT, self.assumptions[index].statement, self.assumptions[index].context
        );
        let mut known_evidence = self.assumptions[index].evidence.clone();
        if let Some(extra) = extra_evidence {
            known_evidence.push(extra.to_string());
        }
        if !known_evidence.is_empty() {
            prompt.push_str("Known evidence:\n");
            for item in &known_evidence {
                prompt.push_str(&format!("- {}\n", item));
            }
        }

        let response = self
            .core
            .generator()
            .generate(&prompt, &GenerationOptions::default())
            .await?;

        let (is_valid, confidence, mut evidence, implications) = parse_validation(&response);
        if let Some(extra) = extra_evidence {
            evidence.push(extra.to_string());
        }

        let result = ValidationResult {
            assumption_id: assumption_id.to_string(),
            is_valid,
            confidence,
            evidence: evidence.clone(),
            implications,
            timestamp: Utc::now(),
        };

        let assumption = &mut self.assumptions[index];
        assumption.status = if is_valid {
            AssumptionStatus::Verified
        } else if confidence > 0.3 {
            AssumptionStatus::Partial
        } else {
            AssumptionStatus::Invalidated
        };
        assumption.evidence.extend(evidence);

        info!(
            assumption_id = %assumption_id,
            status = %assumption.status,
            confidence = confidence,
            "Assumption validated"
        );

        Ok(result)
    }

    /// Validate every unverified assumption, in record order.
    pub async fn validate_all(&mut self) -> EngineResult<ValidationReport> {
        let start = Instant::now();
        let pending: Vec<String> = self
            .assumptions
            .iter()
            .filter(|a| a.status == AssumptionStatus::Unverified)
            .map(|a| a.id.clone())
            .collect();

        let mut results = Vec::with_capacity(pending.len());
        for id in &pending {
            results.push(self.validate_assumption(id, None).await?);
        }

        let mut report = ValidationReport {
            total: results.len(),
            verified: 0,
            partial: 0,
            invalidated: 0,
            results,
        };
        for id in &pending {
            match self.get(id).map(|a| a.status) {
                Some(AssumptionStatus::Verified) => report.verified += 1,
                Some(AssumptionStatus::Partial) => report.partial += 1,
                Some(AssumptionStatus::Invalidated) => report.invalidated += 1,
                _ => {}
            }
        }

        info!(
            total = report.total,
            verified = report.verified,
            partial = report.partial,
            invalidated = report.invalidated,
            latency_ms = start.elapsed().as_millis() as u64,
            "Validation sweep completed"
        );

        Ok(report)
    }

    /// Classify the impact of the assumption being false and store it.
    pub async fn assess_impact(&mut self, assumption_id: &str) -> EngineResult<ImpactAssessment> {
        let index = self.index_of(assumption_id)?;

        let prompt = format!(
            "{}{}\nContext: {}\n",
            IMPACT_PROMPT, self.assumptions[index].statement, self.assumptions[index].context
        );
        let response = self
            .core
            .generator()
            .generate(&prompt, &GenerationOptions::default())
            .await?;

        let impact = parse_impact(&response);
        self.assumptions[index].impact = Some(impact.clone());

        debug!(
            assumption_id = %assumption_id,
            scope = ?impact.scope,
            severity = ?impact.severity,
            "Impact assessed"
        );

        Ok(impact)
    }

    /// Resolve the transitive dependency chain of an assumption.
    ///
    /// Breadth-first over dependency edges, starting at (and including) the
    /// assumption itself. Each id is visited at most once, so even a
    /// hand-built cyclic graph cannot loop the traversal.
    pub fn dependency_chain(&self, assumption_id: &str) -> EngineResult<Vec<&TrackedAssumption>> {
        let start = self
            .get(assumption_id)
            .ok_or_else(|| EngineError::AssumptionNotFound {
                assumption_id: assumption_id.to_string(),
            })?;

        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&TrackedAssumption> = VecDeque::new();
        let mut chain: Vec<&TrackedAssumption> = Vec::new();

        visited.insert(start.id.as_str());
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            chain.push(current);
            for dependency in &current.dependencies {
                if visited.insert(dependency.as_str()) {
                    if let Some(next) = self.get(dependency) {
                        queue.push_back(next);
                    }
                }
            }
        }

        Ok(chain)
    }

    /// Ask the model to flag contradicting pairs across the full set.
    ///
    /// Parsed leniently: unparsable output yields an empty list, and pairs
    /// naming unknown ids are dropped. Flagged assumptions are moved to
    /// `NeedsReview`.
    pub async fn find_contradictions(&mut self) -> EngineResult<Vec<Contradiction>> {
        if self.assumptions.len() < 2 {
            return Ok(Vec::new());
        }

        let mut prompt = String::from(CONTRADICTION_PROMPT);
        for (number, assumption) in self.assumptions.iter().enumerate() {
            prompt.push_str(&format!(
                "{}. [{}] {}\n",
                number + 1,
                assumption.id,
                assumption.statement
            ));
        }

        let response = self
            .core
            .generator()
            .generate(&prompt, &GenerationOptions::default())
            .await?;

        let contradictions = self.parse_contradictions(&response);

        for contradiction in &contradictions {
            for id in [&contradiction.first, &contradiction.second] {
                if let Ok(index) = self.index_of(id) {
                    self.assumptions[index].status = AssumptionStatus::NeedsReview;
                }
            }
        }

        info!(
            assumptions = self.assumptions.len(),
            contradictions = contradictions.len(),
            "Contradiction scan completed"
        );

        Ok(contradictions)
    }

    /// Partition the current assumptions into four validation priorities.
    ///
    /// First matching rule wins: critical impact severity, then high
    /// severity, then being depended on by another assumption, then the
    /// rest. The buckets are disjoint and cover every assumption.
    pub fn generate_validation_plan(&self) -> ValidationPlan {
        let depended_on: HashSet<&str> = self
            .assumptions
            .iter()
            .flat_map(|a| a.dependencies.iter().map(String::as_str))
            .collect();

        let mut plan = ValidationPlan {
            priority1: Vec::new(),
            priority2: Vec::new(),
            priority3: Vec::new(),
            priority4: Vec::new(),
        };

        for assumption in &self.assumptions {
            let severity = assumption.impact.as_ref().map(|impact| impact.severity);
            if severity == Some(ImpactSeverity::Critical) {
                plan.priority1.push(assumption.id.clone());
            } else if severity == Some(ImpactSeverity::High) {
                plan.priority2.push(assumption.id.clone());
            } else if depended_on.contains(assumption.id.as_str()) {
                plan.priority3.push(assumption.id.clone());
            } else {
                plan.priority4.push(assumption.id.clone());
            }
        }

        plan
    }

    // ========================================================================
    // Private Helper Methods
    // ========================================================================

    fn index_of(&self, assumption_id: &str) -> EngineResult<usize> {
        self.assumptions
            .iter()
            .position(|a| a.id == assumption_id)
            .ok_or_else(|| EngineError::AssumptionNotFound {
                assumption_id: assumption_id.to_string(),
            })
    }

    fn parse_contradictions(&self, response: &str) -> Vec<Contradiction> {
        parse_records(response, &CONTRADICTION_GRAMMAR)
            .into_iter()
            .filter_map(|record| {
                let ids = crate::parser::split_list(&record.primary);
                let (first, second) = match (ids.first(), ids.get(1)) {
                    (Some(first), Some(second)) => (first.clone(), second.clone()),
                    _ => return None,
                };
                if self.get(&first).is_none() || self.get(&second).is_none() {
                    warn!(first = %first, second = %second, "Dropping contradiction with unknown ids");
                    return None;
                }
                Some(Contradiction {
                    first,
                    second,
                    conflict: record
                        .first_field("CONFLICT")
                        .unwrap_or_default()
                        .to_string(),
                    resolution: record
                        .first_field("RESOLUTION")
                        .unwrap_or_default()
                        .to_string(),
                })
            })
            .collect()
    }
}

/// Decode a validation response into (is_valid, confidence, evidence,
/// implications), degrading to defaults when the response is unparsable.
pub(crate) fn parse_validation(response: &str) -> (bool, f64, Vec<String>, String) {
    let records = parse_records(response, &VALIDATION_GRAMMAR);
    let Some(record) = records.first() else {
        return (false, 0.5, Vec::new(), String::new());
    };

    let is_valid = record.primary.to_lowercase().contains("yes");
    let confidence = parse_confidence(record.first_field("CONFIDENCE").unwrap_or(""));
    let evidence = record
        .field_values("EVIDENCE")
        .iter()
        .cloned()
        .collect::<Vec<_>>();
    let implications = record
        .first_field("IMPLICATIONS")
        .unwrap_or_default()
        .to_string();

    (is_valid, confidence, evidence, implications)
}

/// Decode an impact response, defaulting to local/medium on empty parses.
pub(crate) fn parse_impact(response: &str) -> ImpactAssessment {
    let records = parse_records(response, &IMPACT_GRAMMAR);
    let Some(record) = records.first() else {
        return ImpactAssessment {
            scope: ImpactScope::Local,
            severity: ImpactSeverity::Medium,
            affected_components: Vec::new(),
            mitigation: None,
        };
    };

    ImpactAssessment {
        scope: ImpactScope::from_response(&record.primary),
        severity: ImpactSeverity::from_response(record.first_field("SEVERITY").unwrap_or("")),
        affected_components: record.list_field("AFFECTED"),
        mitigation: record.first_field("MITIGATION").map(str::to_string),
    }
}

// ============================================================================
// Tests
// ============================================================================
