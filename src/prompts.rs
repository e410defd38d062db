//! Centralized prompt definitions for the reasoning engine
//!
//! This module contains every prompt template sent to the text-generation
//! service. Centralizing prompts makes them easier to maintain, test, and
//! version. Marker-format contracts stated here must stay in sync with the
//! grammars in the reasoning modules.

/// Trigger phrase appended to every chain-of-thought prompt.
///
/// Deliberately unstructured: over-specifying the reasoning format degrades
/// output quality, so the chain builder classifies free-form paragraphs
/// instead of demanding markers here.
pub const REASONING_TRIGGER: &str =
    "Think through this problem step by step, stating your observations, \
     assumptions, and reasoning before giving a conclusion.";

/// Prompt for extracting structured assumptions from one reasoning step.
pub const ASSUMPTION_EXTRACTION_PROMPT: &str = r#"List every assumption implied by the reasoning step below.

Answer with one block per assumption, using exactly these markers:
ASSUMPTION: <the assumed statement>
CONTEXT: <what the assumption applies to>
CONFIDENCE: <0.0-1.0>
CATEGORY: <technical | business | user | performance | security | data>

If the step contains no assumptions, answer with the single word NONE.

Reasoning step:
"#;

/// Prompt for generating weighted options at a decision node.
pub const OPTION_GENERATION_PROMPT: &str = r#"Propose 2-4 distinct options for the decision below.

Answer with one block per option, using exactly these markers:
OPTION: <short description>
PROS: <advantage>; <advantage>
CONS: <drawback>; <drawback>
PROBABILITY: <0.0-1.0 likelihood this option succeeds>
RISK: <low | medium | high | critical>

Decision:
"#;

/// Prompt for the follow-up question after choosing an option.
///
/// An empty answer, or one containing "final" or "none", means the branch is
/// complete and no child decision is created.
pub const FOLLOW_UP_QUESTION_PROMPT: &str = r#"Given the decision path so far, state the single next question that must be decided if this option is taken. Answer with the question only. If no further decision is needed, answer FINAL.
"#;

/// Prompt asking the model to pick one option from a list.
pub const OPTION_SELECTION_PROMPT: &str = r#"Pick the single best option for the decision below and answer with that option's description, verbatim.
"#;

/// Prompt for explaining why a selected option fits the active strategy.
pub const SELECTION_EXPLANATION_PROMPT: &str =
    "In two or three sentences, explain why the selected option fits the selection strategy.";

/// Prompt for validating one assumption against evidence.
pub const VALIDATION_PROMPT: &str = r#"Assess whether the assumption below holds.

Answer using exactly these markers:
VALID: <YES | NO | PARTIAL>
CONFIDENCE: <0.0-1.0>
EVIDENCE: <supporting or refuting fact>
IMPLICATIONS: <what follows if the assessment is wrong>

The EVIDENCE marker may repeat.

Assumption:
"#;

/// Prompt for classifying the impact of an assumption being false.
pub const IMPACT_PROMPT: &str = r#"Classify the impact if the assumption below turns out to be false.

Answer using exactly these markers:
SCOPE: <local | module | system | critical>
SEVERITY: <low | medium | high | critical>
AFFECTED: <component>; <component>
MITIGATION: <how to reduce the impact>

Assumption:
"#;

/// Prompt for flagging contradictions across a set of assumptions.
pub const CONTRADICTION_PROMPT: &str = r#"Review the numbered assumptions below and flag every pair that cannot both hold.

Answer with one block per contradiction, using exactly these markers:
CONTRADICTION: <first id>, <second id>
CONFLICT: <why they conflict>
RESOLUTION: <how to resolve the conflict>

If there are no contradictions, answer with the single word NONE.

Assumptions:
"#;
