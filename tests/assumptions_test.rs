//! Integration tests for assumption tracking and validation.

mod common;

use std::sync::Arc;

use common::ScriptedGenerator;
use pretty_assertions::assert_eq;
use reasoning_engine::{
    AssumptionCategory, AssumptionStatus, AssumptionTracker, EngineConfig, EngineError,
    ImpactSeverity, RecordParams,
};

fn tracker(generator: ScriptedGenerator) -> AssumptionTracker {
    AssumptionTracker::new(Arc::new(generator), &EngineConfig::default())
}

#[tokio::test]
async fn test_validate_assumption_verified() {
    let mut tracker = tracker(ScriptedGenerator::new(vec![
        "VALID: YES\nCONFIDENCE: 0.9\nEVIDENCE: load test at 2x traffic\nIMPLICATIONS: capacity planning stays valid",
    ]));

    let recorded = tracker
        .record_assumption(
            RecordParams::new("Traffic stays under 1k rps", "API gateway")
                .with_category(AssumptionCategory::Performance),
        )
        .unwrap();

    let result = tracker
        .validate_assumption(&recorded.id, None)
        .await
        .unwrap();

    assert!(result.is_valid);
    assert!((result.confidence - 0.9).abs() < 1e-9);
    assert_eq!(result.evidence, vec!["load test at 2x traffic"]);
    assert_eq!(result.implications, "capacity planning stays valid");

    let stored = tracker.get(&recorded.id).unwrap();
    assert_eq!(stored.status, AssumptionStatus::Verified);
    assert_eq!(stored.evidence, vec!["load test at 2x traffic"]);
}

#[tokio::test]
async fn test_validate_assumption_invalidated() {
    let mut tracker = tracker(ScriptedGenerator::new(vec![
        "VALID: NO\nCONFIDENCE: 0.15\nEVIDENCE: peak hits 4k rps",
    ]));

    let recorded = tracker
        .record_assumption(RecordParams::new("Traffic stays low", "gateway"))
        .unwrap();
    let result = tracker
        .validate_assumption(&recorded.id, None)
        .await
        .unwrap();

    assert!(!result.is_valid);
    assert_eq!(
        tracker.get(&recorded.id).unwrap().status,
        AssumptionStatus::Invalidated
    );
}

#[tokio::test]
async fn test_validate_assumption_partial_on_mid_confidence_no() {
    let mut tracker = tracker(ScriptedGenerator::new(vec![
        "VALID: PARTIAL\nCONFIDENCE: 0.6",
    ]));

    let recorded = tracker
        .record_assumption(RecordParams::new("Cache hit rate exceeds 90%", "edge"))
        .unwrap();
    tracker.validate_assumption(&recorded.id, None).await.unwrap();

    assert_eq!(
        tracker.get(&recorded.id).unwrap().status,
        AssumptionStatus::Partial
    );
}

#[tokio::test]
async fn test_validate_assumption_unparsable_degrades_to_partial() {
    // A prose response is a silent-empty parse: default confidence 0.5,
    // not valid, so the status lands on partial rather than erroring.
    let mut tracker = tracker(ScriptedGenerator::new(vec![
        "I really could not say either way.",
    ]));

    let recorded = tracker
        .record_assumption(RecordParams::new("The disk is local", "storage"))
        .unwrap();
    let result = tracker
        .validate_assumption(&recorded.id, None)
        .await
        .unwrap();

    assert!(!result.is_valid);
    assert_eq!(result.confidence, 0.5);
    assert_eq!(
        tracker.get(&recorded.id).unwrap().status,
        AssumptionStatus::Partial
    );
}

#[tokio::test]
async fn test_validate_assumption_appends_extra_evidence() {
    let mut tracker = tracker(ScriptedGenerator::new(vec![
        "VALID: YES\nCONFIDENCE: 0.8\nEVIDENCE: from the model",
    ]));

    let recorded = tracker
        .record_assumption(RecordParams::new("Backups restore cleanly", "ops"))
        .unwrap();
    let result = tracker
        .validate_assumption(&recorded.id, Some("restore drill of 2024-11"))
        .await
        .unwrap();

    assert_eq!(
        result.evidence,
        vec!["from the model", "restore drill of 2024-11"]
    );
    assert_eq!(tracker.get(&recorded.id).unwrap().evidence.len(), 2);
}

#[tokio::test]
async fn test_validate_assumption_unknown_id() {
    let mut tracker = tracker(ScriptedGenerator::new(vec![]));
    let err = tracker.validate_assumption("missing", None).await.unwrap_err();
    assert!(matches!(err, EngineError::AssumptionNotFound { .. }));
}

#[tokio::test]
async fn test_validate_all_aggregates_counts() {
    let mut tracker = tracker(ScriptedGenerator::new(vec![
        "VALID: YES\nCONFIDENCE: 0.9",
        "VALID: NO\nCONFIDENCE: 0.1",
        "VALID: NO\nCONFIDENCE: 0.6",
    ]));

    for statement in ["first holds", "second holds", "third holds"] {
        tracker
            .record_assumption(RecordParams::new(statement, "ctx"))
            .unwrap();
    }

    let report = tracker.validate_all().await.unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.verified, 1);
    assert_eq!(report.invalidated, 1);
    assert_eq!(report.partial, 1);
    assert_eq!(report.results.len(), 3);

    // Nothing left unverified.
    assert!(tracker
        .assumptions()
        .iter()
        .all(|a| a.status != AssumptionStatus::Unverified));
}

#[tokio::test]
async fn test_validate_all_skips_already_verified() {
    let mut tracker = tracker(ScriptedGenerator::new(vec![
        "VALID: YES\nCONFIDENCE: 0.9",
        "VALID: YES\nCONFIDENCE: 0.7",
    ]));

    let first = tracker
        .record_assumption(RecordParams::new("already checked", "ctx"))
        .unwrap();
    tracker.validate_assumption(&first.id, None).await.unwrap();
    tracker
        .record_assumption(RecordParams::new("still pending", "ctx"))
        .unwrap();

    let report = tracker.validate_all().await.unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(report.verified, 1);
}

#[tokio::test]
async fn test_validate_all_propagates_generation_failure() {
    let mut tracker = tracker(ScriptedGenerator::failing("provider down", 1));
    tracker
        .record_assumption(RecordParams::new("anything", "ctx"))
        .unwrap();

    let err = tracker.validate_all().await.unwrap_err();
    assert!(matches!(err, EngineError::Generation(_)));
}

#[tokio::test]
async fn test_assess_impact_stores_assessment() {
    let mut tracker = tracker(ScriptedGenerator::new(vec![
        "SCOPE: system\nSEVERITY: critical\nAFFECTED: checkout; billing\nMITIGATION: feature flag the rollout",
    ]));

    let recorded = tracker
        .record_assumption(RecordParams::new("Payments stay idempotent", "billing"))
        .unwrap();
    let impact = tracker.assess_impact(&recorded.id).await.unwrap();

    assert_eq!(impact.severity, ImpactSeverity::Critical);
    assert_eq!(impact.affected_components, vec!["checkout", "billing"]);
    assert_eq!(
        tracker.get(&recorded.id).unwrap().impact.as_ref().unwrap().severity,
        ImpactSeverity::Critical
    );
}

#[tokio::test]
async fn test_validation_plan_orders_by_impact_then_dependents() {
    let mut tracker = tracker(ScriptedGenerator::new(vec![
        "SCOPE: system\nSEVERITY: critical",
        "SCOPE: module\nSEVERITY: high",
    ]));

    let critical = tracker
        .record_assumption(RecordParams::new("critical one", "ctx"))
        .unwrap();
    let high = tracker
        .record_assumption(RecordParams::new("high one", "ctx"))
        .unwrap();
    let base = tracker
        .record_assumption(RecordParams::new("base one", "ctx"))
        .unwrap();
    let leaf = tracker
        .record_assumption(RecordParams::new("leaf one", "ctx").with_dependency(&base.id))
        .unwrap();

    tracker.assess_impact(&critical.id).await.unwrap();
    tracker.assess_impact(&high.id).await.unwrap();

    let plan = tracker.generate_validation_plan();
    assert_eq!(plan.priority1, vec![critical.id]);
    assert_eq!(plan.priority2, vec![high.id]);
    assert_eq!(plan.priority3, vec![base.id]);
    assert_eq!(plan.priority4, vec![leaf.id]);
}

#[tokio::test]
async fn test_find_contradictions_flags_pairs() {
    let generator = Arc::new(ScriptedGenerator::new(vec![]));
    let mut tracker = AssumptionTracker::new(generator.clone(), &EngineConfig::default());

    let first = tracker
        .record_assumption(RecordParams::new("Traffic is read-heavy", "db"))
        .unwrap();
    let second = tracker
        .record_assumption(RecordParams::new("Traffic is write-heavy", "db"))
        .unwrap();

    // Script the response once the generated ids are known.
    generator.push(&format!(
        "CONTRADICTION: {}, {}\nCONFLICT: both cannot dominate\nRESOLUTION: measure the ratio",
        first.id, second.id
    ));

    let contradictions = tracker.find_contradictions().await.unwrap();
    assert_eq!(contradictions.len(), 1);
    assert_eq!(contradictions[0].first, first.id);
    assert_eq!(contradictions[0].second, second.id);
    assert_eq!(contradictions[0].conflict, "both cannot dominate");

    for id in [&first.id, &second.id] {
        assert_eq!(
            tracker.get(id).unwrap().status,
            AssumptionStatus::NeedsReview
        );
    }
}

#[tokio::test]
async fn test_find_contradictions_skips_small_sets() {
    // With fewer than two assumptions no generation call is made; an
    // exhausted script would error if one were attempted.
    let mut tracker = tracker(ScriptedGenerator::new(vec![]));
    tracker
        .record_assumption(RecordParams::new("only one", "ctx"))
        .unwrap();

    let contradictions = tracker.find_contradictions().await.unwrap();
    assert!(contradictions.is_empty());
}

#[tokio::test]
async fn test_find_contradictions_lenient_on_garbage() {
    let mut tracker = tracker(ScriptedGenerator::new(vec![
        "NONE of these really conflict in my view.",
    ]));
    tracker
        .record_assumption(RecordParams::new("first", "ctx"))
        .unwrap();
    tracker
        .record_assumption(RecordParams::new("second", "ctx"))
        .unwrap();

    let contradictions = tracker.find_contradictions().await.unwrap();
    assert!(contradictions.is_empty());
}

#[tokio::test]
async fn test_find_contradictions_drops_unknown_ids() {
    let mut tracker = tracker(ScriptedGenerator::new(vec![
        "CONTRADICTION: ghost-1, ghost-2\nCONFLICT: imaginary\nRESOLUTION: n/a",
    ]));
    tracker
        .record_assumption(RecordParams::new("first", "ctx"))
        .unwrap();
    tracker
        .record_assumption(RecordParams::new("second", "ctx"))
        .unwrap();

    let contradictions = tracker.find_contradictions().await.unwrap();
    assert!(contradictions.is_empty());
}
