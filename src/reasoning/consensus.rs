//! Self-consistency consensus over independent reasoning passes.
//!
//! Running one generative pass gives a noisy answer; running several and
//! keeping the most commonly reached conclusion trades extra generation
//! calls for reliability. Passes are side-effect-free and share no state, so
//! they run concurrently, bounded by the configured permit count.
//! Aggregation happens only after every pass has settled; the operation
//! fails only when all passes fail.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::chain::{ChainOfThought, ThinkParams, ThoughtChain};
use crate::error::{EngineError, EngineResult};

/// Run `num_paths` independent passes and return the consensus chain.
pub(crate) async fn build_with_consensus(
    builder: &ChainOfThought,
    params: &ThinkParams,
    num_paths: usize,
) -> EngineResult<ThoughtChain> {
    let semaphore = Arc::new(Semaphore::new(builder.max_concurrency()));
    let mut join_set = JoinSet::new();

    for index in 0..num_paths {
        let builder = builder.clone();
        let problem = params.problem.clone();
        let context = params.context.clone();
        let constraints = params.constraints.clone();
        let semaphore = Arc::clone(&semaphore);

        join_set.spawn(async move {
            // A closed semaphore would only drop the concurrency bound, so
            // the permit result is not load-bearing.
            let _permit = semaphore.acquire_owned().await.ok();
            let result = builder
                .build_chain(&problem, context.as_deref(), &constraints)
                .await;
            (index, result)
        });
    }

    let mut indexed_chains: Vec<(usize, ThoughtChain)> = Vec::new();
    let mut last_error: Option<EngineError> = None;

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, Ok(chain))) => {
                debug!(path = index, confidence = chain.confidence, "Reasoning pass completed");
                indexed_chains.push((index, chain));
            }
            Ok((index, Err(error))) => {
                warn!(path = index, error = %error, "Reasoning pass failed");
                last_error = Some(error);
            }
            Err(join_error) => {
                last_error = Some(EngineError::Internal {
                    message: format!("Reasoning pass aborted: {}", join_error),
                });
            }
        }
    }

    if indexed_chains.is_empty() {
        return Err(last_error.unwrap_or_else(|| EngineError::Internal {
            message: "No reasoning passes completed".to_string(),
        }));
    }

    // Restore spawn order so group tie-breaking stays deterministic.
    indexed_chains.sort_by_key(|(index, _)| *index);
    let chains: Vec<ThoughtChain> = indexed_chains.into_iter().map(|(_, chain)| chain).collect();

    info!(
        requested = num_paths,
        completed = chains.len(),
        "Selecting consensus chain"
    );

    select_consensus(chains, num_paths).ok_or_else(|| EngineError::Internal {
        message: "Consensus selection on empty chain set".to_string(),
    })
}

/// Normalize a conclusion into its cluster key: lowercase, punctuation
/// stripped, whitespace collapsed.
pub(crate) fn normalize_conclusion(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            cleaned.extend(c.to_lowercase());
        } else if c.is_whitespace() {
            cleaned.push(' ');
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pick the consensus chain from completed passes.
///
/// Chains are clustered by normalized conclusion. The largest cluster wins
/// (first-seen on ties); within it the highest-confidence chain is selected
/// and its confidence boosted by `(cluster size / num_paths) * 0.2`, capped
/// at 1.0. When every cluster is a singleton there is no consensus to
/// reward: the globally highest-confidence chain is returned unboosted.
pub(crate) fn select_consensus(chains: Vec<ThoughtChain>, num_paths: usize) -> Option<ThoughtChain> {
    let mut groups: Vec<(String, Vec<ThoughtChain>)> = Vec::new();
    for chain in chains {
        let key = normalize_conclusion(&chain.conclusion);
        match groups.iter_mut().find(|(group_key, _)| *group_key == key) {
            Some((_, members)) => members.push(chain),
            None => groups.push((key, vec![chain])),
        }
    }

    let largest = groups.iter().map(|(_, members)| members.len()).max()?;

    if largest <= 1 {
        return groups
            .into_iter()
            .flat_map(|(_, members)| members)
            .reduce(|best, candidate| {
                if candidate.confidence > best.confidence {
                    candidate
                } else {
                    best
                }
            });
    }

    let (_, members) = groups
        .into_iter()
        .find(|(_, members)| members.len() == largest)?;
    let group_size = members.len();

    let mut selected = members.into_iter().reduce(|best, candidate| {
        if candidate.confidence > best.confidence {
            candidate
        } else {
            best
        }
    })?;

    let boost = (group_size as f64 / num_paths as f64) * 0.2;
    selected.confidence = (selected.confidence + boost).min(1.0);
    Some(selected)
}
