//! Exemplar phrases per risk tier and their cached embeddings.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use arc_swap::ArcSwap;
use tracing::{info, warn};

use super::RiskTier;
use crate::{
    config::Exemplars,
    error::{ClassifyError, Result},
    nlp::{
        embeddings::{EmbeddingEngine, EmbeddingVector},
        normalize::normalize,
    },
};

/// Exemplars of one tier, aligned index-for-index with their embeddings.
#[derive(Debug, Clone)]
pub struct ReferenceSet {
    pub tier: RiskTier,
    pub phrases: Arc<[String]>,
    pub embeddings: Arc<[EmbeddingVector]>,
}

impl ReferenceSet {
    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

/// One complete, immutable generation of reference sets.
#[derive(Debug, Clone)]
pub struct ReferenceSnapshot {
    pub generation: u64,
    pub model: String,
    sets: Vec<ReferenceSet>,
}

impl ReferenceSnapshot {
    pub fn set(&self, tier: RiskTier) -> Option<&ReferenceSet> {
        self.sets.iter().find(|set| set.tier == tier)
    }

    /// Cached embeddings of a tier; empty for `Low` or an empty tier.
    pub fn embeddings(&self, tier: RiskTier) -> &[EmbeddingVector] {
        self.set(tier).map(|set| &*set.embeddings).unwrap_or_default()
    }

    /// Exemplar phrase behind column `col` of a tier's similarity matrix.
    pub fn phrase(&self, tier: RiskTier, col: usize) -> Option<&str> {
        self.set(tier)
            .and_then(|set| set.phrases.get(col))
            .map(String::as_str)
    }
}

/// Process-wide registry of exemplar embeddings.
///
/// Built once before any document is classified. Readers grab an
/// `Arc<ReferenceSnapshot>`; [`ReferenceRegistry::reload`] computes a full new
/// snapshot before swapping it in, so no reader ever sees a mix of generations.
#[derive(Debug)]
pub struct ReferenceRegistry {
    current: ArcSwap<ReferenceSnapshot>,
    generations: AtomicU64,
}

impl ReferenceRegistry {
    /// Encode every exemplar once.
    pub fn build(engine: &EmbeddingEngine, exemplars: &Exemplars) -> Result<Self> {
        let snapshot = encode_snapshot(engine, exemplars, 0)?;
        Ok(Self {
            current: ArcSwap::from_pointee(snapshot),
            generations: AtomicU64::new(0),
        })
    }

    /// The generation every new classification should use.
    pub fn snapshot(&self) -> Arc<ReferenceSnapshot> {
        self.current.load_full()
    }

    /// Replace the exemplars. On error the previous generation stays active.
    pub fn reload(&self, engine: &EmbeddingEngine, exemplars: &Exemplars) -> Result<u64> {
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(encode_snapshot(engine, exemplars, generation)?);
        // A slower concurrent reload must not overwrite a newer generation.
        let previous = self.current.rcu(|current| {
            if current.generation < generation {
                Arc::clone(&snapshot)
            } else {
                Arc::clone(current)
            }
        });
        if previous.generation < generation {
            info!(generation, "reference exemplars reloaded");
        }
        Ok(generation)
    }
}

fn encode_snapshot(
    engine: &EmbeddingEngine,
    exemplars: &Exemplars,
    generation: u64,
) -> Result<ReferenceSnapshot> {
    let mut phrases_by_tier = Vec::new();
    for tier in RiskTier::REFERENCE_TIERS {
        let phrases: Vec<String> = exemplars.for_tier(tier).to_vec();
        if phrases.is_empty() {
            warn!(%tier, "no exemplars configured; tier can never match");
        }
        phrases_by_tier.push((tier, phrases));
    }

    let normalized: Vec<String> = phrases_by_tier
        .iter()
        .flat_map(|(_, phrases)| phrases.iter().map(|p| normalize(p)))
        .collect();
    if let Some(pos) = normalized.iter().position(String::is_empty) {
        return Err(ClassifyError::Config(format!(
            "exemplar #{pos} has no comparable characters after normalisation"
        )));
    }

    let inputs: Vec<&str> = normalized.iter().map(String::as_str).collect();
    let mut embeddings = engine.encode(&inputs)?.into_iter();

    let sets = phrases_by_tier
        .into_iter()
        .map(|(tier, phrases)| {
            let tier_embeddings: Vec<_> = embeddings.by_ref().take(phrases.len()).collect();
            info!(%tier, exemplars = phrases.len(), "encoded reference set");
            ReferenceSet {
                tier,
                phrases: Arc::from(phrases),
                embeddings: Arc::from(tier_embeddings),
            }
        })
        .collect();

    Ok(ReferenceSnapshot {
        generation,
        model: engine.model_id().to_string(),
        sets,
    })
}
