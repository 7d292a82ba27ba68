//! Embedding-based risk tiering.
//!
//! A document is split into sentences, every sentence is compared against the
//! exemplars of each reference tier, and the single best sentence/exemplar
//! pair per tier decides the outcome. High is checked before Moderate, so a
//! document crossing both thresholds is High even if its moderate similarity
//! is the larger of the two.

pub mod reference;
pub mod similarity;

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    error::Result,
    nlp::{embeddings::EmbeddingEngine, sentences::split_sentences},
};
use reference::{ReferenceRegistry, ReferenceSnapshot};
use similarity::SimilarityMatrix;

/// Estimated severity of crisis language. Ordered `Low < Moderate < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize,
)]
pub enum RiskTier {
    Low,
    Moderate,
    High,
}

impl RiskTier {
    /// Tiers backed by exemplar phrases, in decision priority order.
    pub const REFERENCE_TIERS: [RiskTier; 2] = [RiskTier::High, RiskTier::Moderate];

    pub const ALL: [RiskTier; 3] = [RiskTier::Low, RiskTier::Moderate, RiskTier::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Apply the tiered threshold policy to per-tier maximum similarities.
///
/// Comparisons are strict: a similarity equal to `threshold` does not match.
/// `None` (no sentences, or no exemplars for the tier) never matches.
pub fn decide_tier(threshold: f32, max_high: Option<f32>, max_moderate: Option<f32>) -> RiskTier {
    if max_high.is_some_and(|sim| sim > threshold) {
        RiskTier::High
    } else if max_moderate.is_some_and(|sim| sim > threshold) {
        RiskTier::Moderate
    } else {
        RiskTier::Low
    }
}

/// Sentence and exemplar behind a decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedSentence {
    pub index: usize,
    pub text: String,
    pub tier: RiskTier,
    pub exemplar: String,
    pub similarity: f32,
}

/// Tier decision plus what it was based on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub tier: RiskTier,
    pub high_similarity: Option<f32>,
    pub moderate_similarity: Option<f32>,
    pub matched: Option<MatchedSentence>,
    pub sentences: usize,
}

impl RiskAssessment {
    /// Outcome for text with no usable sentences.
    pub fn empty() -> Self {
        Self {
            tier: RiskTier::Low,
            high_similarity: None,
            moderate_similarity: None,
            matched: None,
            sentences: 0,
        }
    }
}

/// Nearest-exemplar risk classifier.
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    engine: Arc<EmbeddingEngine>,
    registry: Arc<ReferenceRegistry>,
    threshold: f32,
}

impl RiskClassifier {
    pub fn new(engine: Arc<EmbeddingEngine>, registry: Arc<ReferenceRegistry>, threshold: f32) -> Self {
        Self {
            engine,
            registry,
            threshold,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn engine(&self) -> &EmbeddingEngine {
        &self.engine
    }

    pub fn registry(&self) -> &ReferenceRegistry {
        &self.registry
    }

    /// Give up this handle, returning the shared engine.
    pub fn into_engine(self) -> Arc<EmbeddingEngine> {
        self.engine
    }

    /// Tier only.
    pub fn classify(&self, text: &str) -> Result<RiskTier> {
        Ok(self.assess(text)?.tier)
    }

    /// Classify `text`, encoding all of its sentences in one engine call.
    pub fn assess(&self, text: &str) -> Result<RiskAssessment> {
        let sentences: Vec<_> = split_sentences(text)
            .filter_map(|sentence| {
                let normalized = sentence.normalized();
                (!normalized.is_empty()).then_some((sentence, normalized))
            })
            .collect();
        if sentences.is_empty() {
            return Ok(RiskAssessment::empty());
        }

        let snapshot = self.registry.snapshot();
        let inputs: Vec<&str> = sentences.iter().map(|(_, n)| n.as_str()).collect();
        let embeddings = self.engine.encode(&inputs)?;

        let high = similarity::score(&embeddings, snapshot.embeddings(RiskTier::High));
        let moderate = similarity::score(&embeddings, snapshot.embeddings(RiskTier::Moderate));
        let high_similarity = high.max();
        let moderate_similarity = moderate.max();
        let tier = decide_tier(self.threshold, high_similarity, moderate_similarity);
        trace!(
            %tier,
            sentences = sentences.len(),
            ?high_similarity,
            ?moderate_similarity,
            generation = snapshot.generation,
            "assessed document"
        );

        let explain = |matrix: &SimilarityMatrix, tier: RiskTier| {
            matched_sentence(matrix, tier, &snapshot, |row| {
                let (sentence, _) = &sentences[row];
                (sentence.index, sentence.text.to_string())
            })
        };
        let matched = match tier {
            RiskTier::High => explain(&high, RiskTier::High),
            RiskTier::Moderate => explain(&moderate, RiskTier::Moderate),
            RiskTier::Low => {
                let best_high = explain(&high, RiskTier::High);
                let best_moderate = explain(&moderate, RiskTier::Moderate);
                match (best_high, best_moderate) {
                    (Some(h), Some(m)) => Some(if m.similarity > h.similarity { m } else { h }),
                    (h, m) => h.or(m),
                }
            }
        };

        Ok(RiskAssessment {
            tier,
            high_similarity,
            moderate_similarity,
            matched,
            sentences: sentences.len(),
        })
    }
}

fn matched_sentence(
    matrix: &SimilarityMatrix,
    tier: RiskTier,
    snapshot: &ReferenceSnapshot,
    sentence_at: impl Fn(usize) -> (usize, String),
) -> Option<MatchedSentence> {
    let best = matrix.best_match()?;
    let (index, text) = sentence_at(best.row);
    Some(MatchedSentence {
        index,
        text,
        tier,
        exemplar: snapshot.phrase(tier, best.col).unwrap_or_default().to_string(),
        similarity: best.similarity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_totally_ordered() {
        assert!(RiskTier::High > RiskTier::Moderate);
        assert!(RiskTier::Moderate > RiskTier::Low);
    }

    #[test]
    fn threshold_is_strict() {
        assert_eq!(decide_tier(0.5, Some(0.5), None), RiskTier::Low);
        assert_eq!(decide_tier(0.5, Some(0.500_001), None), RiskTier::High);
        assert_eq!(decide_tier(0.5, None, Some(0.5)), RiskTier::Low);
        assert_eq!(decide_tier(0.5, None, Some(0.51)), RiskTier::Moderate);
    }

    #[test]
    fn high_takes_precedence_over_a_stronger_moderate_match() {
        assert_eq!(decide_tier(0.5, Some(0.6), Some(0.95)), RiskTier::High);
    }

    #[test]
    fn missing_similarities_are_low() {
        assert_eq!(decide_tier(0.5, None, None), RiskTier::Low);
    }

    #[test]
    fn empty_assessment_is_low() {
        let assessment = RiskAssessment::empty();
        assert_eq!(assessment.tier, RiskTier::Low);
        assert_eq!(assessment.sentences, 0);
    }
}
