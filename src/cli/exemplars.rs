//! CLI entry-point listing the configured exemplar phrases.

use anyhow::Result;
use serde::Serialize;
use tracing::instrument;

use crate::{
    config::{Exemplars, Settings},
    risk::RiskTier,
};

#[derive(Debug, Serialize)]
struct Listing<'a> {
    threshold: f32,
    polarity_positive: f32,
    polarity_negative: f32,
    backend: String,
    model: &'a str,
    exemplars: &'a Exemplars,
}

#[instrument(skip(settings))]
pub async fn run(settings: Settings) -> Result<()> {
    let config = &settings.classifier;
    for tier in RiskTier::REFERENCE_TIERS {
        tracing::debug!(%tier, count = config.exemplars.for_tier(tier).len(), "exemplars");
    }
    let listing = Listing {
        threshold: config.threshold,
        polarity_positive: config.polarity.positive,
        polarity_negative: config.polarity.negative,
        backend: settings.embedding.backend.to_string(),
        model: &settings.embedding.model,
        exemplars: &config.exemplars,
    };
    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}
