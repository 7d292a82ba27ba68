//! Command-line interface wiring for post-risk.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::{
    config::{Backend, Settings},
    nlp::{self, embeddings::EmbeddingEngine, polarity::PolarityClassifier},
    pipeline::{DocumentClassifier, PolaritySource},
    risk::{reference::ReferenceRegistry, RiskClassifier},
};

pub mod classify;
pub mod exemplars;
pub mod score;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Crisis-risk tiers and sentiment polarity for social-media posts",
    long_about = None
)]
pub struct Cli {
    /// Level for post-risk logs when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    /// Override the configured embedding backend.
    #[arg(long, global = true, value_enum)]
    backend: Option<Backend>,
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Dispatch the selected sub-command.
    pub async fn dispatch(self, mut settings: Settings) -> Result<()> {
        if let Some(backend) = self.backend {
            settings.embedding.backend = backend;
        }
        match self.command {
            Commands::Classify(args) => classify::run(args, settings).await,
            Commands::Score(args) => score::run(args, settings).await,
            Commands::Exemplars => exemplars::run(settings).await,
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Label every post of a CSV export with sentiment and risk level.
    Classify(classify::Args),
    /// Classify a single text and print the result as JSON.
    Score(score::Args),
    /// Show the exemplar phrases and thresholds in effect.
    Exemplars,
}

/// Load the embedding model, encode the exemplars and assemble a classifier.
///
/// Any failure here is fatal for the run.
pub(crate) fn build_classifier(
    settings: &Settings,
    polarity_source: PolaritySource,
) -> Result<DocumentClassifier> {
    let engine = Arc::new(
        EmbeddingEngine::load(&settings.embedding).context("loading embedding model")?,
    );
    let registry = Arc::new(
        ReferenceRegistry::build(&engine, &settings.classifier.exemplars)
            .context("encoding reference exemplars")?,
    );
    let analyzer = nlp::load_polarity_analyzer(settings).context("loading polarity lexicon")?;

    let risk = RiskClassifier::new(engine, registry, settings.classifier.threshold);
    let polarity = PolarityClassifier::new(analyzer, settings.classifier.polarity);
    Ok(DocumentClassifier::new(risk, polarity, polarity_source))
}
