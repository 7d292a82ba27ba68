//! Text processing building blocks: normalisation, sentence splitting,
//! sentence embeddings and lexicon polarity.

pub mod embeddings;
pub mod normalize;
pub mod polarity;
pub mod sentences;

use std::sync::Arc;

use tracing::info;

use crate::{config::Settings, error::Result};
use polarity::{LexiconAnalyzer, PolarityAnalyzer};

/// Load the polarity analyzer named by the settings.
pub fn load_polarity_analyzer(settings: &Settings) -> Result<Arc<dyn PolarityAnalyzer>> {
    let analyzer = match &settings.polarity_lexicon {
        Some(path) => LexiconAnalyzer::from_csv(path)?,
        None => LexiconAnalyzer::builtin(),
    };
    info!(lexicon = analyzer.name(), words = analyzer.len(), "polarity lexicon loaded");
    Ok(Arc::new(analyzer))
}
