//! Crisis-risk tiering and sentiment polarity for social-media posts.
//!
//! A post is split into sentences, each sentence is embedded and compared
//! against curated exemplar phrases, and the best match per reference tier
//! decides between `Low`, `Moderate` and `High`. A lexicon polarity score
//! provides an independent `Positive` / `Neutral` / `Negative` label.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod nlp;
pub mod pipeline;
pub mod risk;

pub use data::posts::Document;
pub use error::ClassifyError;
pub use nlp::polarity::PolarityLabel;
pub use pipeline::{ClassificationResult, DocumentClassifier, Pipeline};
pub use risk::{RiskClassifier, RiskTier};
