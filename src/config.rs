//! Runtime configuration utilities for post-risk.

use std::{
    env,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{error::ClassifyError, risk::RiskTier};

/// Similarity threshold applied to both reference tiers.
pub const DEFAULT_THRESHOLD: f32 = 0.5;
/// Sentence-transformers checkpoint used when none is configured.
pub const DEFAULT_MODEL: &str = "Xenova/all-mpnet-base-v2";
/// Longest string handed to the embedding backend in one slot.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 10_000;
/// Output width of the hashing backend.
pub const DEFAULT_HASHING_DIM: usize = 1024;

/// Embedding backend selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// ONNX sentence-transformer served through fastembed.
    Fastembed,
    /// Deterministic signed feature hashing; needs no model weights.
    Hashing,
}

impl Backend {
    /// Backend used when nothing is configured.
    pub fn default_for_build() -> Self {
        if cfg!(feature = "embeddings") {
            Self::Fastembed
        } else {
            Self::Hashing
        }
    }
}

impl FromStr for Backend {
    type Err = ClassifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fastembed" => Ok(Self::Fastembed),
            "hashing" => Ok(Self::Hashing),
            other => Err(ClassifyError::Config(format!(
                "unknown embedding backend `{other}` (expected fastembed or hashing)"
            ))),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fastembed => f.write_str("fastembed"),
            Self::Hashing => f.write_str("hashing"),
        }
    }
}

/// Curated exemplar phrases per reference tier.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Exemplars {
    #[serde(default)]
    pub high: Vec<String>,
    #[serde(default)]
    pub moderate: Vec<String>,
}

impl Default for Exemplars {
    fn default() -> Self {
        Self {
            high: vec!["i don't want to live anymore".to_string()],
            moderate: vec![
                "i am feeling overwhelmed".to_string(),
                "i need help".to_string(),
            ],
        }
    }
}

impl Exemplars {
    /// Read `{ "high": [...], "moderate": [...] }` from disk.
    pub fn from_json_file(path: &Path) -> Result<Self, ClassifyError> {
        let raw = std::fs::read_to_string(path)?;
        let exemplars: Self = serde_json::from_str(&raw)?;
        Ok(exemplars.trimmed())
    }

    /// Phrases configured for a tier. `Low` has no exemplars.
    pub fn for_tier(&self, tier: RiskTier) -> &[String] {
        match tier {
            RiskTier::High => &self.high,
            RiskTier::Moderate => &self.moderate,
            RiskTier::Low => &[],
        }
    }

    pub fn total(&self) -> usize {
        self.high.len() + self.moderate.len()
    }

    fn trimmed(self) -> Self {
        let clean = |phrases: Vec<String>| {
            phrases
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect()
        };
        Self {
            high: clean(self.high),
            moderate: clean(self.moderate),
        }
    }
}

/// Cut-offs mapping a continuous polarity score onto three buckets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarityThresholds {
    /// Scores strictly above this are positive.
    pub positive: f32,
    /// Scores strictly below this are negative.
    pub negative: f32,
}

impl Default for PolarityThresholds {
    fn default() -> Self {
        Self {
            positive: 0.1,
            negative: -0.1,
        }
    }
}

/// Tunable parameters of the classifier, passed in at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    pub threshold: f32,
    pub exemplars: Exemplars,
    pub polarity: PolarityThresholds,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            exemplars: Exemplars::default(),
            polarity: PolarityThresholds::default(),
        }
    }
}

impl ClassifierConfig {
    /// Reject configurations the classifier cannot act on.
    pub fn validate(&self) -> Result<(), ClassifyError> {
        if !(-1.0..=1.0).contains(&self.threshold) {
            return Err(ClassifyError::Config(format!(
                "similarity threshold {} outside [-1, 1]",
                self.threshold
            )));
        }
        if self.polarity.negative > self.polarity.positive {
            return Err(ClassifyError::Config(format!(
                "negative polarity cut-off {} above positive cut-off {}",
                self.polarity.negative, self.polarity.positive
            )));
        }
        if self.exemplars.total() == 0 {
            return Err(ClassifyError::Config(
                "no exemplar phrases configured".to_string(),
            ));
        }
        Ok(())
    }
}

/// Embedding engine parameters.
#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub backend: Backend,
    /// Model code or its suffix, e.g. `all-mpnet-base-v2`.
    pub model: String,
    pub cache_dir: PathBuf,
    pub max_input_chars: usize,
    pub hashing_dim: usize,
}

/// Application configuration resolved from `.env` and defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root folder for input artefacts.
    pub data_dir: PathBuf,
    /// Root folder for classifier outputs.
    pub outputs_dir: PathBuf,
    pub embedding: EmbeddingSettings,
    pub classifier: ClassifierConfig,
    /// Optional `word,valence` CSV replacing the built-in polarity lexicon.
    pub polarity_lexicon: Option<PathBuf>,
    /// Documents classified concurrently.
    pub concurrency: usize,
}

impl Settings {
    /// Load configuration from environment with reasonable defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let outputs_dir = env::var("OUTPUTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./outputs"));

        let backend = match env::var("EMBEDDING_BACKEND") {
            Ok(raw) => raw.parse().context("parsing EMBEDDING_BACKEND")?,
            Err(_) => Backend::default_for_build(),
        };
        let model = env::var("EMBEDDING_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let cache_dir = env::var("EMBEDDING_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("models"));
        let max_input_chars = parse_var("EMBEDDING_MAX_INPUT_CHARS", DEFAULT_MAX_INPUT_CHARS)?;
        let hashing_dim = parse_var("EMBEDDING_HASHING_DIM", DEFAULT_HASHING_DIM)?;

        let exemplars = match env::var("RISK_EXEMPLARS_PATH") {
            Ok(path) => Exemplars::from_json_file(Path::new(&path))
                .with_context(|| format!("loading exemplars from {path}"))?,
            Err(_) => Exemplars::default(),
        };
        let classifier = ClassifierConfig {
            threshold: parse_var("RISK_THRESHOLD", DEFAULT_THRESHOLD)?,
            exemplars,
            polarity: PolarityThresholds {
                positive: parse_var("POLARITY_POSITIVE", 0.1)?,
                negative: parse_var("POLARITY_NEGATIVE", -0.1)?,
            },
        };
        classifier.validate()?;

        let polarity_lexicon = env::var("POLARITY_LEXICON_PATH").ok().map(PathBuf::from);
        let concurrency = env::var("CLASSIFY_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or_else(default_concurrency);

        std::fs::create_dir_all(&data_dir).context("creating data dir")?;
        std::fs::create_dir_all(&outputs_dir).context("creating outputs dir")?;

        Ok(Self {
            data_dir,
            outputs_dir,
            embedding: EmbeddingSettings {
                backend,
                model,
                cache_dir,
                max_input_chars,
                hashing_dim,
            },
            classifier,
            polarity_lexicon,
            concurrency,
        })
    }

    /// Convenience helper for derived path segments.
    pub fn join_data<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.data_dir.join(path)
    }

    /// Convenience helper for derived output path segments.
    pub fn join_output<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.outputs_dir.join(path)
    }
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("parsing {key}={raw}")),
        Err(_) => Ok(default),
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ClassifierConfig::default().validate().is_ok());
    }

    #[test]
    fn default_exemplars_have_one_high_two_moderate() {
        let exemplars = Exemplars::default();
        assert_eq!(exemplars.for_tier(RiskTier::High).len(), 1);
        assert_eq!(exemplars.for_tier(RiskTier::Moderate).len(), 2);
        assert!(exemplars.for_tier(RiskTier::Low).is_empty());
    }

    #[test]
    fn inverted_polarity_cutoffs_rejected() {
        let config = ClassifierConfig {
            polarity: PolarityThresholds {
                positive: -0.2,
                negative: 0.2,
            },
            ..ClassifierConfig::default()
        };
        assert!(matches!(config.validate(), Err(ClassifyError::Config(_))));
    }

    #[test]
    fn threshold_outside_cosine_range_rejected() {
        let config = ClassifierConfig {
            threshold: 1.5,
            ..ClassifierConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_exemplars_rejected() {
        let config = ClassifierConfig {
            exemplars: Exemplars {
                high: Vec::new(),
                moderate: Vec::new(),
            },
            ..ClassifierConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn exemplar_file_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exemplars.json");
        std::fs::write(&path, r#"{"high": ["  end it all  ", ""], "moderate": ["so tired"]}"#)
            .unwrap();
        let exemplars = Exemplars::from_json_file(&path).unwrap();
        assert_eq!(exemplars.high, vec!["end it all".to_string()]);
        assert_eq!(exemplars.moderate, vec!["so tired".to_string()]);
    }

    #[test]
    fn backend_parses_case_insensitively() {
        assert_eq!("Hashing".parse::<Backend>().unwrap(), Backend::Hashing);
        assert!("onnx".parse::<Backend>().is_err());
    }

    #[cfg(feature = "embeddings")]
    #[test]
    fn default_build_uses_the_sentence_model() {
        assert_eq!(Backend::default_for_build(), Backend::Fastembed);
    }
}
