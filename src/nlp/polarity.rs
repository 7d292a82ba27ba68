//! Lexicon-based sentiment polarity.

use std::{collections::HashMap, fmt, path::Path, sync::Arc};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    config::PolarityThresholds,
    error::{ClassifyError, Result},
};

/// Coarse sentiment bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum PolarityLabel {
    Positive,
    Neutral,
    Negative,
}

impl fmt::Display for PolarityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Positive => "Positive",
            Self::Neutral => "Neutral",
            Self::Negative => "Negative",
        };
        f.write_str(label)
    }
}

/// Trait for polarity scorers. Scores lie in `[-1, 1]`.
pub trait PolarityAnalyzer: Send + Sync {
    fn name(&self) -> &str;
    fn polarity(&self, text: &str) -> f32;
}

/// Word valences. Values are averaged across every scored word in a text.
const LEXICON: &[(&str, f32)] = &[
    // positive
    ("good", 0.7),
    ("great", 0.8),
    ("excellent", 1.0),
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("wonderful", 1.0),
    ("fantastic", 0.4),
    ("beautiful", 0.85),
    ("lovely", 0.5),
    ("nice", 0.6),
    ("happy", 0.8),
    ("happier", 0.6),
    ("glad", 0.5),
    ("joy", 0.8),
    ("joyful", 0.8),
    ("love", 0.5),
    ("loved", 0.7),
    ("loving", 0.6),
    ("best", 1.0),
    ("better", 0.5),
    ("fine", 0.4),
    ("calm", 0.3),
    ("peaceful", 0.5),
    ("relaxed", 0.4),
    ("hopeful", 0.5),
    ("hope", 0.3),
    ("grateful", 0.6),
    ("thankful", 0.6),
    ("thanks", 0.2),
    ("proud", 0.8),
    ("confident", 0.5),
    ("strong", 0.4),
    ("safe", 0.5),
    ("fun", 0.3),
    ("funny", 0.25),
    ("sunny", 0.4),
    ("bright", 0.7),
    ("perfect", 1.0),
    ("success", 0.3),
    ("successful", 0.75),
    ("healthy", 0.5),
    ("kind", 0.6),
    ("supportive", 0.5),
    ("fortunate", 0.5),
    ("lucky", 0.3),
    ("excited", 0.4),
    ("exciting", 0.3),
    ("cheerful", 0.6),
    ("comfortable", 0.4),
    ("positive", 0.2),
    ("recovered", 0.3),
    ("improving", 0.4),
    ("motivated", 0.4),
    ("enjoy", 0.4),
    ("enjoyed", 0.4),
    ("smile", 0.3),
    ("laugh", 0.3),
    // negative
    ("bad", -0.7),
    ("worse", -0.4),
    ("worst", -1.0),
    ("terrible", -1.0),
    ("awful", -1.0),
    ("horrible", -1.0),
    ("sad", -0.5),
    ("sadness", -0.5),
    ("unhappy", -0.6),
    ("miserable", -1.0),
    ("depressed", -0.6),
    ("depressing", -0.6),
    ("depression", -0.5),
    ("hopeless", -0.8),
    ("helpless", -0.6),
    ("worthless", -0.8),
    ("useless", -0.5),
    ("lonely", -0.6),
    ("alone", -0.3),
    ("empty", -0.4),
    ("numb", -0.4),
    ("tired", -0.4),
    ("exhausted", -0.5),
    ("overwhelmed", -0.5),
    ("overwhelming", -0.4),
    ("anxious", -0.5),
    ("anxiety", -0.5),
    ("scared", -0.5),
    ("afraid", -0.6),
    ("fear", -0.5),
    ("panic", -0.6),
    ("worried", -0.4),
    ("stressed", -0.5),
    ("stress", -0.4),
    ("angry", -0.5),
    ("hate", -0.8),
    ("hated", -0.8),
    ("pain", -0.6),
    ("painful", -0.7),
    ("hurt", -0.5),
    ("hurting", -0.6),
    ("cry", -0.4),
    ("crying", -0.5),
    ("broken", -0.4),
    ("lost", -0.3),
    ("suffering", -0.7),
    ("suicidal", -0.9),
    ("die", -0.6),
    ("dead", -0.2),
    ("death", -0.5),
    ("kill", -0.7),
    ("ugly", -0.7),
    ("stupid", -0.8),
    ("failure", -0.5),
    ("failed", -0.5),
    ("wrong", -0.5),
    ("sick", -0.7),
    ("ashamed", -0.6),
    ("guilty", -0.5),
    ("desperate", -0.6),
    ("trapped", -0.5),
    ("struggling", -0.4),
    ("difficult", -0.5),
    ("hard", -0.3),
    ("dark", -0.2),
    ("nightmare", -0.6),
    ("disappointed", -0.75),
    ("upset", -0.5),
    ("poor", -0.4),
    ("weak", -0.4),
];

/// Tokens that flip the polarity of the next scored word within their clause.
const NEGATIONS: &[&str] = &[
    "not", "no", "never", "nothing", "nobody", "nowhere", "neither", "nor", "none", "cannot",
    "without", "dont", "cant", "wont", "isnt", "arent", "wasnt", "werent", "didnt", "doesnt",
    "havent", "hasnt", "hadnt", "shouldnt", "couldnt", "wouldnt", "aint",
];

/// Multipliers applied to the immediately following scored word.
const INTENSIFIERS: &[(&str, f32)] = &[
    ("very", 1.3),
    ("really", 1.3),
    ("so", 1.3),
    ("extremely", 1.5),
    ("incredibly", 1.4),
    ("absolutely", 1.4),
    ("totally", 1.3),
    ("completely", 1.3),
    ("super", 1.3),
    ("too", 1.2),
    ("quite", 1.1),
    ("pretty", 1.1),
    ("slightly", 0.5),
    ("somewhat", 0.7),
    ("barely", 0.5),
    ("little", 0.6),
];

/// Factor applied to a negated word, so "not good" is mildly negative rather
/// than the mirror image of "good".
const NEGATION_FACTOR: f32 = -0.5;
/// Plain words after a negation before its scope lapses.
const NEGATION_SCOPE: usize = 3;

static BUILTIN: Lazy<Arc<HashMap<String, f32>>> = Lazy::new(|| {
    Arc::new(
        LEXICON
            .iter()
            .map(|(word, valence)| ((*word).to_string(), *valence))
            .collect(),
    )
});

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-z0-9]+(?:['\u{2019}][a-z]+)?|[.,;:!?]").expect("valid token regex")
});

#[derive(Debug, Deserialize)]
struct LexiconRow {
    word: String,
    valence: f32,
}

/// Word-valence analyzer with negation and intensifier handling.
#[derive(Debug, Clone)]
pub struct LexiconAnalyzer {
    name: String,
    lexicon: Arc<HashMap<String, f32>>,
}

impl Default for LexiconAnalyzer {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LexiconAnalyzer {
    /// Analyzer over the bundled English lexicon.
    pub fn builtin() -> Self {
        Self {
            name: "builtin-lexicon".to_string(),
            lexicon: Arc::clone(&BUILTIN),
        }
    }

    /// Load a `word,valence` CSV (with header) as the lexicon.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let load_err = |detail: String| {
            ClassifyError::ModelLoad(format!("polarity lexicon {}: {detail}", path.display()))
        };
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| load_err(e.to_string()))?;
        let mut lexicon = HashMap::new();
        for row in reader.deserialize::<LexiconRow>() {
            let row = row.map_err(|e| load_err(e.to_string()))?;
            if !(-1.0..=1.0).contains(&row.valence) {
                return Err(load_err(format!(
                    "valence {} for `{}` outside [-1, 1]",
                    row.valence, row.word
                )));
            }
            lexicon.insert(row.word.to_lowercase(), row.valence);
        }
        if lexicon.is_empty() {
            return Err(load_err("no entries".to_string()));
        }
        Ok(Self {
            name: path.display().to_string(),
            lexicon: Arc::new(lexicon),
        })
    }

    pub fn len(&self) -> usize {
        self.lexicon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexicon.is_empty()
    }
}

impl PolarityAnalyzer for LexiconAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    fn polarity(&self, text: &str) -> f32 {
        let lower = text.to_lowercase();
        let mut assessments = Vec::new();
        let mut negation_left = 0usize;
        let mut modifier = 1.0_f32;

        for token in TOKEN.find_iter(&lower).map(|m| m.as_str()) {
            if token.len() == 1 && token.chars().all(|c| c.is_ascii_punctuation()) {
                negation_left = 0;
                modifier = 1.0;
                continue;
            }
            let bare: String = token.chars().filter(|c| c.is_alphanumeric()).collect();
            let contraction = bare.ends_with("nt") && token.contains(['\'', '\u{2019}']);
            if contraction || NEGATIONS.contains(&bare.as_str()) {
                negation_left = NEGATION_SCOPE;
                modifier = 1.0;
                continue;
            }
            if let Some((_, factor)) = INTENSIFIERS.iter().find(|(word, _)| *word == bare) {
                modifier *= factor;
                continue;
            }
            if let Some(&valence) = self.lexicon.get(token).or_else(|| self.lexicon.get(&bare)) {
                let mut score = valence * modifier;
                if negation_left > 0 {
                    score *= NEGATION_FACTOR;
                }
                assessments.push(score.clamp(-1.0, 1.0));
                negation_left = 0;
            } else {
                negation_left = negation_left.saturating_sub(1);
            }
            modifier = 1.0;
        }

        if assessments.is_empty() {
            return 0.0;
        }
        let mean = assessments.iter().sum::<f32>() / assessments.len() as f32;
        mean.clamp(-1.0, 1.0)
    }
}

/// Maps an analyzer's continuous score onto [`PolarityLabel`].
#[derive(Clone)]
pub struct PolarityClassifier {
    analyzer: Arc<dyn PolarityAnalyzer>,
    thresholds: PolarityThresholds,
}

impl fmt::Debug for PolarityClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolarityClassifier")
            .field("analyzer", &self.analyzer.name())
            .field("thresholds", &self.thresholds)
            .finish()
    }
}

impl PolarityClassifier {
    pub fn new(analyzer: Arc<dyn PolarityAnalyzer>, thresholds: PolarityThresholds) -> Self {
        Self {
            analyzer,
            thresholds,
        }
    }

    /// Continuous score in `[-1, 1]`; blank text scores zero.
    pub fn score(&self, text: &str) -> f32 {
        if text.trim().is_empty() {
            return 0.0;
        }
        self.analyzer.polarity(text).clamp(-1.0, 1.0)
    }

    pub fn label_for(&self, score: f32) -> PolarityLabel {
        if score > self.thresholds.positive {
            PolarityLabel::Positive
        } else if score < self.thresholds.negative {
            PolarityLabel::Negative
        } else {
            PolarityLabel::Neutral
        }
    }

    pub fn classify(&self, text: &str) -> PolarityLabel {
        self.label_for(self.score(text))
    }
}
