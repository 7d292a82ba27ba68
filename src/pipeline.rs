//! Batch orchestration: one polarity label and one risk tier per document.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    data::posts::Document,
    error::Result,
    nlp::polarity::{PolarityClassifier, PolarityLabel},
    risk::{RiskAssessment, RiskClassifier, RiskTier},
};

/// Documents between two progress log lines.
const PROGRESS_EVERY: usize = 100;

/// Text the polarity classifier reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PolaritySource {
    /// The raw title and body.
    Raw,
    /// Upstream cleaned text, falling back to raw text when absent.
    #[default]
    Preprocessed,
}

/// Per-document labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub sentiment: PolarityLabel,
    pub risk_level: RiskTier,
    pub polarity: f32,
    pub assessment: RiskAssessment,
}

/// Polarity and risk classification of a single document.
#[derive(Debug, Clone)]
pub struct DocumentClassifier {
    risk: RiskClassifier,
    polarity: PolarityClassifier,
    polarity_source: PolaritySource,
}

impl DocumentClassifier {
    pub fn new(
        risk: RiskClassifier,
        polarity: PolarityClassifier,
        polarity_source: PolaritySource,
    ) -> Self {
        Self {
            risk,
            polarity,
            polarity_source,
        }
    }

    pub fn risk(&self) -> &RiskClassifier {
        &self.risk
    }

    /// Classify free text, using it for both signals.
    pub fn classify_text(&self, text: &str) -> Result<ClassificationResult> {
        self.assemble(text, text)
    }

    pub fn classify(&self, document: &Document) -> Result<ClassificationResult> {
        let polarity_text = match self.polarity_source {
            PolaritySource::Raw => document.text.as_str(),
            PolaritySource::Preprocessed => document.preprocessed().unwrap_or(&document.text),
        };
        self.assemble(&document.text, polarity_text)
    }

    /// Release the embedding model if this was its last user.
    pub fn close(self) {
        match Arc::try_unwrap(self.risk.into_engine()) {
            Ok(engine) => engine.close(),
            Err(shared) => debug!(
                handles = Arc::strong_count(&shared) - 1,
                "embedding model still in use elsewhere; released on last drop"
            ),
        }
    }

    fn assemble(&self, risk_text: &str, polarity_text: &str) -> Result<ClassificationResult> {
        let polarity = self.polarity.score(polarity_text);
        let assessment = self.risk.assess(risk_text)?;
        Ok(ClassificationResult {
            sentiment: self.polarity.label_for(polarity),
            risk_level: assessment.tier,
            polarity,
            assessment,
        })
    }
}

/// What happened to one input document.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Classified(ClassificationResult),
    /// Classification failed; the message says why.
    Failed(String),
    /// Never submitted because the run was stopped.
    Skipped,
}

impl Outcome {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Classified(_) => "ok",
            Self::Failed(_) => "failed",
            Self::Skipped => "skipped",
        }
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        match self {
            Self::Classified(result) => Some(result),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub document: Arc<Document>,
    pub outcome: Outcome,
}

/// Cooperative stop flag: once raised, no further documents are submitted.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Totals of a batch run. `total == classified + failed + skipped`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub model: String,
    pub threshold: f32,
    pub total: usize,
    pub classified: usize,
    pub failed: usize,
    pub skipped: usize,
    pub risk_levels: IndexMap<RiskTier, usize>,
    pub sentiments: IndexMap<PolarityLabel, usize>,
}

impl RunSummary {
    fn tally(
        outcomes: &[DocumentOutcome],
        started_at: DateTime<Utc>,
        model: String,
        threshold: f32,
    ) -> Self {
        let mut risk_levels: IndexMap<RiskTier, usize> =
            RiskTier::ALL.iter().map(|tier| (*tier, 0)).collect();
        let mut sentiments: IndexMap<PolarityLabel, usize> = [
            PolarityLabel::Positive,
            PolarityLabel::Neutral,
            PolarityLabel::Negative,
        ]
        .into_iter()
        .map(|label| (label, 0))
        .collect();
        let (mut classified, mut failed, mut skipped) = (0, 0, 0);

        for outcome in outcomes {
            match &outcome.outcome {
                Outcome::Classified(result) => {
                    classified += 1;
                    *risk_levels.entry(result.risk_level).or_default() += 1;
                    *sentiments.entry(result.sentiment).or_default() += 1;
                }
                Outcome::Failed(_) => failed += 1,
                Outcome::Skipped => skipped += 1,
            }
        }

        Self {
            started_at,
            finished_at: Utc::now(),
            model,
            threshold,
            total: outcomes.len(),
            classified,
            failed,
            skipped,
            risk_levels,
            sentiments,
        }
    }

    /// Every input document is accounted for exactly once.
    pub fn is_reconciled(&self) -> bool {
        self.total == self.classified + self.failed + self.skipped
    }
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    /// One entry per input document, in input order.
    pub outcomes: Vec<DocumentOutcome>,
    pub summary: RunSummary,
}

/// Classifies batches of documents on blocking worker threads.
#[derive(Debug, Clone)]
pub struct Pipeline {
    classifier: Arc<DocumentClassifier>,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(classifier: Arc<DocumentClassifier>, concurrency: usize) -> Self {
        Self {
            classifier,
            concurrency: concurrency.max(1),
        }
    }

    pub fn classifier(&self) -> &DocumentClassifier {
        &self.classifier
    }

    /// Classify every document.
    pub async fn run(&self, documents: Vec<Document>) -> BatchReport {
        self.run_until(documents, &StopSignal::new()).await
    }

    /// Classify documents until `stop` is raised.
    ///
    /// Documents already submitted run to completion; the rest are reported as
    /// [`Outcome::Skipped`]. An encoding failure or worker panic only fails its
    /// own document. Any other error means the backend itself is unusable, so
    /// it also raises `stop`.
    pub async fn run_until(&self, documents: Vec<Document>, stop: &StopSignal) -> BatchReport {
        let started_at = Utc::now();
        let total = documents.len();
        info!(documents = total, concurrency = self.concurrency, "classifying batch");

        let outcomes: Vec<DocumentOutcome> = stream::iter(documents.into_iter().map(Arc::new))
            .map(|document| {
                let submit = !stop.is_stopped();
                let classifier = Arc::clone(&self.classifier);
                let stop = stop.clone();
                async move {
                    let outcome = if submit {
                        classify_blocking(classifier, Arc::clone(&document), &stop).await
                    } else {
                        Outcome::Skipped
                    };
                    DocumentOutcome { document, outcome }
                }
            })
            .buffered(self.concurrency)
            .enumerate()
            .map(|(idx, outcome)| {
                let done = idx + 1;
                if done % PROGRESS_EVERY == 0 || done == total {
                    info!(done, total, "classification progress");
                }
                outcome
            })
            .collect()
            .await;

        let risk = self.classifier.risk();
        let summary = RunSummary::tally(
            &outcomes,
            started_at,
            risk.engine().model_id().to_string(),
            risk.threshold(),
        );
        if summary.skipped > 0 {
            warn!(skipped = summary.skipped, "run stopped before every document was submitted");
        }
        info!(
            total = summary.total,
            classified = summary.classified,
            failed = summary.failed,
            skipped = summary.skipped,
            "batch finished"
        );
        BatchReport { outcomes, summary }
    }
}

async fn classify_blocking(
    classifier: Arc<DocumentClassifier>,
    document: Arc<Document>,
    stop: &StopSignal,
) -> Outcome {
    let id = document.id.clone();
    let task = tokio::task::spawn_blocking(move || classifier.classify(&document));
    match task.await {
        Ok(Ok(result)) => Outcome::Classified(result),
        Ok(Err(err)) if err.is_per_document() => {
            warn!(post_id = %id, error = %err, "document classification failed");
            Outcome::Failed(err.to_string())
        }
        Ok(Err(err)) => {
            error!(post_id = %id, error = %err, "classifier unusable; stopping submission");
            stop.stop();
            Outcome::Failed(err.to_string())
        }
        Err(join_err) => {
            warn!(post_id = %id, error = %join_err, "classification worker aborted");
            Outcome::Failed(format!("worker aborted: {join_err}"))
        }
    }
}
