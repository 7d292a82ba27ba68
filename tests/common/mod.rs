#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use post_risk::{
    config::{Exemplars, PolarityThresholds},
    error::{ClassifyError, Result},
    nlp::{
        embeddings::{Embedder, EmbeddingEngine, HashingEmbedder},
        polarity::{LexiconAnalyzer, PolarityClassifier},
    },
    pipeline::{DocumentClassifier, PolaritySource, StopSignal},
    risk::{reference::ReferenceRegistry, RiskClassifier},
};

/// Lookup-table embedder returning exact vectors for known normalised inputs.
///
/// Unknown inputs map to an axis no exemplar uses; any input containing
/// `poison` fails with an encoding error.
pub struct FixedEmbedder {
    table: HashMap<&'static str, [f32; 4]>,
    pub calls: AtomicUsize,
}

impl FixedEmbedder {
    pub fn new() -> Self {
        let table = HashMap::from([
            ("high anchor", [1.0, 0.0, 0.0, 0.0]),
            ("moderate anchor", [0.0, 1.0, 0.0, 0.0]),
            // Cosine with either anchor is exactly 0.5.
            ("exactly half", [0.5, 0.5, 0.5, 0.5]),
            // 0.6 to the high anchor, 0.8 to the moderate anchor.
            ("just over", [0.6, 0.8, 0.0, 0.0]),
            ("moderate only", [0.0, 0.8, 0.6, 0.0]),
            ("calm", [0.0, 0.0, 0.0, 1.0]),
        ]);
        Self {
            table,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for FixedEmbedder {
    fn model_id(&self) -> &str {
        "fixed-4"
    }

    fn dimension(&self) -> usize {
        4
    }

    fn embed(&self, batch: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        batch
            .iter()
            .map(|text| {
                if text.contains("poison") {
                    return Err(ClassifyError::Encoding(format!("cannot encode `{text}`")));
                }
                Ok(self
                    .table
                    .get(text)
                    .copied()
                    .unwrap_or([0.0, 0.0, 1.0, 0.0])
                    .to_vec())
            })
            .collect()
    }
}

/// Embedder whose behaviour is driven by keywords in the input.
///
/// `boom` panics, `fatal` reports a model error and `halt` raises the
/// attached stop signal before encoding normally.
pub struct ScriptedEmbedder {
    stop: StopSignal,
}

impl ScriptedEmbedder {
    pub fn new(stop: StopSignal) -> Self {
        Self { stop }
    }
}

impl Embedder for ScriptedEmbedder {
    fn model_id(&self) -> &str {
        "scripted-4"
    }

    fn dimension(&self) -> usize {
        4
    }

    fn embed(&self, batch: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(batch.len());
        for text in batch {
            if text.contains("boom") {
                panic!("backend crashed on `{text}`");
            }
            if text.contains("fatal") {
                return Err(ClassifyError::ModelLoad("session lost".to_string()));
            }
            if text.contains("halt") {
                self.stop.stop();
            }
            out.push(vec![0.0, 0.0, 1.0, 0.0]);
        }
        Ok(out)
    }
}

pub fn anchor_exemplars() -> Exemplars {
    Exemplars {
        high: vec!["High anchor".into()],
        moderate: vec!["Moderate anchor".into()],
    }
}

pub fn classifier_with(
    backend: Arc<dyn Embedder>,
    exemplars: &Exemplars,
    threshold: f32,
) -> DocumentClassifier {
    let engine = Arc::new(EmbeddingEngine::with_backend(backend, 10_000));
    let registry = Arc::new(ReferenceRegistry::build(&engine, exemplars).expect("exemplars encode"));
    let risk = RiskClassifier::new(engine, registry, threshold);
    let polarity = PolarityClassifier::new(
        Arc::new(LexiconAnalyzer::builtin()),
        PolarityThresholds::default(),
    );
    DocumentClassifier::new(risk, polarity, PolaritySource::Preprocessed)
}

/// Stub-backed classifier plus a handle to inspect backend calls.
pub fn fixed_classifier() -> (DocumentClassifier, Arc<FixedEmbedder>) {
    let backend = Arc::new(FixedEmbedder::new());
    let classifier = classifier_with(backend.clone(), &anchor_exemplars(), 0.5);
    (classifier, backend)
}

/// Classifier over the hashing backend and the default exemplars.
pub fn hashing_classifier() -> DocumentClassifier {
    let backend = Arc::new(HashingEmbedder::new(1024).expect("non-zero dimension"));
    classifier_with(backend, &Exemplars::default(), 0.5)
}
