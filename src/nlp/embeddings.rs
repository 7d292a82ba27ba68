//! Sentence embedding engine.
//!
//! [`Embedder`] is the capability seam: anything that turns a batch of strings
//! into fixed-width vectors. [`EmbeddingEngine`] owns one backend for the
//! lifetime of a run and enforces the contract the classifier relies on
//! (empty-batch short circuit, one vector per input, fixed dimension,
//! unit length).

use std::{sync::Arc, time::Instant};

use tracing::{debug, info, warn};

use super::normalize::normalize;
use crate::{
    config::{Backend, EmbeddingSettings},
    error::{ClassifyError, Result},
};

/// Unit-length embedding. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingVector {
    values: Vec<f32>,
}

impl EmbeddingVector {
    /// L2-normalise `values`. An all-zero vector is kept as is.
    pub fn new(mut values: Vec<f32>) -> Self {
        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            values.iter_mut().for_each(|v| *v /= norm);
        }
        Self { values }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Cosine similarity with another unit vector.
    ///
    /// # Panics
    ///
    /// Comparing vectors of different width is a programming error.
    pub fn dot(&self, other: &Self) -> f32 {
        assert_eq!(
            self.dim(),
            other.dim(),
            "embedding dimension mismatch: {} vs {}",
            self.dim(),
            other.dim()
        );
        self.values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| a * b)
            .sum()
    }
}

/// Trait for embedding backends.
///
/// Implementations must be deterministic for a fixed model and input and must
/// not carry state from one call to the next.
pub trait Embedder: Send + Sync {
    /// Identifier of the loaded model, for logs and outputs.
    fn model_id(&self) -> &str;

    /// Width of every vector this backend returns.
    fn dimension(&self) -> usize;

    /// Encode a non-empty batch, one raw vector per input in input order.
    fn embed(&self, batch: &[&str]) -> Result<Vec<Vec<f32>>>;
}

/// Loaded embedding backend plus the guarantees the classifier expects.
///
/// Cheap to share behind an `Arc`; dropping the last handle releases the model.
pub struct EmbeddingEngine {
    backend: Arc<dyn Embedder>,
    max_input_chars: usize,
}

impl std::fmt::Debug for EmbeddingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingEngine")
            .field("model", &self.backend.model_id())
            .field("dimension", &self.backend.dimension())
            .field("max_input_chars", &self.max_input_chars)
            .finish()
    }
}

impl EmbeddingEngine {
    /// Acquire the configured backend.
    ///
    /// Fails with [`ClassifyError::ModelLoad`] when weights are missing,
    /// incompatible or the backend was not compiled in.
    pub fn load(settings: &EmbeddingSettings) -> Result<Self> {
        let started = Instant::now();
        let backend: Arc<dyn Embedder> = match settings.backend {
            Backend::Hashing => {
                warn!(
                    "hashing backend scores word overlap, not meaning; paraphrased crisis \
                     language can fall below the risk threshold"
                );
                Arc::new(HashingEmbedder::new(settings.hashing_dim)?)
            }
            Backend::Fastembed => load_fastembed(settings)?,
        };
        info!(
            backend = %settings.backend,
            model = backend.model_id(),
            dimension = backend.dimension(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "embedding model loaded"
        );
        Ok(Self {
            backend,
            max_input_chars: settings.max_input_chars,
        })
    }

    /// Wrap an already constructed backend, e.g. a stub in tests.
    pub fn with_backend(backend: Arc<dyn Embedder>, max_input_chars: usize) -> Self {
        Self {
            backend,
            max_input_chars,
        }
    }

    pub fn model_id(&self) -> &str {
        self.backend.model_id()
    }

    pub fn dimension(&self) -> usize {
        self.backend.dimension()
    }

    /// Encode a batch into unit vectors.
    ///
    /// An empty batch returns an empty vector without touching the backend.
    /// Oversized inputs and malformed backend output are reported as
    /// [`ClassifyError::Encoding`].
    pub fn encode(&self, batch: &[&str]) -> Result<Vec<EmbeddingVector>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(oversized) = batch
            .iter()
            .map(|text| text.chars().count())
            .find(|&len| len > self.max_input_chars)
        {
            return Err(ClassifyError::Encoding(format!(
                "input of {oversized} chars exceeds limit of {}",
                self.max_input_chars
            )));
        }

        let started = Instant::now();
        let raw = self.backend.embed(batch)?;
        if raw.len() != batch.len() {
            return Err(ClassifyError::Encoding(format!(
                "backend returned {} embeddings for {} inputs",
                raw.len(),
                batch.len()
            )));
        }
        let expected = self.dimension();
        let vectors = raw
            .into_iter()
            .map(|values| {
                if values.len() != expected {
                    return Err(ClassifyError::Encoding(format!(
                        "backend returned width {} (expected {expected})",
                        values.len()
                    )));
                }
                if values.iter().any(|v| !v.is_finite()) {
                    return Err(ClassifyError::Encoding(
                        "backend returned non-finite values".to_string(),
                    ));
                }
                Ok(EmbeddingVector::new(values))
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(
            inputs = batch.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "encoded batch"
        );
        Ok(vectors)
    }

    /// Release the backend. Equivalent to dropping the last handle.
    pub fn close(self) {
        info!(model = self.backend.model_id(), "embedding model released");
    }
}

#[cfg(feature = "embeddings")]
fn load_fastembed(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    Ok(Arc::new(fastembed_backend::FastEmbedder::load(settings)?))
}

#[cfg(not(feature = "embeddings"))]
fn load_fastembed(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    Err(ClassifyError::ModelLoad(format!(
        "{} requested but post-risk was built without the `embeddings` feature",
        settings.model
    )))
}

#[cfg(feature = "embeddings")]
mod fastembed_backend {
    use std::sync::Mutex;

    use fastembed::{InitOptions, TextEmbedding};

    use super::Embedder;
    use crate::{
        config::EmbeddingSettings,
        error::{ClassifyError, Result},
    };

    /// Sentence-transformer served by fastembed's ONNX runtime.
    pub(super) struct FastEmbedder {
        // Inference needs exclusive access to the session.
        model: Mutex<TextEmbedding>,
        model_id: String,
        dim: usize,
    }

    impl FastEmbedder {
        pub(super) fn load(settings: &EmbeddingSettings) -> Result<Self> {
            let wanted = settings.model.trim();
            let info = TextEmbedding::list_supported_models()
                .into_iter()
                .find(|info| {
                    info.model_code.eq_ignore_ascii_case(wanted)
                        || info
                            .model_code
                            .rsplit('/')
                            .next()
                            .is_some_and(|name| name.eq_ignore_ascii_case(wanted))
                })
                .ok_or_else(|| {
                    ClassifyError::ModelLoad(format!("unsupported embedding model `{wanted}`"))
                })?;
            let model_id = info.model_code.clone();
            let dim = info.dim;
            let options = InitOptions::new(info.model)
                .with_cache_dir(settings.cache_dir.clone())
                .with_show_download_progress(false);
            let model = TextEmbedding::try_new(options)
                .map_err(|e| ClassifyError::ModelLoad(format!("{model_id}: {e}")))?;
            Ok(Self {
                model: Mutex::new(model),
                model_id,
                dim,
            })
        }
    }

    impl Embedder for FastEmbedder {
        fn model_id(&self) -> &str {
            &self.model_id
        }

        fn dimension(&self) -> usize {
            self.dim
        }

        fn embed(&self, batch: &[&str]) -> Result<Vec<Vec<f32>>> {
            #[allow(unused_mut)]
            let mut model = self
                .model
                .lock()
                .map_err(|_| ClassifyError::Encoding("embedding session poisoned".to_string()))?;
            model
                .embed(batch.to_vec(), None)
                .map_err(|e| ClassifyError::Encoding(e.to_string()))
        }
    }
}

/// Signed feature hashing over normalised unigrams and bigrams.
///
/// Needs no weights and is fully deterministic, which makes it the offline
/// fallback and the reference backend for tests. Similarity reflects word
/// overlap rather than meaning.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(ClassifyError::ModelLoad(
                "hashing embedder needs a non-zero dimension".to_string(),
            ));
        }
        Ok(Self {
            dim,
            model_id: format!("hashing-{dim}"),
        })
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let normalized = normalize(text);
        let tokens: Vec<&str> = normalized.split(' ').filter(|t| !t.is_empty()).collect();
        let mut values = vec![0.0_f32; self.dim];
        let bigrams = tokens.windows(2).map(|pair| format!("{} {}", pair[0], pair[1]));
        for feature in tokens.iter().map(|t| (*t).to_string()).chain(bigrams) {
            let hash = fnv1a(feature.as_bytes());
            let slot = (hash % self.dim as u64) as usize;
            let sign = if hash >> 63 == 1 { -1.0 } else { 1.0 };
            values[slot] += sign;
        }
        values
    }
}

impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn embed(&self, batch: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(batch.iter().map(|text| self.embed_one(text)).collect())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, &b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    impl Embedder for CountingEmbedder {
        fn model_id(&self) -> &str {
            "counting"
        }

        fn dimension(&self) -> usize {
            2
        }

        fn embed(&self, batch: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(batch.iter().map(|_| vec![3.0, 4.0]).collect())
        }
    }

    struct ShortEmbedder;

    impl Embedder for ShortEmbedder {
        fn model_id(&self) -> &str {
            "short"
        }

        fn dimension(&self) -> usize {
            3
        }

        fn embed(&self, _batch: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0, 0.0]])
        }
    }

    #[test]
    fn new_vector_is_unit_length() {
        let v = EmbeddingVector::new(vec![3.0, 4.0]);
        assert!((v.as_slice()[0] - 0.6).abs() < 1e-6);
        assert!((v.dot(&v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_is_left_alone() {
        let v = EmbeddingVector::new(vec![0.0, 0.0]);
        assert_eq!(v.as_slice(), &[0.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "dimension mismatch")]
    fn mismatched_dimensions_panic() {
        let a = EmbeddingVector::new(vec![1.0, 0.0]);
        let b = EmbeddingVector::new(vec![1.0, 0.0, 0.0]);
        a.dot(&b);
    }

    #[test]
    fn empty_batch_skips_backend() {
        let backend = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let engine = EmbeddingEngine::with_backend(backend.clone(), 100);
        assert!(engine.encode(&[]).unwrap().is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);

        let out = engine.encode(&["a", "b"]).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn oversized_input_is_an_encoding_error() {
        let backend = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let engine = EmbeddingEngine::with_backend(backend, 4);
        let err = engine.encode(&["way too long"]).unwrap_err();
        assert!(matches!(err, ClassifyError::Encoding(_)));
    }

    #[test]
    fn malformed_backend_output_is_an_encoding_error() {
        let engine = EmbeddingEngine::with_backend(Arc::new(ShortEmbedder), 100);
        assert!(matches!(
            engine.encode(&["a", "b"]),
            Err(ClassifyError::Encoding(_))
        ));
    }

    #[test]
    fn hashing_is_deterministic_and_normalises_input() {
        let embedder = HashingEmbedder::new(256).unwrap();
        let a = embedder.embed_one("I need help!");
        let b = embedder.embed_one("i NEED help");
        assert_eq!(a, b);
    }

    #[test]
    fn hashing_rejects_zero_dimension() {
        assert!(HashingEmbedder::new(0).is_err());
    }

    #[cfg(not(feature = "embeddings"))]
    #[test]
    fn fastembed_without_feature_is_a_load_error() {
        let settings = EmbeddingSettings {
            backend: Backend::Fastembed,
            model: "all-mpnet-base-v2".into(),
            cache_dir: std::env::temp_dir(),
            max_input_chars: 100,
            hashing_dim: 8,
        };
        assert!(matches!(
            EmbeddingEngine::load(&settings),
            Err(ClassifyError::ModelLoad(_))
        ));
    }
}
