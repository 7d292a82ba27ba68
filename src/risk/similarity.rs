//! Cosine similarity between sentence and exemplar embeddings.

use ndarray::Array2;

use crate::nlp::embeddings::EmbeddingVector;

/// Rows are document sentences, columns are exemplars of one tier.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    cells: Array2<f32>,
}

/// The single best sentence/exemplar pair of a matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestMatch {
    pub row: usize,
    pub col: usize,
    pub similarity: f32,
}

impl SimilarityMatrix {
    pub fn rows(&self) -> usize {
        self.cells.nrows()
    }

    pub fn cols(&self) -> usize {
        self.cells.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        self.cells.get((row, col)).copied()
    }

    /// Highest similarity in the matrix, `None` when it has no cells.
    pub fn max(&self) -> Option<f32> {
        self.best_match().map(|m| m.similarity)
    }

    /// First cell holding the maximum, scanning row-major.
    pub fn best_match(&self) -> Option<BestMatch> {
        self.cells
            .indexed_iter()
            .fold(None, |best: Option<BestMatch>, ((row, col), &similarity)| match best {
                Some(b) if b.similarity >= similarity => Some(b),
                _ => Some(BestMatch {
                    row,
                    col,
                    similarity,
                }),
            })
    }
}

/// Pairwise dot products of unit vectors.
///
/// An empty `sentences` slice yields a matrix with zero rows.
///
/// # Panics
///
/// All vectors on both sides must share one dimension.
pub fn score(sentences: &[EmbeddingVector], references: &[EmbeddingVector]) -> SimilarityMatrix {
    if sentences.is_empty() || references.is_empty() {
        return SimilarityMatrix {
            cells: Array2::zeros((sentences.len(), references.len())),
        };
    }
    let dim = sentences[0].dim();
    let lhs = stack(sentences, dim);
    let rhs = stack(references, dim);
    SimilarityMatrix {
        cells: lhs.dot(&rhs.t()),
    }
}

fn stack(vectors: &[EmbeddingVector], dim: usize) -> Array2<f32> {
    for vector in vectors {
        assert_eq!(
            vector.dim(),
            dim,
            "embedding dimension mismatch: {} vs {dim}",
            vector.dim()
        );
    }
    Array2::from_shape_fn((vectors.len(), dim), |(row, col)| vectors[row].as_slice()[col])
}
