//! Shared ML resources: the embedding model and the vector index.
//!
//! Both are loaded once at process startup and treated as read-only for the
//! process lifetime; concurrent readers need no locking.

pub mod embedder;
pub mod index;

use std::sync::{Arc, OnceLock};

use anyhow::{bail, Result};
use tracing::info;

use crate::config::Config;
use crate::ml::embedder::{BertEmbedder, EmbeddingProvider};
use crate::ml::index::FlatIndex;

/// Immutable bundle of ML resources, built once by [`MlContext::initialize`].
pub struct MlContext {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub index: FlatIndex,
}

impl MlContext {
    /// Loads the embedding model and the index artifacts, then cross-checks
    /// their dimensions. A mismatch means the index was built with a
    /// different model version: fatal, never served around.
    pub fn initialize(config: &Config) -> Result<Self> {
        let embedder = BertEmbedder::from_hub(&config.embedding_model_id)?;
        let index = FlatIndex::load(&config.index_path, &config.index_mapping_path)?;

        if embedder.dimension() != index.dimension() {
            bail!(
                "Embedding model '{}' produces {}-dim vectors but the index expects {}-dim. \
                 Rebuild the index with the configured model.",
                embedder.model_id(),
                embedder.dimension(),
                index.dimension()
            );
        }

        info!(
            "ML context initialized: model '{}', {} indexed occupations",
            embedder.model_id(),
            index.len()
        );

        Ok(Self {
            embedder: Arc::new(embedder),
            index,
        })
    }
}

/// Write-once holder for the ML context.
///
/// The startup task sets it exactly once; until then `ready()` is false and
/// handlers surface a retryable not-ready condition instead of failing.
#[derive(Default)]
pub struct MlHandle {
    cell: OnceLock<MlContext>,
}

impl MlHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, context: MlContext) {
        if self.cell.set(context).is_err() {
            // set() is only called from the single startup task
            tracing::warn!("ML context was already initialized; ignoring duplicate set");
        }
    }

    pub fn get(&self) -> Option<&MlContext> {
        self.cell.get()
    }

    /// Idempotent readiness probe.
    pub fn ready(&self) -> bool {
        self.cell.get().is_some()
    }
}

/// Averages a set of unit vectors and re-normalizes the result.
///
/// The mean of unit vectors is not itself unit length, so the query vector
/// must be scaled back before searching. Returns `None` for an empty input
/// or a degenerate (zero-norm) mean.
pub fn average_normalized(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let first = vectors.first()?;
    let dimension = first.len();

    let mut mean = vec![0.0f32; dimension];
    for vector in vectors {
        for (acc, value) in mean.iter_mut().zip(vector) {
            *acc += value;
        }
    }
    let count = vectors.len() as f32;
    for value in &mut mean {
        *value /= count;
    }

    let norm = mean.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return None;
    }
    for value in &mut mean {
        *value /= norm;
    }
    Some(mean)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn test_average_normalized_is_unit_length() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let mean = average_normalized(&vectors).unwrap();
        assert!((norm(&mean) - 1.0).abs() < 1e-6);
        assert!((mean[0] - mean[1]).abs() < 1e-6);
    }

    #[test]
    fn test_average_of_single_vector_is_identity() {
        let vectors = vec![vec![0.6, 0.8]];
        let mean = average_normalized(&vectors).unwrap();
        assert!((mean[0] - 0.6).abs() < 1e-6);
        assert!((mean[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_average_normalized_empty_input() {
        assert!(average_normalized(&[]).is_none());
    }

    #[test]
    fn test_average_normalized_opposing_vectors_degenerate() {
        let vectors = vec![vec![1.0, 0.0], vec![-1.0, 0.0]];
        assert!(average_normalized(&vectors).is_none());
    }
}
