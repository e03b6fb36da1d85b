//! Flat nearest-neighbor index with a persisted on-disk artifact.
//!
//! The index is an exact brute-force scan: every query computes squared
//! Euclidean distance against every corpus vector, O(N·D) per lookup. The
//! corpus is a few thousand rows, so exactness is cheaper than maintaining an
//! approximate structure.
//!
//! The artifact is a pair of co-located files derived from one base path:
//! - `<base>.json` — header: format version, row count, dims, model name
//! - `<base>.vec`  — the raw embedding matrix, rows concatenated as
//!   little-endian `f32` bytes ([`vec_to_blob`] format)
//!
//! [`FlatIndex::build_or_load`] loads the pair when it is present and
//! consistent with the current corpus, and silently rebuilds otherwise.
//! A header whose row count, dims, or model disagree with the current corpus
//! and provider marks a stale artifact — it is treated as absent, never used.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::EmbeddingConfig;
use crate::corpus::Corpus;
use crate::embedding::{self, blob_to_vec, create_provider, vec_to_blob};

const ARTIFACT_VERSION: u32 = 1;

/// Persisted artifact header, stored next to the matrix blob.
#[derive(Debug, Serialize, Deserialize)]
struct ArtifactHeader {
    version: u32,
    rows: usize,
    dims: usize,
    model: String,
}

/// Exact brute-force L2 index over the corpus embedding matrix.
///
/// Row `i` of the matrix corresponds to corpus position `i`. Read-only after
/// construction.
pub struct FlatIndex {
    dims: usize,
    model: String,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Load the persisted artifact if it matches the corpus, or embed the
    /// whole corpus and persist a fresh artifact.
    ///
    /// Embedding is the expensive step, so a consistent artifact is always
    /// preferred. A stale or incomplete artifact triggers a rebuild; it is
    /// never surfaced to callers as an error.
    pub async fn build_or_load(
        corpus: &Corpus,
        config: &EmbeddingConfig,
        artifact_base: &Path,
    ) -> Result<Self> {
        let provider = create_provider(config)?;
        let dims = provider.dims();
        let model = provider.model_name().to_string();

        if let Some(index) = Self::load_artifact(artifact_base, corpus.len(), dims, &model)? {
            println!(
                "Loaded persisted index: {} vectors ({} dims, model {})",
                index.len(),
                dims,
                model
            );
            return Ok(index);
        }

        println!(
            "Embedding {} cocktails with model {}...",
            corpus.len(),
            model
        );

        let texts: Vec<String> = corpus
            .records()
            .iter()
            .map(|r| r.display_text.clone())
            .collect();

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(config.batch_size) {
            let mut embedded = embedding::embed_texts(config, batch).await?;
            vectors.append(&mut embedded);
        }

        let index = Self {
            dims,
            model,
            vectors,
        };
        index.persist(artifact_base)?;
        println!("Index built and persisted ({} vectors)", index.len());

        Ok(index)
    }

    /// Construct directly from an embedding matrix. Used by the loader and
    /// by in-process tests.
    pub fn from_vectors(vectors: Vec<Vec<f32>>, dims: usize, model: &str) -> Self {
        Self {
            dims,
            model: model.to_string(),
            vectors,
        }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Return the `k` nearest corpus positions to `query`, as
    /// `(corpus_index, squared L2 distance)` pairs in ascending distance
    /// order. Floating-point distance ties break by ascending corpus index,
    /// so results are stable across runs.
    ///
    /// A query of the wrong dimensionality returns no results.
    pub fn nearest(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if k == 0 || query.len() != self.dims {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let dist: f32 = v
                    .iter()
                    .zip(query.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                (i, dist)
            })
            .collect();

        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        scored
    }

    /// Write the artifact pair, creating parent directories as needed.
    pub fn persist(&self, artifact_base: &Path) -> Result<()> {
        let (header_path, matrix_path) = artifact_paths(artifact_base);

        if let Some(parent) = header_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create artifact directory: {}", parent.display())
            })?;
        }

        let header = ArtifactHeader {
            version: ARTIFACT_VERSION,
            rows: self.vectors.len(),
            dims: self.dims,
            model: self.model.clone(),
        };
        let header_json = serde_json::to_string_pretty(&header)?;
        std::fs::write(&header_path, header_json)
            .with_context(|| format!("Failed to write {}", header_path.display()))?;

        let mut blob = Vec::with_capacity(self.vectors.len() * self.dims * 4);
        for v in &self.vectors {
            blob.extend_from_slice(&vec_to_blob(v));
        }
        std::fs::write(&matrix_path, blob)
            .with_context(|| format!("Failed to write {}", matrix_path.display()))?;

        Ok(())
    }

    /// Try to load a persisted artifact consistent with the current corpus
    /// size, dims, and model. Any inconsistency — missing files, version or
    /// row-count mismatch, truncated matrix — yields `None` (rebuild), not
    /// an error.
    fn load_artifact(
        artifact_base: &Path,
        expected_rows: usize,
        expected_dims: usize,
        expected_model: &str,
    ) -> Result<Option<Self>> {
        let (header_path, matrix_path) = artifact_paths(artifact_base);

        if !header_path.exists() || !matrix_path.exists() {
            return Ok(None);
        }

        let header_json = std::fs::read_to_string(&header_path)
            .with_context(|| format!("Failed to read {}", header_path.display()))?;
        let header: ArtifactHeader = match serde_json::from_str(&header_json) {
            Ok(h) => h,
            Err(_) => return Ok(None),
        };

        if header.version != ARTIFACT_VERSION
            || header.rows != expected_rows
            || header.dims != expected_dims
            || header.model != expected_model
        {
            return Ok(None);
        }

        let blob = std::fs::read(&matrix_path)
            .with_context(|| format!("Failed to read {}", matrix_path.display()))?;
        if blob.len() != header.rows * header.dims * 4 {
            return Ok(None);
        }

        let vectors: Vec<Vec<f32>> = blob
            .chunks_exact(header.dims * 4)
            .map(blob_to_vec)
            .collect();

        Ok(Some(Self {
            dims: header.dims,
            model: header.model,
            vectors,
        }))
    }
}

/// Derive the co-located artifact file pair from one base path.
fn artifact_paths(base: &Path) -> (PathBuf, PathBuf) {
    let mut header = base.as_os_str().to_owned();
    header.push(".json");
    let mut matrix = base.as_os_str().to_owned();
    matrix.push(".vec");
    (PathBuf::from(header), PathBuf::from(matrix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CocktailRecord;

    fn test_corpus() -> Corpus {
        Corpus::from_records(vec![
            CocktailRecord::new("Daiquiri", "Rum, Lime Juice, Sugar"),
            CocktailRecord::new("Mojito", "Rum, Lime Juice, Sugar, Mint, Soda"),
            CocktailRecord::new("Negroni", "Gin, Campari, Sweet Vermouth"),
        ])
        .unwrap()
    }

    #[test]
    fn test_nearest_ascending_distance() {
        let index = FlatIndex::from_vectors(
            vec![vec![0.0, 3.0], vec![1.0, 0.0], vec![0.0, 2.0]],
            2,
            "test",
        );
        let hits = index.nearest(&[0.0, 0.0], 3);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].0, 1);
        assert_eq!(hits[1].0, 2);
        assert_eq!(hits[2].0, 0);
        assert!(hits[0].1 <= hits[1].1 && hits[1].1 <= hits[2].1);
    }

    #[test]
    fn test_nearest_ties_break_by_index() {
        let index = FlatIndex::from_vectors(
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0]],
            2,
            "test",
        );
        // All three are distance 1 from the origin.
        let hits = index.nearest(&[0.0, 0.0], 3);
        let order: Vec<usize> = hits.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_nearest_k_larger_than_corpus() {
        let index = FlatIndex::from_vectors(vec![vec![0.0], vec![1.0]], 1, "test");
        assert_eq!(index.nearest(&[0.0], 10).len(), 2);
    }

    #[test]
    fn test_nearest_zero_k_and_bad_dims() {
        let index = FlatIndex::from_vectors(vec![vec![0.0, 0.0]], 2, "test");
        assert!(index.nearest(&[0.0, 0.0], 0).is_empty());
        assert!(index.nearest(&[0.0], 3).is_empty());
    }

    #[tokio::test]
    async fn test_build_persist_load_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let base = tmp.path().join("vectorstore").join("cocktails");
        let corpus = test_corpus();
        let cfg = EmbeddingConfig::default();

        let built = FlatIndex::build_or_load(&corpus, &cfg, &base).await.unwrap();
        assert_eq!(built.len(), 3);
        assert!(tmp.path().join("vectorstore").join("cocktails.json").exists());
        assert!(tmp.path().join("vectorstore").join("cocktails.vec").exists());

        // Second call must load the artifact, and yield identical neighbors.
        let loaded = FlatIndex::build_or_load(&corpus, &cfg, &base).await.unwrap();
        let q = crate::embedding::hashed_embedding("rum and lime", built.dims());
        assert_eq!(built.nearest(&q, 3), loaded.nearest(&q, 3));
    }

    #[tokio::test]
    async fn test_stale_artifact_triggers_rebuild() {
        let tmp = tempfile::TempDir::new().unwrap();
        let base = tmp.path().join("cocktails");
        let cfg = EmbeddingConfig::default();

        let small = Corpus::from_records(vec![CocktailRecord::new("Daiquiri", "Rum")]).unwrap();
        let index = FlatIndex::build_or_load(&small, &cfg, &base).await.unwrap();
        assert_eq!(index.len(), 1);

        // The corpus grew; the persisted pair no longer matches and must be
        // rebuilt rather than silently used.
        let grown = test_corpus();
        let rebuilt = FlatIndex::build_or_load(&grown, &cfg, &base).await.unwrap();
        assert_eq!(rebuilt.len(), 3);
    }

    #[tokio::test]
    async fn test_truncated_matrix_treated_as_absent() {
        let tmp = tempfile::TempDir::new().unwrap();
        let base = tmp.path().join("cocktails");
        let cfg = EmbeddingConfig::default();
        let corpus = test_corpus();

        FlatIndex::build_or_load(&corpus, &cfg, &base).await.unwrap();

        let matrix_path = tmp.path().join("cocktails.vec");
        let blob = std::fs::read(&matrix_path).unwrap();
        std::fs::write(&matrix_path, &blob[..blob.len() / 2]).unwrap();

        let rebuilt = FlatIndex::build_or_load(&corpus, &cfg, &base).await.unwrap();
        assert_eq!(rebuilt.len(), 3);
    }
}
