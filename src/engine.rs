//! The retrieval engine: one read-only snapshot, four search strategies.
//!
//! [`Engine::open`] is the explicit initialization barrier — it loads the
//! corpus, builds or loads the vector index, and returns a snapshot that is
//! never mutated afterwards. All strategies are pure reads, safe to share
//! across concurrent handlers behind an `Arc` without locking.
//!
//! Strategies:
//! - [`Engine::retrieve`] — semantic nearest-neighbor over display texts
//! - [`Engine::search_similar`] — rank by ingredient-set overlap with a named
//!   cocktail
//! - [`Engine::search_by_ingredients`] — containment filter (AND-semantics)
//! - [`Engine::most_popular`] / [`Engine::rarest`] — ingredient frequency
//!
//! None of these error on a well-formed but unmatched query; "no results" is
//! always an empty sequence, and the caller decides what to tell the user.

use anyhow::{ensure, Result};
use std::collections::{HashMap, HashSet};

use crate::config::{Config, EmbeddingConfig};
use crate::corpus::{CocktailRecord, Corpus};
use crate::embedding;
use crate::index::FlatIndex;

pub struct Engine {
    corpus: Corpus,
    index: FlatIndex,
    embedding: EmbeddingConfig,
}

impl Engine {
    /// Load the corpus and build or load the vector index.
    ///
    /// This is the one-time startup step; it may take a while when the
    /// artifact is absent and every record needs embedding. Queries must not
    /// be accepted before it returns.
    pub async fn open(config: &Config) -> Result<Self> {
        let corpus = Corpus::load(&config.corpus.csv_path)?;
        println!("Loaded corpus: {} cocktails", corpus.len());

        let index =
            FlatIndex::build_or_load(&corpus, &config.embedding, &config.index.artifact_path)
                .await?;

        ensure!(
            index.len() == corpus.len(),
            "Index has {} vectors but corpus has {} records",
            index.len(),
            corpus.len()
        );

        Ok(Self {
            corpus,
            index,
            embedding: config.embedding.clone(),
        })
    }

    /// Snapshot constructor for callers that already hold a corpus and
    /// index (tests, embedded use).
    pub fn from_parts(corpus: Corpus, index: FlatIndex, embedding: EmbeddingConfig) -> Self {
        Self {
            corpus,
            index,
            embedding,
        }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Semantic search: embed the query and return the display texts of the
    /// `k` nearest cocktails by vector distance.
    ///
    /// There is no distance threshold — results are the most similar
    /// available, not "similar enough". Indices at or beyond the corpus
    /// length are dropped rather than trusted.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let vec = embedding::embed_query(&self.embedding, query).await?;
        let hits = self.index.nearest(&vec, k);

        Ok(hits
            .into_iter()
            .filter(|(i, _)| *i < self.corpus.len())
            .map(|(i, _)| self.corpus.records()[i].display_text.clone())
            .collect())
    }

    /// Rank other cocktails by ingredient overlap with the named one.
    ///
    /// An unknown name yields an empty result, not an error — callers are
    /// expected to fall back to [`Engine::retrieve`].
    pub fn search_similar(&self, name: &str, k: usize) -> Vec<String> {
        search_similar(&self.corpus, name, k)
    }

    /// Cocktails whose ingredient list contains every required ingredient.
    pub fn search_by_ingredients(&self, required: &[String], k: usize) -> Vec<String> {
        search_by_ingredients(&self.corpus, required, k)
    }

    /// Occurrence count per lowered ingredient name, in first-encounter
    /// order across the corpus.
    pub fn ingredient_counts(&self) -> Vec<(String, usize)> {
        ingredient_counts(&self.corpus)
    }

    /// The `n` most frequent ingredients. Count ties keep first-encounter
    /// order.
    pub fn most_popular(&self, n: usize) -> Vec<(String, usize)> {
        let mut counts = ingredient_counts(&self.corpus);
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(n);
        counts
    }

    /// The `n` least frequent ingredients. Count ties keep first-encounter
    /// order.
    pub fn rarest(&self, n: usize) -> Vec<(String, usize)> {
        let mut counts = ingredient_counts(&self.corpus);
        counts.sort_by(|a, b| a.1.cmp(&b.1));
        counts.truncate(n);
        counts
    }
}

fn lowered_set(record: &CocktailRecord) -> HashSet<String> {
    record
        .ingredients
        .iter()
        .map(|i| i.to_lowercase())
        .collect()
}

/// Overlap matcher over the record table.
///
/// Scores every other record by the size of its lowered ingredient-set
/// intersection with the target, drops zero scores, and stable-sorts by
/// score descending so equal scores keep corpus order.
pub fn search_similar(corpus: &Corpus, name: &str, k: usize) -> Vec<String> {
    let Some(target_idx) = corpus.find_by_name(name) else {
        return Vec::new();
    };
    let target_set = lowered_set(&corpus.records()[target_idx]);

    let mut scored: Vec<(usize, &CocktailRecord)> = Vec::new();
    for (idx, record) in corpus.records().iter().enumerate() {
        if idx == target_idx {
            continue;
        }
        let common = lowered_set(record).intersection(&target_set).count();
        if common > 0 {
            scored.push((common, record));
        }
    }

    // Stable sort: ties keep encounter order.
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    scored
        .into_iter()
        .take(k)
        .map(|(common, record)| format!("{} (common: {})", record.display_text, common))
        .collect()
}

/// Containment filter: pure AND-semantics, no partial credit, matches in
/// corpus order. An empty requirement set matches every record.
pub fn search_by_ingredients(corpus: &Corpus, required: &[String], k: usize) -> Vec<String> {
    let required: Vec<String> = required.iter().map(|i| i.to_lowercase()).collect();

    corpus
        .records()
        .iter()
        .filter(|record| {
            let have = lowered_set(record);
            required.iter().all(|need| have.contains(need))
        })
        .take(k)
        .map(|record| record.display_text.clone())
        .collect()
}

/// Count every ingredient occurrence across every record, keyed by lowered
/// name. A record listing the same ingredient twice counts twice. The
/// returned pairs are in first-encounter order, which is also the tie-break
/// order for [`Engine::most_popular`] and [`Engine::rarest`].
pub fn ingredient_counts(corpus: &Corpus) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in corpus.records() {
        for ingredient in &record.ingredients {
            let key = ingredient.to_lowercase();
            match positions.get(&key) {
                Some(&pos) => counts[pos].1 += 1,
                None => {
                    positions.insert(key.clone(), counts.len());
                    counts.push((key, 1));
                }
            }
        }
    }

    counts
}
