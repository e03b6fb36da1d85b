//! Cocktail corpus loading and normalization.
//!
//! Reads the raw CSV into an immutable, ordered table of [`CocktailRecord`]s.
//! Row position is the stable join key with the embedding matrix: row `i` of
//! the corpus corresponds to row `i` of the matrix, always.
//!
//! Normalization rules:
//! - `ingredients` is split on commas with surrounding whitespace stripped,
//!   preserving source order and case, never deduplicating.
//! - `display_text` is `"<name>. Ingredients: <ingredients joined by ', '>"`
//!   and is the text that gets embedded and returned to callers.
//!
//! A malformed or empty corpus is rejected here, at load time — every
//! retrieval strategy downstream assumes a non-empty table.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// One cocktail row after normalization. Immutable after load.
#[derive(Debug, Clone)]
pub struct CocktailRecord {
    pub name: String,
    /// Ingredients in source order, case preserved, duplicates kept.
    pub ingredients: Vec<String>,
    /// Canonical display form; also the embedding input.
    pub display_text: String,
}

impl CocktailRecord {
    pub fn new(name: &str, ingredients_csv: &str) -> Self {
        let ingredients: Vec<String> = ingredients_csv
            .split(',')
            .map(|i| i.trim().to_string())
            .collect();
        let display_text = format!("{}. Ingredients: {}", name, ingredients.join(", "));
        Self {
            name: name.to_string(),
            ingredients,
            display_text,
        }
    }
}

/// The in-memory record table shared read-only by every retrieval strategy.
#[derive(Debug, Clone)]
pub struct Corpus {
    records: Vec<CocktailRecord>,
}

/// Raw CSV row shape. Extra columns in the source file are ignored;
/// a missing `name` or `ingredients` column fails the whole load.
#[derive(Debug, Deserialize)]
struct RawRow {
    name: String,
    ingredients: String,
}

impl Corpus {
    /// Load and normalize the corpus from a CSV file.
    ///
    /// Fails if the file is unreadable, a required column is absent,
    /// or the file contains zero data rows.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open corpus CSV: {}", path.display()))?;

        let mut records = Vec::new();
        for (i, row) in reader.deserialize::<RawRow>().enumerate() {
            let row = row.with_context(|| {
                format!(
                    "Malformed corpus row {} in {} (need `name` and `ingredients` columns)",
                    i + 1,
                    path.display()
                )
            })?;
            records.push(CocktailRecord::new(&row.name, &row.ingredients));
        }

        if records.is_empty() {
            bail!("Corpus is empty: {} has no data rows", path.display());
        }

        Ok(Self { records })
    }

    /// Build a corpus directly from records. Fails on an empty table.
    pub fn from_records(records: Vec<CocktailRecord>) -> Result<Self> {
        if records.is_empty() {
            bail!("Corpus is empty");
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[CocktailRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Case-insensitive exact name lookup. First match wins when the
    /// corpus carries duplicate names.
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        let target = name.trim().to_lowercase();
        self.records
            .iter()
            .position(|r| r.name.to_lowercase() == target)
    }
}
