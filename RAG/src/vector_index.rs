//! Persisted flat similarity index.
//!
//! The file is JSON: a declared dimension, a metric, and a list of entries
//! where each vector travels with its own id and source text.
//!
//! Score conventions follow the metric and are returned unchanged:
//! - [`Metric::L2`]: squared Euclidean distance, ascending (lower is closer).
//! - [`Metric::InnerProduct`]: dot product, descending (higher is closer).

use crate::error::IndexError;
use crate::models::SearchHit;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    L2,
    InnerProduct,
}

impl Metric {
    fn score(self, query: &[f32], vector: &[f32]) -> f32 {
        match self {
            Metric::L2 => query
                .iter()
                .zip(vector)
                .map(|(a, b)| (a - b) * (a - b))
                .sum(),
            Metric::InnerProduct => query.iter().zip(vector).map(|(a, b)| a * b).sum(),
        }
    }

    /// Orders two scores so the closer one comes first.
    fn rank(self, a: f32, b: f32) -> Ordering {
        let ord = a.total_cmp(&b);
        match self {
            Metric::L2 => ord,
            Metric::InnerProduct => ord.reverse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub text: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    dimension: usize,
    #[serde(default)]
    metric: Metric,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new(dimension: usize, metric: Metric) -> Self {
        Self {
            dimension,
            metric,
            entries: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add(&mut self, entry: IndexEntry) -> Result<(), IndexError> {
        self.check_entry(&entry)?;
        self.entries.push(entry);
        Ok(())
    }

    fn check_entry(&self, entry: &IndexEntry) -> Result<(), IndexError> {
        if entry.vector.len() != self.dimension {
            return Err(IndexError::Corrupt {
                id: entry.id.clone(),
                reason: format!(
                    "vector has {} dimensions, index declares {}",
                    entry.vector.len(),
                    self.dimension
                ),
            });
        }
        // Out-of-range numbers in the file parse to infinity.
        if let Some(pos) = entry.vector.iter().position(|v| !v.is_finite()) {
            return Err(IndexError::Corrupt {
                id: entry.id.clone(),
                reason: format!("component {pos} is not finite"),
            });
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let raw = std::fs::read_to_string(path)?;
        let index: VectorIndex = serde_json::from_str(&raw)?;
        for entry in &index.entries {
            index.check_entry(entry)?;
        }
        log::info!(
            "Loaded vector index from {} ({} entries, {} dimensions, {:?})",
            path.display(),
            index.len(),
            index.dimension,
            index.metric
        );
        Ok(index)
    }

    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let raw = serde_json::to_string(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Exact nearest-neighbour scan. Returns at most `k` hits, closest first;
    /// equal scores keep file order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                found: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| (pos, self.metric.score(query, &entry.vector)))
            .collect();

        scored.sort_by(|a, b| self.metric.rank(a.1, b.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(pos, score)| {
                let entry = &self.entries[pos];
                SearchHit {
                    id: entry.id.clone(),
                    text: entry.text.clone(),
                    score,
                }
            })
            .collect())
    }
}
