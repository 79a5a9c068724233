use crate::embedding_service::{Encoder, EncoderLoader};
use crate::error::{IndexError, RetrievalError};
use crate::models::SearchHit;
use crate::vector_index::VectorIndex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

pub const DEFAULT_INDEX_PATH: &str = "vector_index.json";

enum IndexState {
    Ready {
        encoder: Arc<dyn Encoder>,
        index: VectorIndex,
    },
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    Hits(Vec<SearchHit>),
    /// No index file, or an index with no entries.
    NoIndex,
}

/// Nearest-neighbour lookups over the persisted index.
///
/// The encoder and index are loaded on the first search, once per process.
/// Concurrent first searches wait on the same load. A failed load is retried
/// by the next search; a successful one is never repeated.
pub struct Retriever {
    index_path: PathBuf,
    loader: Arc<dyn EncoderLoader>,
    state: OnceCell<IndexState>,
}

impl Retriever {
    pub fn new(index_path: impl Into<PathBuf>, loader: Arc<dyn EncoderLoader>) -> Self {
        Self {
            index_path: index_path.into(),
            loader,
            state: OnceCell::new(),
        }
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// True once a non-empty index and its encoder are loaded.
    pub fn is_ready(&self) -> bool {
        matches!(self.state.get(), Some(IndexState::Ready { .. }))
    }

    async fn state(&self) -> Result<&IndexState, RetrievalError> {
        self.state.get_or_try_init(|| self.load()).await
    }

    async fn load(&self) -> Result<IndexState, RetrievalError> {
        if !tokio::fs::try_exists(&self.index_path).await.unwrap_or(false) {
            log::warn!("Vector index not found at {}", self.index_path.display());
            return Ok(IndexState::Empty);
        }

        let path = self.index_path.clone();
        let index = tokio::task::spawn_blocking(move || VectorIndex::load(&path))
            .await
            .map_err(|e| IndexError::Io(std::io::Error::other(format!("index load task failed: {e}"))))??;

        if index.is_empty() {
            log::warn!("Vector index at {} has no entries", self.index_path.display());
            return Ok(IndexState::Empty);
        }

        log::info!("Loading embedding model...");
        let encoder = self.loader.load().await?;
        if encoder.dimension() != index.dimension() {
            log::warn!(
                "Embedding model produces {} dimensions but the index holds {}; searches will fail",
                encoder.dimension(),
                index.dimension()
            );
        }

        log::info!("Retrieval ready over {} snippet(s)", index.len());
        Ok(IndexState::Ready { encoder, index })
    }

    /// Returns the `k` stored snippets closest to `query`, in the index's
    /// own ranking order.
    pub async fn search(&self, query: &str, k: usize) -> Result<Retrieval, RetrievalError> {
        let (encoder, index) = match self.state().await? {
            IndexState::Ready { encoder, index } => (encoder, index),
            IndexState::Empty => return Ok(Retrieval::NoIndex),
        };

        let embedding = encoder.encode(query).await?;
        let hits = index.search(&embedding, k)?;

        log::info!("Retrieved {} snippet(s) for top_k={}", hits.len(), k);
        Ok(Retrieval::Hits(hits))
    }
}
