use thiserror::Error;

/// Embedding model errors.
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("model loading failed: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Persisted vector index errors.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed index file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("corrupt index entry {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("query vector has {found} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, found: usize },
}

/// Anything that can go wrong while answering a retrieval request.
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error(transparent)]
    Embedding(#[from] EmbedError),

    #[error(transparent)]
    Index(#[from] IndexError),
}
