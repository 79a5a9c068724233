pub mod models;
pub mod error;
pub mod document_processor;
pub mod chat_service;
pub mod summary_service;
pub mod classifier;
pub mod embedding_service;
pub mod vector_index;
pub mod retrieval_service;
pub mod index_builder;

#[cfg(test)]
mod test_support;

pub use models::*;
pub use error::{EmbedError, IndexError, RetrievalError};
pub use document_processor::{chunk_text, extract, Extraction, FileKind};
pub use chat_service::{ChatModel, OpenAiChat};
pub use summary_service::summarize;
pub use classifier::classify;
pub use embedding_service::{CandleEncoder, CandleLoader, Encoder, EncoderLoader};
pub use vector_index::{IndexEntry, Metric, VectorIndex};
pub use retrieval_service::{Retrieval, Retriever};
pub use index_builder::build_index;
