// Builds the vector index that the API server searches.
//
// Usage: lexibot-index [DOCUMENTS_DIR]

use anyhow::{bail, Context, Result};
use lexibot_rag::embedding_service::DEFAULT_EMBEDDING_MODEL;
use lexibot_rag::index_builder::DEFAULT_INDEX_CHUNK_SIZE;
use lexibot_rag::retrieval_service::DEFAULT_INDEX_PATH;
use lexibot_rag::{build_index, CandleEncoder, Metric};
use std::path::PathBuf;

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_metric(raw: &str) -> Result<Metric> {
    match raw.trim() {
        "l2" => Ok(Metric::L2),
        "inner_product" => Ok(Metric::InnerProduct),
        other => bail!("invalid INDEX_METRIC {other:?}, expected l2 or inner_product"),
    }
}

fn parse_chunk_size(raw: &str) -> Result<usize> {
    let size: usize = raw
        .trim()
        .parse()
        .with_context(|| format!("invalid value for INDEX_CHUNK_SIZE: {raw:?}"))?;
    if size == 0 {
        bail!("INDEX_CHUNK_SIZE must be greater than zero");
    }
    Ok(size)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let documents_dir = PathBuf::from(
        std::env::args()
            .nth(1)
            .or_else(|| env("DOCUMENTS_DIR"))
            .unwrap_or_else(|| "documents".to_string()),
    );
    let index_path = PathBuf::from(env("VECTOR_INDEX_PATH").unwrap_or_else(|| DEFAULT_INDEX_PATH.to_string()));
    let model = env("EMBEDDING_MODEL_NAME").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
    let chunk_size = match env("INDEX_CHUNK_SIZE") {
        Some(raw) => parse_chunk_size(&raw)?,
        None => DEFAULT_INDEX_CHUNK_SIZE,
    };
    let metric = match env("INDEX_METRIC") {
        Some(raw) => parse_metric(&raw)?,
        None => Metric::default(),
    };

    log::info!(
        "Indexing {} into {} ({} chars per snippet, {:?})",
        documents_dir.display(),
        index_path.display(),
        chunk_size,
        metric
    );

    let encoder = CandleEncoder::load(&model).await?;
    let index = build_index(&documents_dir, &encoder, chunk_size, metric).await?;
    if index.is_empty() {
        log::warn!("No text found under {}; the server will report no index", documents_dir.display());
    }

    index
        .save(&index_path)
        .with_context(|| format!("failed to write {}", index_path.display()))?;
    log::info!("Saved {} snippet(s) to {}", index.len(), index_path.display());
    Ok(())
}
