//! Builds the persisted vector index from a folder of documents.

use crate::document_processor::{chunk_text, extract, Extraction};
use crate::embedding_service::Encoder;
use crate::vector_index::{IndexEntry, Metric, VectorIndex};
use anyhow::{Context, Result};
use std::path::Path;

/// Characters per indexed snippet. Kept well under the encoder's token window.
pub const DEFAULT_INDEX_CHUNK_SIZE: usize = 1000;

/// Extracts, chunks and embeds every readable file directly under `dir`.
///
/// Files are visited in name order. Unsupported or unreadable documents are
/// logged and skipped; an embedding failure aborts the build. Snippet ids are
/// `"{filename}#{n}"`.
pub async fn build_index(
    dir: &Path,
    encoder: &dyn Encoder,
    chunk_size: usize,
    metric: Metric,
) -> Result<VectorIndex> {
    let mut paths = Vec::new();
    let mut listing = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to read documents directory {}", dir.display()))?;
    while let Some(entry) = listing.next_entry().await? {
        if entry.file_type().await?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    let mut index = VectorIndex::new(encoder.dimension(), metric);
    let mut files = 0;

    for path in paths {
        let Some(filename) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;

        let text = match extract(&filename, bytes).await {
            Extraction::Text(text) => text,
            Extraction::Unsupported(kind) => {
                log::warn!("Skipping {} (unsupported {} file)", filename, kind);
                continue;
            }
            Extraction::Failed(reason) => {
                log::warn!("Skipping {}: {}", filename, reason);
                continue;
            }
        };

        let mut added = 0;
        for chunk in chunk_text(&text, chunk_size) {
            let snippet = chunk.trim();
            if snippet.is_empty() {
                continue;
            }
            let vector = encoder
                .encode(snippet)
                .await
                .with_context(|| format!("failed to embed a snippet of {filename}"))?;
            index.add(IndexEntry {
                id: format!("{filename}#{added}"),
                text: snippet.to_string(),
                vector,
            })?;
            added += 1;
        }

        log::info!("Indexed {} snippet(s) from {}", added, filename);
        files += 1;
    }

    log::info!("Built index of {} snippet(s) from {} file(s)", index.len(), files);
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding_service::EncoderLoader;
    use crate::error::EmbedError;
    use crate::retrieval_service::{Retrieval, Retriever};
    use async_trait::async_trait;
    use std::sync::Arc;

    const KEYWORDS: [&str; 3] = ["rent", "terminate", "witness"];

    /// One dimension per keyword, holding its occurrence count.
    struct KeywordEncoder;

    #[async_trait]
    impl Encoder for KeywordEncoder {
        fn dimension(&self) -> usize {
            KEYWORDS.len()
        }

        async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
            let lower = text.to_lowercase();
            Ok(KEYWORDS
                .iter()
                .map(|k| lower.matches(k).count() as f32)
                .collect())
        }
    }

    struct KeywordLoader;

    #[async_trait]
    impl EncoderLoader for KeywordLoader {
        async fn load(&self) -> Result<Arc<dyn Encoder>, EmbedError> {
            Ok(Arc::new(KeywordEncoder))
        }
    }

    fn write_corpus(dir: &Path) {
        std::fs::write(
            dir.join("lease.txt"),
            "The Tenant shall pay rent on the first day of each month. Late rent accrues interest.",
        )
        .unwrap();
        std::fs::write(
            dir.join("exit.txt"),
            "Either party may terminate this agreement with thirty days notice.",
        )
        .unwrap();
        std::fs::write(dir.join("notes.docx"), b"PK\x03\x04").unwrap();
        std::fs::write(dir.join("broken.pdf"), b"%PDF-1.7 not really a pdf").unwrap();
        std::fs::create_dir(dir.join("archive")).unwrap();
    }

    #[tokio::test]
    async fn skips_unreadable_files_and_indexes_the_rest() {
        let docs = tempfile::tempdir().unwrap();
        write_corpus(docs.path());

        let index = build_index(docs.path(), &KeywordEncoder, DEFAULT_INDEX_CHUNK_SIZE, Metric::InnerProduct)
            .await
            .unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.dimension(), 3);
        assert_eq!(index.metric(), Metric::InnerProduct);
    }

    #[tokio::test]
    async fn built_index_round_trips_through_retriever() {
        let docs = tempfile::tempdir().unwrap();
        write_corpus(docs.path());
        let out = tempfile::tempdir().unwrap();
        let path = out.path().join("vector_index.json");

        build_index(docs.path(), &KeywordEncoder, DEFAULT_INDEX_CHUNK_SIZE, Metric::InnerProduct)
            .await
            .unwrap()
            .save(&path)
            .unwrap();

        let retriever = Retriever::new(path.clone(), Arc::new(KeywordLoader));
        let Retrieval::Hits(hits) = retriever.search("rent", 1).await.unwrap() else {
            panic!("expected hits");
        };
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "lease.txt#0");
        assert!(hits[0].text.starts_with("The Tenant shall pay rent"));
        assert_eq!(hits[0].score, 2.0);

        let Retrieval::Hits(hits) = retriever.search("terminate", 5).await.unwrap() else {
            panic!("expected hits");
        };
        assert_eq!(hits[0].id, "exit.txt#0");
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn long_documents_become_numbered_snippets() {
        let docs = tempfile::tempdir().unwrap();
        std::fs::write(docs.path().join("deed.txt"), "witness ".repeat(30)).unwrap();

        let index = build_index(docs.path(), &KeywordEncoder, 100, Metric::L2)
            .await
            .unwrap();
        let out = tempfile::tempdir().unwrap();
        let path = out.path().join("index.json");
        index.save(&path).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let ids: Vec<&str> = raw["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["deed.txt#0", "deed.txt#1", "deed.txt#2"]);
    }

    #[tokio::test]
    async fn empty_folder_builds_an_empty_index() {
        let docs = tempfile::tempdir().unwrap();
        let index = build_index(docs.path(), &KeywordEncoder, 100, Metric::L2)
            .await
            .unwrap();
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn missing_folder_is_an_error() {
        let docs = tempfile::tempdir().unwrap();
        let err = build_index(&docs.path().join("absent"), &KeywordEncoder, 100, Metric::L2)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("documents directory"));
    }
}
