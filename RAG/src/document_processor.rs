use std::fmt;

/// Default chunk size for summarization, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Docx,
    Text,
    Unknown,
}

impl FileKind {
    pub fn from_filename(filename: &str) -> Self {
        let lower = filename.to_lowercase();
        if lower.ends_with(".pdf") {
            FileKind::Pdf
        } else if lower.ends_with(".docx") {
            FileKind::Docx
        } else if lower.ends_with(".txt") {
            FileKind::Text
        } else {
            FileKind::Unknown
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileKind::Pdf => "pdf",
            FileKind::Docx => "docx",
            FileKind::Text => "txt",
            FileKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Outcome of pulling plain text out of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Text(String),
    Unsupported(FileKind),
    Failed(String),
}

/// Best-effort plain text extraction. Never panics outward: parser failures
/// (including panics inside the PDF parser) come back as `Failed`.
pub async fn extract(filename: &str, bytes: Vec<u8>) -> Extraction {
    let kind = FileKind::from_filename(filename);
    match kind {
        FileKind::Pdf => extract_pdf(filename, bytes).await,
        FileKind::Text => Extraction::Text(decode_text(&bytes)),
        // No DOCX decoder is wired up.
        FileKind::Docx | FileKind::Unknown => Extraction::Unsupported(kind),
    }
}

async fn extract_pdf(filename: &str, bytes: Vec<u8>) -> Extraction {
    log::info!("Extracting PDF: {} ({} bytes)", filename, bytes.len());

    let result = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await;

    match result {
        Ok(Ok(text)) => Extraction::Text(text),
        Ok(Err(e)) => {
            log::warn!("PDF extraction failed for {}: {}", filename, e);
            Extraction::Failed(format!("Error extracting text: {e}"))
        }
        Err(e) => {
            log::warn!("PDF parser aborted for {}: {}", filename, e);
            Extraction::Failed(format!("Error extracting text: parser aborted ({e})"))
        }
    }
}

/// UTF-8 decode that drops undecodable byte sequences.
pub fn decode_text(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

/// Splits `text` into consecutive, non-overlapping windows of at most
/// `max_chars` characters. Concatenating the result yields `text`.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::with_capacity(text.len() / max_chars + 1);
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == max_chars {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }

    chunks
}
