use crate::api_error::ApiError;
use crate::query_payload::{AskQueryPayload, ClassifyPayload, RetrievePayload};
use crate::rag_response::*;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use lexibot_rag::{ChatModel, Extraction, Retrieval, Retriever};
use std::sync::Arc;

const ASK_SYSTEM_PROMPT: &str = "You are LexiBot, a professional AI legal assistant. Provide clear, concise answers, cite statutes or case names when applicable, and include a short 'notes' section. When unsure, advise user to consult a qualified lawyer.";

const NO_INDEX_NOTE: &str = "No index loaded. Build and save the vector index first.";

#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<dyn ChatModel>,
    pub retriever: Arc<Retriever>,
    pub chunk_size: usize,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/ask-query", post(ask_query))
        .route("/api/summarize", post(summarize))
        .route("/api/classify", post(classify))
        .route("/api/retrieve", post(retrieve))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        index_loaded: state.retriever.is_ready(),
    })
}

async fn ask_query(
    State(state): State<AppState>,
    Json(payload): Json<AskQueryPayload>,
) -> Result<Json<AskQueryResponse>, ApiError> {
    log::info!("ask-query received");
    if payload.query.trim().is_empty() {
        return Err(ApiError::bad_request("Empty query provided"));
    }
    if payload.use_rag.unwrap_or(false) {
        // Retrieved context is not attached to the prompt yet.
        log::debug!("use_rag requested; answering without retrieved context");
    }

    let answer = state.chat.complete(ASK_SYSTEM_PROMPT, &payload.query).await?;

    Ok(Json(AskQueryResponse {
        answer,
        sources: Vec::new(),
    }))
}

async fn summarize(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SummarizeResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;
            upload = Some((filename, bytes));
            break;
        }
    }
    let (filename, bytes) = upload.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
    log::info!("summarize called: {}", filename);

    let text = match lexibot_rag::extract(&filename, bytes.to_vec()).await {
        Extraction::Text(text) => text,
        Extraction::Unsupported(kind) => {
            log::info!("Rejecting unsupported upload {} ({})", filename, kind);
            return Err(ApiError::bad_request("Unsupported file type. Use pdf/txt."));
        }
        Extraction::Failed(reason) => {
            return Err(ApiError::bad_request(format!(
                "No extractable text found in file. {reason}"
            )));
        }
    };

    if text.trim().is_empty() {
        return Err(ApiError::bad_request("No extractable text found in file."));
    }

    let summary = lexibot_rag::summarize(state.chat.as_ref(), &text, state.chunk_size).await?;
    Ok(Json(SummarizeResponse { summary }))
}

async fn classify(
    State(state): State<AppState>,
    Json(payload): Json<ClassifyPayload>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    log::info!("classify called");
    if payload.text.trim().is_empty() {
        return Err(ApiError::bad_request("Empty text provided"));
    }

    let classification = lexibot_rag::classify(state.chat.as_ref(), &payload.text).await;
    Ok(Json(ClassifyResponse {
        category: classification.category,
        confidence: classification.confidence,
    }))
}

async fn retrieve(
    State(state): State<AppState>,
    Json(payload): Json<RetrievePayload>,
) -> Result<Json<RetrieveResponse>, ApiError> {
    log::info!("retrieve called (top_k={})", payload.top_k);
    if payload.query.trim().is_empty() {
        return Err(ApiError::bad_request("Empty query provided"));
    }
    if payload.top_k == 0 {
        return Err(ApiError::bad_request("top_k must be at least 1"));
    }

    let response = match state.retriever.search(&payload.query, payload.top_k).await? {
        Retrieval::Hits(hits) => RetrieveResponse {
            results: hits
                .into_iter()
                .map(|hit| RetrievedSnippet {
                    text: hit.text,
                    score: hit.score,
                })
                .collect(),
            note: None,
        },
        Retrieval::NoIndex => RetrieveResponse {
            results: Vec::new(),
            note: Some(NO_INDEX_NOTE.to_string()),
        },
    };
    Ok(Json(response))
}
