mod api_error;
mod config;
mod handlers;
mod query_payload;
mod rag_response;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use config::Settings;
use handlers::AppState;
use lexibot_rag::{CandleLoader, OpenAiChat, Retriever};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("invalid CORS origin {origin}"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment variables and logging
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::from_env()?;

    let chat = OpenAiChat::new(
        settings.openai_api_key.clone(),
        settings.openai_model.clone(),
        settings.openai_base_url.clone(),
    );
    log::info!("Chat model: {}", chat.model());

    let retriever = Retriever::new(
        settings.vector_index_path.clone(),
        Arc::new(CandleLoader::new(settings.embedding_model_name.clone())),
    );
    log::info!(
        "Vector index path: {} (loaded on first retrieval)",
        retriever.index_path().display()
    );

    let state = AppState {
        chat: Arc::new(chat),
        retriever: Arc::new(retriever),
        chunk_size: settings.chunk_size,
    };

    let app = handlers::router(state, settings.max_upload_bytes).layer(cors_layer(&settings.cors_origins)?);

    let addr = settings.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    log::info!("LexiBot API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await.context("server shutdown")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_accepts_configured_origins() {
        let origins = vec!["http://localhost:5173".to_string()];
        assert!(cors_layer(&origins).is_ok());
    }

    #[test]
    fn cors_rejects_unencodable_origin() {
        let origins = vec!["http://bad\norigin".to_string()];
        assert!(cors_layer(&origins).is_err());
    }
}
