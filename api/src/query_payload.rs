use serde::Deserialize;

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize)]
pub struct AskQueryPayload {
    pub query: String,
    #[serde(default)]
    pub use_rag: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ClassifyPayload {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct RetrievePayload {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}
