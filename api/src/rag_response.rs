use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AskQueryResponse {
    pub answer: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub category: String,
    pub confidence: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct RetrievedSnippet {
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub results: Vec<RetrievedSnippet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub index_loaded: bool,
}
