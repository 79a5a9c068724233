use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::new();
    let base_url = std::env::var("LEXIBOT_URL").unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());

    println!("🔍 Testing LexiBot API at {}", base_url);

    println!("\n📋 Health Check:");
    let health_response = client.get(format!("{}/health", base_url)).send().await?;
    println!("Status: {}", health_response.status());
    let health_json: serde_json::Value = health_response.json().await?;
    println!("Response: {}", serde_json::to_string_pretty(&health_json)?);

    println!("\n💬 Ask Query:");
    let ask_response = client
        .post(format!("{}/api/ask-query", base_url))
        .json(&json!({ "query": "What makes a contract voidable?" }))
        .send()
        .await?;
    println!("Status: {}", ask_response.status());
    let ask_json: serde_json::Value = ask_response.json().await?;
    println!("Response: {}", serde_json::to_string_pretty(&ask_json)?);

    println!("\n🏷️  Classify:");
    let classify_response = client
        .post(format!("{}/api/classify", base_url))
        .json(&json!({ "text": "The petitioner respectfully prays that this Court grant relief." }))
        .send()
        .await?;
    println!("Status: {}", classify_response.status());
    let classify_json: serde_json::Value = classify_response.json().await?;
    println!("Response: {}", serde_json::to_string_pretty(&classify_json)?);

    println!("\n📚 Retrieve:");
    let retrieve_response = client
        .post(format!("{}/api/retrieve", base_url))
        .json(&json!({ "query": "termination for convenience", "top_k": 3 }))
        .send()
        .await?;
    println!("Status: {}", retrieve_response.status());
    let retrieve_json: serde_json::Value = retrieve_response.json().await?;
    println!("Response: {}", serde_json::to_string_pretty(&retrieve_json)?);

    println!("\n📝 Summarize:");
    let contract = "This Agreement is entered into by and between the Landlord and the Tenant. \
                    The Tenant shall pay rent on the first day of each month. \
                    Either party may terminate this Agreement with thirty days written notice.";
    let form = Form::new().part(
        "file",
        Part::bytes(contract.as_bytes().to_vec())
            .file_name("lease.txt")
            .mime_str("text/plain")?,
    );
    let summarize_response = client
        .post(format!("{}/api/summarize", base_url))
        .multipart(form)
        .send()
        .await?;
    println!("Status: {}", summarize_response.status());
    let summarize_json: serde_json::Value = summarize_response.json().await?;
    println!("Response: {}", serde_json::to_string_pretty(&summarize_json)?);

    println!("\n✅ Client test completed!");
    Ok(())
}
