use crate::chat_service::ChatModel;
use crate::document_processor::chunk_text;
use anyhow::{bail, Result};

pub const SUMMARY_SYSTEM_PROMPT: &str = "You are LexiBot, an expert legal summarizer. Produce a concise, structured summary with headings: Summary, Key Clauses, Risks, Recommended Next Steps.";

fn chunk_prompt(chunk: &str) -> String {
    format!(
        "Please summarize the following legal text (preserve headings, bullet key points):\n\n{chunk}"
    )
}

fn merge_prompt(partials: &[String]) -> String {
    format!(
        "Combine the following partial summaries into one concise summary, avoid repetition, and create final Key Clauses and Recommendations:\n\n{}",
        partials.join("\n\n---\n\n")
    )
}

/// Summarizes `text` chunk by chunk, then merges the partial summaries when
/// there is more than one. The first failing call aborts the whole summary.
pub async fn summarize(chat: &dyn ChatModel, text: &str, chunk_size: usize) -> Result<String> {
    let chunks = chunk_text(text, chunk_size);
    if chunks.is_empty() {
        bail!("nothing to summarize");
    }
    log::info!("Summarizing {} chunk(s)", chunks.len());

    let mut partials = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        partials.push(chat.complete(SUMMARY_SYSTEM_PROMPT, &chunk_prompt(chunk)).await?);
    }

    if partials.len() == 1 {
        return Ok(partials.remove(0));
    }

    chat.complete(SUMMARY_SYSTEM_PROMPT, &merge_prompt(&partials)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedChat;

    #[tokio::test]
    async fn short_text_needs_a_single_call() {
        let chat = ScriptedChat::new(vec![Ok("Summary: lease")]);
        let summary = summarize(&chat, "This lease is made between", 4000).await.unwrap();

        assert_eq!(summary, "Summary: lease");
        assert_eq!(chat.call_count(), 1);
        let calls = chat.calls.lock().unwrap();
        assert_eq!(calls[0].0, SUMMARY_SYSTEM_PROMPT);
        assert!(calls[0].1.ends_with("This lease is made between"));
    }

    #[tokio::test]
    async fn long_text_is_summarized_then_merged() {
        let chat = ScriptedChat::new(vec![Ok("part one"), Ok("part two"), Ok("part three"), Ok("final")]);
        let text = "a".repeat(25);

        let summary = summarize(&chat, &text, 10).await.unwrap();

        assert_eq!(summary, "final");
        assert_eq!(chat.call_count(), 4);
        let calls = chat.calls.lock().unwrap();
        assert!(calls[3].1.contains("part one\n\n---\n\npart two\n\n---\n\npart three"));
    }

    #[tokio::test]
    async fn failing_chunk_aborts_the_summary() {
        let chat = ScriptedChat::new(vec![Ok("part one"), Err("quota exceeded")]);
        let err = summarize(&chat, &"b".repeat(30), 10).await.unwrap_err();

        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(chat.call_count(), 2);
    }

    #[tokio::test]
    async fn empty_text_is_rejected_without_calling_the_model() {
        let chat = ScriptedChat::new(vec![]);
        assert!(summarize(&chat, "", 10).await.is_err());
        assert_eq!(chat.call_count(), 0);
    }
}
