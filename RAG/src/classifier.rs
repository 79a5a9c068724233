use crate::chat_service::ChatModel;
use crate::models::Classification;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

pub const FALLBACK_CONFIDENCE: f64 = 0.6;

const CLASSIFY_SYSTEM_PROMPT: &str = "You are an assistant that classifies legal documents into one of: Agreement, Petition, Notice, Judgment, Other. Respond only with the label and an optional confidence as JSON.";

/// Only this many characters of the document are sent to the model.
const MAX_PROMPT_CHARS: usize = 3000;

/// Keyword rules, evaluated top to bottom. First match wins.
const KEYWORD_RULES: &[(&str, &[&str])] = &[
    ("Agreement", &["agreement", "party", "witnesseth"]),
    ("Petition", &["petition", "petitioner", "prays"]),
    ("Notice", &["notice", "hereby notify", "take notice"]),
    ("Judgment", &["judgment", "judgement", "order"]),
];

fn json_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static regex"))
}

/// Classifies a legal document. Tries the model first; if the call fails or
/// its reply holds no parseable JSON object, falls back to keyword rules.
pub async fn classify(chat: &dyn ChatModel, text: &str) -> Classification {
    let excerpt: String = text.chars().take(MAX_PROMPT_CHARS).collect();
    let user_prompt = format!(
        "Classify the following document text and return JSON like: {{\"category\":\"Agreement\",\"confidence\":0.92}}\n\nText:\n{excerpt}"
    );

    match chat.complete(CLASSIFY_SYSTEM_PROMPT, &user_prompt).await {
        Ok(reply) => {
            if let Some(classification) = parse_classification(&reply) {
                return classification;
            }
            log::warn!("LLM classification reply had no usable JSON, falling back to keyword rules");
        }
        Err(e) => {
            log::warn!("LLM classification failed, falling back to keyword rules: {e:#}");
        }
    }

    Classification {
        category: keyword_category(text).to_string(),
        confidence: Some(FALLBACK_CONFIDENCE),
    }
}

/// Pulls `{category, confidence}` out of the first brace-delimited block.
pub fn parse_classification(reply: &str) -> Option<Classification> {
    let block = json_block().find(reply)?;
    let parsed: Value = serde_json::from_str(block.as_str()).ok()?;
    let object = parsed.as_object()?;

    let category = object
        .get("category")
        .and_then(Value::as_str)
        .unwrap_or("Other")
        .to_string();
    let confidence = object.get("confidence").and_then(Value::as_f64);

    Some(Classification {
        category,
        confidence,
    })
}

pub fn keyword_category(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    KEYWORD_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or("Other")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedChat;

    #[test]
    fn petitioner_text_is_a_petition() {
        assert_eq!(keyword_category("The Petitioner humbly submits"), "Petition");
    }

    #[test]
    fn agreement_outranks_petition() {
        assert_eq!(
            keyword_category("This agreement settles the petition filed earlier"),
            "Agreement"
        );
    }

    #[test]
    fn notice_and_judgment_rules() {
        assert_eq!(keyword_category("PLEASE TAKE NOTICE"), "Notice");
        assert_eq!(keyword_category("The judgement of this court"), "Judgment");
        assert_eq!(keyword_category("Grocery list: eggs, milk"), "Other");
    }

    #[test]
    fn parses_json_embedded_in_prose() {
        let reply = "Sure!\n```json\n{\"category\": \"Notice\", \"confidence\": 0.81}\n```";
        let parsed = parse_classification(reply).unwrap();
        assert_eq!(parsed.category, "Notice");
        assert_eq!(parsed.confidence, Some(0.81));
    }

    #[test]
    fn missing_fields_default() {
        let parsed = parse_classification("{\"label\": \"x\"}").unwrap();
        assert_eq!(parsed.category, "Other");
        assert_eq!(parsed.confidence, None);
    }

    #[test]
    fn no_brace_block_is_unparseable() {
        assert!(parse_classification("Agreement").is_none());
        assert!(parse_classification("{not json}").is_none());
    }

    #[tokio::test]
    async fn model_answer_wins_when_parseable() {
        let chat = ScriptedChat::new(vec![Ok(r#"{"category":"Judgment","confidence":0.9}"#)]);
        let result = classify(&chat, "The petitioner prays").await;
        assert_eq!(
            result,
            Classification {
                category: "Judgment".to_string(),
                confidence: Some(0.9)
            }
        );
    }

    #[tokio::test]
    async fn failed_call_falls_back_to_keywords() {
        let chat = ScriptedChat::new(vec![Err("401 unauthorized")]);
        let result = classify(&chat, "The petitioner prays for relief").await;
        assert_eq!(result.category, "Petition");
        assert_eq!(result.confidence, Some(FALLBACK_CONFIDENCE));
    }

    #[tokio::test]
    async fn prose_reply_falls_back_to_keywords() {
        let chat = ScriptedChat::new(vec![Ok("It looks like an agreement to me.")]);
        let result = classify(&chat, "WITNESSETH that the parties").await;
        assert_eq!(result.category, "Agreement");
        assert_eq!(result.confidence, Some(FALLBACK_CONFIDENCE));
    }

    #[tokio::test]
    async fn prompt_is_limited_to_first_characters() {
        let chat = ScriptedChat::new(vec![Ok("{\"category\":\"Other\"}")]);
        let text = "z".repeat(MAX_PROMPT_CHARS + 500);
        classify(&chat, &text).await;

        let calls = chat.calls.lock().unwrap();
        let sent = calls[0].1.matches('z').count();
        assert_eq!(sent, MAX_PROMPT_CHARS);
    }
}
