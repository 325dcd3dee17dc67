//! Chat transcript entries and composition of assistant replies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    domain::{capitalize, SelectedProducts},
    protocol::QuestionResponse,
};

pub const GREETINGS: [&str; 5] = ["hi", "hello", "hey", "hi there", "hello there"];

pub const ANALYSIS_REQUIRED_REPLY: &str =
    "Please complete the review analysis first before asking questions.";

pub const DEFAULT_ANSWER: &str = "I could not generate an answer.";

pub const MAX_RENDERED_SOURCES: usize = 3;

pub const SUGGESTED_QUESTIONS: [&str; 6] = [
    "Which product has better battery life?",
    "What do customers say about durability?",
    "Compare the prices and value",
    "What are the main complaints?",
    "Which store has better customer service?",
    "Tell me about shipping experiences",
];

/// One question and its reply. `assistant` is `None` while the reply is pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub user: String,
    pub assistant: Option<String>,
    pub asked_at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn pending(user: impl Into<String>, asked_at: DateTime<Utc>) -> Self {
        Self {
            user: user.into(),
            assistant: None,
            asked_at,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.assistant.is_none()
    }
}

pub fn is_greeting(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    GREETINGS.contains(&normalized.as_str())
}

/// `Amazon: iPhone 14, Walmart: Apple iPhone 14 128GB`
pub fn selected_product_names(selected: &SelectedProducts) -> String {
    selected
        .iter()
        .map(|(store, product)| format!("{}: {}", capitalize(store), product.name))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn greeting_reply(selected: &SelectedProducts) -> String {
    let mut reply = String::from("Hello! I'm your Review Intelligence Assistant.\n\n");
    reply.push_str("I've analyzed reviews for your selected products:\n");
    reply.push_str(&selected_product_names(selected));
    reply.push_str("\n\nYou can ask me questions like:\n");
    for question in SUGGESTED_QUESTIONS.iter().take(5) {
        reply.push_str(&format!("• \"{question}\"\n"));
    }
    reply.push_str("\nWhat would you like to know about these products?");
    reply
}

/// Answer text, then up to three cited sources, then a confidence line when
/// the backend reported one.
pub fn compose_answer(response: &QuestionResponse) -> String {
    let mut reply = response
        .answer
        .as_deref()
        .filter(|answer| !answer.is_empty())
        .unwrap_or(DEFAULT_ANSWER)
        .to_string();

    if !response.sources.is_empty() {
        reply.push_str("\n\n**Sources from reviews:**");
        for (i, source) in response.sources.iter().take(MAX_RENDERED_SOURCES).enumerate() {
            let store = capitalize(source.store.as_deref().unwrap_or("Unknown"));
            let snippet = source.text_snippet.as_deref().unwrap_or_default();
            reply.push_str(&format!(
                "\n\n**{}. {store} Review** (⭐{}/5):\n*\"{snippet}\"*",
                i + 1,
                source.rating
            ));
        }
    }

    if response.confidence > 0.0 {
        reply.push_str(&format!(
            "\n\n*Confidence: {:.0}%*",
            (response.confidence * 100.0).round()
        ));
    }

    reply
}

pub fn error_reply(error: &str) -> String {
    format!("I encountered an error: {error}")
}

pub fn failure_reply(detail: &str) -> String {
    format!("Sorry, I encountered an error processing your question: {detail}")
}

#[cfg(test)]
mod tests {
    use shared::{domain::ProductListing, protocol::ReviewSource};

    use super::*;

    fn source(store: &str, rating: f64, snippet: &str) -> ReviewSource {
        ReviewSource {
            store: Some(store.into()),
            rating,
            text_snippet: Some(snippet.into()),
            similarity: None,
        }
    }

    #[test]
    fn greetings_match_exactly_ignoring_case_and_whitespace() {
        for text in ["hi", "HELLO", "Hey", "  hi there  ", "Hello There"] {
            assert!(is_greeting(text), "{text} should be a greeting");
        }
        for text in ["hi there!", "hello?", "hey you", "what's up", ""] {
            assert!(!is_greeting(text), "{text} should not be a greeting");
        }
    }

    #[test]
    fn greeting_lists_selected_products_by_store() {
        let mut selected = SelectedProducts::new();
        selected.select("amazon", ProductListing::new("a", "iPhone 14"));
        selected.select("walmart", ProductListing::new("w", "Apple iPhone 14 128GB"));

        let reply = greeting_reply(&selected);
        assert!(reply.contains("Amazon: iPhone 14, Walmart: Apple iPhone 14 128GB"));
        assert!(reply.contains("Which product has better battery life?"));
        assert!(!reply.contains("Tell me about shipping experiences"));
    }

    #[test]
    fn renders_only_first_three_sources() {
        let response = QuestionResponse {
            answer: Some("Battery lasts all day.".into()),
            sources: vec![
                source("amazon", 5.0, "Great battery"),
                source("walmart", 4.5, "Lasts long"),
                source("target", 3.0, "Okay"),
                source("bestbuy", 1.0, "Never shown"),
            ],
            confidence: 0.0,
            error: None,
        };

        let reply = compose_answer(&response);
        assert!(reply.starts_with("Battery lasts all day."));
        assert!(reply.contains("**1. Amazon Review** (⭐5/5):\n*\"Great battery\"*"));
        assert!(reply.contains("**2. Walmart Review** (⭐4.5/5)"));
        assert!(reply.contains("**3. Target Review** (⭐3/5)"));
        assert!(!reply.contains("Never shown"));
        assert!(!reply.contains("Bestbuy"));
        assert!(!reply.contains("Confidence"));
    }

    #[test]
    fn confidence_line_is_rounded_percentage() {
        let response = QuestionResponse {
            answer: Some("Yes.".into()),
            confidence: 0.87,
            ..QuestionResponse::default()
        };
        let reply = compose_answer(&response);
        assert!(reply.ends_with("*Confidence: 87%*"));
        assert!(!reply.contains("Sources"));
    }

    #[test]
    fn confidence_ties_round_half_up() {
        let response = QuestionResponse {
            answer: Some("Maybe.".into()),
            confidence: 0.125,
            ..QuestionResponse::default()
        };
        assert!(compose_answer(&response).ends_with("*Confidence: 13%*"));
    }

    #[test]
    fn missing_answer_and_source_fields_fall_back() {
        let response = QuestionResponse {
            sources: vec![ReviewSource::default()],
            ..QuestionResponse::default()
        };
        let reply = compose_answer(&response);
        assert!(reply.starts_with(DEFAULT_ANSWER));
        assert!(reply.contains("**1. Unknown Review** (⭐0/5):\n*\"\"*"));
    }
}
