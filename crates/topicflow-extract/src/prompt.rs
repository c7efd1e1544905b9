//! Message sanitizing and prompt construction.

use topicflow_types::Message;

use crate::client::CompletionRequest;

/// Keep only user/assistant messages with non-empty text.
pub fn sanitize(messages: &[Message]) -> Vec<&Message> {
    messages
        .iter()
        .filter(|m| m.role.is_conversational() && !m.text.trim().is_empty())
        .collect()
}

/// Render messages as numbered transcript lines: `[n] ROLE: text`.
pub fn format_transcript(messages: &[&Message]) -> String {
    messages
        .iter()
        .enumerate()
        .map(|(i, m)| {
            format!(
                "[{}] {}: {}",
                i + 1,
                m.role.to_string().to_uppercase(),
                m.text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// System prompt carrying the extraction contract.
pub fn system_prompt(banned_terms: &[String], max_triples: usize) -> String {
    let banned = banned_terms
        .iter()
        .map(|t| format!("\"{}\"", t))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are a topic extraction specialist. Analyze conversation messages and extract hierarchical topics.

RULES:
1. Labels are CONCRETE noun phrases naming what was actually discussed.
   GOOD: "D3 force-directed graph", "LLM uncertainty estimation", "SQLite database schema"
   BAD (never use these as a whole label): {banned}

2. Every entry has EXACTLY three levels, all non-empty:
   - topic_label: main domain (e.g. "Trust Calibration System")
   - subtopic_label: functional subdivision (e.g. "Uncertainty Metrics")
   - subsubtopic_label: concrete method or object (e.g. "entropy-based confidence score")

3. confidence is a number between 0 and 1. Only report entries you are confident about.

Extract at most {max_triples} entries. Merge entries that name the same concept.
Provide 3-5 representative keywords per entry.

Respond with JSON only, in this shape:
{{
  "topics": [
    {{
      "topic_label": "Main Domain",
      "subtopic_label": "Subdivision",
      "subsubtopic_label": "Concrete Detail",
      "confidence": 0.85,
      "keywords": ["keyword1", "keyword2", "keyword3"]
    }}
  ]
}}"#
    )
}

/// User prompt for one batch.
pub fn user_prompt(messages: &[&Message]) -> String {
    format!(
        "Analyze this conversation segment and extract hierarchical topics:\n\n{}",
        format_transcript(messages)
    )
}

/// Assemble the completion request for one batch.
pub fn build_request(
    messages: &[&Message],
    banned_terms: &[String],
    max_triples: usize,
    temperature: f32,
    max_tokens: u32,
) -> CompletionRequest {
    CompletionRequest {
        system: system_prompt(banned_terms, max_triples),
        user: user_prompt(messages),
        temperature,
        max_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topicflow_types::MessageRole;

    #[test]
    fn test_sanitize_drops_system_tool_and_blank() {
        let messages = vec![
            Message::user(1, "How do layouts work?"),
            Message::new(2, MessageRole::System, "be nice"),
            Message::assistant(3, "   "),
            Message::new(4, MessageRole::Tool, "{}"),
            Message::assistant(5, "They use forces."),
        ];
        let kept: Vec<u64> = sanitize(&messages).iter().map(|m| m.id).collect();
        assert_eq!(kept, vec![1, 5]);
    }

    #[test]
    fn test_format_transcript() {
        let messages = vec![Message::user(7, " hello "), Message::assistant(8, "hi")];
        let refs: Vec<&Message> = messages.iter().collect();
        assert_eq!(format_transcript(&refs), "[1] USER: hello\n[2] ASSISTANT: hi");
    }

    #[test]
    fn test_system_prompt_lists_banned_terms() {
        let prompt = system_prompt(&["discussion".to_string(), "stuff".to_string()], 15);
        assert!(prompt.contains("\"discussion\", \"stuff\""));
        assert!(prompt.contains("at most 15 entries"));
        assert!(prompt.contains("\"topics\""));
    }

    #[test]
    fn test_build_request() {
        let messages = vec![Message::user(1, "D3 graphs")];
        let refs: Vec<&Message> = messages.iter().collect();
        let request = build_request(&refs, &[], 15, 0.3, 1500);
        assert!(request.user.ends_with("[1] USER: D3 graphs"));
        assert_eq!(request.max_tokens, 1500);
    }
}
