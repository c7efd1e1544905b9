//! Mock completion client for testing and offline runs.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::client::{CompletionClient, CompletionRequest};
use crate::error::CompletionError;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this text
    Text(String),
    /// Fail with an API error
    Fail(String),
    /// Wait, then reply
    Delayed(Duration, Box<MockReply>),
}

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "can", "could", "do", "does", "for",
    "from", "how", "i", "if", "in", "into", "is", "it", "its", "me", "my", "of", "on", "or",
    "should", "so", "that", "the", "their", "them", "then", "there", "these", "this", "to", "was",
    "we", "what", "when", "where", "which", "why", "will", "with", "would", "you", "your",
];

/// Mock collaborator.
///
/// Scripted replies are consumed in order; once they run out (or when none
/// were given) a deterministic heuristic derives one triple from the
/// transcript's leading content words.
pub struct MockCompletionClient {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletionClient {
    /// Heuristic-only mock.
    pub fn heuristic() -> Self {
        Self::scripted(Vec::new())
    }

    /// Mock that plays back `replies` before falling back to the heuristic.
    pub fn scripted(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn next_reply(&self) -> Option<MockReply> {
        self.replies.lock().ok().and_then(|mut r| r.pop_front())
    }
}

impl Default for MockCompletionClient {
    fn default() -> Self {
        Self::heuristic()
    }
}

/// Content words of the transcript lines (`[n] ROLE: text`).
fn content_words(user_prompt: &str) -> Vec<String> {
    user_prompt
        .lines()
        .filter(|l| l.starts_with('['))
        .filter_map(|l| l.split_once(": ").map(|(_, text)| text))
        .flat_map(|text| text.split(|c: char| !(c.is_alphanumeric() || c == '-')))
        .map(|w| w.trim_matches('-'))
        .filter(|w| w.len() > 1 || w.chars().any(|c| c.is_ascii_digit()))
        .filter(|w| !STOPWORDS.contains(&w.to_lowercase().as_str()))
        .map(str::to_string)
        .collect()
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn heuristic_reply(request: &CompletionRequest) -> String {
    let mut words: Vec<String> = Vec::new();
    for w in content_words(&request.user) {
        if !words.iter().any(|x| x.eq_ignore_ascii_case(&w)) {
            words.push(w);
        }
    }
    if words.is_empty() {
        return json!({ "topics": [] }).to_string();
    }

    let pick = |i: usize| title_case(&words[i.min(words.len() - 1)]);
    let topic = pick(0);
    let subtopic = pick(1);
    let subsubtopic = if words.len() > 2 {
        words[2..words.len().min(4)]
            .iter()
            .map(|w| title_case(w))
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        pick(words.len() - 1)
    };
    let keywords: Vec<String> = words.iter().take(5).map(|w| w.to_lowercase()).collect();

    json!({
        "topics": [{
            "topic_label": topic,
            "subtopic_label": subtopic,
            "subsubtopic_label": subsubtopic,
            "confidence": 0.8,
            "keywords": keywords,
        }]
    })
    .to_string()
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let mut reply = match self.next_reply() {
            Some(reply) => reply,
            None => return Ok(heuristic_reply(request)),
        };

        loop {
            match reply {
                MockReply::Text(text) => return Ok(text),
                MockReply::Fail(message) => return Err(CompletionError::ApiError(message)),
                MockReply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
            }
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(user: &str) -> CompletionRequest {
        CompletionRequest {
            system: String::new(),
            user: user.to_string(),
            temperature: 0.3,
            max_tokens: 100,
        }
    }

    #[tokio::test]
    async fn test_scripted_then_heuristic() {
        let client = MockCompletionClient::scripted(vec![
            MockReply::Text("[]".into()),
            MockReply::Fail("boom".into()),
        ]);
        assert_eq!(client.complete(&request("x")).await.unwrap(), "[]");
        assert!(client.complete(&request("x")).await.is_err());
        let fallback = client.complete(&request("[1] USER: hello")).await.unwrap();
        assert!(fallback.contains("topics"));
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_heuristic_derives_content_labels() {
        let client = MockCompletionClient::heuristic();
        let text = client
            .complete(&request(
                "Analyze:\n\n[1] USER: How do I implement a D3 force-directed graph?",
            ))
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let entry = &value["topics"][0];
        assert_eq!(entry["topic_label"], "Implement");
        assert_eq!(entry["subtopic_label"], "D3");
        assert_eq!(entry["subsubtopic_label"], "Force-directed Graph");
    }

    #[tokio::test]
    async fn test_heuristic_empty_transcript() {
        let client = MockCompletionClient::heuristic();
        let text = client.complete(&request("nothing here")).await.unwrap();
        assert_eq!(text, r#"{"topics":[]}"#);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_reply() {
        let client = MockCompletionClient::scripted(vec![MockReply::Delayed(
            Duration::from_secs(5),
            Box::new(MockReply::Text("late".into())),
        )]);
        assert_eq!(client.complete(&request("x")).await.unwrap(), "late");
    }
}
