//! End-to-end test infrastructure for topicflow.
//!
//! Provides a shared TestHarness and helper functions for E2E tests
//! covering the full message-to-graph pipeline.

use std::sync::Arc;

use serde_json::json;

use topicflow_extract::{ExtractorConfig, MockCompletionClient, MockReply, TopicExtractor};
use topicflow_service::{FlowOrchestrator, StoredMessageSource};
use topicflow_storage::{MessageLog, Storage, TopicStore};
use topicflow_types::{FlowSettings, Message, MessageRole, OwnerId};

/// Shared test harness for E2E tests.
///
/// Owns a temporary RocksDB instance with the topic store and message log
/// opened over it.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    pub storage: Arc<Storage>,
    pub store: Arc<TopicStore>,
    pub messages: Arc<MessageLog>,
}

impl TestHarness {
    /// Create a new test harness with temp directory and storage.
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let storage =
            Arc::new(Storage::open(temp_dir.path()).expect("Failed to open test storage"));
        let store = Arc::new(TopicStore::new(storage.clone()));
        let messages = Arc::new(MessageLog::new(storage.clone()));

        Self {
            _temp_dir: temp_dir,
            storage,
            store,
            messages,
        }
    }

    /// Orchestrator reading the stored message log through `client`.
    pub fn orchestrator(
        &self,
        client: Arc<MockCompletionClient>,
        settings: FlowSettings,
    ) -> Arc<FlowOrchestrator> {
        self.orchestrator_with(client, ExtractorConfig::default(), settings)
    }

    pub fn orchestrator_with(
        &self,
        client: Arc<MockCompletionClient>,
        config: ExtractorConfig,
        settings: FlowSettings,
    ) -> Arc<FlowOrchestrator> {
        let source = Arc::new(StoredMessageSource::new(self.messages.clone()));
        let extractor = TopicExtractor::new(client, config);
        Arc::new(FlowOrchestrator::new(
            self.store.clone(),
            source,
            extractor,
            settings,
        ))
    }

    /// Append user messages for `owner`.
    pub fn say(&self, owner: &OwnerId, texts: &[&str]) -> Vec<Message> {
        texts
            .iter()
            .map(|text| {
                self.messages
                    .append(owner, MessageRole::User, text)
                    .expect("Failed to append message")
            })
            .collect()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn owner(raw: &str) -> OwnerId {
    OwnerId::parse(raw).expect("Invalid test owner")
}

/// Scripted collaborator reply listing `(topic, subtopic, subsubtopic,
/// keywords)` triples at confidence 0.9.
pub fn reply(triples: &[(&str, &str, &str, &[&str])]) -> MockReply {
    let topics: Vec<_> = triples
        .iter()
        .map(|(t, s, ss, keywords)| {
            json!({
                "topic_label": t,
                "subtopic_label": s,
                "subsubtopic_label": ss,
                "confidence": 0.9,
                "keywords": keywords,
            })
        })
        .collect();
    MockReply::Text(json!({ "topics": topics }).to_string())
}

/// Scripted mock client.
pub fn scripted(replies: Vec<MockReply>) -> Arc<MockCompletionClient> {
    Arc::new(MockCompletionClient::scripted(replies))
}

/// One message per batch.
pub fn one_per_batch(policy: topicflow_types::CursorPolicy) -> FlowSettings {
    FlowSettings {
        batch_size: 1,
        cursor_policy: policy,
        ..Default::default()
    }
}
