//! Owner isolation and concurrency E2E tests.

use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;

use e2e_tests::{owner, reply, scripted, TestHarness};
use topicflow_extract::MockCompletionClient;
use topicflow_service::UpdateMode;
use topicflow_types::{FlowSettings, TopicObservation, TopicTriple};

/// Updates and resets for one owner never touch another owner's data.
#[tokio::test]
async fn test_owners_are_isolated() {
    let harness = TestHarness::new();
    let alice = owner("alice");
    let bob = owner("bob");
    let orchestrator = harness.orchestrator(
        scripted(vec![
            reply(&[("Rust", "Ownership", "Borrowing", &["rust"][..])]),
            reply(&[("Cooking", "Pasta", "Carbonara", &["pasta"][..])]),
        ]),
        FlowSettings::default(),
    );

    harness.say(&alice, &["Rust ownership"]);
    harness.say(&bob, &["Pasta recipes"]);
    orchestrator.update(&alice, UpdateMode::Incremental).await.unwrap();
    orchestrator.update(&bob, UpdateMode::Incremental).await.unwrap();

    let alice_graph = orchestrator.get_current(&alice).await.unwrap();
    let bob_graph = orchestrator.get_current(&bob).await.unwrap();
    assert_eq!(alice_graph.graph.nodes[0].label, "Rust");
    assert_eq!(bob_graph.graph.nodes[0].label, "Cooking");
    assert!(alice_graph.graph.nodes.iter().all(|n| n.label != "Cooking"));

    orchestrator.reset(&alice).await.unwrap();
    assert!(orchestrator.get_current(&alice).await.unwrap().graph.is_empty());
    assert_eq!(orchestrator.get_current(&bob).await.unwrap(), bob_graph);
    assert_eq!(harness.store.get_cursor(&bob).unwrap(), 1);
}

/// Message ids are assigned per owner.
#[test]
fn test_message_ids_are_per_owner() {
    let harness = TestHarness::new();
    let alice = owner("alice");
    let bob = owner("bob");

    harness.say(&alice, &["a1", "a2"]);
    let bob_messages = harness.say(&bob, &["b1"]);
    assert_eq!(bob_messages[0].id, 1);
    assert_eq!(harness.messages.messages_after(&alice, 0).unwrap().len(), 2);
    assert_eq!(harness.messages.messages_after(&bob, 0).unwrap().len(), 1);
}

/// Concurrent upserts of one triple count every observation.
#[test]
fn test_concurrent_upserts_count_every_observation() {
    let harness = TestHarness::new();
    let alice = owner("alice");
    let observation = TopicObservation {
        triple: TopicTriple::new("Rust", "Ownership", "Borrowing", 0.9).with_keywords(["rust"]),
        first_message_id: 1,
        last_message_id: 1,
        co_occurring: Vec::new(),
        mentions: 1,
    };

    thread::scope(|scope| {
        for _ in 0..8 {
            let store = harness.store.clone();
            let alice = alice.clone();
            let observation = observation.clone();
            scope.spawn(move || {
                for _ in 0..5 {
                    store
                        .upsert_batch(&alice, std::slice::from_ref(&observation))
                        .unwrap();
                }
            });
        }
    });

    let records = harness.store.get_all(&alice).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].frequency, 40);
}

/// Concurrent updates for one owner are serialized: every message is
/// processed exactly once.
#[tokio::test]
async fn test_concurrent_updates_process_each_message_once() {
    let harness = TestHarness::new();
    let alice = owner("alice");
    let orchestrator =
        harness.orchestrator(Arc::new(MockCompletionClient::heuristic()), FlowSettings::default());
    harness.say(&alice, &["Rust ownership", "Graph layout", "Force simulation"]);

    let a = {
        let orchestrator = orchestrator.clone();
        let alice = alice.clone();
        tokio::spawn(async move { orchestrator.update(&alice, UpdateMode::Incremental).await })
    };
    let b = {
        let orchestrator = orchestrator.clone();
        let alice = alice.clone();
        tokio::spawn(async move { orchestrator.update(&alice, UpdateMode::Incremental).await })
    };

    let first = a.await.unwrap().unwrap();
    let second = b.await.unwrap().unwrap();
    assert_eq!(first.processed_count + second.processed_count, 3);
    assert_eq!(harness.store.get_cursor(&alice).unwrap(), 3);
}
