//! Failure handling E2E tests.
//!
//! A failed batch is discarded on its own and reported; the cursor policy
//! decides whether its messages are fetched again on the next run.

use std::time::Duration;

use pretty_assertions::assert_eq;

use e2e_tests::{one_per_batch, owner, reply, scripted, TestHarness};
use topicflow_extract::{BatchError, MockReply};
use topicflow_service::{FlowState, UpdateMode};
use topicflow_types::CursorPolicy;

fn rust() -> MockReply {
    reply(&[("Rust", "Ownership", "Borrowing", &["rust"][..])])
}

fn graphs() -> MockReply {
    reply(&[("Graphs", "Layout", "Spiral", &["graph"][..])])
}

/// An unparseable reply discards only its own batch.
#[tokio::test]
async fn test_parse_failure_discards_only_its_batch() {
    let harness = TestHarness::new();
    let alice = owner("alice");
    let orchestrator = harness.orchestrator(
        scripted(vec![
            rust(),
            MockReply::Text("I'm sorry, I can't help with that.".into()),
            graphs(),
        ]),
        one_per_batch(CursorPolicy::SkipFailed),
    );
    harness.say(&alice, &["one", "two", "three"]);

    let outcome = orchestrator.update(&alice, UpdateMode::Incremental).await.unwrap();
    assert_eq!(outcome.processed_count, 3);
    assert_eq!(outcome.failed_batches, 1);
    assert_eq!(outcome.batch_errors[0].first_message_id, 2);
    assert_eq!(outcome.batch_errors[0].last_message_id, 2);
    assert!(matches!(outcome.batch_errors[0].error, BatchError::Parse(_)));

    assert_eq!(outcome.stats.total_triples, 2);
    assert_eq!(outcome.cursor, 3);
    assert_eq!(orchestrator.state(&alice), FlowState::Done);
}

/// A timed-out call fails its batch like any remote error.
#[tokio::test(start_paused = true)]
async fn test_timeout_is_reported_as_failed_batch() {
    let harness = TestHarness::new();
    let alice = owner("alice");
    let orchestrator = harness.orchestrator(
        scripted(vec![
            MockReply::Delayed(Duration::from_secs(120), Box::new(rust())),
            graphs(),
        ]),
        one_per_batch(CursorPolicy::SkipFailed),
    );
    harness.say(&alice, &["slow", "fast"]);

    let outcome = orchestrator.update(&alice, UpdateMode::Incremental).await.unwrap();
    assert_eq!(outcome.failed_batches, 1);
    match &outcome.batch_errors[0].error {
        BatchError::Remote(message) => assert!(message.contains("timed out")),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(outcome.stats.total_triples, 1);
    assert_eq!(outcome.graph.nodes[0].label, "Graphs");
}

/// Skipping failed batches moves the cursor past them for good.
#[tokio::test]
async fn test_skip_failed_never_refetches() {
    let harness = TestHarness::new();
    let alice = owner("alice");
    let client = scripted(vec![MockReply::Fail("503".into()), graphs()]);
    let orchestrator = harness.orchestrator(client.clone(), one_per_batch(CursorPolicy::SkipFailed));
    harness.say(&alice, &["lost", "kept"]);

    let first = orchestrator.update(&alice, UpdateMode::Incremental).await.unwrap();
    assert_eq!(first.failed_batches, 1);
    assert_eq!(first.cursor, 2);

    let calls = client.call_count();
    let second = orchestrator.update(&alice, UpdateMode::Incremental).await.unwrap();
    assert_eq!(second.processed_count, 0);
    assert_eq!(client.call_count(), calls);
}

/// Holding at the failure refetches the failed batch on the next run and
/// never counts a message twice.
#[tokio::test]
async fn test_hold_at_failure_refetches() {
    let harness = TestHarness::new();
    let alice = owner("alice");
    let client = scripted(vec![rust(), MockReply::Fail("503".into()), graphs(), graphs()]);
    let orchestrator =
        harness.orchestrator(client.clone(), one_per_batch(CursorPolicy::HoldAtFailure));
    harness.say(&alice, &["one", "two", "three"]);

    let first = orchestrator.update(&alice, UpdateMode::Incremental).await.unwrap();
    assert_eq!(first.failed_batches, 1);
    assert_eq!(first.cursor, 1);
    assert_eq!(harness.store.get_cursor(&alice).unwrap(), 1);
    // message three is left for the next run
    assert_eq!(client.call_count(), 2);
    assert_eq!(first.stats.total_triples, 1);

    let second = orchestrator.update(&alice, UpdateMode::Incremental).await.unwrap();
    assert_eq!(second.processed_count, 2);
    assert_eq!(second.failed_batches, 0);
    assert_eq!(second.cursor, 3);
    assert_eq!(client.call_count(), 4);

    let records = harness.store.get_all(&alice).unwrap();
    let graphs = records
        .iter()
        .find(|r| r.topic_label == "Graphs")
        .unwrap();
    assert_eq!(graphs.frequency, 2);
}

/// Every batch failing still completes the run with an empty graph.
#[tokio::test]
async fn test_all_batches_failing_leaves_graph_empty() {
    let harness = TestHarness::new();
    let alice = owner("alice");
    let orchestrator = harness.orchestrator(
        scripted(vec![MockReply::Fail("down".into()), MockReply::Fail("down".into())]),
        one_per_batch(CursorPolicy::SkipFailed),
    );
    harness.say(&alice, &["one", "two"]);

    let outcome = orchestrator.update(&alice, UpdateMode::Incremental).await.unwrap();
    assert_eq!(outcome.failed_batches, 2);
    assert!(outcome.graph.is_empty());
    assert_eq!(outcome.stats.total_triples, 0);
}
