//! Render E2E tests: stored topics to a laid-out, colored SVG.

use pretty_assertions::assert_eq;

use e2e_tests::{owner, reply, scripted, TestHarness};
use topicflow_service::UpdateMode;
use topicflow_types::{FlowSettings, NodeLevel};
use topicflow_viz::{render_svg, ColorMap, NodeKind, Scene, VizConfig};

/// Related topics share a color after a full pipeline run.
#[tokio::test]
async fn test_related_topics_share_color() {
    let harness = TestHarness::new();
    let alice = owner("alice");
    let orchestrator = harness.orchestrator(
        scripted(vec![reply(&[
            ("Trust Metrics", "Scoring", "Entropy", &["trust"][..]),
            ("Trust Calibration", "Feedback", "Thresholds", &["trust"][..]),
        ])]),
        FlowSettings::default(),
    );
    harness.say(&alice, &["How should trust be measured and calibrated?"]);
    orchestrator.update(&alice, UpdateMode::Incremental).await.unwrap();

    let snapshot = orchestrator.get_current(&alice).await.unwrap();
    let scene = Scene::build(&snapshot.graph, &ColorMap::new(), &VizConfig::default());

    let metrics = scene.color_map().get("trust-metrics");
    let calibration = scene.color_map().get("trust-calibration");
    assert!(metrics.is_some());
    assert_eq!(metrics, calibration);
    assert_eq!(scene.color_map().allocations(), 1);
}

/// Colors persist across updates when the caller feeds the map back.
#[tokio::test]
async fn test_colors_are_stable_across_updates() {
    let harness = TestHarness::new();
    let alice = owner("alice");
    let orchestrator = harness.orchestrator(
        scripted(vec![
            reply(&[("Rust", "Ownership", "Borrowing", &["ownership"][..])]),
            reply(&[("Cooking", "Pasta", "Carbonara", &["pasta"][..])]),
        ]),
        FlowSettings::default(),
    );
    let config = VizConfig::default();

    harness.say(&alice, &["first"]);
    orchestrator.update(&alice, UpdateMode::Incremental).await.unwrap();
    let first = Scene::build(
        &orchestrator.get_current(&alice).await.unwrap().graph,
        &ColorMap::new(),
        &config,
    );
    let rust_color = first.color_map().get("rust").map(str::to_string);

    harness.say(&alice, &["second"]);
    orchestrator.update(&alice, UpdateMode::Incremental).await.unwrap();
    let second = Scene::build(
        &orchestrator.get_current(&alice).await.unwrap().graph,
        first.color_map(),
        &config,
    );

    assert_eq!(second.color_map().get("rust").map(str::to_string), rust_color);
    assert_ne!(second.color_map().get("cooking"), second.color_map().get("rust"));
    assert_eq!(second.node("rust").unwrap().position, Some(0));
    assert_eq!(second.node("cooking").unwrap().position, Some(1));
}

/// Layout, simulation and SVG output over a stored graph.
#[tokio::test]
async fn test_render_pipeline() {
    let harness = TestHarness::new();
    let alice = owner("alice");
    let orchestrator = harness.orchestrator(
        scripted(vec![reply(&[
            ("Rust", "Ownership", "Borrowing", &["rust"][..]),
            ("Rust", "Lifetimes", "Elision", &["rust"][..]),
            ("Graphs", "Layout", "Spiral", &["graph"][..]),
        ])]),
        FlowSettings::default(),
    );
    harness.say(&alice, &["mixed"]);
    orchestrator.update(&alice, UpdateMode::Incremental).await.unwrap();
    let snapshot = orchestrator.get_current(&alice).await.unwrap();

    let mut scene = Scene::build(&snapshot.graph, &ColorMap::new(), &VizConfig::default());
    assert!(scene.dropped().is_clean());

    let pinned: Vec<_> = scene
        .nodes()
        .iter()
        .filter(|n| n.kind == NodeKind::Pinned)
        .map(|n| (n.node.id.clone(), scene.coordinates(&n.node.id).unwrap()))
        .collect();
    assert_eq!(pinned.len(), 2);
    assert!(scene
        .nodes()
        .iter()
        .filter(|n| n.node.level != NodeLevel::Topic)
        .all(|n| n.kind == NodeKind::Free));

    scene.run_layout(400);
    for (id, position) in &pinned {
        assert_eq!(scene.coordinates(id).unwrap(), *position);
    }

    let svg = render_svg(&scene);
    assert_eq!(svg.matches("<circle").count(), snapshot.graph.nodes.len());
    assert_eq!(svg.matches("<line").count(), snapshot.graph.links.len());
}

/// An owner with no topics renders the empty state.
#[tokio::test]
async fn test_empty_owner_renders_empty_state() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator(scripted(Vec::new()), FlowSettings::default());
    let snapshot = orchestrator.get_current(&owner("nobody")).await.unwrap();

    let scene = Scene::build(&snapshot.graph, &ColorMap::new(), &VizConfig::default());
    let svg = render_svg(&scene);
    assert!(svg.contains("empty-state"));
    assert!(scene.color_map().is_empty());
}
