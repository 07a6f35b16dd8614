//! Execution registry: submission, polling, settling and release

use super::test_utils::{ideas_template, Harness, ScriptedText};
use shortgen::error::{ApiError, ValidationError};
use shortgen::pipeline::{GraphTemplate, RunStatus};
use shortgen::types::NodeStatus;
use std::sync::Arc;
use tokio::sync::Semaphore;

#[tokio::test]
async fn running_execution_can_be_polled_but_not_composed_or_discarded() {
    let gate = Arc::new(Semaphore::new(0));
    let harness = Harness::new(
        ScriptedText::new(&[], &["one", "two", "three"]).gated(Arc::clone(&gate)),
    );

    let id = harness.registry.submit("source", &ideas_template()).unwrap();
    assert!(id.starts_with("exec_"));

    let snapshot = harness.registry.poll(&id).unwrap();
    assert_eq!(snapshot.status, RunStatus::Running);
    assert!(!snapshot.is_done());
    assert_eq!(snapshot.nodes.len(), 4);
    assert_eq!(snapshot.node("child1").unwrap().status, NodeStatus::Pending);

    let err = harness.registry.compose(&id, &[]).await.unwrap_err();
    assert!(matches!(err, ApiError::ExecutionRunning(ref running) if running == &id));
    assert!(matches!(
        harness.registry.discard(&id),
        Err(ApiError::ExecutionRunning(_))
    ));

    gate.add_permits(1);
    let settled = harness.registry.wait(&id).await.unwrap();
    assert_eq!(settled.status, RunStatus::Completed);
    assert_eq!(settled.count(NodeStatus::Completed), 4);

    // polling a settled run is stable
    let again = harness.registry.poll(&id).unwrap();
    assert_eq!(again.count(NodeStatus::Completed), 4);

    harness.registry.discard(&id).unwrap();
    assert!(matches!(
        harness.registry.poll(&id),
        Err(ApiError::ExecutionNotFound(_))
    ));
    assert!(harness.registry.execution_ids().is_empty());
}

#[tokio::test]
async fn unknown_execution_ids_are_reported() {
    let harness = Harness::new(ScriptedText::new(&[], &[]));

    assert!(matches!(
        harness.registry.poll("exec_0_missing"),
        Err(ApiError::ExecutionNotFound(_))
    ));
    assert!(matches!(
        harness.registry.wait("exec_0_missing").await,
        Err(ApiError::ExecutionNotFound(_))
    ));
    assert!(matches!(
        harness.registry.discard("exec_0_missing"),
        Err(ApiError::ExecutionNotFound(_))
    ));
}

#[tokio::test]
async fn invalid_template_is_rejected_before_any_call() {
    let harness = Harness::new(ScriptedText::new(&[], &[]));
    let template = GraphTemplate::from_json(
        r#"{"nodes": [
            {"id": "root"},
            {"id": "orphan", "parentId": "nowhere"}
        ]}"#,
    )
    .unwrap();

    let err = harness.registry.submit("input", &template).unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(ValidationError::UnknownParent { .. })
    ));
    assert!(harness.registry.execution_ids().is_empty());
    assert_eq!(
        harness.text.calls.load(std::sync::atomic::Ordering::SeqCst),
        0
    );
}

#[tokio::test]
async fn concurrent_executions_are_isolated() {
    let harness = Harness::new(ScriptedText::new(&[], &["a", "b", "c"]));

    let first = harness.registry.submit("first", &ideas_template()).unwrap();
    let second = harness.registry.submit("second", &ideas_template()).unwrap();
    assert_ne!(first, second);
    assert_eq!(harness.registry.execution_ids().len(), 2);

    let (a, b) = tokio::join!(harness.registry.wait(&first), harness.registry.wait(&second));
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(a.node("root").unwrap().input.as_deref().unwrap().ends_with("first"));
    assert!(b.node("root").unwrap().input.as_deref().unwrap().ends_with("second"));

    harness.registry.discard(&first).unwrap();
    assert_eq!(harness.registry.execution_ids(), vec![second]);
}

#[test]
fn submit_outside_a_runtime_is_an_error() {
    let harness = Harness::new(ScriptedText::new(&[], &[]));
    let err = harness
        .registry
        .submit("input", &ideas_template())
        .unwrap_err();
    assert!(matches!(err, ApiError::ConfigError(_)));
    assert!(harness.registry.execution_ids().is_empty());
}
