//! Integration tests for Store action broadcasting
//!
//! Covers correlated request-response over the action broadcast and
//! cascading effect tracking across multi-step flows.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::time::Duration;
use storefront_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use storefront_runtime::{Store, StoreError};

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum FlowAction {
    /// Begin a three-step flow
    Begin { id: u64 },
    /// One step finished
    Stepped { id: u64, step: u32 },
    /// Terminal
    Finished { id: u64 },
    /// Begin a flow that never answers
    Stall,
}

#[derive(Debug, Clone, Default)]
struct FlowState {
    steps: Vec<(u64, u32)>,
    finished: Vec<u64>,
}

#[derive(Clone)]
struct FlowReducer;

fn after(delay_ms: u64, action: FlowAction) -> Effect<FlowAction> {
    Effect::Future(Box::pin(async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Some(action)
    }))
}

impl Reducer for FlowReducer {
    type State = FlowState;
    type Action = FlowAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut FlowState,
        action: FlowAction,
        _env: &(),
    ) -> SmallVec<[Effect<FlowAction>; 4]> {
        match action {
            FlowAction::Begin { id } => smallvec![after(5, FlowAction::Stepped { id, step: 1 })],
            FlowAction::Stepped { id, step } => {
                state.steps.push((id, step));
                if step < 3 {
                    smallvec![after(5, FlowAction::Stepped { id, step: step + 1 })]
                } else {
                    smallvec![after(0, FlowAction::Finished { id })]
                }
            },
            FlowAction::Finished { id } => {
                state.finished.push(id);
                smallvec![Effect::None]
            },
            FlowAction::Stall => smallvec![Effect::None],
        }
    }
}

fn store() -> Store<FlowState, FlowAction, (), FlowReducer> {
    Store::new(FlowState::default(), FlowReducer, ())
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn waits_through_every_step_for_terminal_action() {
    let store = store();

    let result = store
        .send_and_wait_for(
            FlowAction::Begin { id: 1 },
            |action| matches!(action, FlowAction::Finished { id: 1 }),
            Duration::from_secs(1),
        )
        .await;

    assert_eq!(result.unwrap(), FlowAction::Finished { id: 1 });
}

#[tokio::test]
async fn concurrent_waiters_get_their_own_results() {
    let store = store();

    let (first, second) = tokio::join!(
        store.send_and_wait_for(
            FlowAction::Begin { id: 10 },
            |action| matches!(action, FlowAction::Finished { id: 10 }),
            Duration::from_secs(1),
        ),
        store.send_and_wait_for(
            FlowAction::Begin { id: 20 },
            |action| matches!(action, FlowAction::Finished { id: 20 }),
            Duration::from_secs(1),
        ),
    );

    assert_eq!(first.unwrap(), FlowAction::Finished { id: 10 });
    assert_eq!(second.unwrap(), FlowAction::Finished { id: 20 });
}

#[tokio::test]
async fn silent_flow_times_out() {
    let store = store();

    let result = store
        .send_and_wait_for(FlowAction::Stall, |_| true, Duration::from_millis(50))
        .await;

    assert!(matches!(result, Err(StoreError::Timeout)));
}

#[tokio::test]
async fn cascading_handle_waits_for_whole_flow() {
    let store = store();

    let mut handle = store.send_cascading(FlowAction::Begin { id: 3 }).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    let (steps, finished) = store
        .state(|s| (s.steps.clone(), s.finished.clone()))
        .await;
    assert_eq!(steps, vec![(3, 1), (3, 2), (3, 3)]);
    assert_eq!(finished, vec![3]);
}

#[tokio::test]
async fn direct_handle_covers_only_the_first_step() {
    let store = store();

    let mut handle = store.send(FlowAction::Begin { id: 4 }).await.unwrap();
    handle.wait().await;

    let steps = store.state(|s| s.steps.clone()).await;
    assert_eq!(steps, vec![(4, 1)]);
}

#[tokio::test]
async fn observers_see_feedback_actions_in_order() {
    let store = store();
    let mut observer = store.subscribe_actions();

    store
        .send_and_wait_for(
            FlowAction::Begin { id: 5 },
            |action| matches!(action, FlowAction::Finished { .. }),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    let mut seen = Vec::new();
    while let Ok(action) = observer.try_recv() {
        seen.push(action);
    }
    assert_eq!(
        seen,
        vec![
            FlowAction::Stepped { id: 5, step: 1 },
            FlowAction::Stepped { id: 5, step: 2 },
            FlowAction::Stepped { id: 5, step: 3 },
            FlowAction::Finished { id: 5 },
        ]
    );
}
