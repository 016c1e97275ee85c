//! Integration tests for Store action broadcasting
//!
//! Request handlers wait on effect-produced actions; these tests pin down
//! which actions are observable and how concurrent waiters stay apart.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use service_portal_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use service_portal_runtime::{Store, StoreError};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

/// A request for a meeting link that takes a few provider round trips.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LinkAction {
    /// Ask for a link (command)
    Request { request_id: u64, attempts: u32 },
    /// One provider round trip finished
    Attempted { request_id: u64, attempt: u32, of: u32 },
    /// Link issued (terminal)
    Issued { request_id: u64 },
    /// Never produced; used to force timeouts
    Abandoned { request_id: u64 },
    /// Fan out to several requests at once
    Batch { request_ids: Vec<u64> },
    /// Issue after a delay
    IssueLater { request_id: u64 },
}

#[derive(Debug, Clone, Default)]
struct LinkState {
    attempts: Vec<(u64, u32)>,
    issued: Vec<u64>,
}

#[derive(Clone)]
struct LinkEnv;

#[derive(Clone)]
struct LinkReducer;

impl Reducer for LinkReducer {
    type State = LinkState;
    type Action = LinkAction;
    type Environment = LinkEnv;

    fn reduce(
        &self,
        state: &mut LinkState,
        action: LinkAction,
        _env: &LinkEnv,
    ) -> SmallVec<[Effect<LinkAction>; 4]> {
        match action {
            LinkAction::Request { request_id, attempts } => {
                smallvec![Effect::future(async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Some(LinkAction::Attempted { request_id, attempt: 1, of: attempts })
                })]
            },
            LinkAction::Attempted { request_id, attempt, of } => {
                state.attempts.push((request_id, attempt));
                if attempt < of {
                    smallvec![Effect::future(async move {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        Some(LinkAction::Attempted { request_id, attempt: attempt + 1, of })
                    })]
                } else {
                    smallvec![Effect::emit(LinkAction::Issued { request_id })]
                }
            },
            LinkAction::Issued { request_id } => {
                state.issued.push(request_id);
                smallvec![Effect::None]
            },
            LinkAction::Batch { request_ids } => smallvec![Effect::merge(
                request_ids
                    .into_iter()
                    .map(|request_id| Effect::emit(LinkAction::Issued { request_id }))
                    .collect()
            )],
            LinkAction::IssueLater { request_id } => smallvec![Effect::Delay {
                duration: Duration::from_millis(20),
                action: Box::new(LinkAction::Issued { request_id }),
            }],
            LinkAction::Abandoned { .. } => smallvec![Effect::None],
        }
    }
}

fn link_store() -> Store<LinkState, LinkAction, LinkEnv, LinkReducer> {
    Store::new(LinkState::default(), LinkReducer, LinkEnv)
}

fn issued(id: u64) -> impl Fn(&LinkAction) -> bool {
    move |action| matches!(action, LinkAction::Issued { request_id } if *request_id == id)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_wait_for_multi_step_result() {
    let store = link_store();

    let result = store
        .send_and_wait_for(
            LinkAction::Request { request_id: 42, attempts: 3 },
            issued(42),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    assert_eq!(result, LinkAction::Issued { request_id: 42 });
    let attempts = store.state(|s| s.attempts.clone()).await;
    assert_eq!(attempts, vec![(42, 1), (42, 2), (42, 3)]);
}

#[tokio::test]
async fn test_wait_times_out() {
    let store = link_store();

    let result = store
        .send_and_wait_for(
            LinkAction::Request { request_id: 9, attempts: 1 },
            |a| matches!(a, LinkAction::Abandoned { request_id: 9 }),
            Duration::from_millis(50),
        )
        .await;

    assert!(matches!(result, Err(StoreError::Timeout)));
}

#[tokio::test]
async fn test_concurrent_waiters_get_their_own_result() {
    let store = Arc::new(link_store());

    let waiters: Vec<_> = (1..=5u64)
        .map(|id| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .send_and_wait_for(
                        // Later ids finish first.
                        LinkAction::Request {
                            request_id: id,
                            attempts: 6 - u32::try_from(id).unwrap(),
                        },
                        issued(id),
                        Duration::from_secs(2),
                    )
                    .await
            })
        })
        .collect();

    for (id, waiter) in (1..=5u64).zip(waiters) {
        let result = waiter.await.unwrap().unwrap();
        assert_eq!(result, LinkAction::Issued { request_id: id });
    }

    let mut issued_ids = store.state(|s| s.issued.clone()).await;
    issued_ids.sort_unstable();
    assert_eq!(issued_ids, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_subscribers_see_every_effect_action() {
    let store = link_store();
    let mut first = store.subscribe_actions();
    let mut second = store.subscribe_actions();

    store
        .send_and_wait_for(
            LinkAction::Request { request_id: 1, attempts: 2 },
            issued(1),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    for rx in [&mut first, &mut second] {
        let mut seen = Vec::new();
        while let Ok(action) = rx.try_recv() {
            seen.push(action);
        }
        assert_eq!(
            seen,
            vec![
                LinkAction::Attempted { request_id: 1, attempt: 1, of: 2 },
                LinkAction::Attempted { request_id: 1, attempt: 2, of: 2 },
                LinkAction::Issued { request_id: 1 },
            ]
        );
    }
}

#[tokio::test]
async fn test_sent_actions_are_not_broadcast() {
    let store = link_store();
    let mut rx = store.subscribe_actions();

    let mut handle = store.send(LinkAction::Abandoned { request_id: 3 }).await.unwrap();
    handle.wait().await;

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_delayed_and_parallel_actions_are_broadcast() {
    let store = link_store();

    let delayed = store
        .send_and_wait_for(
            LinkAction::IssueLater { request_id: 11 },
            issued(11),
            Duration::from_secs(1),
        )
        .await
        .unwrap();
    assert_eq!(delayed, LinkAction::Issued { request_id: 11 });

    let mut rx = store.subscribe_actions();
    let mut handle = store
        .send(LinkAction::Batch { request_ids: vec![20, 21, 22] })
        .await
        .unwrap();
    handle.wait().await;

    let mut seen = Vec::new();
    while let Ok(LinkAction::Issued { request_id }) = rx.try_recv() {
        seen.push(request_id);
    }
    seen.sort_unstable();
    assert_eq!(seen, vec![20, 21, 22]);
}

#[tokio::test]
async fn test_lagging_subscriber_keeps_receiving() {
    let store = Store::with_broadcast_capacity(LinkState::default(), LinkReducer, LinkEnv, 2);
    let mut rx = store.subscribe_actions();

    let mut handle = store
        .send(LinkAction::Batch { request_ids: (100..110).collect() })
        .await
        .unwrap();
    handle.wait().await;

    assert!(matches!(
        rx.recv().await,
        Err(tokio::sync::broadcast::error::RecvError::Lagged(_))
    ));
    assert!(matches!(rx.recv().await, Ok(LinkAction::Issued { .. })));

    assert_eq!(store.state(|s| s.issued.len()).await, 10);
}
