use std::time::Duration;

use tokio::task::LocalSet;

use crate::internal::clock::TokioClock;
use crate::internal::common::error::PlacementError;
use crate::internal::config::{SchedulerConfig, Weights};
use crate::internal::scheduler::greedy::{GreedyCore, GreedyScheduler};
use crate::internal::tests::utils::env::TestEnv;
use crate::internal::tests::utils::node::NodeBuilder;
use crate::internal::tests::utils::request::RequestBuilder;
use crate::{NodeId, RequestId};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

#[test]
fn test_ranking_and_first_fit() {
    let mut config = SchedulerConfig::default();
    config.weights = Weights::from_risk(1.0);
    let env = TestEnv::with_config(
        config,
        vec![
            NodeBuilder::cloud(2, 4).risk(0.1).finish(),
            NodeBuilder::cloud(8, 16).risk(0.3).finish(),
            NodeBuilder::cloud(8, 16).risk(0.3).finish(),
        ],
    );
    let mut greedy = GreedyCore::new(env.into_core());
    let r = RequestBuilder::cloud(1, 4, 4).finish();
    assert_eq!(
        greedy.ranked_nodes(&r),
        vec![NodeId::new(0), NodeId::new(1), NodeId::new(2)]
    );
    // The safest node is too small; equal scores fall back to node order.
    let (_, node) = greedy.try_place(&r, Duration::ZERO).unwrap().unwrap();
    assert_eq!(node, NodeId::new(1));
    assert_eq!(greedy.metrics().admitted(), 1);
    assert_eq!(greedy.metrics().activations, 1);
    assert!(greedy.core().is_consistent());
}

#[test]
fn test_no_eligible_node_is_recoverable() {
    let env = TestEnv::new(vec![NodeBuilder::cloud(8, 16).risk(0.5).finish()]);
    let mut greedy = GreedyCore::new(env.into_core());
    let r = RequestBuilder::cloud(1, 1, 1).risk_ceiling(0.1).finish();
    let err = greedy.try_place(&r, Duration::ZERO).unwrap_err();
    assert!(matches!(err, PlacementError::NoEligibleNode(id) if id == RequestId::new(1)));
    assert!(!err.is_fatal());
}

#[tokio::test(start_paused = true)]
async fn test_release_after_lease() {
    let env = TestEnv::new(vec![NodeBuilder::edge(4, 4).finish()]);
    let local = LocalSet::new();
    local
        .run_until(async move {
            let scheduler = GreedyScheduler::new(env.into_core(), TokioClock::start());
            let r = RequestBuilder::edge(1, 2, 2).lease(HOUR).finish();
            scheduler.admit(r).await.unwrap();
            assert_eq!(scheduler.state().get().core().lifecycle().live_count(), 1);
            assert!(
                scheduler
                    .state()
                    .get()
                    .core()
                    .ledger()
                    .node(NodeId::new(0))
                    .unwrap()
                    .is_active()
            );

            tokio::time::sleep(HOUR + Duration::from_secs(1)).await;
            let state = scheduler.state().get();
            assert_eq!(state.core().lifecycle().live_count(), 0);
            let node = state.core().ledger().node(NodeId::new(0)).unwrap();
            assert!(node.is_drained());
            assert!(!node.is_active());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_backoff_until_capacity_frees() {
    let env = TestEnv::new(vec![NodeBuilder::cloud(4, 4).finish()]);
    let local = LocalSet::new();
    local
        .run_until(async move {
            let scheduler = GreedyScheduler::new(env.into_core(), TokioClock::start());
            let requests = vec![
                RequestBuilder::cloud(1, 4, 4).lease(HOUR).finish(),
                RequestBuilder::cloud(2, 4, 4)
                    .lease(HOUR)
                    .arrival_secs(1)
                    .finish(),
            ];
            let metrics = scheduler.run(requests, None).await.unwrap();
            assert_eq!(metrics.admitted(), 2);
            // Attempts at 1 s, +6, +12, +24 minutes fail; the one 48 minutes
            // later finds the node free again.
            assert_eq!(metrics.failed_attempts, 4);

            let state = scheduler.state().get();
            assert_eq!(state.failed_attempts(RequestId::new(2)), 4);
            let live = state.core().lifecycle().live();
            assert_eq!(live.len(), 1);
            assert_eq!(live[0].request().id(), RequestId::new(2));
            let start = live[0].start();
            assert!(start >= 90 * MINUTE + Duration::from_secs(1));
            assert!(start < 90 * MINUTE + Duration::from_secs(2));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_unplaceable_request_retries_with_capped_backoff() {
    let env = TestEnv::new(vec![NodeBuilder::cloud(4, 4).risk(0.9).finish()]);
    let local = LocalSet::new();
    local
        .run_until(async move {
            let scheduler = GreedyScheduler::new(env.into_core(), TokioClock::start());
            let requests = vec![RequestBuilder::cloud(1, 1, 1).risk_ceiling(0.5).finish()];
            let metrics = scheduler.run(requests, Some(10 * HOUR)).await.unwrap();
            assert_eq!(metrics.admitted(), 0);
            assert_eq!(metrics.unserved, 1);
            // 0, 6, 18, 42, 90 minutes, then hourly up to 570 minutes.
            assert_eq!(metrics.failed_attempts, 13);
            assert!(scheduler.state().get().core().is_consistent());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_greedy_metrics_are_normalized() {
    let mut config = SchedulerConfig::default();
    config.weights = Weights::from_risk(0.5);
    let env = TestEnv::with_config(
        config,
        vec![
            NodeBuilder::cloud(8, 16).risk(0.2).finish(),
            NodeBuilder::cloud(8, 16).risk(0.4).finish(),
        ],
    );
    let local = LocalSet::new();
    local
        .run_until(async move {
            let scheduler = GreedyScheduler::new(env.into_core(), TokioClock::start());
            let requests = (1..=2)
                .map(|i| RequestBuilder::cloud(i, 2, 2).arrival_secs(u64::from(i)).finish())
                .collect();
            let metrics = scheduler.run(requests, None).await.unwrap();
            assert_eq!(metrics.admitted_cloud, 2);
            // Both land on the safer node, waking it once.
            assert_eq!(metrics.activations, 1);
            assert!((metrics.raw_risk - 0.4).abs() < 1e-9);
            let breakdown = metrics.breakdown();
            assert!((breakdown.risk_cloud - 0.5).abs() < 1e-9);
            assert_eq!(breakdown.risk_edge, 0.0);
            assert!(breakdown.electricity_activation > 0.0);
        })
        .await;
}
