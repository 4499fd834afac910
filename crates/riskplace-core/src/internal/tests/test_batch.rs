use std::time::Duration;

use crate::internal::common::error::PlacementError;
use crate::internal::config::{EdgeActivation, SchedulerConfig, UsageIndicators, Weights};
use crate::internal::request::RequestQueue;
use crate::internal::scheduler::batch::BatchFormulator;
use crate::internal::scheduler::pass::BatchScheduler;
use crate::internal::scheduler::repair::solve_with_shedding;
use crate::internal::solver::LpOutcome;
use crate::internal::solver::microlp::MicrolpBackend;
use crate::internal::tests::utils::env::TestEnv;
use crate::internal::tests::utils::node::NodeBuilder;
use crate::internal::tests::utils::request::RequestBuilder;
use crate::internal::tests::utils::solver::ScriptedBackend;
use crate::internal::tests::utils::sorted_vec;
use crate::{NodeId, RequestId, Set};

const HOUR: Duration = Duration::from_secs(3600);
const SECOND: Duration = Duration::from_secs(1);

fn two_tier_env() -> TestEnv {
    TestEnv::new(vec![
        NodeBuilder::cloud(8, 16).risk(0.2).finish(),
        NodeBuilder::edge(4, 4).risk(0.5).finish(),
    ])
}

#[test]
fn test_cloud_and_edge_pass_lifecycle() {
    let mut env = two_tier_env();
    let mut scheduler = BatchScheduler::new(MicrolpBackend);
    let arrivals = vec![
        RequestBuilder::cloud(1, 4, 8)
            .risk_ceiling(0.3)
            .lease(2 * HOUR)
            .group(1)
            .finish(),
        RequestBuilder::edge(2, 2, 2)
            .risk_ceiling(0.6)
            .lease(HOUR)
            .group(1)
            .finish(),
    ];

    let report = scheduler
        .run_pass(env.core_mut(), arrivals, Duration::ZERO)
        .unwrap();
    assert_eq!(
        sorted_vec(report.committed.clone()),
        vec![
            (RequestId::new(1), NodeId::new(0)),
            (RequestId::new(2), NodeId::new(1))
        ]
    );
    assert!(report.shed.is_empty());
    assert_eq!(report.submissions, 1);
    assert!(env.node(0).is_active());
    assert_eq!(env.node(0).available_cpu(), 4);
    assert_eq!(env.node(1).available_memory(), 2);
    env.check_consistency();

    let report = scheduler
        .run_pass(env.core_mut(), vec![], HOUR + SECOND)
        .unwrap();
    assert_eq!(report.reclaimed, 1);
    assert!(env.node(1).is_drained());
    assert!(env.node(0).is_active());
    env.check_consistency();

    let report = scheduler
        .run_pass(env.core_mut(), vec![], 2 * HOUR + SECOND)
        .unwrap();
    assert_eq!(report.reclaimed, 1);
    assert!(env.node(0).is_drained());
    assert!(!env.node(0).is_active());
    env.check_consistency();
}

#[test]
fn test_risk_weight_picks_safest_node() {
    let mut config = SchedulerConfig::default();
    config.weights = Weights::from_risk(1.0);
    let mut env = TestEnv::with_config(
        config,
        vec![
            NodeBuilder::cloud(8, 16).risk(0.4).finish(),
            NodeBuilder::cloud(8, 16).risk(0.2).finish(),
        ],
    );
    let mut scheduler = BatchScheduler::new(MicrolpBackend);
    let report = scheduler
        .run_pass(
            env.core_mut(),
            vec![RequestBuilder::cloud(1, 2, 2).finish()],
            Duration::ZERO,
        )
        .unwrap();
    assert_eq!(report.committed, vec![(RequestId::new(1), NodeId::new(1))]);
    // 0.2 / (1 pod * max risk 0.4)
    assert!((report.breakdown.risk_cloud - 0.5).abs() < 1e-9);
    assert!((report.risk - 0.25).abs() < 1e-9);
    assert!((report.objective - 0.25).abs() < 1e-9);
}

#[test]
fn test_prefers_already_active_node() {
    let mut config = SchedulerConfig::default();
    config.weights = Weights::from_risk(0.0);
    let mut env = TestEnv::with_config(
        config,
        vec![
            NodeBuilder::cloud(8, 16).finish(),
            NodeBuilder::cloud(8, 16).activation(true).finish(),
        ],
    );
    let mut scheduler = BatchScheduler::new(MicrolpBackend);
    let report = scheduler
        .run_pass(
            env.core_mut(),
            vec![RequestBuilder::cloud(1, 2, 2).finish()],
            Duration::ZERO,
        )
        .unwrap();
    assert_eq!(report.committed, vec![(RequestId::new(1), NodeId::new(1))]);
    assert_eq!(report.breakdown.electricity_activation, 0.0);
    assert!(!env.node(0).is_active());
    env.check_consistency();
}

#[test]
fn test_capacity_splits_batch() {
    let mut env = TestEnv::new(vec![
        NodeBuilder::cloud(8, 16).finish(),
        NodeBuilder::cloud(8, 16).finish(),
    ]);
    let mut scheduler = BatchScheduler::new(MicrolpBackend);
    let arrivals = (1..=2)
        .map(|i| RequestBuilder::cloud(i, 6, 4).finish())
        .collect();
    let report = scheduler
        .run_pass(env.core_mut(), arrivals, Duration::ZERO)
        .unwrap();
    let nodes: Set<NodeId> = report.committed.iter().map(|(_, n)| *n).collect();
    assert_eq!(nodes.len(), 2);
    assert!(env.node(0).is_active() && env.node(1).is_active());
    env.check_consistency();
}

#[test]
fn test_exactly_one_assignment() {
    let env = TestEnv::new(vec![
        NodeBuilder::cloud(16, 32).risk(0.1).finish(),
        NodeBuilder::cloud(16, 32).risk(0.3).finish(),
        NodeBuilder::edge(4, 8).risk(0.4).region(1).finish(),
        NodeBuilder::edge(4, 8).risk(0.4).region(2).finish(),
    ]);
    let mut arrivals = Vec::new();
    for i in 0..6 {
        arrivals.push(RequestBuilder::cloud(i, 3, 4).group(i / 2).finish());
    }
    for i in 6..10 {
        arrivals.push(
            RequestBuilder::edge(i, 1, 2)
                .region(1 + i % 2)
                .group(i / 2)
                .finish(),
        );
    }
    let core = env.core();
    let outcome = solve_with_shedding(core, &MicrolpBackend, arrivals.clone()).unwrap();
    assert!(outcome.shed.is_empty());
    let assignment = outcome.assignment.unwrap();
    assert_eq!(assignment.placements.len(), arrivals.len());
    let placed: Set<RequestId> = assignment.placements.iter().map(|(r, _)| *r).collect();
    assert_eq!(placed.len(), arrivals.len());
    for (request_id, node_id) in &assignment.placements {
        let request = arrivals.iter().find(|r| r.id() == *request_id).unwrap();
        let node = core.ledger().node(*node_id).unwrap();
        assert!(core.filter().is_eligible(request, node));
    }
}

#[test]
fn test_model_shape() {
    let env = two_tier_env();
    let requests = vec![
        RequestBuilder::cloud(1, 1, 1).finish(),
        RequestBuilder::edge(2, 1, 1).finish(),
    ];
    let core = env.core();
    let model = BatchFormulator::new(core).formulate(core.ledger(), &requests);
    assert_eq!(model.pairs().len(), 2);
    assert_eq!(model.n_indicators(), 1);
    assert_eq!(model.lp().n_variables(), 3);
    // 2 unicity, 2x2 capacity, 2 linking rows of the cloud node
    assert_eq!(model.lp().n_constraints(), 8);
    assert!(!model.is_trivially_infeasible());

    let mut config = SchedulerConfig::default();
    config.usage_indicators = UsageIndicators::AllTiers;
    let env = TestEnv::with_config(
        config,
        vec![
            NodeBuilder::cloud(8, 16).risk(0.2).finish(),
            NodeBuilder::edge(4, 4).risk(0.5).finish(),
        ],
    );
    let core = env.core();
    let model = BatchFormulator::new(core).formulate(core.ledger(), &requests);
    assert_eq!(model.n_indicators(), 2);
}

#[test]
fn test_request_without_candidates_is_shed_without_solving() {
    let env = two_tier_env();
    let backend = ScriptedBackend::new(vec![]);
    let requests = vec![
        RequestBuilder::cloud(1, 1, 1).group(1).finish(),
        RequestBuilder::cloud(2, 1, 1).risk_ceiling(0.05).group(2).finish(),
    ];
    let core = env.core();
    let model = BatchFormulator::new(core).formulate(core.ledger(), &requests);
    assert!(model.is_trivially_infeasible());
    assert_eq!(model.unplaceable(), &[RequestId::new(2)]);

    let outcome = solve_with_shedding(env.core(), &backend, requests).unwrap();
    // Only the batch without request 2 reached the solver.
    assert_eq!(backend.calls(), 1);
    assert_eq!(outcome.submissions, 1);
    assert_eq!(outcome.shed.len(), 1);
    assert_eq!(outcome.shed[0].id(), RequestId::new(2));
}

#[test]
fn test_shed_cohort_is_carried_over() {
    let mut env = two_tier_env();
    let mut scheduler = BatchScheduler::new(MicrolpBackend);
    let arrivals = vec![
        RequestBuilder::cloud(1, 1, 1).group(1).finish(),
        RequestBuilder::cloud(2, 1, 1).risk_ceiling(0.05).group(2).finish(),
        RequestBuilder::cloud(3, 1, 1).group(2).finish(),
    ];
    let report = scheduler
        .run_pass(env.core_mut(), arrivals, Duration::ZERO)
        .unwrap();
    assert_eq!(report.committed, vec![(RequestId::new(1), NodeId::new(0))]);
    assert_eq!(
        sorted_vec(report.shed.clone()),
        vec![RequestId::new(2), RequestId::new(3)]
    );
    assert_eq!(scheduler.carry_over().len(), 2);

    // The cohort stays infeasible and keeps being carried.
    let report = scheduler.run_pass(env.core_mut(), vec![], HOUR).unwrap();
    assert!(report.committed.is_empty());
    assert_eq!(report.shed.len(), 2);
    assert_eq!(report.submissions, 0);
    assert_eq!(scheduler.carry_over().len(), 2);
}

#[test]
fn test_shedding_terminates() {
    let env = TestEnv::new(vec![NodeBuilder::cloud(8, 16).finish()]);
    let arrivals: Vec<_> = (1..=3)
        .map(|i| RequestBuilder::cloud(i, 8, 1).group(i).finish())
        .collect();
    let groups = arrivals.iter().cloned().collect::<RequestQueue>().group_count();
    let outcome = solve_with_shedding(env.core(), &MicrolpBackend, arrivals).unwrap();
    assert_eq!(groups, 3);
    assert!(outcome.submissions as usize <= groups);
    assert_eq!(outcome.survivors.len(), 1);
    assert_eq!(outcome.survivors[0].id(), RequestId::new(1));
    let shed: Vec<_> = outcome.shed.iter().map(|r| r.id().as_num()).collect();
    assert_eq!(shed, vec![3, 2]);
    assert!(outcome.assignment.is_some());
}

#[test]
fn test_everything_shed_yields_noop_pass() {
    let mut env = two_tier_env();
    let mut scheduler = BatchScheduler::new(ScriptedBackend::new(vec![
        LpOutcome::infeasible(),
        LpOutcome::infeasible(),
    ]));
    let arrivals = vec![
        RequestBuilder::cloud(1, 1, 1).group(1).finish(),
        RequestBuilder::cloud(2, 1, 1).group(2).finish(),
    ];
    let report = scheduler
        .run_pass(env.core_mut(), arrivals, Duration::ZERO)
        .unwrap();
    assert!(report.committed.is_empty());
    assert_eq!(report.shed.len(), 2);
    assert_eq!(report.objective, 0.0);
    assert_eq!(env.core().lifecycle().live_count(), 0);
    env.check_consistency();
}

#[test]
fn test_batch_below_every_risk_is_fully_carried() {
    let mut env = two_tier_env();
    let mut scheduler = BatchScheduler::new(MicrolpBackend);
    let arrivals = vec![
        RequestBuilder::cloud(1, 2, 2).risk_ceiling(0.1).group(1).finish(),
        RequestBuilder::edge(2, 1, 1).risk_ceiling(0.1).group(1).finish(),
        RequestBuilder::cloud(3, 2, 2).risk_ceiling(0.1).group(2).finish(),
    ];
    let report = scheduler
        .run_pass(env.core_mut(), arrivals, Duration::ZERO)
        .unwrap();

    assert!(report.committed.is_empty());
    assert_eq!(report.submissions, 0);
    assert_eq!(report.objective, 0.0);
    // Newest cohort first.
    let shed: Vec<_> = report.shed.iter().map(|id| id.as_num()).collect();
    assert_eq!(shed, vec![3, 1, 2]);
    let queued: Vec<_> = scheduler.carry_over().iter().map(|r| r.id().as_num()).collect();
    assert_eq!(queued, vec![3, 1, 2]);

    assert_eq!(env.core().lifecycle().live_count(), 0);
    assert_eq!(env.core().ledger().total_reserved(), (0, 0));
    for id in 0..2 {
        assert!(env.node(id).is_drained());
        assert!(!env.node(id).is_active());
    }
    env.check_consistency();
}

#[test]
fn test_exclusive_edge_is_checked_before_the_solve() {
    let mut config = SchedulerConfig::default();
    config.eligibility.edge_activation = EdgeActivation::Exclusive;
    let mut env = TestEnv::with_config(config, vec![NodeBuilder::edge(4, 4).risk(0.5).finish()]);
    let mut scheduler = BatchScheduler::new(MicrolpBackend);
    let edge_pod = |id| {
        RequestBuilder::edge(id, 1, 1)
            .risk_ceiling(0.6)
            .lease(HOUR)
            .group(id)
            .finish()
    };

    // Both pods of one batch may share the inactive node.
    let report = scheduler
        .run_pass(env.core_mut(), vec![edge_pod(1), edge_pod(2)], Duration::ZERO)
        .unwrap();
    assert_eq!(
        sorted_vec(report.committed.clone()),
        vec![
            (RequestId::new(1), NodeId::new(0)),
            (RequestId::new(2), NodeId::new(0))
        ]
    );
    assert!(env.node(0).is_active());

    // A later batch sees the node as active.
    let report = scheduler
        .run_pass(env.core_mut(), vec![edge_pod(3)], SECOND)
        .unwrap();
    assert!(report.committed.is_empty());
    assert_eq!(report.shed, vec![RequestId::new(3)]);
    assert_eq!(env.node(0).available_cpu(), 2);
    env.check_consistency();
}

#[test]
fn test_inconsistent_solution_is_rejected() {
    let env = TestEnv::new(vec![
        NodeBuilder::cloud(8, 16).finish(),
        NodeBuilder::cloud(8, 16).finish(),
    ]);
    // Variables: x(1,0), x(1,1), y0, y1; request 1 placed twice.
    let backend = ScriptedBackend::new(vec![LpOutcome::optimal(vec![1.0, 1.0, 1.0, 1.0], 0.0)]);
    let err = solve_with_shedding(
        env.core(),
        &backend,
        vec![RequestBuilder::cloud(1, 1, 1).finish()],
    )
    .unwrap_err();
    assert!(matches!(err, PlacementError::SolverError(_)));
}
