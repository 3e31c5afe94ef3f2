//! Property tests for per-turn idempotency of `observe`.
//!
//! Whatever order polls arrive in, each progression action is scheduled at
//! most once per (round, turn), and re-observing the same snapshot never
//! schedules anything.

use std::collections::HashSet;
use std::sync::Arc;

use client_test_support::{RecordingSink, ScriptedServer};
use mafia_client::{ManualScheduler, Phase, PhaseOrchestrator, ProgressAction};
use proptest::prelude::*;

use crate::common::{snapshot, LOCAL};

fn phase_strategy() -> impl Strategy<Value = Phase> {
    prop_oneof![
        Just(Phase::Waiting),
        Just(Phase::Introduction),
        Just(Phase::Night),
        Just(Phase::Day),
        Just(Phase::Voting),
    ]
}

fn orchestrator() -> PhaseOrchestrator {
    let server = Arc::new(ScriptedServer::default());
    let sink = Arc::new(RecordingSink::new());
    PhaseOrchestrator::builder(LOCAL, server, sink)
        .scheduler(Arc::new(ManualScheduler::new()))
        .build()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Property: an action is scheduled at most once per (round, turn)
    #[test]
    fn prop_each_action_scheduled_once_per_turn(
        polls in prop::collection::vec((phase_strategy(), 1u32..=4), 1..40),
    ) {
        let orch = orchestrator();
        let mut seen: HashSet<(u32, ProgressAction, u32)> = HashSet::new();

        for (phase, turn) in polls {
            let report = orch.observe(&snapshot(phase, turn));
            if let Some(action) = report.scheduled_action() {
                let round = orch.state().round;
                prop_assert!(
                    seen.insert((round, action, turn)),
                    "{:?} scheduled twice for round {} turn {}", action, round, turn
                );
            }
        }
    }

    /// Property: observing the same snapshot twice in a row schedules nothing the second time
    #[test]
    fn prop_repeated_snapshot_is_a_no_op(
        polls in prop::collection::vec((phase_strategy(), 1u32..=4), 1..40),
    ) {
        let orch = orchestrator();

        for (phase, turn) in polls {
            orch.observe(&snapshot(phase, turn));
            let pending = orch.pending_timer_count();
            let again = orch.observe(&snapshot(phase, turn));
            prop_assert_eq!(again.scheduled, None);
            prop_assert_eq!(orch.pending_timer_count(), pending);
        }
    }
}
