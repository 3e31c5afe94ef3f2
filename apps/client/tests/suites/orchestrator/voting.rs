use client_test_support::Call;
use mafia_client::{ClientError, Phase, ProgressAction, SkipReason, VoteError};

use crate::common::{harness, ms, snapshot};

#[tokio::test]
async fn user_vote_resolves_after_follow_up_delay() {
    let h = harness();
    // Leave only the user-vote chain able to resolve the vote.
    h.server.fail("ai_vote");

    h.orchestrator.observe(&snapshot(Phase::Voting, 3));
    let outcome = h.orchestrator.submit_vote("B").await.expect("vote accepted");
    assert_eq!(outcome.voter, "A");
    assert_eq!(outcome.target, "B");
    assert_eq!(outcome.follow_up_in, ms(8000));
    assert_eq!(
        h.server.submitted_votes(),
        vec![("A".to_string(), "B".to_string())]
    );

    let second = h.orchestrator.submit_vote("C").await;
    assert!(matches!(second, Err(VoteError::AlreadyVoting)));
    assert_eq!(h.server.submitted_votes().len(), 1);

    h.scheduler.advance(ms(7999)).await;
    assert_eq!(h.server.count(&Call::AutoProgress), 0);
    assert!(h.orchestrator.is_voting_in_flight());

    h.scheduler.advance(ms(1)).await;
    assert_eq!(h.server.count(&Call::AutoProgress), 1);
    assert!(!h.orchestrator.is_voting_in_flight());
    assert_eq!(h.sink.input_enabled(), Some(true));
}

#[tokio::test]
async fn ai_and_user_chains_resolve_the_vote_once() {
    let h = harness();

    h.orchestrator.observe(&snapshot(Phase::Voting, 3));
    h.orchestrator.submit_vote("C").await.expect("vote accepted");

    // AI vote at 1s resolves at 4s; the user chain at 8s finds it resolved.
    h.scheduler.advance(ms(10_000)).await;
    assert_eq!(h.server.count(&Call::AiVote), 1);
    assert_eq!(h.server.count(&Call::AutoProgress), 1);
    assert!(
        h.orchestrator
            .state()
            .is_claimed(ProgressAction::AutoProgressVoting, 3)
    );
}

#[tokio::test]
async fn polls_during_a_vote_do_not_schedule_ai_votes() {
    let h = harness();

    h.orchestrator.observe(&snapshot(Phase::Voting, 3));
    h.orchestrator.submit_vote("B").await.expect("vote accepted");

    let report = h.orchestrator.observe(&snapshot(Phase::Voting, 3));
    assert_eq!(report.scheduled, None);
    assert_eq!(report.skipped, Some(SkipReason::VoteInFlight));
}

#[tokio::test]
async fn invalid_targets_never_reach_the_server() {
    let h = harness();
    h.orchestrator
        .observe(&snapshot(Phase::Voting, 3).with_eliminated(["D"]));

    for target in ["Z", "A", "D"] {
        let err = h.orchestrator.submit_vote(target).await.unwrap_err();
        assert!(
            matches!(err, VoteError::InvalidTarget { .. }),
            "{target}: {err}"
        );
    }
    assert!(h.server.submitted_votes().is_empty());
    assert!(!h.orchestrator.is_voting_in_flight());
}

#[tokio::test]
async fn vote_before_any_snapshot_is_invalid() {
    let h = harness();

    let err = h.orchestrator.submit_vote("B").await.unwrap_err();
    assert!(matches!(err, VoteError::InvalidTarget { .. }));
}

#[tokio::test]
async fn refused_vote_clears_the_guard_and_reopens_input() {
    let h = harness();
    h.server.set_vote_accepted(false);
    h.orchestrator.observe(&snapshot(Phase::Voting, 3));

    let err = h.orchestrator.submit_vote("B").await.unwrap_err();
    assert!(matches!(
        err,
        VoteError::Network(ClientError::Rejected { .. })
    ));
    assert!(!h.orchestrator.is_voting_in_flight());
    assert_eq!(
        h.sink.input_states().last().map(|(enabled, _)| *enabled),
        Some(true)
    );
    assert_eq!(h.orchestrator.pending_timer_count(), 1, "only the AI vote");
}

#[tokio::test]
async fn failed_vote_can_be_retried() {
    let h = harness();
    h.server.fail("submit_vote");
    h.orchestrator.observe(&snapshot(Phase::Voting, 3));

    let err = h.orchestrator.submit_vote("B").await.unwrap_err();
    assert!(matches!(err, VoteError::Network(ClientError::Network { .. })));
    assert!(!h.orchestrator.is_voting_in_flight());

    h.server.recover("submit_vote");
    h.orchestrator.submit_vote("B").await.expect("retry accepted");
    assert_eq!(h.server.submitted_votes().len(), 2);
}

#[tokio::test]
async fn input_is_disabled_while_the_vote_is_processed() {
    let h = harness();
    h.orchestrator.observe(&snapshot(Phase::Voting, 3));

    h.orchestrator.submit_vote("B").await.expect("vote accepted");
    assert_eq!(
        h.sink.input_states().last(),
        Some(&(false, "Processing vote...".to_string()))
    );
}

#[tokio::test]
async fn votes_after_teardown_never_reach_the_server() {
    let h = harness();

    h.orchestrator.observe(&snapshot(Phase::Voting, 3));
    h.orchestrator.teardown();

    let result = h.orchestrator.submit_vote("B").await;
    assert!(matches!(result, Err(VoteError::InvalidTarget { .. })));
    assert!(h.server.submitted_votes().is_empty());
    assert!(!h.orchestrator.is_voting_in_flight());
}
