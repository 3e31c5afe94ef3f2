use client_test_support::Call;
use mafia_client::{Phase, ProgressAction, SkipReason};

use crate::common::{harness, ms, snapshot};

#[tokio::test]
async fn failed_night_progress_is_retried_on_next_poll() {
    let h = harness();
    h.server.fail("auto_progress");

    h.orchestrator.observe(&snapshot(Phase::Night, 1));
    h.scheduler.advance(ms(1000)).await;
    assert_eq!(h.server.count(&Call::AutoProgress), 1);
    assert!(
        !h.orchestrator
            .state()
            .is_claimed(ProgressAction::AutoProgressNight, 1)
    );

    h.server.recover("auto_progress");
    let retry = h.orchestrator.observe(&snapshot(Phase::Night, 1));
    assert_eq!(
        retry.scheduled_action(),
        Some(ProgressAction::AutoProgressNight)
    );
    h.scheduler.advance(ms(1000)).await;
    assert_eq!(h.server.count(&Call::AutoProgress), 2);
}

#[tokio::test]
async fn failed_ai_speech_restores_previous_turn() {
    let h = harness();

    h.orchestrator.observe(&snapshot(Phase::Day, 1));
    h.scheduler.advance(ms(1000)).await;
    assert_eq!(h.orchestrator.state().last_ai_speech_turn, Some(1));

    h.server.fail("ai_speak_sequential");
    h.orchestrator.observe(&snapshot(Phase::Day, 2));
    assert_eq!(h.orchestrator.state().last_ai_speech_turn, Some(2));
    h.scheduler.advance(ms(1000)).await;
    assert_eq!(h.orchestrator.state().last_ai_speech_turn, Some(1));

    h.server.recover("ai_speak_sequential");
    let retry = h.orchestrator.observe(&snapshot(Phase::Day, 2));
    assert_eq!(
        retry.scheduled_action(),
        Some(ProgressAction::AiSpeakSequential)
    );
    h.scheduler.advance(ms(1000)).await;
    assert_eq!(h.server.count(&Call::AiSpeakSequential), 3);
    assert_eq!(h.orchestrator.state().last_ai_speech_turn, Some(2));
}

#[tokio::test]
async fn failed_ai_vote_is_retried_and_never_resolves_early() {
    let h = harness();
    h.server.fail("ai_vote");

    h.orchestrator.observe(&snapshot(Phase::Voting, 3));
    h.scheduler.advance(ms(5000)).await;
    assert_eq!(h.server.count(&Call::AiVote), 1);
    assert_eq!(h.server.count(&Call::AutoProgress), 0);

    h.server.recover("ai_vote");
    let retry = h.orchestrator.observe(&snapshot(Phase::Voting, 3));
    assert_eq!(retry.scheduled_action(), Some(ProgressAction::AiVote));
    h.scheduler.advance(ms(4000)).await;
    assert_eq!(h.server.count(&Call::AiVote), 2);
    assert_eq!(h.server.count(&Call::AutoProgress), 1);
}

#[tokio::test]
async fn failed_vote_resolution_can_be_resolved_by_the_other_chain() {
    let h = harness();
    h.server.fail("auto_progress");

    h.orchestrator.observe(&snapshot(Phase::Voting, 3));
    h.orchestrator.submit_vote("B").await.expect("vote accepted");

    // The AI chain fails at 4s and releases the claim.
    h.scheduler.advance(ms(5000)).await;
    assert_eq!(h.server.count(&Call::AutoProgress), 1);

    h.server.recover("auto_progress");
    h.scheduler.advance(ms(3000)).await;
    assert_eq!(h.server.count(&Call::AutoProgress), 2);
    assert!(
        h.orchestrator
            .state()
            .is_claimed(ProgressAction::AutoProgressVoting, 3)
    );
}

#[tokio::test]
async fn failed_vote_resolution_is_retried_without_a_user_vote() {
    let h = harness();
    h.server.fail("auto_progress");

    // AI votes at 1s, resolution fails at 4s.
    h.orchestrator.observe(&snapshot(Phase::Voting, 3));
    h.scheduler.advance(ms(5000)).await;
    assert_eq!(h.server.count(&Call::AiVote), 1);
    assert_eq!(h.server.count(&Call::AutoProgress), 1);

    h.server.recover("auto_progress");
    let retry = h.orchestrator.observe(&snapshot(Phase::Voting, 3));
    assert_eq!(
        retry.scheduled_action(),
        Some(ProgressAction::AutoProgressVoting)
    );
    assert_eq!(retry.scheduled.map(|s| s.delay), Some(ms(3000)));

    let again = h.orchestrator.observe(&snapshot(Phase::Voting, 3));
    assert_eq!(again.skipped, Some(SkipReason::AlreadyTriggered));

    h.scheduler.advance(ms(3000)).await;
    assert_eq!(h.server.count(&Call::AutoProgress), 2);
    assert_eq!(h.server.count(&Call::AiVote), 1);
    assert!(
        h.orchestrator
            .state()
            .is_claimed(ProgressAction::AutoProgressVoting, 3)
    );

    let settled = h.orchestrator.observe(&snapshot(Phase::Voting, 3));
    assert_eq!(settled.scheduled, None);
    h.scheduler.advance(ms(10_000)).await;
    assert_eq!(h.server.count(&Call::AutoProgress), 2);
}
