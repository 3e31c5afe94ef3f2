use client_test_support::Call;
use mafia_client::api::PhaseAdvance;
use mafia_client::{InputError, InputOutcome, MessageKind, Phase, VoteError};

use crate::common::{session_harness, started_session, table, PLAYER};

#[tokio::test]
async fn blank_input_is_ignored() {
    let h = started_session().await;

    let outcome = h.session.handle_input("   ").await.expect("ignored");
    assert_eq!(outcome, InputOutcome::Ignored);
}

#[tokio::test]
async fn input_without_a_game_is_rejected() {
    let h = session_harness();

    let err = h.session.handle_input("hello").await.unwrap_err();
    assert!(matches!(err, InputError::NoSession));
}

#[tokio::test]
async fn night_input_is_refused_visibly() {
    let h = started_session().await;
    h.server.set_snapshot(table(Phase::Night, 1));
    h.session.refresh().await;

    let err = h.session.handle_input("who did it?").await.unwrap_err();
    assert!(matches!(
        err,
        InputError::NotYourTurn {
            phase: Phase::Night
        }
    ));
    assert!(h
        .sink
        .system_messages()
        .iter()
        .any(|m| m.contains("not your turn")));
    assert!(h.server.chats().is_empty());
}

#[tokio::test]
async fn introduction_input_waits_for_ai_introductions() {
    let h = session_harness();
    h.session.connect().await.expect("connected");
    h.session.start(PLAYER).await.expect("game starts");

    let err = h.session.handle_input("Hi all").await.unwrap_err();
    assert!(matches!(
        err,
        InputError::NotYourTurn {
            phase: Phase::Introduction
        }
    ));
}

#[tokio::test]
async fn day_chat_is_echoed_once_and_sent() {
    let h = started_session().await;
    h.server.set_snapshot(table(Phase::Day, 1));
    h.session.refresh().await;

    let outcome = h
        .session
        .handle_input("Player2 was awfully quiet last night.")
        .await
        .expect("chat sent");
    assert_eq!(outcome, InputOutcome::Chatted);
    assert_eq!(
        h.server.chats(),
        vec!["Player2 was awfully quiet last night."]
    );

    // The server's transcript now holds the same line with the same timestamp.
    h.session.refresh().await;
    let echoed: Vec<_> = h
        .sink
        .rendered()
        .into_iter()
        .filter(|m| m.content == "Player2 was awfully quiet last night.")
        .collect();
    assert_eq!(echoed.len(), 1);
    assert_eq!(echoed[0].kind, MessageKind::Player);
    assert_eq!(echoed[0].sender.as_deref(), Some(PLAYER));
}

#[tokio::test]
async fn chat_that_advances_the_game_refreshes() {
    let h = started_session().await;
    h.server.set_snapshot(table(Phase::Day, 3));
    h.session.refresh().await;
    h.server.set_chat_auto_progress(Some(PhaseAdvance {
        phase: Phase::Voting,
        turn: 3,
        announcement: None,
    }));
    let fetches = h.server.count(&Call::FetchState);

    h.session.handle_input("Let's vote.").await.expect("chat sent");
    assert_eq!(h.server.count(&Call::FetchState), fetches + 1);
}

#[tokio::test]
async fn vote_number_maps_to_roster_without_the_local_player() {
    let h = started_session().await;
    h.server.set_snapshot(table(Phase::Voting, 3));
    h.session.refresh().await;

    let outcome = h.session.handle_input("2").await.expect("vote accepted");
    match outcome {
        InputOutcome::Voted(vote) => assert_eq!(vote.target, "Player2"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(
        h.server.submitted_votes(),
        vec![(PLAYER.to_string(), "Player2".to_string())]
    );
    assert!(h
        .sink
        .system_messages()
        .iter()
        .any(|m| m.contains("You voted for Player2")));
}

#[tokio::test]
async fn out_of_range_vote_numbers_are_rejected() {
    let h = started_session().await;
    h.server.set_snapshot(table(Phase::Voting, 3));
    h.session.refresh().await;

    for text in ["0", "4", "abc", "-1"] {
        let err = h.session.handle_input(text).await.unwrap_err();
        assert!(
            matches!(err, InputError::InvalidVoteNumber { max: 3 }),
            "{text}: {err}"
        );
    }
    assert!(h.server.submitted_votes().is_empty());
}

#[tokio::test]
async fn second_vote_while_processing_is_rejected() {
    let h = started_session().await;
    h.server.set_snapshot(table(Phase::Voting, 3));
    h.session.refresh().await;

    h.session.handle_input("1").await.expect("first vote accepted");
    let err = h.session.handle_input("3").await.unwrap_err();
    assert!(matches!(err, InputError::Vote(VoteError::AlreadyVoting)));
    assert_eq!(h.server.submitted_votes().len(), 1);
}
