use std::time::Duration;

use client_test_support::Call;
use mafia_client::{InputError, MessageKind, Phase, ProgressAction, SkipReason};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::common::{line, ms, session_harness, started_session, table, PLAYER};

#[tokio::test]
async fn start_requires_a_connection() {
    let h = session_harness();

    let err = h.session.start(PLAYER).await.unwrap_err();
    assert!(matches!(err, InputError::NotConnected));
    assert_eq!(h.server.count(&Call::StartGame { player_name: PLAYER.into() }), 0);
}

#[tokio::test]
async fn unreachable_server_is_reported() {
    let h = session_harness();
    h.server.fail("check_connection");

    assert!(h.session.connect().await.is_err());
    assert!(!h.session.is_connected());
    assert!(h
        .sink
        .system_messages()
        .iter()
        .any(|m| m.contains("Could not reach the game server")));
}

#[tokio::test]
async fn invalid_names_are_rejected_before_starting() {
    let h = session_harness();
    h.session.connect().await.expect("connected");

    for name in ["", "bad name", "waytoolongname", "x!"] {
        let err = h.session.start(name).await.unwrap_err();
        assert!(matches!(err, InputError::InvalidName { .. }), "{name:?}");
    }
    assert!(h.session.orchestrator().is_none());
    assert!(!h
        .server
        .calls()
        .iter()
        .any(|c| matches!(c, Call::StartGame { .. })));
}

#[tokio::test]
async fn start_presents_ai_introductions_then_opens_input() {
    let h = session_harness();
    h.server.set_ai_introductions(vec![
        line("Player1", "Hi, I run the bakery.", "t1"),
        line("Player2", "I fix boats.", "t2"),
    ]);
    h.session.connect().await.expect("connected");

    let started = h.session.start("  Alice ").await.expect("game starts");
    assert_eq!(started.players.len(), 4);
    assert_eq!(h.session.player_name().as_deref(), Some(PLAYER));
    assert_eq!(
        h.server.count(&Call::StartGame { player_name: PLAYER.into() }),
        1
    );
    assert_eq!(h.server.count(&Call::FetchState), 1);
    assert_eq!(h.sink.input_enabled(), Some(false));

    // Introductions start after 1s; two speakers finish 5s later.
    h.scheduler.advance(ms(1000)).await;
    assert_eq!(h.server.count(&Call::AiIntroductionSequential), 1);
    assert_eq!(h.sink.typing(), vec!["Player1"]);
    assert_eq!(h.sink.input_enabled(), Some(false));

    h.scheduler.advance(ms(5000)).await;
    assert_eq!(h.sink.count_containing("bakery"), 1);
    assert_eq!(h.sink.count_containing("boats"), 1);
    assert_eq!(
        h.sink.input_states().last(),
        Some(&(true, Phase::Introduction.input_hint().to_string()))
    );
}

#[tokio::test]
async fn introduction_completes_and_night_takes_over() {
    let h = started_session().await;
    h.server.then_progress_to(table(Phase::Night, 1));

    h.session.handle_input("Hello, I am Alice.").await.expect("introduced");
    assert_eq!(h.sink.count_containing("Hello, I am Alice."), 1);
    assert_eq!(h.sink.input_enabled(), Some(false));

    h.scheduler.advance(ms(2000)).await;
    assert_eq!(h.server.count(&Call::CompleteIntroduction), 1);
    assert_eq!(h.server.snapshot().phase, Phase::Night);

    let report = h.session.refresh().await.expect("state fetched");
    assert!(report.phase_changed);
    assert_eq!(
        report.scheduled_action(),
        Some(ProgressAction::AutoProgressNight)
    );
    assert_eq!(report.scheduled.map(|s| s.delay), Some(ms(3000)));
    assert_eq!(h.sink.input_enabled(), Some(false));
}

#[tokio::test]
async fn refresh_renders_each_history_entry_once() {
    let h = started_session().await;
    h.server.push_history("moderator", "Night falls over the village.", "t9");

    h.session.refresh().await;
    h.session.refresh().await;

    let rendered = h.sink.rendered();
    let moderator: Vec<_> = rendered
        .iter()
        .filter(|m| m.content == "Night falls over the village.")
        .collect();
    assert_eq!(moderator.len(), 1);
    assert_eq!(moderator[0].kind, MessageKind::Moderator);
}

#[tokio::test]
async fn failed_fetch_means_no_progression_this_tick() {
    let h = started_session().await;
    h.server.set_snapshot(table(Phase::Night, 1));
    h.server.fail("fetch_state");

    assert!(h.session.refresh().await.is_none());
    assert_eq!(h.session.orchestrator().map(|o| o.pending_timer_count()), Some(0));

    h.server.recover("fetch_state");
    let report = h.session.refresh().await.expect("state fetched");
    assert_eq!(
        report.scheduled_action(),
        Some(ProgressAction::AutoProgressNight)
    );
}

#[tokio::test]
async fn game_over_ends_the_session() {
    let h = started_session().await;
    h.server.set_snapshot(table(Phase::GameOver, 4));

    let report = h.session.refresh().await.expect("state fetched");
    assert!(report.session_ended);
    assert!(h.session.is_ended());
    assert_eq!(h.sink.input_enabled(), Some(false));

    let after = h.session.refresh().await.expect("state fetched");
    assert_eq!(after.skipped, Some(SkipReason::TornDown));
}

#[tokio::test]
async fn restarting_tears_down_the_previous_game() {
    let h = started_session().await;
    let first = h.session.orchestrator().expect("first game");

    h.session.start(PLAYER).await.expect("second game starts");
    let second = h.session.orchestrator().expect("second game");

    assert!(first.is_torn_down());
    assert!(!second.is_torn_down());
}

#[tokio::test]
async fn usage_stats_pass_through() {
    let h = session_harness();

    let stats = h.session.usage_stats().await.expect("stats");
    assert_eq!(stats["total_calls"], 0);
    h.session.reset_usage_stats().await.expect("reset");
    assert_eq!(h.server.count(&Call::UsageStats), 1);
    assert_eq!(h.server.count(&Call::ResetUsageStats), 1);
}

#[tokio::test]
async fn run_loop_stops_when_the_game_ends() {
    let h = started_session().await;
    h.server.set_snapshot(table(Phase::GameOver, 4));
    let (_tx, rx) = mpsc::channel(4);

    let finished = tokio::time::timeout(
        Duration::from_secs(5),
        h.session.run(rx, CancellationToken::new()),
    )
    .await;
    assert!(finished.is_ok());
    assert!(h.session.is_ended());
}

#[tokio::test]
async fn run_loop_stops_on_shutdown_and_tears_down() {
    let h = started_session().await;
    h.server.set_snapshot(table(Phase::Night, 1));
    let (_tx, rx) = mpsc::channel(4);
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let finished =
        tokio::time::timeout(Duration::from_secs(5), h.session.run(rx, shutdown)).await;
    assert!(finished.is_ok());
    let orchestrator = h.session.orchestrator().expect("game started");
    assert!(orchestrator.is_torn_down());
    assert_eq!(orchestrator.pending_timer_count(), 0);
}

#[tokio::test]
async fn run_loop_feeds_input_lines() {
    let h = started_session().await;
    h.server.set_snapshot(table(Phase::Day, 1));
    h.session.refresh().await;
    let (tx, rx) = mpsc::channel(4);
    tx.send("Player3 is too quiet.".to_string())
        .await
        .expect("queued");
    drop(tx);

    let finished = tokio::time::timeout(
        Duration::from_secs(5),
        h.session.run(rx, CancellationToken::new()),
    )
    .await;
    assert!(finished.is_ok());
    assert_eq!(h.server.chats(), vec!["Player3 is too quiet."]);
}

#[tokio::test]
async fn run_loop_keeps_going_after_a_rejected_line() {
    let h = started_session().await;
    h.server.set_snapshot(table(Phase::Voting, 1));
    h.session.refresh().await;
    let (tx, rx) = mpsc::channel(4);
    tx.send("9".to_string()).await.expect("queued");
    tx.send("1".to_string()).await.expect("queued");
    drop(tx);

    let finished = tokio::time::timeout(
        Duration::from_secs(5),
        h.session.run(rx, CancellationToken::new()),
    )
    .await;
    assert!(finished.is_ok());
    assert_eq!(h.sink.count_containing("Enter a number between 1 and 3"), 1);
    assert_eq!(
        h.server.submitted_votes(),
        vec![(PLAYER.to_string(), "Player1".to_string())]
    );
}
