//! Delayed, cancellable execution of progression work.
//!
//! All pacing in the client goes through [`Scheduler`], so production code
//! runs on tokio timers while tests drive a [`ManualScheduler`] through
//! virtual time.

use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

pub type Task = BoxFuture<'static, ()>;

/// Runs a task once after a delay unless its token is cancelled first.
///
/// Cancelling the token after the delay has elapsed aborts the task at its
/// next suspension point.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, cancel: CancellationToken, task: Task);
}

/// Scheduler backed by the tokio runtime clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, cancel: CancellationToken, task: Task) {
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = async move {
                    tokio::time::sleep(delay).await;
                    task.await;
                } => {}
            }
        });
    }
}

struct Queued {
    due: Duration,
    seq: u64,
    cancel: CancellationToken,
    task: Task,
}

#[derive(Default)]
struct ManualQueue {
    now: Duration,
    seq: u64,
    queued: Vec<Queued>,
}

/// Virtual-time scheduler: nothing runs until [`ManualScheduler::advance`].
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<ManualQueue>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since construction.
    pub fn now(&self) -> Duration {
        self.queue.lock().now
    }

    /// Number of tasks still waiting to fire.
    pub fn pending(&self) -> usize {
        self.queue
            .lock()
            .queued
            .iter()
            .filter(|q| !q.cancel.is_cancelled())
            .count()
    }

    /// Delays of the waiting tasks relative to the current virtual time, soonest first.
    pub fn pending_delays(&self) -> Vec<Duration> {
        let queue = self.queue.lock();
        let mut delays: Vec<_> = queue
            .queued
            .iter()
            .filter(|q| !q.cancel.is_cancelled())
            .map(|q| q.due.saturating_sub(queue.now))
            .collect();
        delays.sort();
        delays
    }

    /// Move virtual time forward, firing every task that falls due on the way.
    ///
    /// Tasks fire in (due time, scheduling order). A task scheduled by a
    /// firing task runs in the same call if it falls inside the window.
    pub async fn advance(&self, by: Duration) {
        let target = self.queue.lock().now + by;
        loop {
            let next = {
                let mut queue = self.queue.lock();
                queue.queued.retain(|q| !q.cancel.is_cancelled());
                let idx = queue
                    .queued
                    .iter()
                    .enumerate()
                    .filter(|(_, q)| q.due <= target)
                    .min_by_key(|(_, q)| (q.due, q.seq))
                    .map(|(i, _)| i);
                match idx {
                    Some(i) => {
                        let task = queue.queued.swap_remove(i);
                        queue.now = task.due;
                        Some(task)
                    }
                    None => {
                        queue.now = target;
                        None
                    }
                }
            };
            let Some(queued) = next else {
                break;
            };
            let cancel = queued.cancel;
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = queued.task => {}
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, cancel: CancellationToken, task: Task) {
        let mut queue = self.queue.lock();
        queue.seq += 1;
        let queued = Queued {
            due: queue.now + delay,
            seq: queue.seq,
            cancel,
            task,
        };
        queue.queued.push(queued);
    }
}

/// Fixed pacing delays between orchestrated steps.
///
/// These are not network timeouts. They simulate turn-taking and give the
/// simulated players time to act.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Delay before any progression action fires.
    pub action_delay: Duration,
    /// Extra delay after a phase change so the previous phase's output settles.
    pub phase_settle: Duration,
    /// Delay between AI votes completing and resolving the vote.
    pub ai_vote_follow_up: Duration,
    /// Delay between a user vote and resolving the vote.
    pub user_vote_follow_up: Duration,
    /// How long a speaker shows as typing before its line appears.
    pub typing: Duration,
    /// Gap between consecutive speakers.
    pub speaker_gap: Duration,
    /// Delay between the game starting and AI introductions.
    pub intro_kickoff: Duration,
    /// Delay between the player's introduction and completing the phase.
    pub intro_completion: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            action_delay: Duration::from_millis(1000),
            phase_settle: Duration::from_millis(2000),
            ai_vote_follow_up: Duration::from_millis(3000),
            user_vote_follow_up: Duration::from_millis(8000),
            typing: Duration::from_millis(2000),
            speaker_gap: Duration::from_millis(1000),
            intro_kickoff: Duration::from_millis(1000),
            intro_completion: Duration::from_millis(2000),
        }
    }
}

impl Pacing {
    /// Every delay multiplied by `factor`; negative or non-finite factors yield zero delays.
    pub fn scaled(self, factor: f64) -> Self {
        let factor = if factor.is_finite() && factor > 0.0 {
            factor
        } else {
            0.0
        };
        let scale = |d: Duration| d.mul_f64(factor);
        Self {
            action_delay: scale(self.action_delay),
            phase_settle: scale(self.phase_settle),
            ai_vote_follow_up: scale(self.ai_vote_follow_up),
            user_vote_follow_up: scale(self.user_vote_follow_up),
            typing: scale(self.typing),
            speaker_gap: scale(self.speaker_gap),
            intro_kickoff: scale(self.intro_kickoff),
            intro_completion: scale(self.intro_completion),
        }
    }

    /// Offset at which speaker `index` of a sequential run starts typing.
    pub fn speaker_offset(&self, index: usize) -> Duration {
        (self.typing + self.speaker_gap) * index as u32
    }
}
