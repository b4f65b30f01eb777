// src/session/timer.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};

/// Event delivered on the receiver returned by [`ExamTimer::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Expired,
}

#[derive(Debug, Default)]
struct TimerShared {
    remaining: AtomicU64,
    paused: AtomicBool,
    cancelled: AtomicBool,
}

/// Cancellable countdown clock with pause/resume semantics.
///
/// Ticks once per wall-clock second while not paused and emits exactly one
/// `Expired` event when the countdown reaches zero, after which it stops.
/// `cancel` is idempotent, safe before `start`, and guarantees no event is
/// delivered afterwards even if a tick was already scheduled: the cancelled
/// flag is re-checked inside the tick before any send.
#[derive(Debug)]
pub struct ExamTimer {
    shared: Arc<TimerShared>,
    handle: Option<JoinHandle<()>>,
}

impl ExamTimer {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(TimerShared::default()),
            handle: None,
        }
    }

    /// Starts the countdown and returns the channel the single `Expired`
    /// event arrives on. Restarting replaces any previous countdown.
    pub fn start(&mut self, duration_seconds: u64) -> mpsc::UnboundedReceiver<TimerEvent> {
        self.cancel();

        let shared = Arc::new(TimerShared {
            remaining: AtomicU64::new(duration_seconds),
            paused: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
        });
        self.shared = shared.clone();

        let (tx, rx) = mpsc::unbounded_channel();
        self.handle = Some(tokio::spawn(async move {
            if shared.remaining.load(Ordering::SeqCst) == 0 {
                if !shared.cancelled.load(Ordering::SeqCst) {
                    let _ = tx.send(TimerEvent::Expired);
                }
                return;
            }
            loop {
                sleep(Duration::from_secs(1)).await;
                if shared.cancelled.load(Ordering::SeqCst) {
                    return;
                }
                if shared.paused.load(Ordering::SeqCst) {
                    continue;
                }
                let left = shared.remaining.load(Ordering::SeqCst).saturating_sub(1);
                shared.remaining.store(left, Ordering::SeqCst);
                if left == 0 {
                    if !shared.cancelled.load(Ordering::SeqCst) {
                        let _ = tx.send(TimerEvent::Expired);
                    }
                    return;
                }
            }
        }));

        rx
    }

    /// Freezes the remaining count. Seconds spent paused do not shrink or
    /// grow the countdown.
    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::SeqCst);
    }

    /// Continues from the frozen count.
    pub fn resume(&self) {
        self.shared.paused.store(false, Ordering::SeqCst);
    }

    /// Stops the countdown for good. No tick or `Expired` event is
    /// delivered after this returns. Callable any number of times, from
    /// any state.
    pub fn cancel(&mut self) {
        self.shared.cancelled.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.shared.remaining.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::SeqCst)
    }
}

impl Default for ExamTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ExamTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    async fn tick_seconds(n: u64) {
        for _ in 0..n {
            // Let the timer task register its sleep before moving the clock.
            tokio::task::yield_now().await;
            advance(Duration::from_secs(1)).await;
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn expires_exactly_once_after_the_full_duration() {
        let mut timer = ExamTimer::new();
        let mut rx = timer.start(5);

        tick_seconds(4).await;
        assert!(rx.try_recv().is_err(), "must not expire early");
        assert_eq!(timer.remaining_seconds(), 1);

        tick_seconds(1).await;
        assert!(matches!(rx.try_recv(), Ok(TimerEvent::Expired)));

        tick_seconds(10).await;
        assert!(rx.try_recv().is_err(), "expired must fire exactly once");
    }

    #[tokio::test(start_paused = true)]
    async fn pausing_freezes_the_countdown() {
        let mut timer = ExamTimer::new();
        let mut rx = timer.start(5);

        tick_seconds(2).await;
        assert_eq!(timer.remaining_seconds(), 3);

        timer.pause();
        assert!(timer.is_paused());
        tick_seconds(10).await;
        assert_eq!(timer.remaining_seconds(), 3);
        assert!(rx.try_recv().is_err());

        timer.resume();
        assert!(!timer.is_paused());
        tick_seconds(2).await;
        assert!(rx.try_recv().is_err(), "still one second left");
        tick_seconds(1).await;
        assert!(matches!(rx.try_recv(), Ok(TimerEvent::Expired)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_suppresses_expiry() {
        let mut timer = ExamTimer::new();
        let mut rx = timer.start(3);

        tick_seconds(2).await;
        timer.cancel();
        tick_seconds(5).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent_and_safe_before_start() {
        let mut timer = ExamTimer::new();
        timer.cancel();
        timer.cancel();

        let mut rx = timer.start(1);
        timer.cancel();
        timer.cancel();
        tick_seconds(3).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_expires_immediately() {
        let mut timer = ExamTimer::new();
        let mut rx = timer.start(0);
        tokio::task::yield_now().await;
        assert!(matches!(rx.try_recv(), Ok(TimerEvent::Expired)));
    }
}
