//! Repeating-tick scheduling
//!
//! The session never sleeps on its own; it asks a `Scheduler` for a repeating
//! timer and receives ticks tagged with the `TimerId` that produced them.
//! `ManualScheduler` lets tests and headless runs fire ticks by hand,
//! `TokioScheduler` drives real cadence and delivers ticks over a channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Identifies one scheduled repeating timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerId(pub u64);

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Cancellable repeating-task capability
pub trait Scheduler: Send {
    /// Start a timer firing every `interval`
    fn schedule_repeating(&mut self, interval: Duration) -> TimerId;

    /// Stop a timer. Unknown or already cancelled ids are ignored.
    fn cancel(&mut self, id: TimerId);
}

// =============================================================================
// MANUAL
// =============================================================================

#[derive(Debug, Default)]
struct ManualState {
    next_id: u64,
    active: Vec<(TimerId, Duration)>,
    scheduled_total: u64,
}

/// Records timers without firing them. Clones share state, so a test can
/// keep one clone while the session owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn active_timers(&self) -> Vec<TimerId> {
        self.lock().active.iter().map(|(id, _)| *id).collect()
    }

    pub fn active_count(&self) -> usize {
        self.lock().active.len()
    }

    /// Timers ever scheduled, cancelled ones included
    pub fn scheduled_total(&self) -> u64 {
        self.lock().scheduled_total
    }

    pub fn interval_of(&self, id: TimerId) -> Option<Duration> {
        self.lock()
            .active
            .iter()
            .find(|(active, _)| *active == id)
            .map(|(_, interval)| *interval)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&mut self, interval: Duration) -> TimerId {
        let mut state = self.lock();
        state.next_id += 1;
        state.scheduled_total += 1;
        let id = TimerId(state.next_id);
        state.active.push((id, interval));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.lock().active.retain(|(active, _)| *active != id);
    }
}

// =============================================================================
// TOKIO
// =============================================================================

/// One tokio task per timer; ticks are sent to whoever owns the session.
/// Must be used from within a tokio runtime. Dropping it cancels every timer.
#[derive(Debug)]
pub struct TokioScheduler {
    ticks: mpsc::UnboundedSender<TimerId>,
    timers: HashMap<TimerId, CancellationToken>,
    next_id: u64,
}

impl TokioScheduler {
    pub fn new(ticks: mpsc::UnboundedSender<TimerId>) -> Self {
        Self {
            ticks,
            timers: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn active_count(&self) -> usize {
        self.timers.len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_repeating(&mut self, interval: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let token = CancellationToken::new();
        let cancel = token.clone();
        let ticks = self.ticks.clone();

        tokio::spawn(async move {
            // First tick lands one full interval after scheduling
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if ticks.send(id).is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("{} stopped", id);
        });

        self.timers.insert(id, token);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(token) = self.timers.remove(&id) {
            token.cancel();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, token) in self.timers.drain() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_schedule_and_cancel() {
        let observer = ManualScheduler::new();
        let mut scheduler = observer.clone();

        let a = scheduler.schedule_repeating(Duration::from_millis(1500));
        let b = scheduler.schedule_repeating(Duration::from_millis(2000));
        assert_ne!(a, b);
        assert_eq!(observer.active_count(), 2);
        assert_eq!(observer.interval_of(a), Some(Duration::from_millis(1500)));

        scheduler.cancel(a);
        scheduler.cancel(a);
        assert_eq!(observer.active_timers(), vec![b]);
        assert_eq!(observer.scheduled_total(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_timer_fires_after_interval() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TokioScheduler::new(tx);
        let id = scheduler.schedule_repeating(Duration::from_millis(2000));

        time::sleep(Duration::from_millis(1999)).await;
        assert!(rx.try_recv().is_err());

        assert_eq!(rx.recv().await, Some(id));
        assert_eq!(rx.recv().await, Some(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_cancel_stops_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TokioScheduler::new(tx);
        let id = scheduler.schedule_repeating(Duration::from_millis(100));
        assert_eq!(rx.recv().await, Some(id));

        scheduler.cancel(id);
        assert_eq!(scheduler.active_count(), 0);
        time::sleep(Duration::from_millis(1000)).await;
        // at most one tick raced the cancellation
        let mut late = 0;
        while rx.try_recv().is_ok() {
            late += 1;
        }
        assert!(late <= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_all() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        {
            let mut scheduler = TokioScheduler::new(tx);
            scheduler.schedule_repeating(Duration::from_millis(100));
            scheduler.schedule_repeating(Duration::from_millis(150));
        }
        // all senders drop once the timer tasks observe cancellation
        time::sleep(Duration::from_millis(10)).await;
        while rx.try_recv().is_ok() {}
        assert_eq!(rx.recv().await, None);
    }
}
