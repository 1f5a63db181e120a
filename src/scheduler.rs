use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::ghost::GhostTrace;

/// Shared cancelled flag; clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// True when both handles refer to the same token
    pub fn same_as(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

/// Delivered back to the owner of `token` once a scheduled delay elapses
#[derive(Debug, Clone)]
pub struct TimerFire {
    pub token: CancellationToken,
    pub step: usize,
}

/// Fire-and-forget delayed callbacks
pub trait Timer {
    fn schedule(&self, delay: Duration, fire: TimerFire);
}

pub fn delay_from_ms(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_secs_f64(ms / 1000.0)
    } else {
        Duration::ZERO
    }
}

#[derive(Debug)]
struct PendingFire {
    due_ms: f64,
    seq: u64,
    fire: TimerFire,
}

/// Timer driven by hand, for tests and headless runs
#[derive(Debug, Default)]
pub struct ManualTimer {
    now_ms: Cell<f64>,
    seq: Cell<u64>,
    pending: RefCell<Vec<PendingFire>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms.get()
    }

    /// Number of fires not yet delivered, stale ones included
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Advance to the earliest pending fire and hand it out
    pub fn pop_next(&self) -> Option<TimerFire> {
        let mut pending = self.pending.borrow_mut();
        let idx = pending
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.due_ms
                    .partial_cmp(&b.due_ms)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.seq.cmp(&b.seq))
            })
            .map(|(i, _)| i)?;
        let next = pending.remove(idx);
        if next.due_ms > self.now_ms.get() {
            self.now_ms.set(next.due_ms);
        }
        Some(next.fire)
    }

    /// Hand out every fire due within the next `ms` milliseconds, in order
    pub fn advance(&self, ms: f64) -> Vec<TimerFire> {
        let deadline = self.now_ms.get() + ms;
        let mut due = Vec::new();
        loop {
            let next_due = self
                .pending
                .borrow()
                .iter()
                .map(|p| p.due_ms)
                .fold(f64::INFINITY, f64::min);
            if next_due > deadline {
                break;
            }
            match self.pop_next() {
                Some(fire) => due.push(fire),
                None => break,
            }
        }
        self.now_ms.set(deadline);
        due
    }
}

impl Timer for ManualTimer {
    fn schedule(&self, delay: Duration, fire: TimerFire) {
        let seq = self.seq.get();
        self.seq.set(seq + 1);
        self.pending.borrow_mut().push(PendingFire {
            due_ms: self.now_ms.get() + delay.as_secs_f64() * 1000.0,
            seq,
            fire,
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GhostState {
    Idle,
    Running,
    Finished,
}

/// What a scheduler step produced for the display
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GhostStep {
    /// Ghost caret now sits after the character at this index
    Moved(usize),
    Finished,
    /// Fire did not belong to this scheduler, or it was not running
    Stale,
}

/// Plays a ghost trace back one character per timer fire.
///
/// Owns its cancellation token; dropping or cancelling the scheduler makes
/// every outstanding fire stale.
#[derive(Debug)]
pub struct GhostScheduler {
    state: GhostState,
    trace: Option<GhostTrace>,
    sentence_len: usize,
    cursor: usize,
    position: Option<usize>,
    plotted: Vec<f64>,
    token: CancellationToken,
}

impl GhostScheduler {
    pub fn new() -> Self {
        Self {
            state: GhostState::Idle,
            trace: None,
            sentence_len: 0,
            cursor: 0,
            position: None,
            plotted: Vec::new(),
            token: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> GhostState {
        self.state
    }

    /// Ghost delays emitted so far
    pub fn plotted(&self) -> &[f64] {
        &self.plotted
    }

    /// Character index the ghost caret follows, if it has moved yet
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Load a trace and take the first step. No-op unless idle.
    pub fn start(
        &mut self,
        trace: GhostTrace,
        sentence_len: usize,
        timer: &dyn Timer,
    ) -> Option<GhostStep> {
        if self.state != GhostState::Idle || self.token.is_cancelled() {
            return None;
        }
        log::info!(
            "ghost started: profile {}, {} delays",
            trace.profile_id(),
            trace.len()
        );
        self.trace = Some(trace);
        self.sentence_len = sentence_len;
        self.state = GhostState::Running;
        Some(self.step(timer))
    }

    pub fn on_fire(&mut self, fire: &TimerFire, timer: &dyn Timer) -> GhostStep {
        if !fire.token.same_as(&self.token)
            || fire.token.is_cancelled()
            || self.state != GhostState::Running
            || fire.step != self.cursor
        {
            log::debug!("ignoring stale ghost fire for step {}", fire.step);
            return GhostStep::Stale;
        }
        self.step(timer)
    }

    fn step(&mut self, timer: &dyn Timer) -> GhostStep {
        if self.cursor >= self.sentence_len {
            return self.finish();
        }
        self.position = Some(self.cursor);
        let delay = self.trace.as_ref().and_then(|t| t.get(self.cursor));
        self.cursor += 1;
        match delay {
            Some(delay) => {
                self.plotted.push(delay);
                timer.schedule(
                    delay_from_ms(delay),
                    TimerFire {
                        token: self.token.clone(),
                        step: self.cursor,
                    },
                );
                GhostStep::Moved(self.cursor - 1)
            }
            // last character has no outgoing delay
            None => {
                self.finish();
                GhostStep::Moved(self.cursor - 1)
            }
        }
    }

    fn finish(&mut self) -> GhostStep {
        // the trailing delay has no destination character
        self.plotted.pop();
        self.state = GhostState::Finished;
        log::info!("ghost finished with {} plotted points", self.plotted.len());
        GhostStep::Finished
    }

    pub fn cancel(&mut self) {
        self.token.cancel();
    }
}

impl Default for GhostScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for GhostScheduler {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(delays: &[f64]) -> GhostTrace {
        GhostTrace::from_delays("test", delays.to_vec())
    }

    fn run_to_end(scheduler: &mut GhostScheduler, timer: &ManualTimer) -> Vec<GhostStep> {
        let mut steps = Vec::new();
        while let Some(fire) = timer.pop_next() {
            steps.push(scheduler.on_fire(&fire, timer));
        }
        steps
    }

    #[test]
    fn starts_idle() {
        let scheduler = GhostScheduler::new();
        assert_eq!(scheduler.state(), GhostState::Idle);
        assert!(scheduler.plotted().is_empty());
        assert_eq!(scheduler.position(), None);
    }

    #[test]
    fn first_step_runs_synchronously() {
        let timer = ManualTimer::new();
        let mut scheduler = GhostScheduler::new();

        let step = scheduler.start(trace(&[100.0, 200.0, 300.0]), 4, &timer);
        assert_eq!(step, Some(GhostStep::Moved(0)));
        assert_eq!(scheduler.state(), GhostState::Running);
        assert_eq!(scheduler.plotted(), &[100.0]);
        assert_eq!(timer.pending(), 1);
    }

    #[test]
    fn start_is_idempotent() {
        let timer = ManualTimer::new();
        let mut scheduler = GhostScheduler::new();
        scheduler.start(trace(&[100.0]), 2, &timer);
        assert_eq!(scheduler.start(trace(&[5.0]), 2, &timer), None);
        assert_eq!(scheduler.plotted(), &[100.0]);
        assert_eq!(timer.pending(), 1);
    }

    #[test]
    fn steps_follow_trace_delays() {
        let timer = ManualTimer::new();
        let mut scheduler = GhostScheduler::new();
        scheduler.start(trace(&[100.0, 200.0, 300.0]), 4, &timer);

        let steps = run_to_end(&mut scheduler, &timer);
        assert_eq!(
            steps,
            vec![
                GhostStep::Moved(1),
                GhostStep::Moved(2),
                GhostStep::Moved(3)
            ]
        );
        assert_eq!(timer.now_ms(), 600.0);
        assert_eq!(scheduler.position(), Some(3));
    }

    #[test]
    fn finishing_discards_one_trailing_delay() {
        let timer = ManualTimer::new();
        let mut scheduler = GhostScheduler::new();
        // sentence of n = 5 characters, trace of n - 1 = 4 delays
        scheduler.start(trace(&[10.0, 20.0, 30.0, 40.0]), 5, &timer);
        run_to_end(&mut scheduler, &timer);

        assert_eq!(scheduler.state(), GhostState::Finished);
        assert_eq!(scheduler.plotted(), &[10.0, 20.0, 30.0]);
    }

    #[test]
    fn cancelled_scheduler_ignores_fires() {
        let timer = ManualTimer::new();
        let mut scheduler = GhostScheduler::new();
        scheduler.start(trace(&[10.0, 20.0]), 3, &timer);
        scheduler.cancel();

        let fire = timer.pop_next().unwrap();
        assert_eq!(scheduler.on_fire(&fire, &timer), GhostStep::Stale);
        assert_eq!(scheduler.plotted(), &[10.0]);
        assert_eq!(timer.pending(), 0);
    }

    #[test]
    fn foreign_fires_are_stale() {
        let timer = ManualTimer::new();
        let mut old = GhostScheduler::new();
        old.start(trace(&[10.0, 20.0]), 3, &timer);
        let stale = timer.pop_next().unwrap();

        let mut fresh = GhostScheduler::new();
        fresh.start(trace(&[50.0, 60.0]), 3, &timer);
        assert_eq!(fresh.on_fire(&stale, &timer), GhostStep::Stale);
        assert_eq!(fresh.plotted(), &[50.0]);
    }

    #[test]
    fn dropping_cancels_token() {
        let scheduler = GhostScheduler::new();
        let token = scheduler.token().clone();
        drop(scheduler);
        assert!(token.is_cancelled());
    }

    #[test]
    fn manual_timer_advance_delivers_due_fires_only() {
        let timer = ManualTimer::new();
        let token = CancellationToken::new();
        timer.schedule(Duration::from_millis(10), TimerFire { token: token.clone(), step: 1 });
        timer.schedule(Duration::from_millis(30), TimerFire { token, step: 2 });

        let due = timer.advance(20.0);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].step, 1);
        assert_eq!(timer.now_ms(), 20.0);
        assert_eq!(timer.pending(), 1);
    }

    #[test]
    fn invalid_delays_clamp_to_zero() {
        assert_eq!(delay_from_ms(f64::NAN), Duration::ZERO);
        assert_eq!(delay_from_ms(-5.0), Duration::ZERO);
        assert_eq!(delay_from_ms(1500.0), Duration::from_millis(1500));
    }
}
