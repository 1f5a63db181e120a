use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};

use crate::scheduler::{Timer, TimerFire};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
    Timer(TimerFire),
}

/// Source of application events (keyboard, resize, timers)
pub trait AppEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<AppEvent>,
    rx: Receiver<AppEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let reader_tx = tx.clone();

        std::thread::spawn(move || loop {
            let ev = match event::read() {
                Ok(CtEvent::Key(key)) => AppEvent::Key(key),
                Ok(CtEvent::Resize(_, _)) => AppEvent::Resize,
                Ok(_) => continue,
                Err(e) => {
                    log::error!("terminal event reader stopped: {e}");
                    break;
                }
            };
            if reader_tx.send(ev).is_err() {
                break;
            }
        });

        Self { tx, rx }
    }

    /// Timer that delivers its fires into this source
    pub fn timer(&self) -> ThreadTimer {
        ThreadTimer::new(self.tx.clone())
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AppEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Timer backed by one sleeping thread per scheduled fire.
/// Fires whose token was cancelled while sleeping are dropped.
#[derive(Clone, Debug)]
pub struct ThreadTimer {
    tx: Sender<AppEvent>,
}

impl ThreadTimer {
    pub fn new(tx: Sender<AppEvent>) -> Self {
        Self { tx }
    }
}

impl Timer for ThreadTimer {
    fn schedule(&self, delay: Duration, fire: TimerFire) {
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            if !fire.token.is_cancelled() {
                let _ = tx.send(AppEvent::Timer(fire));
            }
        });
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<AppEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }
}

impl AppEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: AppEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: AppEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    pub fn source(&self) -> &E {
        &self.event_source
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> AppEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => AppEvent::Tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::CancellationToken;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let runner = Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(1)),
        );

        match runner.step() {
            AppEvent::Tick => {}
            _ => panic!("expected Tick on timeout"),
        }
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(AppEvent::Resize).unwrap();
        let runner = Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(10)),
        );

        match runner.step() {
            AppEvent::Resize => {}
            _ => panic!("expected Resize event"),
        }
    }

    #[test]
    fn thread_timer_delivers_live_fires() {
        let (tx, rx) = mpsc::channel();
        let timer = ThreadTimer::new(tx);
        let token = CancellationToken::new();
        timer.schedule(Duration::from_millis(5), TimerFire { token, step: 3 });

        match rx.recv_timeout(Duration::from_secs(2)) {
            Ok(AppEvent::Timer(fire)) => assert_eq!(fire.step, 3),
            other => panic!("expected timer fire, got {other:?}"),
        }
    }

    #[test]
    fn thread_timer_drops_cancelled_fires() {
        let (tx, rx) = mpsc::channel();
        let timer = ThreadTimer::new(tx);
        let token = CancellationToken::new();
        timer.schedule(
            Duration::from_millis(20),
            TimerFire {
                token: token.clone(),
                step: 1,
            },
        );
        token.cancel();

        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }
}
