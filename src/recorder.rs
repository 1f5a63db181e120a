use serde::{Deserialize, Serialize};

/// A key-down as seen by the timing engine, independent of any terminal backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyEvent {
    /// `None` for keys that produce no character (modifiers, arrows, ...)
    pub character: Option<char>,
    pub timestamp_ms: f64,
    pub is_backspace: bool,
}

impl KeyEvent {
    pub fn char(c: char, timestamp_ms: f64) -> Self {
        Self {
            character: Some(c),
            timestamp_ms,
            is_backspace: false,
        }
    }

    pub fn backspace(timestamp_ms: f64) -> Self {
        Self {
            character: None,
            timestamp_ms,
            is_backspace: true,
        }
    }

    pub fn other(timestamp_ms: f64) -> Self {
        Self {
            character: None,
            timestamp_ms,
            is_backspace: false,
        }
    }
}

/// Which non-backspace key-downs produce a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum KeyPolicy {
    /// Only keys that carry a character
    #[default]
    CharactersOnly,
    /// Every non-backspace key-down, modifier-only presses included
    AllKeys,
}

impl KeyPolicy {
    pub fn accepts(self, event: &KeyEvent) -> bool {
        match self {
            KeyPolicy::CharactersOnly => event.character.is_some(),
            KeyPolicy::AllKeys => true,
        }
    }
}

/// What the recorder did with an event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Recorded {
    Pushed,
    Popped,
    Ignored,
}

/// Real keystroke timestamps and the latencies between them.
///
/// `latencies.len() == max(timestamps.len() - 1, 0)` holds after every call.
#[derive(Debug, Clone, Default)]
pub struct TimingRecorder {
    policy: KeyPolicy,
    timestamps: Vec<f64>,
    latencies: Vec<f64>,
}

impl TimingRecorder {
    pub fn new(policy: KeyPolicy) -> Self {
        Self {
            policy,
            timestamps: Vec::new(),
            latencies: Vec::new(),
        }
    }

    pub fn policy(&self) -> KeyPolicy {
        self.policy
    }

    pub fn record(&mut self, event: &KeyEvent) -> Recorded {
        if event.is_backspace {
            return if self.pop() {
                Recorded::Popped
            } else {
                Recorded::Ignored
            };
        }
        if !self.policy.accepts(event) {
            return Recorded::Ignored;
        }
        self.push(event.timestamp_ms)
    }

    fn push(&mut self, now: f64) -> Recorded {
        if let Some(&last) = self.timestamps.last() {
            // timestamps stay strictly increasing
            if now <= last {
                log::debug!("dropping out-of-order timestamp {now} (last {last})");
                return Recorded::Ignored;
            }
            self.latencies.push(now - last);
        }
        self.timestamps.push(now);
        Recorded::Pushed
    }

    fn pop(&mut self) -> bool {
        if self.timestamps.pop().is_none() {
            return false;
        }
        // a lone timestamp has no latency, so this is a no-op then
        self.latencies.pop();
        true
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn latencies(&self) -> &[f64] {
        &self.latencies
    }

    /// Seconds between the first and last recorded keystroke
    pub fn elapsed_secs(&self) -> f64 {
        match (self.timestamps.first(), self.timestamps.last()) {
            (Some(first), Some(last)) => (last - first) / 1000.0,
            _ => 0.0,
        }
    }
}
