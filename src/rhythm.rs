use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::util::{mean, peak};

/// Minimum visible span of the time axis, seconds
pub const MIN_X_SPAN_SECS: f64 = 10.0;
/// Minimum height of the latency axis before padding, ms
pub const MIN_Y_MS: f64 = 200.0;
pub const Y_PADDING: f64 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum Metric {
    #[default]
    #[strum(serialize = "Hold Time")]
    Hold,
    #[strum(serialize = "Latency")]
    Latency,
}

impl Metric {
    pub fn toggle(self) -> Self {
        match self {
            Metric::Hold => Metric::Latency,
            Metric::Latency => Metric::Hold,
        }
    }
}

/// One completed key press
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RhythmEvent {
    pub elapsed_secs: f64,
    pub hold_ms: f64,
    pub latency_ms: f64,
}

impl RhythmEvent {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Hold => self.hold_ms,
            Metric::Latency => self.latency_ms,
        }
    }
}

/// Pairs key-downs with key-ups to measure hold and flight times
#[derive(Debug, Default)]
pub struct RhythmRecorder {
    down_at: HashMap<char, f64>,
    events: Vec<RhythmEvent>,
    started_at: Option<f64>,
    last_release: Option<f64>,
}

impl RhythmRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, key: char, now_ms: f64, repeat: bool) {
        if !repeat {
            self.down_at.insert(key, now_ms);
        }
    }

    /// Completes the press started by the matching key-down, if any
    pub fn key_up(&mut self, key: char, now_ms: f64) -> Option<RhythmEvent> {
        let down = self.down_at.remove(&key)?;
        let started_at = *self.started_at.get_or_insert(now_ms);
        let event = RhythmEvent {
            elapsed_secs: (now_ms - started_at) / 1000.0,
            hold_ms: now_ms - down,
            latency_ms: self.last_release.map_or(0.0, |prev| down - prev),
        };
        self.last_release = Some(now_ms);
        self.events.push(event);
        Some(event)
    }

    pub fn events(&self) -> &[RhythmEvent] {
        &self.events
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SampleRow {
    timestamp: NaiveDateTime,
    hold_time: f64,
    latency: f64,
}

/// Keystrokes of one reference typist, timed from their first entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceSample {
    events: Vec<RhythmEvent>,
}

impl ReferenceSample {
    pub fn from_json(json: &str) -> Result<Self> {
        let rows: Vec<SampleRow> = serde_json::from_str(json)?;
        let events = match rows.first() {
            Some(first) => {
                let origin = first.timestamp;
                rows.iter()
                    .map(|r| RhythmEvent {
                        elapsed_secs: (r.timestamp - origin).num_milliseconds() as f64 / 1000.0,
                        hold_ms: r.hold_time,
                        latency_ms: r.latency,
                    })
                    .collect()
            }
            None => Vec::new(),
        };
        Ok(Self { events })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn events(&self) -> &[RhythmEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Everything the rhythm chart needs to draw one frame
#[derive(Debug, Clone, PartialEq)]
pub struct RhythmView {
    pub metric: Metric,
    pub user: Vec<(f64, f64)>,
    pub reference: Vec<(f64, f64)>,
    pub x_max: f64,
    pub y_max: f64,
    pub user_mean: Option<f64>,
    pub message: Option<&'static str>,
}

pub fn compare(user: &[RhythmEvent], reference: &[RhythmEvent], metric: Metric) -> RhythmView {
    let message = match (user.is_empty(), reference.is_empty()) {
        (true, true) => Some("Start typing to see your rhythm vs. Parkinson's sample."),
        (true, false) => Some("Start typing to see your rhythm."),
        _ => None,
    };

    let user_time_max = peak(user.iter().map(|e| e.elapsed_secs));
    let reference_time_max = peak(reference.iter().map(|e| e.elapsed_secs));
    let x_max = if user.is_empty() && !reference.is_empty() {
        reference_time_max.max(MIN_X_SPAN_SECS)
    } else {
        user_time_max.max(MIN_X_SPAN_SECS)
    };

    let subset: Vec<&RhythmEvent> = reference
        .iter()
        .filter(|e| e.elapsed_secs <= x_max)
        .collect();

    let y_user = peak(user.iter().map(|e| e.value(metric)));
    let y_reference = peak(subset.iter().map(|e| e.value(metric)));
    let y_max = y_user.max(y_reference).max(MIN_Y_MS) * Y_PADDING;

    let user_values: Vec<f64> = user.iter().map(|e| e.value(metric)).collect();

    RhythmView {
        metric,
        user: user
            .iter()
            .map(|e| (e.elapsed_secs, e.value(metric)))
            .collect(),
        reference: subset
            .iter()
            .map(|e| (e.elapsed_secs, e.value(metric)))
            .filter(|(_, v)| v.is_finite())
            .collect(),
        x_max,
        y_max,
        user_mean: mean(&user_values),
        message,
    }
}
