use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{GhostError, Result};
use crate::scheduler::{delay_from_ms, CancellationToken, Timer, TimerFire};

pub const START_DELAY_MS: f64 = 100.0;
pub const SKIP_DELAY_MS: f64 = 50.0;
pub const RELEASE_MS: f64 = 50.0;
pub const MIN_PHASE_MS: f64 = 10.0;
pub const MIN_TEMPO: f64 = 0.5;
pub const MAX_TEMPO: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Medication {
    #[strum(serialize = "Levodopa")]
    Levodopa,
    #[strum(serialize = "DA")]
    DopamineAgonist,
    #[strum(serialize = "MAOB")]
    MaoB,
    #[strum(serialize = "Other")]
    Other,
    #[strum(serialize = "No Med")]
    NoMed,
}

impl Medication {
    pub const ALL: [Medication; 5] = [
        Medication::Levodopa,
        Medication::DopamineAgonist,
        Medication::MaoB,
        Medication::Other,
        Medication::NoMed,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Medication::Levodopa => "short_levadopa_events.csv",
            Medication::DopamineAgonist => "da_events.csv",
            Medication::MaoB => "maob_events.csv",
            Medication::Other => "other_events.csv",
            Medication::NoMed => "nomed_events.csv",
        }
    }
}

/// Hold and flight time of one recorded keystroke, in ms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseEvent {
    pub hold: f64,
    pub flight: f64,
}

impl PulseEvent {
    pub fn is_valid(&self) -> bool {
        self.hold.is_finite() && self.flight.is_finite()
    }
}

#[derive(Debug, Deserialize)]
struct PulseRow {
    #[serde(rename = "Hold", default)]
    hold: Option<String>,
    #[serde(rename = "Flight", default)]
    flight: Option<String>,
}

fn parse_ms(field: Option<String>) -> f64 {
    field
        .and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Parse a medication CSV; unparsable cells become NaN and are skipped at playback
pub fn read_events<R: std::io::Read>(reader: R) -> Result<Vec<PulseEvent>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut events = Vec::new();
    for row in rdr.deserialize::<PulseRow>() {
        let row = row?;
        events.push(PulseEvent {
            hold: parse_ms(row.hold),
            flight: parse_ms(row.flight),
        });
    }
    Ok(events)
}

/// Keystroke recordings grouped by medication
#[derive(Debug, Clone, Default)]
pub struct PulseDataset {
    events: HashMap<Medication, Vec<PulseEvent>>,
}

impl PulseDataset {
    /// Load every medication file found in `dir`. Missing or broken files
    /// leave that medication empty.
    pub fn load_dir(dir: &Path) -> Self {
        let mut dataset = Self::default();
        for med in Medication::ALL {
            let path = dir.join(med.file_name());
            let loaded = std::fs::File::open(&path)
                .map_err(GhostError::from)
                .and_then(read_events);
            match loaded {
                Ok(events) => {
                    log::info!("loaded {} {} events", events.len(), med);
                    dataset.insert(med, events);
                }
                Err(e) => log::warn!("could not load {}: {e}", path.display()),
            }
        }
        dataset
    }

    pub fn insert(&mut self, med: Medication, events: Vec<PulseEvent>) {
        self.events.insert(med, events);
    }

    pub fn events(&self, med: Medication) -> &[PulseEvent] {
        self.events.get(&med).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.events.values().all(Vec::is_empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PulsePhase {
    Idle,
    Waiting,
    Pressed,
    Released,
    Done,
}

/// What the pulse display should show after a step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseFrame {
    pub phase: PulsePhase,
    pub current: Option<PulseEvent>,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PulseStart {
    Started,
    NoEvents,
}

/// Plays back a medication's hold/flight pattern as a pulsing button
#[derive(Debug)]
pub struct PulsePlayer {
    medication: Option<Medication>,
    events: Vec<PulseEvent>,
    index: usize,
    phase: PulsePhase,
    current: Option<PulseEvent>,
    tempo: f64,
    token: CancellationToken,
    seq: usize,
}

impl PulsePlayer {
    pub fn new(tempo: f64) -> Result<Self> {
        let mut player = Self {
            medication: None,
            events: Vec::new(),
            index: 0,
            phase: PulsePhase::Idle,
            current: None,
            tempo: 1.0,
            token: CancellationToken::new(),
            seq: 0,
        };
        player.set_tempo(tempo)?;
        Ok(player)
    }

    pub fn medication(&self) -> Option<Medication> {
        self.medication
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn set_tempo(&mut self, tempo: f64) -> Result<()> {
        if !tempo.is_finite() || tempo <= 0.0 {
            return Err(GhostError::InvalidTempo(tempo));
        }
        self.tempo = tempo.clamp(MIN_TEMPO, MAX_TEMPO);
        Ok(())
    }

    pub fn frame(&self) -> PulseFrame {
        PulseFrame {
            phase: self.phase,
            current: self.current,
            index: self.index,
        }
    }

    /// Stop any playback and start `med` after a short delay
    pub fn select(
        &mut self,
        med: Medication,
        dataset: &PulseDataset,
        timer: &dyn Timer,
    ) -> PulseStart {
        self.stop();
        self.medication = Some(med);
        self.events = dataset.events(med).to_vec();
        self.index = 0;
        self.current = None;
        if self.events.is_empty() {
            log::warn!("no pulse events for {med}");
            return PulseStart::NoEvents;
        }
        self.phase = PulsePhase::Waiting;
        self.schedule(START_DELAY_MS, timer);
        PulseStart::Started
    }

    pub fn stop(&mut self) {
        self.token.cancel();
        self.token = CancellationToken::new();
        self.phase = PulsePhase::Idle;
    }

    fn schedule(&mut self, ms: f64, timer: &dyn Timer) {
        self.seq += 1;
        timer.schedule(
            delay_from_ms(ms),
            TimerFire {
                token: self.token.clone(),
                step: self.seq,
            },
        );
    }

    /// Advance playback; `None` when the fire belongs to someone else
    pub fn on_fire(&mut self, fire: &TimerFire, timer: &dyn Timer) -> Option<PulseFrame> {
        if !fire.token.same_as(&self.token) || fire.token.is_cancelled() || fire.step != self.seq
        {
            return None;
        }
        match self.phase {
            PulsePhase::Waiting => self.play_current(timer),
            PulsePhase::Pressed => {
                self.phase = PulsePhase::Released;
                let gap = self.current.map_or(0.0, |e| e.flight / self.tempo);
                self.schedule(RELEASE_MS + gap.max(MIN_PHASE_MS), timer);
            }
            PulsePhase::Released => {
                self.index += 1;
                self.play_current(timer);
            }
            PulsePhase::Idle | PulsePhase::Done => return None,
        }
        Some(self.frame())
    }

    fn play_current(&mut self, timer: &dyn Timer) {
        let Some(event) = self.events.get(self.index).copied() else {
            self.phase = PulsePhase::Done;
            return;
        };
        if !event.is_valid() {
            log::debug!("skipping invalid pulse event {}", self.index);
            self.phase = PulsePhase::Released;
            self.schedule(SKIP_DELAY_MS, timer);
            return;
        }
        self.current = Some(event);
        self.phase = PulsePhase::Pressed;
        self.schedule((event.hold / self.tempo).max(MIN_PHASE_MS), timer);
    }
}

impl Drop for PulsePlayer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
