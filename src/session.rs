use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::chart::{ChartFrame, ChartSeriesSink};
use crate::error::{GhostError, Result};
use crate::ghost::GhostGenerator;
use crate::profile::{ProfileBook, DEFAULT_PROFILE};
use crate::recorder::{KeyEvent, KeyPolicy, Recorded, TimingRecorder};
use crate::scheduler::{GhostScheduler, GhostState, GhostStep, Timer, TimerFire};
use crate::transition::KeyboardLayout;
use crate::words::{Sentence, WordList, DEFAULT_NUMBER_OF_WORDS};

/// When the latency chart is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ChartMode {
    /// From the first keystroke on
    #[default]
    Live,
    /// Only once the sentence has been typed
    OnCompletion,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub number_of_words: usize,
    pub profile_id: String,
    pub key_policy: KeyPolicy,
    pub chart_mode: ChartMode,
    pub layout: KeyboardLayout,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            number_of_words: DEFAULT_NUMBER_OF_WORDS,
            profile_id: DEFAULT_PROFILE.to_string(),
            key_policy: KeyPolicy::default(),
            chart_mode: ChartMode::default(),
            layout: KeyboardLayout::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharState {
    Pending,
    Correct,
    Incorrect,
}

/// Emitted once the whole sentence has been typed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Completion {
    pub elapsed_secs: f64,
    pub wpm: u32,
}

pub fn words_per_minute(word_count: usize, elapsed_secs: f64) -> u32 {
    if elapsed_secs <= 0.0 || !elapsed_secs.is_finite() {
        return 0;
    }
    ((word_count as f64 / elapsed_secs) * 60.0).round() as u32
}

#[derive(Debug, Default)]
pub struct KeyOutcome {
    pub recorded: Option<Recorded>,
    pub ghost: Option<GhostStep>,
    pub completion: Option<Completion>,
    /// Ghost could not be generated; typing still works without it
    pub ghost_error: Option<GhostError>,
}

/// One sentence being raced: typed text, real timings and the ghost
#[derive(Debug)]
pub struct TypingSession {
    sentence: Sentence,
    profile_id: String,
    chart_mode: ChartMode,
    typed: Vec<char>,
    recorder: TimingRecorder,
    ghost: GhostScheduler,
    completion: Option<Completion>,
}

impl TypingSession {
    pub fn new(
        sentence: Sentence,
        profile_id: impl Into<String>,
        policy: KeyPolicy,
        chart_mode: ChartMode,
    ) -> Self {
        Self {
            sentence,
            profile_id: profile_id.into(),
            chart_mode,
            typed: Vec::new(),
            recorder: TimingRecorder::new(policy),
            ghost: GhostScheduler::new(),
            completion: None,
        }
    }

    pub fn sentence(&self) -> &Sentence {
        &self.sentence
    }

    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    pub fn recorder(&self) -> &TimingRecorder {
        &self.recorder
    }

    pub fn ghost(&self) -> &GhostScheduler {
        &self.ghost
    }

    pub fn completion(&self) -> Option<Completion> {
        self.completion
    }

    pub fn has_finished(&self) -> bool {
        self.completion.is_some()
    }

    /// Index of the next character the user has to type
    pub fn cursor(&self) -> usize {
        self.typed.len()
    }

    pub fn typed(&self) -> String {
        self.typed.iter().collect()
    }

    pub fn chart_visible(&self) -> bool {
        self.chart_mode == ChartMode::Live || self.completion.is_some()
    }

    pub fn chart_frame(&self) -> ChartFrame {
        ChartFrame::from_series(self.recorder.latencies(), self.ghost.plotted())
    }

    /// Per-character comparison of typed text against the sentence
    pub fn char_states(&self) -> Vec<CharState> {
        self.sentence
            .chars()
            .iter()
            .enumerate()
            .map(|(i, expected)| match self.typed.get(i) {
                None => CharState::Pending,
                Some(actual) if actual == expected => CharState::Correct,
                Some(_) => CharState::Incorrect,
            })
            .collect()
    }

    pub fn handle_key<R: Rng + ?Sized>(
        &mut self,
        event: &KeyEvent,
        generator: &GhostGenerator,
        profiles: &ProfileBook,
        rng: &mut R,
        timer: &dyn Timer,
        sink: &mut dyn ChartSeriesSink,
    ) -> KeyOutcome {
        let mut outcome = KeyOutcome::default();
        if self.completion.is_some() {
            return outcome;
        }

        let recorded = self.recorder.record(event);
        outcome.recorded = Some(recorded);

        let mut typed_char = false;
        if event.is_backspace {
            self.typed.pop();
        } else if let Some(c) = event.character {
            // a keystroke the recorder dropped never reaches the text either
            if recorded == Recorded::Pushed && self.typed.len() < self.sentence.len() {
                self.typed.push(c);
                typed_char = true;
            }
        }

        if typed_char && self.ghost.state() == GhostState::Idle {
            match generator.generate(&self.sentence, profiles, &self.profile_id, rng) {
                Ok(trace) => outcome.ghost = self.ghost.start(trace, self.sentence.len(), timer),
                Err(e) => {
                    log::error!("ghost generation failed: {e}");
                    outcome.ghost_error = Some(e);
                }
            }
        }

        if self.typed.len() == self.sentence.len() {
            let elapsed_secs = self.recorder.elapsed_secs();
            let completion = Completion {
                elapsed_secs,
                wpm: words_per_minute(self.sentence.word_count(), elapsed_secs),
            };
            log::info!(
                "session complete: {:.2}s, {} wpm",
                completion.elapsed_secs,
                completion.wpm
            );
            self.completion = Some(completion);
            outcome.completion = Some(completion);
            self.ghost.cancel();
            sink.publish(&self.chart_frame());
        } else if recorded != Recorded::Ignored && self.chart_visible() {
            sink.publish(&self.chart_frame());
        }

        outcome
    }

    pub fn on_timer(
        &mut self,
        fire: &TimerFire,
        timer: &dyn Timer,
        sink: &mut dyn ChartSeriesSink,
    ) -> GhostStep {
        let step = self.ghost.on_fire(fire, timer);
        if step != GhostStep::Stale && self.chart_visible() {
            sink.publish(&self.chart_frame());
        }
        step
    }

    /// Cancel the ghost so none of its pending fires can land
    pub fn retire(&mut self) {
        self.ghost.cancel();
    }
}

/// Owns the single active session and everything needed to build new ones
pub struct SessionController<R: Rng> {
    words: WordList,
    profiles: ProfileBook,
    generator: GhostGenerator,
    settings: SessionSettings,
    rng: R,
    active: Option<TypingSession>,
}

impl<R: Rng> SessionController<R> {
    pub fn new(words: WordList, profiles: ProfileBook, settings: SessionSettings, rng: R) -> Self {
        Self {
            words,
            profiles,
            generator: GhostGenerator::new(settings.layout.clone()),
            settings,
            rng,
            active: None,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn profiles(&self) -> &ProfileBook {
        &self.profiles
    }

    pub fn active(&self) -> Option<&TypingSession> {
        self.active.as_ref()
    }

    pub fn set_profile(&mut self, profile_id: &str) -> Result<()> {
        self.profiles.get(profile_id)?;
        self.settings.profile_id = profile_id.to_string();
        Ok(())
    }

    /// Retire the current session and start one with a fresh sentence
    pub fn start_new(&mut self) -> Result<&TypingSession> {
        self.retire();
        let sentence = self
            .words
            .generate_sentence(&mut self.rng, self.settings.number_of_words)?;
        self.install(sentence)
    }

    /// Retire the current session and race the same sentence again
    pub fn restart(&mut self) -> Result<&TypingSession> {
        let sentence = match self.active.take() {
            Some(mut old) => {
                old.retire();
                old.sentence.clone()
            }
            None => return self.start_new(),
        };
        self.install(sentence)
    }

    fn retire(&mut self) {
        if let Some(mut old) = self.active.take() {
            old.retire();
        }
    }

    fn install(&mut self, sentence: Sentence) -> Result<&TypingSession> {
        debug_assert!(self.active.is_none());
        // fail before the user starts typing rather than on the first key
        self.profiles.get(&self.settings.profile_id)?;
        log::info!(
            "new session: {} chars, profile {}",
            sentence.len(),
            self.settings.profile_id
        );
        let session = TypingSession::new(
            sentence,
            self.settings.profile_id.clone(),
            self.settings.key_policy,
            self.settings.chart_mode,
        );
        Ok(&*self.active.insert(session))
    }

    pub fn on_key(
        &mut self,
        event: &KeyEvent,
        timer: &dyn Timer,
        sink: &mut dyn ChartSeriesSink,
    ) -> Option<KeyOutcome> {
        let session = self.active.as_mut()?;
        Some(session.handle_key(
            event,
            &self.generator,
            &self.profiles,
            &mut self.rng,
            timer,
            sink,
        ))
    }

    pub fn on_timer(
        &mut self,
        fire: &TimerFire,
        timer: &dyn Timer,
        sink: &mut dyn ChartSeriesSink,
    ) -> GhostStep {
        match self.active.as_mut() {
            Some(session) => session.on_timer(fire, timer, sink),
            None => GhostStep::Stale,
        }
    }
}
