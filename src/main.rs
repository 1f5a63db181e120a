mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{
        KeyCode, KeyEvent as TermKeyEvent, KeyEventKind, KeyModifiers,
        KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    tty::IsTty,
};
use ghostkeys::{
    app_dirs::AppDirs,
    chart::LatestFrame,
    clock::{Clock, MonotonicClock},
    config::{Config, ConfigStore, FileConfigStore},
    logging,
    profile::ProfileBook,
    pulse::{Medication, PulseDataset, PulsePlayer, PulseStart},
    recorder::{KeyEvent, KeyPolicy},
    rhythm::{Metric, ReferenceSample, RhythmRecorder},
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    scheduler::{Timer, TimerFire},
    session::{ChartMode, SessionController, SessionSettings},
    words::WordList,
};
use rand::{rngs::StdRng, SeedableRng};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};

const TICK_RATE_MS: u64 = 100;
const TEMPO_STEP: f64 = 0.25;

/// race a ghost typist built from parkinson's keystroke-latency profiles
#[derive(Parser, Debug, Clone, Default)]
#[clap(
    version,
    about,
    long_about = "Type a random sentence against a ghost whose keystroke latencies come from real recordings of typists with Parkinson's disease, then compare your rhythm and watch medication pulse patterns."
)]
pub struct Cli {
    /// number of words in each sentence
    #[clap(short = 'w', long)]
    number_of_words: Option<usize>,

    /// latency profile the ghost types with
    #[clap(short = 'p', long)]
    profile: Option<String>,

    /// which key-downs count as keystrokes
    #[clap(short = 'k', long, value_enum)]
    key_policy: Option<KeyPolicy>,

    /// when the latency chart is shown
    #[clap(short = 'c', long, value_enum)]
    chart_mode: Option<ChartMode>,

    /// pulse playback speed multiplier
    #[clap(short = 't', long)]
    tempo: Option<f64>,

    /// newline separated word list to draw sentences from
    #[clap(long)]
    words_file: Option<PathBuf>,

    /// reference keystroke sample (json) for the rhythm screen
    #[clap(long)]
    reference: Option<PathBuf>,

    /// directory holding the medication event csv files
    #[clap(long)]
    pulse_dir: Option<PathBuf>,

    /// keys typed with the left hand
    #[clap(long)]
    left_hand_keys: Option<String>,

    /// write the merged settings back to the config file
    #[clap(long)]
    save_config: bool,

    /// print the known latency profiles and exit
    #[clap(long)]
    list_profiles: bool,
}

impl Cli {
    /// Overlay command line flags onto the loaded config
    fn apply(&self, cfg: &mut Config) {
        if let Some(n) = self.number_of_words {
            cfg.number_of_words = n;
        }
        if let Some(p) = &self.profile {
            cfg.profile = p.clone();
        }
        if let Some(k) = self.key_policy {
            cfg.key_policy = k;
        }
        if let Some(c) = self.chart_mode {
            cfg.chart_mode = c;
        }
        if let Some(t) = self.tempo {
            cfg.tempo = t;
        }
        if let Some(w) = &self.words_file {
            cfg.words_file = Some(w.clone());
        }
        if let Some(r) = &self.reference {
            cfg.reference_sample = Some(r.clone());
        }
        if let Some(d) = &self.pulse_dir {
            cfg.pulse_dir = Some(d.clone());
        }
        if let Some(keys) = &self.left_hand_keys {
            cfg.left_hand_keys = keys.clone();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Typing,
    Results,
    Rhythm,
    Pulse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App<C: Clock = MonotonicClock> {
    pub state: AppState,
    pub controller: SessionController<StdRng>,
    pub chart: LatestFrame,
    pub clock: C,
    pub rhythm: RhythmRecorder,
    pub metric: Metric,
    pub reference: ReferenceSample,
    pub pulse: PulsePlayer,
    pub pulse_data: PulseDataset,
    pub message: Option<String>,
    /// Whether the terminal reports key releases
    pub release_events: bool,
}

impl<C: Clock> App<C> {
    pub fn new(config: &Config, clock: C) -> ghostkeys::Result<Self> {
        let words = match &config.words_file {
            Some(path) => WordList::from_path(path)?,
            None => WordList::builtin(),
        };

        let mut message = None;
        let reference = match &config.reference_sample {
            Some(path) => ReferenceSample::from_path(path).unwrap_or_else(|e| {
                log::warn!("could not load reference sample {}: {e}", path.display());
                message = Some(format!("Could not load reference sample: {e}"));
                ReferenceSample::default()
            }),
            None => ReferenceSample::default(),
        };

        let pulse_data = match &config.pulse_dir {
            Some(dir) => PulseDataset::load_dir(dir),
            None => PulseDataset::default(),
        };

        let mut controller = SessionController::new(
            words,
            ProfileBook::builtin()?,
            SessionSettings::from(config),
            StdRng::from_entropy(),
        );
        controller.start_new()?;

        Ok(Self {
            state: AppState::Typing,
            controller,
            chart: LatestFrame::default(),
            clock,
            rhythm: RhythmRecorder::new(),
            metric: Metric::Hold,
            reference,
            pulse: PulsePlayer::new(config.tempo)?,
            pulse_data,
            message,
            release_events: false,
        })
    }

    fn race_finished(&self) -> bool {
        self.controller
            .active()
            .is_some_and(|session| session.has_finished())
    }

    fn show(&mut self, state: AppState) {
        if self.state == AppState::Pulse && state != AppState::Pulse {
            self.pulse.stop();
        }
        self.message = None;
        self.state = state;
    }

    /// Race the same sentence again
    pub fn restart(&mut self) {
        self.chart.clear();
        self.message = self.controller.restart().err().map(|e| e.to_string());
        self.state = AppState::Typing;
    }

    /// Race a freshly drawn sentence
    pub fn new_sentence(&mut self) {
        self.chart.clear();
        self.message = self.controller.start_new().err().map(|e| e.to_string());
        self.state = AppState::Typing;
    }

    pub fn on_key(&mut self, key: TermKeyEvent, timer: &dyn Timer) -> Flow {
        let now = self.clock.now_ms();

        if key.kind == KeyEventKind::Release {
            if let (AppState::Rhythm, KeyCode::Char(c)) = (self.state, key.code) {
                self.rhythm.key_up(c, now);
            }
            return Flow::Continue;
        }

        let ctrl_c =
            key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c');
        if key.code == KeyCode::Esc || ctrl_c {
            return Flow::Quit;
        }

        match key.code {
            KeyCode::F(1) => {
                let race = if self.race_finished() {
                    AppState::Results
                } else {
                    AppState::Typing
                };
                self.show(race);
                return Flow::Continue;
            }
            KeyCode::F(2) => {
                self.show(AppState::Rhythm);
                return Flow::Continue;
            }
            KeyCode::F(3) => {
                self.show(AppState::Pulse);
                return Flow::Continue;
            }
            _ => {}
        }

        match self.state {
            AppState::Typing => self.on_typing_key(key, now, timer),
            AppState::Results => self.on_results_key(key),
            AppState::Rhythm => self.on_rhythm_key(key, now),
            AppState::Pulse => self.on_pulse_key(key, timer),
        }
        Flow::Continue
    }

    fn on_typing_key(&mut self, key: TermKeyEvent, now: f64, timer: &dyn Timer) {
        match key.code {
            KeyCode::Left => self.restart(),
            KeyCode::Right => self.new_sentence(),
            _ => {
                let event = timing_event(&key, now);
                if let Some(outcome) = self.controller.on_key(&event, timer, &mut self.chart) {
                    if let Some(e) = outcome.ghost_error {
                        self.message = Some(e.to_string());
                    }
                    if outcome.completion.is_some() {
                        self.state = AppState::Results;
                    }
                }
            }
        }
    }

    fn on_results_key(&mut self, key: TermKeyEvent) {
        match key.code {
            KeyCode::Char('r') | KeyCode::Left => self.restart(),
            KeyCode::Char('n') | KeyCode::Right => self.new_sentence(),
            KeyCode::Char('h') => self.show(AppState::Rhythm),
            KeyCode::Char('p') => self.show(AppState::Pulse),
            _ => {}
        }
    }

    fn on_rhythm_key(&mut self, key: TermKeyEvent, now: f64) {
        match key.code {
            KeyCode::Tab => self.metric = self.metric.toggle(),
            KeyCode::Right => self.rhythm.reset(),
            KeyCode::Char(c) => {
                self.rhythm
                    .key_down(c, now, key.kind == KeyEventKind::Repeat);
                // without release reporting every press is its own release
                if !self.release_events && key.kind == KeyEventKind::Press {
                    self.rhythm.key_up(c, now);
                }
            }
            _ => {}
        }
    }

    fn on_pulse_key(&mut self, key: TermKeyEvent, timer: &dyn Timer) {
        match key.code {
            KeyCode::Char(c @ '1'..='5') => {
                let idx = c as usize - '1' as usize;
                self.select_medication(Medication::ALL[idx], timer);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.nudge_tempo(TEMPO_STEP),
            KeyCode::Char('-') => self.nudge_tempo(-TEMPO_STEP),
            KeyCode::Char(' ') => self.pulse.stop(),
            _ => {}
        }
    }

    fn select_medication(&mut self, med: Medication, timer: &dyn Timer) {
        if self.pulse_data.is_empty() {
            self.message = Some("Could not load pulse data".to_string());
            return;
        }
        self.message = match self.pulse.select(med, &self.pulse_data, timer) {
            PulseStart::Started => None,
            PulseStart::NoEvents => Some(format!("No events for {med}")),
        };
    }

    fn nudge_tempo(&mut self, delta: f64) {
        if let Err(e) = self.pulse.set_tempo(self.pulse.tempo() + delta) {
            self.message = Some(e.to_string());
        }
    }

    /// Route a timer fire to whichever playback owns its token
    pub fn on_timer(&mut self, fire: &TimerFire, timer: &dyn Timer) {
        if self.pulse.on_fire(fire, timer).is_some() {
            return;
        }
        self.controller.on_timer(fire, timer, &mut self.chart);
    }
}

/// Translate a terminal key-down into what the timing engine records
fn timing_event(key: &TermKeyEvent, now: f64) -> KeyEvent {
    let chorded = key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT);
    match key.code {
        KeyCode::Backspace => KeyEvent::backspace(now),
        KeyCode::Char(c) if !chorded => KeyEvent::char(c, now),
        _ => KeyEvent::other(now),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let store = FileConfigStore::new();
    let mut config = store.load();
    cli.apply(&mut config);

    if cli.save_config {
        store.save(&config)?;
    }

    if cli.list_profiles {
        let book = ProfileBook::builtin()?;
        for id in book.ids() {
            println!("{id}");
        }
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Err(e) = logging::init(&AppDirs::log_path()) {
        eprintln!("logging disabled: {e}");
    }

    let mut app = match App::new(&config, MonotonicClock::new()) {
        Ok(app) => app,
        Err(e) => {
            log::error!("startup failed: {e}");
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::InvalidValue, e.to_string()).exit();
        }
    };

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    app.release_events = supports_keyboard_enhancement().unwrap_or(false);
    if app.release_events {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    if app.release_events {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, C: Clock>(
    terminal: &mut Terminal<B>,
    app: &mut App<C>,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let timer = runner.source().timer();

    terminal.draw(|f| ui::draw(app, f))?;

    loop {
        match runner.step() {
            AppEvent::Key(key) => {
                if app.on_key(key, &timer) == Flow::Quit {
                    break;
                }
            }
            AppEvent::Timer(fire) => app.on_timer(&fire, &timer),
            AppEvent::Resize => {}
            AppEvent::Tick => continue,
        }
        terminal.draw(|f| ui::draw(app, f))?;
    }

    Ok(())
}
