use assert_matches::assert_matches;
use ghostkeys::{
    chart::LatestFrame,
    error::GhostError,
    ghost::{GhostGenerator, JITTER_MAX, JITTER_MIN},
    profile::ProfileBook,
    recorder::{KeyEvent, KeyPolicy, Recorded},
    scheduler::{GhostState, GhostStep, ManualTimer},
    session::{ChartMode, SessionController, SessionSettings, TypingSession},
    words::{Sentence, WordList},
};
use rand::{rngs::StdRng, SeedableRng};

/// Races a known sentence with the builtin book and a fixed seed
struct Race {
    session: TypingSession,
    generator: GhostGenerator,
    book: ProfileBook,
    rng: StdRng,
    timer: ManualTimer,
    sink: LatestFrame,
}

impl Race {
    fn new(text: &str, profile: &str) -> Self {
        Self {
            session: TypingSession::new(
                Sentence::new(text),
                profile,
                KeyPolicy::CharactersOnly,
                ChartMode::Live,
            ),
            generator: GhostGenerator::default(),
            book: ProfileBook::builtin().unwrap(),
            rng: StdRng::seed_from_u64(7),
            timer: ManualTimer::new(),
            sink: LatestFrame::default(),
        }
    }

    fn key(&mut self, event: KeyEvent) -> ghostkeys::session::KeyOutcome {
        self.session.handle_key(
            &event,
            &self.generator,
            &self.book,
            &mut self.rng,
            &self.timer,
            &mut self.sink,
        )
    }

    /// Deliver pending fires until the ghost stops moving
    fn run_ghost(&mut self) -> Vec<GhostStep> {
        let mut steps = Vec::new();
        while let Some(fire) = self.timer.pop_next() {
            steps.push(self.session.on_timer(&fire, &self.timer, &mut self.sink));
        }
        steps
    }
}

#[test]
fn ghost_plays_back_trace_and_drops_trailing_point() {
    let mut race = Race::new("QA J", "5USOYSDCXB");

    let out = race.key(KeyEvent::char('Q', 0.0));
    assert_matches!(out.ghost, Some(GhostStep::Moved(0)));
    assert_eq!(race.session.ghost().state(), GhostState::Running);

    let steps = race.run_ghost();
    assert_eq!(
        steps,
        vec![GhostStep::Moved(1), GhostStep::Moved(2), GhostStep::Moved(3)]
    );
    assert_eq!(race.session.ghost().state(), GhostState::Finished);
    assert_eq!(race.session.ghost().position(), Some(3));

    // LL then LS delays for the builtin profile, each jittered
    let plotted = race.session.ghost().plotted();
    assert_eq!(plotted.len(), 2);
    for (value, base) in plotted.iter().zip([175.8, 125.0]) {
        assert!(*value >= base * JITTER_MIN && *value < base * JITTER_MAX);
    }

    // the chart saw the finished ghost series
    let frame = race.sink.frame().unwrap();
    assert_eq!(frame.ghost.len(), 2);
}

#[test]
fn ghost_timing_follows_the_trace() {
    let mut race = Race::new("abc", "5USOYSDCXB");
    race.key(KeyEvent::char('a', 0.0));
    let first_delay = race.session.ghost().plotted()[0];

    race.timer.advance(first_delay - 1.0);
    assert_eq!(race.session.ghost().position(), Some(0));

    let due = race.timer.advance(2.0);
    assert_eq!(due.len(), 1);
    let step = race.session.on_timer(&due[0], &race.timer, &mut race.sink);
    assert_eq!(step, GhostStep::Moved(1));
}

#[test]
fn missing_profile_leaves_typing_working() {
    let mut race = Race::new("hi", "NOBODY");
    let out = race.key(KeyEvent::char('h', 0.0));
    assert_matches!(out.ghost_error, Some(GhostError::UnknownProfile(ref id)) if id == "NOBODY");
    assert_matches!(out.recorded, Some(Recorded::Pushed));
    assert_eq!(race.session.ghost().state(), GhostState::Idle);

    let out = race.key(KeyEvent::char('i', 500.0));
    assert_matches!(out.completion, Some(c) if c.wpm == 120);
}

#[test]
fn completion_reports_words_per_minute() {
    let text = "one two three four";
    let mut race = Race::new(text, "5USOYSDCXB");
    let gaps = (text.len() - 1) as f64;

    let mut completion = None;
    for (i, c) in text.chars().enumerate() {
        let out = race.key(KeyEvent::char(c, i as f64 * 4000.0 / gaps));
        completion = completion.or(out.completion);
    }

    let done = completion.unwrap();
    assert!((done.elapsed_secs - 4.0).abs() < 1e-9);
    assert_eq!(done.wpm, 60);
}

#[test]
fn backspace_unwinds_timing_and_text() {
    let mut race = Race::new("abc", "5USOYSDCXB");
    race.key(KeyEvent::char('a', 0.0));
    race.key(KeyEvent::char('x', 100.0));
    assert_matches!(race.key(KeyEvent::backspace(150.0)).recorded, Some(Recorded::Popped));
    race.key(KeyEvent::char('b', 300.0));

    assert_eq!(race.session.typed(), "ab");
    assert_eq!(race.session.recorder().timestamps(), &[0.0, 300.0]);
    assert_eq!(race.session.recorder().latencies(), &[300.0]);
}

#[test]
fn reset_mid_race_keeps_one_live_ghost() {
    let mut ctrl = SessionController::new(
        WordList::parse("alpha\nbeta\ngamma"),
        ProfileBook::builtin().unwrap(),
        SessionSettings {
            number_of_words: 2,
            ..SessionSettings::default()
        },
        StdRng::seed_from_u64(5),
    );
    let timer = ManualTimer::new();
    let mut sink = LatestFrame::default();

    let text = ctrl.start_new().unwrap().sentence().text().to_string();
    let first = text.chars().next().unwrap();
    ctrl.on_key(&KeyEvent::char(first, 0.0), &timer, &mut sink);
    let old_token = ctrl.active().unwrap().ghost().token().clone();

    ctrl.restart().unwrap();
    assert!(old_token.is_cancelled());
    assert_eq!(ctrl.active().unwrap().sentence().text(), text);
    ctrl.on_key(&KeyEvent::char(first, 1000.0), &timer, &mut sink);

    let mut moved = 0;
    let mut stale = 0;
    while let Some(fire) = timer.pop_next() {
        match ctrl.on_timer(&fire, &timer, &mut sink) {
            GhostStep::Stale => {
                assert!(fire.token.same_as(&old_token));
                stale += 1;
            }
            GhostStep::Moved(_) | GhostStep::Finished => moved += 1,
        }
    }

    let n = text.chars().count();
    assert_eq!(stale, 1);
    assert_eq!(moved, n - 1);
    let ghost = ctrl.active().unwrap().ghost();
    assert_eq!(ghost.state(), GhostState::Finished);
    assert_eq!(ghost.plotted().len(), n - 2);
}
