pub mod charting;

use ghostkeys::{
    clock::Clock,
    pulse::{Medication, PulsePhase},
    rhythm,
    session::{CharState, TypingSession},
    util::LatencySummary,
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::{ui::charting::format_label, App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

const REAL_COLOR: Color = Color::Cyan;
const GHOST_COLOR: Color = Color::Magenta;
const REFERENCE_COLOR: Color = Color::Red;

pub fn draw<C: Clock>(app: &App<C>, f: &mut Frame) {
    f.render_widget(app, f.area());
}

impl<C: Clock> Widget for &App<C> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(1), // message
                Constraint::Length(1), // legend
            ])
            .split(area);

        match self.state {
            AppState::Typing => render_race(self, chunks[0], buf),
            AppState::Results => render_results(self, chunks[0], buf),
            AppState::Rhythm => render_rhythm(self, chunks[0], buf),
            AppState::Pulse => render_pulse(self, chunks[0], buf),
        }

        if let Some(message) = &self.message {
            Paragraph::new(Span::styled(
                message.as_str(),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
        }

        Paragraph::new(Span::styled(
            legend(self.state),
            Style::default().add_modifier(Modifier::ITALIC),
        ))
        .render(chunks[2], buf);
    }
}

fn legend(state: AppState) -> &'static str {
    match state {
        AppState::Typing => "(←) restart / (→) new / (F2) rhythm / (F3) pulse / (esc)ape",
        AppState::Results => "(r)estart / (n)ew / r(h)ythm / (p)ulse / (esc)ape",
        AppState::Rhythm => "(tab) metric / (→) reset / (F1) race / (F3) pulse / (esc)ape",
        AppState::Pulse => {
            "(1-5) medication / (+/-) tempo / (space) stop / (F1) race / (esc)ape"
        }
    }
}

/// Sentence line with the user caret (underlined) and the ghost caret (reversed)
fn sentence_line(session: &TypingSession) -> Line<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = bold.add_modifier(Modifier::DIM);
    let cursor = session.cursor();
    let ghost_at = session.ghost().position();

    let spans = session
        .sentence()
        .chars()
        .iter()
        .zip(session.char_states())
        .enumerate()
        .map(|(idx, (expected, state))| {
            let (text, mut style) = match state {
                CharState::Correct => (expected.to_string(), bold.fg(Color::Green)),
                CharState::Incorrect if *expected == ' ' => ("_".to_string(), bold.fg(Color::Red)),
                CharState::Incorrect => (expected.to_string(), bold.fg(Color::Red)),
                CharState::Pending => (expected.to_string(), dim),
            };
            if idx == cursor {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            if ghost_at == Some(idx) {
                style = style.fg(GHOST_COLOR).add_modifier(Modifier::REVERSED);
            }
            Span::styled(text, style)
        })
        .collect::<Vec<_>>();

    Line::from(spans)
}

fn latency_chart<'a>(
    real: &'a [(f64, f64)],
    ghost: &'a [(f64, f64)],
    (x, y): ([f64; 2], [f64; 2]),
) -> Chart<'a> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let datasets = vec![
        Dataset::default()
            .name("you")
            .marker(Marker::Braille)
            .style(Style::default().fg(REAL_COLOR))
            .graph_type(GraphType::Line)
            .data(real),
        Dataset::default()
            .name("ghost")
            .marker(Marker::Braille)
            .style(Style::default().fg(GHOST_COLOR))
            .graph_type(GraphType::Line)
            .data(ghost),
    ];

    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("character")
                .bounds(x)
                .labels(vec![
                    Span::styled(format_label(x[0]), bold),
                    Span::styled(format_label(x[1]), bold),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("ms")
                .bounds(y)
                .labels(vec![
                    Span::styled("0", bold),
                    Span::styled(format_label(y[1]), bold),
                ]),
        )
}

fn render_chart<C: Clock>(app: &App<C>, area: Rect, buf: &mut Buffer) {
    let Some(frame) = app.chart.frame() else {
        return;
    };
    let real = charting::to_tuples(&frame.real);
    let ghost = charting::to_tuples(&frame.ghost);
    latency_chart(&real, &ghost, charting::latency_bounds(frame)).render(area, buf);
}

fn render_race<C: Clock>(app: &App<C>, area: Rect, buf: &mut Buffer) {
    let Some(session) = app.controller.active() else {
        return;
    };

    let width = area.width.max(1) as usize;
    let text_width = session.sentence().text().width();
    let prompt_lines = text_width.div_ceil(width).max(1) as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // profile
            Constraint::Length(prompt_lines + 1),
            Constraint::Min(1), // chart
        ])
        .split(area);

    Paragraph::new(Span::styled(
        format!("ghost: {}", session.profile_id()),
        Style::default().fg(GHOST_COLOR).add_modifier(Modifier::DIM),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    Paragraph::new(sentence_line(session))
        .alignment(if prompt_lines == 1 {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: false })
        .render(chunks[1], buf);

    if session.chart_visible() {
        render_chart(app, chunks[2], buf);
    }
}

fn render_results<C: Clock>(app: &App<C>, area: Rect, buf: &mut Buffer) {
    let Some(session) = app.controller.active() else {
        return;
    };
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // chart
            Constraint::Length(1), // done line
            Constraint::Length(1), // latency stats
        ])
        .split(area);

    render_chart(app, chunks[0], buf);

    if let Some(done) = session.completion() {
        Paragraph::new(Span::styled(
            format!("Done! Time: {:.2}s, WPM: {}", done.elapsed_secs, done.wpm),
            bold,
        ))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);
    }

    let stats = match LatencySummary::of(session.recorder().latencies()) {
        Some(s) => format!("latency {:.0} ms avg   {:.2} sd", s.mean_ms, s.std_dev_ms),
        None => "latency n/a".to_string(),
    };
    Paragraph::new(Span::styled(stats, bold.add_modifier(Modifier::DIM)))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
}

fn render_rhythm<C: Clock>(app: &App<C>, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let view = rhythm::compare(app.rhythm.events(), app.reference.events(), app.metric);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Min(1),    // chart
            Constraint::Length(1), // mean / prompt
        ])
        .split(area);

    Paragraph::new(Span::styled(
        format!("{} over time", view.metric),
        bold.fg(REAL_COLOR),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    let datasets = vec![
        Dataset::default()
            .name("you")
            .marker(Marker::Dot)
            .style(Style::default().fg(REAL_COLOR))
            .graph_type(GraphType::Scatter)
            .data(&view.user),
        Dataset::default()
            .name("reference")
            .marker(Marker::Dot)
            .style(Style::default().fg(REFERENCE_COLOR))
            .graph_type(GraphType::Scatter)
            .data(&view.reference),
    ];
    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([0.0, view.x_max])
                .labels(vec![
                    Span::styled("0", bold),
                    Span::styled(format_label(view.x_max), bold),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("ms")
                .bounds([0.0, view.y_max])
                .labels(vec![
                    Span::styled("0", bold),
                    Span::styled(format_label(view.y_max.round()), bold),
                ]),
        )
        .render(chunks[1], buf);

    let footer = match (view.message, view.user_mean) {
        (Some(message), _) => message.to_string(),
        (None, Some(m)) => format!("your mean {}: {m:.1} ms", view.metric),
        (None, None) => String::new(),
    };
    Paragraph::new(Span::styled(footer, bold.add_modifier(Modifier::ITALIC)))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
}

fn render_pulse<C: Clock>(app: &App<C>, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let frame = app.pulse.frame();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // medication list
            Constraint::Length(1), // status
            Constraint::Min(3),    // pulse box
        ])
        .split(area);

    let meds = Medication::ALL
        .iter()
        .enumerate()
        .map(|(i, med)| {
            let style = if app.pulse.medication() == Some(*med) {
                bold.fg(Color::Green)
            } else {
                Style::default()
            };
            Span::styled(format!(" ({}) {} ", i + 1, med), style)
        })
        .collect::<Vec<_>>();
    Paragraph::new(Line::from(meds))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let total = app
        .pulse
        .medication()
        .map_or(0, |med| app.pulse_data.events(med).len());
    let mut status = format!("tempo {:.2}x", app.pulse.tempo());
    if total > 0 {
        status.push_str(&format!("   event {}/{}", (frame.index + 1).min(total), total));
    }
    if let Some(ev) = frame.current {
        status.push_str(&format!("   hold {:.0} ms   flight {:.0} ms", ev.hold, ev.flight));
    }
    Paragraph::new(Span::styled(status, bold.add_modifier(Modifier::DIM)))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    let (label, fill) = match frame.phase {
        PulsePhase::Pressed => ("●", Style::default().bg(Color::Green).fg(Color::Black)),
        PulsePhase::Released | PulsePhase::Waiting => ("○", Style::default()),
        PulsePhase::Done => ("done", Style::default().add_modifier(Modifier::DIM)),
        PulsePhase::Idle => ("select a medication", Style::default().add_modifier(Modifier::DIM)),
    };
    let side = chunks[2].height.min(chunks[2].width / 2).max(3);
    let box_area = centered(chunks[2], side * 2, side);
    Paragraph::new(label)
        .style(fill)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("pulse"))
        .render(box_area, buf);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Flow;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ghostkeys::{
        clock::ManualClock,
        config::Config,
        pulse::PulseEvent,
        scheduler::ManualTimer,
    };
    use ratatui::{backend::TestBackend, Terminal};

    fn test_app() -> App<ManualClock> {
        let config = Config {
            number_of_words: 2,
            ..Config::default()
        };
        App::new(&config, ManualClock::new(0.0)).unwrap()
    }

    fn rendered(app: &App<ManualClock>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(app, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn press(app: &mut App<ManualClock>, code: KeyCode, timer: &ManualTimer) -> Flow {
        app.clock.advance(120.0);
        app.on_key(KeyEvent::new(code, KeyModifiers::NONE), timer)
    }

    #[test]
    fn test_race_screen_shows_sentence_and_profile() {
        let app = test_app();
        let text = app.controller.active().unwrap().sentence().text().to_string();
        let out = rendered(&app);
        assert!(out.contains(&text));
        assert!(out.contains("ghost: 5USOYSDCXB"));
        assert!(out.contains("(→) new"));
    }

    #[test]
    fn test_incorrect_space_renders_as_underscore() {
        let mut app = test_app();
        let timer = ManualTimer::new();
        let text = app.controller.active().unwrap().sentence().text().to_string();
        let space_at = text.find(' ').unwrap();
        for c in text[..space_at].chars() {
            press(&mut app, KeyCode::Char(c), &timer);
        }
        press(&mut app, KeyCode::Char('x'), &timer);

        let typed_line = format!("{}_", &text[..space_at]);
        assert!(rendered(&app).contains(&typed_line));
    }

    #[test]
    fn test_results_screen_shows_done_line() {
        let mut app = test_app();
        let timer = ManualTimer::new();
        let text = app.controller.active().unwrap().sentence().text().to_string();
        for c in text.chars() {
            press(&mut app, KeyCode::Char(c), &timer);
        }
        assert_eq!(app.state, AppState::Results);

        let out = rendered(&app);
        let done = app.controller.active().unwrap().completion().unwrap();
        assert!(out.contains(&format!(
            "Done! Time: {:.2}s, WPM: {}",
            done.elapsed_secs, done.wpm
        )));
        assert!(out.contains("latency"));
    }

    #[test]
    fn test_rhythm_screen_prompts_before_typing() {
        let mut app = test_app();
        let timer = ManualTimer::new();
        press(&mut app, KeyCode::F(2), &timer);
        let out = rendered(&app);
        assert!(out.contains("Start typing to see your rhythm vs. Parkinson's sample."));
        assert!(out.contains("Hold Time over time"));
    }

    #[test]
    fn test_pulse_screen_lists_medications() {
        let mut app = test_app();
        let timer = ManualTimer::new();
        app.pulse_data
            .insert(Medication::Levodopa, vec![PulseEvent { hold: 90.0, flight: 200.0 }]);
        press(&mut app, KeyCode::F(3), &timer);
        press(&mut app, KeyCode::Char('1'), &timer);
        let fire = timer.pop_next().unwrap();
        app.on_timer(&fire, &timer);

        let out = rendered(&app);
        assert!(out.contains("(1) Levodopa"));
        assert!(out.contains("(5) No Med"));
        assert!(out.contains("hold 90 ms"));
        assert!(out.contains("event 1/1"));
    }

    #[test]
    fn test_small_terminal_does_not_panic() {
        let app = test_app();
        let mut terminal = Terminal::new(TestBackend::new(12, 6)).unwrap();
        terminal.draw(|f| draw(&app, f)).unwrap();
    }

    #[test]
    fn test_centered_fits_inside() {
        let area = Rect::new(0, 0, 10, 4);
        let r = centered(area, 20, 2);
        assert_eq!(r, Rect::new(0, 1, 10, 2));
    }
}
