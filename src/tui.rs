use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Wrap};

use crate::app::{ProgressEvent, ProgressSink};
use crate::error::LinksError;

const EVENTS_MAX: usize = 8;
const LOGS_MAX: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Search,
    Pair,
    Link,
    Write,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Phase::Search => "Search",
            Phase::Pair => "Pair",
            Phase::Link => "Link",
            Phase::Write => "Write",
        }
    }
}

#[derive(Debug)]
struct RunState {
    status: String,
    phase: Phase,
    done: usize,
    total: usize,
    requests: u64,
    latency_ms: Option<u128>,
    events: VecDeque<String>,
    logs: VecDeque<String>,
    started: Instant,
    show_logs: bool,
}

/// Full-screen progress view shown while links are generated.
pub struct Tui {
    state: Arc<Mutex<RunState>>,
}

struct TuiProgress {
    state: Arc<Mutex<RunState>>,
}

impl ProgressSink for TuiProgress {
    fn event(&self, event: ProgressEvent) {
        if let Ok(mut state) = self.state.lock() {
            let message = event.message.trim().to_string();
            if let Some(elapsed) = event.elapsed {
                state.latency_ms = Some(elapsed.as_millis());
            }
            if let Some((phase, payload)) = parse_phase(&message) {
                state.phase = phase;
                state.status = payload.to_string();
            } else if event.elapsed.is_none() && !message.starts_with("link ") {
                state.status = message.clone();
            }
            if message == "catalog.request" {
                state.requests = state.requests.saturating_add(1);
            }
            if let Some((done, total)) = event.progress {
                state.done = done;
                state.total = total;
            }

            if !message.starts_with("link ") {
                push_bounded(&mut state.events, message.clone(), EVENTS_MAX);
            }
            push_bounded(
                &mut state.logs,
                format!("[{}] {message}", Utc::now().format("%H:%M:%S")),
                LOGS_MAX,
            );
        }
    }
}

impl Default for Tui {
    fn default() -> Self {
        Self::new()
    }
}

impl Tui {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RunState {
                status: "starting".to_string(),
                phase: Phase::Search,
                done: 0,
                total: 0,
                requests: 0,
                latency_ms: None,
                events: VecDeque::new(),
                logs: VecDeque::new(),
                started: Instant::now(),
                show_logs: false,
            })),
        }
    }

    /// Runs `f` on a worker thread while drawing its progress. Esc leaves the
    /// view and reports the run as aborted.
    pub fn run<F, R>(&mut self, f: F) -> miette::Result<R>
    where
        F: FnOnce(&dyn ProgressSink) -> Result<R, LinksError> + Send + 'static,
        R: Send + 'static,
    {
        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let (tx, rx) = std::sync::mpsc::channel();
        let sink = TuiProgress {
            state: self.state.clone(),
        };
        let handle = thread::spawn(move || tx.send(f(&sink)));

        let mut tick = 0usize;
        loop {
            if let Ok(state) = self.state.lock() {
                terminal
                    .draw(|frame| draw_ui(frame, &state, tick))
                    .into_diagnostic()?;
            }

            if let Ok(result) = rx.try_recv() {
                restore_terminal()?;
                handle.join().ok();
                return result.map_err(miette::Report::new);
            }

            if event::poll(Duration::from_millis(120)).into_diagnostic()? {
                if let Event::Key(key) = event::read().into_diagnostic()? {
                    if key.kind == KeyEventKind::Press {
                        match key.code {
                            KeyCode::Esc => break,
                            KeyCode::Char('l') | KeyCode::F(4) => self.toggle_logs(),
                            _ => {}
                        }
                    }
                }
            }

            tick = tick.wrapping_add(1);
        }

        restore_terminal()?;
        Err(miette::Report::msg("aborted"))
    }

    fn toggle_logs(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.show_logs = !state.show_logs;
        }
    }
}

fn restore_terminal() -> miette::Result<()> {
    disable_raw_mode().into_diagnostic()?;
    let mut stdout = io::stdout();
    stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
    Ok(())
}

fn draw_ui(frame: &mut ratatui::Frame, state: &RunState, tick: usize) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let hb = if tick % 2 == 0 { "*" } else { " " };
    let latency = state
        .latency_ms
        .map(|v| format!("{v} ms"))
        .unwrap_or_else(|| "--".to_string());
    let header = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                "DX-LINKS",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(env!("CARGO_PKG_VERSION"), Style::default().fg(Color::Gray)),
            Span::raw("   Phase: "),
            Span::styled(state.phase.label(), Style::default().fg(Color::Cyan)),
            Span::raw("   "),
            Span::styled(hb, Style::default().fg(Color::Green)),
        ]),
        Line::from(Span::styled(
            format!(
                "Elapsed: {}s   Searches: {}   Last search: {latency}",
                state.started.elapsed().as_secs(),
                state.requests
            ),
            Style::default().fg(Color::Gray),
        )),
    ])
    .alignment(Alignment::Left)
    .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let ratio = if state.total == 0 {
        0.0
    } else {
        (state.done as f64 / state.total as f64).clamp(0.0, 1.0)
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Links"))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio)
        .label(format!("{}/{}", state.done, state.total));
    frame.render_widget(gauge, chunks[1]);

    let body = if state.show_logs {
        let lines: Vec<Line> = state
            .logs
            .iter()
            .rev()
            .take(usize::from(chunks[2].height))
            .rev()
            .map(|line| Line::from(line.clone()))
            .collect();
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Logs"))
    } else {
        let mut lines = vec![Line::from(vec![
            Span::styled("Status: ", Style::default().fg(Color::Gray)),
            Span::raw(state.status.clone()),
        ])];
        lines.push(Line::from(""));
        for event in state.events.iter().rev() {
            lines.push(Line::from(format!("- {event}")));
        }
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Events"))
    };
    frame.render_widget(body.wrap(Wrap { trim: true }), chunks[2]);

    let footer = Paragraph::new(Line::from(Span::styled(
        "l logs   Esc abort",
        Style::default().fg(Color::Gray),
    )));
    frame.render_widget(footer, chunks[3]);
}

fn parse_phase(message: &str) -> Option<(Phase, &str)> {
    let (phase, rest) = message.strip_prefix("phase=")?.split_once(';')?;
    let phase = match phase {
        "Search" => Phase::Search,
        "Pair" => Phase::Pair,
        "Link" => Phase::Link,
        "Write" => Phase::Write,
        _ => return None,
    };
    Some((phase, rest.trim()))
}

fn push_bounded(buffer: &mut VecDeque<String>, item: String, max: usize) {
    buffer.push_back(item);
    while buffer.len() > max {
        buffer.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_messages_are_recognised() {
        assert_eq!(
            parse_phase("phase=Link; bam: generating 3 links"),
            Some((Phase::Link, "bam: generating 3 links"))
        );
        assert_eq!(parse_phase("phase=Fetch; x"), None);
        assert_eq!(parse_phase("catalog.request"), None);
    }

    #[test]
    fn sink_tracks_progress_and_requests() {
        let tui = Tui::new();
        let sink = TuiProgress {
            state: tui.state.clone(),
        };
        sink.event(ProgressEvent::message("catalog.request"));
        sink.event(ProgressEvent {
            message: "catalog.response latency_ms=42".to_string(),
            elapsed: Some(Duration::from_millis(42)),
            progress: None,
        });
        sink.event(ProgressEvent {
            message: "link a.bam".to_string(),
            elapsed: None,
            progress: Some((1, 4)),
        });
        let state = tui.state.lock().unwrap();
        assert_eq!(state.requests, 1);
        assert_eq!(state.latency_ms, Some(42));
        assert_eq!((state.done, state.total), (1, 4));
        assert_eq!(state.events.len(), 2);
        assert_eq!(state.logs.len(), 3);
        assert_eq!(state.status, "catalog.request");
    }
}
