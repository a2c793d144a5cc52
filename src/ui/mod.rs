//! # Terminal UI Module
//!
//! Live 2x2 chart grid drawn with ratatui on a crossterm backend.
//!
//! This module handles:
//! - Terminal setup and restoration (raw mode, alternate screen)
//! - Redrawing the charts on a fixed refresh interval
//! - Showing connection state, sample counts and the recording target
//! - Quitting on `q`, `Esc` or `Ctrl+C`

pub mod chart;

use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{cursor, execute};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::{Frame, Terminal};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::acquisition::{LinkState, CONNECTION_LOST_MESSAGE};
use crate::error::Result;
use crate::telemetry::{lock_buffer, Channel, Reading, SharedBuffer};

/// Heading above the chart grid
pub const WINDOW_TITLE: &str = "Real-Time Serial Data Visualization";

/// One chart's worth of data copied out of the shared buffer
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub channel: Channel,
    pub points: Vec<(f64, f64)>,
    pub y_bounds: [f64; 2],
}

/// Everything a frame needs, taken under a single lock
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub panels: Vec<Panel>,
    pub x_bounds: Option<[f64; 2]>,
    pub held: usize,
    pub capacity: usize,
    pub total_received: u64,
    pub latest: Option<Reading>,
}

/// UI state
pub struct App {
    buffer: SharedBuffer,
    link: watch::Receiver<LinkState>,
    recording: Option<PathBuf>,
    refresh_interval: Duration,
    connection_lost: bool,
    should_quit: bool,
}

impl App {
    pub fn new(
        buffer: SharedBuffer,
        link: watch::Receiver<LinkState>,
        recording: Option<PathBuf>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            buffer,
            link,
            recording,
            refresh_interval,
            connection_lost: false,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Whether the reconnect warning is showing
    pub fn connection_lost(&self) -> bool {
        self.connection_lost
    }

    /// React to a key press
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            _ => {}
        }
    }

    /// Read the latest link state and update the sticky reconnect warning
    ///
    /// The warning appears once a live connection drops and stays until a
    /// device is connected again.
    pub fn refresh_link_state(&mut self) -> LinkState {
        let state = self.link.borrow_and_update().clone();

        match &state {
            LinkState::Connected { .. } => self.connection_lost = false,
            LinkState::Disconnected { lost_connection: true, .. } => self.connection_lost = true,
            _ => {}
        }

        state
    }

    /// Copy the buffered series and bounds for drawing
    pub fn snapshot(&self) -> Snapshot {
        let buffer = lock_buffer(&self.buffer);

        let panels = Channel::ALL
            .iter()
            .filter_map(|&channel| {
                buffer.value_bounds(channel).map(|y_bounds| Panel {
                    channel,
                    points: buffer.series(channel),
                    y_bounds,
                })
            })
            .collect();

        Snapshot {
            panels,
            x_bounds: buffer.time_bounds(),
            held: buffer.len(),
            capacity: buffer.capacity(),
            total_received: buffer.total_received(),
            latest: buffer.latest().map(|s| s.reading),
        }
    }

    /// Status bar lines
    pub fn status_lines(&self, state: &LinkState, snapshot: &Snapshot) -> Vec<Line<'static>> {
        let link = match state {
            LinkState::Connecting => Span::styled("Scanning ports...", Style::default().fg(Color::Yellow)),
            LinkState::Connected { port } => {
                Span::styled(format!("Connected to {}", port), Style::default().fg(Color::Green))
            }
            LinkState::Disconnected { reason, .. } => {
                Span::styled(format!("Disconnected ({})", reason), Style::default().fg(Color::Red))
            }
            LinkState::Stopped => Span::styled("Stopped", Style::default().fg(Color::DarkGray)),
        };

        let counts = Span::raw(format!(
            "  |  Samples: {}/{}  |  Received: {}",
            snapshot.held, snapshot.capacity, snapshot.total_received
        ));

        let latest = match &snapshot.latest {
            Some(r) => format!(
                "Latest: {:.2} °C  {:.2} V  {:.3} A  {:.2} W",
                r.temperature, r.voltage, r.current, r.power
            ),
            None => "Latest: -".to_string(),
        };

        let recording = match &self.recording {
            Some(path) => format!("  |  Recording: {}", path.display()),
            None => "  |  Recording: off".to_string(),
        };

        vec![
            Line::from(vec![link, counts]),
            Line::from(vec![
                Span::raw(latest),
                Span::raw(recording),
                Span::styled("  |  q: quit", Style::default().fg(Color::DarkGray)),
            ]),
        ]
    }

    /// Render one frame
    pub fn draw(&mut self, frame: &mut Frame) {
        let state = self.refresh_link_state();
        let snapshot = self.snapshot();
        let show_warning = self.connection_lost && !state.is_connected();

        let mut constraints = vec![Constraint::Length(1)];
        if show_warning {
            constraints.push(Constraint::Length(1));
        }
        constraints.push(Constraint::Min(8));
        constraints.push(Constraint::Length(4));

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(frame.size());

        let title = Paragraph::new(Span::styled(
            WINDOW_TITLE,
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center);
        frame.render_widget(title, rows[0]);

        let mut next = 1;
        if show_warning {
            let warning = Paragraph::new(Span::styled(
                CONNECTION_LOST_MESSAGE,
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center);
            frame.render_widget(warning, rows[next]);
            next += 1;
        }

        self.draw_grid(frame, rows[next], &snapshot);

        let status = Paragraph::new(self.status_lines(&state, &snapshot))
            .block(Block::default().borders(Borders::ALL).title("Status"));
        frame.render_widget(status, rows[next + 1]);
    }

    fn draw_grid(&self, frame: &mut Frame, area: Rect, snapshot: &Snapshot) {
        let halves = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let mut cells = Vec::with_capacity(4);
        for half in halves.iter() {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(*half);
            cells.extend(columns.iter().copied());
        }

        for (channel, cell) in Channel::ALL.iter().zip(cells) {
            let panel = snapshot.panels.iter().find(|p| p.channel == *channel);

            match (panel, snapshot.x_bounds) {
                (Some(panel), Some(x_bounds)) => {
                    let chart = chart::build_chart(*channel, &panel.points, x_bounds, panel.y_bounds);
                    frame.render_widget(chart, cell);
                }
                _ => frame.render_widget(chart::waiting_panel(*channel), cell),
            }
        }
    }
}

type CrosstermTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Run `undo` if `result` is an error, then pass the result through
fn undo_on_error<T, E>(result: std::result::Result<T, E>, undo: impl FnOnce()) -> std::result::Result<T, E> {
    if result.is_err() {
        undo();
    }
    result
}

/// Best-effort terminal reset for error and panic paths
fn reset_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
}

/// Leave raw mode and the alternate screen before any panic message prints
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        reset_terminal();
        previous(info);
    }));
}

fn setup_terminal() -> Result<CrosstermTerminal> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    let terminal = execute!(stdout, EnterAlternateScreen)
        .and_then(|_| Terminal::new(CrosstermBackend::new(stdout)));
    Ok(undo_on_error(terminal, reset_terminal)?)
}

fn restore_terminal(terminal: &mut CrosstermTerminal) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the UI until the user quits
///
/// Blocks the calling thread; run it on a blocking task.
pub fn run(mut app: App) -> Result<()> {
    install_panic_hook();
    let mut terminal = setup_terminal()?;
    info!("Terminal UI started");

    let result = event_loop(&mut terminal, &mut app);
    let restored = restore_terminal(&mut terminal);

    info!("Terminal UI closed");
    result.and(restored)
}

fn event_loop(terminal: &mut CrosstermTerminal, app: &mut App) -> Result<()> {
    let mut last_draw: Option<Instant> = None;

    while !app.should_quit() {
        if last_draw.map_or(true, |t| t.elapsed() >= app.refresh_interval) {
            terminal.draw(|frame| app.draw(frame))?;
            last_draw = Some(Instant::now());
        }

        let timeout = last_draw.map_or(Duration::ZERO, |t| {
            app.refresh_interval.saturating_sub(t.elapsed())
        });
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                debug!("Key event: {:?}", key.code);
                app.handle_key(key);
            }
        }
    }

    Ok(())
}
