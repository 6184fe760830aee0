use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use std::{
    io,
    path::PathBuf,
    time::{Duration, Instant},
};

use crate::capture::{CaptureSource, Frame as CapturedFrame};
use crate::core::{CameraController, CameraError, PlaybackState, SkipOutcome};
use crate::renderer::cell::CellData;
use crate::renderer::{to_display_bitmap, Bitmap, DisplayMode, FrameProcessor, FrameView};
use crate::shared::constants;
use crate::sync::FrameTicker;
use crate::utils::{logger, snapshot};

type UiTerminal = Terminal<CrosstermBackend<io::Stderr>>;

const IDLE_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct ViewerOptions {
    pub device: i32,
    pub interval: Duration,
    pub mode: DisplayMode,
    pub fill: bool,
    pub snapshot_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Play,
    TogglePause,
    Forward,
    Rewind,
    Stop,
    Initialize,
    Resolution(usize),
    Snapshot,
    ToggleMode,
    Quit,
}

impl Action {
    fn from_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::Enter | KeyCode::Char('p') => Some(Action::Play),
            KeyCode::Char(' ') => Some(Action::TogglePause),
            KeyCode::Right | KeyCode::Char('l') => Some(Action::Forward),
            KeyCode::Left | KeyCode::Char('h') => Some(Action::Rewind),
            KeyCode::Char('x') => Some(Action::Stop),
            KeyCode::Char('i') => Some(Action::Initialize),
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                (index < constants::RESOLUTION_PRESETS.len()).then_some(Action::Resolution(index))
            }
            KeyCode::Char('c') => Some(Action::Snapshot),
            KeyCode::Char('m') => Some(Action::ToggleMode),
            KeyCode::Esc | KeyCode::Char('q') => Some(Action::Quit),
            _ => None,
        }
    }
}

/// Which controls are usable in the current playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Controls {
    play: bool,
    pause: bool,
    resume: bool,
    forward: bool,
    rewind: bool,
    stop: bool,
    resolution: bool,
}

impl Controls {
    fn for_state(state: PlaybackState) -> Self {
        let initialized = state != PlaybackState::Uninitialized;
        let running = matches!(state, PlaybackState::Running | PlaybackState::Paused);
        let paused = state == PlaybackState::Paused;
        Self {
            play: initialized && !running,
            pause: running && !paused,
            resume: initialized && paused,
            forward: initialized,
            rewind: initialized,
            stop: initialized,
            resolution: initialized,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Info,
    Warning,
}

struct StatusMessage {
    text: String,
    tone: Tone,
    expires: Instant,
}

/// Cells for one bitmap at one area size, reused until either changes.
struct RenderedFrame {
    key: (u64, u16, u16),
    cells: Vec<CellData>,
    width: usize,
}

pub struct ViewerApp<S: CaptureSource> {
    camera: CameraController<S>,
    ticker: FrameTicker,
    options: ViewerOptions,
    mode: DisplayMode,
    bitmap: Option<Bitmap>,
    rendered: Option<RenderedFrame>,
    status: Option<StatusMessage>,
    error: Option<String>,
    should_quit: bool,
}

impl<S: CaptureSource> ViewerApp<S> {
    pub fn new(camera: CameraController<S>, options: ViewerOptions) -> Self {
        Self {
            camera,
            ticker: FrameTicker::new(options.interval),
            mode: options.mode,
            options,
            bitmap: None,
            rendered: None,
            status: None,
            error: None,
            should_quit: false,
        }
    }

    /// Open the configured device, as the viewer does on launch.
    pub fn boot(&mut self) {
        self.initialize();
    }

    fn notify(&mut self, text: impl Into<String>, millis: u64) {
        self.status = Some(StatusMessage {
            text: text.into(),
            tone: Tone::Info,
            expires: Instant::now() + Duration::from_millis(millis),
        });
    }

    fn warn(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            tone: Tone::Warning,
            expires: Instant::now() + Duration::from_millis(constants::STATUS_MESSAGE_LONG_MS),
        });
    }

    fn show_error(&mut self, message: String) {
        logger::error(&message);
        self.error = Some(message);
        self.warn("Error occurred");
    }

    fn expire_status(&mut self) {
        if self.status.as_ref().map_or(false, |s| Instant::now() >= s.expires) {
            self.status = None;
        }
    }

    fn controls(&self) -> Controls {
        Controls::for_state(self.camera.state())
    }

    fn present(&mut self, frame: &CapturedFrame) {
        if let Some(bitmap) = to_display_bitmap(frame) {
            self.bitmap = Some(bitmap);
        }
    }

    fn on_key(&mut self, key: KeyCode) {
        if self.error.is_some() {
            match key {
                KeyCode::Enter | KeyCode::Esc => self.error = None,
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            }
            return;
        }

        if let Some(action) = Action::from_key(key) {
            self.handle(action);
        }
    }

    fn handle(&mut self, action: Action) {
        let controls = self.controls();
        match action {
            Action::Play if controls.play => self.play(),
            Action::TogglePause if controls.resume => self.resume(),
            Action::TogglePause if controls.pause => self.pause(),
            Action::Forward if controls.forward => self.skip(constants::SKIP_STEP),
            Action::Rewind if controls.rewind => self.skip(-constants::SKIP_STEP),
            Action::Stop if controls.stop => self.stop(),
            Action::Resolution(index) if controls.resolution => self.change_resolution(index),
            Action::Initialize => self.initialize(),
            Action::Snapshot => self.snapshot(),
            Action::ToggleMode => {
                self.mode = self.mode.toggled();
                self.notify(format!("Display mode: {}", self.mode.label()), constants::STATUS_MESSAGE_SHORT_MS);
            }
            Action::Quit => self.should_quit = true,
            _ => self.warn(format!("Not available while {}", self.camera.state().label())),
        }
    }

    fn initialize(&mut self) {
        self.ticker.stop();
        self.bitmap = None;
        match self.camera.initialize(self.options.device) {
            Ok(change) if change.is_exact() => {
                self.notify("Camera initialized successfully", constants::STATUS_MESSAGE_LONG_MS)
            }
            Ok(change) => self.warn(format!(
                "Camera initialized at {} (requested {})",
                change.actual, change.requested
            )),
            Err(e) => self.show_error(format!("Failed to initialize camera: {}", e)),
        }
    }

    fn play(&mut self) {
        match self.camera.start() {
            Ok(()) => {
                self.ticker.start();
                self.notify("Camera started", constants::STATUS_MESSAGE_MS);
            }
            Err(e) => self.show_error(format!("Failed to start camera: {}", e)),
        }
    }

    fn pause(&mut self) {
        match self.camera.pause() {
            Ok(()) => {
                self.ticker.stop();
                self.notify("Camera paused", constants::STATUS_MESSAGE_MS);
            }
            Err(e) => self.show_error(format!("Failed to pause camera: {}", e)),
        }
    }

    fn resume(&mut self) {
        match self.camera.resume() {
            Ok(()) => {
                self.ticker.start();
                self.notify("Camera resumed", constants::STATUS_MESSAGE_MS);
            }
            Err(e) => self.show_error(format!("Failed to resume camera: {}", e)),
        }
    }

    fn stop(&mut self) {
        self.ticker.stop();
        self.camera.stop();
        self.bitmap = None;
        self.notify("Camera stopped", constants::STATUS_MESSAGE_MS);
    }

    fn skip(&mut self, delta: i64) {
        match self.camera.skip_frames(delta) {
            Ok(SkipOutcome::Forward(report)) => {
                if let Some(frame) = self.camera.history().current().cloned() {
                    self.present(&frame);
                }
                if report.is_partial() {
                    self.warn(format!(
                        "Skipped forward {} of {} frames",
                        report.skipped, report.requested
                    ));
                } else {
                    self.notify("Skipped forward", constants::STATUS_MESSAGE_SHORT_MS);
                }
            }
            Ok(SkipOutcome::Backward(frame)) => {
                self.present(&frame);
                self.notify("Skipped backward", constants::STATUS_MESSAGE_SHORT_MS);
            }
            Ok(SkipOutcome::Unchanged) => {}
            Err(e @ CameraError::InsufficientHistory { .. }) => {
                self.warn(format!("Cannot skip backward: {}", e));
            }
            Err(e) => self.show_error(format!("Failed to skip frames: {}", e)),
        }
    }

    fn change_resolution(&mut self, index: usize) {
        let Some(&(resolution, label)) = constants::RESOLUTION_PRESETS.get(index) else {
            return;
        };

        match self.camera.set_resolution(resolution.width, resolution.height) {
            Ok(change) if change.is_exact() => {
                self.notify(format!("Resolution changed to {}", label), constants::STATUS_MESSAGE_MS)
            }
            Ok(change) => self.warn(format!(
                "Requested {} but the camera granted {}",
                label, change.actual
            )),
            Err(e) => self.show_error(format!("Failed to change resolution: {}", e)),
        }
    }

    fn snapshot(&mut self) {
        let Some(bitmap) = self.bitmap.as_ref() else {
            self.warn("No video frame available for snapshot");
            return;
        };

        match snapshot::save(bitmap, &self.options.snapshot_dir) {
            Ok(path) => self.notify(format!("Saved {}", path.display()), constants::STATUS_MESSAGE_LONG_MS),
            Err(e) => self.show_error(format!("Failed to save snapshot: {:#}", e)),
        }
    }

    /// One timer period elapsed: pull the next frame. A capture failure
    /// halts the timer and is shown to the user.
    fn on_tick(&mut self) {
        match self.camera.get_current_frame() {
            Ok(Some(frame)) => self.present(&frame),
            Ok(None) => {}
            Err(e) => {
                self.ticker.stop();
                self.show_error(format!("Error updating frame: {}", e));
            }
        }
    }

    fn rendered_cells(&mut self, area: Rect) -> Option<(&[CellData], usize)> {
        let bitmap = self.bitmap.as_ref()?;
        let key = (bitmap.sequence, area.width, area.height);

        if self.rendered.as_ref().map(|r| r.key) != Some(key) {
            match FrameProcessor::fit_bitmap(bitmap, area.width, area.height, self.options.fill) {
                Ok(cells) => {
                    self.rendered = Some(RenderedFrame {
                        key,
                        cells,
                        width: area.width.max(1) as usize,
                    });
                }
                Err(e) => {
                    logger::error(&format!("Render error: {:#}", e));
                    self.rendered = None;
                    return None;
                }
            }
        }

        self.rendered.as_ref().map(|r| (r.cells.as_slice(), r.width))
    }

    pub fn shutdown(&mut self) {
        self.ticker.stop();
        self.camera.stop();
    }
}

pub fn run<S: CaptureSource>(camera: CameraController<S>, options: ViewerOptions) -> Result<()> {
    let mut app = ViewerApp::new(camera, options);

    let mut terminal = setup_terminal()?;
    app.boot();
    let run_result = run_app(&mut terminal, &mut app);
    let restore_result = restore_terminal(&mut terminal);
    app.shutdown();

    if let Err(err) = restore_result {
        logger::error(&format!("Failed to restore terminal from viewer: {}", err));
    }

    run_result
}

fn setup_terminal() -> Result<UiTerminal> {
    enable_raw_mode().context("failed to enable raw mode")?;

    let mut stderr = io::stderr();
    execute!(stderr, EnterAlternateScreen, Hide).context("failed to switch to alternate screen")?;

    let backend = CrosstermBackend::new(stderr);
    let terminal = Terminal::new(backend).context("failed to initialize terminal backend")?;

    Ok(terminal)
}

fn restore_terminal(terminal: &mut UiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, Show)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

fn run_app<S: CaptureSource>(terminal: &mut UiTerminal, app: &mut ViewerApp<S>) -> Result<()> {
    loop {
        terminal.draw(|frame| draw_viewer(frame, app))?;

        if app.should_quit {
            break;
        }

        // Device reads happen on this thread; a slow camera stalls input too
        if event::poll(app.ticker.poll_timeout(IDLE_POLL))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key.code);
                }
            }
        }

        if app.ticker.take_due() {
            app.on_tick();
        }
        app.expire_status();
    }

    Ok(())
}

fn draw_viewer<S: CaptureSource>(frame: &mut Frame<'_>, app: &mut ViewerApp<S>) {
    let area = frame.size();

    let device = app
        .camera
        .device_index()
        .map(|i| format!("camera {}", i))
        .unwrap_or_else(|| "no camera".to_string());
    let block = Block::default().borders(Borders::ALL).title(Span::styled(
        format!(" {} | {} | {} ", constants::APP_NAME, device, app.camera.state().label()),
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(4),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(inner);

    draw_feed(frame, layout[0], app);
    draw_controls(frame, layout[1], app.controls());
    draw_settings(frame, layout[2], app);
    draw_status_bar(frame, layout[3], app);

    if let Some(message) = &app.error {
        draw_error(frame, area, message);
    }
}

fn draw_feed<S: CaptureSource>(frame: &mut Frame<'_>, area: Rect, app: &mut ViewerApp<S>) {
    let block = Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Gray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mode = app.mode;
    match app.rendered_cells(inner) {
        Some((cells, width)) => frame.render_widget(FrameView::new(cells, width, mode), inner),
        None => {
            let placeholder = Paragraph::new(Line::from(Span::styled(
                "Camera feed will appear here",
                Style::default().fg(Color::DarkGray),
            )))
            .alignment(Alignment::Center);
            let middle = Rect {
                y: inner.y + inner.height / 2,
                height: inner.height.min(1),
                ..inner
            };
            frame.render_widget(placeholder, middle);
        }
    }
}

fn control_span(keys: &str, label: &str, enabled: bool) -> Vec<Span<'static>> {
    let style = if enabled {
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    vec![
        Span::styled(format!("[{}] ", keys), Style::default().fg(Color::Yellow)),
        Span::styled(label.to_string(), style),
        Span::raw("  "),
    ]
}

fn draw_controls(frame: &mut Frame<'_>, area: Rect, controls: Controls) {
    let mut spans = Vec::new();
    spans.extend(control_span("Enter", "Play", controls.play));
    spans.extend(control_span("Space", "Pause", controls.pause));
    spans.extend(control_span("Space", "Resume", controls.resume));
    spans.extend(control_span("→", "Forward", controls.forward));
    spans.extend(control_span("←", "Rewind", controls.rewind));
    spans.extend(control_span("x", "Stop", controls.stop));
    spans.extend(control_span("c", "Snapshot", true));
    spans.extend(control_span("q", "Quit", true));

    let controls = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Playback Controls"))
        .wrap(Wrap { trim: true });
    frame.render_widget(controls, area);
}

fn draw_settings<S: CaptureSource>(frame: &mut Frame<'_>, area: Rect, app: &ViewerApp<S>) {
    let enabled = app.controls().resolution;
    let requested = app.camera.requested_resolution();

    let mut spans = vec![Span::raw("Resolution: ")];
    for (i, (resolution, label)) in constants::RESOLUTION_PRESETS.iter().enumerate() {
        let style = if *resolution == requested {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else if enabled {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!("[{}] ", i + 1), Style::default().fg(Color::Yellow)));
        spans.push(Span::styled(label.to_string(), style));
        spans.push(Span::raw("  "));
    }
    spans.push(Span::styled(
        format!("Current: {}", current_resolution_label(app)),
        Style::default()
            .fg(Color::Blue)
            .add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::raw(format!("  Mode: {} [m]", app.mode.label())));

    let settings = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Camera Settings"))
        .wrap(Wrap { trim: true });
    frame.render_widget(settings, area);
}

fn current_resolution_label<S: CaptureSource>(app: &ViewerApp<S>) -> String {
    if app.camera.is_initialized() {
        app.camera.current_resolution().to_string()
    } else {
        "-".to_string()
    }
}

fn draw_status_bar<S: CaptureSource>(frame: &mut Frame<'_>, area: Rect, app: &ViewerApp<S>) {
    let (text, style) = match &app.status {
        Some(status) => (
            status.text.clone(),
            match status.tone {
                Tone::Info => Style::default().fg(Color::White),
                Tone::Warning => Style::default().fg(Color::Yellow),
            },
        ),
        None => ("Ready".to_string(), Style::default().fg(Color::DarkGray)),
    };

    let history = app.camera.history();
    let stats = format!(
        "{} | buffer {}/{} @{} | {:.1} fps ",
        app.camera.state().label(),
        history.len(),
        history.capacity(),
        history.cursor(),
        app.ticker.fps()
    );

    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(stats.chars().count() as u16)])
        .split(area);

    frame.render_widget(Paragraph::new(Span::styled(text, style)), halves[0]);
    frame.render_widget(
        Paragraph::new(Span::styled(stats, Style::default().fg(Color::DarkGray))).alignment(Alignment::Right),
        halves[1],
    );
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

fn draw_error(frame: &mut Frame<'_>, area: Rect, message: &str) {
    let popup = centered(area, 60, 7);
    frame.render_widget(Clear, popup);

    let body = Paragraph::new(vec![
        Line::from(Span::styled(message.to_string(), Style::default().fg(Color::White))),
        Line::from(""),
        Line::from(Span::styled(
            "Enter / Esc: dismiss   q: quit",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(Span::styled(
                " Error ",
                Style::default()
                    .fg(Color::Red)
                    .add_modifier(Modifier::BOLD),
            )),
    )
    .wrap(Wrap { trim: true });
    frame.render_widget(body, popup);
}
