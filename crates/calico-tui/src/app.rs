//! App: terminal front-end event loop.
//!
//! Architecture:
//! - `App` owns the components and an `AppState` snapshot.
//! - A `tokio::mpsc` channel carries `AppMessage` events in from the key
//!   reader and the PlayerCore broadcast.
//! - The event loop draws a frame whenever something changed, then awaits
//!   the next message.
//! - Keys become `Action`s; actions that need the core are sent as
//!   `CoreEvent::Command`.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::Block,
    Terminal,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use calico_proto::protocol::Command;
use calico_proto::state::{SessionState, StateManager};

use crate::{
    action::Action,
    app_state::AppState,
    component::Component,
    components::{
        header::Header, log_panel::LogPanel, now_playing::NowPlayingPane,
        rating_pane::RatingPane, recent::RecentPane,
    },
    core::CoreEvent,
    theme::C_BG,
    widgets::status_bar,
    BroadcastMessage,
};

/// Lines of calico.log kept for the log panel.
const LOG_TAIL: usize = 200;

#[derive(Debug)]
enum AppMessage {
    Event(Event),
    StateUpdated(SessionState),
}

pub struct App {
    cmd_tx: mpsc::Sender<CoreEvent>,
    state_manager: Arc<StateManager>,
    log_path: PathBuf,
    state: AppState,

    header: Header,
    now_playing: NowPlayingPane,
    rating: RatingPane,
    recent: RecentPane,
    log_panel: LogPanel,

    show_keys_bar: bool,
    should_quit: bool,
}

impl App {
    pub fn new(
        cmd_tx: mpsc::Sender<CoreEvent>,
        state_manager: Arc<StateManager>,
        log_path: PathBuf,
    ) -> Self {
        Self {
            cmd_tx,
            state_manager,
            log_path,
            state: AppState::new(SessionState::new(String::new(), 0.0)),
            header: Header::new(),
            now_playing: NowPlayingPane::new(),
            rating: RatingPane::new(),
            recent: RecentPane::new(),
            log_panel: LogPanel::new(),
            show_keys_bar: true,
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(
        mut self,
        mut broadcast_rx: broadcast::Receiver<BroadcastMessage>,
    ) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        self.state.session = self.state_manager.get_state().await;
        self.reload_log();

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);

        // ── Background task: keyboard events ─────────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: broadcast receiver (PlayerCore → AppMessage) ────
        let bc_tx = tx.clone();
        let bc_state_manager = Arc::clone(&self.state_manager);
        tokio::spawn(async move {
            loop {
                match broadcast_rx.recv().await {
                    Ok(BroadcastMessage::StateUpdated) => {
                        let state = bc_state_manager.get_state().await;
                        if bc_tx.send(AppMessage::StateUpdated(state)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("broadcast receiver lagged by {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        // calico.log tail refresh: every 2s
        let mut log_refresh = tokio::time::interval(Duration::from_secs(2));
        log_refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    const MAX_DRAIN: usize = 64;
                    let mut redraw = self.handle_message(msg).await;
                    let mut drained = 0usize;
                    while drained < MAX_DRAIN {
                        let Ok(next) = rx.try_recv() else { break };
                        drained += 1;
                        redraw |= self.handle_message(next).await;
                    }
                    needs_redraw = redraw;
                }

                _ = log_refresh.tick() => {
                    needs_redraw = self.reload_log();
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        Ok(())
    }

    /// Returns true when the frame needs redrawing.
    async fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(Event::Key(key)) => match Action::from_key(key) {
                Some(action) => {
                    self.dispatch(action).await;
                    true
                }
                None => false,
            },
            AppMessage::Event(Event::Resize(_, _)) => true,
            AppMessage::Event(_) => false,
            AppMessage::StateUpdated(state) => {
                self.state.session = state;
                true
            }
        }
    }

    async fn dispatch(&mut self, action: Action) {
        match action {
            Action::ToggleLogs => {
                self.log_panel.toggle();
                self.reload_log();
            }
            Action::ToggleKeys => self.show_keys_bar = !self.show_keys_bar,
            Action::Quit => {
                info!("quit requested");
                let _ = self.cmd_tx.send(CoreEvent::Shutdown).await;
                self.should_quit = true;
            }
            other => {
                let Some(cmd) = other.to_command(&self.state.session) else {
                    debug!("action {:?} ignored", other);
                    return;
                };
                // Show the new level at once; the core coalesces the mpv side.
                if let Command::Volume { value } = cmd {
                    self.state.session.volume = value;
                }
                self.send_cmd(cmd).await;
            }
        }
    }

    async fn send_cmd(&self, cmd: Command) {
        if self.cmd_tx.send(CoreEvent::Command(cmd)).await.is_err() {
            warn!("PlayerCore is gone; command dropped");
        }
    }

    /// Read the tail of calico.log.  Returns true when it changed.
    fn reload_log(&mut self) -> bool {
        let Ok(content) = std::fs::read_to_string(&self.log_path) else {
            return false;
        };
        let lines: Vec<String> = content.lines().map(|l| l.to_string()).collect();
        let start = lines.len().saturating_sub(LOG_TAIL);
        let tail = &lines[start..];
        if tail == self.state.log_lines.as_slice() {
            return false;
        }
        self.state.log_lines = tail.to_vec();
        true
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(Style::default().bg(C_BG)), area);

        // ── Outer layout: header | separator | body | log | keys ─────────────
        let keys_h = if self.show_keys_bar { 1 } else { 0 };
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(self.header.min_height()),
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(self.log_panel.min_height()),
                Constraint::Length(keys_h),
            ])
            .split(area);

        self.header.draw(frame, outer[0], &self.state);
        status_bar::draw_separator(frame, outer[1]);

        // ── Body: now playing | rating + recent ──────────────────────────────
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
            .split(outer[2]);
        self.now_playing.draw(frame, columns[0], &self.state);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(self.rating.min_height()),
                Constraint::Min(self.recent.min_height()),
            ])
            .split(columns[1]);
        self.rating.draw(frame, right[0], &self.state);
        self.recent.draw(frame, right[1], &self.state);

        self.log_panel.draw(frame, outer[3], &self.state);

        if self.show_keys_bar {
            status_bar::draw_keys_bar(
                frame,
                outer[4],
                self.state.session.playback,
                self.state.session.status.kind,
                self.state.can_rate(),
            );
        }
    }
}
