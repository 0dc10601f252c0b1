use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};

use crate::config::Config;
use crate::export;
use crate::serial::{self, LinkEvent, SensorLink};
use crate::session::Session;
use crate::ui;

const MAX_MESSAGES: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    PlayerName,
    Team,
    Results,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    NotConnected,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Popup {
    Alert(String),
    ConfirmDelete(usize),
    ExportPath(String),
}

pub struct AppState {
    pub port_name: String,
    pub baud_rate: u32,
    request_byte: u8,
    request_interval: Duration,
    export_path: PathBuf,

    pub status: ConnectionStatus,
    link: Option<SensorLink>,
    link_event_rx: Option<Receiver<LinkEvent>>,

    pub session: Session,
    pub player_name: String,
    pub team: String,
    pub focus: Focus,
    pub selected_result: Option<usize>,
    pub popup: Option<Popup>,
    pub messages: VecDeque<String>,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate().context("invalid configuration")?;
        let request_byte = config.request_byte()?;
        Ok(Self {
            port_name: config.port_name.clone(),
            baud_rate: config.baud_rate,
            request_byte,
            request_interval: config.request_interval(),
            export_path: config.export_path.clone(),
            status: ConnectionStatus::NotConnected,
            link: None,
            link_event_rx: None,
            session: Session::new(),
            player_name: String::new(),
            team: String::new(),
            focus: Focus::PlayerName,
            selected_result: None,
            popup: None,
            messages: VecDeque::new(),
        })
    }

    fn add_message<S: Into<String>>(&mut self, line: S) {
        self.messages.push_back(line.into());
        while self.messages.len() > MAX_MESSAGES {
            self.messages.pop_front();
        }
    }

    fn attach(&mut self, link: SensorLink, rx: Receiver<LinkEvent>) {
        self.link = Some(link);
        self.link_event_rx = Some(rx);
        self.status = ConnectionStatus::Connected;
    }

    pub fn connect(&mut self) {
        match serial::list_ports() {
            Ok(ports) => {
                let names: Vec<&str> = ports.iter().map(|p| p.port_name.as_str()).collect();
                info!(?names, "available serial ports");
            }
            Err(e) => warn!("{e:#}"),
        }

        match SensorLink::connect(&self.port_name, self.baud_rate) {
            Ok((link, rx)) => {
                self.attach(link, rx);
                self.add_message(format!("[connected] {} @ {}", self.port_name, self.baud_rate));
            }
            Err(e) => {
                warn!("{e}");
                self.status = ConnectionStatus::NotConnected;
                self.add_message(format!("[not connected] {e}"));
            }
        }
    }

    pub fn request_reading(&mut self) {
        if !self.session.is_measuring() {
            return;
        }
        if let Some(link) = &self.link {
            if let Err(e) = link.request_reading(self.request_byte) {
                warn!("request failed: {e}");
            }
        }
    }

    pub fn drain_link_events(&mut self) {
        let drained: Vec<LinkEvent> = match self.link_event_rx.as_ref() {
            Some(rx) => rx.try_iter().collect(),
            None => return,
        };

        for ev in drained {
            match ev {
                LinkEvent::Reading(reading) => self.session.on_reading(reading),
                LinkEvent::Error(err) => self.add_message(format!("[error] {err}")),
                LinkEvent::Closed => {
                    if let Some(link) = self.link.take() {
                        link.close();
                    }
                    self.link_event_rx = None;
                    self.status = ConnectionStatus::NotConnected;
                    self.add_message("[closed]");
                }
            }
        }
    }

    pub fn start(&mut self) {
        if self.session.is_measuring() {
            return;
        }
        match self.session.start(&self.player_name, &self.team) {
            Ok(()) => self.add_message(format!(
                "[start] {} ({})",
                self.player_name.trim(),
                self.team.trim()
            )),
            Err(e) => self.popup = Some(Popup::Alert(e.to_string())),
        }
    }

    pub fn stop(&mut self) {
        if let Some(rank) = self.session.stop() {
            let max = self.session.state().max_speed_kmh;
            self.selected_result = Some(rank - 1);
            self.add_message(format!("[stop] {} -> rank {rank}", export::format_speed(max)));
        }
    }

    fn request_delete(&mut self) {
        if let Some(index) = self.selected_result {
            if index < self.session.results().len() {
                self.popup = Some(Popup::ConfirmDelete(index));
            }
        }
    }

    fn delete(&mut self, index: usize) {
        if let Some(record) = self.session.results_mut().remove(index) {
            info!(player = %record.player_name, team = %record.team, "record deleted");
            self.add_message(format!("[deleted] {}", record.player_name));
        }
        let results = self.session.results();
        self.selected_result = if results.is_empty() {
            None
        } else {
            Some(index.min(results.len() - 1))
        };
    }

    fn export(&mut self, path: PathBuf) {
        match export::export_to_path(self.session.results().records(), &path) {
            Ok(()) => self.add_message(format!("[exported] {}", path.display())),
            Err(e) => {
                warn!("{e}");
                self.add_message(format!("[export failed] {e}"));
            }
        }
        self.export_path = path;
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.session.results().len();
        if len == 0 {
            self.selected_result = None;
            return;
        }
        let current = self.selected_result.map(|i| i as isize).unwrap_or(0);
        let next = (current + delta).clamp(0, len as isize - 1);
        self.selected_result = Some(next as usize);
    }

    /// Closes the link. The request tick must already be stopped.
    fn shutdown(&mut self) {
        if let Some(link) = self.link.take() {
            link.close();
        }
        self.link_event_rx = None;
    }
}

pub fn run(config: &Config) -> Result<()> {
    let mut app = AppState::new(config)?;
    app.connect();

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let res = run_inner(&mut terminal, &mut app);
    app.shutdown();

    disable_raw_mode().ok();
    execute!(
        io::stdout(),
        terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    )
    .ok();
    terminal.show_cursor().ok();

    res
}

fn run_inner(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
) -> Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let mut last_request = Instant::now();

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Release && handle_key_event(app, key) {
                    break;
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.drain_link_events();
            last_tick = Instant::now();
        }

        if last_request.elapsed() >= app.request_interval {
            app.request_reading();
            last_request = Instant::now();
        }
    }
    Ok(())
}

/// Returns `true` when the app should quit.
fn handle_key_event(app: &mut AppState, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    if let Some(popup) = app.popup.take() {
        app.popup = handle_popup_key(app, popup, key);
        return false;
    }

    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Tab => {
            app.focus = match app.focus {
                Focus::PlayerName => Focus::Team,
                Focus::Team => Focus::Results,
                Focus::Results => Focus::PlayerName,
            };
        }
        KeyCode::BackTab => {
            app.focus = match app.focus {
                Focus::PlayerName => Focus::Results,
                Focus::Team => Focus::PlayerName,
                Focus::Results => Focus::Team,
            };
        }
        KeyCode::F(5) => app.start(),
        KeyCode::F(6) => app.stop(),
        KeyCode::F(7) => app.request_delete(),
        KeyCode::F(8) => {
            app.popup = Some(Popup::ExportPath(app.export_path.display().to_string()));
        }
        _ => match app.focus {
            Focus::PlayerName | Focus::Team => {
                if app.session.is_measuring() {
                    return false;
                }
                if key.code == KeyCode::Enter {
                    app.start();
                    return false;
                }
                let field = if app.focus == Focus::PlayerName {
                    &mut app.player_name
                } else {
                    &mut app.team
                };
                match key.code {
                    KeyCode::Backspace => {
                        field.pop();
                    }
                    KeyCode::Char(c) => field.push(c),
                    _ => {}
                }
            }
            Focus::Results => match key.code {
                KeyCode::Char('q') => return true,
                KeyCode::Up => app.move_selection(-1),
                KeyCode::Down => app.move_selection(1),
                KeyCode::Delete | KeyCode::Char('d') => app.request_delete(),
                KeyCode::Char('e') => {
                    app.popup = Some(Popup::ExportPath(app.export_path.display().to_string()));
                }
                _ => {}
            },
        },
    }
    false
}

fn handle_popup_key(app: &mut AppState, popup: Popup, key: KeyEvent) -> Option<Popup> {
    match popup {
        Popup::Alert(message) => match key.code {
            KeyCode::Enter | KeyCode::Esc => None,
            _ => Some(Popup::Alert(message)),
        },
        Popup::ConfirmDelete(index) => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.delete(index);
                None
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => None,
            _ => Some(Popup::ConfirmDelete(index)),
        },
        Popup::ExportPath(mut path) => match key.code {
            KeyCode::Enter if !path.trim().is_empty() => {
                app.export(PathBuf::from(path.trim()));
                None
            }
            KeyCode::Esc => None,
            KeyCode::Backspace => {
                path.pop();
                Some(Popup::ExportPath(path))
            }
            KeyCode::Char(c) => {
                path.push(c);
                Some(Popup::ExportPath(path))
            }
            _ => Some(Popup::ExportPath(path)),
        },
    }
}
