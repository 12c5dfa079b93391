//! Terminal host: the terminal plays the desktop.
//!
//! The bottom row is the tray bar (host name, tooltip, notices). The overlay
//! is a borderless styled panel placed in cell coordinates and can be dragged
//! with the mouse when unlocked. `m` opens the menu; every menu entry has a
//! key that is forwarded to the tray thread.

use std::io::{self, Stdout, Write};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Local};
use crossbeam_channel::Sender;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use once_cell::sync::Lazy;
use ratatui::{
    backend::CrosstermBackend,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Text},
    widgets::{Block, Borders, Clear, Padding, Paragraph},
    Frame, Terminal,
};
use tracing::{debug, warn};
use traymon_agent::{ConfigStore, APP_NAME};

use crate::command::ColorPair;
use crate::menu::{self, Action, MenuItem};
use crate::placement::{Area, Point, Size};
use crate::surface::{
    OverlayStyle, OverlaySurface, Prompt, PromptAnswer, SurfaceError, SurfaceEvent, TraySurface,
};

/// How long a tray notice stays on the bar.
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

static HOST: Lazy<String> = Lazy::new(|| {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".into())
});

#[derive(Debug, Default)]
struct TrayView {
    tooltip: String,
    notice: Option<(String, DateTime<Local>)>,
    // copied on the tray thread, written out by the UI thread
    clipboard: Option<String>,
    stopped: bool,
}

/// Tray surface backed by shared state that the terminal bar renders.
#[derive(Debug, Default)]
pub struct TermTray {
    view: Mutex<TrayView>,
}

impl TermTray {
    pub fn new() -> Self {
        Self::default()
    }

    fn view(&self) -> std::sync::MutexGuard<'_, TrayView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn tooltip(&self) -> String {
        self.view().tooltip.clone()
    }

    /// The notice to show at `now`, if it has not expired.
    pub fn notice_at(&self, now: DateTime<Local>) -> Option<String> {
        let view = self.view();
        let (msg, at) = view.notice.as_ref()?;
        let age = now.signed_duration_since(*at).to_std().unwrap_or_default();
        (age < NOTICE_TTL).then(|| format!("[{}] {msg}", at.format("%H:%M:%S")))
    }

    pub fn take_clipboard(&self) -> Option<String> {
        self.view().clipboard.take()
    }

    pub fn is_stopped(&self) -> bool {
        self.view().stopped
    }
}

impl TraySurface for TermTray {
    fn set_tooltip(&self, text: &str) {
        self.view().tooltip = text.to_string();
    }

    fn notify(&self, message: &str) {
        self.view().notice = Some((message.to_string(), Local::now()));
    }

    fn copy_to_clipboard(&self, text: &str) -> Result<(), SurfaceError> {
        let mut view = self.view();
        if view.stopped {
            return Err(SurfaceError::Closed);
        }
        view.clipboard = Some(text.to_string());
        Ok(())
    }

    fn stop(&self) {
        self.view().stopped = true;
    }
}

/// OSC 52 "set clipboard" escape for `text`.
pub fn osc52(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

pub fn parse_coordinates(input: &str) -> Option<Point> {
    let mut parts = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty());
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    parts.next().is_none().then(|| Point::new(x, y))
}

/// `"<bg> <fg>"`, each a color name or `#RRGGBB`.
pub fn parse_colors(input: &str) -> Option<ColorPair> {
    let mut parts = input.split_whitespace();
    let bg = parts.next()?;
    let fg = parts.next()?;
    if parts.next().is_some() || Color::from_str(bg).is_err() || Color::from_str(fg).is_err() {
        return None;
    }
    Some(ColorPair::new(bg, fg))
}

/// Unparseable colors fall back to the terminal default.
pub fn overlay_style(style: &OverlayStyle) -> Style {
    let mut s = Style::default();
    if let Ok(bg) = Color::from_str(&style.bg) {
        s = s.bg(bg);
    }
    if let Ok(fg) = Color::from_str(&style.fg) {
        s = s.fg(fg);
    }
    // terminals have no font families; "bold" in the family is the one hint we honor
    if style.font.0.to_ascii_lowercase().contains("bold") {
        s = s.add_modifier(Modifier::BOLD);
    }
    s
}

/// Panel size in cells: widest line plus one column of padding per side.
pub fn panel_size(text: &Text<'_>) -> Size {
    let width = text.lines.iter().map(Line::width).max().unwrap_or(0);
    Size {
        width: width as i32 + 2,
        height: text.lines.len().max(1) as i32,
    }
}

/// Part of the panel at `at` that falls inside `area`.
pub fn visible_rect(at: Point, size: Size, area: Rect) -> Option<Rect> {
    let left = at.x.max(area.x as i32);
    let top = at.y.max(area.y as i32);
    let right = at.x.saturating_add(size.width).min(area.right() as i32);
    let bottom = at.y.saturating_add(size.height).min(area.bottom() as i32);
    (right > left && bottom > top).then(|| {
        Rect::new(
            left as u16,
            top as u16,
            (right - left) as u16,
            (bottom - top) as u16,
        )
    })
}

#[derive(Debug)]
struct PromptInput {
    prompt: Prompt,
    buffer: String,
}

impl PromptInput {
    fn new(prompt: Prompt) -> Self {
        let buffer = match &prompt {
            Prompt::Coordinates { initial } => format!("{},{}", initial.x, initial.y),
            Prompt::Colors { current } => format!("{} {}", current.bg, current.fg),
        };
        Self { prompt, buffer }
    }

    fn label(&self) -> &'static str {
        match self.prompt {
            Prompt::Coordinates { .. } => "Overlay X,Y",
            Prompt::Colors { .. } => "Colors (background foreground)",
        }
    }

    fn answer(&self) -> Option<PromptAnswer> {
        match self.prompt {
            Prompt::Coordinates { .. } => {
                parse_coordinates(&self.buffer).map(PromptAnswer::Coordinates)
            }
            Prompt::Colors { .. } => parse_colors(&self.buffer).map(PromptAnswer::Colors),
        }
    }
}

pub struct TerminalSurface {
    terminal: Option<Terminal<CrosstermBackend<Stdout>>>,
    tray: Arc<TermTray>,
    config: Arc<ConfigStore>,
    actions: Sender<Action>,
    screen: Size,
    text: Text<'static>,
    style: Style,
    at: Point,
    visible: bool,
    draggable: bool,
    grabbing: bool,
    menu_open: bool,
    prompt: Option<PromptInput>,
}

impl TerminalSurface {
    /// Take over the terminal: raw mode, alternate screen, mouse capture.
    pub fn open(
        tray: Arc<TermTray>,
        config: Arc<ConfigStore>,
        actions: Sender<Action>,
    ) -> Result<Self, SurfaceError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.clear()?;
        let sz = terminal.size()?;
        Ok(Self {
            terminal: Some(terminal),
            tray,
            config,
            actions,
            screen: Size {
                width: sz.width as i32,
                height: sz.height as i32,
            },
            text: Text::raw("starting..."),
            style: Style::default(),
            at: Point::default(),
            visible: false,
            draggable: false,
            grabbing: false,
            menu_open: false,
            prompt: None,
        })
    }

    fn terminal(&mut self) -> Result<&mut Terminal<CrosstermBackend<Stdout>>, SurfaceError> {
        self.terminal.as_mut().ok_or(SurfaceError::Closed)
    }

    fn forward(&mut self, action: Action) {
        self.menu_open = false;
        if self.actions.send(action).is_err() {
            debug!("tray loop gone; dropped {action:?}");
        }
    }

    fn panel_rect(&self) -> Option<Rect> {
        self.visible
            .then(|| visible_rect(self.at, self.widget_size(), rect_of(self.work_area())))
            .flatten()
    }

    fn on_key(&mut self, key: KeyEvent, events: &mut Vec<SurfaceEvent>) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if let Some(input) = self.prompt.as_mut() {
            match key.code {
                KeyCode::Char(c) => input.buffer.push(c),
                KeyCode::Backspace => {
                    input.buffer.pop();
                }
                KeyCode::Enter => {
                    let answer = input.answer();
                    if answer.is_none() {
                        self.tray.notify("Invalid input; nothing changed");
                    }
                    self.prompt = None;
                    events.push(SurfaceEvent::PromptFinished(answer));
                }
                KeyCode::Esc => {
                    self.prompt = None;
                    events.push(SurfaceEvent::PromptFinished(None));
                }
                _ => {}
            }
            return;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.forward(Action::Quit)
            }
            KeyCode::Char('m') => self.menu_open = !self.menu_open,
            KeyCode::Esc => self.menu_open = false,
            KeyCode::Char(c) => {
                if let Some(action) = Action::from_key(c) {
                    self.forward(action);
                }
            }
            _ => {}
        }
    }

    fn on_mouse(&mut self, m: MouseEvent, events: &mut Vec<SurfaceEvent>) {
        if !self.draggable || self.prompt.is_some() {
            return;
        }
        let p = Point::new(m.column as i32, m.row as i32);
        match m.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let hit = self.panel_rect().is_some_and(|r| {
                    r.contains(ratatui::layout::Position::new(m.column, m.row))
                });
                if hit {
                    self.grabbing = true;
                    events.push(SurfaceEvent::PointerDown(p));
                }
            }
            MouseEventKind::Drag(MouseButton::Left) if self.grabbing => {
                events.push(SurfaceEvent::PointerDrag(p))
            }
            MouseEventKind::Up(MouseButton::Left) if self.grabbing => {
                self.grabbing = false;
                events.push(SurfaceEvent::PointerUp(p));
            }
            _ => {}
        }
    }

    fn draw(&mut self) -> Result<(), SurfaceError> {
        let bar = self.bar_line();
        let menu = self.menu_open.then(|| menu_lines(&self.config));
        let panel = self.panel_rect().map(|r| (r, self.text.clone(), self.style));
        self.terminal()?.draw(|f| {
            let area = f.area();
            if area.height == 0 {
                return;
            }
            if let Some((rect, text, style)) = panel {
                f.render_widget(Clear, rect);
                f.render_widget(
                    Paragraph::new(text)
                        .style(style)
                        .block(Block::new().padding(Padding::horizontal(1)).style(style)),
                    rect,
                );
            }
            if let Some(lines) = menu {
                draw_menu(f, area, lines);
            }
            let bar_area = Rect::new(area.x, area.bottom() - 1, area.width, 1);
            f.render_widget(
                Paragraph::new(bar).style(Style::default().add_modifier(Modifier::REVERSED)),
                bar_area,
            );
        })?;
        Ok(())
    }

    fn bar_line(&self) -> String {
        if let Some(input) = &self.prompt {
            return format!(" {}: {}_  (Enter to apply, Esc to cancel)", input.label(), input.buffer);
        }
        let tooltip = self.tray.tooltip();
        let mut line = format!(" {} | {}", *HOST, tooltip.replace('\n', " | "));
        if let Some(notice) = self.tray.notice_at(Local::now()) {
            line.push_str(&format!(" | {notice}"));
        }
        if self.tray.is_stopped() {
            line.push_str(" | stopping...");
        } else {
            line.push_str("  [m] menu");
        }
        line
    }

    fn flush_clipboard(&mut self) -> Result<(), SurfaceError> {
        if let Some(text) = self.tray.take_clipboard() {
            let backend = self.terminal()?.backend_mut();
            backend.write_all(osc52(&text).as_bytes())?;
            backend.flush()?;
        }
        Ok(())
    }

    fn restore(&mut self) {
        if let Some(mut terminal) = self.terminal.take() {
            if let Err(e) = leave(&mut terminal) {
                warn!("restoring terminal failed: {e}");
            }
        }
    }
}

fn leave(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;
    terminal.show_cursor()
}

fn rect_of(area: Area) -> Rect {
    Rect::new(
        area.origin.x.max(0) as u16,
        area.origin.y.max(0) as u16,
        area.size.width.max(0) as u16,
        area.size.height.max(0) as u16,
    )
}

fn menu_lines(config: &ConfigStore) -> Vec<String> {
    let tree = menu::menu_tree(&config.snapshot());
    menu::flatten(&tree)
        .into_iter()
        .map(|(depth, item)| {
            let indent = "  ".repeat(depth);
            match item {
                MenuItem::Entry { label, action } => format!("{indent}[{}] {label}", action.key()),
                MenuItem::Submenu { label, .. } => format!("{indent}{label}"),
                MenuItem::Separator => format!("{indent}----"),
            }
        })
        .collect()
}

fn draw_menu(f: &mut Frame<'_>, area: Rect, lines: Vec<String>) {
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 4;
    let height = lines.len() as u16 + 2;
    let rect = Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2,
        width.min(area.width),
        height.min(area.height.saturating_sub(1)),
    );
    let text = Text::from(lines.into_iter().map(Line::from).collect::<Vec<_>>());
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(text).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {APP_NAME} ")),
        ),
        rect,
    );
}

impl OverlaySurface for TerminalSurface {
    fn set_text(&mut self, text: &str) -> Result<(), SurfaceError> {
        self.text = Text::raw(text.to_string());
        Ok(())
    }

    fn widget_size(&self) -> Size {
        panel_size(&self.text)
    }

    fn work_area(&self) -> Area {
        Area {
            origin: Point::default(),
            size: Size {
                width: self.screen.width,
                // bottom row belongs to the tray bar
                height: (self.screen.height - 1).max(0),
            },
        }
    }

    fn move_to(&mut self, at: Point) -> Result<(), SurfaceError> {
        self.at = at;
        Ok(())
    }

    fn position(&self) -> Result<Point, SurfaceError> {
        if self.terminal.is_none() {
            return Err(SurfaceError::Closed);
        }
        Ok(self.at)
    }

    fn set_visible(&mut self, visible: bool) -> Result<(), SurfaceError> {
        self.visible = visible;
        if !visible {
            self.grabbing = false;
        }
        Ok(())
    }

    fn apply_style(&mut self, style: &OverlayStyle) -> Result<(), SurfaceError> {
        self.style = overlay_style(style);
        Ok(())
    }

    fn set_draggable(&mut self, draggable: bool) {
        self.draggable = draggable;
        if !draggable {
            self.grabbing = false;
        }
    }

    fn begin_prompt(&mut self, prompt: Prompt) -> Result<(), SurfaceError> {
        if self.terminal.is_none() {
            return Err(SurfaceError::Closed);
        }
        if self.prompt.is_some() {
            return Err(SurfaceError::InvalidInput("a prompt is already open".into()));
        }
        self.menu_open = false;
        self.prompt = Some(PromptInput::new(prompt));
        Ok(())
    }

    fn pump(&mut self) -> Result<Vec<SurfaceEvent>, SurfaceError> {
        let mut events = Vec::new();
        while event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Key(k) => self.on_key(k, &mut events),
                Event::Mouse(m) => self.on_mouse(m, &mut events),
                Event::Resize(w, h) => {
                    self.screen = Size {
                        width: w as i32,
                        height: h as i32,
                    }
                }
                _ => {}
            }
        }
        self.flush_clipboard()?;
        self.draw()?;
        Ok(events)
    }

    fn destroy(&mut self) {
        self.restore();
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        self.restore();
    }
}
