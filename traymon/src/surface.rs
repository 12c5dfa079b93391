//! Rendering targets driven by the application.
//!
//! [`OverlaySurface`] belongs to the overlay actor's thread and is never
//! shared. [`TraySurface`] is called from the sampling and tray threads.

use std::io;

use traymon_agent::config::FontSpec;
use traymon_agent::Config;

use crate::command::ColorPair;
use crate::placement::{Area, Point, Size};

#[derive(thiserror::Error, Debug)]
pub enum SurfaceError {
    #[error("surface i/o: {0}")]
    Io(#[from] io::Error),

    #[error("surface is closed")]
    Closed,

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Every visual setting the overlay re-reads on `ApplyConfig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayStyle {
    pub bg: String,
    pub fg: String,
    pub font: FontSpec,
    pub padding: i32,
}

impl From<&Config> for OverlayStyle {
    fn from(cfg: &Config) -> Self {
        Self {
            bg: cfg.overlay_bg.clone(),
            fg: cfg.overlay_fg.clone(),
            font: cfg.overlay_font.clone(),
            padding: cfg.overlay_padding,
        }
    }
}

/// Interactive input the overlay collects on behalf of a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Coordinates { initial: Point },
    Colors { current: ColorPair },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptAnswer {
    Coordinates(Point),
    Colors(ColorPair),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    PointerDown(Point),
    PointerDrag(Point),
    PointerUp(Point),
    /// `None` when the user cancelled.
    PromptFinished(Option<PromptAnswer>),
}

pub trait OverlaySurface {
    fn set_text(&mut self, text: &str) -> Result<(), SurfaceError>;
    fn widget_size(&self) -> Size;
    fn work_area(&self) -> Area;
    fn move_to(&mut self, at: Point) -> Result<(), SurfaceError>;
    fn position(&self) -> Result<Point, SurfaceError>;
    fn set_visible(&mut self, visible: bool) -> Result<(), SurfaceError>;
    fn apply_style(&mut self, style: &OverlayStyle) -> Result<(), SurfaceError>;
    fn set_draggable(&mut self, draggable: bool);
    /// Start collecting input; the answer arrives later through [`OverlaySurface::pump`].
    fn begin_prompt(&mut self, prompt: Prompt) -> Result<(), SurfaceError>;
    /// Process the surface's own events without blocking.
    fn pump(&mut self) -> Result<Vec<SurfaceEvent>, SurfaceError>;
    fn destroy(&mut self);
}

pub trait TraySurface: Send + Sync {
    fn set_tooltip(&self, text: &str);
    /// Short user-facing message. Never raw error text.
    fn notify(&self, message: &str);
    fn copy_to_clipboard(&self, text: &str) -> Result<(), SurfaceError>;
    fn stop(&self);
}
