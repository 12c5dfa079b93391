//! The overlay actor: sole owner of the overlay surface and its state.
//!
//! Other threads talk to it only through [`Command`]s. Each tick drains the
//! whole queue without blocking, applies commands in arrival order, then lets
//! the surface process its own input. A failing or panicking command is
//! logged and skipped; `Stop` is the only command that ends the drain.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, TryRecvError};
use tracing::{debug, error, info, warn};
use traymon_agent::{Anchor, ConfigStore, Setting};

use crate::command::{ColorPair, Command, Flow, Reply};
use crate::placement::{self, Point};
use crate::surface::{OverlayStyle, OverlaySurface, Prompt, PromptAnswer, SurfaceError, SurfaceEvent};

/// Delay between drains. Bounds menu-click to visible-effect latency.
pub const DRAIN_PERIOD: Duration = Duration::from_millis(100);

enum OpenPrompt {
    Coordinates(Reply<Point>),
    Colors(Reply<ColorPair>),
}

pub struct OverlayActor<S> {
    surface: S,
    commands: Receiver<Command>,
    config: Arc<ConfigStore>,
    visible: bool,
    anchor: Anchor,
    pinned: Option<Point>,
    locked: bool,
    padding: i32,
    prompt: Option<OpenPrompt>,
    // pointer offset inside the widget while a drag is in progress
    grab: Option<Point>,
    stopped: bool,
}

impl<S: OverlaySurface> OverlayActor<S> {
    /// Starts hidden with placement taken from the current configuration.
    pub fn new(surface: S, commands: Receiver<Command>, config: Arc<ConfigStore>) -> Self {
        let cfg = config.snapshot();
        Self {
            surface,
            commands,
            visible: false,
            anchor: cfg.overlay_pos,
            pinned: cfg.pinned().map(Point::from),
            locked: cfg.overlay_locked,
            padding: cfg.overlay_padding,
            prompt: None,
            grab: None,
            stopped: false,
            config,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn pinned(&self) -> Option<Point> {
        self.pinned
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Apply everything queued right now.
    pub fn drain(&mut self) -> Flow {
        if self.stopped {
            return Flow::Stop;
        }
        loop {
            let cmd = match self.commands.try_recv() {
                Ok(cmd) => cmd,
                Err(TryRecvError::Empty) => return Flow::Continue,
                Err(TryRecvError::Disconnected) => {
                    info!("all overlay handles dropped; stopping");
                    self.shutdown();
                    return Flow::Stop;
                }
            };
            let name = cmd.name();
            match catch_unwind(AssertUnwindSafe(|| self.apply(cmd))) {
                Ok(Ok(Flow::Continue)) => {}
                Ok(Ok(Flow::Stop)) => {
                    self.shutdown();
                    return Flow::Stop;
                }
                Ok(Err(e)) => warn!("overlay command {name} failed: {e}"),
                Err(_) => error!("overlay command {name} panicked"),
            }
        }
    }

    /// One drain followed by one round of surface events.
    pub fn tick(&mut self) -> Flow {
        if self.drain() == Flow::Stop {
            return Flow::Stop;
        }
        let events = match self.surface.pump() {
            Ok(events) => events,
            Err(e) => {
                error!("overlay surface failed: {e}");
                self.shutdown();
                return Flow::Stop;
            }
        };
        for ev in events {
            if let Err(e) = self.handle(ev) {
                warn!("overlay event failed: {e}");
            }
        }
        Flow::Continue
    }

    pub fn run(mut self) {
        while self.tick() == Flow::Continue {
            thread::sleep(DRAIN_PERIOD);
        }
        debug!("overlay loop finished");
    }

    fn shutdown(&mut self) {
        if !self.stopped {
            self.surface.destroy();
            self.stopped = true;
        }
        // whatever was queued behind Stop is dropped; replies resolve to None
        self.prompt = None;
        for cmd in self.commands.try_iter() {
            debug!("discarding {} after stop", cmd.name());
        }
    }

    fn apply(&mut self, cmd: Command) -> Result<Flow, SurfaceError> {
        match cmd {
            Command::SetText(text) => {
                self.surface.set_text(&text)?;
                self.reposition()?;
            }
            Command::ShowHide(visible) => {
                self.visible = visible;
                self.surface.set_visible(visible)?;
                if visible {
                    self.reposition()?;
                }
            }
            Command::ApplyConfig => {
                let cfg = self.config.snapshot();
                let style = OverlayStyle::from(&*cfg);
                self.padding = style.padding;
                self.surface.apply_style(&style)?;
                if self.visible {
                    self.reposition()?;
                }
            }
            Command::SetPositionPreset(anchor) => {
                self.anchor = anchor;
                self.pinned = None;
                self.reposition()?;
            }
            Command::SetCoordinates(at) => {
                self.pinned = Some(at);
                self.reposition()?;
            }
            Command::SetLocked(locked) => {
                self.locked = locked;
                self.surface.set_draggable(!locked);
                if locked {
                    self.grab = None;
                }
            }
            Command::Stop => return Ok(Flow::Stop),
            Command::GetPosition(reply) => reply.answer(self.surface.position()?),
            Command::PromptCoordinates(reply) => {
                if self.prompt.is_some() {
                    debug!("prompt already open; declining");
                    reply.decline();
                    return Ok(Flow::Continue);
                }
                let initial = self.surface.position().unwrap_or_default();
                self.surface.begin_prompt(Prompt::Coordinates { initial })?;
                self.prompt = Some(OpenPrompt::Coordinates(reply));
            }
            Command::PromptColors(reply) => {
                if self.prompt.is_some() {
                    debug!("prompt already open; declining");
                    reply.decline();
                    return Ok(Flow::Continue);
                }
                let cfg = self.config.snapshot();
                let current = ColorPair::new(cfg.overlay_bg.clone(), cfg.overlay_fg.clone());
                self.surface.begin_prompt(Prompt::Colors { current })?;
                self.prompt = Some(OpenPrompt::Colors(reply));
            }
        }
        Ok(Flow::Continue)
    }

    fn reposition(&mut self) -> Result<(), SurfaceError> {
        let at = placement::resolve(
            self.anchor,
            self.pinned,
            self.surface.widget_size(),
            self.surface.work_area(),
            self.padding,
        );
        self.surface.move_to(at)
    }

    fn handle(&mut self, ev: SurfaceEvent) -> Result<(), SurfaceError> {
        match ev {
            SurfaceEvent::PointerDown(p) => {
                if !self.locked {
                    self.grab = Some(p - self.surface.position()?);
                }
            }
            SurfaceEvent::PointerDrag(p) => {
                if let Some(grab) = self.grab.filter(|_| !self.locked) {
                    self.surface.move_to(p - grab)?;
                }
            }
            SurfaceEvent::PointerUp(p) => {
                if let Some(grab) = self.grab.take().filter(|_| !self.locked) {
                    let at = p - grab;
                    self.surface.move_to(at)?;
                    self.pinned = Some(at);
                    if let Err(e) = self
                        .config
                        .update([Setting::OverlayX(Some(at.x)), Setting::OverlayY(Some(at.y))])
                    {
                        warn!("saving dragged overlay position failed: {e}");
                    }
                }
            }
            SurfaceEvent::PromptFinished(answer) => match (self.prompt.take(), answer) {
                (Some(OpenPrompt::Coordinates(reply)), Some(PromptAnswer::Coordinates(p))) => {
                    reply.answer(p)
                }
                (Some(OpenPrompt::Colors(reply)), Some(PromptAnswer::Colors(c))) => {
                    reply.answer(c)
                }
                // cancelled or mismatched: the dropped reply reads as None
                (Some(_), _) => {}
                (None, _) => debug!("prompt answer with no open prompt"),
            },
        }
        Ok(())
    }
}
