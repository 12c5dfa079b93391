//! Command protocol between the tray/sampling threads and the overlay actor.
//!
//! Commands travel over an unbounded FIFO drained by a single consumer, so
//! commands from one caller apply in the order they were posted. Requests
//! that need a value back carry a [`Reply`]: a one-slot channel written
//! exactly once, with `None` when no value could be produced. The caller
//! blocks on the matching [`Pending`] with a timeout. After the caller gives
//! up, a late answer lands in a channel nobody reads and is discarded.

use std::fmt;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::debug;
use traymon_agent::Anchor;

use crate::placement::Point;

/// Wait for position queries.
pub const POSITION_TIMEOUT: Duration = Duration::from_secs(2);
/// Wait for interactive prompts.
pub const PROMPT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorPair {
    pub bg: String,
    pub fg: String,
}

impl ColorPair {
    pub fn new(bg: impl Into<String>, fg: impl Into<String>) -> Self {
        Self {
            bg: bg.into(),
            fg: fg.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

#[derive(Debug)]
pub enum Command {
    SetText(String),
    ShowHide(bool),
    ApplyConfig,
    SetPositionPreset(Anchor),
    SetCoordinates(Point),
    SetLocked(bool),
    Stop,
    GetPosition(Reply<Point>),
    PromptCoordinates(Reply<Point>),
    PromptColors(Reply<ColorPair>),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetText(_) => "set_text",
            Command::ShowHide(_) => "show_hide",
            Command::ApplyConfig => "apply_config",
            Command::SetPositionPreset(_) => "set_position_preset",
            Command::SetCoordinates(_) => "set_coordinates",
            Command::SetLocked(_) => "set_locked",
            Command::Stop => "stop",
            Command::GetPosition(_) => "get_position",
            Command::PromptCoordinates(_) => "prompt_coordinates",
            Command::PromptColors(_) => "prompt_colors",
        }
    }
}

/// Write side of a one-shot reply. Dropping it unanswered sends `None`, so
/// a waiting caller always gets a definite result.
pub struct Reply<T> {
    tx: Option<Sender<Option<T>>>,
}

impl<T> Reply<T> {
    pub fn channel() -> (Reply<T>, Pending<T>) {
        let (tx, rx) = bounded(1);
        (Reply { tx: Some(tx) }, Pending { rx })
    }

    pub fn answer(mut self, value: T) {
        self.send(Some(value));
    }

    pub fn decline(mut self) {
        self.send(None);
    }

    fn send(&mut self, value: Option<T>) {
        if let Some(tx) = self.tx.take() {
            // the reader may have timed out and gone away
            let _ = tx.try_send(value);
        }
    }
}

impl<T> Drop for Reply<T> {
    fn drop(&mut self) {
        self.send(None);
    }
}

impl<T> fmt::Debug for Reply<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply")
            .field("answered", &self.tx.is_none())
            .finish()
    }
}

/// Read side of a one-shot reply.
pub struct Pending<T> {
    rx: Receiver<Option<T>>,
}

impl<T> Pending<T> {
    /// `None` on decline, timeout, or a reply that was dropped unanswered.
    pub fn wait(self, timeout: Duration) -> Option<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(value) => value,
            Err(RecvTimeoutError::Timeout) => {
                debug!("reply not received within {timeout:?}");
                None
            }
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

/// Posting side of the overlay command queue. Cheap to clone; any thread.
#[derive(Debug, Clone)]
pub struct OverlayHandle {
    tx: Sender<Command>,
}

impl OverlayHandle {
    pub fn channel() -> (OverlayHandle, Receiver<Command>) {
        let (tx, rx) = unbounded();
        (OverlayHandle { tx }, rx)
    }

    /// Never blocks. Returns false once the actor has gone away.
    pub fn post(&self, cmd: Command) -> bool {
        match self.tx.send(cmd) {
            Ok(()) => true,
            Err(e) => {
                debug!("overlay gone; dropped {}", e.0.name());
                false
            }
        }
    }

    /// Post a request built around a fresh reply slot and wait for the answer.
    pub fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Command,
        timeout: Duration,
    ) -> Option<T> {
        let (reply, pending) = Reply::channel();
        if !self.post(make(reply)) {
            return None;
        }
        pending.wait(timeout)
    }
}
