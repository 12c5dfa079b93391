//! The sampling loop and the state it shares with tray actions.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, info, warn};
use traymon_agent::{Config, ConfigStore, Sampler, Snapshot, Template};

use crate::command::{Command, OverlayHandle};
use crate::surface::TraySurface;

/// Shared between the sampling thread and the tray thread.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigStore>,
    pub sampler: Arc<Mutex<Sampler>>,
    pub last: Arc<Mutex<Snapshot>>,
    pub tray: Arc<dyn TraySurface>,
}

impl AppState {
    pub fn new(config: Arc<ConfigStore>, sampler: Sampler, tray: Arc<dyn TraySurface>) -> Self {
        Self {
            config,
            sampler: Arc::new(Mutex::new(sampler)),
            last: Arc::new(Mutex::new(Snapshot::default())),
            tray,
        }
    }

    pub fn sampler(&self) -> MutexGuard<'_, Sampler> {
        self.sampler.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn last_snapshot(&self) -> Snapshot {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn cached_template<'a>(cache: &'a mut Option<(String, Template)>, cfg: &Config) -> &'a Template {
    if cache
        .as_ref()
        .is_some_and(|(src, _)| *src != cfg.overlay_format)
    {
        *cache = None;
    }
    let (_, template) = cache.get_or_insert_with(|| {
        let template = cfg.template().unwrap_or_else(|e| {
            // the store validates on load; this only guards hand-built configs
            warn!("overlay template rejected, using default: {e}");
            Template::default()
        });
        (cfg.overlay_format.clone(), template)
    });
    template
}

pub struct Monitor {
    state: AppState,
    overlay: Option<OverlayHandle>,
    // parsed overlay template, keyed by its source text
    template: Option<(String, Template)>,
}

impl Monitor {
    /// `overlay` is `None` when no overlay consumer is attached.
    pub fn new(state: AppState, overlay: Option<OverlayHandle>) -> Self {
        Self {
            state,
            overlay,
            template: None,
        }
    }

    /// One iteration: read, store, publish. Never fails; missing readings
    /// simply show up as absent fields.
    pub fn tick(&mut self) -> Snapshot {
        let cfg = self.state.config.snapshot();
        let snap = self.state.sampler().read(&cfg);

        *self.state.last.lock().unwrap_or_else(PoisonError::into_inner) = snap.clone();
        self.state.tray.set_tooltip(&snap.tooltip(&cfg));

        if let Some(overlay) = &self.overlay {
            let template = cached_template(&mut self.template, &cfg);
            overlay.post(Command::SetText(snap.overlay_text(&cfg, template)));
        }
        snap
    }

    /// Loop until `stop` yields a message or disconnects.
    pub fn run(mut self, stop: Receiver<()>) {
        info!("sampling loop started");
        loop {
            self.tick();
            let interval = self.state.config.snapshot().refresh_interval();
            match stop.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("sampling loop stopped");
    }

    pub fn spawn(self, stop: Receiver<()>) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("sampler".into())
            .spawn(move || self.run(stop))
    }
}
