//! Tray menu actions. They run on the tray thread, one at a time.
//!
//! Configuration changes are whole-key replacements persisted immediately.
//! Anything that needs a value from the overlay goes through a reply slot
//! with a bounded wait; a wait that runs out is treated as a cancel.

use std::path::Path;
use std::process::{Command as Process, Stdio};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, info, warn};
use traymon_agent::{Anchor, Config, SensorBridge, Setting};

use crate::command::{ColorPair, Command, Flow, OverlayHandle, POSITION_TIMEOUT, PROMPT_TIMEOUT};
use crate::menu::Action;
use crate::monitor::AppState;
use crate::placement::Point;

/// Builds an unconnected sensor bridge for the given configuration.
pub type BridgeFactory = Box<dyn Fn(&Config) -> Box<dyn SensorBridge> + Send>;

#[derive(Debug, Clone, Copy)]
pub struct Waits {
    pub position: Duration,
    pub prompt: Duration,
    /// Pause between stopping the old bridge and starting the new one.
    pub bridge_restart: Duration,
}

impl Default for Waits {
    fn default() -> Self {
        Self {
            position: POSITION_TIMEOUT,
            prompt: PROMPT_TIMEOUT,
            bridge_restart: Duration::from_millis(500),
        }
    }
}

pub struct TrayActions {
    state: AppState,
    overlay: OverlayHandle,
    stop_sampling: Sender<()>,
    new_bridge: BridgeFactory,
    waits: Waits,
}

impl TrayActions {
    pub fn new(
        state: AppState,
        overlay: OverlayHandle,
        stop_sampling: Sender<()>,
        new_bridge: BridgeFactory,
    ) -> Self {
        Self {
            state,
            overlay,
            stop_sampling,
            new_bridge,
            waits: Waits::default(),
        }
    }

    pub fn with_waits(mut self, waits: Waits) -> Self {
        self.waits = waits;
        self
    }

    pub fn dispatch(&self, action: Action) -> Flow {
        debug!("tray action {action:?}");
        match action {
            Action::CopyStats => self.copy_stats(),
            Action::OpenFolder => self.open_folder(),
            Action::Reload => self.reload(),
            Action::ToggleOverlay => self.toggle_overlay(),
            Action::ToggleLock => self.toggle_lock(),
            Action::Preset(anchor) => self.set_preset(anchor),
            Action::SetCoordinates => self.prompt_coordinates(),
            Action::Colors(preset) => self.set_colors(preset.colors()),
            Action::CustomColors => self.prompt_colors(),
            Action::RestartBridge => self.restart_bridge(),
            Action::Quit => {
                self.quit();
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    /// Push the persisted overlay settings to the actor.
    pub fn sync_overlay(&self, cfg: &Config) {
        self.overlay.post(Command::ApplyConfig);
        self.overlay.post(Command::ShowHide(cfg.overlay_enabled));
        self.overlay.post(Command::SetLocked(cfg.overlay_locked));
        self.overlay.post(match cfg.pinned() {
            Some(p) => Command::SetCoordinates(p.into()),
            None => Command::SetPositionPreset(cfg.overlay_pos),
        });
    }

    fn persist(&self, settings: impl IntoIterator<Item = Setting>) {
        if let Err(e) = self.state.config.update(settings) {
            error!("saving config failed: {e}");
            self.state.tray.notify(&e.summary());
        }
    }

    fn copy_stats(&self) {
        let cfg = self.state.config.snapshot();
        let text = self.state.last_snapshot().tooltip(&cfg);
        match self.state.tray.copy_to_clipboard(&text) {
            Ok(()) => self.state.tray.notify("Stats copied"),
            Err(e) => {
                warn!("clipboard copy failed: {e}");
                self.state.tray.notify("Clipboard unavailable");
            }
        }
    }

    fn open_folder(&self) {
        let Some(dir) = self.state.config.path().parent() else {
            return;
        };
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!("creating {} failed: {e}", dir.display());
        }
        if let Err(e) = open_in_file_manager(dir) {
            warn!("opening {} failed: {e}", dir.display());
            self.state.tray.notify("Could not open the config folder");
        }
    }

    fn reload(&self) {
        match self.state.config.reload() {
            Ok(()) => {
                let cfg = self.state.config.snapshot();
                self.state.sampler().reload_net_selection(&cfg);
                self.sync_overlay(&cfg);
                info!("config reloaded");
                self.state.tray.notify("Config reloaded");
            }
            Err(e) => {
                error!("config reload failed: {e}");
                self.state.tray.notify(&e.summary());
            }
        }
    }

    fn toggle_overlay(&self) {
        let enabled = !self.state.config.snapshot().overlay_enabled;
        self.persist([Setting::OverlayEnabled(enabled)]);
        self.overlay.post(Command::ShowHide(enabled));
    }

    fn toggle_lock(&self) {
        let locked = !self.state.config.snapshot().overlay_locked;
        self.persist([Setting::OverlayLocked(locked)]);
        self.overlay.post(Command::SetLocked(locked));
        if locked {
            // pin wherever the user left it
            if let Some(p) = self
                .overlay
                .request(Command::GetPosition, self.waits.position)
            {
                self.pin(p);
            }
        }
    }

    fn pin(&self, p: Point) {
        self.persist([Setting::OverlayX(Some(p.x)), Setting::OverlayY(Some(p.y))]);
        self.overlay.post(Command::SetCoordinates(p));
    }

    fn set_preset(&self, anchor: Anchor) {
        self.persist([
            Setting::OverlayPos(anchor),
            Setting::OverlayX(None),
            Setting::OverlayY(None),
        ]);
        self.overlay.post(Command::SetPositionPreset(anchor));
    }

    fn prompt_coordinates(&self) {
        match self
            .overlay
            .request(Command::PromptCoordinates, self.waits.prompt)
        {
            Some(p) => self.pin(p),
            None => debug!("coordinate prompt cancelled"),
        }
    }

    fn set_colors(&self, colors: ColorPair) {
        self.persist([Setting::OverlayBg(colors.bg), Setting::OverlayFg(colors.fg)]);
        self.overlay.post(Command::ApplyConfig);
    }

    fn prompt_colors(&self) {
        match self.overlay.request(Command::PromptColors, self.waits.prompt) {
            Some(colors) => self.set_colors(colors),
            None => debug!("color prompt cancelled"),
        }
    }

    fn restart_bridge(&self) {
        let cfg = self.state.config.snapshot();
        // readings go absent while the bridge is down
        let mut old = self
            .state
            .sampler()
            .replace_bridge((self.new_bridge)(&cfg));
        old.disconnect();
        drop(old);
        thread::sleep(self.waits.bridge_restart);

        let mut fresh = (self.new_bridge)(&cfg);
        let connected = fresh.connect();
        self.state.sampler().replace_bridge(fresh);
        info!("sensor bridge restarted (connected: {connected})");
        self.state.tray.notify(if connected {
            "Sensor bridge restarted"
        } else {
            "Sensor bridge unavailable"
        });
    }

    fn quit(&self) {
        info!("quitting");
        if self.stop_sampling.send(()).is_err() {
            debug!("sampling loop already gone");
        }
        let cfg = self.state.config.snapshot();
        let mut old = self
            .state
            .sampler()
            .replace_bridge((self.new_bridge)(&cfg));
        old.disconnect();
        self.overlay.post(Command::Stop);
        self.state.tray.stop();
    }
}

fn open_in_file_manager(dir: &Path) -> std::io::Result<()> {
    let opener = if cfg!(target_os = "windows") {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    Process::new(opener)
        .arg(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
}

/// Dispatch menu actions until `Quit` or until the event source goes away.
pub fn run(actions: TrayActions, events: Receiver<Action>) {
    for action in events.iter() {
        if actions.dispatch(action) == Flow::Stop {
            break;
        }
    }
    debug!("tray loop finished");
}
