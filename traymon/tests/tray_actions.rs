//! Tray menu actions: persistence, overlay commands, and reply timeouts.
mod support;

use std::fs;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Receiver;
use support::{FakeTray, JournalBridge, SteadyProbe};
use traymon::command::{ColorPair, Command, Flow, OverlayHandle};
use traymon::menu::{Action, ColorPreset};
use traymon::placement::Point;
use traymon::tray::{TrayActions, Waits};
use traymon::AppState;
use traymon_agent::{Anchor, BridgeState, Config, ConfigStore, Sampler, SensorBridge};

type Journal = Arc<Mutex<Vec<String>>>;

struct Rig {
    actions: TrayActions,
    state: AppState,
    tray: Arc<FakeTray>,
    commands: Option<Receiver<Command>>,
    stop_rx: Receiver<()>,
    journal: Journal,
    path: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

fn rig() -> Rig {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let store = Arc::new(ConfigStore::new(&path, Config::default()));
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let sampler = Sampler::new(
        Box::new(SteadyProbe::default()),
        Box::new(JournalBridge::connected(0, journal.clone())),
        &store.snapshot(),
    );
    let tray = Arc::new(FakeTray::default());
    let state = AppState::new(store, sampler, tray.clone());
    let (overlay, commands) = OverlayHandle::channel();
    let (stop_tx, stop_rx) = crossbeam_channel::unbounded();

    let next_id = Arc::new(Mutex::new(0usize));
    let factory_journal = journal.clone();
    let actions = TrayActions::new(
        state.clone(),
        overlay,
        stop_tx,
        Box::new(move |_cfg: &Config| -> Box<dyn SensorBridge> {
            let mut id = next_id.lock().unwrap();
            *id += 1;
            Box::new(JournalBridge::new(*id, factory_journal.clone()))
        }),
    )
    .with_waits(Waits {
        position: Duration::from_millis(50),
        prompt: Duration::from_millis(50),
        bridge_restart: Duration::ZERO,
    });

    Rig {
        actions,
        state,
        tray,
        commands: Some(commands),
        stop_rx,
        journal,
        path,
        _dir: dir,
    }
}

impl Rig {
    fn posted(&self) -> Vec<&'static str> {
        self.commands
            .as_ref()
            .unwrap()
            .try_iter()
            .map(|c| c.name())
            .collect()
    }

    /// Stand-in overlay that answers every request.
    fn answer_requests(&mut self) -> JoinHandle<Vec<&'static str>> {
        let rx = self.commands.take().unwrap();
        thread::spawn(move || {
            let mut seen = Vec::new();
            for cmd in rx.iter() {
                seen.push(cmd.name());
                match cmd {
                    Command::GetPosition(r) => r.answer(Point::new(7, 8)),
                    Command::PromptCoordinates(r) => r.answer(Point::new(30, 12)),
                    Command::PromptColors(r) => r.answer(ColorPair::new("black", "#FFB000")),
                    Command::Stop => break,
                    _ => {}
                }
            }
            seen
        })
    }

    fn on_disk(&self) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(&self.path).unwrap()).unwrap()
    }
}

#[test]
fn preset_persists_and_clears_coordinates() {
    let r = rig();
    r.state
        .config
        .update([
            traymon_agent::Setting::OverlayX(Some(5)),
            traymon_agent::Setting::OverlayY(Some(6)),
        ])
        .unwrap();

    assert_eq!(r.actions.dispatch(Action::Preset(Anchor::TopLeft)), Flow::Continue);
    let cfg = r.state.config.snapshot();
    assert_eq!(cfg.overlay_pos, Anchor::TopLeft);
    assert_eq!(cfg.pinned(), None);
    assert_eq!(r.on_disk()["overlay_pos"], "top_left");
    assert_eq!(r.on_disk()["overlay_x"], serde_json::Value::Null);
    assert_eq!(r.posted(), ["set_position_preset"]);
}

#[test]
fn toggle_overlay_flips_and_shows() {
    let r = rig();
    r.actions.dispatch(Action::ToggleOverlay);
    assert!(r.state.config.snapshot().overlay_enabled);
    assert_eq!(r.on_disk()["overlay_enabled"], true);
    r.actions.dispatch(Action::ToggleOverlay);
    assert!(!r.state.config.snapshot().overlay_enabled);
    assert_eq!(r.posted(), ["show_hide", "show_hide"]);
}

#[test]
fn locking_pins_the_reported_position() {
    let mut r = rig();
    let overlay = r.answer_requests();

    r.actions.dispatch(Action::ToggleLock); // unlock: no position query
    assert!(!r.state.config.snapshot().overlay_locked);
    r.actions.dispatch(Action::ToggleLock); // lock: ask and pin
    let cfg = r.state.config.snapshot();
    assert!(cfg.overlay_locked);
    assert_eq!(cfg.pinned(), Some((7, 8)));

    r.actions.dispatch(Action::Quit);
    assert_eq!(
        overlay.join().unwrap(),
        [
            "set_locked",
            "set_locked",
            "get_position",
            "set_coordinates",
            "stop"
        ]
    );
}

#[test]
fn unanswered_position_query_times_out_quietly() {
    let r = rig();
    r.actions.dispatch(Action::ToggleLock);
    r.actions.dispatch(Action::ToggleLock);
    let cfg = r.state.config.snapshot();
    assert!(cfg.overlay_locked);
    assert_eq!(cfg.pinned(), None);
    assert!(r.tray.notices().is_empty());
}

#[test]
fn prompted_coordinates_are_persisted_and_applied() {
    let mut r = rig();
    let overlay = r.answer_requests();
    r.actions.dispatch(Action::SetCoordinates);
    assert_eq!(r.state.config.snapshot().pinned(), Some((30, 12)));
    assert_eq!(r.on_disk()["overlay_x"], 30);
    r.actions.dispatch(Action::Quit);
    assert_eq!(
        overlay.join().unwrap(),
        ["prompt_coordinates", "set_coordinates", "stop"]
    );
}

#[test]
fn cancelled_prompt_changes_nothing() {
    let r = rig();
    // nobody answers within the prompt wait
    r.actions.dispatch(Action::SetCoordinates);
    r.actions.dispatch(Action::CustomColors);
    let cfg = r.state.config.snapshot();
    assert_eq!(cfg.pinned(), None);
    assert_eq!(cfg.overlay_fg, "white");
    assert!(!r.path.exists());
}

#[test]
fn color_choices_persist_and_reapply() {
    let mut r = rig();
    r.actions.dispatch(Action::Colors(ColorPreset::Matrix));
    let cfg = r.state.config.snapshot();
    assert_eq!((cfg.overlay_bg.as_str(), cfg.overlay_fg.as_str()), ("black", "#00FF66"));
    assert_eq!(r.posted(), ["apply_config"]);

    let overlay = r.answer_requests();
    r.actions.dispatch(Action::CustomColors);
    assert_eq!(r.state.config.snapshot().overlay_fg, "#FFB000");
    assert_eq!(r.on_disk()["overlay_fg"], "#FFB000");
    r.actions.dispatch(Action::Quit);
    assert_eq!(
        overlay.join().unwrap(),
        ["prompt_colors", "apply_config", "stop"]
    );
}

#[test]
fn reload_applies_file_and_resyncs_overlay() {
    let r = rig();
    fs::write(
        &r.path,
        r#"{"overlay_enabled": true, "overlay_pos": "center", "keep": 1}"#,
    )
    .unwrap();
    r.actions.dispatch(Action::Reload);
    let cfg = r.state.config.snapshot();
    assert!(cfg.overlay_enabled);
    assert_eq!(cfg.overlay_pos, Anchor::Center);
    assert_eq!(
        r.posted(),
        ["apply_config", "show_hide", "set_locked", "set_position_preset"]
    );
    assert_eq!(r.tray.notices(), ["Config reloaded"]);
}

#[test]
fn failed_reload_keeps_values_and_notifies() {
    let r = rig();
    fs::write(&r.path, "{ broken").unwrap();
    r.actions.dispatch(Action::Reload);
    assert_eq!(*r.state.config.snapshot(), Config::default());
    assert!(r.posted().is_empty());
    let notices = r.tray.notices();
    assert_eq!(notices.len(), 1);
    assert!(!notices[0].contains("broken"));
}

#[test]
fn copy_stats_uses_last_snapshot() {
    let r = rig();
    *r.state.last.lock().unwrap() = traymon_agent::Snapshot {
        cpu_percent: Some(3.0),
        ..Default::default()
    };
    r.actions.dispatch(Action::CopyStats);
    let log = r.tray.log.lock().unwrap();
    assert_eq!(log.clipboard.len(), 1);
    assert!(log.clipboard[0].starts_with("CPU 3%\nRAM n/a"));
}

#[test]
fn restart_bridge_swaps_in_a_fresh_connected_bridge() {
    let r = rig();
    r.actions.dispatch(Action::RestartBridge);
    assert_eq!(
        *r.journal.lock().unwrap(),
        ["connect:0", "disconnect:0", "connect:2"]
    );
    assert_eq!(r.state.sampler().bridge_state(), BridgeState::Connected);
    assert_eq!(r.tray.notices(), ["Sensor bridge restarted"]);
}

#[test]
fn quit_stops_everything() {
    let r = rig();
    assert_eq!(r.actions.dispatch(Action::Quit), Flow::Stop);
    assert!(r.stop_rx.try_recv().is_ok());
    assert_eq!(r.posted(), ["stop"]);
    assert!(r.tray.log.lock().unwrap().stopped);
    assert!(r.journal.lock().unwrap().contains(&"disconnect:0".to_string()));
    assert_ne!(r.state.sampler().bridge_state(), BridgeState::Connected);
}

#[test]
fn quit_after_sampling_loop_exited() {
    let Rig {
        actions,
        tray,
        stop_rx,
        journal,
        ..
    } = rig();
    drop(stop_rx);
    assert_eq!(actions.dispatch(Action::Quit), Flow::Stop);
    assert!(tray.log.lock().unwrap().stopped);
    assert!(journal.lock().unwrap().contains(&"disconnect:0".to_string()));
}

#[test]
fn tray_loop_ends_on_quit() {
    let r = rig();
    let (tx, rx) = crossbeam_channel::unbounded();
    tx.send(Action::Preset(Anchor::Center)).unwrap();
    tx.send(Action::Quit).unwrap();
    tx.send(Action::ToggleOverlay).unwrap();
    let Rig {
        actions,
        state,
        commands,
        ..
    } = r;
    traymon::tray::run(actions, rx);
    assert!(!state.config.snapshot().overlay_enabled);
    let posted: Vec<_> = commands.unwrap().try_iter().map(|c| c.name()).collect();
    assert_eq!(posted, ["set_position_preset", "stop"]);
}
