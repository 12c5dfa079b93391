//! Entry point for traymon. Parses args, wires the three threads, runs the overlay.

use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use traymon::term::{TermTray, TerminalSurface};
use traymon::{AppState, Monitor, OverlayActor, OverlayHandle, TrayActions, TraySurface};
use traymon_agent::bridge::BridgeSettings;
use traymon_agent::config::{config_dir, config_path};
use traymon_agent::{Config, ConfigStore, HardwareBridge, Sampler, SensorBridge, SysinfoProbe};

struct ParsedArgs {
    config: Option<PathBuf>,
    once: bool,
    no_overlay: bool,
}

fn usage(prog: &str) -> String {
    format!("Usage: {prog} [--config PATH|-c PATH] [--once] [--no-overlay] [-h|--help]")
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "traymon".into());
    let mut config: Option<PathBuf> = None;
    let mut once = false; // --once
    let mut no_overlay = false; // --no-overlay

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(usage(&prog)),
            "--config" | "-c" => match it.next() {
                Some(p) => config = Some(PathBuf::from(p)),
                None => return Err(format!("--config needs a path. {}", usage(&prog))),
            },
            "--once" => once = true,
            "--no-overlay" => no_overlay = true,
            _ if arg.starts_with("--config=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        config = Some(PathBuf::from(v));
                    }
                }
            }
            _ => return Err(format!("Unexpected argument '{arg}'. {}", usage(&prog))),
        }
    }
    Ok(ParsedArgs {
        config,
        once,
        no_overlay,
    })
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_env("TRAYMON_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    let res = match log_file {
        Some(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating {}", dir.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    res.map_err(|e| anyhow!("installing logger: {e}"))
}

fn connected_bridge(cfg: &Config) -> Box<dyn SensorBridge> {
    let mut bridge = HardwareBridge::new(BridgeSettings::from(cfg));
    bridge.connect();
    Box::new(bridge)
}

/// Bootstrap sample, one refresh interval, then print the tooltip.
fn run_once(store: &ConfigStore) -> Result<()> {
    let cfg = store.snapshot();
    let mut sampler = Sampler::new(Box::new(SysinfoProbe::new()), connected_bridge(&cfg), &cfg);
    sampler.read(&cfg);
    thread::sleep(cfg.refresh_interval());
    let snap = sampler.read(&cfg);
    println!("{}", snap.tooltip(&cfg));
    Ok(())
}

fn main() -> Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };
    let path = parsed.config.unwrap_or_else(config_path);

    if parsed.once {
        init_logging(None)?;
    } else {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_else(config_dir);
        init_logging(Some(&dir.join("traymon.log")))?;
    }
    info!("config file: {}", path.display());

    let (store, load_err) = ConfigStore::open(path);
    if let Some(e) = &load_err {
        error!("config not loaded, using defaults: {e}");
    }
    let store = Arc::new(store);

    if parsed.once {
        return run_once(&store);
    }

    let cfg = store.snapshot();
    let tray = Arc::new(TermTray::new());
    if let Some(e) = &load_err {
        tray.notify(&e.summary());
    }

    let sampler = Sampler::new(Box::new(SysinfoProbe::new()), connected_bridge(&cfg), &cfg);
    let state = AppState::new(store.clone(), sampler, tray.clone());

    let (overlay, commands) = OverlayHandle::channel();
    let (action_tx, action_rx) = crossbeam_channel::unbounded();
    let (stop_tx, stop_rx) = crossbeam_channel::unbounded();

    let surface = TerminalSurface::open(tray.clone(), store.clone(), action_tx)
        .context("taking over the terminal")?;
    let actor = OverlayActor::new(surface, commands, store.clone());

    let consumer = (!parsed.no_overlay).then(|| overlay.clone());
    let sampling = Monitor::new(state.clone(), consumer)
        .spawn(stop_rx)
        .context("starting sampling thread")?;

    let actions = TrayActions::new(
        state,
        overlay.clone(),
        stop_tx.clone(),
        Box::new(|cfg: &Config| -> Box<dyn SensorBridge> {
            Box::new(HardwareBridge::new(BridgeSettings::from(cfg)))
        }),
    );
    actions.sync_overlay(&cfg);
    let tray_thread = thread::Builder::new()
        .name("tray".into())
        .spawn(move || traymon::tray::run(actions, action_rx))
        .context("starting tray thread")?;

    // the overlay owns the terminal and runs on this thread until Stop
    actor.run();

    if stop_tx.send(()).is_err() {
        debug!("sampling loop already stopped");
    }
    tray.stop();
    drop(overlay);
    if sampling.join().is_err() {
        error!("sampling thread panicked");
    }
    if tray_thread.join().is_err() {
        error!("tray thread panicked");
    }
    info!("bye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_flags() {
        let p = parse_args(args(&["traymon", "-c", "/tmp/t.json", "--once", "--no-overlay"]))
            .unwrap();
        assert_eq!(p.config, Some(PathBuf::from("/tmp/t.json")));
        assert!(p.once && p.no_overlay);

        let p = parse_args(args(&["traymon", "--config=/x/y.json"])).unwrap();
        assert_eq!(p.config, Some(PathBuf::from("/x/y.json")));
        assert!(!p.once);
    }

    #[test]
    fn help_and_garbage_are_errors() {
        assert!(parse_args(args(&["traymon", "--help"]))
            .err()
            .unwrap()
            .starts_with("Usage:"));
        assert!(parse_args(args(&["traymon", "--bogus"])).is_err());
        assert!(parse_args(args(&["traymon", "--config"])).is_err());
    }
}
