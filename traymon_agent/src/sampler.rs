//! Per-tick collection: host probe + sensor bridge + rate state -> Snapshot.

use std::time::Instant;

use tracing::{debug, info};

use crate::bridge::{BridgeState, SensorBridge};
use crate::config::Config;
use crate::probe::{HostProbe, InterfaceCounters};
use crate::rate::{NetSample, RateSampler};
use crate::snapshot::{build_snapshot, MemoryUsage, RateReadings, SensorReadings, Snapshot};

/// Which interfaces feed the network metric. Resolved at startup and on
/// explicit reload only, never re-evaluated mid-run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetSelection {
    /// One interface, or none when nothing suitable was found.
    Single(Option<String>),
    Multi(Vec<String>),
}

impl NetSelection {
    pub fn resolve(cfg: &Config, current: Option<&[InterfaceCounters]>) -> Self {
        let current = current.unwrap_or(&[]);
        match &cfg.net_ifaces {
            Some(list) => NetSelection::Multi(pick_multi(list, current)),
            None => NetSelection::Single(pick_single(&cfg.net_iface, current)),
        }
    }
}

fn pick_single(wanted: &str, current: &[InterfaceCounters]) -> Option<String> {
    let wanted = wanted.trim();
    if !wanted.eq_ignore_ascii_case("auto") {
        return current
            .iter()
            .any(|c| c.name == wanted)
            .then(|| wanted.to_string());
    }
    current
        .iter()
        .filter(|c| c.up)
        .max_by_key(|c| (c.sent.saturating_add(c.received), c.name.clone()))
        .map(|c| c.name.clone())
}

fn pick_multi(list: &[String], current: &[InterfaceCounters]) -> Vec<String> {
    if list.iter().any(|n| n.eq_ignore_ascii_case("auto")) {
        return current
            .iter()
            .filter(|c| c.up)
            .map(|c| c.name.clone())
            .collect();
    }
    list.iter()
        .filter(|n| current.iter().any(|c| &c.name == *n))
        .cloned()
        .collect()
}

pub struct Sampler {
    probe: Box<dyn HostProbe>,
    bridge: Box<dyn SensorBridge>,
    rates: RateSampler,
    selection: NetSelection,
}

impl Sampler {
    pub fn new(probe: Box<dyn HostProbe>, bridge: Box<dyn SensorBridge>, cfg: &Config) -> Self {
        let mut sampler = Self {
            probe,
            bridge,
            rates: RateSampler::new(),
            selection: NetSelection::Single(None),
        };
        sampler.reload_net_selection(cfg);
        sampler
    }

    pub fn selection(&self) -> &NetSelection {
        &self.selection
    }

    /// Re-pick interfaces from the current enumeration and restart their rates.
    pub fn reload_net_selection(&mut self, cfg: &Config) {
        let current = self.probe.interfaces();
        self.selection = NetSelection::resolve(cfg, current.as_deref());
        self.rates.reset_network();
        info!("network selection: {:?}", self.selection);
    }

    pub fn bridge_state(&self) -> BridgeState {
        self.bridge.state()
    }

    /// Swap the sensor bridge, handing back the previous one.
    pub fn replace_bridge(&mut self, bridge: Box<dyn SensorBridge>) -> Box<dyn SensorBridge> {
        std::mem::replace(&mut self.bridge, bridge)
    }

    pub fn read(&mut self, cfg: &Config) -> Snapshot {
        self.read_with(cfg, Instant::now)
    }

    /// Same as [`Sampler::read`] with every counter stamped at `now`.
    pub fn read_at(&mut self, cfg: &Config, now: Instant) -> Snapshot {
        self.read_with(cfg, || now)
    }

    fn read_with(&mut self, cfg: &Config, mut clock: impl FnMut() -> Instant) -> Snapshot {
        let mut sensors = SensorReadings::default();
        let mut rates = RateReadings::default();

        if cfg.show_cpu {
            sensors.cpu_percent = self.probe.cpu_percent();
        }
        if cfg.show_ram {
            sensors.memory = self
                .probe
                .memory()
                .map(|(used, total)| MemoryUsage { used, total });
        }
        if cfg.show_net {
            rates.net = self.read_net(&mut clock);
        }
        if cfg.show_disk {
            rates.disk = match self.probe.disk_io() {
                Some(d) => Some(self.rates.sample_disk(d.read, d.written, clock())),
                None => {
                    debug!("disk counters unavailable this tick");
                    None
                }
            };
        }
        if cfg.show_cpu && cfg.cpu_temp_shown() {
            sensors.cpu_temp_c = self.bridge.read_cpu_temperature();
        }
        if cfg.show_gpu && (cfg.show_gpu_load || cfg.gpu_temp_shown()) {
            sensors.gpu = self.bridge.read_gpu();
        }

        build_snapshot(cfg, sensors, rates)
    }

    fn read_net(&mut self, clock: &mut impl FnMut() -> Instant) -> Option<NetSample> {
        let current = self.probe.interfaces()?;
        let now = clock();
        match &self.selection {
            NetSelection::Single(None) => None,
            NetSelection::Single(Some(name)) => {
                let c = current.iter().find(|c| &c.name == name)?;
                let rate = self.rates.sample_interface(name, c.sent, c.received, now);
                Some(NetSample {
                    per_iface: vec![(name.clone(), rate)],
                    aggregate: rate,
                })
            }
            NetSelection::Multi(names) => self.rates.sample_interfaces(names, &current, now),
        }
    }
}
