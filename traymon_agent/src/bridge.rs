//! Sensor bridge: CPU temperature, GPU load and GPU temperature.
//!
//! Best effort by design of the hardware: any source may be missing, and a
//! missing source reads as `None`. The bridge is an explicit state machine so
//! callers can tell "never started" from "tried and failed".

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::Nvml;
use once_cell::sync::OnceCell;
use sysinfo::Components;
use tracing::{debug, info, warn};

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Disconnected,
    Starting,
    Connected,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GpuReading {
    pub load_percent: Option<f32>,
    pub temperature_c: Option<f32>,
}

/// Instantaneous hardware sensors. Implementations never panic or error
/// outward; absence is the only failure signal.
pub trait SensorBridge: Send {
    /// Bring the bridge up. Returns whether it ended up connected.
    fn connect(&mut self) -> bool;
    fn disconnect(&mut self);
    fn state(&self) -> BridgeState;
    fn read_cpu_temperature(&mut self) -> Option<f32>;
    fn read_gpu(&mut self) -> GpuReading;
}

// Runtime toggle (read once): TRAYMON_BRIDGE=0 keeps the bridge disconnected
fn bridge_enabled() -> bool {
    static ON: OnceCell<bool> = OnceCell::new();
    *ON.get_or_init(|| {
        std::env::var("TRAYMON_BRIDGE")
            .map(|v| v != "0")
            .unwrap_or(true)
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeSettings {
    /// Helper process exposing sensors, started before probing.
    pub exe: Option<PathBuf>,
    /// How long to let the helper come up before probing.
    pub settle: Duration,
    /// False when neither temperatures nor GPU are shown.
    pub wanted: bool,
}

impl From<&Config> for BridgeSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            exe: cfg.bridge_exe.as_ref().map(PathBuf::from),
            settle: Duration::from_millis(cfg.bridge_settle_ms),
            wanted: cfg.wants_bridge(),
        }
    }
}

struct Sensors {
    components: Components,
    nvml: Option<Nvml>,
    gfx: bool,
}

impl Sensors {
    fn open() -> Self {
        let components = Components::new_with_refreshed_list();
        let nvml = match Nvml::init() {
            Ok(n) => Some(n),
            Err(e) => {
                debug!("nvml unavailable: {e}");
                None
            }
        };
        let gfx = guarded(|| gfxinfo::active_gpu().ok().map(|_| ())).is_some();
        Self {
            components,
            nvml,
            gfx,
        }
    }

    fn is_empty(&self) -> bool {
        self.components.list().is_empty() && self.nvml.is_none() && !self.gfx
    }

    fn max_temp(&mut self, matches: impl Fn(&str) -> bool) -> Option<f32> {
        self.components.refresh(false);
        self.components
            .iter()
            .filter(|c| matches(&c.label().to_ascii_lowercase()))
            .filter_map(|c| c.temperature())
            .filter(|t| t.is_finite())
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    fn nvml_reading(&self) -> GpuReading {
        let Some(nvml) = self.nvml.as_ref() else {
            return GpuReading::default();
        };
        let Ok(dev) = nvml.device_by_index(0) else {
            return GpuReading::default();
        };
        GpuReading {
            load_percent: dev.utilization_rates().ok().map(|u| u.gpu as f32),
            temperature_c: dev
                .temperature(TemperatureSensor::Gpu)
                .ok()
                .map(|t| t as f32),
        }
    }
}

fn guarded<T>(f: impl FnOnce() -> Option<T>) -> Option<T> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)).unwrap_or_else(|e| {
        warn!("sensor probe panicked: {e:?}");
        None
    })
}

fn is_cpu_label(l: &str) -> bool {
    l.contains("cpu") || l.contains("package") || l.contains("tctl") || l.contains("tdie")
}

fn is_gpu_label(l: &str) -> bool {
    l.contains("gpu") || l.contains("amdgpu") || l.contains("edge")
}

/// Production bridge over sysinfo components, NVML and gfxinfo, optionally
/// fronted by a helper process.
pub struct HardwareBridge {
    settings: BridgeSettings,
    state: BridgeState,
    helper: Option<Child>,
    sensors: Option<Sensors>,
}

impl HardwareBridge {
    pub fn new(settings: BridgeSettings) -> Self {
        Self {
            settings,
            state: BridgeState::Disconnected,
            helper: None,
            sensors: None,
        }
    }

    fn spawn_helper(&mut self, exe: PathBuf) -> bool {
        if !exe.is_file() {
            debug!("bridge helper {} not found; using native sensors", exe.display());
            return true;
        }
        let mut cmd = Command::new(&exe);
        if let Some(dir) = exe.parent() {
            cmd.current_dir(dir);
        }
        match cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => {
                info!("started bridge helper {} (pid {})", exe.display(), child.id());
                self.helper = Some(child);
                std::thread::sleep(self.settings.settle);
                true
            }
            Err(e) => {
                warn!("failed to start bridge helper {}: {e}", exe.display());
                false
            }
        }
    }
}

impl SensorBridge for HardwareBridge {
    fn connect(&mut self) -> bool {
        if self.state == BridgeState::Connected {
            return true;
        }
        if !bridge_enabled() || !self.settings.wanted {
            self.state = BridgeState::Disconnected;
            return false;
        }
        self.state = BridgeState::Starting;

        if let Some(exe) = self.settings.exe.clone() {
            if !self.spawn_helper(exe) {
                self.state = BridgeState::Failed;
                return false;
            }
        }

        let sensors = Sensors::open();
        if sensors.is_empty() {
            warn!("no hardware sensors found; temperatures and GPU stay unavailable");
            self.state = BridgeState::Failed;
            return false;
        }
        self.sensors = Some(sensors);
        self.state = BridgeState::Connected;
        info!("sensor bridge connected");
        true
    }

    fn disconnect(&mut self) {
        if let Some(mut child) = self.helper.take() {
            if let Ok(None) = child.try_wait() {
                if let Err(e) = child.kill() {
                    warn!("failed to stop bridge helper: {e}");
                }
            }
            let _ = child.wait();
        }
        self.sensors = None;
        self.state = BridgeState::Disconnected;
    }

    fn state(&self) -> BridgeState {
        self.state
    }

    fn read_cpu_temperature(&mut self) -> Option<f32> {
        if self.state != BridgeState::Connected {
            return None;
        }
        let sensors = self.sensors.as_mut()?;
        guarded(|| sensors.max_temp(is_cpu_label))
    }

    fn read_gpu(&mut self) -> GpuReading {
        if self.state != BridgeState::Connected {
            return GpuReading::default();
        }
        let Some(sensors) = self.sensors.as_mut() else {
            return GpuReading::default();
        };
        let mut reading = sensors.nvml_reading();
        if reading.load_percent.is_none() && sensors.gfx {
            reading.load_percent =
                guarded(|| gfxinfo::active_gpu().ok().map(|g| g.info().load_pct() as f32));
        }
        if reading.temperature_c.is_none() {
            reading.temperature_c = guarded(|| sensors.max_temp(is_gpu_label));
        }
        reading
    }
}

impl Drop for HardwareBridge {
    fn drop(&mut self) {
        if self.helper.is_some() {
            self.disconnect();
        }
    }
}
