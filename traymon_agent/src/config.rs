//! Process-wide configuration: defaults, JSON persistence, and the shared store.
//!
//! Stored under XDG config dir: $XDG_CONFIG_HOME/traymon/config.json
//! (fallback ~/.config/traymon/config.json). Saving merges into the existing
//! file so keys this build does not know about survive a round trip.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::template::{Template, DEFAULT_FORMAT};

/// Lower bound for the sampling interval, whatever the file says.
pub const MIN_REFRESH: Duration = Duration::from_millis(250);
pub const MAX_REFRESH: Duration = Duration::from_secs(86_400);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetMode {
    #[default]
    Aggregate,
    Separate,
}

/// Named screen anchor for the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

impl Anchor {
    pub const ALL: [Anchor; 5] = [
        Anchor::TopLeft,
        Anchor::TopRight,
        Anchor::BottomLeft,
        Anchor::BottomRight,
        Anchor::Center,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Anchor::TopLeft => "top_left",
            Anchor::TopRight => "top_right",
            Anchor::BottomLeft => "bottom_left",
            Anchor::BottomRight => "bottom_right",
            Anchor::Center => "center",
        }
    }
}

/// `[family, size]`, stored as a two-element JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontSpec(pub String, pub u16);

impl Default for FontSpec {
    fn default() -> Self {
        FontSpec("monospace".into(), 10)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub refresh_s: f64,

    pub show_cpu: bool,
    pub show_ram: bool,
    pub show_net: bool,
    pub show_disk: bool,

    // Single interface: "auto" or a name
    pub net_iface: String,
    // Multi-interface: list of names, or ["auto"] for every interface that is up
    pub net_ifaces: Option<Vec<String>>,
    pub net_mode: NetMode,

    pub show_temps: bool,
    pub show_cpu_temp: bool,
    pub show_gpu: bool,
    pub show_gpu_temp: bool,
    pub show_gpu_load: bool,

    pub tooltip_lines: i64,

    // Optional helper process that exposes hardware sensors
    pub bridge_exe: Option<String>,
    pub bridge_settle_ms: u64,

    pub overlay_enabled: bool,
    pub overlay_pos: Anchor,
    pub overlay_x: Option<i32>,
    pub overlay_y: Option<i32>,
    pub overlay_locked: bool,
    pub overlay_padding: i32,
    pub overlay_bg: String,
    pub overlay_fg: String,
    pub overlay_font: FontSpec,
    pub overlay_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_s: 1.0,
            show_cpu: true,
            show_ram: true,
            show_net: true,
            show_disk: true,
            net_iface: "auto".into(),
            net_ifaces: None,
            net_mode: NetMode::Aggregate,
            show_temps: true,
            show_cpu_temp: true,
            show_gpu: true,
            show_gpu_temp: true,
            show_gpu_load: true,
            tooltip_lines: 6,
            bridge_exe: None,
            bridge_settle_ms: 1000,
            overlay_enabled: false,
            overlay_pos: Anchor::BottomRight,
            overlay_x: None,
            overlay_y: None,
            overlay_locked: true,
            overlay_padding: 1,
            overlay_bg: "black".into(),
            overlay_fg: "white".into(),
            overlay_font: FontSpec::default(),
            overlay_format: DEFAULT_FORMAT.into(),
        }
    }
}

impl Config {
    /// Sampling interval, clamped to [`MIN_REFRESH`]..=[`MAX_REFRESH`].
    pub fn refresh_interval(&self) -> Duration {
        let secs = if self.refresh_s.is_finite() {
            self.refresh_s
        } else {
            1.0
        };
        Duration::from_secs_f64(secs.clamp(MIN_REFRESH.as_secs_f64(), MAX_REFRESH.as_secs_f64()))
    }

    /// Maximum tooltip line count, never below one.
    pub fn tooltip_limit(&self) -> usize {
        self.tooltip_lines.max(1) as usize
    }

    /// Explicit overlay coordinates, only when both are set.
    pub fn pinned(&self) -> Option<(i32, i32)> {
        self.overlay_x.zip(self.overlay_y)
    }

    pub fn cpu_temp_shown(&self) -> bool {
        self.show_temps && self.show_cpu_temp
    }

    pub fn gpu_temp_shown(&self) -> bool {
        self.show_temps && self.show_gpu_temp
    }

    pub fn wants_bridge(&self) -> bool {
        self.show_temps || self.show_gpu
    }

    pub fn template(&self) -> Result<Template, ConfigError> {
        Ok(Template::parse(&self.overlay_format)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.template().map(|_| ())
    }

    /// Overlay the recognized keys of `values` onto a copy of `self`.
    pub fn merged(&self, values: &Map<String, Value>) -> Result<Config, ConfigError> {
        let mut base = match serde_json::to_value(self) {
            Ok(Value::Object(m)) => m,
            Ok(_) => Map::new(),
            Err(source) => {
                return Err(ConfigError::InvalidValue {
                    key: "*".into(),
                    source,
                })
            }
        };
        let mut touched = Vec::new();
        for (k, v) in values {
            if base.contains_key(k) {
                base.insert(k.clone(), v.clone());
                touched.push(k.as_str());
            } else {
                debug!("ignoring unrecognized config key {k}");
            }
        }

        match serde_json::from_value::<Config>(Value::Object(base)) {
            Ok(cfg) => Ok(cfg),
            Err(err) => {
                // Find the key that broke deserialization so the report names it.
                for key in touched {
                    let mut single = Map::new();
                    single.insert(key.to_string(), values[key].clone());
                    let mut probe = serde_json::to_value(Config::default())
                        .ok()
                        .and_then(|v| v.as_object().cloned())
                        .unwrap_or_default();
                    probe.extend(single);
                    if let Err(source) = serde_json::from_value::<Config>(Value::Object(probe)) {
                        return Err(ConfigError::InvalidValue {
                            key: key.to_string(),
                            source,
                        });
                    }
                }
                Err(ConfigError::InvalidValue {
                    key: "*".into(),
                    source: err,
                })
            }
        }
    }
}

/// A whole-value replacement of one configuration key.
#[derive(Debug, Clone, PartialEq)]
pub enum Setting {
    OverlayEnabled(bool),
    OverlayLocked(bool),
    OverlayPos(Anchor),
    OverlayX(Option<i32>),
    OverlayY(Option<i32>),
    OverlayBg(String),
    OverlayFg(String),
}

impl Setting {
    pub fn key(&self) -> &'static str {
        match self {
            Setting::OverlayEnabled(_) => "overlay_enabled",
            Setting::OverlayLocked(_) => "overlay_locked",
            Setting::OverlayPos(_) => "overlay_pos",
            Setting::OverlayX(_) => "overlay_x",
            Setting::OverlayY(_) => "overlay_y",
            Setting::OverlayBg(_) => "overlay_bg",
            Setting::OverlayFg(_) => "overlay_fg",
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Setting::OverlayEnabled(v) | Setting::OverlayLocked(v) => Value::Bool(*v),
            Setting::OverlayPos(a) => Value::String(a.name().into()),
            Setting::OverlayX(v) | Setting::OverlayY(v) => v.map(Value::from).unwrap_or(Value::Null),
            Setting::OverlayBg(s) | Setting::OverlayFg(s) => Value::String(s.clone()),
        }
    }

    fn apply(&self, cfg: &mut Config) {
        match self {
            Setting::OverlayEnabled(v) => cfg.overlay_enabled = *v,
            Setting::OverlayLocked(v) => cfg.overlay_locked = *v,
            Setting::OverlayPos(a) => cfg.overlay_pos = *a,
            Setting::OverlayX(v) => cfg.overlay_x = *v,
            Setting::OverlayY(v) => cfg.overlay_y = *v,
            Setting::OverlayBg(s) => cfg.overlay_bg = s.clone(),
            Setting::OverlayFg(s) => cfg.overlay_fg = s.clone(),
        }
    }
}

pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("traymon")
    } else {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("traymon")
    }
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Shared configuration. Readers get immutable snapshots; writers replace
/// whole keys and persist them immediately.
pub struct ConfigStore {
    path: PathBuf,
    current: RwLock<Arc<Config>>,
    // serializes file writes so concurrent updates land in order
    disk: Mutex<()>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(Arc::new(config)),
            disk: Mutex::new(()),
        }
    }

    /// Start from defaults and overlay the persisted file if there is one.
    /// A broken file leaves the defaults in place; the error is handed back.
    pub fn open(path: impl Into<PathBuf>) -> (Self, Option<ConfigError>) {
        let store = Self::new(path, Config::default());
        let err = store.reload().err();
        (store, err)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Arc<Config> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-read the file. On failure nothing changes in memory.
    pub fn reload(&self) -> Result<(), ConfigError> {
        if !self.path.is_file() {
            debug!("no config file at {}", self.path.display());
            return Ok(());
        }
        let values = read_json_object(&self.path)?;
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let next = guard.merged(&values)?;
        next.validate()?;
        *guard = Arc::new(next);
        Ok(())
    }

    /// Apply whole-key replacements in memory, then merge them into the file.
    /// The in-memory change stands even when persisting fails.
    pub fn update(&self, settings: impl IntoIterator<Item = Setting>) -> Result<(), ConfigError> {
        let settings: Vec<Setting> = settings.into_iter().collect();
        {
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            let mut next = Config::clone(&guard);
            for s in &settings {
                s.apply(&mut next);
            }
            *guard = Arc::new(next);
        }
        let updates: Vec<(&str, Value)> = settings.iter().map(|s| (s.key(), s.to_json())).collect();
        let _disk = self.disk.lock().unwrap_or_else(PoisonError::into_inner);
        save_updates(&self.path, &updates)
    }
}

/// Remove `//` and `#` line comments that sit outside string literals.
pub fn strip_comments(text: &str) -> String {
    let mut out = Vec::new();
    for line in text.lines() {
        let mut in_str = false;
        let mut escaped = false;
        let mut cut = None;
        let bytes = line.as_bytes();
        for (i, &b) in bytes.iter().enumerate() {
            if escaped {
                escaped = false;
                continue;
            }
            match b {
                b'\\' => escaped = true,
                b'"' => in_str = !in_str,
                b'#' if !in_str => {
                    cut = Some(i);
                    break;
                }
                b'/' if !in_str && bytes.get(i + 1) == Some(&b'/') => {
                    cut = Some(i);
                    break;
                }
                _ => {}
            }
        }
        out.push(match cut {
            Some(i) => &line[..i],
            None => line,
        });
    }
    out.join("\n")
}

fn read_json_object(path: &Path) -> Result<Map<String, Value>, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value =
        serde_json::from_str(&strip_comments(&raw)).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(ConfigError::NotAnObject(path.to_path_buf())),
    }
}

/// Merge `updates` into the file at `path` (created if missing), keeping
/// every other key intact. Written to a sibling temp file, then renamed.
pub fn save_updates(path: &Path, updates: &[(&str, Value)]) -> Result<(), ConfigError> {
    let io_err = |source: std::io::Error| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut current = if path.is_file() {
        read_json_object(path).unwrap_or_else(|e| {
            warn!("rewriting unreadable config file: {e}");
            Map::new()
        })
    } else {
        Map::new()
    };
    for (k, v) in updates {
        current.insert((*k).to_string(), v.clone());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    let data = serde_json::to_vec_pretty(&Value::Object(current)).map_err(|source| {
        ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, data).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}
