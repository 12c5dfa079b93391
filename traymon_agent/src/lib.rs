//! Sampling engine for traymon.
//!
//! Turns cumulative host counters into rates, gathers instantaneous sensor
//! readings, and aggregates both into an immutable [`Snapshot`] per tick.
//! Nothing in this crate owns a thread; the presentation crate drives it.

pub mod bridge;
pub mod config;
pub mod error;
pub mod probe;
pub mod rate;
pub mod sampler;
pub mod snapshot;
pub mod template;

pub use bridge::{BridgeState, GpuReading, HardwareBridge, SensorBridge};
pub use config::{Anchor, Config, ConfigStore, NetMode, Setting};
pub use error::{ConfigError, TemplateError};
pub use probe::{DiskCounters, HostProbe, InterfaceCounters, SysinfoProbe};
pub use rate::{DiskRate, NetRate, NetSample, RateSampler};
pub use sampler::{NetSelection, Sampler};
pub use snapshot::{build_snapshot, MemoryUsage, RateReadings, SensorReadings, Snapshot};
pub use template::{Template, Token, Tokens};

/// Name shown wherever the application identifies itself.
pub const APP_NAME: &str = "traymon";
