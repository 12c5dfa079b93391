//! One immutable reading of every metric per tick, and its text renderings.

use crate::bridge::GpuReading;
use crate::config::{Config, NetMode};
use crate::rate::{DiskRate, NetRate, NetSample};
use crate::template::{Template, Tokens};
use crate::APP_NAME;

/// Marker rendered for a metric that is enabled but not measurable.
pub const NOT_AVAILABLE: &str = "n/a";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    pub used: u64,
    pub total: u64,
}

/// `None` means "not currently measurable", which is distinct from zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub cpu_percent: Option<f32>,
    pub cpu_temp_c: Option<f32>,
    pub memory: Option<MemoryUsage>,
    pub net: Option<NetRate>,
    // insertion order = selection order
    pub net_per_iface: Vec<(String, NetRate)>,
    pub disk: Option<DiskRate>,
    pub gpu_load_percent: Option<f32>,
    pub gpu_temp_c: Option<f32>,
}

/// Instantaneous readings for one tick.
#[derive(Debug, Clone, Default)]
pub struct SensorReadings {
    pub cpu_percent: Option<f32>,
    pub memory: Option<MemoryUsage>,
    pub cpu_temp_c: Option<f32>,
    pub gpu: GpuReading,
}

/// Counter-derived rates for one tick.
#[derive(Debug, Clone, Default)]
pub struct RateReadings {
    pub net: Option<NetSample>,
    pub disk: Option<DiskRate>,
}

/// Pure aggregation: applies the display flags, performs no I/O.
pub fn build_snapshot(cfg: &Config, sensors: SensorReadings, rates: RateReadings) -> Snapshot {
    let (net, net_per_iface) = match rates.net.filter(|_| cfg.show_net) {
        Some(sample) => (Some(sample.aggregate), sample.per_iface),
        None => (None, Vec::new()),
    };
    Snapshot {
        cpu_percent: sensors.cpu_percent.filter(|_| cfg.show_cpu),
        cpu_temp_c: sensors
            .cpu_temp_c
            .filter(|_| cfg.show_cpu && cfg.cpu_temp_shown()),
        memory: sensors.memory.filter(|_| cfg.show_ram),
        net,
        net_per_iface,
        disk: rates.disk.filter(|_| cfg.show_disk),
        gpu_load_percent: sensors
            .gpu
            .load_percent
            .filter(|_| cfg.show_gpu && cfg.show_gpu_load),
        gpu_temp_c: sensors
            .gpu
            .temperature_c
            .filter(|_| cfg.show_gpu && cfg.gpu_temp_shown()),
    }
}

fn scaled(v: f64, units: &[&str]) -> String {
    // NaN and negatives (counter resets) read as zero
    let mut v = if v > 0.0 { v } else { 0.0 };
    let mut i = 0;
    while v >= 1024.0 && i < units.len() - 1 {
        v /= 1024.0;
        i += 1;
    }
    format!("{v:.1} {}", units[i])
}

pub fn human_rate(bps: f64) -> String {
    scaled(bps, &["B/s", "KB/s", "MB/s", "GB/s"])
}

pub fn human_bytes(b: u64) -> String {
    scaled(b as f64, &["B", "KB", "MB", "GB", "TB"])
}

fn separate_interfaces(cfg: &Config) -> bool {
    cfg.net_ifaces.is_some() && cfg.net_mode == NetMode::Separate
}

impl Snapshot {
    pub fn cpu_line(&self, cfg: &Config) -> Option<String> {
        if !cfg.show_cpu {
            return None;
        }
        let mut line = match self.cpu_percent {
            Some(p) => format!("CPU {p:.0}%"),
            None => format!("CPU {NOT_AVAILABLE}"),
        };
        if let Some(t) = self.cpu_temp_c.filter(|_| cfg.cpu_temp_shown()) {
            line.push_str(&format!(" | {t:.0}°C"));
        }
        Some(line)
    }

    pub fn ram_line(&self, cfg: &Config) -> Option<String> {
        if !cfg.show_ram {
            return None;
        }
        Some(match self.memory {
            Some(m) => format!("RAM {}/{}", human_bytes(m.used), human_bytes(m.total)),
            None => format!("RAM {NOT_AVAILABLE}"),
        })
    }

    pub fn disk_line(&self, cfg: &Config) -> Option<String> {
        if !cfg.show_disk {
            return None;
        }
        Some(match self.disk {
            Some(d) => format!(
                "DISK R {} W {}",
                human_rate(d.read_bps),
                human_rate(d.write_bps)
            ),
            None => format!("DISK {NOT_AVAILABLE}"),
        })
    }

    pub fn gpu_line(&self, cfg: &Config) -> Option<String> {
        if !cfg.show_gpu {
            return None;
        }
        if self.gpu_load_percent.is_none() && self.gpu_temp_c.is_none() {
            return Some(format!("GPU {NOT_AVAILABLE}"));
        }
        let mut parts = vec!["GPU".to_string()];
        if cfg.show_gpu_load {
            parts.push(match self.gpu_load_percent {
                Some(l) => format!("{l:.0}%"),
                None => NOT_AVAILABLE.to_string(),
            });
        }
        if let Some(t) = self.gpu_temp_c.filter(|_| cfg.gpu_temp_shown()) {
            parts.push(format!("{t:.0}°C"));
        }
        Some(parts.join(" | "))
    }

    pub fn net_lines(&self, cfg: &Config) -> Vec<String> {
        if !cfg.show_net {
            return Vec::new();
        }
        if separate_interfaces(cfg) {
            if self.net_per_iface.is_empty() {
                return vec![format!("NET {NOT_AVAILABLE}")];
            }
            return self
                .net_per_iface
                .iter()
                .map(|(name, r)| {
                    format!(
                        "NET({name}) ↓{} ↑{}",
                        human_rate(r.down_bps),
                        human_rate(r.up_bps)
                    )
                })
                .collect();
        }
        let Some(agg) = self.net else {
            return vec![format!("NET {NOT_AVAILABLE}")];
        };
        let label = match &cfg.net_ifaces {
            Some(names) => format!("NET({})", names.join("+")),
            None => "NET".to_string(),
        };
        vec![format!(
            "{label} ↓{} ↑{}",
            human_rate(agg.down_bps),
            human_rate(agg.up_bps)
        )]
    }

    /// Lines in fixed priority order: CPU, memory, network, disk, GPU.
    pub fn lines(&self, cfg: &Config) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();
        lines.extend(self.cpu_line(cfg));
        lines.extend(self.ram_line(cfg));
        lines.extend(self.net_lines(cfg));
        lines.extend(self.disk_line(cfg));
        lines.extend(self.gpu_line(cfg));
        lines
    }

    /// Lines truncated to the configured maximum (at least one).
    pub fn tooltip_lines(&self, cfg: &Config) -> Vec<String> {
        let mut lines = self.lines(cfg);
        lines.truncate(cfg.tooltip_limit());
        lines
    }

    pub fn tooltip(&self, cfg: &Config) -> String {
        let lines = self.tooltip_lines(cfg);
        if lines.is_empty() {
            APP_NAME.to_string()
        } else {
            lines.join("\n")
        }
    }

    pub fn tokens(&self, cfg: &Config) -> Tokens {
        let net_lines = self.net_lines(cfg);
        let net = if cfg.net_mode == NetMode::Separate {
            net_lines.join(" / ")
        } else {
            net_lines.into_iter().next().unwrap_or_default()
        };
        Tokens {
            cpu: self.cpu_line(cfg).unwrap_or_default(),
            ram: self.ram_line(cfg).unwrap_or_default(),
            net,
            disk: self.disk_line(cfg).unwrap_or_default(),
            gpu: self.gpu_line(cfg).unwrap_or_default(),
        }
    }

    pub fn overlay_text(&self, cfg: &Config, template: &Template) -> String {
        template.render_display(&self.tokens(cfg))
    }
}
