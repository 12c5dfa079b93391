//! Host counters: CPU load, memory, per-interface network bytes, disk I/O bytes.
//!
//! Every reading is optional. A source that fails or panics inside sysinfo
//! degrades to `None` for that call only.

use std::collections::HashSet;

use sysinfo::{Disks, Networks, System};
use tracing::warn;

/// Cumulative byte counters of one network interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceCounters {
    pub name: String,
    pub sent: u64,
    pub received: u64,
    pub up: bool,
}

/// Cumulative bytes read/written across all disks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskCounters {
    pub read: u64,
    pub written: u64,
}

pub trait HostProbe: Send {
    fn cpu_percent(&mut self) -> Option<f32>;
    /// `(used, total)` bytes.
    fn memory(&mut self) -> Option<(u64, u64)>;
    /// Currently enumerated interfaces, in a stable order.
    fn interfaces(&mut self) -> Option<Vec<InterfaceCounters>>;
    fn disk_io(&mut self) -> Option<DiskCounters>;
}

/// Production probe backed by persistent sysinfo handles.
pub struct SysinfoProbe {
    sys: System,
    networks: Networks,
    disks: Disks,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        let mut sys = System::new();
        // Prime CPU usage so the first real reading has something to diff against
        sys.refresh_cpu_usage();
        Self {
            sys,
            networks: Networks::new_with_refreshed_list(),
            disks: Disks::new_with_refreshed_list(),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

fn guarded<T>(what: &str, f: impl FnOnce() -> Option<T>) -> Option<T> {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(v) => v,
        Err(e) => {
            warn!("sysinfo {what} refresh panicked: {e:?}");
            None
        }
    }
}

fn is_loopback(name: &str) -> bool {
    let n = name.to_ascii_lowercase();
    n == "lo" || n.starts_with("lo0") || n.contains("loopback")
}

impl HostProbe for SysinfoProbe {
    fn cpu_percent(&mut self) -> Option<f32> {
        let sys = &mut self.sys;
        guarded("cpu", || {
            sys.refresh_cpu_usage();
            let v = sys.global_cpu_usage();
            v.is_finite().then_some(v)
        })
    }

    fn memory(&mut self) -> Option<(u64, u64)> {
        let sys = &mut self.sys;
        guarded("memory", || {
            sys.refresh_memory();
            let total = sys.total_memory();
            if total == 0 {
                return None;
            }
            Some((total.saturating_sub(sys.available_memory()), total))
        })
    }

    fn interfaces(&mut self) -> Option<Vec<InterfaceCounters>> {
        let networks = &mut self.networks;
        guarded("network", || {
            networks.refresh(true);
            let mut list: Vec<InterfaceCounters> = networks
                .iter()
                .map(|(name, data)| {
                    let sent = data.total_transmitted();
                    let received = data.total_received();
                    InterfaceCounters {
                        name: name.to_string(),
                        sent,
                        received,
                        up: !is_loopback(name) && sent.saturating_add(received) > 0,
                    }
                })
                .collect();
            // sysinfo hands these out in hash order
            list.sort_by(|a, b| a.name.cmp(&b.name));
            Some(list)
        })
    }

    fn disk_io(&mut self) -> Option<DiskCounters> {
        let disks = &mut self.disks;
        guarded("disk", || {
            disks.refresh(true);
            if disks.list().is_empty() {
                return None;
            }
            // several mounts can share one device; count each device once
            let mut seen = HashSet::new();
            let mut total = DiskCounters { read: 0, written: 0 };
            for d in disks.list() {
                if !seen.insert(d.name().to_os_string()) {
                    continue;
                }
                let usage = d.usage();
                total.read = total.read.saturating_add(usage.total_read_bytes);
                total.written = total.written.saturating_add(usage.total_written_bytes);
            }
            Some(total)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_names() {
        assert!(is_loopback("lo"));
        assert!(is_loopback("lo0"));
        assert!(is_loopback("Loopback Pseudo-Interface 1"));
        assert!(!is_loopback("eth0"));
        assert!(!is_loopback("wlo1"));
    }
}
