//! Per-second rates from monotonically increasing counters.
//!
//! Each counter source (a network interface, or the global disk pair) keeps
//! its own baseline. The first reading of a source only records the baseline
//! and yields an explicit zero rate. Later readings divide the delta by the
//! elapsed time, floored to [`MIN_ELAPSED`] so two readings landing in the
//! same scheduler slice do not produce a spike. The baseline is replaced on
//! every reading, never accumulated.
//!
//! Counters that go backwards (wrap, device reset, re-enumeration) produce a
//! negative rate. The sampler passes that through untouched; deciding how to
//! display it is left to the formatting layer.

use std::collections::HashMap;
use std::ops::Add;
use std::time::{Duration, Instant};

use crate::probe::InterfaceCounters;

pub const MIN_ELAPSED: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CounterSource {
    Interface(String),
    Disk,
}

#[derive(Debug, Clone, Copy)]
struct Baseline {
    at: Instant,
    values: [u64; 2],
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NetRate {
    pub up_bps: f64,
    pub down_bps: f64,
}

impl Add for NetRate {
    type Output = NetRate;

    fn add(self, rhs: NetRate) -> NetRate {
        NetRate {
            up_bps: self.up_bps + rhs.up_bps,
            down_bps: self.down_bps + rhs.down_bps,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiskRate {
    pub read_bps: f64,
    pub write_bps: f64,
}

/// Network rates for one tick: per interface in selection order, plus the sum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetSample {
    pub per_iface: Vec<(String, NetRate)>,
    pub aggregate: NetRate,
}

#[derive(Debug, Default)]
pub struct RateSampler {
    baselines: HashMap<CounterSource, Baseline>,
}

impl RateSampler {
    pub fn new() -> Self {
        Self::default()
    }

    fn advance(&mut self, source: CounterSource, values: [u64; 2], now: Instant) -> [f64; 2] {
        let prev = self.baselines.insert(source, Baseline { at: now, values });
        let Some(prev) = prev else {
            return [0.0, 0.0];
        };
        let dt = now
            .saturating_duration_since(prev.at)
            .max(MIN_ELAPSED)
            .as_secs_f64();
        let delta = |i: usize| (values[i] as i128 - prev.values[i] as i128) as f64 / dt;
        [delta(0), delta(1)]
    }

    pub fn sample_interface(&mut self, name: &str, sent: u64, received: u64, now: Instant) -> NetRate {
        let [up_bps, down_bps] =
            self.advance(CounterSource::Interface(name.to_string()), [sent, received], now);
        NetRate { up_bps, down_bps }
    }

    pub fn sample_disk(&mut self, read: u64, written: u64, now: Instant) -> DiskRate {
        let [read_bps, write_bps] = self.advance(CounterSource::Disk, [read, written], now);
        DiskRate {
            read_bps,
            write_bps,
        }
    }

    /// Sample every selected interface that is present in `current`.
    ///
    /// Selected names missing from this enumeration are skipped for this tick
    /// (their baselines are kept). Returns `None` when none are present.
    pub fn sample_interfaces(
        &mut self,
        selected: &[String],
        current: &[InterfaceCounters],
        now: Instant,
    ) -> Option<NetSample> {
        let mut sample = NetSample::default();
        for name in selected {
            let Some(c) = current.iter().find(|c| &c.name == name) else {
                continue;
            };
            let rate = self.sample_interface(name, c.sent, c.received, now);
            sample.aggregate = sample.aggregate + rate;
            sample.per_iface.push((name.clone(), rate));
        }
        if sample.per_iface.is_empty() {
            None
        } else {
            Some(sample)
        }
    }

    /// Drop all network baselines; the next reading of each interface bootstraps again.
    pub fn reset_network(&mut self) {
        self.baselines
            .retain(|source, _| !matches!(source, CounterSource::Interface(_)));
    }

    pub fn has_baseline(&self, source: &CounterSource) -> bool {
        self.baselines.contains_key(source)
    }
}
