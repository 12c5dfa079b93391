//! Fakes shared by the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use traymon::placement::{Area, Point, Size};
use traymon::surface::{OverlayStyle, OverlaySurface, Prompt, SurfaceError, SurfaceEvent};
use traymon::TraySurface;
use traymon_agent::{BridgeState, DiskCounters, GpuReading, HostProbe, InterfaceCounters, SensorBridge};

/// Overlay surface that records what the actor did to it.
#[derive(Debug, Default)]
pub struct FakeSurface {
    pub calls: Vec<String>,
    pub text: String,
    pub at: Point,
    pub visible: bool,
    pub draggable: bool,
    pub style: Option<OverlayStyle>,
    pub prompts: Vec<Prompt>,
    /// Handed out by the next `pump`.
    pub events: Vec<SurfaceEvent>,
    pub destroyed: bool,
}

pub const SCREEN: Size = Size {
    width: 100,
    height: 40,
};

impl OverlaySurface for FakeSurface {
    fn set_text(&mut self, text: &str) -> Result<(), SurfaceError> {
        if text == "boom" {
            panic!("surface blew up");
        }
        self.calls.push(format!("set_text:{text}"));
        self.text = text.to_string();
        Ok(())
    }

    fn widget_size(&self) -> Size {
        Size {
            width: self.text.lines().map(|l| l.chars().count()).max().unwrap_or(0) as i32,
            height: self.text.lines().count().max(1) as i32,
        }
    }

    fn work_area(&self) -> Area {
        Area {
            origin: Point::default(),
            size: SCREEN,
        }
    }

    fn move_to(&mut self, at: Point) -> Result<(), SurfaceError> {
        self.calls.push(format!("move_to:{},{}", at.x, at.y));
        self.at = at;
        Ok(())
    }

    fn position(&self) -> Result<Point, SurfaceError> {
        if self.destroyed {
            return Err(SurfaceError::Closed);
        }
        Ok(self.at)
    }

    fn set_visible(&mut self, visible: bool) -> Result<(), SurfaceError> {
        self.calls.push(format!("set_visible:{visible}"));
        self.visible = visible;
        Ok(())
    }

    fn apply_style(&mut self, style: &OverlayStyle) -> Result<(), SurfaceError> {
        self.calls.push("apply_style".into());
        self.style = Some(style.clone());
        Ok(())
    }

    fn set_draggable(&mut self, draggable: bool) {
        self.draggable = draggable;
    }

    fn begin_prompt(&mut self, prompt: Prompt) -> Result<(), SurfaceError> {
        self.prompts.push(prompt);
        Ok(())
    }

    fn pump(&mut self) -> Result<Vec<SurfaceEvent>, SurfaceError> {
        Ok(std::mem::take(&mut self.events))
    }

    fn destroy(&mut self) {
        self.calls.push("destroy".into());
        self.destroyed = true;
    }
}

#[derive(Debug, Default)]
pub struct TrayLog {
    pub tooltips: Vec<String>,
    pub notices: Vec<String>,
    pub clipboard: Vec<String>,
    pub stopped: bool,
}

#[derive(Debug, Default)]
pub struct FakeTray {
    pub log: Mutex<TrayLog>,
}

impl FakeTray {
    pub fn last_tooltip(&self) -> Option<String> {
        self.log.lock().unwrap().tooltips.last().cloned()
    }

    pub fn notices(&self) -> Vec<String> {
        self.log.lock().unwrap().notices.clone()
    }
}

impl TraySurface for FakeTray {
    fn set_tooltip(&self, text: &str) {
        self.log.lock().unwrap().tooltips.push(text.to_string());
    }

    fn notify(&self, message: &str) {
        self.log.lock().unwrap().notices.push(message.to_string());
    }

    fn copy_to_clipboard(&self, text: &str) -> Result<(), SurfaceError> {
        self.log.lock().unwrap().clipboard.push(text.to_string());
        Ok(())
    }

    fn stop(&self) {
        self.log.lock().unwrap().stopped = true;
    }
}

/// Host probe with steadily growing counters. `None` everywhere when `dead`.
#[derive(Debug, Default)]
pub struct SteadyProbe {
    pub dead: bool,
    ticks: u64,
}

impl SteadyProbe {
    pub fn dead() -> Self {
        Self {
            dead: true,
            ticks: 0,
        }
    }
}

impl HostProbe for SteadyProbe {
    fn cpu_percent(&mut self) -> Option<f32> {
        (!self.dead).then_some(25.0)
    }

    fn memory(&mut self) -> Option<(u64, u64)> {
        (!self.dead).then_some((2 << 30, 8 << 30))
    }

    fn interfaces(&mut self) -> Option<Vec<InterfaceCounters>> {
        if self.dead {
            return None;
        }
        self.ticks += 1;
        Some(vec![InterfaceCounters {
            name: "eth0".into(),
            sent: 1000 * self.ticks,
            received: 4000 * self.ticks,
            up: true,
        }])
    }

    fn disk_io(&mut self) -> Option<DiskCounters> {
        (!self.dead).then(|| DiskCounters {
            read: 512 * self.ticks,
            written: 256 * self.ticks,
        })
    }
}

/// Sensor bridge that logs its lifecycle into a shared journal.
pub struct JournalBridge {
    pub id: usize,
    pub journal: Arc<Mutex<Vec<String>>>,
    state: BridgeState,
}

impl JournalBridge {
    pub fn new(id: usize, journal: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            id,
            journal,
            state: BridgeState::Disconnected,
        }
    }

    pub fn connected(id: usize, journal: Arc<Mutex<Vec<String>>>) -> Self {
        let mut b = Self::new(id, journal);
        b.connect();
        b
    }
}

impl SensorBridge for JournalBridge {
    fn connect(&mut self) -> bool {
        self.journal.lock().unwrap().push(format!("connect:{}", self.id));
        self.state = BridgeState::Connected;
        true
    }

    fn disconnect(&mut self) {
        self.journal
            .lock()
            .unwrap()
            .push(format!("disconnect:{}", self.id));
        self.state = BridgeState::Disconnected;
    }

    fn state(&self) -> BridgeState {
        self.state
    }

    fn read_cpu_temperature(&mut self) -> Option<f32> {
        (self.state == BridgeState::Connected).then_some(55.0)
    }

    fn read_gpu(&mut self) -> GpuReading {
        if self.state != BridgeState::Connected {
            return GpuReading::default();
        }
        GpuReading {
            load_percent: Some(10.0),
            temperature_c: Some(45.0),
        }
    }
}
