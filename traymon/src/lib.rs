//! traymon presentation: overlay actor, sampling loop, tray actions, and the
//! terminal host that renders them.

pub mod command;
pub mod menu;
pub mod monitor;
pub mod overlay;
pub mod placement;
pub mod surface;
pub mod term;
pub mod tray;

pub use command::{ColorPair, Command, Flow, OverlayHandle, Pending, Reply};
pub use menu::Action;
pub use monitor::{AppState, Monitor};
pub use overlay::OverlayActor;
pub use placement::Point;
pub use surface::{OverlaySurface, SurfaceError, TraySurface};
pub use tray::TrayActions;
