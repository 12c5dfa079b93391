//! Where the overlay goes: pinned coordinates win, otherwise a named anchor
//! inside the work area, inset by the padding.

use std::ops::Sub;

use traymon_agent::Anchor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x.saturating_sub(rhs.x), self.y.saturating_sub(rhs.y))
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Point::new(x, y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

/// Usable screen region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Area {
    pub origin: Point,
    pub size: Size,
}

impl Area {
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.origin.x
            && p.y >= self.origin.y
            && p.x < self.origin.x.saturating_add(self.size.width)
            && p.y < self.origin.y.saturating_add(self.size.height)
    }
}

pub fn resolve(
    anchor: Anchor,
    pinned: Option<Point>,
    widget: Size,
    area: Area,
    padding: i32,
) -> Point {
    if let Some(p) = pinned {
        return p;
    }
    let Area { origin, size } = area;
    // saturating throughout: padding comes straight from the config file
    let slack_x = size.width.saturating_sub(widget.width);
    let slack_y = size.height.saturating_sub(widget.height);
    let left = origin.x.saturating_add(padding);
    let top = origin.y.saturating_add(padding);
    let right = origin.x.saturating_add(slack_x).saturating_sub(padding);
    let bottom = origin.y.saturating_add(slack_y).saturating_sub(padding);
    match anchor {
        Anchor::TopLeft => Point::new(left, top),
        Anchor::TopRight => Point::new(right, top),
        Anchor::BottomLeft => Point::new(left, bottom),
        Anchor::BottomRight => Point::new(right, bottom),
        Anchor::Center => Point::new(
            origin.x.saturating_add(slack_x / 2).max(left),
            origin.y.saturating_add(slack_y / 2).max(top),
        ),
    }
}
