//! Tray menu model: actions, their key bindings, and the labelled tree.

use traymon_agent::{Anchor, Config};

use crate::command::ColorPair;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorPreset {
    Dark,
    Light,
    Matrix,
    Amber,
}

impl ColorPreset {
    pub const ALL: [ColorPreset; 4] = [
        ColorPreset::Dark,
        ColorPreset::Light,
        ColorPreset::Matrix,
        ColorPreset::Amber,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ColorPreset::Dark => "Dark (black / white)",
            ColorPreset::Light => "Light (white / black)",
            ColorPreset::Matrix => "Matrix (black / green)",
            ColorPreset::Amber => "Amber (black / amber)",
        }
    }

    pub fn colors(self) -> ColorPair {
        match self {
            ColorPreset::Dark => ColorPair::new("black", "white"),
            ColorPreset::Light => ColorPair::new("white", "black"),
            ColorPreset::Matrix => ColorPair::new("black", "#00FF66"),
            ColorPreset::Amber => ColorPair::new("black", "#FFB000"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CopyStats,
    OpenFolder,
    Reload,
    ToggleOverlay,
    ToggleLock,
    Preset(Anchor),
    SetCoordinates,
    Colors(ColorPreset),
    CustomColors,
    RestartBridge,
    Quit,
}

impl Action {
    pub fn key(self) -> char {
        match self {
            Action::CopyStats => 'c',
            Action::OpenFolder => 'f',
            Action::Reload => 'r',
            Action::ToggleOverlay => 'o',
            Action::ToggleLock => 'l',
            Action::Preset(Anchor::TopLeft) => '1',
            Action::Preset(Anchor::TopRight) => '2',
            Action::Preset(Anchor::BottomLeft) => '3',
            Action::Preset(Anchor::BottomRight) => '4',
            Action::Preset(Anchor::Center) => '5',
            Action::SetCoordinates => 'x',
            Action::Colors(ColorPreset::Dark) => 'd',
            Action::Colors(ColorPreset::Light) => 'w',
            Action::Colors(ColorPreset::Matrix) => 'g',
            Action::Colors(ColorPreset::Amber) => 'a',
            Action::CustomColors => 'k',
            Action::RestartBridge => 'b',
            Action::Quit => 'q',
        }
    }

    pub fn from_key(key: char) -> Option<Action> {
        all_actions().into_iter().find(|a| a.key() == key)
    }
}

fn all_actions() -> Vec<Action> {
    let mut all = vec![
        Action::CopyStats,
        Action::OpenFolder,
        Action::Reload,
        Action::ToggleOverlay,
        Action::ToggleLock,
    ];
    all.extend(Anchor::ALL.map(Action::Preset));
    all.push(Action::SetCoordinates);
    all.extend(ColorPreset::ALL.map(Action::Colors));
    all.extend([Action::CustomColors, Action::RestartBridge, Action::Quit]);
    all
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuItem {
    Entry { label: String, action: Action },
    Submenu { label: String, items: Vec<MenuItem> },
    Separator,
}

fn entry(label: impl Into<String>, action: Action) -> MenuItem {
    MenuItem::Entry {
        label: label.into(),
        action,
    }
}

fn preset_label(a: Anchor) -> &'static str {
    match a {
        Anchor::TopLeft => "Top left",
        Anchor::TopRight => "Top right",
        Anchor::BottomLeft => "Bottom left",
        Anchor::BottomRight => "Bottom right",
        Anchor::Center => "Center",
    }
}

/// Menu tree with toggle labels computed from `cfg`.
pub fn menu_tree(cfg: &Config) -> Vec<MenuItem> {
    let on_off = if cfg.overlay_enabled { "ON" } else { "OFF" };
    let lock = if cfg.overlay_locked {
        "LOCKED"
    } else {
        "UNLOCKED"
    };

    let mut colors: Vec<MenuItem> = ColorPreset::ALL
        .into_iter()
        .map(|p| entry(p.label(), Action::Colors(p)))
        .collect();
    colors.push(entry("Custom...", Action::CustomColors));

    let mut overlay = vec![
        entry(format!("Overlay: {on_off}"), Action::ToggleOverlay),
        entry(format!("Drag: {lock}"), Action::ToggleLock),
        MenuItem::Separator,
    ];
    overlay.extend(
        Anchor::ALL
            .into_iter()
            .map(|a| entry(preset_label(a), Action::Preset(a))),
    );
    overlay.push(entry("Set exact coordinates...", Action::SetCoordinates));
    overlay.push(MenuItem::Submenu {
        label: "Colors".into(),
        items: colors,
    });

    vec![
        entry("Copy stats", Action::CopyStats),
        entry("Open config folder", Action::OpenFolder),
        entry("Reload config", Action::Reload),
        MenuItem::Submenu {
            label: "Overlay".into(),
            items: overlay,
        },
        entry("Restart sensor bridge", Action::RestartBridge),
        MenuItem::Separator,
        entry("Quit", Action::Quit),
    ]
}

/// Depth-first `(depth, item)` pairs, for flat rendering.
pub fn flatten(items: &[MenuItem]) -> Vec<(usize, &MenuItem)> {
    fn walk<'a>(items: &'a [MenuItem], depth: usize, out: &mut Vec<(usize, &'a MenuItem)>) {
        for item in items {
            out.push((depth, item));
            if let MenuItem::Submenu { items, .. } = item {
                walk(items, depth + 1, out);
            }
        }
    }
    let mut out = Vec::new();
    walk(items, 0, &mut out);
    out
}
