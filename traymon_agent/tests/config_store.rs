//! Tests for config load/merge/save through the shared store.
use std::fs;

use serde_json::Value;
use traymon_agent::{Anchor, ConfigError, ConfigStore, Setting};

fn read(path: &std::path::Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn missing_file_keeps_defaults() {
    let td = tempfile::tempdir().unwrap();
    let (store, err) = ConfigStore::open(td.path().join("config.json"));
    assert!(err.is_none());
    assert_eq!(store.snapshot().refresh_s, 1.0);
    assert_eq!(store.snapshot().overlay_pos, Anchor::BottomRight);
}

#[test]
fn persisted_values_overlay_defaults() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("config.json");
    fs::write(
        &path,
        r#"{
            // comments are allowed
            "refresh_s": 2.5,
            "show_disk": false,   # so are hash comments
            "overlay_pos": "top_left",
            "overlay_x": 40, "overlay_y": 12,
            "net_ifaces": ["eth0", "wlan0"],
            "net_mode": "separate"
        }"#,
    )
    .unwrap();
    let (store, err) = ConfigStore::open(&path);
    assert!(err.is_none(), "{err:?}");
    let cfg = store.snapshot();
    assert_eq!(cfg.refresh_s, 2.5);
    assert!(!cfg.show_disk);
    assert!(cfg.show_cpu);
    assert_eq!(cfg.overlay_pos, Anchor::TopLeft);
    assert_eq!(cfg.pinned(), Some((40, 12)));
    assert_eq!(cfg.net_ifaces.as_deref().map(|v| v.len()), Some(2));
}

#[test]
fn malformed_file_keeps_prior_values() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("config.json");
    fs::write(&path, r#"{"refresh_s": 3.0}"#).unwrap();
    let (store, _) = ConfigStore::open(&path);
    assert_eq!(store.snapshot().refresh_s, 3.0);

    fs::write(&path, r#"{"refresh_s": 5.0, "#).unwrap();
    assert!(matches!(store.reload(), Err(ConfigError::Parse { .. })));
    assert_eq!(store.snapshot().refresh_s, 3.0);

    fs::write(&path, r#"[1, 2]"#).unwrap();
    assert!(matches!(store.reload(), Err(ConfigError::NotAnObject(_))));
    assert_eq!(store.snapshot().refresh_s, 3.0);
}

#[test]
fn unknown_template_token_rejects_the_load() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("config.json");
    fs::write(
        &path,
        r#"{"show_cpu": false, "overlay_format": "{cpu} {swap}"}"#,
    )
    .unwrap();
    let (store, err) = ConfigStore::open(&path);
    let err = err.expect("template error reported");
    assert!(matches!(err, ConfigError::Template(_)));
    assert!(err.summary().contains("{swap}"));
    // nothing from the rejected file was applied
    assert!(store.snapshot().show_cpu);
}

#[test]
fn updates_merge_and_preserve_unknown_keys() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("config.json");
    fs::write(&path, r#"{"custom_note": "keep me", "refresh_s": 2.0}"#).unwrap();
    let (store, _) = ConfigStore::open(&path);

    store
        .update([
            Setting::OverlayPos(Anchor::Center),
            Setting::OverlayX(None),
            Setting::OverlayY(None),
        ])
        .unwrap();
    store.update([Setting::OverlayLocked(false)]).unwrap();

    let on_disk = read(&path);
    assert_eq!(on_disk["custom_note"], "keep me");
    assert_eq!(on_disk["refresh_s"], 2.0);
    assert_eq!(on_disk["overlay_pos"], "center");
    assert_eq!(on_disk["overlay_x"], Value::Null);
    assert_eq!(on_disk["overlay_locked"], false);

    let cfg = store.snapshot();
    assert_eq!(cfg.overlay_pos, Anchor::Center);
    assert!(!cfg.overlay_locked);
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn snapshots_are_immutable_after_update() {
    let td = tempfile::tempdir().unwrap();
    let (store, _) = ConfigStore::open(td.path().join("nested").join("config.json"));
    let before = store.snapshot();
    store.update([Setting::OverlayEnabled(true)]).unwrap();
    assert!(!before.overlay_enabled);
    assert!(store.snapshot().overlay_enabled);
    assert!(td.path().join("nested").join("config.json").is_file());
}

#[test]
fn update_then_reload_round_trips() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("config.json");
    let (store, _) = ConfigStore::open(&path);
    store
        .update([
            Setting::OverlayBg("#000000".into()),
            Setting::OverlayFg("#FFB000".into()),
            Setting::OverlayX(Some(7)),
            Setting::OverlayY(Some(9)),
        ])
        .unwrap();
    let (fresh, err) = ConfigStore::open(&path);
    assert!(err.is_none());
    let cfg = fresh.snapshot();
    assert_eq!(cfg.overlay_fg, "#FFB000");
    assert_eq!(cfg.pinned(), Some((7, 9)));
}
