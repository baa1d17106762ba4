use super::*;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.global_hotkey, "<CTRL><ALT>H");
    assert_eq!(config.lines_to_display, 4);
    assert_eq!(config.open_window_at, OpenWindowAt::Cursor);
    assert!(config.send_paste);
    assert_eq!(config.max_entries, DEFAULT_MAX_ENTRIES);
    assert_eq!(config.expire_days, DEFAULT_EXPIRE_DAYS);
    assert!(!config.private_mode);
    assert_eq!(config.window_size, WindowSize { width: 275, height: 230 });
    assert_eq!(config.window_position, None);
}

#[test]
fn test_partial_json_uses_defaults() {
    let json = r#"{"maxEntries": 50, "openWindowAt": "systemTray"}"#;
    let config: Config = serde_json::from_str(json).unwrap();
    assert_eq!(config.max_entries, 50);
    assert_eq!(config.open_window_at, OpenWindowAt::SystemTray);
    assert_eq!(config.global_hotkey, DEFAULT_GLOBAL_HOTKEY);
    assert_eq!(config.lines_to_display, DEFAULT_LINES_TO_DISPLAY);
}

#[test]
fn test_serialization_uses_camel_case() {
    let json = serde_json::to_string(&Config::default()).unwrap();
    assert!(json.contains("\"globalHotkey\""));
    assert!(json.contains("\"linesToDisplay\""));
    assert!(json.contains("\"openWindowAt\":\"cursor\""));
    assert!(!json.contains("windowPosition"));
}

#[test]
fn test_save_then_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

    let mut config = Config::default();
    config.set_private_mode(true);
    config.set_window_geometry(
        WindowSize { width: 400, height: 300 },
        Some(WindowPosition { x: 10, y: -20 }),
    );
    save_config(&config, &path).unwrap();

    assert_eq!(load_config(&path), config);
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    assert_eq!(load_config(&dir.path().join("absent.json")), Config::default());
}

#[test]
fn test_invalid_json_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "{ not json").unwrap();
    assert_eq!(load_config(&path), Config::default());
}

#[test]
fn test_set_exclude_normalizes_separators() {
    let mut config = Config::default();
    config.set_exclude("KeePass.exe; chromium,firefox");
    assert_eq!(config.exclude, "KeePass.exe;chromium;firefox;");

    config.set_exclude("a;");
    assert_eq!(config.exclude, "a;");

    config.set_exclude("");
    assert_eq!(config.exclude, "");
}

#[test]
fn test_excluded_apps_lowercase_and_skip_blanks() {
    let mut config = Config::default();
    config.exclude = "KeePass.exe;;Chromium;".to_string();
    assert_eq!(config.excluded_apps(), vec!["keepass.exe", "chromium"]);
    assert!(Config::default().excluded_apps().is_empty());
}
