use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn from_lookup_defaults() {
    let cfg = SoundboardConfig::from_lookup(lookup_from(&[])).unwrap();
    assert_eq!(cfg, SoundboardConfig::default());
    assert_eq!(cfg.grid.default_cols, 10);
    assert_eq!(cfg.grid.default_rows, 3);
    assert_eq!(cfg.schema, SchemaVersion::Current);
    assert!(cfg.is_gm);
    assert!(cfg.soundpad.session.is_none());
}

#[test]
fn from_lookup_parses_overrides() {
    let cfg = SoundboardConfig::from_lookup(lookup_from(&[
        ("SOUNDBOARD_MAX_ROWS", "12"),
        ("SOUNDBOARD_MAX_COLS", "8"),
        ("SOUNDBOARD_DEFAULT_COLS", "6"),
        ("SOUNDBOARD_SCHEMA", "legacy"),
        ("SOUNDBOARD_USER", "Alice"),
        ("SOUNDBOARD_IS_GM", "false"),
        ("SOUNDBOARD_RENDER_DELAY_MS", "0"),
        ("SOUNDPAD_BASE_URL", "https://index.example.test/api/"),
        ("SOUNDPAD_SESSION", "abc"),
        ("SOUNDPAD_PREVIEW_DELAY_MS", "250"),
    ]))
    .unwrap();

    assert_eq!(cfg.grid.max_rows, 12);
    assert_eq!(cfg.grid.max_cols, 8);
    assert_eq!(cfg.grid.default_cols, 6);
    assert_eq!(cfg.schema, SchemaVersion::Legacy);
    assert_eq!(cfg.user_name, "Alice");
    assert!(!cfg.is_gm);
    assert_eq!(cfg.render_delay, Duration::ZERO);
    assert_eq!(cfg.soundpad.base_url, "https://index.example.test/api");
    assert_eq!(cfg.soundpad.session.as_deref(), Some("abc"));
    assert_eq!(cfg.soundpad.preview_delay, Duration::from_millis(250));
}

#[test]
fn defaults_are_clamped_to_max() {
    let cfg = SoundboardConfig::from_lookup(lookup_from(&[
        ("SOUNDBOARD_MAX_COLS", "4"),
        ("SOUNDBOARD_DEFAULT_COLS", "10"),
        ("SOUNDBOARD_MAX_ROWS", "0"),
    ]))
    .unwrap();
    assert_eq!(cfg.grid.default_cols, 4);
    assert_eq!(cfg.grid.max_rows, 1);
    assert_eq!(cfg.grid.default_rows, 1);
}

#[test]
fn invalid_numbers_fall_back_to_defaults() {
    let cfg = SoundboardConfig::from_lookup(lookup_from(&[("SOUNDBOARD_MAX_ROWS", "lots")])).unwrap();
    assert_eq!(cfg.grid.max_rows, DEFAULT_MAX_ROWS);
}

#[test]
fn unknown_schema_errors() {
    let err = SoundboardConfig::from_lookup(lookup_from(&[("SOUNDBOARD_SCHEMA", "v3")]))
        .unwrap_err()
        .to_string();
    assert!(err.contains("unsupported SOUNDBOARD_SCHEMA"));
}

#[test]
fn invalid_bool_errors() {
    let err = SoundboardConfig::from_lookup(lookup_from(&[("SOUNDBOARD_IS_GM", "maybe")])).unwrap_err();
    assert_eq!(err.error_code(), "E_CONFIG_PARSE");
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn clamp_dimensions() {
    let grid = GridLimits::default();
    assert_eq!(grid.clamp_rows(0), 1);
    assert_eq!(grid.clamp_rows(-5), 1);
    assert_eq!(grid.clamp_rows(31), 30);
    assert_eq!(grid.clamp_cols(7), 7);
}
