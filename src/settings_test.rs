use serde_json::json;

use super::*;

#[test]
fn registry_defaults() {
    assert_eq!(default_value(SOUNDBOARDS), Some(json!({})));
    assert_eq!(default_value(ALLOW_PLAYERS), Some(json!(true)));
    assert_eq!(default_value(SOUNDPAD_CREATOR), Some(json!("tabletopaudio")));
    assert_eq!(default_value(SOUNDPAD_VOLUME), Some(json!(1.0)));
    assert_eq!(default_value(SOUNDPAD_HIDE_CONTROLS), Some(json!(false)));
    assert!(default_value("unknown").is_none());
}

#[tokio::test]
async fn memory_store_get_set() {
    let store = MemorySettings::new();
    assert!(store.get(SOUNDBOARDS).await.unwrap().is_none());
    store.set(SOUNDBOARDS, json!({ "boards": [] })).await.unwrap();
    assert_eq!(store.get(SOUNDBOARDS).await.unwrap(), Some(json!({ "boards": [] })));
}

#[tokio::test]
async fn read_or_default_falls_back() {
    let store = MemorySettings::with_values([(SOUNDPAD_VOLUME.to_string(), json!(0.3))]);
    assert_eq!(read_or_default(&store, SOUNDPAD_VOLUME).await.unwrap(), json!(0.3));
    assert_eq!(read_or_default(&store, ALLOW_PLAYERS).await.unwrap(), json!(true));
}

#[tokio::test]
async fn read_or_default_rejects_unregistered_keys() {
    let store = MemorySettings::with_values([("stray".to_string(), json!(1))]);
    let err = read_or_default(&store, "stray").await.unwrap_err();
    assert!(matches!(err, SettingsError::UnknownKey(ref k) if k == "stray"));
    assert_eq!(err.error_code(), "E_UNKNOWN_SETTING");
    assert!(!err.retryable());
}

#[tokio::test]
async fn json_file_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let store = JsonFileSettings::new(&path);
    assert!(store.get(SOUNDBOARDS).await.unwrap().is_none());
    store.set(SOUNDBOARDS, json!({ "current": 0 })).await.unwrap();
    store.set(SOUNDPAD_CREATOR, json!("michaelghelfi")).await.unwrap();

    let reopened = JsonFileSettings::new(&path);
    assert_eq!(reopened.get(SOUNDBOARDS).await.unwrap(), Some(json!({ "current": 0 })));
    assert_eq!(reopened.get(SOUNDPAD_CREATOR).await.unwrap(), Some(json!("michaelghelfi")));

    let body = std::fs::read_to_string(&path).unwrap();
    assert!(body.contains('\n'));
}

#[tokio::test]
async fn json_file_store_reports_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = JsonFileSettings::new(&path).get(SOUNDBOARDS).await.unwrap_err();
    assert!(matches!(err, SettingsError::Json(_)));
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(!err.retryable());
}
