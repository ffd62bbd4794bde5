use serde_json::{Value, json};

use super::*;
use crate::settings::{ALLOW_PLAYERS, SOUNDBOARDS};
use crate::state::test_helpers::{test_config, test_context, test_context_and_playback, test_context_with};

fn key(row: usize, col: usize) -> SlotKey {
    SlotKey::new(row, col)
}

/// One board, 4x2, with a door at 0#0 and rain at 0#1.
fn seeded() -> Vec<(&'static str, Value)> {
    vec![(
        SOUNDBOARDS,
        json!({
            "boards": [{
                "name": "Tavern",
                "cols": 4,
                "rows": 2,
                "audio-0#0": { "path": "sfx/door%20slam.ogg", "name": "Door" },
                "audio-0#1": { "path": ["amb/rain.ogg"], "repeat": true }
            }],
            "current": 0
        }),
    )]
}

fn board_with(ctx: &AppContext) -> Soundboard {
    Soundboard::new(ctx.clone())
}

async fn stored(ctx: &AppContext) -> BoardCollection {
    let raw = ctx.settings.get(SOUNDBOARDS).await.unwrap().unwrap();
    migrate_if_legacy(raw).unwrap().0
}

fn expect_view(outcome: Outcome) -> SoundboardView {
    match outcome {
        Outcome::Render(view) => view,
        other => panic!("expected render, got {other:?}"),
    }
}

// =============================================================================
// RENDER / AUTHORIZATION
// =============================================================================

#[tokio::test]
async fn render_on_empty_settings_migrates_and_persists() {
    let ctx = test_context();
    let sb = board_with(&ctx);

    let view = expect_view(sb.dispatch(Command::Render).await.unwrap());
    assert_eq!(view.user, "Gamemaster");
    assert_eq!(view.board_idx, 0);
    assert_eq!(view.board_name, "Default");
    assert_eq!(view.grid.row_count, 3);
    assert_eq!(view.grid.col_count, 10);

    let collection = stored(&ctx).await;
    assert_eq!(collection.boards.len(), 1);
    assert_eq!(collection.current, 0);
}

#[tokio::test]
async fn render_lists_boards_and_layout() {
    let ctx = test_context_with(test_config(), seeded());
    let view = expect_view(board_with(&ctx).dispatch(Command::Render).await.unwrap());

    assert_eq!(view.board_name, "Tavern");
    assert_eq!(view.grid.col_count, 4);
    let door = view.grid.cell(key(0, 0)).unwrap();
    assert_eq!(door.slot.as_ref().unwrap().name, "Door");
    let unnamed = view.grid.cell(key(0, 1)).unwrap();
    assert_eq!(unnamed.slot.as_ref().unwrap().name, "2");
}

#[tokio::test]
async fn players_are_rejected_when_not_allowed() {
    let mut config = test_config();
    config.is_gm = false;
    let ctx = test_context_with(config, vec![(ALLOW_PLAYERS, json!(false))]);
    let sb = board_with(&ctx);

    let err = sb.dispatch(Command::Render).await.unwrap_err();
    assert!(matches!(err, SoundboardError::Unauthorized));
    assert_eq!(err.kind(), ErrorKind::Authorization);

    match sb.handle(Command::Render).await {
        Outcome::Notify(notice) => {
            assert_eq!(notice.level, NoticeLevel::Error);
            assert_eq!(notice.code, "E_UNAUTHORIZED");
        }
        other => panic!("expected notice, got {other:?}"),
    }
}

#[tokio::test]
async fn players_are_allowed_by_default() {
    let mut config = test_config();
    config.is_gm = false;
    let ctx = test_context_with(config, Vec::new());
    assert!(board_with(&ctx).dispatch(Command::Render).await.is_ok());
}

// =============================================================================
// BOARDS
// =============================================================================

#[tokio::test]
async fn board_lifecycle() {
    let ctx = test_context_with(test_config(), seeded());
    let sb = board_with(&ctx);

    let view = expect_view(sb.dispatch(Command::BoardCreated { name: "Dungeon".into() }).await.unwrap());
    assert_eq!(view.board_idx, 1);
    assert_eq!(view.board_name, "Dungeon");
    let names: Vec<_> = view.boards.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["Dungeon", "Tavern"]);

    let view = expect_view(sb.dispatch(Command::BoardSelected { idx: 0 }).await.unwrap());
    assert_eq!(view.board_name, "Tavern");

    let view = expect_view(
        sb.dispatch(Command::BoardRenamed { idx: Some(1), name: "Crypt".into() })
            .await
            .unwrap(),
    );
    assert!(view.boards.iter().any(|b| b.name == "Crypt" && b.idx == 1));

    let view = expect_view(sb.dispatch(Command::BoardDeleted { idx: None }).await.unwrap());
    assert_eq!(view.board_name, "Crypt");
    assert_eq!(view.board_idx, 0);
    assert_eq!(stored(&ctx).await.boards.len(), 1);
}

#[tokio::test]
async fn short_board_name_is_a_warning() {
    let ctx = test_context_with(test_config(), seeded());
    let sb = board_with(&ctx);

    match sb.handle(Command::BoardCreated { name: "ab".into() }).await {
        Outcome::Notify(notice) => assert_eq!(notice.level, NoticeLevel::Warn),
        other => panic!("expected notice, got {other:?}"),
    }
    assert_eq!(stored(&ctx).await.boards.len(), 1);
}

#[tokio::test]
async fn select_out_of_range_is_rejected() {
    let ctx = test_context_with(test_config(), seeded());
    let err = board_with(&ctx).dispatch(Command::BoardSelected { idx: 5 }).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IndexOutOfRange);
}

#[tokio::test]
async fn resize_clamps_and_keeps_slots() {
    let ctx = test_context_with(test_config(), seeded());
    let sb = board_with(&ctx);

    let view = expect_view(sb.dispatch(Command::GridResized { rows: 0, cols: 99 }).await.unwrap());
    assert_eq!(view.grid.row_count, 1);
    assert_eq!(view.grid.col_count, 30);

    let view = expect_view(sb.dispatch(Command::GridResized { rows: 1, cols: 1 }).await.unwrap());
    assert_eq!(view.grid.col_count, 1);
    assert_eq!(stored(&ctx).await.boards[0].slots.len(), 2);
}

#[tokio::test]
async fn hide_unused_toggles() {
    let ctx = test_context_with(test_config(), seeded());
    let sb = board_with(&ctx);

    let view = expect_view(sb.dispatch(Command::HideUnusedToggled).await.unwrap());
    assert!(view.grid.hide_unused);
    assert_eq!(view.grid.visible_cells().count(), 2);

    let view = expect_view(sb.dispatch(Command::HideUnusedToggled).await.unwrap());
    assert!(!view.grid.hide_unused);
}

// =============================================================================
// SLOTS
// =============================================================================

#[tokio::test]
async fn clicking_an_empty_slot_warns() {
    let ctx = test_context_with(test_config(), seeded());
    match board_with(&ctx).handle(Command::SlotClicked { key: key(1, 3) }).await {
        Outcome::Notify(notice) => {
            assert_eq!(notice.level, NoticeLevel::Warn);
            assert_eq!(notice.code, "E_SLOT_NOT_ASSIGNED");
        }
        other => panic!("expected notice, got {other:?}"),
    }
}

#[tokio::test]
async fn clicking_toggles_in_the_user_playlist() {
    let (ctx, playback) = test_context_and_playback(test_config(), seeded());
    let sb = board_with(&ctx);

    let first = sb.dispatch(Command::SlotClicked { key: key(0, 1) }).await.unwrap();
    assert_eq!(first, Outcome::Played { path: "amb/rain.ogg".into(), playing: true });
    let second = sb.dispatch(Command::SlotClicked { key: key(0, 1) }).await.unwrap();
    assert_eq!(second, Outcome::Played { path: "amb/rain.ogg".into(), playing: false });

    let lists = playback.playlists().await;
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].name, "Soundboard: Gamemaster");
    assert!(lists[0].sounds[0].options.repeat);
}

#[tokio::test]
async fn edit_opens_with_reading_index() {
    let ctx = test_context_with(test_config(), seeded());
    let sb = board_with(&ctx);

    match sb.dispatch(Command::EditSlot { key: key(1, 2) }).await.unwrap() {
        Outcome::OpenEditor(editor) => {
            assert_eq!(editor.idx, 7);
            assert!(!editor.exists);
        }
        other => panic!("expected editor, got {other:?}"),
    }
    match sb.dispatch(Command::EditSlot { key: key(0, 0) }).await.unwrap() {
        Outcome::OpenEditor(editor) => {
            assert!(editor.exists);
            assert_eq!(editor.staged().name.as_deref(), Some("Door"));
        }
        other => panic!("expected editor, got {other:?}"),
    }
}

#[tokio::test]
async fn save_and_delete_slot() {
    let ctx = test_context_with(test_config(), seeded());
    let sb = board_with(&ctx);

    let slot = Slot { name: Some("Owl".into()), ..Slot::with_path("nature/owl.ogg") };
    sb.dispatch(Command::SlotSaved { key: key(1, 0), slot }).await.unwrap();
    let saved = stored(&ctx).await;
    assert_eq!(saved.boards[0].slot(key(1, 0)).unwrap().name.as_deref(), Some("Owl"));

    sb.dispatch(Command::SlotDeleted { key: key(1, 0) }).await.unwrap();
    assert!(stored(&ctx).await.boards[0].slot(key(1, 0)).is_none());
}

#[tokio::test]
async fn saving_without_audio_is_rejected() {
    let ctx = test_context_with(test_config(), seeded());
    let err = board_with(&ctx)
        .dispatch(Command::SlotSaved { key: key(1, 0), slot: Slot::default() })
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "E_NO_AUDIO");
    assert!(stored(&ctx).await.boards[0].slot(key(1, 0)).is_none());
}

// =============================================================================
// DRAG AND DROP
// =============================================================================

#[tokio::test]
async fn drop_on_empty_moves() {
    let ctx = test_context_with(test_config(), seeded());
    let sb = board_with(&ctx);

    let cmd = Command::SlotDropped { from: key(0, 0), to: key(1, 1), resolution: None, duplicate: false };
    assert!(matches!(sb.dispatch(cmd).await.unwrap(), Outcome::Render(_)));

    let collection = stored(&ctx).await;
    let board = &collection.boards[0];
    assert!(board.slot(key(0, 0)).is_none());
    assert_eq!(board.slot(key(1, 1)).unwrap().name.as_deref(), Some("Door"));
}

#[tokio::test]
async fn duplicate_drop_keeps_source() {
    let ctx = test_context_with(test_config(), seeded());
    let sb = board_with(&ctx);

    let cmd = Command::SlotDropped { from: key(0, 0), to: key(1, 1), resolution: None, duplicate: true };
    sb.dispatch(cmd).await.unwrap();

    let collection = stored(&ctx).await;
    let board = &collection.boards[0];
    assert_eq!(board.slot(key(0, 0)), board.slot(key(1, 1)));
}

#[tokio::test]
async fn drop_on_assigned_asks_then_resolves() {
    let ctx = test_context_with(test_config(), seeded());
    let sb = board_with(&ctx);

    let ask = Command::SlotDropped { from: key(0, 0), to: key(0, 1), resolution: None, duplicate: false };
    assert_eq!(sb.dispatch(ask).await.unwrap(), Outcome::ConfirmDrop { from: key(0, 0), to: key(0, 1) });
    assert_eq!(stored(&ctx).await.boards[0].slots.len(), 2);

    let swap = Command::SlotDropped {
        from: key(0, 0),
        to: key(0, 1),
        resolution: Some(DropResolution::Swap),
        duplicate: false,
    };
    sb.dispatch(swap).await.unwrap();
    let collection = stored(&ctx).await;
    let board = &collection.boards[0];
    assert_eq!(board.slot(key(0, 1)).unwrap().name.as_deref(), Some("Door"));
    assert_eq!(board.slot(key(0, 0)).unwrap().path, vec!["amb/rain.ogg"]);

    let overwrite = Command::SlotDropped {
        from: key(0, 0),
        to: key(0, 1),
        resolution: Some(DropResolution::Overwrite),
        duplicate: false,
    };
    sb.dispatch(overwrite).await.unwrap();
    let collection = stored(&ctx).await;
    let board = &collection.boards[0];
    assert_eq!(board.slots.len(), 1);
    assert_eq!(board.slot(key(0, 1)).unwrap().path, vec!["amb/rain.ogg"]);
}

#[tokio::test]
async fn dragging_an_empty_slot_is_rejected() {
    let ctx = test_context_with(test_config(), seeded());
    let cmd = Command::SlotDropped { from: key(1, 0), to: key(1, 1), resolution: None, duplicate: false };
    let err = board_with(&ctx).dispatch(cmd).await.unwrap_err();
    assert!(matches!(err, SoundboardError::SlotNotAssigned(k) if k == key(1, 0)));
}

#[tokio::test]
async fn asset_drop_only_fills_empty_slots() {
    let ctx = test_context_with(test_config(), seeded());
    let sb = board_with(&ctx);
    let asset = DroppedAsset { name: Some("Bell".into()), path: "sfx/bell.ogg".into(), volume: 0.4, repeat: false };

    sb.dispatch(Command::AssetDropped { to: key(1, 0), asset: asset.clone() }).await.unwrap();
    let slot = stored(&ctx).await.boards[0].slot(key(1, 0)).cloned().unwrap();
    assert_eq!(slot.name.as_deref(), Some("Bell"));
    assert!((slot.volume - 0.4).abs() < f64::EPSILON);

    let err = sb.dispatch(Command::AssetDropped { to: key(0, 0), asset }).await.unwrap_err();
    assert!(matches!(err, SoundboardError::SlotExists(_)));
}

// =============================================================================
// IMPORT / EXPORT
// =============================================================================

#[tokio::test]
async fn board_export_round_trips() {
    let ctx = test_context_with(test_config(), seeded());
    let sb = board_with(&ctx);

    let Outcome::Exported(file) = sb.dispatch(Command::Export { scope: ExportScope::Board }).await.unwrap() else {
        panic!("expected export");
    };
    assert_eq!(file.filename, "soundboard-tavern.json");
    let doc: Value = serde_json::from_str(&file.json).unwrap();
    assert_eq!(doc[SCHEMA_VERSION_KEY], json!(EXPORT_SCHEMA_VERSION));

    sb.dispatch(Command::BoardCreated { name: "Empty".into() }).await.unwrap();
    sb.dispatch(Command::Import { json: file.json }).await.unwrap();

    let collection = stored(&ctx).await;
    assert_eq!(collection.boards.len(), 2);
    assert_eq!(collection.boards[1].display_name(), "Tavern");
    assert_eq!(collection.boards[1].slots, collection.boards[0].slots);
}

#[tokio::test]
async fn collection_export_round_trips() {
    let ctx = test_context_with(test_config(), seeded());
    let sb = board_with(&ctx);
    sb.dispatch(Command::BoardCreated { name: "Dungeon".into() }).await.unwrap();
    let before = stored(&ctx).await;

    let file = export_document(&before, ExportScope::Collection).unwrap();
    assert_eq!(file.filename, "soundboard-collection.json");

    let imported = import_document(&file.json, BoardCollection::default(), &ctx.config.grid).unwrap();
    assert_eq!(imported, before);
}

#[test]
fn legacy_fav_export_maps_onto_columns() {
    let limits = test_config().grid;
    let json = r#"{ "fav0": { "path": "a.ogg" }, "fav12": { "path": "b.ogg", "name": "B" } }"#;

    let imported = import_document(json, BoardCollection::default(), &limits).unwrap();
    let board = imported.current_board(None).unwrap();
    assert_eq!(board.slots.len(), 2);
    assert_eq!(board.slot(key(0, 0)).unwrap().path, vec!["a.ogg"]);
    assert_eq!(board.slot(key(1, 2)).unwrap().name.as_deref(), Some("B"));
}

#[test]
fn fav_lookalike_keys_are_rejected() {
    let limits = test_config().grid;
    let mut collection = BoardCollection::default();
    collection.boards[0].slots.insert(key(0, 0), Slot::with_path("keep.ogg"));

    for json in [r#"{ "favorites": { "path": "a.ogg" } }"#, r#"{ "fav1": { "path": "a.ogg" }, "favx": {} }"#] {
        let err = import_document(json, collection.clone(), &limits).unwrap_err();
        assert!(matches!(err, SoundboardError::InvalidImport(_)), "{json}: {err}");
    }
}

#[tokio::test]
async fn oversized_import_is_clamped_before_render() {
    let ctx = test_context_with(test_config(), seeded());
    let sb = board_with(&ctx);

    let json = r#"{ "name": "Huge", "cols": 100, "rows": 2 }"#.to_string();
    let view = expect_view(sb.dispatch(Command::Import { json }).await.unwrap());
    assert_eq!(view.grid.col_count, 30);
    assert_eq!(view.grid.row_count, 2);
    assert_eq!(stored(&ctx).await.boards[0].cols, Some(30));

    let json = r#"{ "boards": [{ "cols": 18446744073709551615 }], "current": 0 }"#.to_string();
    let view = expect_view(sb.dispatch(Command::Import { json }).await.unwrap());
    assert_eq!(view.grid.col_count, 30);
}

#[tokio::test]
async fn stored_oversized_grid_is_repaired_on_load() {
    let seed = vec![(SOUNDBOARDS, json!({ "boards": [{ "name": "Wide", "cols": 500, "rows": 999 }], "current": 0 }))];
    let ctx = test_context_with(test_config(), seed);

    let view = expect_view(board_with(&ctx).dispatch(Command::Render).await.unwrap());
    assert_eq!((view.grid.row_count, view.grid.col_count), (30, 30));

    let raw = ctx.settings.get(SOUNDBOARDS).await.unwrap().unwrap();
    assert_eq!(raw["boards"][0]["cols"], json!(30));
    assert_eq!(raw["boards"][0]["rows"], json!(30));
}

#[test]
fn single_board_import_replaces_current() {
    let limits = test_config().grid;
    let json = r#"{ "name": "Ship", "cols": 2, "audio-0#1": { "path": "sea.ogg" } }"#;

    let imported = import_document(json, BoardCollection::default(), &limits).unwrap();
    assert_eq!(imported.boards.len(), 1);
    assert_eq!(imported.boards[0].display_name(), "Ship");
    assert!(imported.boards[0].is_assigned(key(0, 1)));
}

#[test]
fn import_rejects_bad_documents() {
    let limits = test_config().grid;
    for json in ["not json", "[1, 2]", r#"{ "schemaVersion": 3, "boards": [] }"#, r#"{ "schemaVersion": "two" }"#] {
        let err = import_document(json, BoardCollection::default(), &limits).unwrap_err();
        assert!(matches!(err, SoundboardError::InvalidImport(_)), "{json}: {err}");
    }
}

#[test]
fn slugify_names() {
    assert_eq!(slugify("Tavern Night!"), "tavern-night");
    assert_eq!(slugify("  --  "), "board");
}

// =============================================================================
// PLAYBACK EVENTS
// =============================================================================

#[tokio::test]
async fn playback_events_rerender_tracked_paths_only() {
    let ctx = test_context_with(test_config(), seeded());
    let sb = board_with(&ctx);

    let untracked = PlaybackEvent { path: "music/elsewhere.ogg".into(), playing: true };
    assert!(sb.handle_playback_event(&untracked).await.is_none());

    let door = PlaybackEvent { path: "sfx/door slam.ogg".into(), playing: true };
    let view = expect_view(sb.handle_playback_event(&door).await.unwrap());
    assert!(view.grid.cell(key(0, 0)).unwrap().slot.as_ref().unwrap().playing);
    assert!(!view.grid.cell(key(0, 1)).unwrap().slot.as_ref().unwrap().playing);
}

#[tokio::test]
async fn clicks_reach_subscribers() {
    let ctx = test_context_with(test_config(), seeded());
    let sb = board_with(&ctx);
    let mut events = sb.subscribe();

    sb.dispatch(Command::SlotClicked { key: key(0, 0) }).await.unwrap();
    let event = events.recv().await.unwrap();
    assert_eq!(event, PlaybackEvent { path: "sfx/door%20slam.ogg".into(), playing: true });

    let view = expect_view(sb.handle_playback_event(&event).await.unwrap());
    assert!(view.grid.cell(key(0, 0)).unwrap().slot.as_ref().unwrap().playing);
}
