//! Drives the command handlers end-to-end against a temporary state root:
//! the envelope data shapes, the stable error codes, and the engine
//! behaviors behind them.

use chronicle_cli::commands::{campaign, item, ooc, quest, state, turn, validate};
use chronicle_cli::Ctx;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::tempdir;

fn ctx(root: &Path, campaign: &str) -> Ctx {
    Ctx::new(root.to_path_buf(), Some(campaign.to_string()), None, false)
}

fn ctx_payload(root: &Path, campaign: &str, payload: Value) -> Ctx {
    Ctx::new(root.to_path_buf(), Some(campaign.to_string()), Some(payload), false)
}

fn seed_payload() -> Value {
    json!({
        "locations": [
            {"id": "loc_start", "name": "Larkspur", "region": "Greenmarch"},
            {"id": "loc_keep", "name": "Old Keep", "region": "Greenmarch"},
        ],
        "player_characters": [
            {"id": "pc_hero", "name": "Arin Vale", "class": "Rogue", "level": 3,
             "max_hp": 24, "current_hp": 24, "ac": 15, "location_id": "loc_start"},
        ],
        "npcs": [
            {"id": "npc_mayor", "name": "Mayor Elira Thorn", "location_id": "loc_start",
             "max_hp": 11, "current_hp": 11, "ac": 12},
            {"id": "npc_sergeant", "name": "Sergeant Bram", "location_id": "loc_start",
             "max_hp": 12, "current_hp": 12, "ac": 13},
            {"id": "npc_scholar", "name": "Scholar Nyx", "location_id": "loc_start",
             "max_hp": 9, "current_hp": 9, "ac": 11},
        ],
        "world_state": {
            "world_date": "1 Ches 1492 DR",
            "world_time": "08:00",
            "weather": "mist",
            "region": "Greenmarch",
            "location_id": "loc_start",
        },
    })
}

fn seeded(root: &Path, campaign_id: &str) {
    campaign::create(&ctx(root, campaign_id), Some("QA Campaign")).unwrap();
    turn::begin(&ctx(root, campaign_id)).unwrap();
    campaign::seed(&ctx_payload(root, campaign_id, seed_payload())).unwrap();
    turn::commit(&ctx(root, campaign_id), "Session zero seed").unwrap();
}

#[test]
fn create_seed_commit_and_load() {
    let root = tempdir().unwrap();
    seeded(root.path(), "camp_a");

    let loaded = campaign::load(&ctx(root.path(), "camp_a")).unwrap();
    assert_eq!(loaded["counts"]["pc_count"], 1);
    assert_eq!(loaded["counts"]["npc_count"], 3);
    assert_eq!(loaded["latest_turn"]["turn_number"], 1);
    assert_eq!(loaded["latest_turn"]["status"], "committed");
}

#[test]
fn seed_requires_three_npcs() {
    let root = tempdir().unwrap();
    campaign::create(&ctx(root.path(), "camp_small"), None).unwrap();
    turn::begin(&ctx(root.path(), "camp_small")).unwrap();

    let err = campaign::seed(&ctx_payload(
        root.path(),
        "camp_small",
        json!({
            "player_characters": [{"id": "pc_x", "name": "Solo", "max_hp": 10, "current_hp": 10}],
            "npcs": [{"name": "Only One"}],
        }),
    ))
    .unwrap_err();
    assert_eq!(err.code, "seed_requires_three_npcs");
}

#[test]
fn lifecycle_error_codes_are_stable() {
    let root = tempdir().unwrap();
    seeded(root.path(), "camp_a");

    let err = turn::commit(&ctx(root.path(), "camp_a"), "nothing open").unwrap_err();
    assert_eq!(err.code, "no_open_turn");

    turn::begin(&ctx(root.path(), "camp_a")).unwrap();
    let err = turn::begin(&ctx(root.path(), "camp_a")).unwrap_err();
    assert_eq!(err.code, "turn_already_open");
    turn::rollback(&ctx(root.path(), "camp_a"), Some("cleanup")).unwrap();
}

#[test]
fn grant_then_rollback_leaves_no_trace() {
    let root = tempdir().unwrap();
    seeded(root.path(), "camp_a");

    turn::begin(&ctx(root.path(), "camp_a")).unwrap();
    item::grant(&ctx_payload(
        root.path(),
        "camp_a",
        json!({
            "owner_type": "pc",
            "owner_id": "pc_hero",
            "item_name": "RollbackTestItem",
            "quantity": 2,
        }),
    ))
    .unwrap();
    turn::rollback(
        &ctx_payload(root.path(), "camp_a", json!({"reason": "Rollback test"})),
        None,
    )
    .unwrap();

    let data = state::get(&ctx(root.path(), "camp_a")).unwrap();
    let items = data["inventory"].as_array().unwrap();
    assert!(items.iter().all(|i| i["item_name"] != "RollbackTestItem"));
}

#[test]
fn world_time_commit_produces_time_only_diff() {
    let root = tempdir().unwrap();
    seeded(root.path(), "camp_a");

    turn::begin(&ctx(root.path(), "camp_a")).unwrap();
    state::set(&ctx_payload(
        root.path(),
        "camp_a",
        json!({"world_state": {"world_time": "12:00"}}),
    ))
    .unwrap();
    let committed = turn::commit(&ctx(root.path(), "camp_a"), "Noon").unwrap();
    assert!(committed["diff_summary"].as_str().unwrap().contains("time_advanced"));
    assert!(committed["snapshot_ref"].as_str().unwrap().starts_with("snapshot://"));

    let diff = turn::diff(&ctx(root.path(), "camp_a"), None).unwrap();
    let payload = &diff["diff"];
    assert_eq!(payload["time_advanced"].as_array().unwrap().len(), 1);
    for key in [
        "location_change",
        "hp_resources_changed",
        "inventory_currency_changed",
        "relationship_reputation_changed",
        "quest_rumor_clock_updates",
    ] {
        assert!(payload[key].as_array().unwrap().is_empty(), "{key} should be empty");
    }
}

#[test]
fn commit_full_mode_includes_diff_and_snapshot() {
    let root = tempdir().unwrap();
    seeded(root.path(), "camp_a");

    turn::begin(&ctx(root.path(), "camp_a")).unwrap();
    let mut full_ctx = ctx(root.path(), "camp_a");
    full_ctx.full = true;
    let committed = turn::commit(&full_ctx, "Verbose commit").unwrap();
    assert!(committed.get("turn_diff").is_some());
    assert!(committed.get("snapshot").is_some());
    assert_eq!(committed["snapshot"]["world_state"]["world_time"], "08:00");
}

#[test]
fn consume_beyond_stock_is_rejected_cleanly() {
    let root = tempdir().unwrap();
    seeded(root.path(), "camp_a");

    turn::begin(&ctx(root.path(), "camp_a")).unwrap();
    item::grant(&ctx_payload(
        root.path(),
        "camp_a",
        json!({"owner_type": "pc", "owner_id": "pc_hero", "item_name": "Potion", "quantity": 1}),
    ))
    .unwrap();

    let err = item::consume(&ctx_payload(
        root.path(),
        "camp_a",
        json!({"owner_type": "pc", "owner_id": "pc_hero", "item_name": "Potion", "quantity": 5}),
    ))
    .unwrap_err();
    assert_eq!(err.code, "insufficient_inventory");
    assert_eq!(err.details["available"], 1);
    turn::rollback(&ctx(root.path(), "camp_a"), Some("test cleanup")).unwrap();
}

#[test]
fn quest_status_normalization_and_objective_conflicts() {
    let root = tempdir().unwrap();
    seeded(root.path(), "camp_a");
    turn::begin(&ctx(root.path(), "camp_a")).unwrap();

    quest::add(&ctx_payload(
        root.path(),
        "camp_a",
        json!({
            "id": "quest_alpha",
            "title": "Alpha Quest",
            "objectives": [{"id": "obj_shared", "description": "Alpha objective"}],
        }),
    ))
    .unwrap();
    quest::add(&ctx_payload(
        root.path(),
        "camp_a",
        json!({"id": "quest_beta", "title": "Beta Quest"}),
    ))
    .unwrap();

    let updated = quest::update(&ctx_payload(
        root.path(),
        "camp_a",
        json!({
            "quest_id": "quest_alpha",
            "status": "complete",
            "objective_updates": [{"id": "obj_shared", "status": "completed"}],
        }),
    ))
    .unwrap();
    assert_eq!(updated["quest"]["status"], "completed");
    assert_eq!(updated["quest"]["objectives"]["obj_shared"]["status"], "complete");

    let conflict = quest::update(&ctx_payload(
        root.path(),
        "camp_a",
        json!({
            "quest_id": "quest_beta",
            "objective_updates": [{"id": "obj_shared", "description": "stolen"}],
        }),
    ))
    .unwrap_err();
    assert_eq!(conflict.code, "objective_id_conflict");
    assert_eq!(conflict.details["objective_id"], "obj_shared");
    assert_eq!(conflict.details["quest_id"], "quest_beta");
    assert_eq!(conflict.details["existing_quest_id"], "quest_alpha");

    let bad_status = quest::update(&ctx_payload(
        root.path(),
        "camp_a",
        json!({
            "quest_id": "quest_alpha",
            "objective_updates": [{"id": "obj_bad", "status": "nonsense"}],
        }),
    ))
    .unwrap_err();
    assert_eq!(bad_status.code, "invalid_objective_status");

    turn::rollback(&ctx(root.path(), "camp_a"), Some("quest test cleanup")).unwrap();
}

#[test]
fn invalid_world_state_payload_is_rejected() {
    let root = tempdir().unwrap();
    seeded(root.path(), "camp_a");
    turn::begin(&ctx(root.path(), "camp_a")).unwrap();

    let err = state::set(&ctx_payload(
        root.path(),
        "camp_a",
        json!({"world_state": "not-an-object"}),
    ))
    .unwrap_err();
    assert_eq!(err.code, "invalid_world_state_payload");
    assert!(err.details["message"].as_str().is_some());
    turn::rollback(&ctx(root.path(), "camp_a"), Some("cleanup")).unwrap();
}

#[test]
fn undo_reports_rolled_back_status_and_mode() {
    let root = tempdir().unwrap();
    seeded(root.path(), "camp_a");

    // Open-turn undo.
    turn::begin(&ctx(root.path(), "camp_a")).unwrap();
    item::grant(&ctx_payload(
        root.path(),
        "camp_a",
        json!({"owner_type": "pc", "owner_id": "pc_hero", "item_name": "UndoMarker", "quantity": 1}),
    ))
    .unwrap();
    let undo = ooc::undo_last_turn(&ctx(root.path(), "camp_a"), None).unwrap();
    assert_eq!(undo["turn"]["status"], "rolled_back");
    assert_eq!(undo["turn"]["mode"], "open");

    // Committed-turn undo with a custom reason.
    turn::begin(&ctx(root.path(), "camp_a")).unwrap();
    item::grant(&ctx_payload(
        root.path(),
        "camp_a",
        json!({"owner_type": "pc", "owner_id": "pc_hero", "item_name": "CommittedUndo", "quantity": 1}),
    ))
    .unwrap();
    turn::commit(&ctx(root.path(), "camp_a"), "Add marker").unwrap();

    let undo = ooc::undo_last_turn(&ctx(root.path(), "camp_a"), Some("manual custom undo reason"))
        .unwrap();
    assert_eq!(undo["turn"]["status"], "rolled_back");
    assert_eq!(undo["turn"]["mode"], "committed");
    assert_eq!(undo["turn"]["reason"], "manual custom undo reason");

    let data = state::get(&ctx(root.path(), "camp_a")).unwrap();
    let items = data["inventory"].as_array().unwrap();
    assert!(items.iter().all(|i| i["item_name"] != "CommittedUndo"));

    assert!(validate::run(&ctx(root.path(), "camp_a")).is_ok());
}

#[test]
fn forged_log_line_fails_validate_until_repaired() {
    let root = tempdir().unwrap();
    seeded(root.path(), "camp_a");

    let log_path = root.path().join("campaigns/camp_a/events.ndjson");
    let forged = json!({
        "id": "evt_forged_cafebabe",
        "campaign_id": "camp_a",
        "turn_id": 9999,
        "turn_number": 9999,
        "command": "fake",
        "payload": {},
        "timestamp": "2000-01-01T00:00:00+00:00",
    });
    let mut contents = std::fs::read_to_string(&log_path).unwrap();
    contents.push_str(&format!("{forged}\n"));
    std::fs::write(&log_path, contents).unwrap();

    let err = validate::run(&ctx(root.path(), "camp_a")).unwrap_err();
    assert_eq!(err.code, "validation_failed");
    let parity = &err.details["results"][0]["event_log_parity"];
    assert_eq!(
        parity["file_count"].as_u64().unwrap(),
        parity["db_count"].as_u64().unwrap() + 1
    );
    assert_eq!(parity["only_in_file_sample"][0], "evt_forged_cafebabe");

    let dry = campaign::repair(&ctx(root.path(), "camp_a"), true).unwrap();
    assert_eq!(dry["mismatch"], true);
    assert_eq!(dry["repaired"], false);

    let applied = campaign::repair(&ctx(root.path(), "camp_a"), false).unwrap();
    assert_eq!(applied["repaired"], true);
    let backup = applied["backup"].as_str().unwrap();
    assert!(Path::new(backup).exists());

    let passed = validate::run(&ctx(root.path(), "camp_a")).unwrap();
    assert_eq!(passed["validated_campaigns"], 1);
}

#[test]
fn validate_sweeps_every_campaign_under_the_root() {
    let root = tempdir().unwrap();
    seeded(root.path(), "camp_a");
    seeded(root.path(), "camp_b");

    let all = Ctx::new(root.path().to_path_buf(), None, None, false);
    let data = validate::run(&all).unwrap();
    assert_eq!(data["validated_campaigns"], 2);
    assert_eq!(data["results"].as_array().unwrap().len(), 2);
}
