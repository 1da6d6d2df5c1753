//! End-to-end checks of the turn-transaction engine against its contract:
//! lifecycle invariants, rollback as a true no-op, event log parity, repair,
//! undo, and checkpoint drift detection.

use chronicle_kernel::types::{ItemStack, OwnerKind, Relationship};
use chronicle_store::fixtures::{seeded_campaign, PC_HERO};
use chronicle_store::{
    entities, repair_events, validate_campaign, CampaignStore, TurnStatus, UndoMode,
};
use tempfile::tempdir;

fn grant_item(store: &mut CampaignStore, item_id: &str, name: &str, quantity: i64) {
    let campaign = store.campaign_id().to_string();
    let payload = serde_json::json!({
        "owner_type": "pc",
        "owner_id": PC_HERO,
        "item_name": name,
        "quantity": quantity,
    });
    let item = ItemStack {
        id: item_id.to_string(),
        owner_type: OwnerKind::Pc,
        owner_id: PC_HERO.to_string(),
        item_name: name.to_string(),
        quantity,
        consumable: true,
        stackable: true,
    };
    store
        .mutate("item grant", &payload, |conn| {
            entities::upsert_item(conn, &campaign, &item)
        })
        .unwrap();
}

#[test]
fn at_most_one_open_turn() {
    let root = tempdir().unwrap();
    let mut store = seeded_campaign(root.path(), "camp_a").unwrap();

    store.begin_turn().unwrap();
    let err = store.begin_turn().unwrap_err();
    assert_eq!(err.code(), "turn_already_open");

    store.rollback_turn("cleanup").unwrap();
    store.begin_turn().unwrap();
    store.commit_turn("ok").unwrap();
}

#[test]
fn commit_and_rollback_require_an_open_turn() {
    let root = tempdir().unwrap();
    let mut store = seeded_campaign(root.path(), "camp_a").unwrap();

    assert_eq!(store.commit_turn("nope").unwrap_err().code(), "no_open_turn");
    assert_eq!(store.rollback_turn("nope").unwrap_err().code(), "no_open_turn");
    assert_eq!(store.require_open_turn().unwrap_err().code(), "no_open_turn");
}

#[test]
fn turn_numbers_are_monotonic_and_never_reused() {
    let root = tempdir().unwrap();
    let mut store = seeded_campaign(root.path(), "camp_a").unwrap();

    let t2 = store.begin_turn().unwrap();
    assert_eq!(t2.turn_number, 2);
    store.rollback_turn("abandoned").unwrap();

    // The rolled-back number is retired, not reassigned.
    let t3 = store.begin_turn().unwrap();
    assert_eq!(t3.turn_number, 3);
    store.commit_turn("third").unwrap();
}

#[test]
fn rollback_is_a_true_noop_on_entity_state() {
    let root = tempdir().unwrap();
    let mut store = seeded_campaign(root.path(), "camp_a").unwrap();
    let before = store.load_snapshot().unwrap();

    store.begin_turn().unwrap();
    grant_item(&mut store, "item_marker", "RollbackTestItem", 2);
    let campaign = store.campaign_id().to_string();
    store
        .mutate("relationship adjust", &serde_json::json!({"trust_delta": 1}), |conn| {
            entities::upsert_relationship(
                conn,
                &campaign,
                &Relationship {
                    source_type: OwnerKind::Pc,
                    source_id: PC_HERO.into(),
                    target_type: OwnerKind::Npc,
                    target_id: "npc_mayor".into(),
                    trust: 1,
                    ..Relationship::default()
                },
            )
        })
        .unwrap();

    let rolled = store.rollback_turn("Rollback test").unwrap();
    assert_eq!(rolled.status, TurnStatus::RolledBack);
    assert_eq!(rolled.reason, "Rollback test");

    let after = store.load_snapshot().unwrap();
    assert_eq!(before, after);
    assert_eq!(store.staged_event_count().unwrap(), 0);
    assert!(after.inventory.values().all(|i| i.item_name != "RollbackTestItem"));
}

#[test]
fn commit_attaches_diff_checksum_and_mirror() {
    let root = tempdir().unwrap();
    let mut store = seeded_campaign(root.path(), "camp_a").unwrap();

    store.begin_turn().unwrap();
    let campaign = store.campaign_id().to_string();
    store
        .mutate("state set", &serde_json::json!({"world_state": {"world_time": "12:00"}}), |conn| {
            let mut world = entities::get_world_state(conn, &campaign)?;
            world.world_time = "12:00".into();
            entities::put_world_state(conn, &campaign, &world)
        })
        .unwrap();
    let outcome = store.commit_turn("Noon").unwrap();

    assert_eq!(outcome.turn.status, TurnStatus::Committed);
    assert!(!outcome.turn.checkpoint_checksum.is_empty());
    assert_eq!(outcome.turn.snapshot_ref, "snapshot://camp_a/turn/2");
    assert_eq!(outcome.events.len(), 1);

    // Stored diff: time category populated, the other five present but empty.
    let stored = store.stored_diff(None).unwrap().unwrap();
    assert_eq!(stored.turn_number, 2);
    assert_eq!(stored.diff.time_advanced.len(), 1);
    assert!(stored.diff.location_change.is_empty());
    assert!(stored.diff.hp_resources_changed.is_empty());
    assert!(stored.diff.inventory_currency_changed.is_empty());
    assert!(stored.diff.relationship_reputation_changed.is_empty());
    assert!(stored.diff.quest_rumor_clock_updates.is_empty());

    // Every diff serializes all six categories regardless of content.
    let value = serde_json::to_value(&stored.diff).unwrap();
    for key in [
        "time_advanced",
        "location_change",
        "hp_resources_changed",
        "inventory_currency_changed",
        "relationship_reputation_changed",
        "quest_rumor_clock_updates",
    ] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
}

#[test]
fn event_log_parity_holds_across_commits_and_rollbacks() {
    let root = tempdir().unwrap();
    let mut store = seeded_campaign(root.path(), "camp_a").unwrap();

    store.begin_turn().unwrap();
    grant_item(&mut store, "item_a", "Rope", 1);
    store.commit_turn("rope").unwrap();

    store.begin_turn().unwrap();
    grant_item(&mut store, "item_b", "Lantern", 1);
    store.rollback_turn("changed my mind").unwrap();

    store.begin_turn().unwrap();
    grant_item(&mut store, "item_c", "Rations", 3);
    store.commit_turn("rations").unwrap();

    let report = validate_campaign(&store).unwrap();
    assert!(report.ok, "issues: {:?}", report.issues);
    assert_eq!(report.event_log_parity.db_count, report.event_log_parity.file_count);
    assert_eq!(report.event_log_parity.first_mismatch_index, None);

    // The rolled-back turn's event never reached either representation.
    let committed = store.committed_event_records().unwrap();
    assert!(committed.iter().all(|e| {
        e.payload.get("item_name").and_then(|v| v.as_str()) != Some("Lantern")
    }));
}

#[test]
fn forged_append_line_is_detected_and_repaired() {
    let root = tempdir().unwrap();
    let mut store = seeded_campaign(root.path(), "camp_a").unwrap();
    store.begin_turn().unwrap();
    grant_item(&mut store, "item_a", "Rope", 1);
    store.commit_turn("rope").unwrap();

    // Forge a record referencing a turn that does not exist.
    let forged = serde_json::json!({
        "id": "evt_forged_000000000000",
        "campaign_id": "camp_a",
        "turn_id": 9999,
        "turn_number": 9999,
        "command": "fake",
        "payload": {},
        "timestamp": "2000-01-01T00:00:00+00:00",
    });
    let log_path = store.paths().events_log.clone();
    let mut contents = std::fs::read_to_string(&log_path).unwrap();
    contents.push_str(&format!("{forged}\n"));
    std::fs::write(&log_path, contents).unwrap();

    let report = validate_campaign(&store).unwrap();
    assert!(!report.ok);
    let parity = &report.event_log_parity;
    assert_eq!(parity.file_count, parity.db_count + 1);
    assert_eq!(parity.first_mismatch_index, Some(parity.db_count));
    assert_eq!(parity.only_in_file_sample, vec!["evt_forged_000000000000".to_string()]);
    assert!(parity.only_in_db_sample.is_empty());

    // Dry run reports without touching the file.
    let dry = repair_events(&store, true).unwrap();
    assert!(dry.mismatch);
    assert!(!dry.repaired);
    assert!(dry.backup.is_none());
    assert_eq!(dry.before.file_count, dry.before.db_count + 1);

    // Apply mode backs up, rewrites, and parity is restored.
    let applied = repair_events(&store, false).unwrap();
    assert!(applied.mismatch);
    assert!(applied.repaired);
    let backup = applied.backup.expect("backup path reported");
    assert!(std::path::Path::new(&backup).exists());
    assert!(std::fs::read_to_string(&backup).unwrap().contains("evt_forged_000000000000"));

    let report = validate_campaign(&store).unwrap();
    assert!(report.ok, "issues: {:?}", report.issues);
}

#[test]
fn undo_open_turn_rolls_back_in_place() {
    let root = tempdir().unwrap();
    let mut store = seeded_campaign(root.path(), "camp_a").unwrap();
    let before = store.load_snapshot().unwrap();

    store.begin_turn().unwrap();
    grant_item(&mut store, "item_a", "Undo-Open", 1);
    let outcome = store.undo_last_turn(None).unwrap();

    assert_eq!(outcome.mode, UndoMode::Open);
    assert_eq!(outcome.undone_turn_number, 2);
    assert!(outcome.undo_turn.is_none());
    assert_eq!(store.load_snapshot().unwrap(), before);
}

#[test]
fn chained_undo_reverses_committed_turns_in_reverse_order() {
    let root = tempdir().unwrap();
    let mut store = seeded_campaign(root.path(), "camp_a").unwrap();
    let baseline = store.load_snapshot().unwrap();

    store.begin_turn().unwrap();
    grant_item(&mut store, "item_a", "MarkerA", 1);
    store.commit_turn("A").unwrap();
    let after_a = store.load_snapshot().unwrap();

    store.begin_turn().unwrap();
    grant_item(&mut store, "item_b", "MarkerB", 1);
    store.commit_turn("B").unwrap();

    let first = store.undo_last_turn(Some("undo B")).unwrap();
    assert_eq!(first.mode, UndoMode::Committed);
    assert_eq!(first.undone_turn_number, 3);
    let undo_turn = first.undo_turn.unwrap();
    assert_eq!(undo_turn.status, TurnStatus::Committed);
    assert!(undo_turn.summary.contains("Undo of turn 3"));
    assert_eq!(store.load_snapshot().unwrap(), after_a);

    // The second undo skips the reversal turn and walks back to A.
    let second = store.undo_last_turn(None).unwrap();
    assert_eq!(second.mode, UndoMode::Committed);
    assert_eq!(second.undone_turn_number, 2);
    assert_eq!(store.load_snapshot().unwrap(), baseline);

    let report = validate_campaign(&store).unwrap();
    assert!(report.ok, "issues: {:?}", report.issues);

    // A third undo reaches the seed turn; after that nothing remains.
    let third = store.undo_last_turn(None).unwrap();
    assert_eq!(third.undone_turn_number, 1);
    assert_eq!(store.undo_last_turn(None).unwrap_err().code(), "nothing_to_undo");
}

#[test]
fn staged_leftovers_from_a_crash_are_swept_on_open() {
    let root = tempdir().unwrap();
    let mut store = seeded_campaign(root.path(), "camp_a").unwrap();

    store.begin_turn().unwrap();
    grant_item(&mut store, "item_a", "CrashMarker", 1);

    // Simulate a crash that left the turn terminal but the events staged:
    // flip the turn row out from under the staged events.
    store
        .conn()
        .execute(
            "UPDATE turns SET status = 'rolled_back' WHERE campaign_id = 'camp_a' AND status = 'open'",
            [],
        )
        .unwrap();
    assert!(store.staged_event_count().unwrap() > 0);
    drop(store);

    let store = CampaignStore::open(root.path(), "camp_a").unwrap();
    assert_eq!(store.staged_event_count().unwrap(), 0);
}

#[test]
fn out_of_band_edits_trip_the_checkpoint_check() {
    let root = tempdir().unwrap();
    let store = seeded_campaign(root.path(), "camp_a").unwrap();
    assert!(validate_campaign(&store).unwrap().ok);

    store
        .conn()
        .execute(
            "UPDATE npcs SET current_hp = 1 WHERE campaign_id = 'camp_a' AND id = 'npc_mayor'",
            [],
        )
        .unwrap();

    let report = validate_campaign(&store).unwrap();
    assert!(!report.ok);
    assert!(report.issues.iter().any(|i| i.check == "checkpoint_checksum"));
}

#[test]
fn orphan_references_are_reported() {
    let root = tempdir().unwrap();
    let store = seeded_campaign(root.path(), "camp_a").unwrap();

    store
        .conn()
        .execute(
            r#"
            INSERT INTO inventory (campaign_id, id, owner_type, owner_id, item_name, quantity)
            VALUES ('camp_a', 'item_orphan', 'pc', 'pc_ghost', 'Haunted Locket', 1)
            "#,
            [],
        )
        .unwrap();

    let report = validate_campaign(&store).unwrap();
    assert!(!report.ok);
    let issue = report
        .issues
        .iter()
        .find(|i| i.check == "inventory_owner")
        .expect("inventory orphan reported");
    assert_eq!(issue.subjects, vec!["item_orphan".to_string()]);
}

#[test]
fn undo_with_no_history_is_rejected() {
    let root = tempdir().unwrap();
    let mut store = CampaignStore::create(root.path(), "camp_empty", "").unwrap();
    assert_eq!(store.undo_last_turn(None).unwrap_err().code(), "nothing_to_undo");

    // After the only turn is rolled back there is nothing left to reverse.
    store.begin_turn().unwrap();
    store.rollback_turn("abandon").unwrap();
    assert_eq!(store.undo_last_turn(None).unwrap_err().code(), "nothing_to_undo");
}
