//! Bridge between the entity tables and the kernel's `CampaignSnapshot`.
//!
//! `load` materializes the full logical state; `restore` replaces it
//! wholesale (wipe and reinsert). Restore is the rollback/undo primitive, so
//! it must cover every entity table — turns, events, and diffs are engine
//! bookkeeping and are deliberately not part of a snapshot.

use crate::entities;
use crate::error::Result;
use chronicle_kernel::CampaignSnapshot;
use rusqlite::{params, Connection};

const ENTITY_TABLES: &[&str] = &[
    "locations",
    "player_characters",
    "npcs",
    "world_state",
    "inventory",
    "relationships",
    "quests",
    "objectives",
    "rumors",
    "secrets",
    "clocks",
    "active_spells",
    "reward_events",
];

pub fn load(conn: &Connection, campaign_id: &str) -> Result<CampaignSnapshot> {
    let mut snapshot = CampaignSnapshot::default();
    snapshot.world_state = entities::get_world_state(conn, campaign_id)?;
    for location in entities::list_locations(conn, campaign_id)? {
        snapshot.locations.insert(location.id.clone(), location);
    }
    for pc in entities::list_pcs(conn, campaign_id)? {
        snapshot.player_characters.insert(pc.id.clone(), pc);
    }
    for npc in entities::list_npcs(conn, campaign_id)? {
        snapshot.npcs.insert(npc.id.clone(), npc);
    }
    for item in entities::list_inventory(conn, campaign_id)? {
        snapshot.inventory.insert(item.id.clone(), item);
    }
    for rel in entities::list_relationships(conn, campaign_id)? {
        snapshot.relationships.insert(rel.edge_key(), rel);
    }
    for quest in entities::list_quests(conn, campaign_id)? {
        snapshot.quests.insert(quest.id.clone(), quest);
    }
    for rumor in entities::list_rumors(conn, campaign_id)? {
        snapshot.rumors.insert(rumor.id.clone(), rumor);
    }
    for secret in entities::list_secrets(conn, campaign_id)? {
        snapshot.secrets.insert(secret.id.clone(), secret);
    }
    for clock in entities::list_clocks(conn, campaign_id)? {
        snapshot.clocks.insert(clock.name.clone(), clock);
    }
    for spell in entities::list_spells(conn, campaign_id)? {
        snapshot.active_spells.insert(spell.id.clone(), spell);
    }
    for reward in entities::list_rewards(conn, campaign_id)? {
        snapshot.rewards.insert(reward.id.clone(), reward);
    }
    Ok(snapshot)
}

pub fn restore(conn: &Connection, campaign_id: &str, snapshot: &CampaignSnapshot) -> Result<()> {
    for table in ENTITY_TABLES {
        conn.execute(
            &format!("DELETE FROM {table} WHERE campaign_id = ?1"),
            params![campaign_id],
        )?;
    }

    entities::put_world_state(conn, campaign_id, &snapshot.world_state)?;
    for location in snapshot.locations.values() {
        entities::upsert_location(conn, campaign_id, location)?;
    }
    for pc in snapshot.player_characters.values() {
        entities::upsert_pc(conn, campaign_id, pc)?;
    }
    for npc in snapshot.npcs.values() {
        entities::upsert_npc(conn, campaign_id, npc)?;
    }
    for item in snapshot.inventory.values() {
        entities::upsert_item(conn, campaign_id, item)?;
    }
    for rel in snapshot.relationships.values() {
        entities::upsert_relationship(conn, campaign_id, rel)?;
    }
    for quest in snapshot.quests.values() {
        entities::upsert_quest(conn, campaign_id, quest)?;
    }
    for rumor in snapshot.rumors.values() {
        entities::upsert_rumor(conn, campaign_id, rumor)?;
    }
    for secret in snapshot.secrets.values() {
        entities::upsert_secret(conn, campaign_id, secret)?;
    }
    for clock in snapshot.clocks.values() {
        entities::upsert_clock(conn, campaign_id, clock)?;
    }
    for spell in snapshot.active_spells.values() {
        entities::upsert_spell(conn, campaign_id, spell)?;
    }
    for reward in snapshot.rewards.values() {
        entities::insert_reward(conn, campaign_id, reward)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chronicle_kernel::types::{ItemStack, Npc, OwnerKind, PlayerCharacter};
    use tempfile::tempdir;

    fn test_conn() -> (tempfile::TempDir, Connection) {
        let dir = tempdir().unwrap();
        let conn = db::open(&dir.path().join("campaign.db")).unwrap();
        (dir, conn)
    }

    #[test]
    fn load_of_empty_campaign_is_default() {
        let (_dir, conn) = test_conn();
        let snapshot = load(&conn, "camp_a").unwrap();
        assert_eq!(snapshot, CampaignSnapshot::default());
    }

    #[test]
    fn restore_round_trips_through_tables() {
        let (_dir, conn) = test_conn();
        let mut snapshot = CampaignSnapshot::default();
        snapshot.world_state.world_time = "08:00".into();
        snapshot.player_characters.insert(
            "pc_hero".into(),
            PlayerCharacter {
                id: "pc_hero".into(),
                name: "Arin Vale".into(),
                current_hp: 24,
                max_hp: 24,
                spell_slots: [("1".to_string(), 2i64)].into_iter().collect(),
                ..PlayerCharacter::default()
            },
        );
        snapshot.npcs.insert(
            "npc_mayor".into(),
            Npc { id: "npc_mayor".into(), current_hp: 11, ..Npc::default() },
        );
        snapshot.inventory.insert(
            "item_1".into(),
            ItemStack {
                id: "item_1".into(),
                owner_type: OwnerKind::Pc,
                owner_id: "pc_hero".into(),
                item_name: "Rope".into(),
                quantity: 1,
                consumable: false,
                stackable: true,
            },
        );

        restore(&conn, "camp_a", &snapshot).unwrap();
        let loaded = load(&conn, "camp_a").unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn restore_discards_rows_not_in_the_snapshot() {
        let (_dir, conn) = test_conn();
        let mut with_item = CampaignSnapshot::default();
        with_item.inventory.insert(
            "item_1".into(),
            ItemStack {
                id: "item_1".into(),
                owner_type: OwnerKind::Pc,
                owner_id: "pc_hero".into(),
                item_name: "Rope".into(),
                quantity: 1,
                consumable: false,
                stackable: true,
            },
        );
        restore(&conn, "camp_a", &with_item).unwrap();

        restore(&conn, "camp_a", &CampaignSnapshot::default()).unwrap();
        let loaded = load(&conn, "camp_a").unwrap();
        assert!(loaded.inventory.is_empty());
    }
}
