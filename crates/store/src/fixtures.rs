//! Seeded campaign scenarios for tests.
//!
//! Builds state through the real turn lifecycle so fixtures exercise the
//! same write path production does: one committed "session zero" turn with
//! a party, three NPCs, two locations, and a world clock.

use crate::entities;
use crate::error::Result;
use crate::store::CampaignStore;
use chronicle_kernel::types::{Location, Npc, PlayerCharacter, WorldState};
use std::path::Path;

pub const PC_HERO: &str = "pc_hero";
pub const NPC_MAYOR: &str = "npc_mayor";

pub fn seeded_campaign(root: &Path, campaign_id: &str) -> Result<CampaignStore> {
    let mut store = CampaignStore::create(root, campaign_id, "Fixture Campaign")?;
    store.begin_turn()?;

    let campaign = campaign_id.to_string();
    let payload = serde_json::json!({
        "locations": 2,
        "player_characters": 1,
        "npcs": 3,
    });
    store.mutate("campaign seed", &payload, |conn| {
        for (id, name) in [("loc_start", "Larkspur"), ("loc_keep", "Old Keep")] {
            entities::upsert_location(
                conn,
                &campaign,
                &Location {
                    id: id.into(),
                    name: name.into(),
                    region: "Greenmarch".into(),
                },
            )?;
        }
        entities::upsert_pc(
            conn,
            &campaign,
            &PlayerCharacter {
                id: PC_HERO.into(),
                name: "Arin Vale".into(),
                char_class: "Rogue".into(),
                level: 3,
                max_hp: 24,
                current_hp: 24,
                ac: 15,
                location_id: "loc_start".into(),
                initiative_mod: 3,
                spell_slots: [("1".to_string(), 2i64)].into_iter().collect(),
                ..PlayerCharacter::default()
            },
        )?;
        for (id, name, hp) in [
            (NPC_MAYOR, "Mayor Elira Thorn", 11),
            ("npc_sergeant", "Sergeant Bram", 12),
            ("npc_scholar", "Scholar Nyx", 9),
        ] {
            entities::upsert_npc(
                conn,
                &campaign,
                &Npc {
                    id: id.into(),
                    name: name.into(),
                    location_id: "loc_start".into(),
                    max_hp: hp,
                    current_hp: hp,
                    ac: 12,
                    ..Npc::default()
                },
            )?;
        }
        entities::put_world_state(
            conn,
            &campaign,
            &WorldState {
                world_date: "1 Ches 1492 DR".into(),
                world_time: "08:00".into(),
                weather: "mist".into(),
                region: "Greenmarch".into(),
                location_id: "loc_start".into(),
                ..WorldState::default()
            },
        )?;
        Ok(())
    })?;

    store.commit_turn("Session zero seed")?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn seeded_campaign_has_one_committed_turn() {
        let root = tempdir().unwrap();
        let store = seeded_campaign(root.path(), "camp_fixture").unwrap();

        let latest = store.latest_turn().unwrap().unwrap();
        assert_eq!(latest.turn_number, 1);
        assert_eq!(latest.status, crate::turns::TurnStatus::Committed);

        let snapshot = store.load_snapshot().unwrap();
        assert_eq!(snapshot.player_characters.len(), 1);
        assert_eq!(snapshot.npcs.len(), 3);
        assert_eq!(snapshot.locations.len(), 2);
        assert_eq!(snapshot.world_state.world_time, "08:00");
    }
}
