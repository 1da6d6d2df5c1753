//! Bulk state reads and writes: `state set` upserts entity patches, `state
//! get` returns the queryable view of the campaign.
//!
//! Patches are partial by design: a payload naming only `world_time` leaves
//! every other world field alone, and a PC patch overlays the stored row.
//! Presentation-only keys in the payload are ignored. All validation and
//! row reads happen before `mutate`, so a rejected payload stages nothing.

use crate::commands::short_id;
use crate::context::{CmdResult, CommandError, Ctx};
use chronicle_kernel::types::{Location, Npc, PlayerCharacter, WorldState};
use chronicle_store::entities;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize, Default)]
struct StateSetPayload {
    #[serde(default)]
    locations: Vec<Value>,
    #[serde(default)]
    player_characters: Vec<Value>,
    #[serde(default)]
    npcs: Vec<Value>,
    #[serde(default)]
    world_state: Option<Value>,
}

pub fn set(ctx: &Ctx) -> CmdResult {
    let payload: StateSetPayload = ctx.payload()?;
    if let Some(world) = &payload.world_state {
        if !world.is_object() {
            return Err(CommandError::new(
                "invalid_world_state_payload",
                "world_state must be an object of field updates",
            ));
        }
    }

    let mut store = ctx.open_store()?;
    store.require_open_turn()?;
    let campaign = store.campaign_id().to_string();

    // Read phase: resolve every patch against stored rows.
    let mut locations = Vec::new();
    for raw in &payload.locations {
        locations.push(merge_patch::<Location>(raw, "loc", |id| {
            entities::get_location(store.conn(), &campaign, id)
        })?);
    }
    let mut pcs = Vec::new();
    for raw in &payload.player_characters {
        pcs.push(merge_patch::<PlayerCharacter>(raw, "pc", |id| {
            entities::get_pc(store.conn(), &campaign, id)
        })?);
    }
    let mut npcs = Vec::new();
    for raw in &payload.npcs {
        npcs.push(merge_patch::<Npc>(raw, "npc", |id| {
            entities::get_npc(store.conn(), &campaign, id)
        })?);
    }
    let world = match &payload.world_state {
        Some(patch) => {
            let mut world = entities::get_world_state(store.conn(), &campaign)?;
            apply_world_patch(&mut world, patch);
            Some(world)
        }
        None => None,
    };

    // Write phase: one transaction, entity rows plus the staged event.
    store.mutate("state set", &ctx.raw_payload(), |conn| {
        for location in &locations {
            entities::upsert_location(conn, &campaign, location)?;
        }
        for pc in &pcs {
            entities::upsert_pc(conn, &campaign, pc)?;
        }
        for npc in &npcs {
            entities::upsert_npc(conn, &campaign, npc)?;
        }
        if let Some(world) = &world {
            entities::put_world_state(conn, &campaign, world)?;
        }
        Ok(())
    })?;

    Ok(json!({
        "updated": {
            "locations": locations.len(),
            "player_characters": pcs.len(),
            "npcs": npcs.len(),
            "world_state": world.is_some(),
        },
    }))
}

pub fn get(ctx: &Ctx) -> CmdResult {
    let store = ctx.open_store()?;
    let snapshot = store.load_snapshot()?;
    let mut data = json!({
        "campaign": store.campaign_row()?,
        "world_state": snapshot.world_state,
        "players": snapshot.player_characters.values().collect::<Vec<_>>(),
        "npcs": snapshot.npcs.values().collect::<Vec<_>>(),
        "inventory": snapshot.inventory.values().collect::<Vec<_>>(),
        "locations": snapshot.locations.values().collect::<Vec<_>>(),
        "latest_turn": store.latest_turn()?,
    });
    if ctx.full {
        data["quests"] = serde_json::to_value(snapshot.quests.values().collect::<Vec<_>>())?;
        data["rumors"] = serde_json::to_value(snapshot.rumors.values().collect::<Vec<_>>())?;
        data["secrets"] = serde_json::to_value(snapshot.secrets.values().collect::<Vec<_>>())?;
        data["clocks"] = serde_json::to_value(snapshot.clocks.values().collect::<Vec<_>>())?;
        data["active_spells"] =
            serde_json::to_value(snapshot.active_spells.values().collect::<Vec<_>>())?;
    }
    Ok(data)
}

/// Overlays a JSON patch onto the stored entity (or a fresh one when the id
/// is new). Field-level merge: stored row serialized, patch keys written
/// over it, result deserialized back.
fn merge_patch<T>(
    raw: &Value,
    prefix: &str,
    fetch: impl FnOnce(&str) -> chronicle_store::Result<Option<T>>,
) -> Result<T, CommandError>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    let Value::Object(patch) = raw else {
        return Err(CommandError::new(
            "invalid_payload",
            &format!("{prefix} entries must be objects"),
        ));
    };

    let id = patch
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| short_id(prefix));

    let mut base = match fetch(&id)? {
        Some(existing) => serde_json::to_value(existing)?,
        None => json!({}),
    };
    let Value::Object(base_map) = &mut base else { unreachable!() };
    for (key, value) in patch {
        base_map.insert(key.clone(), value.clone());
    }
    base_map.insert("id".into(), Value::String(id));

    serde_json::from_value(base).map_err(|err| {
        CommandError::new("invalid_payload", &format!("bad {prefix} entry: {err}"))
    })
}

/// Writes the provided world fields over the stored row; unknown keys are
/// ignored rather than rejected.
pub(crate) fn apply_world_patch(world: &mut WorldState, patch: &Value) {
    let Value::Object(map) = patch else { return };
    for (key, value) in map {
        match key.as_str() {
            "world_date" => overlay_string(&mut world.world_date, value),
            "world_time" => overlay_string(&mut world.world_time, value),
            "weather" => overlay_string(&mut world.weather, value),
            "region" => overlay_string(&mut world.region, value),
            "location_id" => overlay_string(&mut world.location_id, value),
            "active_arc" => overlay_string(&mut world.active_arc, value),
            "world_day_index" => {
                if let Some(n) = value.as_i64() {
                    world.world_day_index = n;
                }
            }
            _ => {}
        }
    }
}

fn overlay_string(slot: &mut String, value: &Value) {
    if let Some(text) = value.as_str() {
        *slot = text.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_patch_touches_only_named_fields() {
        let mut world = WorldState {
            world_date: "1 Ches 1492 DR".into(),
            world_time: "08:00".into(),
            weather: "mist".into(),
            ..WorldState::default()
        };
        apply_world_patch(&mut world, &json!({"world_time": "12:00", "weather": "rain"}));
        assert_eq!(world.world_time, "12:00");
        assert_eq!(world.weather, "rain");
        assert_eq!(world.world_date, "1 Ches 1492 DR");
    }

    #[test]
    fn world_patch_ignores_unknown_keys() {
        let mut world = WorldState::default();
        apply_world_patch(&mut world, &json!({"public_note": "ignored", "world_time": "09:00"}));
        assert_eq!(world.world_time, "09:00");
    }
}
