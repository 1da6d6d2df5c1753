//! Campaign lifecycle: create, load, seed, and append-log repair.

use crate::commands::short_id;
use crate::context::{CmdResult, CommandError, Ctx};
use chronicle_kernel::types::{Location, Npc, PlayerCharacter};
use chronicle_store::{entities, repair_events, CampaignStore};
use serde::Deserialize;
use serde_json::{json, Value};

pub fn create(ctx: &Ctx, name: Option<&str>) -> CmdResult {
    let campaign_id = ctx.campaign_id()?;
    let store = CampaignStore::create(&ctx.root, campaign_id, name.unwrap_or(""))?;
    Ok(json!({ "campaign": store.campaign_row()? }))
}

pub fn load(ctx: &Ctx) -> CmdResult {
    let store = ctx.open_store()?;
    let snapshot = store.load_snapshot()?;
    Ok(json!({
        "campaign": store.campaign_row()?,
        "counts": {
            "pc_count": snapshot.player_characters.len(),
            "npc_count": snapshot.npcs.len(),
            "location_count": snapshot.locations.len(),
            "quest_count": snapshot.quests.len(),
        },
        "latest_turn": store.latest_turn()?,
    }))
}

#[derive(Deserialize)]
struct SeedPayload {
    #[serde(default)]
    locations: Vec<Value>,
    #[serde(default)]
    player_characters: Vec<Value>,
    #[serde(default)]
    npcs: Vec<Value>,
    #[serde(default)]
    world_state: Option<Value>,
}

/// Seeds the initial world inside the open turn. A playable seed needs at
/// least three named NPCs; anything less is rejected before staging.
pub fn seed(ctx: &Ctx) -> CmdResult {
    let payload: SeedPayload = ctx.payload()?;
    if payload.npcs.len() < 3 {
        return Err(CommandError::with_details(
            "seed_requires_three_npcs",
            json!({
                "message": "campaign seed requires at least three NPCs",
                "npc_count": payload.npcs.len(),
            }),
        ));
    }
    if let Some(world) = &payload.world_state {
        if !world.is_object() {
            return Err(CommandError::new(
                "invalid_world_state_payload",
                "world_state must be an object",
            ));
        }
    }

    let locations = parse_entities::<Location>(&payload.locations, "loc")?;
    let pcs = parse_entities::<PlayerCharacter>(&payload.player_characters, "pc")?;
    let npcs = parse_entities::<Npc>(&payload.npcs, "npc")?;

    let mut store = ctx.open_store()?;
    let campaign = store.campaign_id().to_string();
    let world_patch = payload.world_state.clone();
    store.mutate("campaign seed", &ctx.raw_payload(), |conn| {
        for location in &locations {
            entities::upsert_location(conn, &campaign, location)?;
        }
        for pc in &pcs {
            entities::upsert_pc(conn, &campaign, pc)?;
        }
        for npc in &npcs {
            entities::upsert_npc(conn, &campaign, npc)?;
        }
        if let Some(patch) = &world_patch {
            let mut world = entities::get_world_state(conn, &campaign)?;
            crate::commands::state::apply_world_patch(&mut world, patch);
            entities::put_world_state(conn, &campaign, &world)?;
        }
        Ok(())
    })?;

    Ok(json!({
        "seeded": {
            "locations": locations.len(),
            "player_characters": pcs.len(),
            "npcs": npcs.len(),
        },
    }))
}

pub fn repair(ctx: &Ctx, dry_run: bool) -> CmdResult {
    let store = ctx.open_store()?;
    let outcome = repair_events(&store, dry_run)?;
    Ok(serde_json::to_value(&outcome)?)
}

/// Entities in a seed payload may omit their ids; a stable prefix plus a
/// short nonce fills the gap before deserialization.
fn parse_entities<T: serde::de::DeserializeOwned>(
    raw: &[Value],
    prefix: &str,
) -> Result<Vec<T>, CommandError> {
    let mut parsed = Vec::with_capacity(raw.len());
    for value in raw {
        let mut value = value.clone();
        if let Value::Object(map) = &mut value {
            if !map.contains_key("id") {
                map.insert("id".into(), Value::String(short_id(prefix)));
            }
        }
        let entity: T = serde_json::from_value(value).map_err(|err| {
            CommandError::new("invalid_payload", &format!("bad {prefix} entry: {err}"))
        })?;
        parsed.push(entity);
    }
    Ok(parsed)
}
