use crate::commands::{require_owner, short_id};
use crate::context::{CmdResult, CommandError, Ctx};
use chronicle_kernel::types::{ActiveSpell, OwnerKind};
use chronicle_store::entities;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct CastPayload {
    caster_type: OwnerKind,
    caster_id: String,
    spell_name: String,
    #[serde(default)]
    remaining_rounds: i64,
    #[serde(default)]
    requires_concentration: bool,
}

pub fn cast(ctx: &Ctx) -> CmdResult {
    let payload: CastPayload = ctx.payload()?;
    let mut store = ctx.open_store()?;
    store.require_open_turn()?;
    require_owner(&store, payload.caster_type, &payload.caster_id)?;
    let campaign = store.campaign_id().to_string();

    let spell = ActiveSpell {
        id: short_id("spell"),
        caster_type: payload.caster_type,
        caster_id: payload.caster_id,
        spell_name: payload.spell_name,
        remaining_rounds: payload.remaining_rounds,
        requires_concentration: payload.requires_concentration,
        active: true,
    };
    store.mutate("spell cast", &ctx.raw_payload(), |conn| {
        entities::upsert_spell(conn, &campaign, &spell)
    })?;
    Ok(json!({ "spell": spell }))
}

#[derive(Deserialize)]
struct EndPayload {
    spell_id: String,
}

pub fn end(ctx: &Ctx) -> CmdResult {
    let payload: EndPayload = ctx.payload()?;
    let mut store = ctx.open_store()?;
    store.require_open_turn()?;
    let campaign = store.campaign_id().to_string();

    let Some(mut spell) = entities::get_spell(store.conn(), &campaign, &payload.spell_id)? else {
        return Err(CommandError::with_details(
            "spell_not_found",
            json!({
                "message": format!("active spell {} does not exist", payload.spell_id),
                "spell_id": payload.spell_id,
            }),
        ));
    };
    spell.active = false;
    spell.remaining_rounds = 0;

    store.mutate("spell end", &ctx.raw_payload(), |conn| {
        entities::upsert_spell(conn, &campaign, &spell)
    })?;
    Ok(json!({ "spell": spell }))
}
