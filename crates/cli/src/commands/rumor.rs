use crate::commands::short_id;
use crate::context::{CmdResult, CommandError, Ctx};
use chronicle_kernel::types::Rumor;
use chronicle_store::entities;
use serde::Deserialize;
use serde_json::{json, Value};

pub fn add(ctx: &Ctx) -> CmdResult {
    let mut raw = ctx.raw_payload();
    let Value::Object(map) = &mut raw else {
        return Err(CommandError::new("invalid_payload", "rumor payload must be an object"));
    };
    if !map.contains_key("id") {
        map.insert("id".into(), Value::String(short_id("rumor")));
    }
    let rumor: Rumor = serde_json::from_value(raw.clone())
        .map_err(|err| CommandError::new("invalid_payload", &format!("bad rumor payload: {err}")))?;
    if rumor.text.is_empty() {
        return Err(CommandError::new("invalid_payload", "rumor text is required"));
    }

    let mut store = ctx.open_store()?;
    let campaign = store.campaign_id().to_string();
    store.mutate("rumor add", &raw, |conn| {
        entities::upsert_rumor(conn, &campaign, &rumor)
    })?;
    Ok(json!({ "rumor": rumor }))
}

#[derive(Deserialize)]
struct RevealPayload {
    rumor_id: String,
}

pub fn reveal(ctx: &Ctx) -> CmdResult {
    let payload: RevealPayload = ctx.payload()?;
    let mut store = ctx.open_store()?;
    store.require_open_turn()?;
    let campaign = store.campaign_id().to_string();

    let Some(mut rumor) = entities::get_rumor(store.conn(), &campaign, &payload.rumor_id)? else {
        return Err(CommandError::with_details(
            "rumor_not_found",
            json!({
                "message": format!("rumor {} does not exist", payload.rumor_id),
                "rumor_id": payload.rumor_id,
            }),
        ));
    };
    rumor.revealed = true;

    store.mutate("rumor reveal", &ctx.raw_payload(), |conn| {
        entities::upsert_rumor(conn, &campaign, &rumor)
    })?;
    Ok(json!({ "rumor": rumor }))
}
