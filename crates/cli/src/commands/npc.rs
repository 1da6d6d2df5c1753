use crate::commands::short_id;
use crate::context::{CmdResult, CommandError, Ctx};
use chronicle_kernel::types::Npc;
use chronicle_store::entities;
use serde_json::{json, Value};

pub fn create(ctx: &Ctx) -> CmdResult {
    let mut raw = ctx.raw_payload();
    let Value::Object(map) = &mut raw else {
        return Err(CommandError::new("invalid_payload", "npc payload must be an object"));
    };
    if !map.contains_key("id") {
        map.insert("id".into(), Value::String(short_id("npc")));
    }
    let npc: Npc = serde_json::from_value(raw.clone())
        .map_err(|err| CommandError::new("invalid_payload", &format!("bad npc payload: {err}")))?;
    if npc.name.is_empty() {
        return Err(CommandError::new("invalid_payload", "npc name is required"));
    }

    let mut store = ctx.open_store()?;
    let campaign = store.campaign_id().to_string();
    store.mutate("npc create", &raw, |conn| {
        entities::upsert_npc(conn, &campaign, &npc)
    })?;
    Ok(json!({ "npc": npc }))
}
