use crate::commands::short_id;
use crate::context::{CmdResult, CommandError, Ctx};
use chronicle_kernel::types::Secret;
use chronicle_store::entities;
use serde::Deserialize;
use serde_json::{json, Value};

pub fn add(ctx: &Ctx) -> CmdResult {
    let mut raw = ctx.raw_payload();
    let Value::Object(map) = &mut raw else {
        return Err(CommandError::new("invalid_payload", "secret payload must be an object"));
    };
    if !map.contains_key("id") {
        map.insert("id".into(), Value::String(short_id("secret")));
    }
    let secret: Secret = serde_json::from_value(raw.clone())
        .map_err(|err| CommandError::new("invalid_payload", &format!("bad secret payload: {err}")))?;
    if secret.text.is_empty() {
        return Err(CommandError::new("invalid_payload", "secret text is required"));
    }

    let mut store = ctx.open_store()?;
    let campaign = store.campaign_id().to_string();
    store.mutate("secret add", &raw, |conn| {
        entities::upsert_secret(conn, &campaign, &secret)
    })?;
    Ok(json!({ "secret": secret }))
}

#[derive(Deserialize)]
struct RevealPayload {
    secret_id: String,
}

pub fn reveal(ctx: &Ctx) -> CmdResult {
    let payload: RevealPayload = ctx.payload()?;
    let mut store = ctx.open_store()?;
    store.require_open_turn()?;
    let campaign = store.campaign_id().to_string();

    let Some(mut secret) = entities::get_secret(store.conn(), &campaign, &payload.secret_id)? else {
        return Err(CommandError::with_details(
            "secret_not_found",
            json!({
                "message": format!("secret {} does not exist", payload.secret_id),
                "secret_id": payload.secret_id,
            }),
        ));
    };
    secret.reveal_status = "revealed".to_string();

    store.mutate("secret reveal", &ctx.raw_payload(), |conn| {
        entities::upsert_secret(conn, &campaign, &secret)
    })?;
    Ok(json!({ "secret": secret }))
}
