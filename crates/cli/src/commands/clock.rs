use crate::context::{CmdResult, CommandError, Ctx};
use chronicle_kernel::types::Clock;
use chronicle_store::entities;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct TickPayload {
    name: String,
    #[serde(default)]
    max_segments: Option<i64>,
    #[serde(default = "default_amount")]
    amount: i64,
}

fn default_amount() -> i64 {
    1
}

/// Advances a progress clock, creating it on first tick. Segments clamp at
/// the maximum; `filled` reports whether the clock has run out.
pub fn tick(ctx: &Ctx) -> CmdResult {
    let payload: TickPayload = ctx.payload()?;
    if payload.amount < 1 {
        return Err(CommandError::new("invalid_payload", "amount must be at least 1"));
    }

    let mut store = ctx.open_store()?;
    store.require_open_turn()?;
    let campaign = store.campaign_id().to_string();

    let mut clock = entities::get_clock(store.conn(), &campaign, &payload.name)?.unwrap_or(Clock {
        name: payload.name.clone(),
        segments: 0,
        max_segments: payload.max_segments.unwrap_or(6),
    });
    if let Some(max) = payload.max_segments {
        clock.max_segments = max;
    }
    clock.segments = (clock.segments + payload.amount).min(clock.max_segments);
    let filled = clock.segments >= clock.max_segments;

    store.mutate("clock tick", &ctx.raw_payload(), |conn| {
        entities::upsert_clock(conn, &campaign, &clock)
    })?;
    Ok(json!({ "clock": clock, "filled": filled }))
}
