use crate::commands::require_owner;
use crate::context::{CmdResult, Ctx};
use chronicle_kernel::types::{OwnerKind, Relationship};
use chronicle_store::entities;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct AdjustPayload {
    source_type: OwnerKind,
    source_id: String,
    target_type: OwnerKind,
    target_id: String,
    #[serde(default)]
    trust_delta: i64,
    #[serde(default)]
    fear_delta: i64,
    #[serde(default)]
    debt_delta: i64,
    #[serde(default)]
    reputation_delta: i64,
}

/// Applies standing deltas to a directed edge, creating it at zero first if
/// the two endpoints have no history.
pub fn adjust(ctx: &Ctx) -> CmdResult {
    let payload: AdjustPayload = ctx.payload()?;
    let mut store = ctx.open_store()?;
    store.require_open_turn()?;
    require_owner(&store, payload.source_type, &payload.source_id)?;
    require_owner(&store, payload.target_type, &payload.target_id)?;
    let campaign = store.campaign_id().to_string();

    let mut edge = entities::get_relationship(
        store.conn(),
        &campaign,
        payload.source_type,
        &payload.source_id,
        payload.target_type,
        &payload.target_id,
    )?
    .unwrap_or(Relationship {
        source_type: payload.source_type,
        source_id: payload.source_id.clone(),
        target_type: payload.target_type,
        target_id: payload.target_id.clone(),
        ..Relationship::default()
    });
    edge.trust += payload.trust_delta;
    edge.fear += payload.fear_delta;
    edge.debt += payload.debt_delta;
    edge.reputation += payload.reputation_delta;

    store.mutate("relationship adjust", &ctx.raw_payload(), |conn| {
        entities::upsert_relationship(conn, &campaign, &edge)
    })?;
    Ok(json!({ "relationship": edge }))
}
