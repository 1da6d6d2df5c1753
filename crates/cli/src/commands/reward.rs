//! Reward grants: XP and coin land on the recipient, and every grant leaves
//! a reward event in the audit trail.
//!
//! A batch is all-or-nothing: every recipient is checked before anything is
//! staged, so one bad grant poisons the whole command and leaves no rows.

use crate::commands::short_id;
use crate::context::{CmdResult, CommandError, Ctx};
use chronicle_kernel::types::{OwnerKind, RewardEvent};
use chronicle_store::entities;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
struct GrantPayload {
    #[serde(default)]
    grants: Vec<GrantInput>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Deserialize)]
struct GrantInput {
    recipient_type: OwnerKind,
    recipient_id: String,
    reward: Value,
}

pub fn grant(ctx: &Ctx) -> CmdResult {
    let payload: GrantPayload = ctx.payload()?;
    if payload.grants.is_empty() {
        return Err(CommandError::new("invalid_payload", "grants must not be empty"));
    }

    let mut store = ctx.open_store()?;
    let turn = store.require_open_turn()?;
    let campaign = store.campaign_id().to_string();

    // Check every recipient up front; a single miss rejects the batch.
    for grant in &payload.grants {
        let exists = entities::owner_exists(
            store.conn(),
            &campaign,
            grant.recipient_type,
            &grant.recipient_id,
        )?;
        if !exists {
            return Err(CommandError::with_details(
                "recipient_not_found",
                json!({
                    "message": format!(
                        "{} {} does not exist",
                        grant.recipient_type, grant.recipient_id
                    ),
                    "recipient_type": grant.recipient_type.as_str(),
                    "recipient_id": grant.recipient_id,
                }),
            ));
        }
    }

    let mut rewards = Vec::with_capacity(payload.grants.len());
    for grant in &payload.grants {
        rewards.push(RewardEvent {
            id: short_id("reward"),
            recipient_type: grant.recipient_type,
            recipient_id: grant.recipient_id.clone(),
            reward: grant.reward.clone(),
            turn_number: turn.turn_number,
            created_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        });
    }

    store.mutate("reward grant", &ctx.raw_payload(), |conn| {
        for reward in &rewards {
            entities::insert_reward(conn, &campaign, reward)?;
            if reward.recipient_type == OwnerKind::Pc {
                if let Some(mut pc) = entities::get_pc(conn, &campaign, &reward.recipient_id)? {
                    pc.xp_total += reward.reward.get("xp").and_then(Value::as_i64).unwrap_or(0);
                    pc.currency_cp +=
                        reward.reward.get("currency_cp").and_then(Value::as_i64).unwrap_or(0);
                    entities::upsert_pc(conn, &campaign, &pc)?;
                }
            }
        }
        Ok(())
    })?;

    Ok(json!({
        "granted": rewards,
        "reason": payload.reason,
    }))
}
