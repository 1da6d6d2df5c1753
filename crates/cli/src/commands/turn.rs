//! Turn lifecycle commands and the human-readable turn ledger.

use crate::context::{CmdResult, CommandError, Ctx};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use serde::Deserialize;
use serde_json::json;

pub fn begin(ctx: &Ctx) -> CmdResult {
    let mut store = ctx.open_store()?;
    let turn = store.begin_turn()?;
    Ok(json!({ "turn": turn }))
}

pub fn commit(ctx: &Ctx, summary: &str) -> CmdResult {
    let mut store = ctx.open_store()?;
    let outcome = store.commit_turn(summary)?;
    let mut data = json!({
        "turn": &outcome.turn,
        "diff_summary": &outcome.turn.diff_summary,
        "snapshot_ref": &outcome.turn.snapshot_ref,
        "event_count": outcome.events.len(),
    });
    if ctx.full {
        data["turn_diff"] = serde_json::to_value(&outcome.diff)?;
        data["snapshot"] = serde_json::to_value(&outcome.snapshot)?;
    }
    Ok(data)
}

#[derive(Deserialize, Default)]
struct RollbackPayload {
    #[serde(default)]
    reason: Option<String>,
}

pub fn rollback(ctx: &Ctx, reason_flag: Option<&str>) -> CmdResult {
    let payload: RollbackPayload = ctx.payload()?;
    let reason = reason_flag
        .map(str::to_string)
        .or(payload.reason)
        .unwrap_or_else(|| "turn rollback".to_string());
    let mut store = ctx.open_store()?;
    let turn = store.rollback_turn(&reason)?;
    Ok(json!({ "turn": turn }))
}

pub fn diff(ctx: &Ctx, turn_number: Option<i64>) -> CmdResult {
    let store = ctx.open_store()?;
    let stored = store.stored_diff(turn_number)?.ok_or_else(|| {
        CommandError::new(
            "no_committed_turns",
            "no committed turn has a stored diff for this campaign",
        )
    })?;
    Ok(json!({
        "turn_number": stored.turn_number,
        "diff_summary": stored.diff_summary,
        "diff": stored.diff,
        "created_at": stored.created_at,
    }))
}

/// Renders the turn ledger as a table on stdout. This is the one command
/// that is a human view rather than a JSON envelope.
pub fn timeline(ctx: &Ctx) -> Result<(), CommandError> {
    let store = ctx.open_store()?;
    let turns = store.list_turns()?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Turn", "Status", "Summary", "Diff", "Committed"]);
    for turn in turns {
        table.add_row(vec![
            turn.turn_number.to_string(),
            turn.status.as_str().to_string(),
            if turn.summary.is_empty() { turn.reason.clone() } else { turn.summary.clone() },
            turn.diff_summary.clone(),
            turn.committed_at.unwrap_or_default(),
        ]);
    }

    println!("\nTurn Timeline — {}\n", store.campaign_id());
    println!("{table}\n");
    Ok(())
}
