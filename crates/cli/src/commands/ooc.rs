//! Out-of-character table controls.

use crate::context::{CmdResult, Ctx};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize, Default)]
struct UndoPayload {
    #[serde(default)]
    reason: Option<String>,
}

/// Undoes the most recent turn. The response always describes the undone
/// turn as rolled back; `mode` says whether it was still open or had to be
/// reversed by a fresh committed turn.
pub fn undo_last_turn(ctx: &Ctx, reason_flag: Option<&str>) -> CmdResult {
    let payload: UndoPayload = ctx.payload()?;
    let reason = reason_flag.map(str::to_string).or(payload.reason);
    let mut store = ctx.open_store()?;
    let outcome = store.undo_last_turn(reason.as_deref())?;

    let mut data = json!({
        "turn": {
            "turn_number": outcome.undone_turn_number,
            "status": "rolled_back",
            "mode": outcome.mode,
            "reason": outcome.reason,
            "undo_turn_number": outcome.undo_turn.as_ref().map(|t| t.turn_number),
        },
    });
    if let Some(undo_turn) = &outcome.undo_turn {
        data["diff_summary"] = json!(undo_turn.diff_summary);
        data["snapshot_ref"] = json!(undo_turn.snapshot_ref);
    }
    Ok(data)
}
