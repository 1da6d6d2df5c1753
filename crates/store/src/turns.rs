//! The turn lifecycle: begin -> mutate -> commit | rollback, plus undo.
//!
//! The open-turn invariant lives in a durable row, never in process memory:
//! every transition re-reads it and flips it inside one SQLite write
//! transaction, so two racing processes cannot both believe they opened the
//! same turn. `begin` captures the pre-turn snapshot on the turn row; it is
//! the diff baseline at commit and the restore target for rollback/undo.

use crate::error::{Result, StoreError};
use crate::store::{now_rfc3339, CampaignStore};
use crate::{append_log, db, events, snapshot_io};
use chronicle_kernel::{state_checksum, CampaignSnapshot, EventRecord, TurnDiff};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Open,
    Committed,
    RolledBack,
}

impl TurnStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnStatus::Open => "open",
            TurnStatus::Committed => "committed",
            TurnStatus::RolledBack => "rolled_back",
        }
    }

    fn parse(value: &str) -> TurnStatus {
        match value {
            "open" => TurnStatus::Open,
            "committed" => TurnStatus::Committed,
            _ => TurnStatus::RolledBack,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TurnRow {
    pub id: i64,
    pub turn_number: i64,
    pub status: TurnStatus,
    pub summary: String,
    pub reason: String,
    pub diff_summary: String,
    pub checkpoint_checksum: String,
    pub snapshot_ref: String,
    /// Set on reversal turns created by `undo_last_turn`.
    pub reverts_turn_number: Option<i64>,
    pub created_at: String,
    pub committed_at: Option<String>,
}

#[derive(Debug)]
pub struct CommitOutcome {
    pub turn: TurnRow,
    pub diff: TurnDiff,
    pub snapshot: CampaignSnapshot,
    pub events: Vec<EventRecord>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UndoMode {
    Open,
    Committed,
}

impl UndoMode {
    pub fn as_str(self) -> &'static str {
        match self {
            UndoMode::Open => "open",
            UndoMode::Committed => "committed",
        }
    }
}

#[derive(Debug)]
pub struct UndoOutcome {
    pub mode: UndoMode,
    pub undone_turn_number: i64,
    pub reason: String,
    /// The reversal turn created when a committed turn is undone.
    pub undo_turn: Option<TurnRow>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TurnDiffRow {
    pub turn_number: i64,
    pub diff_summary: String,
    pub diff: TurnDiff,
    pub created_at: String,
}

impl CampaignStore {
    pub fn begin_turn(&mut self) -> Result<TurnRow> {
        let campaign_id = self.campaign_id.clone();
        let tx = self.conn.transaction()?;
        if let Some(open) = open_turn(&tx, &campaign_id)? {
            return Err(StoreError::TurnAlreadyOpen {
                campaign_id,
                turn_number: open.turn_number,
            });
        }

        let next_number: i64 = tx.query_row(
            "SELECT COALESCE(MAX(turn_number), 0) + 1 FROM turns WHERE campaign_id = ?1",
            params![campaign_id],
            |row| row.get(0),
        )?;
        let base = snapshot_io::load(&tx, &campaign_id)?;
        let created_at = now_rfc3339();
        tx.execute(
            r#"
            INSERT INTO turns (campaign_id, turn_number, status, base_snapshot_json, created_at)
            VALUES (?1, ?2, 'open', ?3, ?4)
            "#,
            params![campaign_id, next_number, base.to_json()?, created_at],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        tracing::info!(campaign = %self.campaign_id, turn = next_number, "turn opened");
        Ok(TurnRow {
            id,
            turn_number: next_number,
            status: TurnStatus::Open,
            summary: String::new(),
            reason: String::new(),
            diff_summary: String::new(),
            checkpoint_checksum: String::new(),
            snapshot_ref: String::new(),
            reverts_turn_number: None,
            created_at,
            committed_at: None,
        })
    }

    pub fn require_open_turn(&self) -> Result<TurnRow> {
        open_turn(&self.conn, &self.campaign_id)?
            .ok_or_else(|| StoreError::NoOpenTurn(self.campaign_id.clone()))
    }

    pub fn commit_turn(&mut self, summary: &str) -> Result<CommitOutcome> {
        let campaign_id = self.campaign_id.clone();
        let now = now_rfc3339();
        let tx = self.conn.transaction()?;
        let turn = open_turn(&tx, &campaign_id)?
            .ok_or_else(|| StoreError::NoOpenTurn(campaign_id.clone()))?;

        let base = base_snapshot(&tx, turn.id)?;
        let current = snapshot_io::load(&tx, &campaign_id)?;
        let diff = TurnDiff::compute(&base, &current);
        let diff_summary = diff.summary();
        let checksum = state_checksum(&current)?;
        let snapshot_ref = format!("snapshot://{campaign_id}/turn/{}", turn.turn_number);

        let records = events::promote(&tx, &campaign_id, turn.id, turn.turn_number)?;
        tx.execute(
            r#"
            UPDATE turns
            SET status = 'committed', summary = ?2, diff_summary = ?3,
                checkpoint_checksum = ?4, snapshot_ref = ?5, committed_at = ?6
            WHERE id = ?1
            "#,
            params![turn.id, summary, diff_summary, checksum, snapshot_ref, now],
        )?;
        tx.execute(
            r#"
            INSERT INTO turn_diffs (id, campaign_id, turn_id, turn_number, diff_json, diff_summary, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                format!("td_{}", uuid::Uuid::new_v4().simple()),
                campaign_id,
                turn.id,
                turn.turn_number,
                serde_json::to_string(&diff)?,
                diff_summary,
                now
            ],
        )?;
        tx.commit()?;
        tracing::info!(
            campaign = %self.campaign_id,
            turn = turn.turn_number,
            events = records.len(),
            "turn committed"
        );

        // The database commit above is the authoritative write; the mirror
        // append comes second. On failure the campaign is durably flagged and
        // `validate` reports the parity break until `repair_events` runs.
        if let Err(err) = append_log::append_records(&self.paths.events_log, &records) {
            db::set_meta(&self.conn, "append_log_dirty", "1")?;
            tracing::error!(
                campaign = %self.campaign_id,
                turn = turn.turn_number,
                error = %err,
                "append log write failed after commit"
            );
            return Err(StoreError::AppendLogWrite {
                turn_number: turn.turn_number,
                source: err,
            });
        }

        Ok(CommitOutcome {
            turn: TurnRow {
                status: TurnStatus::Committed,
                summary: summary.to_string(),
                diff_summary,
                checkpoint_checksum: checksum,
                snapshot_ref,
                committed_at: Some(now),
                ..turn
            },
            diff,
            snapshot: current,
            events: records,
        })
    }

    pub fn rollback_turn(&mut self, reason: &str) -> Result<TurnRow> {
        let campaign_id = self.campaign_id.clone();
        let tx = self.conn.transaction()?;
        let turn = open_turn(&tx, &campaign_id)?
            .ok_or_else(|| StoreError::NoOpenTurn(campaign_id.clone()))?;

        let base = base_snapshot(&tx, turn.id)?;
        snapshot_io::restore(&tx, &campaign_id, &base)?;
        let discarded = events::discard(&tx, turn.id)?;
        tx.execute(
            "UPDATE turns SET status = 'rolled_back', reason = ?2 WHERE id = ?1",
            params![turn.id, reason],
        )?;
        tx.commit()?;

        tracing::info!(
            campaign = %self.campaign_id,
            turn = turn.turn_number,
            discarded,
            "turn rolled back"
        );
        Ok(TurnRow {
            status: TurnStatus::RolledBack,
            reason: reason.to_string(),
            ..turn
        })
    }

    /// Open turn: rolled back in place. Otherwise the most recent committed
    /// turn that is neither a reversal nor already reversed gets undone by a
    /// new turn that restores its pre-commit snapshot and commits, so the
    /// reversal is itself an auditable turn. Chained undos therefore walk
    /// the committed history backwards instead of bouncing off their own
    /// reversal turns.
    pub fn undo_last_turn(&mut self, reason: Option<&str>) -> Result<UndoOutcome> {
        let reason = reason.unwrap_or("ooc undo_last_turn").to_string();

        if let Some(open) = open_turn(&self.conn, &self.campaign_id)? {
            let rolled = self.rollback_turn(&reason)?;
            debug_assert_eq!(rolled.turn_number, open.turn_number);
            return Ok(UndoOutcome {
                mode: UndoMode::Open,
                undone_turn_number: rolled.turn_number,
                reason,
                undo_turn: None,
            });
        }

        let target = undo_target(&self.conn, &self.campaign_id)?
            .ok_or_else(|| StoreError::NothingToUndo(self.campaign_id.clone()))?;

        let campaign_id = self.campaign_id.clone();
        let base = base_snapshot(&self.conn, target.id)?;
        let reversal = self.begin_turn()?;
        let payload = serde_json::json!({
            "reverts_turn_number": target.turn_number,
            "reason": reason,
        });
        self.mutate("ooc undo_last_turn", &payload, |conn| {
            conn.execute(
                "UPDATE turns SET reverts_turn_number = ?2 WHERE id = ?1",
                params![reversal.id, target.turn_number],
            )?;
            snapshot_io::restore(conn, &campaign_id, &base)
        })?;
        let outcome = self.commit_turn(&format!(
            "Undo of turn {}: {}",
            target.turn_number, reason
        ))?;
        Ok(UndoOutcome {
            mode: UndoMode::Committed,
            undone_turn_number: target.turn_number,
            reason,
            undo_turn: Some(outcome.turn),
        })
    }

    pub fn latest_turn(&self) -> Result<Option<TurnRow>> {
        Ok(self
            .conn
            .query_row(
                &format!("{TURN_SELECT} WHERE campaign_id = ?1 ORDER BY turn_number DESC LIMIT 1"),
                params![self.campaign_id],
                turn_from_row,
            )
            .optional()?)
    }

    pub fn list_turns(&self) -> Result<Vec<TurnRow>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TURN_SELECT} WHERE campaign_id = ?1 ORDER BY turn_number"))?;
        let rows = stmt.query_map(params![self.campaign_id], turn_from_row)?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// The stored diff for a committed turn; latest committed by default.
    pub fn stored_diff(&self, turn_number: Option<i64>) -> Result<Option<TurnDiffRow>> {
        let (sql, lookup): (String, Option<i64>) = match turn_number {
            Some(n) => (
                "SELECT turn_number, diff_json, diff_summary, created_at FROM turn_diffs
                 WHERE campaign_id = ?1 AND turn_number = ?2"
                    .to_string(),
                Some(n),
            ),
            None => (
                "SELECT turn_number, diff_json, diff_summary, created_at FROM turn_diffs
                 WHERE campaign_id = ?1 ORDER BY turn_number DESC LIMIT 1"
                    .to_string(),
                None,
            ),
        };
        let row = match lookup {
            Some(n) => self
                .conn
                .query_row(&sql, params![self.campaign_id, n], diff_row_parts)
                .optional()?,
            None => self
                .conn
                .query_row(&sql, params![self.campaign_id], diff_row_parts)
                .optional()?,
        };
        let Some((turn_number, diff_json, diff_summary, created_at)) = row else {
            return Ok(None);
        };
        Ok(Some(TurnDiffRow {
            turn_number,
            diff_summary,
            diff: serde_json::from_str(&diff_json)?,
            created_at,
        }))
    }

}

const TURN_SELECT: &str = r#"
    SELECT id, turn_number, status, summary, reason, diff_summary,
           checkpoint_checksum, snapshot_ref, reverts_turn_number, created_at, committed_at
    FROM turns
"#;

fn turn_from_row(row: &Row<'_>) -> rusqlite::Result<TurnRow> {
    let status: String = row.get(2)?;
    Ok(TurnRow {
        id: row.get(0)?,
        turn_number: row.get(1)?,
        status: TurnStatus::parse(&status),
        summary: row.get(3)?,
        reason: row.get(4)?,
        diff_summary: row.get(5)?,
        checkpoint_checksum: row.get(6)?,
        snapshot_ref: row.get(7)?,
        reverts_turn_number: row.get(8)?,
        created_at: row.get(9)?,
        committed_at: row.get(10)?,
    })
}

fn diff_row_parts(row: &Row<'_>) -> rusqlite::Result<(i64, String, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

/// The next committed turn that `undo_last_turn` may reverse: newest first,
/// skipping reversal turns and turns a reversal already covered.
fn undo_target(conn: &Connection, campaign_id: &str) -> Result<Option<TurnRow>> {
    Ok(conn
        .query_row(
            &format!(
                r#"{TURN_SELECT}
                WHERE campaign_id = ?1 AND status = 'committed'
                  AND reverts_turn_number IS NULL
                  AND turn_number NOT IN (
                    SELECT reverts_turn_number FROM turns
                    WHERE campaign_id = ?1 AND status = 'committed'
                      AND reverts_turn_number IS NOT NULL
                  )
                ORDER BY turn_number DESC LIMIT 1"#
            ),
            params![campaign_id],
            turn_from_row,
        )
        .optional()?)
}

pub(crate) fn open_turn(conn: &Connection, campaign_id: &str) -> Result<Option<TurnRow>> {
    Ok(conn
        .query_row(
            &format!("{TURN_SELECT} WHERE campaign_id = ?1 AND status = 'open'"),
            params![campaign_id],
            turn_from_row,
        )
        .optional()?)
}

pub(crate) fn base_snapshot(conn: &Connection, turn_id: i64) -> Result<CampaignSnapshot> {
    let json: String = conn.query_row(
        "SELECT base_snapshot_json FROM turns WHERE id = ?1",
        params![turn_id],
        |row| row.get(0),
    )?;
    Ok(CampaignSnapshot::from_json(&json)?)
}
