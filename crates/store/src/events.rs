//! Event recorder: staged-event bookkeeping inside the events table.
//!
//! All functions take `&Connection` so the turn lifecycle can run them
//! inside its own transactions. Staging order is the `seq` rowid, which is
//! also the commit order mirrored into the append log.

use crate::error::Result;
use chronicle_kernel::{EventRecord, EventStage};
use rusqlite::{params, Connection};

/// Inserts one staged event for the open turn. Caller has already enforced
/// the open-turn invariant and provides the timestamp so one command shares
/// a single clock reading.
pub fn insert_staged(
    conn: &Connection,
    campaign_id: &str,
    turn_id: i64,
    command: &str,
    payload: &serde_json::Value,
    created_at: &str,
) -> Result<String> {
    let event_id = format!("evt_{}", uuid::Uuid::new_v4().simple());
    conn.execute(
        r#"
        INSERT INTO events (id, campaign_id, turn_id, command, payload_json, stage, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            event_id,
            campaign_id,
            turn_id,
            command,
            serde_json::to_string(payload)?,
            EventStage::Staged.as_str(),
            created_at
        ],
    )?;
    Ok(event_id)
}

/// Promotes every staged event of the turn to committed and returns them in
/// staging order for the append-log mirror.
pub fn promote(
    conn: &Connection,
    campaign_id: &str,
    turn_id: i64,
    turn_number: i64,
) -> Result<Vec<EventRecord>> {
    conn.execute(
        "UPDATE events SET stage = ?2 WHERE turn_id = ?1 AND stage = ?3",
        params![turn_id, EventStage::Committed.as_str(), EventStage::Staged.as_str()],
    )?;
    let mut stmt = conn.prepare(
        r#"
        SELECT id, command, payload_json, created_at
        FROM events
        WHERE turn_id = ?1 AND stage = 'committed'
        ORDER BY seq
        "#,
    )?;
    let rows = stmt.query_map(params![turn_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (id, command, payload_json, created_at) = row?;
        records.push(EventRecord {
            id,
            campaign_id: campaign_id.to_string(),
            turn_id,
            turn_number,
            command,
            payload: serde_json::from_str(&payload_json)?,
            timestamp: created_at,
        });
    }
    Ok(records)
}

pub fn discard(conn: &Connection, turn_id: i64) -> Result<usize> {
    let deleted = conn.execute(
        "DELETE FROM events WHERE turn_id = ?1 AND stage = 'staged'",
        params![turn_id],
    )?;
    Ok(deleted)
}

pub fn staged_count(conn: &Connection, campaign_id: &str) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM events WHERE campaign_id = ?1 AND stage = 'staged'",
        params![campaign_id],
        |row| row.get(0),
    )?)
}

/// Every committed event of the campaign, in commit (`seq`) order.
pub fn committed_records(conn: &Connection, campaign_id: &str) -> Result<Vec<EventRecord>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT e.id, e.turn_id, t.turn_number, e.command, e.payload_json, e.created_at
        FROM events e
        JOIN turns t ON t.id = e.turn_id
        WHERE e.campaign_id = ?1 AND e.stage = 'committed'
        ORDER BY e.seq
        "#,
    )?;
    let rows = stmt.query_map(params![campaign_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (id, turn_id, turn_number, command, payload_json, created_at) = row?;
        records.push(EventRecord {
            id,
            campaign_id: campaign_id.to_string(),
            turn_id,
            turn_number,
            command,
            payload: serde_json::from_str(&payload_json)?,
            timestamp: created_at,
        });
    }
    Ok(records)
}

pub fn committed_ids(conn: &Connection, campaign_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT id FROM events WHERE campaign_id = ?1 AND stage = 'committed' ORDER BY seq",
    )?;
    let rows = stmt.query_map(params![campaign_id], |row| row.get(0))?;
    Ok(rows.collect::<std::result::Result<_, _>>()?)
}

/// Crash recovery: staged events whose turn is no longer open are leftovers
/// from a process that died mid-turn. They are discarded, exactly as a
/// rollback would have.
pub fn sweep_orphaned_staged(conn: &Connection, campaign_id: &str) -> Result<usize> {
    let swept = conn.execute(
        r#"
        DELETE FROM events
        WHERE campaign_id = ?1
          AND stage = 'staged'
          AND turn_id NOT IN (SELECT id FROM turns WHERE campaign_id = ?1 AND status = 'open')
        "#,
        params![campaign_id],
    )?;
    Ok(swept)
}
