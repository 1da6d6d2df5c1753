//! Reconciles the append log to the database's committed-event ordering.
//!
//! The database is authoritative because it commits first; the log is only
//! ever a mirror. Apply mode backs the old log up next to the original
//! before rewriting, and the backup path is part of the outcome.

use crate::error::Result;
use crate::store::CampaignStore;
use crate::{append_log, db};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Serialize)]
pub struct ParityCounts {
    pub db_count: usize,
    pub file_count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct RepairOutcome {
    pub mismatch: bool,
    pub repaired: bool,
    pub backup: Option<String>,
    pub before: ParityCounts,
    pub after: Option<ParityCounts>,
}

pub fn repair_events(store: &CampaignStore, dry_run: bool) -> Result<RepairOutcome> {
    let records = store.committed_event_records()?;
    let log = append_log::read_records(&store.paths().events_log)?;

    let db_ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    let file_ids: Vec<&str> = log.records.iter().map(|r| r.id.as_str()).collect();
    let mismatch = db_ids != file_ids || log.malformed_lines > 0;
    let before = ParityCounts {
        db_count: db_ids.len(),
        file_count: file_ids.len(),
    };

    if !mismatch {
        // Nothing to reconcile; still clear a stale dirty flag.
        if !dry_run {
            db::clear_meta(store.conn(), "append_log_dirty")?;
        }
        return Ok(RepairOutcome {
            mismatch,
            repaired: false,
            backup: None,
            before,
            after: Some(before),
        });
    }

    if dry_run {
        return Ok(RepairOutcome {
            mismatch,
            repaired: false,
            backup: None,
            before,
            after: None,
        });
    }

    let log_path = &store.paths().events_log;
    let backup_path = backup_path_for(log_path);
    if log_path.exists() {
        std::fs::copy(log_path, &backup_path)?;
    } else {
        std::fs::write(&backup_path, b"")?;
    }

    append_log::rewrite(log_path, &records)?;
    db::clear_meta(store.conn(), "append_log_dirty")?;
    tracing::info!(
        campaign = store.campaign_id(),
        backup = %backup_path.display(),
        rewritten = records.len(),
        "append log repaired from database"
    );

    Ok(RepairOutcome {
        mismatch,
        repaired: true,
        backup: Some(backup_path.display().to_string()),
        before,
        after: Some(ParityCounts {
            db_count: db_ids.len(),
            file_count: db_ids.len(),
        }),
    })
}

fn backup_path_for(log_path: &std::path::Path) -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    let file_name = log_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("events.ndjson");
    log_path.with_file_name(format!("{file_name}.bak-{stamp}-{}", &nonce[..6]))
}
