//! Read-only health checks: event log parity, referential integrity, and
//! checkpoint re-verification.
//!
//! `validate` never repairs anything and never aborts early; it returns the
//! full diagnostic picture for the campaign and lets the caller decide
//! whether to run `repair_events`.

use crate::error::Result;
use crate::store::CampaignStore;
use crate::{append_log, db, events};
use chronicle_kernel::state_checksum;
use rusqlite::{params, OptionalExtension};
use serde::Serialize;
use std::collections::BTreeSet;

const SAMPLE_LIMIT: usize = 5;

#[derive(Clone, Debug, Serialize)]
pub struct ParityReport {
    pub db_count: usize,
    pub file_count: usize,
    pub first_mismatch_index: Option<usize>,
    pub only_in_db_sample: Vec<String>,
    pub only_in_file_sample: Vec<String>,
    pub parse_error: bool,
}

impl ParityReport {
    pub fn mismatch(&self) -> bool {
        self.first_mismatch_index.is_some() || self.parse_error
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ValidationIssue {
    pub check: String,
    pub message: String,
    pub subjects: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CampaignReport {
    pub campaign_id: String,
    pub ok: bool,
    pub event_log_parity: ParityReport,
    pub issues: Vec<ValidationIssue>,
}

pub fn validate_campaign(store: &CampaignStore) -> Result<CampaignReport> {
    let campaign_id = store.campaign_id().to_string();
    let event_log_parity = check_parity(store)?;
    let mut issues = Vec::new();

    if event_log_parity.mismatch() {
        issues.push(ValidationIssue {
            check: "event_log_parity".into(),
            message: format!(
                "append log diverges from committed events (db={}, file={})",
                event_log_parity.db_count, event_log_parity.file_count
            ),
            subjects: Vec::new(),
        });
    }

    check_orphans(store, &mut issues)?;
    check_checkpoint(store, &mut issues)?;

    if db::get_meta(store.conn(), "append_log_dirty")?.as_deref() == Some("1") {
        issues.push(ValidationIssue {
            check: "append_log_dirty".into(),
            message: "a commit previously failed to mirror into the append log".into(),
            subjects: Vec::new(),
        });
    }

    let ok = issues.is_empty();
    if !ok {
        tracing::warn!(campaign = %campaign_id, issues = issues.len(), "validation found problems");
    }
    Ok(CampaignReport {
        campaign_id,
        ok,
        event_log_parity,
        issues,
    })
}

fn check_parity(store: &CampaignStore) -> Result<ParityReport> {
    let db_ids = events::committed_ids(store.conn(), store.campaign_id())?;
    let log = append_log::read_records(&store.paths().events_log)?;
    let file_ids: Vec<String> = log.records.into_iter().map(|r| r.id).collect();

    let first_mismatch_index = db_ids
        .iter()
        .zip(file_ids.iter())
        .position(|(a, b)| a != b)
        .or_else(|| {
            if db_ids.len() != file_ids.len() {
                Some(db_ids.len().min(file_ids.len()))
            } else {
                None
            }
        });

    let db_set: BTreeSet<&String> = db_ids.iter().collect();
    let file_set: BTreeSet<&String> = file_ids.iter().collect();
    let only_in_db_sample: Vec<String> = db_ids
        .iter()
        .filter(|id| !file_set.contains(id))
        .take(SAMPLE_LIMIT)
        .cloned()
        .collect();
    let only_in_file_sample: Vec<String> = file_ids
        .iter()
        .filter(|id| !db_set.contains(id))
        .take(SAMPLE_LIMIT)
        .cloned()
        .collect();

    Ok(ParityReport {
        db_count: db_ids.len(),
        file_count: file_ids.len(),
        first_mismatch_index,
        only_in_db_sample,
        only_in_file_sample,
        parse_error: log.malformed_lines > 0,
    })
}

/// References that point at entities which no longer exist. These are not
/// prevented retroactively; they typically come from out-of-band edits.
fn check_orphans(store: &CampaignStore, issues: &mut Vec<ValidationIssue>) -> Result<()> {
    let checks: &[(&str, &str, &str)] = &[
        (
            "inventory_owner",
            "inventory row owner does not exist",
            r#"
            SELECT id FROM inventory
            WHERE campaign_id = ?1
              AND ((owner_type = 'pc' AND owner_id NOT IN
                      (SELECT id FROM player_characters WHERE campaign_id = ?1))
                OR (owner_type = 'npc' AND owner_id NOT IN
                      (SELECT id FROM npcs WHERE campaign_id = ?1)))
            ORDER BY id
            "#,
        ),
        (
            "relationship_endpoint",
            "relationship endpoint does not exist",
            r#"
            SELECT source_type || ':' || source_id || '->' || target_type || ':' || target_id
            FROM relationships
            WHERE campaign_id = ?1
              AND ((source_type = 'pc' AND source_id NOT IN
                      (SELECT id FROM player_characters WHERE campaign_id = ?1))
                OR (source_type = 'npc' AND source_id NOT IN
                      (SELECT id FROM npcs WHERE campaign_id = ?1))
                OR (target_type = 'pc' AND target_id NOT IN
                      (SELECT id FROM player_characters WHERE campaign_id = ?1))
                OR (target_type = 'npc' AND target_id NOT IN
                      (SELECT id FROM npcs WHERE campaign_id = ?1)))
            ORDER BY 1
            "#,
        ),
        (
            "reward_recipient",
            "reward recipient does not exist",
            r#"
            SELECT id FROM reward_events
            WHERE campaign_id = ?1
              AND ((recipient_type = 'pc' AND recipient_id NOT IN
                      (SELECT id FROM player_characters WHERE campaign_id = ?1))
                OR (recipient_type = 'npc' AND recipient_id NOT IN
                      (SELECT id FROM npcs WHERE campaign_id = ?1)))
            ORDER BY id
            "#,
        ),
        (
            "spell_caster",
            "active spell caster does not exist",
            r#"
            SELECT id FROM active_spells
            WHERE campaign_id = ?1 AND active = 1
              AND ((caster_type = 'pc' AND caster_id NOT IN
                      (SELECT id FROM player_characters WHERE campaign_id = ?1))
                OR (caster_type = 'npc' AND caster_id NOT IN
                      (SELECT id FROM npcs WHERE campaign_id = ?1)))
            ORDER BY id
            "#,
        ),
    ];

    for (check, message, sql) in checks {
        let mut stmt = store.conn().prepare(sql)?;
        let rows = stmt.query_map(params![store.campaign_id()], |row| row.get::<_, String>(0))?;
        let subjects: Vec<String> = rows.collect::<std::result::Result<_, _>>()?;
        if !subjects.is_empty() {
            issues.push(ValidationIssue {
                check: check.to_string(),
                message: message.to_string(),
                subjects: subjects.into_iter().take(SAMPLE_LIMIT).collect(),
            });
        }
    }
    Ok(())
}

/// Recomputes the checksum of current state against the latest committed
/// turn's stored checkpoint. A mismatch means the entity tables changed
/// outside a turn.
fn check_checkpoint(store: &CampaignStore, issues: &mut Vec<ValidationIssue>) -> Result<()> {
    let latest_committed: Option<(i64, String)> = store
        .conn()
        .query_row(
            r#"
            SELECT turn_number, checkpoint_checksum FROM turns
            WHERE campaign_id = ?1 AND status = 'committed'
            ORDER BY turn_number DESC LIMIT 1
            "#,
            params![store.campaign_id()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((turn_number, stored)) = latest_committed else {
        return Ok(());
    };
    if stored.is_empty() {
        return Ok(());
    }
    let current = state_checksum(&store.load_snapshot()?)?;
    if current != stored {
        issues.push(ValidationIssue {
            check: "checkpoint_checksum".into(),
            message: format!(
                "state drifted since turn {turn_number} committed (stored {}, current {})",
                &stored[..12.min(stored.len())],
                &current[..12.min(current.len())]
            ),
            subjects: vec![format!("turn:{turn_number}")],
        });
    }
    Ok(())
}
