//! `CampaignStore`: one campaign's database handle plus its append log.
//!
//! Every invocation is a fresh process, so opening the store is also the
//! crash-recovery point: staged events whose turn is no longer open are
//! swept before any command runs.

use crate::error::{Result, StoreError};
use crate::paths::CampaignPaths;
use crate::{db, events, snapshot_io, turns};
use chronicle_kernel::{CampaignSnapshot, EventRecord};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;

#[derive(Clone, Debug, Serialize)]
pub struct CampaignRow {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug)]
pub struct CampaignStore {
    pub(crate) campaign_id: String,
    pub(crate) paths: CampaignPaths,
    pub(crate) conn: Connection,
}

impl CampaignStore {
    pub fn create(root: &Path, campaign_id: &str, name: &str) -> Result<Self> {
        let paths = CampaignPaths::new(root, campaign_id);
        if paths.exists() {
            return Err(StoreError::CampaignExists(campaign_id.to_string()));
        }
        std::fs::create_dir_all(&paths.dir)?;
        let conn = db::open(&paths.db)?;
        conn.execute(
            "INSERT INTO campaigns (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![campaign_id, name, now_rfc3339()],
        )?;
        tracing::info!(campaign = campaign_id, "campaign created");
        Ok(Self {
            campaign_id: campaign_id.to_string(),
            paths,
            conn,
        })
    }

    pub fn open(root: &Path, campaign_id: &str) -> Result<Self> {
        let paths = CampaignPaths::new(root, campaign_id);
        if !paths.exists() {
            return Err(StoreError::CampaignNotFound(campaign_id.to_string()));
        }
        let conn = db::open(&paths.db)?;
        let swept = events::sweep_orphaned_staged(&conn, campaign_id)?;
        if swept > 0 {
            tracing::warn!(
                campaign = campaign_id,
                swept,
                "discarded staged events left by an interrupted turn"
            );
        }
        Ok(Self {
            campaign_id: campaign_id.to_string(),
            paths,
            conn,
        })
    }

    pub fn campaign_id(&self) -> &str {
        &self.campaign_id
    }

    pub fn paths(&self) -> &CampaignPaths {
        &self.paths
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn campaign_row(&self) -> Result<CampaignRow> {
        self.conn
            .query_row(
                "SELECT id, name, created_at FROM campaigns WHERE id = ?1",
                params![self.campaign_id],
                |row| {
                    Ok(CampaignRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::CampaignNotFound(self.campaign_id.clone()))
    }

    pub fn load_snapshot(&self) -> Result<CampaignSnapshot> {
        snapshot_io::load(&self.conn, &self.campaign_id)
    }

    /// The write path for every domain mutation: require the open turn, run
    /// the entity writes, and stage the event — one SQLite transaction, so a
    /// command either lands fully in the staged set or not at all.
    pub fn mutate<T>(
        &mut self,
        command: &str,
        payload: &serde_json::Value,
        apply: impl FnOnce(&Connection) -> Result<T>,
    ) -> Result<T> {
        let campaign_id = self.campaign_id.clone();
        let tx = self.conn.transaction()?;
        let turn = turns::open_turn(&tx, &campaign_id)?
            .ok_or_else(|| StoreError::NoOpenTurn(campaign_id.clone()))?;
        let result = apply(&tx)?;
        events::insert_staged(&tx, &campaign_id, turn.id, command, payload, &now_rfc3339())?;
        tx.commit()?;
        Ok(result)
    }

    pub fn staged_event_count(&self) -> Result<i64> {
        events::staged_count(&self.conn, &self.campaign_id)
    }

    pub fn committed_event_records(&self) -> Result<Vec<EventRecord>> {
        events::committed_records(&self.conn, &self.campaign_id)
    }
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
